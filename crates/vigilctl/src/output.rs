//! Output formatting - plain ASCII tables with colored statuses

use owo_colors::OwoColorize;
use vigil_shared::{
    AuditResult, DiagnosticItem, HealthSummary, ModuleDescriptor, ModuleStatus, RecoverySummary,
    Severity,
};

const SEPARATOR: &str = "------------------------------------------------------------";

/// Fixed-width status tag, colored by health
pub fn status_tag(status: ModuleStatus) -> String {
    let tag = format!("{:<17}", status.to_string());
    match status {
        ModuleStatus::Working => tag.bright_green().to_string(),
        ModuleStatus::PartiallyWorking => tag.yellow().to_string(),
        ModuleStatus::Broken => tag.bright_red().to_string(),
        ModuleStatus::Missing => tag.red().to_string(),
        ModuleStatus::Incomplete => tag.cyan().to_string(),
        _ => tag.dimmed().to_string(),
    }
}

fn severity_tag(severity: Severity) -> String {
    let tag = format!("[{}]", severity.to_string().to_uppercase());
    match severity {
        Severity::Critical => tag.bright_red().to_string(),
        Severity::Warning => tag.yellow().to_string(),
        Severity::Info => tag.dimmed().to_string(),
    }
}

fn health_colored(percent: u8) -> String {
    let text = format!("{}%", percent);
    if percent >= 90 {
        text.bright_green().to_string()
    } else if percent >= 70 {
        text.yellow().to_string()
    } else {
        text.bright_red().to_string()
    }
}

pub fn display_modules(modules: &[ModuleDescriptor]) {
    println!();
    println!("{} modules in catalog", modules.len().bold());
    println!("{}", SEPARATOR.dimmed());
    for module in modules {
        let target = module
            .route
            .as_deref()
            .or(module.component_ref.as_deref())
            .unwrap_or("-");
        println!(
            "  {:<28} {:<12} {:<9} {}{}{}",
            module.name,
            module.category.to_string(),
            module.priority.to_string(),
            target,
            if module.auto_fix { "" } else { "  (manual)" },
            if module.incomplete { "  (incomplete)" } else { "" }
        );
    }
    println!();
}

pub fn display_items(items: &[DiagnosticItem]) {
    for item in items {
        let repair = match item.repair_successful {
            Some(true) => " repaired".bright_green().to_string(),
            Some(false) => " repair failed".bright_red().to_string(),
            None => String::new(),
        };
        println!(
            "  {} {:<28} {}{}",
            status_tag(item.status),
            item.name,
            severity_tag(item.severity),
            repair
        );
        for issue in &item.issues {
            println!("      * {}", issue.dimmed());
        }
    }
}

pub fn display_summary(summary: &HealthSummary) {
    println!("{}", SEPARATOR.dimmed());
    println!("  {}", summary);
    println!(
        "  Overall health: {}  (missing {}, partial {}, incomplete {})",
        health_colored(summary.overall_health),
        summary.missing,
        summary.partially_working,
        summary.incomplete
    );
    if summary.cancelled {
        println!("  {}", "Audit was cancelled before every module was checked".yellow());
    }
}

pub fn display_recovery(recovery: &RecoverySummary) {
    if recovery.attempted == 0 && recovery.unrepaired.is_empty() {
        return;
    }
    println!(
        "  Repairs: {} attempted, {} succeeded, {} failed",
        recovery.attempted, recovery.succeeded, recovery.failed
    );
    if !recovery.unrepaired.is_empty() {
        println!("  Needs attention: {}", recovery.unrepaired.join(", ").yellow());
    }
}

/// Full human-readable report of one audit
pub fn display_result(result: &AuditResult) {
    println!();
    println!(
        "[AUDIT] {} ({}ms)",
        result.run_id.to_string().dimmed(),
        result.duration_ms
    );
    println!("{}", SEPARATOR.dimmed());
    display_items(&result.modules);
    display_summary(&result.summary());
    display_recovery(&result.recovery());
    println!();
}

pub fn display_error(message: &str) {
    eprintln!();
    eprintln!("[ERROR] {}", message.red());
    eprintln!();
}

pub fn display_success(message: &str) {
    println!("[OK] {}", message.bright_green());
}

pub fn display_note(message: &str) {
    println!("[NOTE] {}", message.yellow());
}
