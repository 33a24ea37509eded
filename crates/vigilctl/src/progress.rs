//! Progress bar for audit runs
//!
//! Hidden when stdout is not a terminal or JSON output was requested, so piped
//! output stays clean.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::IsTerminal;
use vigil_shared::{AuditEvent, AuditProgress};

pub struct AuditProgressBar {
    bar: ProgressBar,
}

impl AuditProgressBar {
    pub fn new(enabled: bool) -> Self {
        let bar = ProgressBar::new(100);
        if enabled && std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err() {
            if let Ok(style) =
                ProgressStyle::with_template("{bar:40.cyan/blue} {pos:>3}% {msg}")
            {
                bar.set_style(style.progress_chars("=> "));
            }
        } else {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        Self { bar }
    }

    /// Feed one event of the run
    pub fn observe(&self, event: &AuditEvent) {
        match event {
            AuditEvent::Started { total, .. } => {
                self.bar.set_message(format!("{} modules", total));
            }
            AuditEvent::Probing { module, .. } => self.bar.set_message(format!("probing {}", module)),
            AuditEvent::Fixing { module, .. } => self.bar.set_message(format!("repairing {}", module)),
            AuditEvent::Progress(progress) => self.update(progress),
            AuditEvent::Cancelled { .. } => self.bar.set_message("cancelled"),
            AuditEvent::Finished { .. } => {}
        }
    }

    pub fn update(&self, progress: &AuditProgress) {
        self.bar.set_position(progress.percent as u64);
        self.bar
            .set_message(format!("{}: {}", progress.module, progress.status));
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for AuditProgressBar {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
