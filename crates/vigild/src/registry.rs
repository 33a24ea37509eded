//! Module registry - the catalog of modules an audit walks through

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use vigil_shared::{Category, ModuleDescriptor, Priority, VigilError};

/// Anything that can enumerate the modules of one audit run.
///
/// Failing to enumerate is the one error that aborts a run.
pub trait ModuleSource: Send + Sync {
    fn list_modules(&self) -> Result<Vec<ModuleDescriptor>, VigilError>;
}

/// Fixed, in-memory catalog
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    modules: Vec<ModuleDescriptor>,
}

impl ModuleRegistry {
    /// Build a registry, rejecting empty names and colliding ids
    pub fn new(modules: Vec<ModuleDescriptor>) -> Result<Self, VigilError> {
        validate_catalog(&modules)?;
        Ok(Self { modules })
    }

    /// The platform's own page, component, feature and integration catalog
    pub fn builtin() -> Self {
        Self {
            modules: builtin_catalog(),
        }
    }

    /// Use the configured catalog, or the built-in one when none is given
    pub fn from_config(modules: &[ModuleDescriptor]) -> Result<Self, VigilError> {
        if modules.is_empty() {
            Ok(Self::builtin())
        } else {
            Self::new(modules.to_vec())
        }
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.modules.iter().find(|m| m.name == name)
    }

    pub fn count(&self) -> usize {
        self.modules.len()
    }
}

impl ModuleSource for ModuleRegistry {
    fn list_modules(&self) -> Result<Vec<ModuleDescriptor>, VigilError> {
        Ok(self.modules.clone())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    modules: Vec<ModuleDescriptor>,
}

/// Catalog stored in a TOML file and re-read for every run
#[derive(Debug, Clone)]
pub struct CatalogFile {
    path: PathBuf,
}

impl CatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ModuleSource for CatalogFile {
    fn list_modules(&self) -> Result<Vec<ModuleDescriptor>, VigilError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            VigilError::Registry(format!("cannot read catalog {}: {}", self.path.display(), e))
        })?;
        let doc: CatalogDocument = toml::from_str(&content).map_err(|e| {
            VigilError::Registry(format!("invalid catalog {}: {}", self.path.display(), e))
        })?;
        validate_catalog(&doc.modules)?;
        debug!("  Loaded {} modules from {}", doc.modules.len(), self.path.display());
        Ok(doc.modules)
    }
}

fn validate_catalog(modules: &[ModuleDescriptor]) -> Result<(), VigilError> {
    let mut seen = HashSet::new();
    for module in modules {
        let id = module.item_id();
        if id.is_empty() {
            return Err(VigilError::Registry(format!(
                "module name '{}' has no usable characters",
                module.name
            )));
        }
        if !seen.insert(id.clone()) {
            return Err(VigilError::Registry(format!(
                "module '{}' collides with another module (id '{}')",
                module.name, id
            )));
        }
    }
    Ok(())
}

/// Built-in catalog of the civic platform's modules
fn builtin_catalog() -> Vec<ModuleDescriptor> {
    use Category::*;
    use Priority::*;

    vec![
        ModuleDescriptor::new("Home", Critical, Page).with_route("/"),
        ModuleDescriptor::new("Political Directory", Critical, Page).with_route("/politicians"),
        ModuleDescriptor::new("Intelligence Dashboard", High, Page).with_route("/intelligence"),
        ModuleDescriptor::new("Marketplace", High, Page).with_route("/marketplace"),
        ModuleDescriptor::new("Music & Entertainment Hub", Medium, Page).with_route("/music"),
        ModuleDescriptor::new("Scholarships", Medium, Page).with_route("/scholarships"),
        ModuleDescriptor::new("Analytics", Medium, Page).with_route("/analytics"),
        ModuleDescriptor::new("Reviews", Medium, Page).with_route("/reviews"),
        ModuleDescriptor::new("System Diagnostics", Low, Page).with_route("/diagnostics"),
        ModuleDescriptor::new("AI Assistant Bot", High, Component).with_component("bot"),
        ModuleDescriptor::new("Response Cache", Medium, Component).with_component("cache"),
        ModuleDescriptor::new("Search & Filters", High, Component).with_component("search"),
        ModuleDescriptor::new("File Upload Wizard", Medium, Component).with_component("upload"),
        ModuleDescriptor::new("Review Forms", Low, Feature).with_component("review-form"),
        ModuleDescriptor::new("Sentiment Scoring", Medium, Integration)
            .with_component("sentiment"),
        ModuleDescriptor::new("AI Generation", Medium, Integration).with_component("ai-generation"),
        ModuleDescriptor::new("File Storage", High, Integration).with_component("storage"),
        ModuleDescriptor::new("Data Backend", Critical, Integration)
            .with_component("backend")
            .without_auto_fix(),
    ]
}
