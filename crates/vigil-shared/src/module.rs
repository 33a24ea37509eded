//! Module descriptors: the static catalog entries subject to auditing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Static importance of a module, set in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown priority '{}'", other)),
        }
    }
}

/// Kind of application unit a module represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Page,
    Component,
    Feature,
    Integration,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page => write!(f, "page"),
            Self::Component => write!(f, "component"),
            Self::Feature => write!(f, "feature"),
            Self::Integration => write!(f, "integration"),
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "page" => Ok(Self::Page),
            "component" => Ok(Self::Component),
            "feature" => Ok(Self::Feature),
            "integration" => Ok(Self::Integration),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

fn default_auto_fix() -> bool {
    true
}

/// A named unit of the application subject to health probing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    /// Human-readable name, unique within a catalog
    pub name: String,

    /// URL path if the module is a navigable page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    /// Logical name of the implementing unit, used to look up custom checks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_ref: Option<String>,

    pub priority: Priority,
    pub category: Category,

    /// Whether automated repair may be attempted for this module
    #[serde(default = "default_auto_fix")]
    pub auto_fix: bool,

    /// Known to be unfinished; reported as incomplete without probing
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub incomplete: bool,
}

impl ModuleDescriptor {
    pub fn new(name: impl Into<String>, priority: Priority, category: Category) -> Self {
        Self {
            name: name.into(),
            route: None,
            component_ref: None,
            priority,
            category,
            auto_fix: true,
            incomplete: false,
        }
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    pub fn with_component(mut self, component_ref: impl Into<String>) -> Self {
        self.component_ref = Some(component_ref.into());
        self
    }

    pub fn without_auto_fix(mut self) -> Self {
        self.auto_fix = false;
        self
    }

    pub fn incomplete(mut self) -> Self {
        self.incomplete = true;
        self
    }

    /// Stable diagnostic id derived from the module name.
    ///
    /// Lowercases, maps every run of non-alphanumeric characters to a single
    /// `-` and trims dashes from both ends: "Music & Entertainment Hub"
    /// becomes `music-entertainment-hub`.
    pub fn item_id(&self) -> String {
        let mut id = String::with_capacity(self.name.len());
        let mut pending_dash = false;
        for c in self.name.chars() {
            if c.is_alphanumeric() {
                if pending_dash && !id.is_empty() {
                    id.push('-');
                }
                pending_dash = false;
                id.extend(c.to_lowercase());
            } else {
                pending_dash = true;
            }
        }
        id
    }
}
