//! Editable quick-select lists shown on the operator and admin views.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_MODELS: &[&str] = &["DUAL MOTOR", "SINGLE MOTOR", "COLOR SENSOR", "HUB 16"];

pub const DEFAULT_LINES: &[&str] = &["LE-04", "LE-05", "LE-06", "LE-07"];

pub const DEFAULT_REASONS: &[&str] = &["0.01", "SYSTEM CRASH"];

pub const DEFAULT_TECH_TYPES: &[&str] = &[
    "FCT TECHNICIAN",
    "END TESTER TECHNICIAN",
    "AUTOMATION & ROBOTIC TECHNICIAN",
];

// ---------------------------------------------------------------------------
// CatalogKind
// ---------------------------------------------------------------------------

/// Which catalog list an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CatalogKind {
    Models,
    Lines,
    Reasons,
    TechTypes,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 4] = [
        CatalogKind::Models,
        CatalogKind::Lines,
        CatalogKind::Reasons,
        CatalogKind::TechTypes,
    ];

    /// Path segment used by the HTTP API.
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogKind::Models => "models",
            CatalogKind::Lines => "lines",
            CatalogKind::Reasons => "reasons",
            CatalogKind::TechTypes => "tech-types",
        }
    }

    /// Key the list is persisted under.
    pub fn storage_key(&self) -> &'static str {
        match self {
            CatalogKind::Models => "andon-models",
            CatalogKind::Lines => "andon-lines",
            CatalogKind::Reasons => "andon-reasons",
            CatalogKind::TechTypes => "andon-tech-types",
        }
    }

    pub fn defaults(&self) -> CatalogList {
        let items = match self {
            CatalogKind::Models => DEFAULT_MODELS,
            CatalogKind::Lines => DEFAULT_LINES,
            CatalogKind::Reasons => DEFAULT_REASONS,
            CatalogKind::TechTypes => DEFAULT_TECH_TYPES,
        };
        CatalogList::from_items(items.iter().copied())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CatalogList
// ---------------------------------------------------------------------------

/// Ordered set of trimmed, non-empty strings.
///
/// Serialized as a plain JSON array so persisted lists stay readable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CatalogList(Vec<String>);

impl CatalogList {
    pub fn from_items<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = CatalogList::default();
        for item in items {
            list.add(item.as_ref());
        }
        list
    }

    /// Append `value` trimmed. Empty values and duplicates are ignored.
    ///
    /// Returns `true` if the list changed.
    pub fn add(&mut self, value: &str) -> bool {
        let value = value.trim();
        if value.is_empty() || self.contains(value) {
            return false;
        }
        self.0.push(value.to_string());
        true
    }

    /// Remove an exact match. Returns `true` if the list changed.
    pub fn remove(&mut self, value: &str) -> bool {
        let before = self.0.len();
        self.0.retain(|item| item != value);
        self.0.len() != before
    }

    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|item| item == value)
    }

    pub fn items(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
