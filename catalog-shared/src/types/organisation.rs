//! Organisation (institutional unit) records.

use serde::{Deserialize, Serialize};

use super::envelope::Envelope;
use super::person::UrlEntry;

/// Child unit reference, reconciled against the child's `parent_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChildRef {
    #[serde(default)]
    pub child_id: String,
    #[serde(default)]
    pub child_label: String,
}

/// Destatis subject classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Destatis {
    #[serde(default)]
    pub destatis_id: String,
    #[serde(default)]
    pub destatis_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Organisation {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default)]
    pub pref_label: String,
    #[serde(default)]
    pub alt_label: Vec<String>,
    /// Administrative ids (cost centres, account numbers).
    #[serde(default)]
    pub account: Vec<String>,
    #[serde(default)]
    pub gnd: String,
    #[serde(default)]
    pub viaf: String,
    #[serde(default)]
    pub isni: String,
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub parent_label: String,
    #[serde(default)]
    pub children: Vec<ChildRef>,
    #[serde(default)]
    pub destatis: Vec<Destatis>,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub url: Vec<UrlEntry>,
    #[serde(default)]
    pub note: String,
}

impl Organisation {
    pub fn new(id: impl Into<String>, pref_label: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(id),
            pref_label: pref_label.into(),
            ..Default::default()
        }
    }

    pub fn child_ids(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .map(|c| c.child_id.as_str())
            .filter(|id| !id.is_empty())
    }
}
