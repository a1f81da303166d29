//! Working group records.

use serde::{Deserialize, Serialize};

use super::envelope::Envelope;
use super::person::UrlEntry;

/// A funding line of a working group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Fund {
    #[serde(default)]
    pub organisation: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct WorkingGroup {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default)]
    pub pref_label: String,
    #[serde(default)]
    pub alt_label: Vec<String>,
    #[serde(default)]
    pub gnd: String,
    #[serde(default)]
    pub funds: Vec<Fund>,
    /// Organisation or group this group belongs to.
    #[serde(default)]
    pub parent_id: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub url: Vec<UrlEntry>,
    #[serde(default)]
    pub note: String,
}

impl WorkingGroup {
    pub fn new(id: impl Into<String>, pref_label: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::new(id),
            pref_label: pref_label.into(),
            ..Default::default()
        }
    }
}
