//! Bundled controlled-vocabulary maps.
//!
//! DDC, STW and TheSoz notations are resolved to their labels from the JSON maps
//! under `data/`. Vocabularies without a bundled map (MeSH, SWD, LCSH) pass the
//! entered value through as its own label.

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubjectScheme {
    Ddc,
    Stw,
    TheSoz,
    Mesh,
    Swd,
    Lcsh,
}

impl SubjectScheme {
    pub fn all() -> &'static [SubjectScheme] {
        &[
            SubjectScheme::Ddc,
            SubjectScheme::Stw,
            SubjectScheme::TheSoz,
            SubjectScheme::Mesh,
            SubjectScheme::Swd,
            SubjectScheme::Lcsh,
        ]
    }

    pub fn code(&self) -> &'static str {
        match self {
            SubjectScheme::Ddc => "ddc",
            SubjectScheme::Stw => "stw",
            SubjectScheme::TheSoz => "thesoz",
            SubjectScheme::Mesh => "mesh",
            SubjectScheme::Swd => "swd",
            SubjectScheme::Lcsh => "lcsh",
        }
    }

    fn bundled(&self) -> Option<&'static str> {
        match self {
            SubjectScheme::Ddc => Some(include_str!("../../data/ddc.json")),
            SubjectScheme::Stw => Some(include_str!("../../data/stw.json")),
            SubjectScheme::TheSoz => Some(include_str!("../../data/thesoz.json")),
            _ => None,
        }
    }
}

type SubjectMaps = HashMap<SubjectScheme, HashMap<String, String>>;

static MAPS: OnceLock<SubjectMaps> = OnceLock::new();

fn maps() -> &'static SubjectMaps {
    MAPS.get_or_init(|| {
        SubjectScheme::all()
            .iter()
            .filter_map(|scheme| {
                let raw = scheme.bundled()?;
                match serde_json::from_str::<HashMap<String, String>>(raw) {
                    Ok(map) => Some((*scheme, map)),
                    Err(e) => {
                        warn!(scheme = scheme.code(), error = %e, "Unreadable subject map");
                        None
                    }
                }
            })
            .collect()
    })
}

/// Resolve a notation to `(id, label)`. Unknown notations label themselves.
pub fn resolve(scheme: SubjectScheme, id: &str) -> (String, String) {
    let label = maps()
        .get(&scheme)
        .and_then(|map| map.get(id))
        .cloned()
        .unwrap_or_else(|| id.to_string());
    (id.to_string(), label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_maps_load() {
        assert_eq!(resolve(SubjectScheme::Ddc, "530").1, "Physik");
        assert_eq!(resolve(SubjectScheme::Stw, "18027-2").1, "Digitalisierung");
        assert_eq!(resolve(SubjectScheme::TheSoz, "10036250").1, "Bildung");
    }

    #[test]
    fn test_unknown_and_unbundled_pass_through() {
        assert_eq!(resolve(SubjectScheme::Ddc, "999.9").1, "999.9");
        assert_eq!(
            resolve(SubjectScheme::Mesh, "Neoplasms"),
            ("Neoplasms".to_string(), "Neoplasms".to_string())
        );
    }
}
