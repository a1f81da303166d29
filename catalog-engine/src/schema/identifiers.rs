//! Identifier patterns, checksums and normalisation.

use std::sync::OnceLock;

use regex::Regex;

/// Compile a pattern once per process. A pattern that fails to compile never matches.
fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn is_match(cell: &'static OnceLock<Option<Regex>>, pattern: &str, value: &str) -> bool {
    cached(cell, pattern).is_some_and(|re| re.is_match(value))
}

static DOI: OnceLock<Option<Regex>> = OnceLock::new();
static ISO_DATE: OnceLock<Option<Regex>> = OnceLock::new();
static GND: OnceLock<Option<Regex>> = OnceLock::new();
static ORCID: OnceLock<Option<Regex>> = OnceLock::new();
static VIAF: OnceLock<Option<Regex>> = OnceLock::new();
static ISNI: OnceLock<Option<Regex>> = OnceLock::new();
static URI: OnceLock<Option<Regex>> = OnceLock::new();
static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

/// Prefix `10.<registrant>` and a suffix of letters, digits and `-._()`.
/// The whole value has to match.
pub fn is_doi(value: &str) -> bool {
    is_match(&DOI, r"(?i)^10\.\d{4,}(?:\.\d+)*/[a-z0-9\-._()]+$", value)
}

/// `YYYY`, `YYYY-MM` or `YYYY-MM-DD`.
pub fn is_iso_date(value: &str) -> bool {
    is_match(&ISO_DATE, r"(?i)^[12]\d{3}(?:-[01]\d)?(?:-[0123]\d)?$", value)
}

/// GND authority ids: numeric with an optional check character, or the
/// hyphenated corporate-body form (`2005373-4`).
pub fn is_gnd(value: &str) -> bool {
    is_match(&GND, r"(?i)^(?:\d{1,10}[0-9x]|\d{1,10}-[0-9x])$", value)
}

pub fn is_orcid(value: &str) -> bool {
    is_match(&ORCID, r"(?i)^\d{4}-\d{4}-\d{4}-\d{3}[0-9x]$", value)
}

pub fn is_viaf(value: &str) -> bool {
    is_match(&VIAF, r"^\d{1,22}$", value)
}

/// Sixteen characters, optionally grouped in fours.
pub fn is_isni(value: &str) -> bool {
    is_match(&ISNI, r"(?i)^\d{4}\s?\d{4}\s?\d{4}\s?\d{3}[0-9x]$", value)
}

/// Authority ids accepted for organisations: GND, VIAF or ISNI.
pub fn is_organisation_authority(value: &str) -> bool {
    is_gnd(value) || is_viaf(value) || is_isni(value)
}

pub fn is_uri(value: &str) -> bool {
    is_match(&URI, r"(?i)^(?:https?|ftp)://[^\s/$.?#][^\s]*$", value)
}

pub fn is_email(value: &str) -> bool {
    is_match(&EMAIL, r"(?i)^[a-z0-9._%+\-]+@[a-z0-9.\-]+\.[a-z]{2,}$", value)
}

const DOI_PREFIXES: &[&str] = &[
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "doi:",
];

/// Strip resolver prefixes and lowercase a DOI.
pub fn normalize_doi(value: &str) -> String {
    let trimmed = value.trim();
    let lower = trimmed.to_lowercase();
    let stripped = DOI_PREFIXES
        .iter()
        .find_map(|prefix| lower.strip_prefix(*prefix))
        .unwrap_or(lower.as_str());
    stripped.trim().to_string()
}

fn digits(value: &str) -> Vec<char> {
    value
        .chars()
        .filter(|c| !matches!(c, '-' | ' '))
        .collect()
}

/// Validate an ISBN-10 or ISBN-13 checksum; hyphens and spaces are ignored.
pub fn is_valid_isbn(value: &str) -> bool {
    let chars = digits(value);
    match chars.len() {
        10 => {
            let mut sum = 0u32;
            for (i, c) in chars.iter().enumerate() {
                let digit = match (i, c) {
                    (9, 'x' | 'X') => 10,
                    (_, c) => match c.to_digit(10) {
                        Some(d) => d,
                        None => return false,
                    },
                };
                sum += digit * (10 - i as u32);
            }
            sum % 11 == 0
        }
        13 => {
            let mut sum = 0u32;
            for (i, c) in chars.iter().enumerate() {
                let Some(d) = c.to_digit(10) else {
                    return false;
                };
                sum += if i % 2 == 0 { d } else { d * 3 };
            }
            sum % 10 == 0
        }
        _ => false,
    }
}

/// Validate an ISSN checksum (`0317-8471`).
pub fn is_valid_issn(value: &str) -> bool {
    let chars = digits(value);
    if chars.len() != 8 {
        return false;
    }
    let mut sum = 0u32;
    for (i, c) in chars.iter().take(7).enumerate() {
        let Some(d) = c.to_digit(10) else {
            return false;
        };
        sum += d * (8 - i as u32);
    }
    let check = match chars[7] {
        'x' | 'X' => 10,
        c => match c.to_digit(10) {
            Some(d) => d,
            None => return false,
        },
    };
    (sum + check) % 11 == 0
}

/// ISMN uses the ISBN-13 checksum over its `979-0` form.
pub fn is_valid_ismn(value: &str) -> bool {
    let chars = digits(value);
    match chars.first() {
        Some('M' | 'm') if chars.len() == 10 => {
            let rest: String = chars[1..].iter().collect();
            is_valid_isbn(&format!("9790{}", rest))
        }
        Some(_) if chars.len() == 13 => is_valid_isbn(value),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_compile() {
        assert!(is_doi("10.1000/xyz123"));
        assert!(is_iso_date("2024"));
        assert!(is_gnd("118540238"));
        assert!(is_orcid("0000-0002-1825-0097"));
        assert!(is_uri("https://example.org/a"));
        assert!(is_email("jane.doe@example.org"));
    }

    #[test]
    fn test_doi_is_case_insensitive() {
        assert!(is_doi("10.1002/ANIE.201915678"));
        assert!(is_doi("10.1000.10/abc(1)"));
        assert!(!is_doi("11.1000/abc"));
        assert!(!is_doi("10.10/abc"));
    }

    #[test]
    fn test_doi_suffix_characters() {
        assert!(is_doi("10.1000/a-b_c.d(2)"));
        assert!(!is_doi("10.1000/abc;def"));
        assert!(!is_doi("10.1002/(SICI)1097-4571<3::AID>"));
        assert!(!is_doi("10.1000/abc def"));
        assert!(!is_doi("see 10.1000/abc"));
    }

    #[test]
    fn test_iso_dates() {
        assert!(is_iso_date("2021-03"));
        assert!(is_iso_date("1999-12-31"));
        assert!(!is_iso_date("21-03-2021"));
        assert!(!is_iso_date("3021"));
    }

    #[test]
    fn test_isbn_checksums() {
        assert!(is_valid_isbn("3-598-21500-2"));
        assert!(is_valid_isbn("0-8044-2957-X"));
        assert!(is_valid_isbn("978-3-16-148410-0"));
        assert!(!is_valid_isbn("978-3-16-148410-1"));
        assert!(!is_valid_isbn("12345"));
    }

    #[test]
    fn test_issn_checksum() {
        assert!(is_valid_issn("0317-8471"));
        assert!(is_valid_issn("2434-561X"));
        assert!(!is_valid_issn("0317-8472"));
    }

    #[test]
    fn test_ismn() {
        assert!(is_valid_ismn("979-0-2600-0043-8"));
        assert!(is_valid_ismn("M-2306-7118-7"));
        assert!(!is_valid_ismn("M-2306-7118-8"));
    }

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("https://doi.org/10.1000/ABC"), "10.1000/abc");
        assert_eq!(normalize_doi(" doi:10.1000/Xy "), "10.1000/xy");
        assert_eq!(normalize_doi("10.1000/abc"), "10.1000/abc");
    }

    #[test]
    fn test_organisation_authorities() {
        assert!(is_organisation_authority("2005373-4"));
        assert!(is_organisation_authority("0000 0001 2176 4875"));
        assert!(!is_organisation_authority("not-an-id"));
    }
}
