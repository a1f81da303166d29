//! Issued-date facets.

use chrono::NaiveDate;

/// The facet forms of a work's primary issued date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedDate {
    /// As entered.
    pub date: String,
    /// Four-digit year.
    pub fdate: String,
    /// Midnight UTC of the first day the date covers; `None` when the
    /// components do not form a calendar date.
    pub date_boost: Option<String>,
}

/// Split `YYYY`, `YYYY-MM` or `YYYY-MM-DD` into its facet forms. Missing month
/// and day components are filled with `01`.
pub fn split_issued(raw: &str) -> Option<IssuedDate> {
    let raw = raw.trim();
    let mut parts = raw.splitn(3, '-');
    let year = parts.next().filter(|y| y.len() == 4)?;
    let year_num: i32 = year.parse().ok()?;
    let month: u32 = parts.next().map_or(Ok(1), str::parse::<u32>).ok()?;
    let day: u32 = parts.next().map_or(Ok(1), str::parse::<u32>).ok()?;

    let date_boost = NaiveDate::from_ymd_opt(year_num, month, day)
        .map(|d| format!("{}T00:00:00Z", d.format("%Y-%m-%d")));

    Some(IssuedDate {
        date: raw.to_string(),
        fdate: year.to_string(),
        date_boost,
    })
}
