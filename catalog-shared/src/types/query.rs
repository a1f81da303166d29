//! Structured query types.
//!
//! Queries are typed values that every index provider interprets the same way: the
//! OpenSearch provider translates them into query DSL, the in-memory provider
//! evaluates them directly. A small parser accepts the Lucene-style filter strings
//! used on the command line (`-editorial_status:imported`, `catalog:"Temporäre Daten"`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::index_document::fields;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    MatchAll,
    /// Exact match on a keyword value.
    Term { field: String, value: String },
    /// Exact match on any of the values.
    Terms { field: String, values: Vec<String> },
    /// The field is present and non-empty.
    Exists { field: String },
    Prefix { field: String, value: String },
    /// Edit-distance match with automatic fuzziness.
    Fuzzy { field: String, value: String },
    /// Lexicographic/date range; bounds are inclusive-lower, exclusive-upper.
    Range {
        field: String,
        gte: Option<String>,
        lt: Option<String>,
    },
    Ids(Vec<String>),
    Not(Box<Query>),
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms(field: impl Into<String>, values: Vec<String>) -> Self {
        Query::Terms {
            field: field.into(),
            values,
        }
    }

    pub fn exists(field: impl Into<String>) -> Self {
        Query::Exists {
            field: field.into(),
        }
    }

    pub fn prefix(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Prefix {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn fuzzy(field: impl Into<String>, value: impl Into<String>) -> Self {
        Query::Fuzzy {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn before(field: impl Into<String>, lt: impl Into<String>) -> Self {
        Query::Range {
            field: field.into(),
            gte: None,
            lt: Some(lt.into()),
        }
    }

    pub fn ids(ids: Vec<String>) -> Self {
        Query::Ids(ids)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(query: Query) -> Self {
        Query::Not(Box::new(query))
    }

    /// Conjunction; a single clause is returned unwrapped.
    pub fn and(mut clauses: Vec<Query>) -> Self {
        match clauses.len() {
            0 => Query::MatchAll,
            1 => clauses.remove(0),
            _ => Query::And(clauses),
        }
    }

    pub fn or(clauses: Vec<Query>) -> Self {
        Query::Or(clauses)
    }

    /// The filter hiding deleted records from non-superadmin reads.
    pub fn not_deleted() -> Self {
        Query::not(Query::term(fields::EDITORIAL_STATUS, "deleted"))
    }

    /// Parse a Lucene-style filter string.
    ///
    /// Clauses are separated by whitespace and combined conjunctively. Each clause
    /// is `[-]field:value`, where the value may be quoted, `*` (field exists),
    /// end in `*` (prefix) or end in `~` (fuzzy). `*:*` matches everything.
    ///
    /// # Example
    ///
    /// ```
    /// use catalog_shared::Query;
    ///
    /// let query = Query::parse("-editorial_status:imported").unwrap();
    /// assert_eq!(query, Query::not(Query::term("editorial_status", "imported")));
    /// ```
    pub fn parse(input: &str) -> Result<Self, QueryParseError> {
        let clauses = tokenize(input)?
            .into_iter()
            .map(|token| parse_clause(&token))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Query::and(clauses))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueryParseError {
    #[error("Unterminated quote in query '{0}'")]
    UnterminatedQuote(String),
    #[error("Clause '{0}' is not of the form field:value")]
    MissingField(String),
    #[error("Empty value in clause '{0}'")]
    EmptyValue(String),
}

fn tokenize(input: &str) -> Result<Vec<String>, QueryParseError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err(QueryParseError::UnterminatedQuote(input.to_string()));
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn parse_clause(token: &str) -> Result<Query, QueryParseError> {
    let (negated, body) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };

    if body == "*:*" {
        return Ok(if negated {
            Query::not(Query::MatchAll)
        } else {
            Query::MatchAll
        });
    }

    let (field, raw_value) = body
        .split_once(':')
        .filter(|(field, _)| !field.is_empty())
        .ok_or_else(|| QueryParseError::MissingField(token.to_string()))?;

    let query = if raw_value.len() >= 2 && raw_value.starts_with('"') && raw_value.ends_with('"')
    {
        Query::term(field, &raw_value[1..raw_value.len() - 1])
    } else if raw_value.is_empty() {
        return Err(QueryParseError::EmptyValue(token.to_string()));
    } else if raw_value == "*" {
        Query::exists(field)
    } else if let Some(prefix) = raw_value.strip_suffix('*') {
        Query::prefix(field, prefix)
    } else if let Some(fuzzy) = raw_value.strip_suffix('~') {
        Query::fuzzy(field, fuzzy)
    } else {
        Query::term(field, raw_value)
    };

    Ok(if negated { Query::not(query) } else { query })
}

/// A sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// A paged, faceted query against one core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: Query,
    #[serde(default)]
    pub filters: Vec<Query>,
    #[serde(default)]
    pub sort: Vec<SortField>,
    #[serde(default)]
    pub facets: Vec<String>,
    #[serde(default = "default_facet_limit")]
    pub facet_limit: usize,
    #[serde(default)]
    pub start: usize,
    #[serde(default = "default_rows")]
    pub rows: usize,
    /// Field projection; `None` returns whole documents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
}

fn default_rows() -> usize {
    20
}

fn default_facet_limit() -> usize {
    50
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            filters: Vec::new(),
            sort: Vec::new(),
            facets: Vec::new(),
            facet_limit: default_facet_limit(),
            start: 0,
            rows: default_rows(),
            fields: None,
        }
    }

    pub fn match_all() -> Self {
        Self::new(Query::MatchAll)
    }

    pub fn with_filter(mut self, filter: Query) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_facet(mut self, field: impl Into<String>) -> Self {
        self.facets.push(field.into());
        self
    }

    pub fn with_page(mut self, start: usize, rows: usize) -> Self {
        self.start = start;
        self.rows = rows;
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    /// Append the engine-wide tie-breaks: `changed desc`, then `id asc`.
    pub fn with_default_tie_breaks(mut self) -> Self {
        if !self.sort.iter().any(|s| s.field == fields::CHANGED) {
            self.sort.push(SortField::desc(fields::CHANGED));
        }
        if !self.sort.iter().any(|s| s.field == fields::ID) {
            self.sort.push(SortField::asc(fields::ID));
        }
        self
    }

    /// Query and filters folded into one conjunction.
    pub fn effective_query(&self) -> Query {
        let mut clauses = Vec::with_capacity(self.filters.len() + 1);
        if self.query != Query::MatchAll {
            clauses.push(self.query.clone());
        }
        clauses.extend(self.filters.iter().cloned());
        Query::and(clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_negated_term() {
        let query = Query::parse("-editorial_status:deleted").unwrap();
        assert_eq!(query, Query::not_deleted());
    }

    #[test]
    fn test_parse_quoted_value_with_spaces() {
        let query = Query::parse("catalog:\"Temporäre Daten\" pubtype:Monograph").unwrap();
        assert_eq!(
            query,
            Query::And(vec![
                Query::term("catalog", "Temporäre Daten"),
                Query::term("pubtype", "Monograph"),
            ])
        );
    }

    #[test]
    fn test_parse_special_values() {
        assert_eq!(Query::parse("*:*").unwrap(), Query::MatchAll);
        assert_eq!(Query::parse("").unwrap(), Query::MatchAll);
        assert_eq!(Query::parse("doi:*").unwrap(), Query::exists("doi"));
        assert_eq!(Query::parse("title:Quant*").unwrap(), Query::prefix("title", "Quant"));
        assert_eq!(Query::parse("name:Smyth~").unwrap(), Query::fuzzy("name", "Smyth"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Query::parse("justaword"),
            Err(QueryParseError::MissingField(_))
        ));
        assert!(matches!(
            Query::parse("title:\"open"),
            Err(QueryParseError::UnterminatedQuote(_))
        ));
        assert!(matches!(
            Query::parse("title:"),
            Err(QueryParseError::EmptyValue(_))
        ));
    }

    #[test]
    fn test_default_tie_breaks_are_appended_once() {
        let request = SearchRequest::match_all()
            .with_sort(SortField::asc("title"))
            .with_default_tie_breaks()
            .with_default_tie_breaks();
        assert_eq!(
            request.sort,
            vec![
                SortField::asc("title"),
                SortField::desc("changed"),
                SortField::asc("id"),
            ]
        );
    }

    #[test]
    fn test_effective_query_folds_filters() {
        let request = SearchRequest::match_all().with_filter(Query::not_deleted());
        assert_eq!(request.effective_query(), Query::not_deleted());
    }
}
