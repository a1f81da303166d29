use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use catalog_repository::IndexGateway;
use catalog_shared::types::person::split_name;
use catalog_shared::{fields, Catalog, Core, IndexDocument, Query, SearchRequest, Visibility};
use serde::Serialize;
use tracing::debug;

use super::queue::TaskMap;
use super::DedupConfig;
use crate::errors::EngineError;
use crate::projector::names;

/// One `authority#local_id#display_name` token of a work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorityRef {
    pub authority: String,
    pub local_id: String,
    pub display_name: String,
}

impl FromStr for AuthorityRef {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let mut parts = token.splitn(3, '#').map(str::trim);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(authority), Some(local_id), Some(display_name))
                if !authority.is_empty() && !local_id.is_empty() && !display_name.is_empty() =>
            {
                Ok(Self {
                    authority: authority.to_string(),
                    local_id: local_id.to_string(),
                    display_name: display_name.to_string(),
                })
            }
            _ => Err(format!("malformed authority token '{}'", token)),
        }
    }
}

/// Parse every authority token of a work. One malformed token rejects the work.
pub fn parse_authorities<'a>(
    tokens: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<AuthorityRef>, String> {
    tokens.into_iter().map(AuthorityRef::from_str).collect()
}

/// Match probability in percent. Identical names score 100.
pub fn probability(display_name: &str, candidate_name: &str) -> u8 {
    let (a, b) = (display_name.trim(), candidate_name.trim());
    if a == b {
        return 100;
    }
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// A person record that may be the person behind an authority token.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub authority: String,
    pub local_id: String,
    pub display_name: String,
    pub person_id: String,
    pub person_name: String,
    pub probability: u8,
}

/// Queue payload for one publication.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub publication_id: String,
    pub title: String,
    pub candidates: Vec<Candidate>,
}

/// Outcome of checking one work.
#[derive(Debug)]
pub enum WorkCheck {
    Rejected(String),
    Checked {
        references: usize,
        task: Option<Task>,
    },
}

#[derive(Clone)]
pub struct CandidateGenerator {
    gateway: Arc<IndexGateway>,
    config: DedupConfig,
}

impl CandidateGenerator {
    pub fn new(gateway: Arc<IndexGateway>, config: DedupConfig) -> Self {
        Self { gateway, config }
    }

    pub fn gateway(&self) -> &IndexGateway {
        &self.gateway
    }

    /// Works carrying at least one authority token, with the fields the generator reads.
    pub fn scan_query() -> (Query, Option<Vec<String>>) {
        (
            Query::exists(names::PERSON_AUTHORITY),
            Some(
                [fields::ID, "title", fields::CATALOG, names::PERSON_AUTHORITY]
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            ),
        )
    }

    pub async fn check_work(&self, work: &IndexDocument) -> Result<WorkCheck, EngineError> {
        let references = match parse_authorities(work.get_strs(names::PERSON_AUTHORITY)) {
            Ok(references) => references,
            Err(reason) => return Ok(WorkCheck::Rejected(reason)),
        };

        let mut candidates = Vec::new();
        for reference in &references {
            candidates.extend(self.candidates_for(reference).await?);
        }
        let task = (!candidates.is_empty()).then(|| Task {
            publication_id: work.id().unwrap_or_default().to_string(),
            title: work.get_str("title").unwrap_or_default().to_string(),
            candidates,
        });
        Ok(WorkCheck::Checked {
            references: references.len(),
            task,
        })
    }

    /// Person records resembling the display name of `reference`.
    pub async fn candidates_for(
        &self,
        reference: &AuthorityRef,
    ) -> Result<Vec<Candidate>, EngineError> {
        let (family, given) = split_name(&reference.display_name);
        let family = family.to_lowercase();
        if family.is_empty() {
            return Ok(Vec::new());
        }

        let mut clauses = vec![Query::fuzzy(names::NAME_FAMILY, family.clone())];
        clauses.extend(
            given
                .split_whitespace()
                .map(|token| Query::fuzzy(names::NAME_GIVEN, token.to_lowercase())),
        );
        let people = self.people(Query::and(clauses)).await?;
        if !people.is_empty() {
            return Ok(self.score(reference, &people, |_| true));
        }

        debug!(name = %reference.display_name, "No full-name match, retrying on family name");
        let people = self.people(Query::fuzzy(names::NAME_FAMILY, family)).await?;
        Ok(self.score(reference, &people, |name| {
            split_name(name).1.chars().count() > 2
        }))
    }

    async fn people(&self, query: Query) -> Result<Vec<IndexDocument>, EngineError> {
        let request = SearchRequest::new(query)
            .with_page(0, self.config.max_candidates)
            .with_fields(vec![fields::ID.to_string(), "name".to_string()]);
        let page = self
            .gateway
            .find(Core::Person, request, Visibility::Public)
            .await
            .map_err(|e| EngineError::from_index(e, "dedup"))?;
        Ok(page.docs)
    }

    fn score(
        &self,
        reference: &AuthorityRef,
        people: &[IndexDocument],
        keep: impl Fn(&str) -> bool,
    ) -> Vec<Candidate> {
        people
            .iter()
            .filter_map(|person| {
                let person_name = person.get_str("name")?;
                if !keep(person_name) {
                    return None;
                }
                let probability = probability(&reference.display_name, person_name);
                (probability >= self.config.min_probability).then(|| Candidate {
                    authority: reference.authority.clone(),
                    local_id: reference.local_id.clone(),
                    display_name: reference.display_name.clone(),
                    person_id: person.id().unwrap_or_default().to_string(),
                    person_name: person_name.to_string(),
                    probability,
                })
            })
            .collect()
    }
}

/// File a task under every catalog its work belongs to.
pub fn file_task(
    tasks: &mut TaskMap,
    work: &IndexDocument,
    task: &Task,
) -> Result<usize, EngineError> {
    let payload = serde_json::to_value(task)?;
    let mut filed = 0;
    for label in work.get_strs(fields::CATALOG) {
        let Ok(catalog) = Catalog::from_str(label) else {
            debug!(publication_id = %task.publication_id, label, "Unknown catalog, task not filed");
            continue;
        };
        tasks
            .entry(catalog)
            .or_insert_with(BTreeMap::new)
            .insert(task.publication_id.clone(), payload.clone());
        filed += 1;
    }
    Ok(filed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_repository::InMemoryProvider;

    fn person_doc(id: &str, name: &str) -> IndexDocument {
        let mut doc = IndexDocument::new(id);
        let (family, given) = split_name(name);
        doc.set("name", name);
        doc.set(names::NAME_FAMILY, family.to_lowercase());
        for token in given.split_whitespace() {
            doc.push(names::NAME_GIVEN, token.to_lowercase());
        }
        doc.set(fields::EDITORIAL_STATUS, "new");
        doc
    }

    async fn generator(people: Vec<IndexDocument>) -> CandidateGenerator {
        let gateway = Arc::new(IndexGateway::new(Arc::new(InMemoryProvider::new())));
        gateway.ensure_cores().await.unwrap();
        gateway.put(Core::Person, people).await.unwrap();
        CandidateGenerator::new(gateway, DedupConfig::default())
    }

    #[test]
    fn test_parse_authorities_rejects_malformed_tokens() {
        let parsed = parse_authorities(["gnd#118540238#Goethe, Johann Wolfgang"]).unwrap();
        assert_eq!(parsed[0].authority, "gnd");
        assert_eq!(parsed[0].local_id, "118540238");
        assert_eq!(parsed[0].display_name, "Goethe, Johann Wolfgang");

        assert!(parse_authorities(["gnd#123"]).is_err());
        assert!(parse_authorities(["gnd##Smith, John"]).is_err());
        assert!(parse_authorities(["gnd#1#Smith, John", "broken"]).is_err());
    }

    #[test]
    fn test_display_name_may_contain_separator() {
        let parsed: AuthorityRef = "orcid#0000-0001#Doe, Jane # Jr.".parse().unwrap();
        assert_eq!(parsed.display_name, "Doe, Jane # Jr.");
    }

    #[test]
    fn test_probability() {
        assert_eq!(probability("Smith, John", "Smith, John"), 100);
        let close = probability("Smith, John", "Smyth, John");
        assert!(close > 80 && close < 100);
        assert!(probability("Smith, John", "Miller, Anna") < 50);
    }

    #[tokio::test]
    async fn test_exact_name_scores_100() {
        let generator = generator(vec![
            person_doc("P1", "Smith, John"),
            person_doc("P2", "Miller, Anna"),
        ])
        .await;
        let reference: AuthorityRef = "G#L#Smith, John".parse().unwrap();

        let candidates = generator.candidates_for(&reference).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].person_id, "P1");
        assert_eq!(candidates[0].probability, 100);
    }

    #[tokio::test]
    async fn test_family_fallback_skips_initials() {
        let generator = generator(vec![
            person_doc("P1", "Smith, Jonathan"),
            person_doc("P2", "Smith, J."),
        ])
        .await;
        let reference: AuthorityRef = "gnd#1#Smith, Xaver".parse().unwrap();

        let candidates = generator.candidates_for(&reference).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].person_id, "P1");
        assert!(candidates[0].probability < 100);
    }

    #[tokio::test]
    async fn test_malformed_work_is_rejected() {
        let generator = generator(vec![person_doc("P1", "Smith, John")]).await;
        let mut work = IndexDocument::new("W1");
        work.push(names::PERSON_AUTHORITY, "gnd#1#Smith, John");
        work.push(names::PERSON_AUTHORITY, "gnd#only-two");

        assert!(matches!(
            generator.check_work(&work).await.unwrap(),
            WorkCheck::Rejected(_)
        ));
    }

    #[test]
    fn test_file_task_per_catalog() {
        let mut work = IndexDocument::new("W1");
        work.push(fields::CATALOG, Catalog::Rub.as_str());
        work.push(fields::CATALOG, Catalog::Tudo.as_str());
        let task = Task {
            publication_id: "W1".to_string(),
            title: "A Book".to_string(),
            candidates: Vec::new(),
        };

        let mut tasks = TaskMap::new();
        assert_eq!(file_task(&mut tasks, &work, &task).unwrap(), 2);
        assert!(tasks[&Catalog::Rub].contains_key("W1"));
        assert!(tasks[&Catalog::Tudo].contains_key("W1"));
    }
}
