//! # Query Builder
//!
//! Turns a loose [`SearchParams`] into the exact [`SearchQueryDocument`] the
//! remote search API expects. Pure: no I/O, never fails.
//!
//! Two wire details are deliberate and must be kept:
//! - `maxResults` and `offset` are sent as strings;
//! - `facets.names` always carries the ontology and its `Id` sibling.

use regex::Regex;
use serde::{Deserialize, Serialize};
use static_init::dynamic;

pub const DEFAULT_MAX_RESULTS: u32 = 1;
pub const DEFAULT_OFFSET: u32 = 0;
pub const DEFAULT_ASPECTS: [&str; 3] = ["title", "lifecycle", "images"];
pub const DEFAULT_ONTOLOGY: &str = "people";

const CURATIONS: [&str; 2] = ["ARTICLES", "BLOGS"];
const SORT_ORDER: &str = "DESC";
const SORT_FIELD: &str = "lastPublishDateTime";
const ALL_FACET_ELEMENTS: i64 = -1;
const ID_SUFFIX: &str = "Id";

// Basic ontology names only (people, peopleId, ...). Other fields such as
// lastPublishDateTime must not match. The value never spans a line terminator.
#[dynamic]
static CONSTRAINT_RE: Result<Regex, regex::Error> =
    Regex::new(r"^([a-z]+(?:Id)?):([^\n\r\x{2028}\x{2029}]+)$");

/// Caller-facing search parameters. Every field is optional; unset fields take
/// the defaults when the query is built and are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspects: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology: Option<String>,
}

impl SearchParams {
    /// Parameters carrying only a query string.
    pub fn query(query_string: impl Into<String>) -> Self {
        Self {
            query_string: Some(query_string.into()),
            ..Default::default()
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_aspects<I, S>(mut self, aspects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aspects = Some(aspects.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_constraints<I, S>(mut self, constraints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.constraints = Some(constraints.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ontology(mut self, ontology: impl Into<String>) -> Self {
        self.ontology = Some(ontology.into());
        self
    }

    /// Shallow merge over the defaults.
    pub fn resolve(&self) -> ResolvedSearchParams {
        let defaults = ResolvedSearchParams::default();
        ResolvedSearchParams {
            query_string: self.query_string.clone().unwrap_or(defaults.query_string),
            max_results: self.max_results.unwrap_or(defaults.max_results),
            offset: self.offset.unwrap_or(defaults.offset),
            aspects: self.aspects.clone().unwrap_or(defaults.aspects),
            constraints: self.constraints.clone().unwrap_or(defaults.constraints),
            ontology: self.ontology.clone().unwrap_or(defaults.ontology),
        }
    }
}

/// [`SearchParams`] with every default filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSearchParams {
    pub query_string: String,
    pub max_results: u32,
    pub offset: u32,
    pub aspects: Vec<String>,
    pub constraints: Vec<String>,
    pub ontology: String,
}

impl Default for ResolvedSearchParams {
    fn default() -> Self {
        Self {
            query_string: String::new(),
            max_results: DEFAULT_MAX_RESULTS,
            offset: DEFAULT_OFFSET,
            aspects: DEFAULT_ASPECTS.iter().map(|a| a.to_string()).collect(),
            constraints: Vec::new(),
            ontology: DEFAULT_ONTOLOGY.to_string(),
        }
    }
}

/// The JSON body POSTed to the search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQueryDocument {
    pub query_string: String,
    pub query_context: QueryContext,
    pub result_context: ResultContext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryContext {
    pub curations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultContext {
    pub max_results: String,
    pub offset: String,
    pub aspects: Vec<String>,
    pub sort_order: String,
    pub sort_field: String,
    pub facets: Facets,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Facets {
    pub names: Vec<String>,
    pub max_elements: i64,
}

/// Quotes the value of a `facet:value` constraint; anything else is returned
/// unchanged.
///
/// ```
/// use lib_common::content::query::rephrase_constraint;
///
/// assert_eq!(rephrase_constraint("people:Jane Doe"), r#"people:"Jane Doe""#);
/// assert_eq!(rephrase_constraint("lastPublishDateTime:>2020"), "lastPublishDateTime:>2020");
/// ```
pub fn rephrase_constraint(constraint: &str) -> String {
    let Ok(re) = &*CONSTRAINT_RE else {
        return constraint.to_string();
    };

    match re.captures(constraint) {
        Some(caps) => format!("{}:\"{}\"", &caps[1], &caps[2]),
        None => constraint.to_string(),
    }
}

/// `[ontology, sibling]`, where the sibling toggles the `Id` suffix.
pub fn derive_facets(ontology: &str) -> Vec<String> {
    let sibling = match ontology.strip_suffix(ID_SUFFIX) {
        Some(stem) => stem.to_string(),
        None => format!("{}{}", ontology, ID_SUFFIX),
    };
    vec![ontology.to_string(), sibling]
}

/// Builds the search document for `params`.
///
/// An explicit query string always wins; constraints are only used to derive
/// one when the query string is empty.
pub fn build_query(params: &SearchParams) -> SearchQueryDocument {
    let resolved = params.resolve();

    let query_string = if resolved.query_string.is_empty() && !resolved.constraints.is_empty() {
        resolved
            .constraints
            .iter()
            .map(|c| rephrase_constraint(c))
            .collect::<Vec<_>>()
            .join(" and ")
    } else {
        resolved.query_string
    };

    SearchQueryDocument {
        query_string,
        query_context: QueryContext {
            curations: CURATIONS.iter().map(|c| c.to_string()).collect(),
        },
        result_context: ResultContext {
            max_results: resolved.max_results.to_string(),
            offset: resolved.offset.to_string(),
            aspects: resolved.aspects,
            sort_order: SORT_ORDER.to_string(),
            sort_field: SORT_FIELD.to_string(),
            facets: Facets {
                names: derive_facets(&resolved.ontology),
                max_elements: ALL_FACET_ELEMENTS,
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_produce_expected_document() {
        let doc = serde_json::to_value(build_query(&SearchParams::default())).unwrap();
        assert_eq!(
            doc,
            json!({
                "queryString": "",
                "queryContext": {"curations": ["ARTICLES", "BLOGS"]},
                "resultContext": {
                    "maxResults": "1",
                    "offset": "0",
                    "aspects": ["title", "lifecycle", "images"],
                    "sortOrder": "DESC",
                    "sortField": "lastPublishDateTime",
                    "facets": {"names": ["people", "peopleId"], "maxElements": -1}
                }
            })
        );
    }

    #[test]
    fn test_constraints_are_quoted_and_joined() {
        let params = SearchParams::default().with_constraints(["people:Jane Doe", "organisationsId:abc-123", "Brexit"]);
        let doc = build_query(&params);
        assert_eq!(
            doc.query_string,
            r#"people:"Jane Doe" and organisationsId:"abc-123" and Brexit"#
        );
    }

    #[test]
    fn test_non_ontology_constraints_pass_through() {
        assert_eq!(
            rephrase_constraint("lastPublishDateTime:>2020-05-20T18:40:00Z"),
            "lastPublishDateTime:>2020-05-20T18:40:00Z"
        );
        assert_eq!(rephrase_constraint("People:x"), "People:x");
        assert_eq!(rephrase_constraint("people:"), "people:");
        assert_eq!(rephrase_constraint("plain text"), "plain text");
    }

    #[test]
    fn test_values_spanning_line_terminators_pass_through() {
        for constraint in ["people:a\rb", "people:a\nb", "people:a\u{2028}b", "people:a\u{2029}b"] {
            assert_eq!(rephrase_constraint(constraint), constraint);
        }
        assert_eq!(rephrase_constraint("people:a\tb"), "people:\"a\tb\"");
    }

    #[test]
    fn test_explicit_query_string_wins_over_constraints() {
        let params = SearchParams::query("banks").with_constraints(["people:Jane Doe"]);
        assert_eq!(build_query(&params).query_string, "banks");
    }

    #[test]
    fn test_facets_toggle_id_suffix() {
        assert_eq!(derive_facets("people"), vec!["people", "peopleId"]);
        assert_eq!(derive_facets("brandId"), vec!["brandId", "brand"]);

        for ontology in ["regions", "topicsId", "primarySection"] {
            let names = derive_facets(ontology);
            assert_eq!(names.len(), 2);
            assert_eq!(names[0], ontology);
            assert_eq!(names.iter().filter(|n| n.ends_with("Id")).count(), 1);
        }
    }

    #[test]
    fn test_numeric_fields_serialize_as_strings() {
        let params = SearchParams::query("x").with_max_results(100).with_offset(20);
        let doc = serde_json::to_value(build_query(&params)).unwrap();
        assert_eq!(doc["resultContext"]["maxResults"], json!("100"));
        assert_eq!(doc["resultContext"]["offset"], json!("20"));
    }

    #[test]
    fn test_build_query_is_idempotent() {
        let params = SearchParams::default()
            .with_constraints(["topics:Oil"])
            .with_ontology("topicsId")
            .with_aspects(["title"]);
        assert_eq!(build_query(&params), build_query(&params));
    }

    #[test]
    fn test_params_serialize_only_supplied_fields() {
        let value = serde_json::to_value(SearchParams::query("x")).unwrap();
        assert_eq!(value, json!({"queryString": "x"}));
    }
}
