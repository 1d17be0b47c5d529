//! Search criteria and the syndication feed search results arrive in.
//!
//! # Design
//! Search results use an Atom-shaped envelope: a list of links plus ordered
//! entries, each entry's `content` holding one result contract. The envelope
//! is serialized as JSON like every other body. A link with relation
//! [`NEXT_RESULTS`] points at the next page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Link relation marking the next page of search results.
pub const NEXT_RESULTS: &str = "next-results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchOperator {
    Equals,
    NotEquals,
    Contains,
    GreaterThan,
    LessThan,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub field: String,
    pub operator: SearchOperator,
    pub value: String,
    #[serde(default)]
    pub is_numeric: bool,
}

/// A conjunction of comparisons; a search matches any of its criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criteria {
    #[serde(default)]
    pub comparisons: Vec<Comparison>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn and(mut self, field: impl Into<String>, operator: SearchOperator, value: impl Into<String>) -> Self {
        self.comparisons.push(Comparison {
            field: field.into(),
            operator,
            value: value.into(),
            is_numeric: false,
        });
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_page_size: Option<u32>,
    #[serde(default)]
    pub multi_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(default)]
    pub is_mapping_search: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Search {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
    #[serde(default)]
    pub options: SearchOptions,
    #[serde(default)]
    pub criteria: Vec<Criteria>,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matching(criteria: Criteria) -> Self {
        Self::new().or(criteria)
    }

    pub fn or(mut self, criteria: Criteria) -> Self {
        self.criteria.push(criteria);
        self
    }

    /// Ask for results in pages of at most `size` entries.
    pub fn paged(mut self, size: u32) -> Self {
        self.options.max_page_size = Some(size);
        self.options.multi_page = true;
        self
    }

    pub fn as_of(mut self, at: DateTime<Utc>) -> Self {
        self.as_of = Some(at);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLink {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub content: T,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub links: Vec<FeedLink>,
    #[serde(default = "Vec::new")]
    pub entries: Vec<FeedEntry<T>>,
}

impl<T> Feed<T> {
    /// Href of the first `next-results` link, if any.
    pub fn next_page(&self) -> Option<&str> {
        self.links
            .iter()
            .find(|link| link.rel == NEXT_RESULTS)
            .map(|link| link.href.as_str())
    }

    /// Entry contents in feed order.
    pub fn into_items(self) -> Vec<T> {
        self.entries.into_iter().map(|entry| entry.content).collect()
    }
}
