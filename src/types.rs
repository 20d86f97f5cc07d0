//! Shared data model: `URLRecord`, `HeadData`, and the status enum that ties them
//! together (§3 of `SPEC_FULL.md`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome of validating a single URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlStatus {
    Valid,
    NotValid,
    Unknown,
}

/// A single `<link rel="...">` entry from the document head.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub href: Option<String>,
    #[serde(rename = "as")]
    pub as_: Option<String>,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub hreflang: Option<String>,
}

/// Structured metadata extracted from a document's `<head>` (§4.5).
///
/// Empty (`Default`) when head extraction was not requested, per invariant 3.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadData {
    pub title: Option<String>,
    pub charset: Option<String>,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub meta: HashMap<String, String>,
    #[serde(default)]
    pub link: HashMap<String, Vec<LinkEntry>>,
    #[serde(default)]
    pub jsonld: Vec<serde_json::Value>,
}

impl HeadData {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// One discovered-and-validated URL. Created by the validator; only the ranker
/// mutates it afterward (adding/filtering `relevance_score`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct URLRecord {
    pub url: String,
    pub status: UrlStatus,
    #[serde(default)]
    pub head_data: HeadData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl URLRecord {
    pub fn new(url: String, status: UrlStatus) -> Self {
        Self {
            url,
            status,
            head_data: HeadData::default(),
            relevance_score: None,
            error: None,
        }
    }

    pub fn with_head_data(mut self, head_data: HeadData) -> Self {
        self.head_data = head_data;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
