//! BM25 ranking over text assembled from head metadata (§4.11).
//!
//! No BM25 crate was found anywhere in the example pack, so this hand-rolls Okapi
//! BM25 the way the teacher hand-rolls its own lock-free rate limiter
//! (`crawl_engine::rate_limiter`) rather than reaching for a crate that doesn't exist
//! in this ecosystem niche. Grounded on
//! `original_source/crawl4ai/async_url_seeder.py::_calculate_bm25_score`,
//! `_extract_text_context`.

use crate::types::{HeadData, URLRecord};

const K1: f64 = 1.5;
const B: f64 = 0.75;

const META_FIELDS: &[&str] = &["description", "keywords", "author", "subject", "summary", "abstract"];
const OG_FIELDS: &[&str] = &["og:title", "og:description", "og:site_name", "article:tag"];
const TWITTER_FIELDS: &[&str] = &["twitter:title", "twitter:description", "twitter:image:alt"];
const DC_FIELDS: &[&str] = &["dc.title", "dc.description", "dc.subject", "dc.creator"];
const JSONLD_TOP_FIELDS: &[&str] = &["name", "headline", "description", "abstract", "keywords"];
const JSONLD_GRAPH_FIELDS: &[&str] = &["name", "headline", "description"];

/// Assembles the text a document contributes to BM25 scoring (§4.11).
pub fn extract_text_context(head_data: &HeadData) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(title) = &head_data.title {
        parts.push(title.clone());
    }

    for field in META_FIELDS.iter().chain(OG_FIELDS).chain(TWITTER_FIELDS).chain(DC_FIELDS) {
        if let Some(value) = head_data.meta.get(*field) {
            parts.push(value.clone());
        }
    }

    for block in &head_data.jsonld {
        collect_jsonld_fields(block, JSONLD_TOP_FIELDS, &mut parts);
        if let Some(graph) = block.get("@graph").and_then(|g| g.as_array()) {
            for element in graph {
                collect_jsonld_fields(element, JSONLD_GRAPH_FIELDS, &mut parts);
            }
        }
    }

    parts.join(" ")
}

fn collect_jsonld_fields(value: &serde_json::Value, fields: &[&str], out: &mut Vec<String>) {
    let Some(obj) = value.as_object() else {
        return;
    };
    for field in fields {
        match obj.get(*field) {
            Some(serde_json::Value::String(s)) => out.push(s.clone()),
            Some(serde_json::Value::Array(items)) => {
                for item in items {
                    if let Some(s) = item.as_str() {
                        out.push(s.to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase().split_whitespace().map(str::to_string).collect()
}

/// Okapi BM25 over `documents`, tokenized the same way as `query`.
fn bm25_scores(query_tokens: &[String], documents: &[Vec<String>]) -> Vec<f64> {
    let n = documents.len();
    if n == 0 || query_tokens.is_empty() {
        return vec![0.0; n];
    }

    let doc_lens: Vec<usize> = documents.iter().map(Vec::len).collect();
    let avg_len = doc_lens.iter().sum::<usize>() as f64 / n as f64;

    let mut doc_freq: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
    for doc in documents {
        let unique: std::collections::HashSet<&str> = doc.iter().map(String::as_str).collect();
        for term in unique {
            *doc_freq.entry(term).or_insert(0) += 1;
        }
    }

    let idf = |term: &str| -> f64 {
        let df = doc_freq.get(term).copied().unwrap_or(0) as f64;
        (((n as f64 - df + 0.5) / (df + 0.5)) + 1.0).ln()
    };

    documents
        .iter()
        .zip(&doc_lens)
        .map(|(doc, &doc_len)| {
            let mut term_freq: std::collections::HashMap<&str, usize> = std::collections::HashMap::new();
            for term in doc {
                *term_freq.entry(term.as_str()).or_insert(0) += 1;
            }

            query_tokens
                .iter()
                .map(|term| {
                    let tf = term_freq.get(term.as_str()).copied().unwrap_or(0) as f64;
                    if tf == 0.0 {
                        return 0.0;
                    }
                    let numerator = tf * (K1 + 1.0);
                    let denominator = tf + K1 * (1.0 - B + B * (doc_len as f64 / avg_len));
                    idf(term) * numerator / denominator
                })
                .sum()
        })
        .collect()
}

/// Scores, normalizes, thresholds, and sorts `records` in place against `query`.
/// Preconditions (non-fatal if violated: an empty query or all-empty documents just
/// yields all-zero scores, per the original implementation): `query` is expected to be
/// non-empty and at least one record to have non-empty `head_data`.
pub fn rank(records: &mut Vec<URLRecord>, query: &str, score_threshold: Option<f64>) {
    let query_tokens = tokenize(query);
    let documents: Vec<Vec<String>> = records
        .iter()
        .map(|r| tokenize(&extract_text_context(&r.head_data)))
        .collect();

    let raw_scores = bm25_scores(&query_tokens, &documents);
    let max_score = raw_scores.iter().cloned().fold(f64::MIN, f64::max);
    let normalizer = if max_score > 0.0 { max_score } else { 1.0 };

    for (record, (raw, doc)) in records.iter_mut().zip(raw_scores.iter().zip(&documents)) {
        let score = if doc.is_empty() { 0.0 } else { raw / normalizer };
        record.relevance_score = Some(score);
    }

    if let Some(threshold) = score_threshold {
        records.retain(|r| r.relevance_score.unwrap_or(0.0) >= threshold);
    }

    records.sort_by(|a, b| {
        b.relevance_score
            .unwrap_or(0.0)
            .partial_cmp(&a.relevance_score.unwrap_or(0.0))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
