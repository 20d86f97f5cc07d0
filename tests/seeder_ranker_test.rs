//! Integration coverage for the BM25 ranker (SPEC_FULL.md §4.11), exercised through the
//! public `ranker` module against hand-built `HeadData` the way the validator would
//! have produced it from real `<head>` markup.

use crawl4ai_url_seeder::ranker::{extract_text_context, rank};
use crawl4ai_url_seeder::{HeadData, URLRecord, UrlStatus};

fn record(url: &str, head_data: HeadData) -> URLRecord {
    URLRecord::new(url.to_string(), UrlStatus::Valid).with_head_data(head_data)
}

#[test]
fn end_to_end_scenario_paris_flights_vs_local_bakery() {
    let mut flights = HeadData::default();
    flights.title = Some("Cheap flights to Paris".to_string());
    flights
        .meta
        .insert("description".to_string(), "Book tickets to Paris".to_string());

    let mut bakery = HeadData::default();
    bakery.title = Some("Local bakery".to_string());

    let mut records = vec![
        record("https://example.com/flights", flights),
        record("https://example.com/bakery", bakery),
    ];

    rank(&mut records, "flights paris", Some(0.1));

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, "https://example.com/flights");
    assert!((records[0].relevance_score.unwrap() - 1.0).abs() < 1e-9);
}

#[test]
fn all_scores_fall_within_zero_one_after_normalization() {
    let mut records = Vec::new();
    for i in 0..5 {
        let mut head_data = HeadData::default();
        head_data.title = Some(format!("document about rust number {i}"));
        records.push(record(&format!("https://example.com/{i}"), head_data));
    }
    rank(&mut records, "rust document", None);
    for record in &records {
        let score = record.relevance_score.expect("scored");
        assert!((0.0..=1.0).contains(&score), "score {score} out of range");
    }
}

#[test]
fn threshold_drops_every_record_below_it_and_keeps_sort_stable_above_it() {
    let mut strong = HeadData::default();
    strong.title = Some("rust rust rust programming".to_string());
    let mut weak = HeadData::default();
    weak.title = Some("rust mentioned once".to_string());
    let mut none = HeadData::default();
    none.title = Some("completely unrelated topic".to_string());

    let mut records = vec![
        record("https://example.com/none", none),
        record("https://example.com/weak", weak),
        record("https://example.com/strong", strong),
    ];
    rank(&mut records, "rust programming", Some(0.05));

    assert!(records.iter().all(|r| r.relevance_score.unwrap() >= 0.05));
    for window in records.windows(2) {
        assert!(window[0].relevance_score.unwrap() >= window[1].relevance_score.unwrap());
    }
}

#[test]
fn opengraph_twitter_and_dublin_core_fields_all_contribute_text() {
    let mut head_data = HeadData::default();
    head_data.meta.insert("og:title".to_string(), "OpenGraph Title".to_string());
    head_data
        .meta
        .insert("twitter:description".to_string(), "Twitter blurb".to_string());
    head_data.meta.insert("dc.creator".to_string(), "Jane Author".to_string());

    let text = extract_text_context(&head_data);
    assert!(text.contains("OpenGraph Title"));
    assert!(text.contains("Twitter blurb"));
    assert!(text.contains("Jane Author"));
}

#[test]
fn record_with_no_head_data_scores_zero_and_does_not_panic() {
    let mut records = vec![record("https://example.com/empty", HeadData::default())];
    rank(&mut records, "anything at all", None);
    assert_eq!(records[0].relevance_score, Some(0.0));
}
