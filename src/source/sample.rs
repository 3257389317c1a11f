//! Built-in sample jobs shown when the API cannot be reached.
//!
//! Keeps the dashboard usable with stale data instead of an empty screen.

use super::{FeedMode, JobItem, Snapshot};

const SAMPLE: &[(&str, &str, &str, &str, bool)] = &[
    (
        "sample-1",
        "Rust backend engineer for logistics API",
        "Design and build a REST service in Rust with PostgreSQL and background workers.",
        "New",
        true,
    ),
    (
        "sample-2",
        "React dashboard for analytics startup",
        "Build charts and CRUD screens on top of an existing FastAPI backend.",
        "New",
        true,
    ),
    (
        "sample-3",
        "Chatbot integration with hosted LLM",
        "Connect a customer support widget to a foundation-model API with retrieval.",
        "Reviewed",
        true,
    ),
    (
        "sample-4",
        "WordPress theme tweaks",
        "Adjust colours and fonts on a small business site.",
        "New",
        false,
    ),
    (
        "sample-5",
        "Data entry from PDF invoices",
        "Copy invoice fields into a spreadsheet.",
        "Archived",
        false,
    ),
];

/// Sample listings for `mode`.  Strong-match mode only gets the strong ones.
pub fn sample_jobs(mode: FeedMode) -> Snapshot {
    SAMPLE
        .iter()
        .filter(|(.., strong)| mode == FeedMode::All || *strong)
        .map(|(id, title, description, status, strong)| {
            let mut item = JobItem::new(id, *title)
                .with_description(*description)
                .with_status(*status);
            let category = if *strong { "Strong" } else { "Low" };
            item.extra
                .insert("relevance".into(), serde_json::Value::from(category));
            item
        })
        .collect()
}
