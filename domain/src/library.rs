//! Wire types of the remote paper service.
//!
//! Field names follow the service's snake_case JSON.

use crate::models::Source;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(default)]
    pub papers_indexed: u64,
    #[serde(default)]
    pub chunks_indexed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperSummary {
    pub paper_name: String,
    #[serde(default)]
    pub chunk_count: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaperList {
    #[serde(default)]
    pub papers: Vec<PaperSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadReceipt {
    pub paper_name: String,
    #[serde(default)]
    pub chunks_created: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub question: String,
    pub auto_fetch_arxiv: bool,
    pub paper_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<Source>,
    /// Name of a paper the service fetched from arXiv while answering.
    #[serde(default)]
    pub arxiv_fetched: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArxivSearchRequest {
    pub query: String,
    pub max_results: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArxivPaper {
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(rename = "abstract", default)]
    pub summary: String,
    pub arxiv_id: String,
}

impl ArxivPaper {
    pub fn authors_line(&self) -> String {
        let mut line = self
            .authors
            .iter()
            .take(3)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        if self.authors.len() > 3 {
            line.push_str(" et al.");
        }
        line
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArxivSearchResults {
    #[serde(default)]
    pub papers: Vec<ArxivPaper>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArxivAddition {
    pub paper_name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArxivDownload {
    pub paper_name: String,
}

/// Case-insensitive substring filter over paper names. An empty query keeps everything.
pub fn filter_papers<'a>(papers: &'a [PaperSummary], query: &str) -> Vec<&'a PaperSummary> {
    let needle = query.trim().to_lowercase();
    papers
        .iter()
        .filter(|p| needle.is_empty() || p.paper_name.to_lowercase().contains(&needle))
        .collect()
}
