use anyhow::Context;
use domain::api::PaperApi;
use domain::library::{filter_papers, ArxivPaper, IndexStats, PaperSummary, UploadReceipt};
use domain::upload_policy::UploadPolicy;
use shared::types::Result;
use std::path::Path;

/// Client-side view of the indexed library: cached listing and statistics
/// plus the operations that change them.
pub struct LibraryService<A> {
    api: A,
    policy: UploadPolicy,
    papers: Vec<PaperSummary>,
    stats: Option<IndexStats>,
    arxiv_max_results: u32,
}

impl<A: PaperApi> LibraryService<A> {
    pub fn new(api: A, arxiv_max_results: u32) -> Self {
        Self {
            api,
            policy: UploadPolicy::new(),
            papers: Vec::new(),
            stats: None,
            arxiv_max_results: arxiv_max_results.max(1),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn papers(&self) -> &[PaperSummary] {
        &self.papers
    }

    pub fn stats(&self) -> Option<&IndexStats> {
        self.stats.as_ref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.papers.iter().any(|p| p.paper_name == name)
    }

    pub fn filter(&self, query: &str) -> Vec<&PaperSummary> {
        filter_papers(&self.papers, query)
    }

    /// Re-fetches listing and statistics. Failures are logged and the
    /// previous values kept.
    pub async fn refresh(&mut self) {
        match self.api.papers().await {
            Ok(papers) => self.papers = papers,
            Err(e) => tracing::error!("failed to load papers: {e}"),
        }
        match self.api.stats().await {
            Ok(stats) => self.stats = Some(stats),
            Err(e) => tracing::error!("failed to load stats: {e}"),
        }
    }

    /// Validates, reads and uploads a local PDF. Nothing is sent for a
    /// rejected file.
    pub async fn upload(&mut self, path: &Path) -> Result<UploadReceipt> {
        let file_name = self.policy.validate(path)?;
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("could not read {}", path.display()))?;
        let receipt = self.api.upload(&file_name, bytes).await?;
        tracing::info!(
            paper = %receipt.paper_name,
            chunks = receipt.chunks_created,
            "paper uploaded"
        );
        self.refresh().await;
        Ok(receipt)
    }

    pub async fn delete(&mut self, name: &str) -> Result<()> {
        self.api.delete_paper(name).await?;
        tracing::info!(paper = name, "paper deleted");
        self.refresh().await;
        Ok(())
    }

    /// Searches arXiv. A blank query returns nothing without a request.
    pub async fn search_arxiv(&self, query: &str) -> Result<Vec<ArxivPaper>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.api.arxiv_search(query, self.arxiv_max_results).await?)
    }

    /// Indexes an arXiv paper without touching any conversation. Returns the
    /// stored paper name.
    pub async fn download_arxiv(&mut self, arxiv_id: &str) -> Result<String> {
        let download = self.api.arxiv_download(arxiv_id.trim()).await?;
        self.refresh().await;
        Ok(download.paper_name)
    }

    pub async fn save_pdf(&self, name: &str, dest: &Path) -> Result<()> {
        let bytes = self.api.paper_pdf(name).await?;
        tokio::fs::write(dest, bytes)
            .await
            .with_context(|| format!("could not write {}", dest.display()))?;
        Ok(())
    }

    pub fn pdf_url(&self, name: &str) -> String {
        self.api.pdf_url(name)
    }
}
