use crate::error::ApiError;
use crate::library::{
    ArxivAddition, ArxivDownload, ArxivPaper, IndexStats, PaperSummary, QueryAnswer, QueryRequest,
    UploadReceipt,
};
use std::future::Future;

pub type ApiResult<T> = Result<T, ApiError>;

/// Contract of the remote paper-chat service.
///
/// Parsing, embedding, retrieval and generation all happen behind this trait;
/// the client only sends requests and renders what comes back.
pub trait PaperApi {
    fn stats(&self) -> impl Future<Output = ApiResult<IndexStats>> + Send;

    fn papers(&self) -> impl Future<Output = ApiResult<Vec<PaperSummary>>> + Send;

    fn delete_paper(&self, name: &str) -> impl Future<Output = ApiResult<()>> + Send;

    fn paper_pdf(&self, name: &str) -> impl Future<Output = ApiResult<Vec<u8>>> + Send;

    /// Location of the paper's PDF, for handing to an external viewer.
    fn pdf_url(&self, name: &str) -> String;

    fn upload(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = ApiResult<UploadReceipt>> + Send;

    fn query(&self, request: &QueryRequest) -> impl Future<Output = ApiResult<QueryAnswer>> + Send;

    fn arxiv_search(
        &self,
        query: &str,
        max_results: u32,
    ) -> impl Future<Output = ApiResult<Vec<ArxivPaper>>> + Send;

    fn arxiv_add_to_chat(
        &self,
        arxiv_id: &str,
    ) -> impl Future<Output = ApiResult<ArxivAddition>> + Send;

    fn arxiv_download(&self, arxiv_id: &str)
        -> impl Future<Output = ApiResult<ArxivDownload>> + Send;

    fn clear_history(&self) -> impl Future<Output = ApiResult<()>> + Send;
}
