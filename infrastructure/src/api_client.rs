use crate::config::Config;
use anyhow::{bail, Context};
use domain::api::{ApiResult, PaperApi};
use domain::error::ApiError;
use domain::library::{
    ArxivAddition, ArxivDownload, ArxivPaper, ArxivSearchRequest, ArxivSearchResults, IndexStats,
    PaperList, PaperSummary, QueryAnswer, QueryRequest, UploadReceipt,
};
use reqwest::{multipart, Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use shared::types::Result;
use std::time::Duration;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

/// reqwest client for the paper-chat HTTP API.
#[derive(Clone)]
pub struct HttpPaperApi {
    client: Client,
    base_url: Url,
}

impl HttpPaperApi {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let parsed =
            Url::parse(base_url).with_context(|| format!("invalid API base URL: {base_url}"))?;
        if parsed.cannot_be_a_base() {
            bail!("API base URL cannot carry a path: {base_url}");
        }
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
            base_url: parsed,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.api_base, config.request_timeout)
    }

    /// Joins path segments onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments.iter());
        }
        url
    }

    async fn send(request: RequestBuilder) -> ApiResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = error_detail(&body, status);
        tracing::warn!(status = status.as_u16(), %detail, "API request rejected");
        Err(ApiError::status(status.as_u16(), detail))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

fn error_detail(body: &str, status: StatusCode) -> String {
    match serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail)
    {
        Some(Value::String(detail)) => detail,
        Some(other) => other.to_string(),
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
    }
}

impl PaperApi for HttpPaperApi {
    async fn stats(&self) -> ApiResult<IndexStats> {
        let response = Self::send(self.client.get(self.endpoint(&["stats"]))).await?;
        Self::decode(response).await
    }

    async fn papers(&self) -> ApiResult<Vec<PaperSummary>> {
        let response = Self::send(self.client.get(self.endpoint(&["papers"]))).await?;
        let list: PaperList = Self::decode(response).await?;
        Ok(list.papers)
    }

    async fn delete_paper(&self, name: &str) -> ApiResult<()> {
        Self::send(self.client.delete(self.endpoint(&["papers", name]))).await?;
        Ok(())
    }

    async fn paper_pdf(&self, name: &str) -> ApiResult<Vec<u8>> {
        let response = Self::send(self.client.get(self.endpoint(&["papers", name, "pdf"]))).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn pdf_url(&self, name: &str) -> String {
        self.endpoint(&["papers", name, "pdf"]).to_string()
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<UploadReceipt> {
        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let form = multipart::Form::new().part("file", part);
        let response =
            Self::send(self.client.post(self.endpoint(&["upload"])).multipart(form)).await?;
        Self::decode(response).await
    }

    async fn query(&self, request: &QueryRequest) -> ApiResult<QueryAnswer> {
        let response =
            Self::send(self.client.post(self.endpoint(&["query"])).json(request)).await?;
        Self::decode(response).await
    }

    async fn arxiv_search(&self, query: &str, max_results: u32) -> ApiResult<Vec<ArxivPaper>> {
        let request = ArxivSearchRequest {
            query: query.to_string(),
            max_results,
        };
        let response = Self::send(
            self.client
                .post(self.endpoint(&["arxiv", "search"]))
                .json(&request),
        )
        .await?;
        let results: ArxivSearchResults = Self::decode(response).await?;
        Ok(results.papers)
    }

    async fn arxiv_add_to_chat(&self, arxiv_id: &str) -> ApiResult<ArxivAddition> {
        let response = Self::send(
            self.client
                .post(self.endpoint(&["arxiv", "add-to-chat", arxiv_id])),
        )
        .await?;
        Self::decode(response).await
    }

    async fn arxiv_download(&self, arxiv_id: &str) -> ApiResult<ArxivDownload> {
        let response = Self::send(
            self.client
                .post(self.endpoint(&["arxiv", "download", arxiv_id])),
        )
        .await?;
        Self::decode(response).await
    }

    async fn clear_history(&self) -> ApiResult<()> {
        Self::send(self.client.post(self.endpoint(&["clear-history"]))).await?;
        Ok(())
    }
}
