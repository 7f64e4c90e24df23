// src/transport/http.rs

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::time::Instant;

use crate::config::AppConfig;
use crate::document::ResultDocument;
use crate::errors::{InspectError, Result};
use crate::models::SubmissionRequest;
use crate::transport::{PhaseReporter, Transport};

/// Carries the original file name, percent-encoded, since intermediaries may
/// normalize multipart metadata.
pub const FILENAME_HEADER: &str = "X-Filename";

/// Multipart field holding the payload.
pub const FILE_FIELD: &str = "file";

const CHUNK_SIZE: usize = 64 * 1024;

/// Uploads submissions to the analysis service over HTTP.
pub struct HttpTransport {
    client: Client,
    endpoint: String,
}

impl HttpTransport {
    /// Creates a new `HttpTransport` posting to `api_base` + `endpoint_path`.
    pub fn new(client: Client, api_base: &str, endpoint_path: &str) -> Self {
        let endpoint = format!(
            "{}/{}",
            api_base.trim_end_matches('/'),
            endpoint_path.trim_start_matches('/')
        );
        Self { client, endpoint }
    }

    pub fn from_config(client: Client, config: &AppConfig) -> Self {
        Self::new(client, &config.api_base, &config.endpoint_path)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Splits the payload into chunks and flips the phase once the last one is handed off.
fn payload_body(payload: Bytes, progress: PhaseReporter) -> Body {
    let chunks: Vec<Bytes> = (0..payload.len())
        .step_by(CHUNK_SIZE)
        .map(|start| payload.slice(start..(start + CHUNK_SIZE).min(payload.len())))
        .collect();

    if chunks.is_empty() {
        progress.analyzing();
    }

    let last = chunks.len().saturating_sub(1);
    let chunks = chunks.into_iter().enumerate().map(move |(index, chunk)| {
        if index == last {
            progress.analyzing();
        }
        Ok::<Bytes, std::io::Error>(chunk)
    });

    Body::wrap_stream(stream::iter(chunks))
}

#[async_trait]
impl Transport for HttpTransport {
    /// Posts the file as a single multipart field and parses the JSON result.
    async fn send(
        &self,
        request: SubmissionRequest,
        progress: PhaseReporter,
    ) -> Result<ResultDocument> {
        let hint = request.kind_hint();

        log::info!(
            "📡 Uploading {} ({} bytes, {}) to {} [submission #{}, {}]",
            request.file_name,
            request.file_size_bytes,
            request.mime_or_extension,
            self.endpoint,
            progress.submission(),
            request.id
        );

        let part = Part::stream_with_length(
            payload_body(request.payload, progress),
            request.file_size_bytes,
        )
        .file_name(request.file_name.clone())
        .mime_str(&request.mime_or_extension)?;

        let form = Form::new().part(FILE_FIELD, part);

        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .header(ACCEPT, "application/json")
            .header(FILENAME_HEADER, urlencoding::encode(&request.file_name).into_owned())
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let latency_ms = start.elapsed().as_millis() as u64;

        log::info!("📥 Analysis response status: {} ({}ms)", status, latency_ms);

        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(InspectError::ApiError {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let body = resp.text().await?;
        ResultDocument::from_json(&body, hint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_and_path_with_one_slash() {
        let transport = HttpTransport::new(Client::new(), "http://svc:5000/", "/api/analyze");
        assert_eq!(transport.endpoint(), "http://svc:5000/api/analyze");

        let transport = HttpTransport::new(Client::new(), "http://svc", "analyze");
        assert_eq!(transport.endpoint(), "http://svc/analyze");
    }
}
