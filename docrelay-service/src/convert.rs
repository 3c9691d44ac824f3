//! Conversion service client.
//!
//! One synchronous call per document: bytes in, markdown out. The HTTP
//! implementation posts a multipart form to the configured endpoint and
//! expects a 2xx JSON body carrying `markdown_content`. Classification:
//! 4xx is the input's fault (permanent), 429/5xx and transport errors are
//! the collaborator's (transient).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::ConverterConfig;
use crate::error::ConvertError;

const ERROR_BODY_MAX_LEN: usize = 512;

pub type ConvertResult<T> = Result<T, ConvertError>;

#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert document bytes to markdown text.
    async fn convert(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> ConvertResult<String>;
}

/// Keep a bounded prefix of an error body. The cut must land on a char
/// boundary; converter error pages are not guaranteed to be ASCII.
fn truncate_body(mut message: String) -> String {
    if message.len() > ERROR_BODY_MAX_LEN {
        let mut end = ERROR_BODY_MAX_LEN;
        while !message.is_char_boundary(end) {
            end -= 1;
        }
        message.truncate(end);
    }
    message
}

/// Map a filename to the content type sent to the converter.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "md" | "markdown" => "text/markdown",
        "txt" | "text" => "text/plain",
        "html" | "htm" => "text/html",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}

/// HTTP client for the external conversion service
pub struct HttpConverter {
    client: Client,
    config: ConverterConfig,
}

impl HttpConverter {
    pub fn new(config: ConverterConfig) -> ConvertResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConvertError::Connection {
                url: config.base_url.clone(),
                source: e,
            })?;

        Ok(Self { client, config })
    }
}

#[derive(Deserialize)]
struct ConvertResponse {
    markdown_content: String,
}

#[async_trait]
impl Converter for HttpConverter {
    async fn convert(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        content_type: &str,
    ) -> ConvertResult<String> {
        let url = &self.config.base_url;

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|_| ConvertError::UnsupportedFormat {
                format: content_type.to_string(),
            })?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ConvertError::Connection {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if status.is_success() {
            let body: ConvertResponse = response
                .json()
                .await
                .map_err(|e| ConvertError::InvalidResponse { source: e })?;
            return Ok(body.markdown_content);
        }

        let message = truncate_body(response.text().await.unwrap_or_default());

        if status.as_u16() == 429 || status.is_server_error() {
            Err(ConvertError::Unavailable {
                status: status.as_u16(),
                message,
            })
        } else {
            Err(ConvertError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}
