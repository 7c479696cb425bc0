//! `reqwest` implementation of [`TranslationApi`].

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde_json::Value;

use super::types::{
    InboxPage, InboxQuery, NewTranslationRecord, SlackReport, StatusUpdate, StepRequest,
};
use super::TranslationApi;
use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::record::{RecordStatus, TranslationRecord};

/// Maximum length of an error body carried into [`ApiError::Status`].
const MAX_ERROR_BODY_LENGTH: usize = 200;

fn truncate_error_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let head: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", head)
    } else {
        body.to_string()
    }
}

fn create_http_client(config: &ApiConfig) -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| ApiError::Client(e.to_string()))
}

/// HTTP client for the translations endpoints under `{base_url}{prefix}`.
pub struct HttpTranslationApi {
    client: Client,
    base: String,
}

impl HttpTranslationApi {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.prefix.trim_matches('/')
        );
        let base = base.trim_end_matches('/').to_string();

        Url::parse(&base).map_err(|e| ApiError::InvalidUrl {
            url: base.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client: create_http_client(config)?,
            base,
        })
    }

    /// Absolute URL for an endpoint path such as `/translations/prepare`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(path))
            .header(ACCEPT, "application/json")
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Value, ApiError> {
        debug!("{} {}", method, path);
        let response = self
            .request(method, path)
            .json(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })?;
        decode_response(path, response).await
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        debug!("GET {}", path);
        let response = self
            .request(Method::GET, path)
            .query(params)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                path: path.to_string(),
                source,
            })?;
        decode_response(path, response).await
    }
}

/// Rejects non-2xx responses and decodes JSON bodies. Non-JSON bodies are
/// returned as a JSON string.
async fn decode_response(path: &str, response: Response) -> Result<Value, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body = if body.is_empty() {
            status.canonical_reason().unwrap_or_default().to_string()
        } else {
            truncate_error_body(&body)
        };
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.contains("application/json"));

    let text = response.text().await.map_err(|source| ApiError::Transport {
        path: path.to_string(),
        source,
    })?;

    if !is_json {
        return Ok(Value::String(text));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&text).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

fn from_value<T: serde::de::DeserializeOwned>(path: &str, value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl TranslationApi for HttpTranslationApi {
    async fn list_inbox(&self, query: &InboxQuery) -> Result<InboxPage, ApiError> {
        let path = "/translations/inbox";
        let value = self.get(path, &query.to_params()).await?;
        from_value(path, value)
    }

    async fn fetch_record(&self, id: u64) -> Result<TranslationRecord, ApiError> {
        let path = format!("/translations/inbox/{}", id);
        let value = self.get(&path, &[]).await?;
        from_value(&path, value)
    }

    async fn create_record(&self, record: &NewTranslationRecord) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/translations/inbox", record)
            .await
    }

    async fn update_status(&self, id: u64, status: RecordStatus) -> Result<Value, ApiError> {
        let path = format!("/translations/inbox/{}/status", id);
        self.send_json(Method::PATCH, &path, &StatusUpdate { status })
            .await
    }

    async fn prepare(&self, request: &StepRequest) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/translations/prepare", request)
            .await
    }

    async fn primary(&self, request: &StepRequest) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/translations/primary", request)
            .await
    }

    async fn revision(&self, request: &StepRequest) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/translations/revision", request)
            .await
    }

    async fn send_report(&self, report: &SlackReport) -> Result<Value, ApiError> {
        self.send_json(Method::POST, "/slack_reports", report).await
    }
}
