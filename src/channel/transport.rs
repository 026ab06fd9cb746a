use async_trait::async_trait;
use reqwest::multipart::Form;
use std::time::Duration;

use crate::errors::{PanelError, PanelResult};

/// Ordered form fields, sent as multipart parts exactly as given
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_multipart(&self) -> Form {
        self.0
            .iter()
            .fold(Form::new(), |form, (k, v)| form.text(k.clone(), v.clone()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Successful server answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub status: u16,
    pub body: String,
}

/// HTTP capability used by the retry channel and the refresh coordinator
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST multipart form data; non-success statuses are errors
    async fn post_form(&self, endpoint: &str, fields: &FormFields) -> PanelResult<ServerResponse>;

    /// GET; non-success statuses are errors
    async fn get(&self, endpoint: &str) -> PanelResult<ServerResponse>;
}

/// reqwest-backed transport resolving relative endpoints against a base URL
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> PanelResult<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PanelError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Absolute URLs pass through; paths are joined to the base URL
    pub fn resolve(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn map_err(&self, endpoint: &str, err: reqwest::Error) -> PanelError {
        if err.is_timeout() {
            return PanelError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: self.timeout.map(|t| t.as_millis() as u64).unwrap_or(0),
            };
        }
        PanelError::from_reqwest(endpoint, err)
    }

    async fn finish(&self, endpoint: &str, response: reqwest::Response) -> PanelResult<ServerResponse> {
        let status = response.status();
        if !status.is_success() {
            return Err(PanelError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response
            .text()
            .await
            .map_err(|e| self.map_err(endpoint, e))?;
        Ok(ServerResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_form(&self, endpoint: &str, fields: &FormFields) -> PanelResult<ServerResponse> {
        let url = self.resolve(endpoint);
        tracing::debug!(url = %url, fields = fields.len(), "POST");
        let response = self
            .client
            .post(&url)
            .multipart(fields.to_multipart())
            .send()
            .await
            .map_err(|e| self.map_err(endpoint, e))?;
        self.finish(endpoint, response).await
    }

    async fn get(&self, endpoint: &str) -> PanelResult<ServerResponse> {
        let url = self.resolve(endpoint);
        tracing::debug!(url = %url, "GET");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.map_err(endpoint, e))?;
        self.finish(endpoint, response).await
    }
}
