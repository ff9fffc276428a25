//! `Transport` backed by an async `reqwest::Client`.
//!
//! Relative request paths are joined onto the base URL, JSON bodies are sent
//! with `application/json`, and any non-2xx status becomes
//! `TransportError::Status`.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, InvalidHeaderName, InvalidHeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::Url;

use crate::http::{Body, FormPart, FormPayload, HttpMethod, HttpRequest, HttpResponse, Transport};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Reqwest(#[from] reqwest::Error),

    #[error("invalid header name: {0}")]
    HeaderName(#[from] InvalidHeaderName),

    #[error("invalid header value: {0}")]
    HeaderValue(#[from] InvalidHeaderValue),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            TransportError::Reqwest(err) => err.status().map(|s| s.as_u16()),
            TransportError::Url(_)
            | TransportError::HeaderName(_)
            | TransportError::HeaderValue(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder {
            base_url: None,
            agent: None,
            headers: Vec::new(),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, TransportError> {
        Ok(self.base_url.join(path)?)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    type Error = TransportError;

    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = self.url(&request.path)?;

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Delete => self.client.delete(url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match request.body {
            Some(Body::Json(value)) => builder.json(&value),
            Some(Body::Multipart(form)) => builder.multipart(into_form(form)?),
            None => builder,
        };

        let res = builder.send().await?;
        let status = res.status();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(HttpResponse {
            status: status.as_u16(),
            headers,
            body,
        })
    }
}

fn into_form(payload: FormPayload) -> Result<Form, TransportError> {
    let mut form = Form::new();

    for part in payload.parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File {
                name,
                file_name,
                content_type,
                data,
            } => {
                let mut part = Part::bytes(data).file_name(file_name);

                if let Some(mime) = content_type {
                    part = part.mime_str(&mime)?;
                }

                form.part(name, part)
            }
        };
    }

    Ok(form)
}

pub struct ReqwestTransportBuilder {
    base_url: Option<String>,
    agent: Option<String>,
    headers: Vec<(String, String)>,
}

impl ReqwestTransportBuilder {
    /// Root that relative request paths are resolved against. A trailing
    /// slash is added if missing so `api/...` lands below it.
    pub fn base_url<U>(mut self, url: U) -> Self
    where
        U: Into<String>,
    {
        self.base_url = Some(url.into());
        self
    }

    pub fn user_agent<U>(mut self, user_agent: U) -> Self
    where
        U: Into<String>,
    {
        self.agent = Some(user_agent.into());
        self
    }

    /// Header sent with every request.
    pub fn default_header<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn build(self) -> Result<ReqwestTransport, TransportError> {
        let mut base = self.base_url.unwrap_or_else(|| "http://localhost/".to_string());

        if !base.ends_with('/') {
            base.push('/');
        }

        let base_url = Url::parse(&base)?;
        let user_agent = self
            .agent
            .unwrap_or_else(|| concat!("resource-core/", env!("CARGO_PKG_VERSION")).to_string());

        let mut default_headers = reqwest::header::HeaderMap::new();

        for (name, value) in self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            let value = HeaderValue::from_str(&value)?;

            default_headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(default_headers)
            .build()?;

        Ok(ReqwestTransport { base_url, client })
    }
}
