//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are plain data. `ResourceClient` only builds
//! `HttpRequest` values; a `Transport` turns them into network traffic,
//! resolving the relative path against its own base URL and encoding the
//! body. Anything that goes wrong on the wire, including non-2xx statuses,
//! is reported through the transport's own error type.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// Request body. JSON bodies stay as `Value` until the transport encodes
/// them so callers can inspect exactly what will be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Multipart(FormPayload),
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            Body::Multipart(_) => None,
        }
    }
}

/// Multipart form body, the counterpart of a browser `FormData`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormPayload {
    pub parts: Vec<FormPart>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: Option<String>,
        data: Vec<u8>,
    },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<&str>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            data: data.into(),
        });
        self
    }
}

/// Per-request transport options. Only headers are recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// An HTTP request described as plain data.
///
/// `path` is relative (for example `api/users/42`) unless the caller passed
/// a full URL to one of the passthrough methods.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Body>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.headers.extend(options.headers);
        self
    }

    /// The JSON body, if the request carries one.
    pub fn json(&self) -> Option<&Value> {
        self.body.as_ref().and_then(Body::as_json)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Decode the body as JSON. An empty body decodes as `null`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        if self.body.trim().is_empty() {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_str(&self.body)
        }
    }
}

/// Executes `HttpRequest`s against a backend.
///
/// Only `request` is required; the verb methods are shorthands over it.
#[async_trait]
pub trait Transport: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn request(&self, request: HttpRequest) -> Result<HttpResponse, Self::Error>;

    async fn get(&self, path: &str) -> Result<HttpResponse, Self::Error> {
        self.request(HttpRequest::new(HttpMethod::Get, path)).await
    }

    async fn post(&self, path: &str, body: Body) -> Result<HttpResponse, Self::Error> {
        self.request(HttpRequest::new(HttpMethod::Post, path).with_body(body))
            .await
    }

    async fn put(&self, path: &str, body: Body) -> Result<HttpResponse, Self::Error> {
        self.request(HttpRequest::new(HttpMethod::Put, path).with_body(body))
            .await
    }

    async fn delete(&self, path: &str) -> Result<HttpResponse, Self::Error> {
        self.request(HttpRequest::new(HttpMethod::Delete, path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_headers_are_appended() {
        let options = RequestOptions::default().header("x-upload", "1");
        let req = HttpRequest::new(HttpMethod::Post, "upload").with_options(options);
        assert_eq!(req.headers, vec![("x-upload".to_string(), "1".to_string())]);
    }

    #[test]
    fn json_accessor_ignores_multipart() {
        let req = HttpRequest::new(HttpMethod::Post, "upload")
            .with_body(Body::Multipart(FormPayload::new().text("a", "b")));
        assert!(req.json().is_none());

        let req =
            HttpRequest::new(HttpMethod::Post, "api/x").with_body(Body::Json(json!({"a": 1})));
        assert_eq!(req.json(), Some(&json!({"a": 1})));
    }

    #[test]
    fn empty_response_body_decodes_as_null() {
        let response = HttpResponse {
            status: 204,
            headers: Vec::new(),
            body: String::new(),
        };
        let value: Value = response.json().unwrap();
        assert_eq!(value, Value::Null);
        let unit: Option<u32> = response.json().unwrap();
        assert!(unit.is_none());
    }

    #[test]
    fn form_payload_keeps_part_order() {
        let form = FormPayload::new()
            .text("kind", "avatar")
            .file("file", "a.png", Some("image/png"), vec![1u8, 2, 3]);
        let names: Vec<&str> = form.parts.iter().map(FormPart::name).collect();
        assert_eq!(names, vec!["kind", "file"]);
    }
}
