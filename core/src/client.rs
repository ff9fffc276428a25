//! Generic REST resource client.
//!
//! # Design
//! `ResourceClient` holds a transport and a `ClientConfig` and carries no
//! other state between calls. Every operation builds a path from an API
//! prefix, a resource name and (sometimes) an identifier, then hands the
//! request to the transport.
//!
//! The lazy operations return a `PendingRequest`. Building one performs no
//! I/O; each `send` (or `.await`) issues a fresh, independent request. The
//! `*_async` operations send immediately and resolve to the response.

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ClientError;
use crate::http::{
    Body, FormPayload, HttpMethod, HttpRequest, HttpResponse, RequestOptions, Transport,
};
use crate::page::Page;
use crate::record::Persistable;

pub const DEFAULT_API: &str = "api";
pub const SEARCH_SUFFIX: &str = "_search";

/// Routing conventions of the backend.
///
/// Defaults match the usual layout: resources live under `api/`, searches
/// go to `{resource}/_search`, and updates carry the id in the path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Path prefix placed before every resource name.
    pub api: String,
    /// Whether `search` appends `/_search` to the resource path.
    pub search_suffix: bool,
    /// Whether `save` sends updates to `{api}/{resource}` instead of
    /// `{api}/{resource}/{id}`.
    pub put_without_id: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api: DEFAULT_API.to_string(),
            search_suffix: true,
            put_without_id: false,
        }
    }
}

/// A built request that has not been sent yet.
#[derive(Debug)]
pub struct PendingRequest<'a, T> {
    transport: &'a T,
    request: HttpRequest,
}

impl<'a, T> PendingRequest<'a, T>
where
    T: Transport,
{
    /// The request that each `send` will issue.
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn into_request(self) -> HttpRequest {
        self.request
    }

    /// Issue the request once. Calling this again issues another request.
    pub async fn send(&self) -> Result<HttpResponse, ClientError<T::Error>> {
        tracing::debug!(
            method = self.request.method.as_str(),
            path = %self.request.path,
            "sending request"
        );

        self.transport
            .request(self.request.clone())
            .await
            .map_err(ClientError::Transport)
    }

    /// Issue the request and decode the response body.
    pub async fn json<R>(&self) -> Result<R, ClientError<T::Error>>
    where
        R: DeserializeOwned,
    {
        let response = self.send().await?;

        response.json().map_err(ClientError::Deserialize)
    }
}

impl<'a, T> IntoFuture for PendingRequest<'a, T>
where
    T: Transport,
{
    type Output = Result<HttpResponse, ClientError<T::Error>>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.send().await })
    }
}

/// Stateless CRUD and search facade over a `Transport`.
#[derive(Debug, Clone)]
pub struct ResourceClient<T> {
    transport: T,
    config: ClientConfig,
}

impl<T> ResourceClient<T>
where
    T: Transport,
{
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ClientConfig::default())
    }

    pub fn with_config(transport: T, config: ClientConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn to_json<V>(value: &V) -> Result<Value, ClientError<T::Error>>
    where
        V: Serialize + ?Sized,
    {
        serde_json::to_value(value).map_err(ClientError::Serialize)
    }

    fn pending(&self, request: HttpRequest) -> PendingRequest<'_, T> {
        PendingRequest {
            transport: &self.transport,
            request,
        }
    }

    /// `GET {api}/{resource}` or `GET {api}/{resource}/{id}`.
    pub fn get(&self, resource: &str, id: Option<&str>) -> PendingRequest<'_, T> {
        let path = resource_path(&self.config.api, resource, id);

        self.pending(HttpRequest::new(HttpMethod::Get, path))
    }

    pub async fn get_async(
        &self,
        resource: &str,
        id: Option<&str>,
    ) -> Result<HttpResponse, ClientError<T::Error>> {
        self.get(resource, id).send().await
    }

    /// Search with the configured prefix and suffix convention.
    pub fn search<P, S>(
        &self,
        resource: &str,
        params: &P,
        page: Option<&Page<S>>,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        P: Serialize + ?Sized,
        S: Serialize,
    {
        self.search_at(
            resource,
            params,
            page,
            self.config.search_suffix,
            &self.config.api,
        )
    }

    /// `POST {api}/{resource}/_search` (or `{api}/{resource}` when `search`
    /// is false). The body is `params` with a `page` field set to `page`,
    /// which is `null` when absent and replaces any `page` key in `params`.
    pub fn search_at<P, S>(
        &self,
        resource: &str,
        params: &P,
        page: Option<&Page<S>>,
        search: bool,
        api: &str,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        P: Serialize + ?Sized,
        S: Serialize,
    {
        let mut path = resource_path(api, resource, None);

        if search {
            path.push('/');
            path.push_str(SEARCH_SUFFIX);
        }

        let mut body = match Self::to_json(params)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(ClientError::ParamsNotObject),
        };
        body.insert("page".to_string(), Self::to_json(&page)?);

        Ok(self.pending(
            HttpRequest::new(HttpMethod::Post, path).with_body(Body::Json(Value::Object(body))),
        ))
    }

    /// `POST {api}/{resource}/_search` with `params` as the body, sent now.
    pub async fn search_async<P>(
        &self,
        resource: &str,
        params: &P,
    ) -> Result<HttpResponse, ClientError<T::Error>>
    where
        P: Serialize + ?Sized,
    {
        let path = format!(
            "{}/{SEARCH_SUFFIX}",
            resource_path(&self.config.api, resource, None)
        );
        let body = Self::to_json(params)?;

        self.pending(HttpRequest::new(HttpMethod::Post, path).with_body(Body::Json(body)))
            .send()
            .await
    }

    /// Create or update `obj` with the configured conventions.
    pub fn save<O>(
        &self,
        resource: &str,
        obj: &O,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        O: Persistable + Serialize + ?Sized,
    {
        self.save_at(resource, obj, self.config.put_without_id, &self.config.api)
    }

    /// With an id, `PUT {api}/{resource}/{id}` (or `PUT {api}/{resource}`
    /// when `put_without_id` is set). Without one, `POST {api}/{resource}`.
    /// The body is `obj` either way.
    pub fn save_at<O>(
        &self,
        resource: &str,
        obj: &O,
        put_without_id: bool,
        api: &str,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        O: Persistable + Serialize + ?Sized,
    {
        let body = Body::Json(Self::to_json(obj)?);

        let request = match obj.id() {
            Some(id) => {
                let id = if put_without_id { None } else { Some(id.as_str()) };

                HttpRequest::new(HttpMethod::Put, resource_path(api, resource, id))
            }
            None => HttpRequest::new(HttpMethod::Post, resource_path(api, resource, None)),
        };

        Ok(self.pending(request.with_body(body)))
    }

    /// `PUT {url}` with `obj` as the body. `url` is used as given.
    pub fn put<O>(
        &self,
        url: &str,
        obj: &O,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        O: Serialize + ?Sized,
    {
        let body = Body::Json(Self::to_json(obj)?);

        Ok(self.pending(HttpRequest::new(HttpMethod::Put, url).with_body(body)))
    }

    /// `POST {url}` with `obj` as the JSON body.
    pub fn post<O>(
        &self,
        url: &str,
        obj: &O,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        O: Serialize + ?Sized,
    {
        let body = Body::Json(Self::to_json(obj)?);

        Ok(self.pending(HttpRequest::new(HttpMethod::Post, url).with_body(body)))
    }

    /// `POST {url}` with `form` as a multipart body and `options` applied to
    /// the request.
    pub fn post_multipart(
        &self,
        url: &str,
        options: RequestOptions,
        form: FormPayload,
    ) -> PendingRequest<'_, T> {
        self.pending(
            HttpRequest::new(HttpMethod::Post, url)
                .with_options(options)
                .with_body(Body::Multipart(form)),
        )
    }

    pub async fn post_async<O>(
        &self,
        url: &str,
        obj: &O,
    ) -> Result<HttpResponse, ClientError<T::Error>>
    where
        O: Serialize + ?Sized,
    {
        self.post(url, obj)?.send().await
    }

    /// Delete with the configured prefix.
    pub fn delete<O>(
        &self,
        resource: &str,
        obj: &O,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        O: Persistable + Serialize + ?Sized,
    {
        self.delete_at(resource, obj, &self.config.api)
    }

    /// With an id, `DELETE {api}/{resource}/{id}` without a body. Without
    /// one, `DELETE {api}/{resource}` with `obj` as a filter body.
    pub fn delete_at<O>(
        &self,
        resource: &str,
        obj: &O,
        api: &str,
    ) -> Result<PendingRequest<'_, T>, ClientError<T::Error>>
    where
        O: Persistable + Serialize + ?Sized,
    {
        let request = match obj.id() {
            Some(id) => {
                let path = resource_path(api, resource, Some(id.as_str()));

                HttpRequest::new(HttpMethod::Delete, path)
            }
            None => HttpRequest::new(HttpMethod::Delete, resource_path(api, resource, None))
                .with_body(Body::Json(Self::to_json(obj)?)),
        };

        Ok(self.pending(request))
    }
}

/// `{api}/{resource}` with `/{id}` appended for a non-empty id.
fn resource_path(api: &str, resource: &str, id: Option<&str>) -> String {
    match id {
        Some(id) if !id.is_empty() => format!("{api}/{resource}/{id}"),
        _ => format!("{api}/{resource}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::page::Sort;
    use crate::record::Record;

    #[derive(Debug, thiserror::Error)]
    #[error("HTTP {status}")]
    struct StatusError {
        status: u16,
    }

    /// Records every request it receives and answers with a fixed status.
    #[derive(Debug, Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<HttpRequest>>,
        fail_with: Option<u16>,
    }

    impl RecordingTransport {
        fn failing(status: u16) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_with: Some(status),
            }
        }

        fn sent(&self) -> Vec<HttpRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        type Error = StatusError;

        async fn request(&self, request: HttpRequest) -> Result<HttpResponse, StatusError> {
            self.sent.lock().unwrap().push(request);

            if let Some(status) = self.fail_with {
                return Err(StatusError { status });
            }

            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: r#"{"ok":true}"#.to_string(),
            })
        }
    }

    fn client() -> ResourceClient<RecordingTransport> {
        ResourceClient::new(RecordingTransport::default())
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct User {
        name: String,
    }

    #[test]
    fn get_builds_collection_and_item_paths() {
        let c = client();
        let req = c.get("users", None).into_request();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "api/users");
        assert!(req.body.is_none());

        let req = c.get("users", Some("42")).into_request();
        assert_eq!(req.path, "api/users/42");
    }

    #[test]
    fn get_treats_empty_id_as_absent() {
        let req = client().get("users", Some("")).into_request();
        assert_eq!(req.path, "api/users");
    }

    #[test]
    fn search_defaults_to_suffix_and_null_page() {
        let c = client();
        let pending = c.search("users", &Value::Null, None::<&Page>).unwrap();
        let req = pending.request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "api/users/_search");
        assert_eq!(req.json(), Some(&json!({"page": null})));
    }

    #[test]
    fn search_without_suffix_uses_resource_path() {
        let c = client();
        let pending = c
            .search_at("users", &json!({}), None::<&Page>, false, DEFAULT_API)
            .unwrap();
        assert_eq!(pending.request().path, "api/users");
    }

    #[test]
    fn search_with_custom_api_prefix() {
        let c = client();
        let pending = c
            .search_at("users", &json!({}), None::<&Page>, true, "referentiel")
            .unwrap();
        assert_eq!(pending.request().path, "referentiel/users/_search");
    }

    #[test]
    fn search_merges_params_with_page() {
        let c = client();
        let page: Page = Page::with(Vec::new(), 1, 20).unwrap();
        let pending = c.search("users", &json!({"active": true}), Some(&page)).unwrap();
        assert_eq!(
            pending.request().json(),
            Some(&json!({
                "active": true,
                "page": {"sort": [], "index": 1, "size": 20, "total": 0}
            }))
        );
    }

    #[test]
    fn search_page_argument_overrides_params_page() {
        let c = client();
        let pending = c
            .search("users", &json!({"page": 9, "q": "x"}), None::<&Page>)
            .unwrap();
        assert_eq!(pending.request().json(), Some(&json!({"page": null, "q": "x"})));
    }

    #[test]
    fn search_carries_sort_criteria() {
        let c = client();
        let page = Page::new(vec![Sort::asc("name")]);
        let pending = c.search("users", &json!({}), Some(&page)).unwrap();
        let body = pending.request().json().unwrap();
        assert_eq!(body["page"]["sort"][0]["field"], "name");
        assert_eq!(body["page"]["size"], 50);
    }

    #[test]
    fn search_rejects_non_object_params() {
        let c = client();
        let err = c.search("users", &json!([1, 2]), None::<&Page>).unwrap_err();
        assert!(matches!(err, ClientError::ParamsNotObject));
    }

    #[test]
    fn search_follows_configured_conventions() {
        let config = ClientConfig {
            api: "v2".to_string(),
            search_suffix: false,
            put_without_id: false,
        };
        let c = ResourceClient::with_config(RecordingTransport::default(), config);
        let pending = c.search("users", &json!({}), None::<&Page>).unwrap();
        assert_eq!(pending.request().path, "v2/users");
    }

    #[test]
    fn save_with_id_puts_to_item_path() {
        let c = client();
        let obj = json!({"id": 42, "name": "A"});
        let req = c.save("users", &obj).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "api/users/42");
        assert_eq!(req.json(), Some(&obj));
    }

    #[test]
    fn save_without_id_posts_to_collection() {
        let c = client();
        let obj = json!({"name": "B"});
        let req = c.save("users", &obj).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "api/users");
        assert_eq!(req.json(), Some(&obj));
    }

    #[test]
    fn save_with_put_without_id_drops_id_from_path() {
        let c = client();
        let obj = json!({"id": 42, "name": "A"});
        let req = c.save_at("users", &obj, true, DEFAULT_API).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "api/users");
    }

    #[test]
    fn save_without_id_ignores_put_without_id() {
        let c = client();
        let req = c
            .save_at("users", &json!({"name": "B"}), true, "other")
            .unwrap()
            .into_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "other/users");
    }

    #[test]
    fn save_treats_zero_id_as_present() {
        let c = client();
        let req = c.save("users", &json!({"id": 0})).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "api/users/0");
    }

    #[test]
    fn save_record_dispatches_on_id_field() {
        let c = client();
        let created = Record::new(User { name: "B".to_string() });
        let req = c.save("users", &created).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.json(), Some(&json!({"name": "B"})));

        let existing = Record::with_id("u-7", User { name: "A".to_string() });
        let req = c.save("users", &existing).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "api/users/u-7");
    }

    #[test]
    fn put_and_post_use_url_unchanged() {
        let c = client();
        let req = c.put("referentiel/users/bulk", &json!({"a": 1})).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.path, "referentiel/users/bulk");

        let req = c.post("auth/login", &json!({"u": "x"})).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "auth/login");
        assert_eq!(req.json(), Some(&json!({"u": "x"})));
        assert!(req.headers.is_empty());
    }

    #[test]
    fn post_multipart_sends_form_and_options() {
        let c = client();
        let form = FormPayload::new().file("file", "a.txt", Some("text/plain"), b"hello".to_vec());
        let options = RequestOptions::default().header("x-origin", "import");
        let req = c.post_multipart("upload", options, form.clone()).into_request();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "upload");
        assert_eq!(req.headers, vec![("x-origin".to_string(), "import".to_string())]);
        assert_eq!(req.body, Some(Body::Multipart(form)));
    }

    #[test]
    fn delete_with_id_has_no_body() {
        let c = client();
        let req = c.delete("users", &json!({"id": 42})).unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "api/users/42");
        assert!(req.body.is_none());
    }

    #[test]
    fn delete_without_id_sends_filter_body() {
        let c = client();
        let filter = json!({"active": false});
        let req = c.delete_at("users", &filter, "v2").unwrap().into_request();
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.path, "v2/users");
        assert_eq!(req.json(), Some(&filter));
    }

    #[test]
    fn delete_none_sends_null_body() {
        let c = client();
        let req = c.delete("users", &None::<Value>).unwrap().into_request();
        assert_eq!(req.path, "api/users");
        assert_eq!(req.json(), Some(&Value::Null));
    }

    #[tokio::test]
    async fn pending_request_does_nothing_until_sent() {
        let c = client();
        let pending = c.get("users", None);
        assert!(c.transport().sent().is_empty());

        pending.send().await.unwrap();
        pending.send().await.unwrap();
        assert_eq!(c.transport().sent().len(), 2);
    }

    #[tokio::test]
    async fn pending_request_can_be_awaited() {
        let c = client();
        let response = c.save("users", &json!({"name": "B"})).unwrap().await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(c.transport().sent()[0].method, HttpMethod::Post);
    }

    #[tokio::test]
    async fn async_variants_send_exactly_once() {
        let c = client();
        c.get_async("users", Some("1")).await.unwrap();
        c.search_async("users", &json!({"q": "a"})).await.unwrap();
        c.post_async("auth/refresh", &json!({})).await.unwrap();

        let sent = c.transport().sent();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].path, "api/users/1");
        assert_eq!(sent[1].path, "api/users/_search");
        assert_eq!(sent[1].json(), Some(&json!({"q": "a"})));
        assert_eq!(sent[2].path, "auth/refresh");
    }

    #[tokio::test]
    async fn json_decodes_response_body() {
        let c = client();
        let value: Value = c.get("users", None).json().await.unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn transport_errors_pass_through() {
        let c = ResourceClient::new(RecordingTransport::failing(503));
        let err = c.get_async("users", None).await.unwrap_err();
        let inner = err.into_transport().unwrap();
        assert_eq!(inner.status, 503);
        assert_eq!(c.transport().sent().len(), 1);
    }
}
