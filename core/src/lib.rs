//! Generic REST resource client.
//!
//! # Overview
//! Turns a small vocabulary of CRUD and search intents into HTTP requests
//! against a backend that groups resources under an API prefix (`api` by
//! default), without knowing anything about the resources themselves.
//!
//! # Design
//! - `ResourceClient` is stateless apart from its transport and
//!   `ClientConfig`; each call is an independent request.
//! - Requests are plain data (`HttpRequest`) handed to a `Transport`. The
//!   `reqwest` feature (on by default) provides `ReqwestTransport`.
//! - Create vs update and delete-by-id vs delete-by-filter are decided by
//!   `Persistable::id`, nothing else.
//! - Transport failures reach the caller unchanged.

pub mod client;
pub mod error;
pub mod http;
pub mod page;
pub mod record;
#[cfg(feature = "reqwest")]
pub mod transport;

pub use client::{ClientConfig, PendingRequest, ResourceClient};
pub use error::ClientError;
pub use http::{
    Body, FormPart, FormPayload, HttpMethod, HttpRequest, HttpResponse, RequestOptions, Transport,
};
pub use page::{Page, PageError, Pagination, Sort, SortDirection};
pub use record::{Id, Persistable, Record};
#[cfg(feature = "reqwest")]
pub use transport::{ReqwestTransport, TransportError};
