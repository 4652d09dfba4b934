//! Response output abstraction.
//!
//! Renderers never talk to a server framework directly. They write to a
//! [`ResponseSink`], which receives calls in a fixed causal order:
//!
//! 1. [`set_header`](ResponseSink::set_header), any number of times
//! 2. [`write_status`](ResponseSink::write_status), once
//! 3. [`write_body`](ResponseSink::write_body), any number of times
//!
//! Adapters for a concrete server implement the trait over its response
//! type. [`BufferedResponse`] is an in-memory sink that converts into an
//! [`http::Response`], handy for frameworks that want a whole response value
//! and for tests.

use std::io;
use std::str::Utf8Error;

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Response, StatusCode};

/// Destination for a rendered response.
pub trait ResponseSink {
    /// Sets a header. Only meaningful before the status is written.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    /// Writes the status line, committing the headers.
    fn write_status(&mut self, status: StatusCode);

    /// Appends bytes to the body.
    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()>;
}

/// Adapts a sink's body to [`io::Write`] so templates can stream into it.
pub(crate) struct BodyWriter<'a, S: ?Sized> {
    sink: &'a mut S,
}

impl<'a, S: ResponseSink + ?Sized> BodyWriter<'a, S> {
    pub(crate) fn new(sink: &'a mut S) -> Self {
        Self { sink }
    }
}

impl<S: ResponseSink + ?Sized> io::Write for BodyWriter<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write_body(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An in-memory response.
///
/// Behaves like a typical server response writer: headers set after the
/// status line are dropped, a second status is ignored, and writing body
/// bytes before any status commits `200 OK`.
///
/// # Example
///
/// ```rust
/// use standout_views::{BufferedResponse, ResponseSink};
/// use http::{header, HeaderValue, StatusCode};
///
/// let mut res = BufferedResponse::new();
/// res.set_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
/// res.write_status(StatusCode::CREATED);
/// res.write_body(b"done").unwrap();
///
/// let res = res.into_response();
/// assert_eq!(res.status(), StatusCode::CREATED);
/// assert_eq!(res.body(), b"done");
/// ```
#[derive(Debug, Default)]
pub struct BufferedResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// The written status, or `None` if nothing was committed yet.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value as text, if present and valid UTF-8.
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn body_text(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.body)
    }

    /// True when no header, status or body byte has been written.
    pub fn is_untouched(&self) -> bool {
        self.status.is_none() && self.headers.is_empty() && self.body.is_empty()
    }

    /// Converts into an [`http::Response`]. An uncommitted response is `200 OK`.
    pub fn into_response(self) -> Response<Vec<u8>> {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

impl ResponseSink for BufferedResponse {
    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        if self.status.is_some() {
            tracing::warn!(header = %name, "header set after status was written; ignored");
            return;
        }
        self.headers.insert(name, value);
    }

    fn write_status(&mut self, status: StatusCode) {
        if let Some(current) = self.status {
            tracing::warn!(%current, ignored = %status, "superfluous status write");
            return;
        }
        self.status = Some(status);
    }

    fn write_body(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.status.is_none() {
            self.write_status(StatusCode::OK);
        }
        self.body.extend_from_slice(chunk);
        Ok(())
    }
}
