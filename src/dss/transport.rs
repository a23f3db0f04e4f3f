//! HTTPS transport port.
//!
//! TLS, sockets and chunked decoding live in the platform adapter.  The DSS
//! client only sees a single POST and three response callbacks.

use crate::error::Result;

/// One outgoing DSS request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpRequest<'a> {
    pub host: &'a str,
    pub port: u16,
    pub path: &'a str,
    pub content_type: &'static str,
    /// Extra `(name, value)` headers, e.g. a request signature.
    pub headers: &'a [(&'static str, &'a str)],
    pub body: &'a [u8],
}

/// Receives a response as the transport parses it.  Any `Err` aborts the
/// exchange; the transport must return promptly afterwards.
pub trait ResponseHandler {
    fn on_status_code(&mut self, code: u16) -> Result<()>;
    fn on_header(&mut self, name: &str, value: &[u8]) -> Result<()>;
    /// The complete body, delivered once.
    fn on_body(&mut self, body: &[u8]) -> Result<()>;
}

pub trait HttpTransport {
    /// POST `request` over HTTPS and feed the response to `handler`.
    /// Connection-level timeouts are the transport's business.
    fn execute(&mut self, request: &HttpRequest<'_>, handler: &mut dyn ResponseHandler)
    -> Result<()>;
}
