//! Plain-data HTTP types shared by the client and its connectors.
//!
//! # Design
//! The client never interprets a response: whatever the connector hands back
//! is returned to the caller as-is. Owned fields keep the value independent
//! of the transport that produced it.

/// An HTTP response described as plain data.
///
/// Built by a `Connector` after executing a GET. The client does not look at
/// the status or the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Look up a header value, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}
