//! Transport capability used by `Client`, and its default ureq implementation.
//!
//! # Design
//! The client only builds a path and a set of options; a `Connector` owns the
//! network round-trip, TLS behaviour and anything done with the response.
//! Tests substitute their own implementation to observe exactly what the
//! client would send.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::Error;
use crate::http::HttpResponse;
use crate::query::Query;
use crate::types::Credentials;

/// Fully resolved options for one GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorOptions {
    pub auth: Credentials,
    pub verify: bool,
    pub debug: bool,
    pub query: Query,
}

/// Something that can perform an authenticated GET.
///
/// `path` is absolute on the API host (it starts with `/`). The returned
/// response is handed back to the caller unchanged.
pub trait Connector: Send + Sync {
    fn get(&self, path: &str, options: &ConnectorOptions) -> Result<HttpResponse, Error>;
}

/// Default connector: blocking HTTP over ureq against a fixed base URL.
pub struct UreqConnector {
    base_url: String,
    verified: ureq::Agent,
    unverified: ureq::Agent,
}

impl UreqConnector {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            verified: build_agent(true),
            unverified: build_agent(false),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn agent(&self, verify: bool) -> &ureq::Agent {
        if verify {
            &self.verified
        } else {
            &self.unverified
        }
    }
}

impl std::fmt::Debug for UreqConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UreqConnector")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Status codes are returned as data; the client does not interpret them.
fn build_agent(verify: bool) -> ureq::Agent {
    let tls = ureq::tls::TlsConfig::builder()
        .disable_verification(!verify)
        .build();
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .tls_config(tls)
        .build()
        .new_agent()
}

fn basic_auth(credentials: &Credentials) -> String {
    let token = STANDARD.encode(format!("{}:{}", credentials.user, credentials.password));
    format!("Basic {token}")
}

impl Connector for UreqConnector {
    fn get(&self, path: &str, options: &ConnectorOptions) -> Result<HttpResponse, Error> {
        let url = format!("{}{path}", self.base_url);
        if options.debug {
            tracing::debug!(
                url = %url,
                user = %options.auth.user,
                verify = options.verify,
                query = ?options.query,
                "hub request"
            );
        }

        let mut response = self
            .agent(options.verify)
            .get(&url)
            .header("Authorization", basic_auth(&options.auth))
            .query_pairs(options.query.iter())
            .call()?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string()?;

        if options.debug {
            tracing::debug!(url = %url, status, bytes = body.len(), "hub response");
        }

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
