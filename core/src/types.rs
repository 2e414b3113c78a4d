//! Domain types for the Hub Numérique API.
//!
//! # Design
//! `AvailabilityLine` keeps every field optional because lines are often
//! assembled from caller JSON; completeness is checked when a query is built,
//! not when a line is created. `ClientConfig` is the serde-facing view of a
//! client's settings and is applied through the same setters as the
//! builder-style API.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Deployment environment of the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Test,
    Production,
}

impl Environment {
    /// Fixed base endpoint of the environment.
    pub fn base_url(self) -> &'static str {
        match self {
            Environment::Test => "https://hub-test.centprod.com",
            Environment::Production => "https://hub-dilicom.centprod.com",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test" => Ok(Environment::Test),
            "production" => Ok(Environment::Production),
            other => Err(Error::Configuration(format!(
                "unknown environment {other:?}, expected \"test\" or \"production\""
            ))),
        }
    }
}

/// Basic-auth credentials sent with every request.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// One line of an availability check.
///
/// All four fields must be present when the line is sent. Absent fields are
/// skipped when the line is serialized, so a validation error shows exactly
/// what the caller provided.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ean13: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gln_distributor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price_excluding_tax: Option<i64>,
}

impl AvailabilityLine {
    /// A complete line.
    pub fn new(
        ean13: impl Into<String>,
        gln_distributor: impl Into<String>,
        unit_price: i64,
        unit_price_excluding_tax: i64,
    ) -> Self {
        Self {
            ean13: Some(ean13.into()),
            gln_distributor: Some(gln_distributor.into()),
            unit_price: Some(unit_price),
            unit_price_excluding_tax: Some(unit_price_excluding_tax),
        }
    }

    /// Borrow the four fields, or fail with the serialized line if any is
    /// missing.
    pub(crate) fn require(&self, index: usize) -> Result<CompleteLine<'_>, Error> {
        match (
            self.ean13.as_deref(),
            self.gln_distributor.as_deref(),
            self.unit_price,
            self.unit_price_excluding_tax,
        ) {
            (Some(ean13), Some(gln_distributor), Some(unit_price), Some(unit_price_excluding_tax)) => {
                Ok(CompleteLine {
                    ean13,
                    gln_distributor,
                    unit_price,
                    unit_price_excluding_tax,
                })
            }
            _ => Err(Error::Validation {
                index,
                line: serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}")),
            }),
        }
    }
}

/// An `AvailabilityLine` whose fields have all been checked.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CompleteLine<'a> {
    pub ean13: &'a str,
    pub gln_distributor: &'a str,
    pub unit_price: i64,
    pub unit_price_excluding_tax: i64,
}

fn default_verify_ssl() -> bool {
    true
}

/// Serializable client settings, e.g. loaded from a JSON file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub user: String,
    pub password: String,
    pub environment: Environment,
    #[serde(default)]
    pub reseller_country: Option<String>,
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    #[serde(default)]
    pub debug: bool,
}
