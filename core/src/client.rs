//! Request builder for the Hub Numérique API.
//!
//! # Design
//! `Client` turns domain calls into a path under `/v3/hub-numerique-api/` and
//! an ordered flat query, then hands both to its `Connector`. It holds the
//! credentials, environment and transport flags; everything network-related
//! lives behind the connector. Setters consume and return the client so a
//! configuration reads as one chain.

use tracing::{debug, warn};

use crate::connector::{Connector, ConnectorOptions, UreqConnector};
use crate::error::Error;
use crate::http::HttpResponse;
use crate::query::Query;
use crate::types::{AvailabilityLine, ClientConfig, Credentials, Environment};

const API_PREFIX: &str = "/v3/hub-numerique-api/";
const NOTICE_PATH: &str = "onix/getNotice";
const AVAILABILITY_PATH: &str = "json/checkAvailability";

/// Caller-side options for a single request. Any field set here replaces the
/// client's default for that request.
#[derive(Debug, Clone, Default)]
struct RequestOptions {
    auth: Option<Credentials>,
    verify: Option<bool>,
    debug: Option<bool>,
    query: Query,
}

impl RequestOptions {
    fn query(query: Query) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }
}

/// Client for the notice and availability endpoints.
pub struct Client {
    credentials: Credentials,
    environment: Environment,
    reseller_country: Option<String>,
    verify_ssl: bool,
    debug: bool,
    connector: Box<dyn Connector>,
}

impl Client {
    /// Create a client for the environment named `environment`
    /// (`"test"` or `"production"`).
    pub fn new(
        user: impl Into<String>,
        password: impl Into<String>,
        environment: &str,
    ) -> Result<Self, Error> {
        let environment = environment.parse::<Environment>()?;
        Ok(Self::with_environment(user, password, environment))
    }

    pub fn with_environment(
        user: impl Into<String>,
        password: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            credentials: Credentials::new(user, password),
            environment,
            reseller_country: None,
            verify_ssl: true,
            debug: false,
            connector: Box::new(UreqConnector::new(environment.base_url())),
        }
    }

    /// Build a client from deserialized settings. The production TLS rule
    /// applies exactly as with `disable_ssl_verification`.
    pub fn from_config(config: ClientConfig) -> Result<Self, Error> {
        let mut client = Self::with_environment(config.user, config.password, config.environment);
        if let Some(country) = config.reseller_country {
            client = client.set_reseller_country(country);
        }
        if !config.verify_ssl {
            client = client.disable_ssl_verification()?;
        }
        if config.debug {
            client = client.enable_debug();
        }
        Ok(client)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn base_url(&self) -> &'static str {
        self.environment.base_url()
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn reseller_country(&self) -> Option<&str> {
        self.reseller_country.as_deref()
    }

    pub fn verify_ssl(&self) -> bool {
        self.verify_ssl
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Replace the transport.
    pub fn set_connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Box::new(connector);
        self
    }

    /// ISO 3166-1 code sent as `country` on availability checks.
    pub fn set_reseller_country(mut self, country: impl Into<String>) -> Self {
        self.reseller_country = Some(country.into());
        self
    }

    /// Turn off TLS certificate verification. Refused in production.
    pub fn disable_ssl_verification(mut self) -> Result<Self, Error> {
        if self.environment == Environment::Production {
            return Err(Error::Configuration(
                "SSL verification cannot be disabled in production".to_string(),
            ));
        }
        if self.verify_ssl {
            warn!(environment = %self.environment, "SSL verification disabled");
        }
        self.verify_ssl = false;
        Ok(self)
    }

    pub fn enable_debug(mut self) -> Self {
        self.debug = true;
        self
    }

    /// Fetch the ONIX notice of `ean13` as seen by a contractor/distributor
    /// pair. The identifiers are sent as given.
    pub fn get_notice(
        &self,
        ean13: &str,
        gln_contractor: &str,
        gln_distributor: &str,
    ) -> Result<HttpResponse, Error> {
        let mut query = Query::new();
        query.push("glnContractor", gln_contractor);
        query.push("ean13", ean13);
        query.push("glnDistributor", gln_distributor);
        self.request(NOTICE_PATH, RequestOptions::query(query))
    }

    /// Availability of a single e-book at the given prices.
    pub fn get_ebook_availability(
        &self,
        ean13: &str,
        gln_distributor: &str,
        unit_price: i64,
        unit_price_excluding_tax: i64,
    ) -> Result<HttpResponse, Error> {
        let line = AvailabilityLine::new(ean13, gln_distributor, unit_price, unit_price_excluding_tax);
        self.get_ebooks_availabilities(std::slice::from_ref(&line))
    }

    /// Availability of several e-books in one call. Fails before any network
    /// traffic if a line is incomplete.
    pub fn get_ebooks_availabilities(
        &self,
        lines: &[AvailabilityLine],
    ) -> Result<HttpResponse, Error> {
        let query = self.availability_query(lines)?;
        self.request(AVAILABILITY_PATH, RequestOptions::query(query))
    }

    /// The query `get_ebooks_availabilities` would send for `lines`.
    ///
    /// Lines are checked in order and the first incomplete one is reported.
    /// Each line `i` contributes `checkAvailabilityLines[i].ean13`,
    /// `.glnDistributor`, `.unitPrice` and `.unitPriceExcludingTax`; the
    /// reseller country, when set, comes first as `country`.
    pub fn availability_query(&self, lines: &[AvailabilityLine]) -> Result<Query, Error> {
        let complete = lines
            .iter()
            .enumerate()
            .map(|(index, line)| line.require(index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut query = Query::new();
        if let Some(country) = &self.reseller_country {
            query.push("country", country.as_str());
        }
        for (i, line) in complete.iter().enumerate() {
            query.push(format!("checkAvailabilityLines[{i}].ean13"), line.ean13);
            query.push(
                format!("checkAvailabilityLines[{i}].glnDistributor"),
                line.gln_distributor,
            );
            query.push(
                format!("checkAvailabilityLines[{i}].unitPrice"),
                line.unit_price.to_string(),
            );
            query.push(
                format!("checkAvailabilityLines[{i}].unitPriceExcludingTax"),
                line.unit_price_excluding_tax.to_string(),
            );
        }
        Ok(query)
    }

    fn request(&self, api_path: &str, options: RequestOptions) -> Result<HttpResponse, Error> {
        let path = format!("{API_PREFIX}{api_path}");
        let options = ConnectorOptions {
            auth: options.auth.unwrap_or_else(|| self.credentials.clone()),
            verify: options.verify.unwrap_or(self.verify_ssl),
            debug: options.debug.unwrap_or(self.debug),
            query: options.query,
        };
        debug!(
            path = %path,
            params = options.query.len(),
            verify = options.verify,
            debug = options.debug,
            "dispatching request"
        );
        self.connector.get(&path, &options)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("credentials", &self.credentials)
            .field("environment", &self.environment)
            .field("reseller_country", &self.reseller_country)
            .field("verify_ssl", &self.verify_ssl)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use test_case::test_case;

    use super::*;

    type Calls = Arc<Mutex<Vec<(String, ConnectorOptions)>>>;

    /// Records every call and answers 200 with an empty JSON object.
    #[derive(Clone, Default)]
    struct Recorder {
        calls: Calls,
    }

    impl Recorder {
        fn calls(&self) -> Vec<(String, ConnectorOptions)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Connector for Recorder {
        fn get(&self, path: &str, options: &ConnectorOptions) -> Result<HttpResponse, Error> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_string(), options.clone()));
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: "{}".to_string(),
            })
        }
    }

    struct Refused;

    impl Connector for Refused {
        fn get(&self, _path: &str, _options: &ConnectorOptions) -> Result<HttpResponse, Error> {
            Err(Error::transport(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )))
        }
    }

    fn client(recorder: &Recorder) -> Client {
        Client::new("reseller", "secret", "test")
            .unwrap()
            .set_connector(recorder.clone())
    }

    fn line(i: i64) -> AvailabilityLine {
        AvailabilityLine::new(format!("978207036822{i}"), "3012410001000", 1000 + i, 900 + i)
    }

    #[test_case("test", "https://hub-test.centprod.com" ; "test environment")]
    #[test_case("production", "https://hub-dilicom.centprod.com" ; "production environment")]
    fn new_binds_base_url(environment: &str, expected: &str) {
        let client = Client::new("u", "p", environment).unwrap();
        assert_eq!(client.base_url(), expected);
        assert!(client.verify_ssl());
        assert!(!client.debug());
        assert_eq!(client.reseller_country(), None);
    }

    #[test_case("" ; "empty")]
    #[test_case("prod" ; "abbreviation")]
    #[test_case("TEST" ; "uppercase")]
    #[test_case(" test" ; "leading space")]
    #[test_case("staging" ; "other name")]
    fn new_rejects_unknown_environment(environment: &str) {
        let err = Client::new("u", "p", environment).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn disable_ssl_verification_refused_in_production() {
        let err = Client::new("u", "p", "production")
            .unwrap()
            .disable_ssl_verification()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn disable_ssl_verification_is_idempotent_in_test() {
        let client = Client::new("u", "p", "test")
            .unwrap()
            .disable_ssl_verification()
            .unwrap()
            .disable_ssl_verification()
            .unwrap();
        assert!(!client.verify_ssl());
    }

    #[test]
    fn get_notice_sends_three_keys() {
        let recorder = Recorder::default();
        let response = client(&recorder)
            .get_notice("9782070368228", "3025594195700", "3012410001000")
            .unwrap();
        assert_eq!(response.status, 200);

        let calls = recorder.calls();
        assert_eq!(calls.len(), 1);
        let (path, options) = &calls[0];
        assert_eq!(path, "/v3/hub-numerique-api/onix/getNotice");
        assert_eq!(
            options.query.iter().collect::<Vec<_>>(),
            vec![
                ("glnContractor", "3025594195700"),
                ("ean13", "9782070368228"),
                ("glnDistributor", "3012410001000"),
            ]
        );
        assert_eq!(options.auth, Credentials::new("reseller", "secret"));
        assert!(options.verify);
        assert!(!options.debug);
    }

    #[test]
    fn get_notice_ignores_reseller_country() {
        let recorder = Recorder::default();
        client(&recorder)
            .set_reseller_country("FR")
            .get_notice("1", "2", "3")
            .unwrap();
        assert_eq!(recorder.calls()[0].1.query.get("country"), None);
    }

    #[test]
    fn availability_keys_follow_input_order() {
        let recorder = Recorder::default();
        let lines: Vec<_> = (0..3).map(line).collect();
        client(&recorder).get_ebooks_availabilities(&lines).unwrap();

        let (path, options) = &recorder.calls()[0];
        assert_eq!(path, "/v3/hub-numerique-api/json/checkAvailability");
        assert_eq!(options.query.len(), 12);
        for (i, expected) in lines.iter().enumerate() {
            assert_eq!(
                options.query.get(&format!("checkAvailabilityLines[{i}].ean13")),
                expected.ean13.as_deref()
            );
            assert_eq!(
                options
                    .query
                    .get(&format!("checkAvailabilityLines[{i}].unitPrice")),
                Some((1000 + i as i64).to_string().as_str())
            );
            assert_eq!(
                options
                    .query
                    .get(&format!("checkAvailabilityLines[{i}].unitPriceExcludingTax")),
                Some((900 + i as i64).to_string().as_str())
            );
        }
        assert_eq!(options.query.get("country"), None);
    }

    #[test]
    fn availability_keys_are_grouped_per_line() {
        let query = Client::new("u", "p", "test")
            .unwrap()
            .availability_query(&[line(0), line(1)])
            .unwrap();
        assert_eq!(
            query.keys().collect::<Vec<_>>(),
            vec![
                "checkAvailabilityLines[0].ean13",
                "checkAvailabilityLines[0].glnDistributor",
                "checkAvailabilityLines[0].unitPrice",
                "checkAvailabilityLines[0].unitPriceExcludingTax",
                "checkAvailabilityLines[1].ean13",
                "checkAvailabilityLines[1].glnDistributor",
                "checkAvailabilityLines[1].unitPrice",
                "checkAvailabilityLines[1].unitPriceExcludingTax",
            ]
        );
    }

    #[test]
    fn country_is_emitted_once() {
        let query = Client::new("u", "p", "test")
            .unwrap()
            .set_reseller_country("BE")
            .availability_query(&[line(0), line(1), line(2)])
            .unwrap();
        assert_eq!(query.len(), 13);
        assert_eq!(query.keys().filter(|k| *k == "country").count(), 1);
        assert_eq!(query.get("country"), Some("BE"));
    }

    #[test]
    fn empty_lines_with_country_sends_only_country() {
        let recorder = Recorder::default();
        client(&recorder)
            .set_reseller_country("FR")
            .get_ebooks_availabilities(&[])
            .unwrap();
        let query = &recorder.calls()[0].1.query;
        assert_eq!(query.iter().collect::<Vec<_>>(), vec![("country", "FR")]);
    }

    #[test]
    fn empty_lines_without_country_sends_empty_query() {
        let recorder = Recorder::default();
        client(&recorder).get_ebooks_availabilities(&[]).unwrap();
        assert!(recorder.calls()[0].1.query.is_empty());
    }

    #[test]
    fn single_availability_matches_batch_of_one() {
        let single = Recorder::default();
        client(&single)
            .get_ebook_availability("9782070368228", "3012410001000", 100, 80)
            .unwrap();

        let batch = Recorder::default();
        client(&batch)
            .get_ebooks_availabilities(&[AvailabilityLine::new(
                "9782070368228",
                "3012410001000",
                100,
                80,
            )])
            .unwrap();

        assert_eq!(single.calls(), batch.calls());
    }

    #[test_case(AvailabilityLine { ean13: None, ..line(1) } ; "missing ean13")]
    #[test_case(AvailabilityLine { gln_distributor: None, ..line(1) } ; "missing gln distributor")]
    #[test_case(AvailabilityLine { unit_price: None, ..line(1) } ; "missing unit price")]
    #[test_case(AvailabilityLine { unit_price_excluding_tax: None, ..line(1) } ; "missing price excluding tax")]
    fn incomplete_line_fails_without_network(bad: AvailabilityLine) {
        let recorder = Recorder::default();
        let err = client(&recorder)
            .get_ebooks_availabilities(&[line(0), bad.clone(), line(2)])
            .unwrap_err();
        match err {
            Error::Validation { index, line } => {
                assert_eq!(index, 1);
                assert_eq!(line, serde_json::to_string(&bad).unwrap());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn validation_stops_at_first_incomplete_line() {
        let lines = vec![
            line(0),
            AvailabilityLine::default(),
            AvailabilityLine {
                ean13: None,
                ..line(2)
            },
        ];
        let err = Client::new("u", "p", "test")
            .unwrap()
            .availability_query(&lines)
            .unwrap_err();
        match err {
            Error::Validation { index, line } => {
                assert_eq!(index, 1);
                assert_eq!(line, "{}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn flags_reach_the_connector() {
        let recorder = Recorder::default();
        client(&recorder)
            .disable_ssl_verification()
            .unwrap()
            .enable_debug()
            .get_notice("1", "2", "3")
            .unwrap();
        let options = &recorder.calls()[0].1;
        assert!(!options.verify);
        assert!(options.debug);
    }

    #[test]
    fn request_defaults_fill_missing_options() {
        let recorder = Recorder::default();
        let query: Query = [("ean13", "9782070368228")].into_iter().collect();
        client(&recorder)
            .request("onix/getNotice", RequestOptions::query(query.clone()))
            .unwrap();
        let options = &recorder.calls()[0].1;
        assert_eq!(options.auth, Credentials::new("reseller", "secret"));
        assert!(options.verify);
        assert!(!options.debug);
        assert_eq!(options.query, query);
    }

    #[test]
    fn request_options_override_defaults() {
        let recorder = Recorder::default();
        let query: Query = [("ean13", "9782070368228")].into_iter().collect();
        client(&recorder)
            .request(
                "onix/getNotice",
                RequestOptions {
                    auth: Some(Credentials::new("other", "pw")),
                    verify: Some(false),
                    debug: Some(true),
                    query: query.clone(),
                },
            )
            .unwrap();
        let options = &recorder.calls()[0].1;
        assert_eq!(options.auth, Credentials::new("other", "pw"));
        assert!(!options.verify);
        assert!(options.debug);
        assert_eq!(options.query, query);
    }

    #[test]
    fn transport_errors_propagate() {
        let client = Client::new("u", "p", "test").unwrap().set_connector(Refused);
        let err = client.get_notice("1", "2", "3").unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.to_string(), "connection refused");
    }

    #[test]
    fn from_config_applies_settings() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"user":"u","password":"p","environment":"test","resellerCountry":"FR","verifySsl":false,"debug":true}"#,
        )
        .unwrap();
        let client = Client::from_config(config).unwrap();
        assert_eq!(client.environment(), Environment::Test);
        assert_eq!(client.reseller_country(), Some("FR"));
        assert!(!client.verify_ssl());
        assert!(client.debug());
    }

    #[test]
    fn from_config_refuses_unverified_production() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"user":"u","password":"p","environment":"production","verifySsl":false}"#,
        )
        .unwrap();
        let err = Client::from_config(config).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn debug_output_hides_password() {
        let client = Client::new("reseller", "secret", "test").unwrap();
        let rendered = format!("{client:?}");
        assert!(rendered.contains("reseller"));
        assert!(!rendered.contains("secret"));
    }
}
