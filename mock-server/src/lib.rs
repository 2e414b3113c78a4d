use std::collections::BTreeMap;

use axum::{
    extract::Query,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

pub const USER: &str = "reseller";
pub const PASSWORD: &str = "secret";

const LINE_PREFIX: &str = "checkAvailabilityLines[";

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponseLine {
    pub ean13: String,
    pub gln_distributor: String,
    pub unit_price: i64,
    pub unit_price_excluding_tax: i64,
    pub return_status: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub return_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default)]
    pub check_availability_response_lines: Vec<AvailabilityResponseLine>,
}

impl AvailabilityResponse {
    fn error(message: String) -> Self {
        Self {
            return_status: "ERROR".to_string(),
            return_message: Some(message),
            country: None,
            check_availability_response_lines: Vec::new(),
        }
    }
}

type Params = Vec<(String, String)>;

pub fn app() -> Router {
    Router::new()
        .route("/v3/hub-numerique-api/onix/getNotice", get(get_notice))
        .route(
            "/v3/hub-numerique-api/json/checkAvailability",
            get(check_availability),
        )
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn authorized(headers: &HeaderMap) -> bool {
    let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    let Some(token) = value.strip_prefix("Basic ") else {
        return false;
    };
    STANDARD
        .decode(token)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .is_some_and(|pair| pair == format!("{USER}:{PASSWORD}"))
}

fn param<'a>(params: &'a Params, key: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

async fn get_notice(headers: HeaderMap, Query(params): Query<Params>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let (Some(ean13), Some(contractor), Some(distributor)) = (
        param(&params, "ean13"),
        param(&params, "glnContractor"),
        param(&params, "glnDistributor"),
    ) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    if ean13 == "0000000000000" {
        return StatusCode::NOT_FOUND.into_response();
    }

    let body = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <ONIXMessage release=\"3.0\">\
         <Header><Sender><SenderIdentifier><IDValue>{distributor}</IDValue></SenderIdentifier></Sender>\
         <Addressee><AddresseeIdentifier><IDValue>{contractor}</IDValue></AddresseeIdentifier></Addressee></Header>\
         <Product><ProductIdentifier><ProductIDType>03</ProductIDType><IDValue>{ean13}</IDValue></ProductIdentifier></Product>\
         </ONIXMessage>"
    );
    ([(header::CONTENT_TYPE, "application/xml")], body).into_response()
}

#[derive(Default)]
struct PartialLine {
    ean13: Option<String>,
    gln_distributor: Option<String>,
    unit_price: Option<i64>,
    unit_price_excluding_tax: Option<i64>,
}

/// Split `checkAvailabilityLines[3].ean13` into `(3, "ean13")`.
fn line_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix(LINE_PREFIX)?;
    let (index, field) = rest.split_once("].")?;
    Some((index.parse().ok()?, field))
}

fn collect_lines(params: &Params) -> Result<Vec<AvailabilityResponseLine>, String> {
    let mut lines: BTreeMap<usize, PartialLine> = BTreeMap::new();
    for (key, value) in params {
        if key == "country" {
            continue;
        }
        let (index, field) = line_key(key).ok_or_else(|| format!("unexpected parameter {key}"))?;
        let line = lines.entry(index).or_default();
        let price = || value.parse::<i64>().map_err(|_| format!("{key} is not an integer"));
        match field {
            "ean13" => line.ean13 = Some(value.clone()),
            "glnDistributor" => line.gln_distributor = Some(value.clone()),
            "unitPrice" => line.unit_price = Some(price()?),
            "unitPriceExcludingTax" => line.unit_price_excluding_tax = Some(price()?),
            _ => return Err(format!("unexpected parameter {key}")),
        }
    }

    lines
        .into_iter()
        .enumerate()
        .map(|(expected, (index, line))| {
            if expected != index {
                return Err(format!("line {expected} is missing"));
            }
            match line {
                PartialLine {
                    ean13: Some(ean13),
                    gln_distributor: Some(gln_distributor),
                    unit_price: Some(unit_price),
                    unit_price_excluding_tax: Some(unit_price_excluding_tax),
                } => Ok(AvailabilityResponseLine {
                    ean13,
                    gln_distributor,
                    unit_price,
                    unit_price_excluding_tax,
                    return_status: "AVAILABLE".to_string(),
                }),
                _ => Err(format!("line {index} is incomplete")),
            }
        })
        .collect()
}

async fn check_availability(headers: HeaderMap, Query(params): Query<Params>) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    match collect_lines(&params) {
        Ok(lines) => Json(AvailabilityResponse {
            return_status: "OK".to_string(),
            return_message: None,
            country: param(&params, "country").map(str::to_string),
            check_availability_response_lines: lines,
        })
        .into_response(),
        Err(message) => (
            StatusCode::BAD_REQUEST,
            Json(AvailabilityResponse::error(message)),
        )
            .into_response(),
    }
}
