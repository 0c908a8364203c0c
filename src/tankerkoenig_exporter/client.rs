// tankerkoenig_exporter - Prometheus metrics exporter for the Tankerkoenig API
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::error;
use std::fmt;
use std::future::Future;

/// Default base URL of the Tankerkoenig API.
pub const DEFAULT_API_URL: &str = "https://creativecommons.tankerkoenig.de/";

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    InvalidUrl(String),
    InvalidStation(String),
    Unexpected(StatusCode, String),
    Api(String),
    Task(tokio::task::JoinError),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::InvalidUrl(u) => write!(f, "invalid API URL {}", u),
            Self::InvalidStation(s) => write!(f, "invalid station {}", s),
            Self::Unexpected(status, path) => write!(f, "unexpected status {} for {}", status, path),
            Self::Api(msg) => write!(f, "API error: {}", msg),
            Self::Task(e) => write!(f, "price request task failed: {}", e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            Self::Task(e) => Some(e),
            _ => None,
        }
    }
}

/// Remote lookups needed to build the station registry and scrape prices.
///
/// Implemented by `TankerkoenigClient` for the real API. Futures must be `Send` since
/// price lookups are spawned as separate tasks.
pub trait StationApi: Send + Sync + 'static {
    /// Details of a single station, `ClientError::InvalidStation` if it doesn't exist.
    fn detail(&self, id: &str) -> impl Future<Output = Result<Station, ClientError>> + Send;

    /// All stations within `radius_km` of a point.
    fn list(&self, lat: f64, lng: f64, radius_km: u32) -> impl Future<Output = Result<Vec<Station>, ClientError>> + Send;

    /// Current prices for up to ten stations, keyed by station ID.
    fn prices(&self, ids: &[String]) -> impl Future<Output = Result<HashMap<String, Price>, ClientError>> + Send;
}

#[derive(Debug)]
pub struct TankerkoenigClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl TankerkoenigClient {
    const USER_AGENT: &'static str = concat!("tankerkoenig_exporter/", env!("CARGO_PKG_VERSION"));
    const JSON_RESPONSE: &'static str = "application/json";

    pub fn new(client: Client, base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }

        Ok(TankerkoenigClient {
            client,
            base_url,
            api_key: api_key.to_owned(),
        })
    }

    async fn make_request<T: DeserializeOwned>(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<T, ClientError> {
        let url = self.endpoint_url(endpoint, query)?;
        tracing::debug!(message = "making API request", path = %url.path());

        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(|e| ClientError::Internal(e.without_url()))?;

        let res = Self::check_status(res, &url)?;
        res.json::<T>().await.map_err(|e| ClientError::Internal(e.without_url()))
    }

    fn check_status(res: Response, url: &Url) -> Result<Response, ClientError> {
        let status = res.status();
        if status == StatusCode::OK {
            Ok(res)
        } else if status == StatusCode::NOT_FOUND {
            Err(ClientError::InvalidStation(
                url.query_pairs()
                    .find(|(k, _)| k == "id")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default(),
            ))
        } else {
            // Path only, the query contains the API key
            Err(ClientError::Unexpected(status, url.path().to_owned()))
        }
    }

    fn endpoint_url(&self, endpoint: &str, query: &[(&str, &str)]) -> Result<Url, ClientError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {}", endpoint, e)))?;

        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("apikey", &self.api_key);
        }

        Ok(url)
    }
}

impl StationApi for TankerkoenigClient {
    async fn detail(&self, id: &str) -> Result<Station, ClientError> {
        let res: DetailResponse = self.make_request("json/detail.php", &[("id", id)]).await?;
        let station = ok_or_api_error(res.ok, res.message, res.station)?;

        match station {
            Some(s) if !s.id.is_empty() => Ok(s),
            _ => Err(ClientError::InvalidStation(id.to_owned())),
        }
    }

    async fn list(&self, lat: f64, lng: f64, radius_km: u32) -> Result<Vec<Station>, ClientError> {
        let lat = format!("{:.13}", lat);
        let lng = format!("{:.13}", lng);
        let rad = radius_km.to_string();
        let res: ListResponse = self
            .make_request(
                "json/list.php",
                &[
                    ("lat", lat.as_str()),
                    ("lng", lng.as_str()),
                    ("rad", rad.as_str()),
                    ("type", "all"),
                    ("sort", "dist"),
                ],
            )
            .await?;

        ok_or_api_error(res.ok, res.message, res.stations)
    }

    async fn prices(&self, ids: &[String]) -> Result<HashMap<String, Price>, ClientError> {
        let ids = ids.join(",");
        let res: PricesResponse = self.make_request("json/prices.php", &[("ids", ids.as_str())]).await?;
        ok_or_api_error(res.ok, res.message, res.prices)
    }
}

fn ok_or_api_error<T>(ok: bool, message: Option<String>, value: T) -> Result<T, ClientError> {
    if ok {
        Ok(value)
    } else {
        Err(ClientError::Api(message.unwrap_or_else(|| "request not ok".to_owned())))
    }
}

#[derive(Deserialize, Debug)]
struct DetailResponse {
    ok: bool,
    message: Option<String>,
    station: Option<Station>,
}

#[derive(Deserialize, Debug)]
struct ListResponse {
    ok: bool,
    message: Option<String>,
    #[serde(default)]
    stations: Vec<Station>,
}

#[derive(Deserialize, Debug)]
struct PricesResponse {
    ok: bool,
    message: Option<String>,
    #[serde(default)]
    prices: HashMap<String, Price>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Station {
    #[serde(alias = "id", default, deserialize_with = "null_as_empty")]
    pub id: String,
    #[serde(alias = "name", default, deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(alias = "brand", default, deserialize_with = "null_as_empty")]
    pub brand: String,
    #[serde(alias = "street", default, deserialize_with = "null_as_empty")]
    pub street: String,
    #[serde(alias = "houseNumber", default, deserialize_with = "null_as_empty")]
    pub house_number: String,
    #[serde(alias = "place", default, deserialize_with = "null_as_empty")]
    pub place: String,
    #[serde(alias = "lat", default)]
    pub lat: f64,
    #[serde(alias = "lng", default)]
    pub lng: f64,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Status of a station at the time prices were requested.
///
/// The API doesn't document a closed set of values so anything unrecognized is kept as-is.
/// A missing or `null` status is kept as an empty `Other`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(from = "Option<String>", into = "String")]
pub enum Status {
    Open,
    Closed,
    NoPrices,
    Other(String),
}

impl Default for Status {
    fn default() -> Self {
        Status::Other(String::new())
    }
}

impl From<Option<String>> for Status {
    fn from(s: Option<String>) -> Self {
        match s.as_deref() {
            Some("open") => Status::Open,
            Some("closed") => Status::Closed,
            Some("no prices") => Status::NoPrices,
            _ => Status::Other(s.unwrap_or_default()),
        }
    }
}

impl From<Status> for String {
    fn from(s: Status) -> Self {
        match s {
            Status::Open => "open".to_owned(),
            Status::Closed => "closed".to_owned(),
            Status::NoPrices => "no prices".to_owned(),
            Status::Other(s) => s,
        }
    }
}

/// Price of a single product, if the station reported one.
///
/// The API uses `false` or a string in place of a number when a product isn't sold
/// or the price is unknown, both of which end up as `Unavailable`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Default)]
#[serde(untagged)]
pub enum FuelPrice {
    Price(f64),
    #[default]
    Unavailable,
}

impl FuelPrice {
    pub fn value(&self) -> Option<f64> {
        match self {
            FuelPrice::Price(v) => Some(*v),
            FuelPrice::Unavailable => None,
        }
    }
}

impl<'de> Deserialize<'de> for FuelPrice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = serde_json::Value::deserialize(deserializer)?;
        Ok(v.as_f64().map(FuelPrice::Price).unwrap_or(FuelPrice::Unavailable))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Product {
    Diesel,
    E5,
    E10,
}

impl Product {
    pub const ALL: [Product; 3] = [Product::Diesel, Product::E5, Product::E10];

    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Diesel => "diesel",
            Product::E5 => "e5",
            Product::E10 => "e10",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Price {
    #[serde(alias = "status", default)]
    pub status: Status,
    #[serde(alias = "diesel", default)]
    pub diesel: FuelPrice,
    #[serde(alias = "e5", default)]
    pub e5: FuelPrice,
    #[serde(alias = "e10", default)]
    pub e10: FuelPrice,
}

impl Price {
    pub fn get(&self, product: Product) -> Option<f64> {
        match product {
            Product::Diesel => self.diesel.value(),
            Product::E5 => self.e5.value(),
            Product::E10 => self.e10.value(),
        }
    }
}
