//! A Google Maps web services client.

use super::{Maps, Place};
use crate::geo::LatLng;
use anyhow::Error;
use async_trait::async_trait;
use derive_more::Into;
use serde::{de::DeserializeOwned, Deserialize};
use std::collections::HashMap;
use strum::Display;
use surf::Url;

const BASE_URL: &str = "https://maps.googleapis.com/maps/api/";

/// A Google Maps client.
pub struct Client {
    client: surf::Client,
    api_key: String,
}

impl Client {
    /// Connect to Google Maps.
    pub fn new(api_key: String) -> Result<Self, Error> {
        Ok(Self {
            client: surf::Config::new()
                .set_base_url(Url::parse(BASE_URL)?)
                .try_into()
                .map_err(|err| Error::msg(format!("unable to build HTTP client: {err}")))?,
            api_key,
        })
    }

    fn request(&self, endpoint: &'static str) -> Request {
        Request::new(&self.client, endpoint, self.api_key.clone())
    }
}

#[async_trait]
impl Maps for Client {
    async fn geocode(&self, address: &str) -> Result<Option<LatLng>, Error> {
        let results = self
            .request("geocode/json")
            .param("address", address)
            .get::<Vec<GeocodeResult>>()
            .await?;
        Ok(results.into_iter().next().map(|res| {
            tracing::info!(
                "geocoded {address:?} to {} ({})",
                res.geometry.location,
                res.formatted_address
            );
            res.geometry.location
        }))
    }

    async fn find_place_id(&self, name: &str, bias: LatLng) -> Result<Option<String>, Error> {
        let candidates = self
            .request("place/findplacefromtext/json")
            .param("input", name)
            .param("inputtype", "textquery")
            .param("fields", "place_id")
            .param("locationbias", format!("point:{bias}"))
            .get::<Vec<Candidate>>()
            .await?;
        Ok(candidates.into_iter().next().map(|c| c.place_id))
    }

    async fn places_nearby(
        &self,
        keyword: &str,
        location: LatLng,
        radius_m: u32,
    ) -> Result<Vec<Place>, Error> {
        self.request("place/nearbysearch/json")
            .param("location", location.to_string())
            .param("radius", radius_m.to_string())
            .param("keyword", keyword)
            .get()
            .await
    }
}

/// The body of a Google Maps API response.
///
/// Google Maps responses have the form
/// ```json
/// {
///     "status": "OK",
///     "error_message": "...",
///     ...
/// }
/// ```
/// where the remaining fields depend on the endpoint.
///
/// This trait represents the payload, which can be extracted from the fields alongside `status`.
trait ResponseBody: Sized {
    /// The container of this payload.
    type Container: DeserializeOwned + Into<Self>;
}

/// A Google Maps response containing data of type `T`.
#[derive(Clone, Debug, Deserialize)]
struct Response<T> {
    status: Status,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(flatten)]
    data: T,
}

impl<T> Response<T> {
    fn into_result(self) -> Result<T, Error> {
        match self.status {
            // An empty result set is not an error; the payload will just be empty.
            Status::Ok | Status::ZeroResults => Ok(self.data),
            status => match self.error_message {
                Some(message) => Err(Error::msg(format!(
                    "Google Maps API error ({status}): {message}"
                ))),
                None => Err(Error::msg(format!("Google Maps API error ({status})"))),
            },
        }
    }
}

/// Status codes returned by the Google Maps API.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
enum Status {
    Ok,
    ZeroResults,
    OverQueryLimit,
    OverDailyLimit,
    RequestDenied,
    InvalidRequest,
    NotFound,
    UnknownError,
    #[serde(other)]
    Other,
}

/// Response from the `geocode` endpoint.
#[derive(Clone, Debug, Deserialize, Into)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

impl ResponseBody for Vec<GeocodeResult> {
    type Container = GeocodeResponse;
}

#[derive(Clone, Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
    #[serde(default)]
    formatted_address: String,
}

#[derive(Clone, Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

/// Response from the `findplacefromtext` endpoint.
#[derive(Clone, Debug, Deserialize, Into)]
struct FindPlaceResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl ResponseBody for Vec<Candidate> {
    type Container = FindPlaceResponse;
}

#[derive(Clone, Debug, Deserialize)]
struct Candidate {
    place_id: String,
}

/// Response from the `nearbysearch` endpoint.
#[derive(Clone, Debug, Deserialize, Into)]
struct NearbyResponse {
    #[serde(default)]
    results: Vec<Place>,
}

impl ResponseBody for Vec<Place> {
    type Container = NearbyResponse;
}

struct Request {
    builder: surf::RequestBuilder,
    endpoint: &'static str,
    params: HashMap<String, String>,
}

impl Request {
    fn new(client: &surf::Client, endpoint: &'static str, api_key: String) -> Self {
        let mut params = HashMap::default();
        params.insert("key".into(), api_key);

        Self {
            builder: client.get(endpoint),
            endpoint,
            params,
        }
    }

    fn param(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(param.into(), value.into());
        self
    }

    async fn get<T: ResponseBody>(self) -> Result<T, Error> {
        let query = self
            .params
            .iter()
            .filter(|(param, _)| param.as_str() != "key")
            .collect::<HashMap<_, _>>();
        tracing::info!(endpoint = self.endpoint, ?query, "Google Maps request");
        let res: Response<T::Container> = self
            .builder
            .query(&self.params)
            .map_err(Error::msg)?
            .recv_json()
            .await
            .map_err(Error::msg)?;
        Ok(res.into_result()?.into())
    }
}
