//! Facilities for geocoding and place search through Google Maps.

use crate::geo::LatLng;
use anyhow::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

mod client;
mod local;

pub use client::Client;
pub use local::LocalClient;

/// A Google Maps client.
#[async_trait]
pub trait Maps: Send + Sync {
    /// Find the location of an address.
    ///
    /// # Returns
    ///
    /// The location of the best match, or [`None`] if the address could not be found.
    async fn geocode(&self, address: &str) -> Result<Option<LatLng>, Error>;

    /// Find the place ID of a business by name, preferring matches near `bias`.
    async fn find_place_id(&self, name: &str, bias: LatLng) -> Result<Option<String>, Error>;

    /// Search for places matching `keyword` within `radius_m` meters of `location`.
    ///
    /// Results are in the order Google Maps would list them.
    async fn places_nearby(
        &self,
        keyword: &str,
        location: LatLng,
        radius_m: u32,
    ) -> Result<Vec<Place>, Error>;
}

#[async_trait]
impl<T: Maps + ?Sized> Maps for Box<T> {
    async fn geocode(&self, address: &str) -> Result<Option<LatLng>, Error> {
        (**self).geocode(address).await
    }

    async fn find_place_id(&self, name: &str, bias: LatLng) -> Result<Option<String>, Error> {
        (**self).find_place_id(name, bias).await
    }

    async fn places_nearby(
        &self,
        keyword: &str,
        location: LatLng,
        radius_m: u32,
    ) -> Result<Vec<Place>, Error> {
        (**self).places_nearby(keyword, location, radius_m).await
    }
}

/// A place listed on Google Maps.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Place {
    pub place_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vicinity: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}
