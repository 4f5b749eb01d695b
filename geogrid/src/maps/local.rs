//! A Google Maps client which reads from the local file system instead of the Google Maps API.

use super::{Maps, Place};
use crate::geo::{distance_km, LatLng};
use anyhow::Error;
use async_trait::async_trait;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// The name of the fixture file within a fixtures directory.
pub const FIXTURE_FILE: &str = "maps.json";

/// A Google Maps client which reads from the local file system instead of the Google Maps API.
///
/// The client is backed by a single JSON file, `maps.json`, of the form
///
/// ```json
/// {
///     "geocode": { "<address>": { "lat": 0.0, "lng": 0.0 } },
///     "places": [
///         {
///             "place_id": "...",
///             "name": "...",
///             "location": { "lat": 0.0, "lng": 0.0 },
///             "keywords": ["..."]
///         }
///     ]
/// }
/// ```
///
/// Nearby searches return the places tagged with the keyword, closest first.
#[derive(Clone, Debug)]
pub struct LocalClient {
    root: PathBuf,
    fixture: Fixture,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct Fixture {
    #[serde(default)]
    geocode: HashMap<String, LatLng>,
    #[serde(default)]
    places: Vec<FixturePlace>,
}

#[derive(Clone, Debug, Deserialize)]
struct FixturePlace {
    #[serde(flatten)]
    place: Place,
    location: LatLng,
    #[serde(default)]
    keywords: Vec<String>,
}

impl FixturePlace {
    fn matches(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k.eq_ignore_ascii_case(keyword))
    }
}

impl LocalClient {
    /// Open a fixtures directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(FIXTURE_FILE);
        let file = File::open(&path)
            .map_err(|err| Error::msg(format!("unable to open {}: {err}", path.display())))?;
        let fixture = serde_json::from_reader(file)
            .map_err(|err| Error::msg(format!("{} is malformed: {err}", path.display())))?;
        Ok(Self { root, fixture })
    }

    /// The fixtures directory this client reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Maps for LocalClient {
    async fn geocode(&self, address: &str) -> Result<Option<LatLng>, Error> {
        let address = address.trim();
        Ok(self.fixture.geocode.get(address).copied().or_else(|| {
            self.fixture
                .geocode
                .iter()
                .find(|(known, _)| known.eq_ignore_ascii_case(address))
                .map(|(_, loc)| *loc)
        }))
    }

    async fn find_place_id(&self, name: &str, bias: LatLng) -> Result<Option<String>, Error> {
        let name = name.trim().to_lowercase();
        if name.is_empty() {
            return Ok(None);
        }
        Ok(self
            .fixture
            .places
            .iter()
            .filter(|p| p.place.name.to_lowercase().contains(&name))
            .min_by(|a, b| by_distance(bias, a, b))
            .map(|p| p.place.place_id.clone()))
    }

    async fn places_nearby(
        &self,
        keyword: &str,
        location: LatLng,
        radius_m: u32,
    ) -> Result<Vec<Place>, Error> {
        let radius_km = f64::from(radius_m) / 1000.0;
        let mut places = self
            .fixture
            .places
            .iter()
            .filter(|p| p.matches(keyword) && distance_km(location, p.location) <= radius_km)
            .collect::<Vec<_>>();
        places.sort_by(|a, b| by_distance(location, a, b));
        tracing::debug!(keyword, %location, "{} local places nearby", places.len());
        Ok(places.into_iter().map(|p| p.place.clone()).collect())
    }
}

fn by_distance(from: LatLng, a: &FixturePlace, b: &FixturePlace) -> Ordering {
    distance_km(from, a.location)
        .total_cmp(&distance_km(from, b.location))
        .then_with(|| a.place.name.cmp(&b.place.name))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures_dir;

    const ADDRESS: &str = "1600 Amphitheatre Parkway, Mountain View, CA";

    #[async_std::test]
    async fn test_geocode() {
        let client = LocalClient::open(fixtures_dir()).unwrap();
        let center = client.geocode(ADDRESS).await.unwrap().unwrap();
        assert_eq!(center, LatLng::new(37.422, -122.0841));
        assert_eq!(
            client.geocode(&ADDRESS.to_uppercase()).await.unwrap(),
            Some(center)
        );
        assert_eq!(client.geocode("nowhere").await.unwrap(), None);
    }

    #[async_std::test]
    async fn test_find_place_id() {
        let client = LocalClient::open(fixtures_dir()).unwrap();
        let center = LatLng::new(37.422, -122.0841);
        assert_eq!(
            client.find_place_id("bean there", center).await.unwrap(),
            Some("place-bean-there".into())
        );
        assert_eq!(client.find_place_id("", center).await.unwrap(), None);
        assert_eq!(
            client.find_place_id("No Such Cafe", center).await.unwrap(),
            None
        );
    }

    #[async_std::test]
    async fn test_places_nearby() {
        let client = LocalClient::open(fixtures_dir()).unwrap();
        let center = LatLng::new(37.422, -122.0841);
        let places = client
            .places_nearby("espresso bar", center, 1000)
            .await
            .unwrap();
        assert!(!places.is_empty());
        assert!(places.iter().all(|p| p.place_id != "place-tea-house"));

        // Nothing is within a meter of the center.
        assert!(client
            .places_nearby("espresso bar", center, 1)
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_fixtures() {
        LocalClient::open("/nonexistent/fixtures").unwrap_err();
    }
}
