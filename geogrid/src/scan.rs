//! Running a scan: ranking a business at every point of a grid, for every keyword.

use crate::{
    geo::LatLng,
    grid::{self, GridPoint, Shape},
    maps::{self, Maps, Place},
    serp::{self, Serp, SerpEntry, SerpQuery, SerpResults},
};
use anyhow::Error;
use async_std::task::sleep;
use chrono::{DateTime, Utc};
use clap::Args;
use futures::future::join;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};
use ulid::{Generator, Ulid};

/// Unique identifier of a scan.
///
/// Scan IDs sort in the order the scans were started.
pub type ScanId = Ulid;

static ID_GENERATOR: Mutex<Option<Generator>> = Mutex::new(None);

/// Mint a new scan ID.
///
/// IDs minted by this process are strictly increasing, even within the same millisecond.
pub fn new_scan_id() -> ScanId {
    let mut generator = ID_GENERATOR
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    match generator.get_or_insert_with(Generator::new).generate() {
        Ok(id) => id,
        Err(err) => {
            tracing::warn!("scan ID generator exhausted for this millisecond: {err}");
            Ulid::new()
        }
    }
}

pub const DEFAULT_ADDRESS: &str = "1600 Amphitheatre Parkway, Mountain View, CA";
pub const DEFAULT_KEYWORDS: &str = "coffee shop near me\nespresso bar\ncafé";
pub const MIN_RADIUS_KM: f64 = 0.5;
pub const MAX_RADIUS_KM: f64 = 10.0;
pub const MIN_STEP_KM: f64 = 0.1;
pub const MAX_STEP_KM: f64 = 2.0;

/// Split a block of text into keywords, one per line.
pub fn parse_keywords(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// What to scan for.
#[derive(Clone, Debug, PartialEq, Args, Deserialize, Serialize)]
pub struct ScanRequest {
    /// The name of the business profile to look for.
    #[clap(short, long, env = "GEOGRID_BUSINESS")]
    pub business: String,

    /// The address of the business, used as the center of the grid.
    #[clap(short, long, env = "GEOGRID_ADDRESS", default_value = DEFAULT_ADDRESS)]
    #[serde(default = "default_address")]
    pub address: String,

    /// The outline of the grid (Circle or Square).
    #[clap(long, env = "GEOGRID_SHAPE", default_value = "Circle")]
    #[serde(default)]
    pub shape: Shape,

    /// Distance from the center to the edge of the grid, in km.
    #[clap(short, long = "radius", env = "GEOGRID_RADIUS_KM", default_value_t = 2.0)]
    #[serde(default = "default_radius")]
    pub radius_km: f64,

    /// Spacing between grid points, in km.
    #[clap(short, long = "spacing", env = "GEOGRID_SPACING_KM", default_value_t = 0.5)]
    #[serde(default = "default_step")]
    pub step_km: f64,

    /// A keyword to check. May be given more than once.
    #[clap(short, long = "keyword", value_name = "KEYWORD")]
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Search interface language.
    #[clap(long, env = "GEOGRID_LANGUAGE", default_value = "en")]
    #[serde(default = "default_language")]
    pub language: String,

    /// Country to search in.
    #[clap(long, env = "GEOGRID_COUNTRY", default_value = "us")]
    #[serde(default = "default_country")]
    pub country: String,

    /// Radius of the Google Maps nearby search around each point, in meters.
    #[clap(long, env = "GEOGRID_PLACES_RADIUS_M", default_value_t = 1000)]
    #[serde(default = "default_places_radius")]
    pub places_radius_m: u32,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.into()
}

fn default_radius() -> f64 {
    2.0
}

fn default_step() -> f64 {
    0.5
}

fn default_language() -> String {
    "en".into()
}

fn default_country() -> String {
    "us".into()
}

fn default_places_radius() -> u32 {
    1000
}

impl ScanRequest {
    /// A request with default settings.
    pub fn new(
        business: impl Into<String>,
        keywords: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            business: business.into(),
            address: default_address(),
            shape: Shape::default(),
            radius_km: default_radius(),
            step_km: default_step(),
            keywords: keywords.into_iter().map(Into::into).collect(),
            language: default_language(),
            country: default_country(),
            places_radius_m: default_places_radius(),
        }
    }

    /// Trim text fields and split keywords.
    ///
    /// Each keyword entry may itself contain several newline-separated keywords.
    pub fn normalized(&self) -> Self {
        Self {
            business: self.business.trim().into(),
            address: self.address.trim().into(),
            keywords: parse_keywords(&self.keywords.join("\n")),
            language: self.language.trim().into(),
            country: self.country.trim().into(),
            ..self.clone()
        }
    }

    /// Check that this request describes a scan that can be run.
    pub fn validate(&self) -> Result<(), Error> {
        if self.business.trim().is_empty() {
            return Err(Error::msg("business name is required"));
        }
        if self.address.trim().is_empty() {
            return Err(Error::msg("business address is required"));
        }
        if !(MIN_RADIUS_KM..=MAX_RADIUS_KM).contains(&self.radius_km) {
            return Err(Error::msg(format!(
                "radius must be between {MIN_RADIUS_KM} and {MAX_RADIUS_KM} km"
            )));
        }
        if !(MIN_STEP_KM..=MAX_STEP_KM).contains(&self.step_km) {
            return Err(Error::msg(format!(
                "spacing must be between {MIN_STEP_KM} and {MAX_STEP_KM} km"
            )));
        }
        if self.keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(Error::msg("at least one keyword is required"));
        }
        if self.places_radius_m == 0 {
            return Err(Error::msg("nearby search radius must be positive"));
        }
        Ok(())
    }
}

/// The kinds of search result a business can rank in.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    EnumString,
    Deserialize,
    Serialize,
)]
pub enum Mode {
    /// Regular web results.
    #[serde(rename = "org_rank")]
    #[strum(to_string = "org_rank", serialize = "organic")]
    Organic,
    /// The local pack on the search results page.
    #[serde(rename = "lp_rank")]
    #[strum(to_string = "lp_rank", serialize = "local_pack")]
    LocalPack,
    /// Google Maps listings.
    #[serde(rename = "gmp_rank")]
    #[strum(to_string = "gmp_rank", serialize = "maps")]
    Maps,
}

impl Mode {
    /// A human readable name for this mode.
    pub fn title(&self) -> &'static str {
        match self {
            Self::Organic => "Organic",
            Self::LocalPack => "Local Pack",
            Self::Maps => "Maps",
        }
    }
}

/// The result of checking one keyword at one point.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Check {
    pub keyword: String,
    pub lat: f64,
    pub lng: f64,
    pub dist_km: f64,
    pub org_rank: Option<u32>,
    pub lp_rank: Option<u32>,
    pub gmp_rank: Option<u32>,
    pub timestamp: DateTime<Utc>,
}

impl Check {
    /// The 1-based rank of the business in the given kind of result, if it appeared at all.
    pub fn rank(&self, mode: Mode) -> Option<u32> {
        match mode {
            Mode::Organic => self.org_rank,
            Mode::LocalPack => self.lp_rank,
            Mode::Maps => self.gmp_rank,
        }
    }

    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// A completed scan.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Scan {
    pub id: ScanId,
    pub request: ScanRequest,
    /// The geocoded location of the business address.
    pub center: LatLng,
    /// The Google Maps place ID of the business, if it could be found.
    pub target_place_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub checks: Vec<Check>,
}

/// How far along a scan is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    /// The fraction of checks completed, between 0 and 1.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

/// The 1-based rank of the business among the organic results of a page.
pub fn organic_rank(results: &SerpResults, business: &str) -> Option<u32> {
    title_rank(&results.organic_results, business)
}

/// The 1-based rank of the business in the local pack of a page.
pub fn local_pack_rank(results: &SerpResults, business: &str) -> Option<u32> {
    title_rank(&results.local_results, business)
}

/// The 1-based position of the first entry whose title mentions `business`.
///
/// Matching is case-insensitive.
pub fn title_rank(entries: &[SerpEntry], business: &str) -> Option<u32> {
    let business = business.trim().to_lowercase();
    if business.is_empty() {
        return None;
    }
    entries
        .iter()
        .position(|entry| entry.title.to_lowercase().contains(&business))
        .map(|i| i as u32 + 1)
}

/// The 1-based position of the business's own listing among `places`.
pub fn maps_rank(places: &[Place], place_id: Option<&str>) -> Option<u32> {
    let place_id = place_id?;
    places
        .iter()
        .position(|place| place.place_id == place_id)
        .map(|i| i as u32 + 1)
}

/// Runs scans against a Google Maps client and a search result source.
pub struct Scanner<M, S> {
    maps: M,
    serp: S,
    delay: Duration,
}

/// Default pause between checks.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

impl<M: Maps, S: Serp> Scanner<M, S> {
    pub fn new(maps: M, serp: S) -> Self {
        Self {
            maps,
            serp,
            delay: DEFAULT_DELAY,
        }
    }

    /// Pause for `delay` between consecutive checks, to stay within API rate limits.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn maps(&self) -> &M {
        &self.maps
    }

    /// Run a scan.
    ///
    /// `progress` is called before the first check and after every check.
    ///
    /// # Errors
    ///
    /// Fails if the request is invalid, the address cannot be geocoded, or Google Maps returns an
    /// error. Failures to load a search result page are logged and the page is treated as empty.
    pub async fn run(
        &self,
        id: ScanId,
        request: &ScanRequest,
        mut progress: impl FnMut(Progress) + Send,
    ) -> Result<Scan, Error> {
        let request = request.normalized();
        request.validate()?;
        let started_at = Utc::now();

        let center = self
            .maps
            .geocode(&request.address)
            .await?
            .ok_or_else(|| {
                Error::msg(format!(
                    "geocoding failed for {:?}; check the address and API key",
                    request.address
                ))
            })?;
        let target_place_id = self.maps.find_place_id(&request.business, center).await?;
        if target_place_id.is_none() {
            tracing::warn!(
                "no Google Maps listing found for {:?}; Maps ranks will be empty",
                request.business
            );
        }

        let grid = grid::generate(center, request.radius_km, request.step_km, request.shape)?;
        let total = grid.len() * request.keywords.len();
        tracing::info!(
            scan = %id,
            points = grid.len(),
            keywords = request.keywords.len(),
            "scanning {:?} around {center}",
            request.business
        );

        let mut checks = Vec::with_capacity(total);
        progress(Progress {
            completed: 0,
            total,
        });
        for point in &grid {
            for keyword in &request.keywords {
                if !checks.is_empty() && !self.delay.is_zero() {
                    sleep(self.delay).await;
                }
                let check = self
                    .check(&request, target_place_id.as_deref(), point, keyword)
                    .await?;
                tracing::debug!(
                    scan = %id,
                    %keyword,
                    org = ?check.org_rank,
                    lp = ?check.lp_rank,
                    gmp = ?check.gmp_rank,
                    "checked {}",
                    point.location()
                );
                checks.push(check);
                progress(Progress {
                    completed: checks.len(),
                    total,
                });
            }
        }

        tracing::info!(scan = %id, "scan complete, {} checks", checks.len());
        Ok(Scan {
            id,
            request,
            center,
            target_place_id,
            started_at,
            finished_at: Utc::now(),
            checks,
        })
    }

    async fn check(
        &self,
        request: &ScanRequest,
        target_place_id: Option<&str>,
        point: &GridPoint,
        keyword: &str,
    ) -> Result<Check, Error> {
        let timestamp = Utc::now();
        let query = SerpQuery {
            keyword: keyword.into(),
            location: point.location(),
            language: request.language.clone(),
            country: request.country.clone(),
            timestamp,
        };
        let (serp, places) = join(
            self.serp.search(&query),
            self.maps
                .places_nearby(keyword, point.location(), request.places_radius_m),
        )
        .await;
        let serp = serp.unwrap_or_else(|err| {
            tracing::warn!(
                keyword,
                "unable to load search results at {}: {err:#}",
                point.location()
            );
            SerpResults::default()
        });
        let places = places?;

        Ok(Check {
            keyword: keyword.into(),
            lat: point.lat,
            lng: point.lng,
            dist_km: point.dist_km,
            org_rank: organic_rank(&serp, &request.business),
            lp_rank: local_pack_rank(&serp, &request.business),
            gmp_rank: maps_rank(&places, target_place_id),
            timestamp,
        })
    }
}

/// A scanner over whichever clients were configured at runtime.
pub type DynScanner = Scanner<Box<dyn Maps>, Box<dyn Serp>>;

/// Options for connecting to the APIs a scan needs.
#[derive(Clone, Debug, Default, Args)]
#[group(id = "apis")]
pub struct Options {
    /// The Google Maps API key to connect with.
    #[clap(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    pub google_maps_key: Option<String>,

    /// The ScraperAPI key to connect with.
    #[clap(long, env = "SCRAPERAPI_KEY", hide_env_values = true)]
    pub scraperapi_key: Option<String>,

    /// Serve Google Maps and search results from the fixture files in DIR instead of the live
    /// APIs.
    ///
    /// DIR should contain `maps.json` and `serp.json`.
    #[clap(long, env = "GEOGRID_FIXTURES", value_name = "DIR")]
    pub fixtures: Option<PathBuf>,

    /// Pause between checks, in milliseconds.
    #[clap(long, env = "GEOGRID_DELAY_MS", default_value_t = 500)]
    pub delay_ms: u64,
}

impl Options {
    /// Connect to the configured clients.
    pub fn scanner(&self) -> Result<DynScanner, Error> {
        let (maps, serp): (Box<dyn Maps>, Box<dyn Serp>) = if let Some(dir) = &self.fixtures {
            tracing::info!("using fixtures in {}", dir.display());
            (
                Box::new(maps::LocalClient::open(dir)?),
                Box::new(serp::LocalClient::open(dir)?),
            )
        } else {
            let key = |key: &Option<String>| key.clone().filter(|k| !k.trim().is_empty());
            match (key(&self.google_maps_key), key(&self.scraperapi_key)) {
                (Some(maps_key), Some(serp_key)) => (
                    Box::new(maps::Client::new(maps_key)?),
                    Box::new(serp::Client::new(serp_key)?),
                ),
                _ => {
                    return Err(Error::msg(
                        "enter both API keys (Google Maps and ScraperAPI), or use --fixtures",
                    ))
                }
            }
        };
        Ok(Scanner::new(maps, serp).with_delay(Duration::from_millis(self.delay_ms)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures_dir;
    use async_trait::async_trait;
    use std::collections::HashMap;

    const BUSINESS: &str = "Bean There Cafe";

    fn fixture_options() -> Options {
        Options {
            fixtures: Some(fixtures_dir()),
            ..Default::default()
        }
    }

    fn request() -> ScanRequest {
        ScanRequest {
            radius_km: 0.5,
            step_km: 0.5,
            ..ScanRequest::new(BUSINESS, parse_keywords(DEFAULT_KEYWORDS))
        }
    }

    struct FailingSerp;

    #[async_trait]
    impl Serp for FailingSerp {
        async fn search(&self, _query: &SerpQuery) -> Result<SerpResults, Error> {
            Err(Error::msg("503 Service Unavailable"))
        }
    }

    /// A Maps client that can geocode but fails every search.
    struct BrokenMaps;

    #[async_trait]
    impl Maps for BrokenMaps {
        async fn geocode(&self, _address: &str) -> Result<Option<LatLng>, Error> {
            Ok(Some(LatLng::new(37.422, -122.0841)))
        }

        async fn find_place_id(&self, _name: &str, _bias: LatLng) -> Result<Option<String>, Error> {
            Ok(None)
        }

        async fn places_nearby(
            &self,
            _keyword: &str,
            _location: LatLng,
            _radius_m: u32,
        ) -> Result<Vec<Place>, Error> {
            Err(Error::msg("OVER_QUERY_LIMIT"))
        }
    }

    #[test]
    fn test_parse_keywords() {
        assert_eq!(
            parse_keywords(" coffee shop near me \n\n espresso bar\r\ncafé\n"),
            ["coffee shop near me", "espresso bar", "café"]
        );
        assert!(parse_keywords("\n  \n").is_empty());
    }

    #[test]
    fn test_title_rank() {
        let entries = [
            SerpEntry::titled("Best coffee in town - Yelp"),
            SerpEntry::titled("BEAN THERE CAFE | Menu"),
            SerpEntry::titled("Bean There Cafe on Instagram"),
        ];
        assert_eq!(title_rank(&entries, "bean there cafe"), Some(2));
        assert_eq!(title_rank(&entries, "Philz"), None);
        assert_eq!(title_rank(&entries, "  "), None);
        assert_eq!(title_rank(&[], BUSINESS), None);
    }

    #[test]
    fn test_maps_rank() {
        let place = |id: &str| Place {
            place_id: id.into(),
            name: id.into(),
            vicinity: None,
            rating: None,
        };
        let places = [place("a"), place("b"), place("c")];
        assert_eq!(maps_rank(&places, Some("c")), Some(3));
        assert_eq!(maps_rank(&places, Some("d")), None);
        assert_eq!(maps_rank(&places, None), None);
    }

    #[test]
    fn test_validate() {
        request().validate().unwrap();

        let invalid = [
            ScanRequest {
                business: " ".into(),
                ..request()
            },
            ScanRequest {
                address: "".into(),
                ..request()
            },
            ScanRequest {
                radius_km: 0.4,
                ..request()
            },
            ScanRequest {
                radius_km: 10.5,
                ..request()
            },
            ScanRequest {
                step_km: 0.0,
                ..request()
            },
            ScanRequest {
                keywords: vec!["".into(), " \n ".into()],
                ..request()
            },
            ScanRequest {
                places_radius_m: 0,
                ..request()
            },
        ];
        for req in invalid {
            req.validate().unwrap_err();
        }
    }

    #[test]
    fn test_request_defaults() {
        let req: ScanRequest = serde_json::from_value(serde_json::json!({
            "business": BUSINESS,
            "keywords": ["espresso bar\ncafé"],
        }))
        .unwrap();
        assert_eq!(req.address, DEFAULT_ADDRESS);
        assert_eq!(req.shape, Shape::Circle);
        assert_eq!(req.radius_km, 2.0);
        assert_eq!(req.step_km, 0.5);
        assert_eq!(req.places_radius_m, 1000);
        assert_eq!(req.normalized().keywords, ["espresso bar", "café"]);
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(Mode::Organic.to_string(), "org_rank");
        assert_eq!("lp_rank".parse::<Mode>().unwrap(), Mode::LocalPack);
        assert_eq!("maps".parse::<Mode>().unwrap(), Mode::Maps);
        assert_eq!(
            serde_json::to_value(Mode::Maps).unwrap(),
            serde_json::json!("gmp_rank")
        );
    }

    #[async_std::test]
    async fn test_scan_fixtures() {
        crate::init_logging();
        let scanner = fixture_options().scanner().unwrap();
        let req = request();

        let mut updates = vec![];
        let scan = scanner
            .run(new_scan_id(), &req, |p| updates.push(p))
            .await
            .unwrap();

        let center = LatLng::new(37.422, -122.0841);
        let grid = grid::generate(center, req.radius_km, req.step_km, req.shape).unwrap();
        assert_eq!(scan.center, center);
        assert_eq!(scan.target_place_id.as_deref(), Some("place-bean-there"));
        assert_eq!(scan.checks.len(), grid.len() * 3);
        assert_eq!(
            updates.first(),
            Some(&Progress {
                completed: 0,
                total: scan.checks.len()
            })
        );
        assert_eq!(updates.last().unwrap().fraction(), 1.0);
        assert_eq!(updates.len(), scan.checks.len() + 1);

        // The fixture search pages do not depend on location.
        let by_keyword = scan
            .checks
            .iter()
            .map(|c| (c.keyword.as_str(), (c.org_rank, c.lp_rank)))
            .collect::<HashMap<_, _>>();
        assert_eq!(by_keyword["coffee shop near me"], (Some(3), Some(2)));
        assert_eq!(by_keyword["espresso bar"], (None, Some(1)));
        assert_eq!(by_keyword["café"], (Some(1), None));

        // At the center, the business is the closest coffee shop.
        let at_center = scan
            .checks
            .iter()
            .find(|c| c.dist_km < 1e-6 && c.keyword == "coffee shop near me")
            .unwrap();
        assert_eq!(at_center.gmp_rank, Some(1));
    }

    #[async_std::test]
    async fn test_scan_unknown_address() {
        let scanner = fixture_options().scanner().unwrap();
        let req = ScanRequest {
            address: "Nowhere, Atlantis".into(),
            ..request()
        };
        let err = scanner.run(new_scan_id(), &req, |_| {}).await.unwrap_err();
        assert!(err.to_string().contains("geocoding failed"));
    }

    #[async_std::test]
    async fn test_scan_survives_serp_failure() {
        let scanner = Scanner::new(maps::LocalClient::open(fixtures_dir()).unwrap(), FailingSerp)
            .with_delay(Duration::ZERO);
        let scan = scanner.run(new_scan_id(), &request(), |_| {}).await.unwrap();
        assert!(!scan.checks.is_empty());
        assert!(scan
            .checks
            .iter()
            .all(|c| c.org_rank.is_none() && c.lp_rank.is_none()));
        assert!(scan.checks.iter().any(|c| c.gmp_rank.is_some()));
    }

    #[async_std::test]
    async fn test_scan_fails_on_maps_error() {
        let scanner = Scanner::new(BrokenMaps, FailingSerp).with_delay(Duration::ZERO);
        let err = scanner.run(new_scan_id(), &request(), |_| {}).await.unwrap_err();
        assert_eq!(err.to_string(), "OVER_QUERY_LIMIT");
    }

    #[async_std::test]
    async fn test_unknown_business() {
        let scanner = fixture_options().scanner().unwrap();
        let req = ScanRequest {
            business: "Starbucks".into(),
            ..request()
        };
        let scan = scanner.run(new_scan_id(), &req, |_| {}).await.unwrap();
        assert_eq!(scan.target_place_id, None);
        assert!(scan.checks.iter().all(|c| c.rank(Mode::Maps).is_none()));
    }

    #[test]
    fn test_missing_keys() {
        let options = Options {
            google_maps_key: Some("key".into()),
            scraperapi_key: Some(" ".into()),
            ..Default::default()
        };
        match options.scanner() {
            Ok(_) => panic!("scanner should require both API keys"),
            Err(err) => assert!(err.to_string().contains("both API keys"), "{err}"),
        }
    }

    #[test]
    fn test_page_ranks() {
        let page = SerpResults {
            organic_results: vec![
                SerpEntry::titled("Coffee near me - Yelp"),
                SerpEntry::titled("Bean There Cafe"),
            ],
            local_results: vec![SerpEntry::titled("bean there cafe")],
        };
        assert_eq!(organic_rank(&page, BUSINESS), Some(2));
        assert_eq!(local_pack_rank(&page, BUSINESS), Some(1));
        assert_eq!(local_pack_rank(&SerpResults::default(), BUSINESS), None);
    }

    #[test]
    fn test_scan_ids_increase() {
        let ids = (0..1000).map(|_| new_scan_id()).collect::<Vec<_>>();
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
