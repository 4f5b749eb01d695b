//! A ScraperAPI client for structured Google search results.

use super::{uule, Serp, SerpQuery, SerpResults};
use anyhow::Error;
use async_trait::async_trait;
use std::time::Duration;
use surf::Url;

const BASE_URL: &str = "https://api.scraperapi.com/";
const SEARCH_PATH: &str = "structured/google/search";

/// ScraperAPI renders the page on its side, which can take close to a minute.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(70);

/// A ScraperAPI client.
pub struct Client {
    client: surf::Client,
    api_key: String,
}

impl Client {
    /// Connect to ScraperAPI.
    pub fn new(api_key: String) -> Result<Self, Error> {
        Self::with_base_url(api_key, Url::parse(BASE_URL)?)
    }

    /// Connect to a ScraperAPI-compatible service at `base_url`.
    pub fn with_base_url(api_key: String, base_url: Url) -> Result<Self, Error> {
        Ok(Self {
            client: surf::Config::new()
                .set_base_url(base_url)
                .set_timeout(Some(REQUEST_TIMEOUT))
                .try_into()
                .map_err(|err| Error::msg(format!("unable to build HTTP client: {err}")))?,
            api_key,
        })
    }

    fn params(&self, query: &SerpQuery) -> [(&'static str, String); 5] {
        [
            ("api_key", self.api_key.clone()),
            ("query", query.keyword.clone()),
            ("language", query.language.clone()),
            ("country", query.country.clone()),
            ("uule", uule::encode(query.location, query.timestamp)),
        ]
    }
}

#[async_trait]
impl Serp for Client {
    async fn search(&self, query: &SerpQuery) -> Result<SerpResults, Error> {
        tracing::info!(
            keyword = %query.keyword,
            location = %query.location,
            "ScraperAPI request"
        );
        let mut res = self
            .client
            .get(SEARCH_PATH)
            .query(&self.params(query))
            .map_err(Error::msg)?
            .send()
            .await
            .map_err(Error::msg)?;
        if !res.status().is_success() {
            return Err(Error::msg(format!(
                "ScraperAPI request failed with status {}",
                res.status()
            )));
        }
        res.body_json().await.map_err(Error::msg)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geo::LatLng;
    use chrono::{TimeZone, Utc};
    use portpicker::pick_unused_port;
    use serde_json::json;
    use std::collections::HashMap;
    use tide::{listener::Listener, Body, Response, StatusCode};

    const API_KEY: &str = "test-key";

    /// Echo the query parameters of a search as the title of a single organic result.
    ///
    /// Requests with the wrong API key are rejected.
    async fn echo_search(req: tide::Request<()>) -> tide::Result {
        let params = req
            .url()
            .query_pairs()
            .into_owned()
            .collect::<HashMap<String, String>>();
        if params.get("api_key").map(String::as_str) != Some(API_KEY) {
            return Ok(Response::new(StatusCode::Forbidden));
        }
        let body = json!({
            "organic_results": [{ "title": serde_json::to_string(&params)?, "position": 1 }],
        });
        Ok(Response::builder(StatusCode::Ok)
            .body(Body::from_json(&body)?)
            .build())
    }

    /// Serve a stand-in for ScraperAPI on a local port.
    async fn serve() -> Url {
        let mut app = tide::new();
        app.at(&format!("/{SEARCH_PATH}")).get(echo_search);

        let port = pick_unused_port().unwrap();
        let mut listener = app.bind(format!("127.0.0.1:{port}")).await.unwrap();
        async_std::task::spawn(async move {
            listener.accept().await.unwrap();
        });
        Url::parse(&format!("http://127.0.0.1:{port}/")).unwrap()
    }

    fn query() -> SerpQuery {
        SerpQuery {
            keyword: "espresso bar".into(),
            location: LatLng::new(37.422, -122.0841),
            language: "en".into(),
            country: "us".into(),
            timestamp: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[async_std::test]
    async fn test_search_params() {
        let client = Client::with_base_url(API_KEY.into(), serve().await).unwrap();
        let query = query();
        let page = client.search(&query).await.unwrap();
        assert!(page.local_results.is_empty());

        let sent: HashMap<String, String> =
            serde_json::from_str(&page.organic_results[0].title).unwrap();
        let expected = client
            .params(&query)
            .into_iter()
            .map(|(param, value)| (param.to_string(), value))
            .collect::<HashMap<_, _>>();
        assert_eq!(sent, expected);
        assert_eq!(sent["query"], "espresso bar");
        assert_eq!(sent["uule"], uule::encode(query.location, query.timestamp));
        assert!(sent["uule"].starts_with("a "));
    }

    #[async_std::test]
    async fn test_error_status() {
        let client = Client::with_base_url("wrong-key".into(), serve().await).unwrap();
        let err = client.search(&query()).await.unwrap_err();
        assert!(err.to_string().contains("403"), "{err}");
    }
}
