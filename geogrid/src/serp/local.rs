//! A search client which reads from the local file system instead of ScraperAPI.

use super::{Serp, SerpQuery, SerpResults};
use anyhow::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// The name of the fixture file within a fixtures directory.
pub const FIXTURE_FILE: &str = "serp.json";

/// A search client which reads from the local file system instead of ScraperAPI.
///
/// Results come from `serp.json`, a map from keyword to result page. The same page is served
/// regardless of where the search comes from, and keywords without a page get no results.
#[derive(Clone, Debug)]
pub struct LocalClient {
    pages: HashMap<String, SerpResults>,
}

impl LocalClient {
    /// Open a fixtures directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let path = root.as_ref().join(FIXTURE_FILE);
        let file = File::open(&path)
            .map_err(|err| Error::msg(format!("unable to open {}: {err}", path.display())))?;
        let pages = serde_json::from_reader(file)
            .map_err(|err| Error::msg(format!("{} is malformed: {err}", path.display())))?;
        Ok(Self { pages })
    }
}

#[async_trait]
impl Serp for LocalClient {
    async fn search(&self, query: &SerpQuery) -> Result<SerpResults, Error> {
        let keyword = query.keyword.trim().to_lowercase();
        let page = self
            .pages
            .iter()
            .find(|(known, _)| known.to_lowercase() == keyword)
            .map(|(_, page)| page.clone());
        if page.is_none() {
            tracing::debug!(%keyword, "no local result page");
        }
        Ok(page.unwrap_or_default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{fixtures_dir, geo::LatLng};
    use chrono::Utc;

    fn query(keyword: &str) -> SerpQuery {
        SerpQuery {
            keyword: keyword.into(),
            location: LatLng::new(37.422, -122.0841),
            language: "en".into(),
            country: "us".into(),
            timestamp: Utc::now(),
        }
    }

    #[async_std::test]
    async fn test_search() {
        let client = LocalClient::open(fixtures_dir()).unwrap();

        let page = client.search(&query("Coffee Shop Near Me")).await.unwrap();
        assert_eq!(page.organic_results.len(), 3);
        assert_eq!(page.local_results[1].title, "Bean There Cafe");

        // A page with no local pack.
        let page = client.search(&query("CAFÉ")).await.unwrap();
        assert!(page.local_results.is_empty());

        let page = client.search(&query("tea")).await.unwrap();
        assert_eq!(page, SerpResults::default());
    }
}
