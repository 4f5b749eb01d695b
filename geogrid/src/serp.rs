//! Facilities for pulling Google search results.

use crate::geo::LatLng;
use anyhow::Error;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod client;
mod local;
pub mod uule;

pub use client::Client;
pub use local::LocalClient;

/// A source of Google search engine result pages.
#[async_trait]
pub trait Serp: Send + Sync {
    /// Search for a keyword as if from a particular location.
    async fn search(&self, query: &SerpQuery) -> Result<SerpResults, Error>;
}

#[async_trait]
impl<T: Serp + ?Sized> Serp for Box<T> {
    async fn search(&self, query: &SerpQuery) -> Result<SerpResults, Error> {
        (**self).search(query).await
    }
}

/// A localized search.
#[derive(Clone, Debug, PartialEq)]
pub struct SerpQuery {
    pub keyword: String,
    /// Where the search is performed from.
    pub location: LatLng,
    /// Interface language, e.g. `en`.
    pub language: String,
    /// Country to search in, e.g. `us`.
    pub country: String,
    pub timestamp: DateTime<Utc>,
}

/// The parts of a result page relevant to local visibility.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SerpResults {
    /// Regular web results, in page order.
    #[serde(default)]
    pub organic_results: Vec<SerpEntry>,
    /// Results in the local pack, in page order.
    #[serde(default)]
    pub local_results: Vec<SerpEntry>,
}

/// A single result on a result page.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct SerpEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
}

impl SerpEntry {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}
