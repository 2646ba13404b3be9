//! iTunes Search API implementation of the `AlbumSearch` port.
//!
//! - `GET {base_url}?term=<term>&entity=album` with a 10s timeout.
//! - Maps `collectionName`, `artistName`, `collectionPrice`, `releaseDate`,
//!   `primaryGenreName` and `artworkUrl100` onto `AlbumResponse`. Missing
//!   fields become empty/zero; an unparseable release date gives year 0.
//! - Non-2xx statuses, transport failures and undecodable bodies all surface
//!   as `CoreError::Upstream`; only the first carries a status.

use std::time::Duration;

use chrono::{Datelike, NaiveDateTime};
use domain::validate::validate_search_term;
use domain::{AlbumResponse, AlbumSearch, CoreError};
use reqwest::Url;
use runtime_bridge::Bridge;
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://itunes.apple.com/search";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const RELEASE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, thiserror::Error)]
enum SearchError {
    #[error("search request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("search endpoint returned {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to decode search response: {0}")]
    Decode(#[source] reqwest::Error),
}

impl From<SearchError> for CoreError {
    fn from(e: SearchError) -> Self {
        let status = match &e {
            SearchError::Status(code) => Some(code.as_u16()),
            _ => None,
        };
        CoreError::Upstream {
            status,
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(rename = "resultCount", default)]
    result_count: Option<u64>,
    #[serde(default)]
    results: Option<Vec<SearchItem>>,
}

// Every field is optional and may be `null`; absent or null values become empty/zero.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchItem {
    #[serde(rename = "collectionName")]
    collection_name: Option<String>,
    #[serde(rename = "artistName")]
    artist_name: Option<String>,
    #[serde(rename = "collectionPrice")]
    collection_price: Option<f64>,
    #[serde(rename = "releaseDate")]
    release_date: Option<String>,
    #[serde(rename = "primaryGenreName")]
    primary_genre_name: Option<String>,
    #[serde(rename = "artworkUrl100")]
    artwork_url_100: Option<String>,
}

impl From<SearchItem> for AlbumResponse {
    fn from(item: SearchItem) -> Self {
        AlbumResponse {
            year: item.release_date.as_deref().map(release_year).unwrap_or(0),
            title: item.collection_name.unwrap_or_default(),
            artist: item.artist_name.unwrap_or_default(),
            price: item.collection_price.unwrap_or_default(),
            genre: item.primary_genre_name.unwrap_or_default(),
            image_url: item.artwork_url_100.unwrap_or_default(),
        }
    }
}

/// Year of an iTunes release timestamp, or 0 if it does not parse.
pub fn release_year(raw: &str) -> i32 {
    NaiveDateTime::parse_from_str(raw, RELEASE_DATE_FORMAT)
        .map(|dt| dt.year())
        .unwrap_or(0)
}

/// Client for the iTunes album search.
pub struct ItunesClient {
    base_url: Url,
    http: reqwest::Client,
    bridge: Bridge,
}

impl ItunesClient {
    /// Build a client for `base_url` (normally [`DEFAULT_BASE_URL`]).
    pub fn new(base_url: &str) -> Result<Self, CoreError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CoreError::InvalidArgument(format!("invalid search base URL {base_url:?}: {e}"))
        })?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CoreError::InvalidArgument(format!("http client init: {e}")))?;
        let bridge = Bridge::new()
            .map_err(|e| CoreError::StorageUnavailable(format!("tokio runtime init: {e}")))?;
        Ok(Self {
            base_url,
            http,
            bridge,
        })
    }

    async fn fetch(&self, term: &str) -> Result<Vec<AlbumResponse>, SearchError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("term", term)
            .append_pair("entity", "album");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(SearchError::Transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SearchError::Status(status));
        }
        let payload: SearchPayload = resp.json().await.map_err(|e| {
            if e.is_decode() {
                SearchError::Decode(e)
            } else {
                SearchError::Transport(e)
            }
        })?;
        debug!(result_count = payload.result_count.unwrap_or(0), "itunes search ok");
        Ok(payload
            .results
            .unwrap_or_default()
            .into_iter()
            .map(AlbumResponse::from)
            .collect())
    }
}

impl AlbumSearch for ItunesClient {
    fn search(&self, term: &str) -> Result<Vec<AlbumResponse>, CoreError> {
        let term = validate_search_term(term)?;
        self.bridge.block_on(self.fetch(term)).map_err(|e| {
            warn!(term, err = %e, "itunes search failed");
            CoreError::from(e)
        })
    }
}
