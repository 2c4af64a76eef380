//! Third-party information and image sources
//!
//! Three independent clients with distinct shapes. None is required
//! for a successful answer: a missing key or a failed call degrades to
//! empty data.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use tour_agent_config::constants::endpoints;

use crate::EnrichmentError;

/// Wikipedia page summary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WikipediaSummary {
    pub content: String,
    pub images: Vec<String>,
    pub url: String,
}

#[derive(Deserialize)]
struct WikipediaResponse {
    #[serde(default)]
    extract: String,
    thumbnail: Option<WikipediaThumbnail>,
    content_urls: Option<WikipediaContentUrls>,
}

#[derive(Deserialize)]
struct WikipediaThumbnail {
    source: String,
}

#[derive(Deserialize)]
struct WikipediaContentUrls {
    desktop: Option<WikipediaDesktopUrl>,
}

#[derive(Deserialize)]
struct WikipediaDesktopUrl {
    page: String,
}

/// Wikipedia REST summary client
pub struct WikipediaClient {
    client: Client,
}

impl WikipediaClient {
    pub fn new(timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("tour-agent/0.1 (tourism answer service)")
            .build()?;
        Ok(Self { client })
    }

    /// Fetch the page summary for a place. Failures return an empty
    /// summary.
    pub async fn summary(&self, place_name: &str) -> WikipediaSummary {
        let title = place_name.replace(' ', "_");
        let url = format!("{}/{title}", endpoints::WIKIPEDIA_SUMMARY);

        let response = match self.client.get(&url).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(place = place_name, status = %r.status(), "wikipedia lookup failed");
                return WikipediaSummary::default();
            }
            Err(err) => {
                tracing::warn!(place = place_name, %err, "wikipedia request failed");
                return WikipediaSummary::default();
            }
        };

        match response.json::<WikipediaResponse>().await {
            Ok(body) => WikipediaSummary {
                content: body.extract,
                images: body
                    .thumbnail
                    .map(|t| vec![t.source])
                    .unwrap_or_default(),
                url: body
                    .content_urls
                    .and_then(|u| u.desktop)
                    .map(|d| d.page)
                    .unwrap_or_default(),
            },
            Err(err) => {
                tracing::warn!(place = place_name, %err, "wikipedia response undecodable");
                WikipediaSummary::default()
            }
        }
    }
}

/// One Unsplash photo
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsplashImage {
    pub url: String,
    pub thumbnail: String,
    pub photographer: String,
    pub alt: Option<String>,
}

#[derive(Deserialize)]
struct UnsplashResponse {
    #[serde(default)]
    results: Vec<UnsplashPhoto>,
}

#[derive(Deserialize)]
struct UnsplashPhoto {
    urls: UnsplashUrls,
    user: UnsplashUser,
    alt_description: Option<String>,
}

#[derive(Deserialize)]
struct UnsplashUrls {
    regular: String,
    thumb: String,
}

#[derive(Deserialize)]
struct UnsplashUser {
    name: String,
}

/// Unsplash photo search client
pub struct UnsplashClient {
    client: Client,
    access_key: String,
}

impl UnsplashClient {
    pub fn new(access_key: impl Into<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            access_key: access_key.into(),
        })
    }

    /// Landscape photos for a place. Failures return no images.
    pub async fn search(&self, place_name: &str) -> Vec<UnsplashImage> {
        let response = self
            .client
            .get(endpoints::UNSPLASH_SEARCH)
            .header("Authorization", format!("Client-ID {}", self.access_key))
            .query(&[
                ("query", format!("{place_name} Georgia tourism").as_str()),
                ("per_page", "5"),
                ("orientation", "landscape"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(place = place_name, status = %r.status(), "unsplash search failed");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(place = place_name, %err, "unsplash request failed");
                return Vec::new();
            }
        };

        match response.json::<UnsplashResponse>().await {
            Ok(body) => body
                .results
                .into_iter()
                .map(|photo| UnsplashImage {
                    url: photo.urls.regular,
                    thumbnail: photo.urls.thumb,
                    photographer: photo.user.name,
                    alt: photo.alt_description,
                })
                .collect(),
            Err(err) => {
                tracing::warn!(place = place_name, %err, "unsplash response undecodable");
                Vec::new()
            }
        }
    }
}

#[derive(Deserialize)]
struct SerpApiResponse {
    #[serde(default)]
    organic_results: Vec<Value>,
}

/// Practical-info search client
pub struct SerpApiClient {
    client: Client,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, EnrichmentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
        })
    }

    /// Organic results for opening hours / tickets. Failures return an
    /// empty list.
    pub async fn search(&self, place_name: &str, language: &str) -> Vec<Value> {
        let response = self
            .client
            .get(endpoints::SERPAPI_SEARCH)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("engine", "google"),
                (
                    "q",
                    format!("{place_name} Georgia tourism opening hours tickets").as_str(),
                ),
                ("hl", language),
                ("num", "5"),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                tracing::warn!(place = place_name, status = %r.status(), "serpapi search failed");
                return Vec::new();
            }
            Err(err) => {
                tracing::warn!(place = place_name, %err, "serpapi request failed");
                return Vec::new();
            }
        };

        match response.json::<SerpApiResponse>().await {
            Ok(body) => body.organic_results,
            Err(err) => {
                tracing::warn!(place = place_name, %err, "serpapi response undecodable");
                Vec::new()
            }
        }
    }
}
