//! Event aggregation service boundary and its HTTP implementation.

use crate::domain::error::{DiscoveryError, Result};
use crate::domain::{BoundingBox, Coordinates};
use crate::normalize::raw::lenient;
use crate::normalize::RawEventRecord;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// One page of raw results from the aggregation service.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPage {
    pub events: Vec<RawEventRecord>,
    pub total: Option<u64>,
}

impl EventPage {
    /// Decodes a response body.
    ///
    /// Accepts `{ "events": [...] }`, `{ "data": [...] }` (with `events`
    /// winning when both are present) or a bare array. A body carrying
    /// neither array is an empty page. Envelope fields of an unexpected type
    /// read as absent.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Decode`] for bodies that are not JSON, or are
    /// JSON but neither an object nor an array.
    pub fn from_json(body: &str) -> Result<Self> {
        match serde_json::from_str::<ResponseBody>(body)? {
            ResponseBody::Bare(events) => Ok(Self {
                events,
                total: None,
            }),
            ResponseBody::Envelope { events, data, total } => Ok(Self {
                events: events.or(data).unwrap_or_default(),
                total,
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Bare(Vec<RawEventRecord>),
    Envelope {
        #[serde(default, deserialize_with = "lenient")]
        events: Option<Vec<RawEventRecord>>,
        #[serde(default, deserialize_with = "lenient")]
        data: Option<Vec<RawEventRecord>>,
        #[serde(default, deserialize_with = "lenient")]
        total: Option<u64>,
    },
}

/// The two search operations the engine consumes.
#[async_trait]
pub trait EventService: Send + Sync {
    /// Free-text search, optionally ranked around a device position.
    async fn search_events(&self, query: &str, near: Option<Coordinates>) -> Result<EventPage>;

    /// Search restricted to a map bounding box. A blank query matches
    /// everything inside the box.
    async fn search_events_in_viewport(
        &self,
        query: &str,
        bbox: Option<BoundingBox>,
    ) -> Result<EventPage>;
}

/// Supplies the optional bearer credential attached to service calls.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// No credential; every call is anonymous.
#[derive(Debug, Clone, Copy, Default)]
pub struct Anonymous;

impl CredentialProvider for Anonymous {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

/// `reqwest`-backed client for the aggregation service's REST API.
///
/// Endpoints, relative to the configured base URL:
/// - `GET events?q=&lat=&lon=`
/// - `GET events/viewport?q=&min_lat=&max_lat=&min_lon=&max_lon=`
#[derive(Clone)]
pub struct HttpEventService {
    client: reqwest::Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpEventService {
    /// Creates an anonymous client for `base_url` (for example
    /// `http://localhost:8000/api/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Config`] if `base_url` is not an absolute
    /// URL that can carry path segments.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(DiscoveryError::Config(format!(
                "api base url cannot carry a path: {base_url}"
            )));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("event-compass/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            credentials: Arc::new(Anonymous),
        })
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Builds `<base>/<segments...>?<params...>`, skipping blank params.
    fn endpoint(&self, segments: &[&str], params: &[(&str, String)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| DiscoveryError::Config(format!("invalid api base url: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);

        let present: Vec<_> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
        if !present.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in present {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_page(&self, url: Url) -> Result<EventPage> {
        tracing::debug!(url = %url, "requesting events");

        let mut request = self.client.get(url).header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = self.credentials.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        let page = EventPage::from_json(&body)?;
        tracing::debug!(events = page.events.len(), total = ?page.total, "events received");
        Ok(page)
    }
}

#[async_trait]
impl EventService for HttpEventService {
    async fn search_events(&self, query: &str, near: Option<Coordinates>) -> Result<EventPage> {
        let mut params = vec![("q", query.trim().to_string())];
        if let Some(c) = near {
            params.push(("lat", c.lat.to_string()));
            params.push(("lon", c.lon.to_string()));
        }
        let url = self.endpoint(&["events"], &params)?;
        self.get_page(url).await
    }

    async fn search_events_in_viewport(
        &self,
        query: &str,
        bbox: Option<BoundingBox>,
    ) -> Result<EventPage> {
        let mut params = vec![("q", query.trim().to_string())];
        if let Some(b) = bbox {
            params.extend([
                ("min_lat", b.min_lat.to_string()),
                ("max_lat", b.max_lat.to_string()),
                ("min_lon", b.min_lon.to_string()),
                ("max_lon", b.max_lon.to_string()),
            ]);
        }
        let url = self.endpoint(&["events", "viewport"], &params)?;
        self.get_page(url).await
    }
}

impl std::fmt::Debug for HttpEventService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEventService")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}
