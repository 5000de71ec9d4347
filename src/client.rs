//! Thin HTTP client for the Matrix client-server API.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::event::TimelineEvent;

/// Room state materialized from a single timeline fetch.
#[derive(Debug, Clone)]
pub struct Room {
    /// Stable room identifier, e.g. `!abc:matrix.org`.
    pub room_id: String,
    /// Timeline events in the order the homeserver returned them.
    pub timeline: Vec<TimelineEvent>,
}

/// Client for a single homeserver. Holds no room state; every method is one
/// request-response round trip with no retries.
pub struct Homeserver {
    http: reqwest::Client,
    base: Url,
    access_token: Option<String>,
}

#[derive(Deserialize)]
struct AliasResponse {
    room_id: String,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    chunk: Vec<TimelineEvent>,
}

#[derive(Deserialize)]
struct PublicRoomsResponse {
    #[serde(default)]
    chunk: Vec<PublicRoom>,
}

#[derive(Deserialize)]
struct PublicRoom {
    room_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    topic: Option<String>,
}

impl Homeserver {
    /// Create a client for the homeserver at `base_url`. A timeout, if any,
    /// is applied at the transport level only.
    pub fn new(
        base_url: &str,
        access_token: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let base = Url::parse(base_url).context("parsing homeserver url")?;
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(std::time::Duration::from_secs(secs));
        }
        let http = builder.build().context("building http client")?;
        Ok(Self {
            http,
            base,
            access_token,
        })
    }

    /// Build a `/_matrix/client/v3` endpoint URL. Segments are
    /// percent-encoded, so aliases like `#pages:matrix.org` are safe.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("homeserver url cannot be a base"))?
            .extend(["_matrix", "client", "v3"])
            .extend(segments);
        Ok(url)
    }

    fn get(&self, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.http.get(url);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        req
    }

    /// Resolve a room alias to its room id via the directory endpoint.
    /// A single lookup with no retry; not-found and transport errors are
    /// both reported as errors at this layer.
    pub async fn resolve_alias(&self, alias: &str) -> Result<String> {
        let url = self.endpoint(&["directory", "room", alias])?;
        let resp = self.get(url).send().await.context("alias lookup")?;
        if !resp.status().is_success() {
            bail!("alias lookup for {alias} failed: {}", resp.status());
        }
        let body: AliasResponse = resp.json().await.context("alias lookup response")?;
        Ok(body.room_id)
    }

    /// Fetch one page of the room's message timeline. `dir=b` asks for
    /// reverse-chronological order, so the first event on the page is the
    /// most recent. No further history is paginated in.
    ///
    /// Returns `Ok(None)` when the homeserver does not know the room,
    /// keeping room-absence distinct from transport failure.
    pub async fn load_room(&self, room_id: &str, limit: u32) -> Result<Option<Room>> {
        let mut url = self.endpoint(&["rooms", room_id, "messages"])?;
        url.query_pairs_mut()
            .append_pair("dir", "b")
            .append_pair("limit", &limit.to_string());
        let resp = self.get(url).send().await.context("timeline fetch")?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            bail!("timeline fetch for {room_id} failed: {}", resp.status());
        }
        let body: MessagesResponse = resp.json().await.context("timeline response")?;
        Ok(Some(Room {
            room_id: room_id.to_string(),
            timeline: body.chunk,
        }))
    }

    /// Search the public room directory for rooms whose name or topic
    /// contains `query`, case-insensitively. At most ten results; a room's
    /// name is preferred over its id in the output.
    pub async fn search_rooms(&self, query: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["publicRooms"])?;
        let resp = self.get(url).send().await.context("public rooms fetch")?;
        if !resp.status().is_success() {
            bail!("public rooms fetch failed: {}", resp.status());
        }
        let body: PublicRoomsResponse = resp.json().await.context("public rooms response")?;
        let needle = query.to_lowercase();
        Ok(body
            .chunk
            .into_iter()
            .filter(|room| {
                room.name
                    .as_deref()
                    .is_some_and(|n| n.to_lowercase().contains(&needle))
                    || room
                        .topic
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            })
            .map(|room| room.name.unwrap_or(room.room_id))
            .take(10)
            .collect())
    }
}
