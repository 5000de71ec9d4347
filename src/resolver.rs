//! Content resolution pipeline: identifier → alias → room → event → payload.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::{
    client::Homeserver,
    config::{Settings, TimelineOrder},
    event::{ContentPayload, TimelineEvent, CONTENT_TYPE_MDX},
};

/// Internal outcome of a resolution attempt, before detail is collapsed at
/// the public boundary. Transport failures travel separately as errors, so
/// genuine absence stays distinguishable inside the pipeline.
#[derive(Debug)]
enum Resolution {
    Found(ContentPayload),
    NotFound,
}

/// Resolves an author identifier to the document they most recently posted
/// in the configured default room.
///
/// The homeserver client is created lazily on first use and reused across
/// calls. Calls run strictly in sequence internally; concurrent callers are
/// not coordinated, and nothing here retries or caches results.
pub struct Browser {
    cfg: Settings,
    client: Option<Homeserver>,
}

impl Browser {
    pub fn new(cfg: Settings) -> Self {
        Self { cfg, client: None }
    }

    /// Fetch the most recent document `identifier` posted in the default
    /// room. Identifiers that trim to empty are skipped.
    ///
    /// Every failure collapses to `None` here: a transport outage is
    /// indistinguishable from genuine absence to the caller. The discarded
    /// detail is logged.
    pub async fn fetch(&mut self, identifier: &str) -> Option<ContentPayload> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return None;
        }
        match self.resolve(identifier).await {
            Ok(Resolution::Found(payload)) => Some(payload),
            Ok(Resolution::NotFound) => None,
            Err(e) => {
                warn!("content resolution for {identifier} failed: {e:#}");
                None
            }
        }
    }

    async fn resolve(&mut self, identifier: &str) -> Result<Resolution> {
        let alias = self.cfg.default_room.clone();
        let limit = self.cfg.timeline_limit;
        let order = self.cfg.timeline_order;
        let client = self.ensure_client()?;
        let room_id = client
            .resolve_alias(&alias)
            .await
            .context("resolving room alias")?;
        let Some(room) = client.load_room(&room_id, limit).await? else {
            debug!("room {room_id} not found on homeserver");
            return Ok(Resolution::NotFound);
        };
        debug!(
            "loaded {} timeline events from {}",
            room.timeline.len(),
            room.room_id
        );
        let Some(event) = select_latest(&room.timeline, identifier, order) else {
            return Ok(Resolution::NotFound);
        };
        Ok(Resolution::Found(ContentPayload {
            content: event.extract_content(),
            content_type: CONTENT_TYPE_MDX.to_string(),
            author: event.sender.clone(),
            timestamp: event.origin_server_ts,
        }))
    }

    fn ensure_client(&mut self) -> Result<&Homeserver> {
        if self.client.is_none() {
            let client = Homeserver::new(
                &self.cfg.homeserver,
                self.cfg.access_token.clone(),
                self.cfg.http_timeout,
            )
            .context("initializing homeserver client")?;
            self.client = Some(client);
        }
        match &self.client {
            Some(client) => Ok(client),
            None => unreachable!(),
        }
    }
}

/// Select the author's latest qualifying message from an already-loaded
/// timeline. No further history is fetched here; an empty result is the
/// no-content case, never an error.
pub fn select_latest<'a>(
    timeline: &'a [TimelineEvent],
    author: &str,
    order: TimelineOrder,
) -> Option<&'a TimelineEvent> {
    let mut candidates = timeline
        .iter()
        .filter(|ev| ev.sender_matches(author) && ev.is_content_message());
    match order {
        TimelineOrder::NewestFirst => candidates.next(),
        TimelineOrder::OldestFirst => candidates.last(),
    }
}
