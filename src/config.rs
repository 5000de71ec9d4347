//! Configuration loading from `.env` files.

use std::env;

use anyhow::{Context, Result};

/// Runtime settings derived from environment variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Base URL of the homeserver, e.g. `https://matrix.org`.
    pub homeserver: String,
    /// Alias of the room documents are read from, e.g. `#pages:matrix.org`.
    pub default_room: String,
    /// Optional access token sent as a bearer header on every request.
    pub access_token: Option<String>,
    /// Order in which the homeserver delivers the timeline page.
    pub timeline_order: TimelineOrder,
    /// Number of events requested in the single timeline fetch.
    pub timeline_limit: u32,
    /// Optional transport-level timeout in seconds. The pipeline itself
    /// enforces no timeout.
    pub http_timeout: Option<u64>,
}

/// Declares which end of the materialized timeline page is the most recent.
///
/// Selection treats "latest" as first-in-timeline-order, which is only
/// correct for a reverse-chronological page. This makes that assumption an
/// explicit setting instead of a silent one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineOrder {
    /// The first event on the page is the most recent.
    NewestFirst,
    /// The last event on the page is the most recent.
    OldestFirst,
}

impl Settings {
    /// Load settings from the specified `.env` file.
    pub fn from_env(path: &str) -> Result<Self> {
        dotenvy::from_filename(path).context("reading env file")?;
        let homeserver = env::var("HOMESERVER_URL")?;
        let default_room = env::var("DEFAULT_ROOM")?;
        let access_token = env::var("ACCESS_TOKEN").ok().filter(|s| !s.is_empty());
        let timeline_order = match env::var("TIMELINE_ORDER").as_deref() {
            Ok("oldest-first") => TimelineOrder::OldestFirst,
            _ => TimelineOrder::NewestFirst,
        };
        let timeline_limit = env::var("TIMELINE_LIMIT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(50);
        let http_timeout = env::var("HTTP_TIMEOUT_SECS")
            .ok()
            .filter(|s| !s.is_empty())
            .and_then(|s| s.parse().ok());
        Ok(Self {
            homeserver,
            default_room,
            access_token,
            timeline_order,
            timeline_limit,
            http_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{env, fs, sync::Mutex};
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const VARS: [&str; 6] = [
        "HOMESERVER_URL",
        "DEFAULT_ROOM",
        "ACCESS_TOKEN",
        "TIMELINE_ORDER",
        "TIMELINE_LIMIT",
        "HTTP_TIMEOUT_SECS",
    ];

    fn clear_vars() {
        for v in VARS.iter() {
            env::remove_var(v);
        }
    }

    #[test]
    fn loads_env() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(
            &env_path,
            concat!(
                "HOMESERVER_URL=https://matrix.org\n",
                "DEFAULT_ROOM=\"#pages:matrix.org\"\n",
                "ACCESS_TOKEN=syt_secret\n",
                "TIMELINE_ORDER=oldest-first\n",
                "TIMELINE_LIMIT=25\n",
                "HTTP_TIMEOUT_SECS=10\n"
            ),
        )
        .unwrap();
        let cfg = Settings::from_env(env_path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.homeserver, "https://matrix.org");
        assert_eq!(cfg.default_room, "#pages:matrix.org");
        assert_eq!(cfg.access_token, Some("syt_secret".into()));
        assert_eq!(cfg.timeline_order, TimelineOrder::OldestFirst);
        assert_eq!(cfg.timeline_limit, 25);
        assert_eq!(cfg.http_timeout, Some(10));
    }

    #[test]
    fn defaults_when_optional_absent() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(
            &env_path,
            concat!(
                "HOMESERVER_URL=https://matrix.org\n",
                "DEFAULT_ROOM=#pages:matrix.org\n"
            ),
        )
        .unwrap();
        let cfg = Settings::from_env(env_path.to_str().unwrap()).unwrap();
        assert!(cfg.access_token.is_none());
        assert_eq!(cfg.timeline_order, TimelineOrder::NewestFirst);
        assert_eq!(cfg.timeline_limit, 50);
        assert!(cfg.http_timeout.is_none());
    }

    #[test]
    fn empty_optionals_are_none() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(
            &env_path,
            concat!(
                "HOMESERVER_URL=https://matrix.org\n",
                "DEFAULT_ROOM=#pages:matrix.org\n",
                "ACCESS_TOKEN=\n",
                "HTTP_TIMEOUT_SECS=\n"
            ),
        )
        .unwrap();
        let cfg = Settings::from_env(env_path.to_str().unwrap()).unwrap();
        assert!(cfg.access_token.is_none());
        assert!(cfg.http_timeout.is_none());
    }

    #[test]
    fn unknown_order_falls_back_to_newest_first() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(
            &env_path,
            concat!(
                "HOMESERVER_URL=https://matrix.org\n",
                "DEFAULT_ROOM=#pages:matrix.org\n",
                "TIMELINE_ORDER=sideways\n"
            ),
        )
        .unwrap();
        let cfg = Settings::from_env(env_path.to_str().unwrap()).unwrap();
        assert_eq!(cfg.timeline_order, TimelineOrder::NewestFirst);
    }

    #[test]
    fn missing_required_fields_error() {
        let _g = ENV_MUTEX.lock().unwrap();
        clear_vars();
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(&env_path, "HOMESERVER_URL=https://matrix.org\n").unwrap();
        assert!(Settings::from_env(env_path.to_str().unwrap()).is_err());
    }
}
