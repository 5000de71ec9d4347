//! Matrix room event model and document extraction.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// First fenced `mdx` block in a message body, non-greedy, delimiters on
/// their own lines.
static MDX_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```mdx\n(.*?)\n```").expect("valid regex"));

/// Media type reported for every extracted document.
pub const CONTENT_TYPE_MDX: &str = "text/mdx";

/// Message fields carried in the `content` object of an `m.room.message`
/// event. Non-message events deserialize to an empty content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContent {
    /// Message type, e.g. `m.text` or `m.image`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msgtype: Option<String>,
    /// Plain-text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    /// Optional rendered body, usually HTML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_body: Option<String>,
}

/// A single event from a room timeline as returned by the client-server API.
///
/// ```json
/// {
///   "type": "m.room.message",
///   "sender": "@alice:matrix.org",
///   "origin_server_ts": 1700000000000,
///   "content": { "msgtype": "m.text", "body": "hello" }
/// }
/// ```
///
/// Events are immutable once observed; their position on the page is the
/// only ordering signal, since federation can deliver them out of timestamp
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Event type, e.g. `m.room.message`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Fully qualified id of the user who sent the event.
    pub sender: String,
    /// Server-side timestamp in milliseconds since the Unix epoch.
    pub origin_server_ts: u64,
    /// Type-specific payload.
    #[serde(default)]
    pub content: EventContent,
}

impl TimelineEvent {
    /// Whether the sender matches the given identifier.
    ///
    /// Deliberately a substring test rather than equality, so partial
    /// identifiers like `alice` match `@alice:matrix.org`.
    pub fn sender_matches(&self, identifier: &str) -> bool {
        self.sender.contains(identifier)
    }

    /// Heuristic for "this message hosts a document" rather than ordinary
    /// chat: a text message carrying an ```` ```mdx ```` fence, a `# `
    /// heading marker, or a rendered body. False positives are accepted.
    pub fn is_content_message(&self) -> bool {
        let body = self.content.body.as_deref().unwrap_or("");
        self.content.msgtype.as_deref() == Some("m.text")
            && (body.contains("```mdx")
                || body.contains("# ")
                || self
                    .content
                    .formatted_body
                    .as_deref()
                    .is_some_and(|f| !f.is_empty()))
    }

    /// Derive the document text from the event. Pure and total: absence of
    /// any usable field yields an empty string, never an error.
    ///
    /// Priority: a non-empty `formatted_body` verbatim; else the text
    /// strictly inside the first fenced `mdx` block of `body` (the body
    /// unchanged if the fence is never closed); else `body` verbatim.
    pub fn extract_content(&self) -> String {
        if let Some(formatted) = self.content.formatted_body.as_deref() {
            if !formatted.is_empty() {
                return formatted.to_string();
            }
        }
        if let Some(body) = self.content.body.as_deref() {
            if let Some(caps) = MDX_BLOCK.captures(body) {
                return caps[1].to_string();
            }
            return body.to_string();
        }
        String::new()
    }
}

/// Normalized document plus metadata produced by a successful resolution.
/// Created fresh per call; `author` and `timestamp` are taken from the
/// selected event verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPayload {
    /// Document text handed to the presenter.
    pub content: String,
    /// Always [`CONTENT_TYPE_MDX`].
    pub content_type: String,
    /// Sender of the selected event, as reported by the network.
    pub author: String,
    /// `origin_server_ts` of the selected event, in milliseconds.
    pub timestamp: u64,
}
