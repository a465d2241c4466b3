//! Pub/sub topic gateway client
//!
//! Implements the core's `Publisher`. The gateway caps subjects at 100
//! characters; anything longer is truncated here, with the truncation
//! logged, rather than bounced by the server.

use std::borrow::Cow;

use serde_json::json;
use thermowatch_core::observers::{DispatchError, Publisher};

use crate::http::HttpClient;

/// Gateway limit on subject length, in characters
const MAX_SUBJECT_CHARS: usize = 100;

/// Default publish path on the pub/sub gateway
const DEFAULT_PATH: &str = "/v1/publish";

/// Truncate `subject` to the gateway's limit
///
/// Counts characters, not bytes, so a multibyte subject never gets cut
/// mid-codepoint.
fn clamp_subject(subject: &str) -> Cow<'_, str> {
    match subject.char_indices().nth(MAX_SUBJECT_CHARS) {
        None => Cow::Borrowed(subject),
        Some((byte_idx, _)) => {
            log::info!("Truncating subject to {MAX_SUBJECT_CHARS} characters.");
            Cow::Borrowed(&subject[..byte_idx])
        }
    }
}

/// `Publisher` over an HTTP pub/sub gateway
pub struct TopicClient {
    client: HttpClient,
    path: String,
}

impl TopicClient {
    /// Publish through `client` to the default publish path
    pub fn new(client: HttpClient) -> Self {
        Self { client, path: DEFAULT_PATH.to_owned() }
    }

    /// Override the publish path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl Publisher for TopicClient {
    fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), DispatchError> {
        let document = json!({
            "topic": topic,
            "subject": clamp_subject(subject),
            "message": body,
        });
        self.client
            .post_json(&self.path, &document)
            .map_err(|e| DispatchError::Publish(e.to_string()))?;
        log::info!("Publishing to topic: {topic}");
        Ok(())
    }
}
