//! SMS gateway client
//!
//! Implements the core's `NotificationTransport`. Quota enforcement lives in
//! the core's alert router; by the time a message reaches this client it has
//! already been accepted, so the only job left is delivery.

use serde_json::json;
use thermowatch_core::notify::{NotificationTransport, NotifyError};

use crate::http::HttpClient;

/// Default send path on the SMS gateway
const DEFAULT_PATH: &str = "/v1/sms";

/// `NotificationTransport` over an HTTP SMS gateway
pub struct SmsGateway {
    client: HttpClient,
    path: String,
}

impl SmsGateway {
    /// Send through `client` to the default send path
    pub fn new(client: HttpClient) -> Self {
        Self { client, path: DEFAULT_PATH.to_owned() }
    }

    /// Override the send path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

impl NotificationTransport for SmsGateway {
    fn send(&self, address: &str, body: &str) -> Result<(), NotifyError> {
        let document = json!({
            "to": address,
            "message": body,
        });
        self.client
            .post_json(&self.path, &document)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        log::info!("Sent SMS to: {address}");
        Ok(())
    }
}
