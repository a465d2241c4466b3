//! Metrics push gateway client
//!
//! Implements the core's `MetricsSink` over JSON-over-HTTP: one document per
//! datapoint. The engine pushes at monitor cadence (minutes, not seconds),
//! so per-point requests are fine; batching can come later if agents
//! multiply.

use serde_json::json;
use thermowatch_core::observers::{DispatchError, MetricsSink};
use thermowatch_core::time::{self, Timestamp};

use crate::http::HttpClient;

/// Default ingest path on the metrics gateway
const DEFAULT_PATH: &str = "/v1/metrics";

/// `MetricsSink` over an HTTP metrics gateway
pub struct HttpMetricsSink {
    client: HttpClient,
    path: String,
}

impl HttpMetricsSink {
    /// Push datapoints through `client` to the default ingest path
    pub fn new(client: HttpClient) -> Self {
        Self { client, path: DEFAULT_PATH.to_owned() }
    }

    /// Override the ingest path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

/// Build the wire document for one datapoint
fn datapoint(
    namespace: &str,
    metric: &str,
    dimension_name: &str,
    dimension_value: &str,
    value: f64,
    timestamp: Timestamp,
) -> serde_json::Value {
    json!({
        "namespace": namespace,
        "metric": metric,
        "dimensions": [{ "name": dimension_name, "value": dimension_value }],
        "value": value,
        "timestamp": time::iso8601(timestamp),
    })
}

impl MetricsSink for HttpMetricsSink {
    fn push(
        &self,
        namespace: &str,
        metric: &str,
        dimension_name: &str,
        dimension_value: &str,
        value: f64,
        timestamp: Timestamp,
    ) -> Result<(), DispatchError> {
        let body = datapoint(namespace, metric, dimension_name, dimension_value, value, timestamp);
        self.client
            .post_json(&self.path, &body)
            .map_err(|e| DispatchError::Metrics(e.to_string()))?;
        log::debug!("pushed {namespace}/{metric} = {value}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datapoint_shape() {
        let d = datapoint(
            "Lab/Thermowatch",
            "Temperature",
            "MonitorName",
            "fridge",
            4.0,
            1_609_459_200_000,
        );

        assert_eq!(d["namespace"], "Lab/Thermowatch");
        assert_eq!(d["metric"], "Temperature");
        assert_eq!(d["dimensions"][0]["name"], "MonitorName");
        assert_eq!(d["dimensions"][0]["value"], "fridge");
        assert_eq!(d["value"], 4.0);
        assert_eq!(d["timestamp"], "2021-01-01T00:00:00Z");
    }
}
