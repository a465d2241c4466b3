//! Stock sample observers
//!
//! Downstream consumers of the per-sensor sample stream. Each one is a
//! [`SampleObserver`] so it can sit directly behind a monitor, and each
//! upholds the callback contract: failures are logged or escalated through
//! the alert router, never thrown back into the monitor loop.
//!
//! The metrics and pub/sub collaborators live behind the [`MetricsSink`] and
//! [`Publisher`] traits; wire implementations are provided by the connectors
//! crate.

use std::io::Write;
use std::sync::Arc;

use thiserror::Error;

use crate::monitor::SampleObserver;
use crate::notify::AlertRouter;
use crate::sample::Sample;
use crate::time::Timestamp;

/// Failure reported by a dispatch collaborator
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Metrics datapoint was not accepted
    #[error("metrics push failed: {0}")]
    Metrics(String),
    /// Topic publish was not accepted
    #[error("publish failed: {0}")]
    Publish(String),
}

/// Cloud metrics collaborator
pub trait MetricsSink: Send + Sync {
    /// Push one datapoint
    fn push(
        &self,
        namespace: &str,
        metric: &str,
        dimension_name: &str,
        dimension_value: &str,
        value: f64,
        timestamp: Timestamp,
    ) -> Result<(), DispatchError>;
}

/// Pub/sub topic collaborator
///
/// Implementations must accept subjects up to 100 characters; longer
/// subjects are truncated (and the truncation logged) on their side.
pub trait Publisher: Send + Sync {
    /// Publish `body` under `subject` to `topic`
    fn publish(&self, topic: &str, subject: &str, body: &str) -> Result<(), DispatchError>;
}

/// Appends one tab-aligned line per sample to a writer
pub struct FileLogger<W: Write + Send> {
    out: W,
}

impl<W: Write + Send> FileLogger<W> {
    /// Log samples to `out`, flushing after every line
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn format_record(sample: &Sample) -> String {
        format!(
            "{:<10}\t{}\t{:>8.2}C",
            sample.name,
            sample.iso_timestamp(),
            sample.celsius
        )
    }
}

impl<W: Write + Send> SampleObserver for FileLogger<W> {
    fn on_sample(&mut self, sample: &Sample) {
        let line = Self::format_record(sample);
        if let Err(e) = writeln!(self.out, "{line}").and_then(|_| self.out.flush()) {
            log::error!("[{}] failed to write log record: {}", sample.name, e);
        }
    }
}

/// Pushes each sample to a metrics sink, rounded to the nearest degree
pub struct MetricsHeartbeat {
    namespace: String,
    metric: String,
    dimension_value: String,
    sink: Arc<dyn MetricsSink>,
}

/// Dimension name used for all per-monitor metrics
const MONITOR_DIMENSION: &str = "MonitorName";

impl MetricsHeartbeat {
    /// Push `metric` under `namespace`, dimensioned by monitor name
    pub fn new(namespace: &str, metric: &str, monitor_name: &str, sink: Arc<dyn MetricsSink>) -> Self {
        Self {
            namespace: namespace.to_owned(),
            metric: metric.to_owned(),
            dimension_value: monitor_name.to_owned(),
            sink,
        }
    }
}

impl SampleObserver for MetricsHeartbeat {
    fn on_sample(&mut self, sample: &Sample) {
        let result = self.sink.push(
            &self.namespace,
            &self.metric,
            MONITOR_DIMENSION,
            &self.dimension_value,
            sample.celsius.round(),
            sample.timestamp,
        );
        match result {
            Ok(()) => log::debug!("[{}] pushed {}", sample.name, self.metric),
            // A dead metrics endpoint is not a sensor problem.
            Err(e) => log::error!("[{}] {}", sample.name, e),
        }
    }
}

/// Publishes a short heartbeat record to a pub/sub topic
///
/// A failed publish is itself worth knowing about: it fires a system-level
/// alert, since silence from a heartbeat topic is how operators learn an
/// agent has gone dark.
pub struct TopicHeartbeat {
    topic: String,
    publisher: Arc<dyn Publisher>,
    alerts: Arc<AlertRouter>,
}

impl TopicHeartbeat {
    /// Publish each sample to `topic`
    pub fn new(topic: &str, publisher: Arc<dyn Publisher>, alerts: Arc<AlertRouter>) -> Self {
        Self {
            topic: topic.to_owned(),
            publisher,
            alerts,
        }
    }

    fn format_record(sample: &Sample) -> String {
        format!("{:<10}, {:>8.2}C", sample.iso_timestamp(), sample.celsius)
    }
}

impl SampleObserver for TopicHeartbeat {
    fn on_sample(&mut self, sample: &Sample) {
        let record = Self::format_record(sample);
        match self.publisher.publish(&self.topic, &record, &record) {
            Ok(()) => log::info!("published to topic: {}", self.topic),
            Err(e) => {
                log::error!("[{}] {}", sample.name, e);
                self.alerts.alert_system("Failed to post heartbeat!");
            }
        }
    }
}

/// Dispatches one sample stream to several observers
///
/// Lets one monitor (and therefore one sampling burst per tick) drive
/// logging, alarming and heartbeats together instead of each observer
/// sampling the bus on its own.
#[derive(Default)]
pub struct FanOut {
    observers: Vec<Box<dyn SampleObserver>>,
}

impl FanOut {
    /// Create an empty fan-out
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer
    pub fn with(mut self, observer: impl SampleObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }
}

impl SampleObserver for FanOut {
    fn on_sample(&mut self, sample: &Sample) {
        for observer in &mut self.observers {
            observer.on_sample(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Seek};
    use std::sync::Mutex;

    use crate::monitor::ObserverFn;
    use crate::notify::{lists, MemoryTransport, NotificationTransport, Quota};
    use crate::time::{MockClock, TimeSource};

    fn sample() -> Sample {
        Sample::new("TS-1", 1_609_459_200_000, 21.456, 24.0, 0)
    }

    #[test]
    fn file_logger_writes_aligned_records() {
        let mut file = tempfile::tempfile().unwrap();
        {
            let mut logger = FileLogger::new(file.try_clone().unwrap());
            logger.on_sample(&sample());
        }

        let mut contents = String::new();
        file.rewind().unwrap();
        file.read_to_string(&mut contents).unwrap();
        assert_eq!(contents, "TS-1      \t2021-01-01T00:00:00Z\t   21.46C\n");
    }

    #[derive(Default)]
    struct RecordingSink {
        pushes: Mutex<Vec<(String, f64)>>,
        fail: bool,
    }

    impl MetricsSink for RecordingSink {
        fn push(
            &self,
            namespace: &str,
            _metric: &str,
            _dimension_name: &str,
            _dimension_value: &str,
            value: f64,
            _timestamp: Timestamp,
        ) -> Result<(), DispatchError> {
            if self.fail {
                return Err(DispatchError::Metrics("endpoint down".into()));
            }
            self.pushes.lock().unwrap().push((namespace.to_owned(), value));
            Ok(())
        }
    }

    #[test]
    fn metrics_heartbeat_rounds_to_nearest_degree() {
        let sink = Arc::new(RecordingSink::default());
        let mut hb = MetricsHeartbeat::new(
            "Lab/Thermowatch",
            "Temperature",
            "TS-1",
            Arc::clone(&sink) as Arc<dyn MetricsSink>,
        );

        hb.on_sample(&sample());
        let pushes = sink.pushes.lock().unwrap();
        assert_eq!(pushes.as_slice(), &[("Lab/Thermowatch".to_owned(), 21.0)]);
    }

    #[test]
    fn metrics_failure_does_not_propagate() {
        let sink = Arc::new(RecordingSink { fail: true, ..Default::default() });
        let mut hb = MetricsHeartbeat::new("ns", "m", "TS-1", sink);
        // Must not panic.
        hb.on_sample(&sample());
    }

    struct FailingPublisher;
    impl Publisher for FailingPublisher {
        fn publish(&self, _: &str, _: &str, _: &str) -> Result<(), DispatchError> {
            Err(DispatchError::Publish("broker gone".into()))
        }
    }

    #[test]
    fn heartbeat_publish_failure_raises_system_alert() {
        let transport = Arc::new(MemoryTransport::new());
        let alerts = Arc::new(AlertRouter::new(
            Arc::clone(&transport) as Arc<dyn NotificationTransport>,
            Arc::new(MockClock::new(0)) as Arc<dyn TimeSource>,
        ));
        alerts.add_recipient("ops", lists::SYSTEM, Quota::default());

        let mut hb = TopicHeartbeat::new("TS-1", Arc::new(FailingPublisher), alerts);
        hb.on_sample(&sample());

        let deliveries = transport.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert!(deliveries[0].1.contains("Failed to post heartbeat"));
    }

    #[test]
    fn fan_out_reaches_every_observer() {
        let counts = Arc::new(Mutex::new((0u32, 0u32)));
        let (a, b) = (Arc::clone(&counts), Arc::clone(&counts));

        let mut fan = FanOut::new()
            .with(ObserverFn(move |_: &Sample| a.lock().unwrap().0 += 1))
            .with(ObserverFn(move |_: &Sample| b.lock().unwrap().1 += 1));

        fan.on_sample(&sample());
        fan.on_sample(&sample());
        assert_eq!(*counts.lock().unwrap(), (2, 2));
    }
}
