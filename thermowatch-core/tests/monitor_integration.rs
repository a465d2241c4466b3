//! End-to-end tests for the monitoring engine
//!
//! Wire the real stack together: scripted bus frames through the sampler and
//! sensor, a live monitor thread, the range alarm, and the rate-limited
//! alert router, with a mock clock driving all policy timing.

use std::io::{Read, Seek};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thermowatch_core::{
    AlarmConfig, AlertRouter, MemoryTransport, MockClock, MonitorConfig, NotificationTransport,
    ObserverFn, Quota, RangeAlarm, Sample, SampleObserver, Sampler, ScriptedBus, Sensor,
    SensorConfig, SensorMonitor, SharedBus, ThermocoupleSensor, TimeSource,
};
use thermowatch_core::notify::lists;
use thermowatch_core::observers::{FanOut, FileLogger};

/// 30.0 °C probe frame: 120 LSB at 0.25 °C
const HOT_FRAME: u32 = 120 << 18;
/// 5.0 °C probe frame: 20 LSB
const OK_FRAME: u32 = 20 << 18;

const TWO_MINUTES_MS: u64 = 120_000;

fn fixture(
    io: ScriptedBus,
) -> (
    Arc<MockClock>,
    Arc<ThermocoupleSensor<ScriptedBus>>,
    Arc<MemoryTransport>,
    Arc<AlertRouter>,
) {
    let clock = Arc::new(MockClock::new(1_609_459_200_000));
    let sampler = Sampler::new(
        Arc::new(SharedBus::new(io)),
        Arc::clone(&clock) as Arc<dyn TimeSource>,
    );
    let cfg: SensorConfig = serde_json::from_str(
        r#"{"name": "fridge", "channel": 0, "sample_count": 1, "sample_interval_ms": 0}"#,
    )
    .unwrap();
    let sensor = ThermocoupleSensor::new(&cfg, sampler);

    let transport = Arc::new(MemoryTransport::new());
    let alerts = Arc::new(AlertRouter::new(
        Arc::clone(&transport) as Arc<dyn NotificationTransport>,
        Arc::clone(&clock) as Arc<dyn TimeSource>,
    ));
    alerts.add_recipient("mon", lists::MONITORING, Quota { per_hour: 100, per_day: 100 });
    alerts.add_recipient("sys", lists::SYSTEM, Quota { per_hour: 100, per_day: 100 });

    (clock, sensor, transport, alerts)
}

fn fast(max_failures: u32) -> MonitorConfig {
    MonitorConfig { period: Duration::from_millis(2), max_failures }
}

fn wait_for<F: Fn() -> bool>(what: &str, cond: F) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        thread::sleep(Duration::from_millis(2));
    }
    panic!("timed out waiting for {what}");
}

#[test]
fn breach_alerts_after_grace_and_logs_every_sample() {
    // Three hot bursts, two simulated minutes apart: the episode reaches
    // 240 s on the third sample and crosses the 2-minute grace.
    let mut io = ScriptedBus::new(1);
    io.push_frames(0, HOT_FRAME, 3);
    let (clock, sensor, transport, alerts) = fixture(io);

    let alarm = RangeAlarm::new(
        AlarmConfig { min_c: 2.0, max_c: 8.0, base_grace_minutes: 2.0 },
        Arc::clone(&alerts),
    );
    let mut logfile = tempfile::tempfile().unwrap();
    let advancer = Arc::clone(&clock);
    let observer = FanOut::new()
        .with(alarm)
        .with(FileLogger::new(logfile.try_clone().unwrap()))
        .with(ObserverFn(move |_: &Sample| advancer.advance(TWO_MINUTES_MS)));

    // Generous failure budget: once the script runs out the bus reports
    // transient errors, which must only back off, not escalate.
    let monitor = SensorMonitor::spawn(sensor, observer, fast(100), alerts);

    wait_for("the breach alert", || transport.count() >= 1);
    monitor.join();

    let deliveries = transport.deliveries();
    assert_eq!(deliveries.len(), 1);
    let body = &deliveries[0].1;
    assert!(body.contains("[fridge] - Out of range"));
    assert!(body.contains("Reporting: 30C"));
    assert!(body.contains("4.0 minutes"));
    assert!(body.contains("allowed range: (2, 8)"));

    let mut contents = String::new();
    logfile.rewind().unwrap();
    logfile.read_to_string(&mut contents).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("fridge"));
    assert!(lines[0].contains("2021-01-01T00:00:00Z"));
    assert!(lines[0].ends_with("30.00C"));
}

#[test]
fn recovery_clears_the_episode_without_alerting() {
    // Hot, hot, back in range: grace is never exceeded, nothing fires.
    let mut io = ScriptedBus::new(1);
    io.push_frame(0, HOT_FRAME).push_frame(0, OK_FRAME);
    let (clock, sensor, transport, alerts) = fixture(io);

    let alarm = RangeAlarm::new(
        AlarmConfig { min_c: 2.0, max_c: 8.0, base_grace_minutes: 2.0 },
        Arc::clone(&alerts),
    );
    let seen = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter = Arc::clone(&seen);
    let advancer = Arc::clone(&clock);
    let observer = FanOut::new().with(alarm).with(ObserverFn(move |_: &Sample| {
        advancer.advance(TWO_MINUTES_MS);
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }));

    let monitor = SensorMonitor::spawn(sensor, observer, fast(100), alerts);
    wait_for("both samples", || {
        seen.load(std::sync::atomic::Ordering::SeqCst) >= 2
    });
    monitor.join();

    assert_eq!(transport.count(), 0);
}

#[test]
fn dead_bus_escalates_once_then_halts() {
    // Empty script: every exchange fails.
    let (_clock, sensor, transport, alerts) = fixture(ScriptedBus::new(1));

    let monitor = SensorMonitor::spawn(
        sensor,
        ObserverFn(|_: &Sample| {}),
        fast(3),
        Arc::clone(&alerts),
    );
    wait_for("the monitor to halt", || !monitor.running());
    monitor.join();

    let deliveries = transport.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert!(deliveries[0].1.contains("maximum allowed failures exceeded"));
    assert!(deliveries[0].1.contains("script exhausted"));
}

#[test]
fn stopping_the_sensor_ends_the_monitor_quietly() {
    let mut io = ScriptedBus::new(1);
    io.push_frames(0, OK_FRAME, 10_000);
    let (_clock, sensor, transport, alerts) = fixture(io);

    let seen = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter = Arc::clone(&seen);
    let monitor = SensorMonitor::spawn(
        Arc::clone(&sensor) as Arc<dyn Sensor>,
        ObserverFn(move |_: &Sample| {
            counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }),
        fast(3),
        alerts,
    );

    wait_for("first sample", || {
        seen.load(std::sync::atomic::Ordering::SeqCst) >= 1
    });
    sensor.stop();
    wait_for("the monitor to halt", || !monitor.running());
    monitor.join();

    // Permanent unavailability is not an outage: no alert.
    assert_eq!(transport.count(), 0);
}
