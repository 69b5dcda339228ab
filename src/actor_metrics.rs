// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::descriptors;
use crate::error::Error;
use crate::instrument::{Counter, Gauge, Histogram, InstrumentDescriptor};
use crate::meter::Meter;
use crate::LIB_NAME;

/// Callback invoked once per failed instrument creation.
pub type ErrorHandler = Arc<dyn Fn(&Error) + Send + Sync>;

/// The instrument registry of one actor runtime.
///
/// Construction requests every instrument from the backend exactly once. An instrument
/// the backend refuses is reported and left as a no-op handle, so a registry is always
/// usable, even when every creation failed.
///
/// All handles are fixed after construction except the mailbox-length gauge, which is
/// supplied later through [`set_mailbox_length_gauge`](Self::set_mailbox_length_gauge)
/// and is the only field behind a lock.
///
/// # Thread Safety
///
/// `ActorMetrics` is `Send + Sync`. Recording calls take `&self` and never block on the
/// mailbox gauge lock.
pub struct ActorMetrics {
    id: String,
    on_error: ErrorHandler,

    mailbox_length: Mutex<Gauge>,

    // Actors
    actor_failure_count: Counter,
    actor_message_receive_histogram: Histogram<f64>,
    actor_restarted_count: Counter,
    actor_spawn_count: Counter,
    actor_stopped_count: Counter,

    // Dead letters
    dead_letter_count: Counter,

    // Futures
    futures_completed_count: Counter,
    futures_started_count: Counter,
    futures_timed_out_count: Counter,

    // Thread pool
    thread_pool_latency: Histogram<u64>,
}

enum Slot<'a> {
    Counter(&'a mut Counter),
    F64Histogram(&'a mut Histogram<f64>),
    U64Histogram(&'a mut Histogram<u64>),
}

type SlotFn = fn(&mut ActorMetrics) -> Slot<'_>;

// The mailbox-length gauge is absent: it needs a reading function that only the
// runtime can supply, see `register_mailbox_length_source`.
const CONSTRUCTED: [(&InstrumentDescriptor, SlotFn); 10] = [
    (&descriptors::ACTOR_FAILURE_COUNT, |m| {
        Slot::Counter(&mut m.actor_failure_count)
    }),
    (&descriptors::ACTOR_MESSAGE_RECEIVE_HISTOGRAM, |m| {
        Slot::F64Histogram(&mut m.actor_message_receive_histogram)
    }),
    (&descriptors::ACTOR_RESTARTED_COUNT, |m| {
        Slot::Counter(&mut m.actor_restarted_count)
    }),
    (&descriptors::ACTOR_STOPPED_COUNT, |m| {
        Slot::Counter(&mut m.actor_stopped_count)
    }),
    (&descriptors::ACTOR_SPAWN_COUNT, |m| {
        Slot::Counter(&mut m.actor_spawn_count)
    }),
    (&descriptors::DEAD_LETTER_COUNT, |m| {
        Slot::Counter(&mut m.dead_letter_count)
    }),
    (&descriptors::FUTURES_COMPLETED_COUNT, |m| {
        Slot::Counter(&mut m.futures_completed_count)
    }),
    (&descriptors::FUTURES_STARTED_COUNT, |m| {
        Slot::Counter(&mut m.futures_started_count)
    }),
    (&descriptors::FUTURES_TIMED_OUT_COUNT, |m| {
        Slot::Counter(&mut m.futures_timed_out_count)
    }),
    (&descriptors::THREAD_POOL_LATENCY, |m| {
        Slot::U64Histogram(&mut m.thread_pool_latency)
    }),
];

/// Reports a failed instrument creation at error level.
pub fn log_creation_failure(err: &Error) {
    #[cfg(feature = "tracing")]
    tracing::error!(
        instrument = err.instrument(),
        metric.name = err.metric_name(),
        error = %err,
        "Instrument creation failed; recordings will be dropped"
    );

    #[cfg(not(feature = "tracing"))]
    log::error!("{err}");
}

/// Configures an [`ActorMetrics`] before its instruments are created.
///
/// ```rust
/// use protoactor_metrics::{ActorMetrics, NoopMeter};
///
/// let metrics = ActorMetrics::builder()
///     .id("node-1")
///     .on_error(|err| eprintln!("{err}"))
///     .build(&NoopMeter);
///
/// assert_eq!(metrics.id(), "node-1");
/// ```
pub struct ActorMetricsBuilder {
    id: String,
    on_error: ErrorHandler,
}

impl ActorMetricsBuilder {
    fn new() -> Self {
        Self {
            id: LIB_NAME.to_string(),
            on_error: Arc::new(log_creation_failure),
        }
    }

    /// Sets the metrics id. Defaults to [`LIB_NAME`].
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Replaces the default logger-based failure reporting.
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Error) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(handler);
        self
    }

    /// Creates every instrument against `meter`. Never fails.
    pub fn build(self, meter: &dyn Meter) -> ActorMetrics {
        let mut metrics = ActorMetrics {
            id: self.id,
            on_error: self.on_error,
            mailbox_length: Mutex::new(Gauge::noop()),
            actor_failure_count: Counter::noop(),
            actor_message_receive_histogram: Histogram::noop(),
            actor_restarted_count: Counter::noop(),
            actor_spawn_count: Counter::noop(),
            actor_stopped_count: Counter::noop(),
            dead_letter_count: Counter::noop(),
            futures_completed_count: Counter::noop(),
            futures_started_count: Counter::noop(),
            futures_timed_out_count: Counter::noop(),
            thread_pool_latency: Histogram::noop(),
        };

        let mut failed = 0usize;
        for (descriptor, slot) in CONSTRUCTED.iter() {
            let created = match slot(&mut metrics) {
                Slot::Counter(handle) => meter
                    .create_counter(descriptor)
                    .map(|inner| *handle = Counter::new(inner)),
                Slot::F64Histogram(handle) => meter
                    .create_f64_histogram(descriptor)
                    .map(|inner| *handle = Histogram::new(inner)),
                Slot::U64Histogram(handle) => meter
                    .create_u64_histogram(descriptor)
                    .map(|inner| *handle = Histogram::new(inner)),
            };

            if let Err(source) = created {
                failed += 1;
                metrics.report(Error::InstrumentCreation {
                    instrument: descriptor.field,
                    name: descriptor.name,
                    source,
                });
            }
        }

        log::debug!(
            "ActorMetrics '{}' created {} of {} instruments",
            metrics.id,
            CONSTRUCTED.len() - failed,
            CONSTRUCTED.len()
        );

        metrics
    }
}

impl ActorMetrics {
    /// Creates a registry against `meter`, logging any instrument the backend refuses.
    pub fn new(meter: &dyn Meter) -> Self {
        Self::builder().build(meter)
    }

    pub fn builder() -> ActorMetricsBuilder {
        ActorMetricsBuilder::new()
    }

    /// Metrics id of this registry. Reserved for telling several registries apart.
    pub fn id(&self) -> &str {
        &self.id
    }

    fn report(&self, err: Error) {
        (self.on_error)(&err);
    }

    /// Field names of the instruments that are currently no-ops.
    pub fn degraded_instruments(&self) -> Vec<&'static str> {
        let handles = [
            (descriptors::ACTOR_FAILURE_COUNT.field, self.actor_failure_count.is_noop()),
            (
                descriptors::ACTOR_MAILBOX_LENGTH.field,
                self.mailbox_length.lock().is_noop(),
            ),
            (
                descriptors::ACTOR_MESSAGE_RECEIVE_HISTOGRAM.field,
                self.actor_message_receive_histogram.is_noop(),
            ),
            (descriptors::ACTOR_RESTARTED_COUNT.field, self.actor_restarted_count.is_noop()),
            (descriptors::ACTOR_STOPPED_COUNT.field, self.actor_stopped_count.is_noop()),
            (descriptors::ACTOR_SPAWN_COUNT.field, self.actor_spawn_count.is_noop()),
            (descriptors::DEAD_LETTER_COUNT.field, self.dead_letter_count.is_noop()),
            (
                descriptors::FUTURES_COMPLETED_COUNT.field,
                self.futures_completed_count.is_noop(),
            ),
            (descriptors::FUTURES_STARTED_COUNT.field, self.futures_started_count.is_noop()),
            (
                descriptors::FUTURES_TIMED_OUT_COUNT.field,
                self.futures_timed_out_count.is_noop(),
            ),
            (descriptors::THREAD_POOL_LATENCY.field, self.thread_pool_latency.is_noop()),
        ];

        handles
            .into_iter()
            .filter_map(|(field, noop)| noop.then_some(field))
            .collect()
    }

    pub fn actor_failure_count(&self) -> &Counter {
        &self.actor_failure_count
    }

    pub fn actor_message_receive_histogram(&self) -> &Histogram<f64> {
        &self.actor_message_receive_histogram
    }

    pub fn actor_restarted_count(&self) -> &Counter {
        &self.actor_restarted_count
    }

    pub fn actor_spawn_count(&self) -> &Counter {
        &self.actor_spawn_count
    }

    pub fn actor_stopped_count(&self) -> &Counter {
        &self.actor_stopped_count
    }

    pub fn dead_letter_count(&self) -> &Counter {
        &self.dead_letter_count
    }

    pub fn futures_completed_count(&self) -> &Counter {
        &self.futures_completed_count
    }

    pub fn futures_started_count(&self) -> &Counter {
        &self.futures_started_count
    }

    pub fn futures_timed_out_count(&self) -> &Counter {
        &self.futures_timed_out_count
    }

    /// Thread-pool scheduling latency in milliseconds.
    pub fn thread_pool_latency(&self) -> &Histogram<u64> {
        &self.thread_pool_latency
    }

    #[inline]
    pub fn record_actor_spawned(&self) {
        self.actor_spawn_count.add(1);
    }

    #[inline]
    pub fn record_actor_restarted(&self) {
        self.actor_restarted_count.add(1);
    }

    #[inline]
    pub fn record_actor_stopped(&self) {
        self.actor_stopped_count.add(1);
    }

    #[inline]
    pub fn record_actor_failed(&self) {
        self.actor_failure_count.add(1);
    }

    #[inline]
    pub fn record_dead_letter(&self) {
        self.dead_letter_count.add(1);
    }

    #[inline]
    pub fn record_future_started(&self) {
        self.futures_started_count.add(1);
    }

    #[inline]
    pub fn record_future_completed(&self) {
        self.futures_completed_count.add(1);
    }

    #[inline]
    pub fn record_future_timed_out(&self) {
        self.futures_timed_out_count.add(1);
    }

    /// Records how long one message took to process, in seconds.
    #[inline]
    pub fn record_message_received(&self, duration: Duration) {
        self.actor_message_receive_histogram
            .record(duration.as_secs_f64());
    }

    /// Records thread-pool scheduling latency in whole milliseconds.
    #[inline]
    pub fn record_thread_pool_latency(&self, latency: Duration) {
        // Cap at u64::MAX milliseconds
        let millis = latency.as_millis().min(u64::MAX as u128) as u64;
        self.thread_pool_latency.record(millis);
    }

    /// Starts timing one message; the duration is recorded when the timer drops.
    ///
    /// ```rust
    /// use protoactor_metrics::{ActorMetrics, NoopMeter};
    ///
    /// let metrics = ActorMetrics::new(&NoopMeter);
    /// {
    ///     let _timer = metrics.time_message_receive();
    ///     // ... handle the message ...
    /// }
    /// ```
    pub fn time_message_receive(&self) -> ReceiveTimer<'_> {
        ReceiveTimer {
            histogram: &self.actor_message_receive_histogram,
            start: Instant::now(),
        }
    }

    /// Replaces the mailbox-length gauge.
    ///
    /// Call only after construction has returned. May be called repeatedly and from any
    /// thread; the last writer wins.
    pub fn set_mailbox_length_gauge(&self, gauge: Gauge) {
        // The previous handle is dropped after the guard is released.
        let _previous = std::mem::replace(&mut *self.mailbox_length.lock(), gauge);
    }

    /// Returns the gauge currently installed.
    pub fn mailbox_length_gauge(&self) -> Gauge {
        self.mailbox_length.lock().clone()
    }

    /// Reads the installed gauge, or `None` if none is installed.
    pub fn observe_mailbox_length(&self) -> Option<i64> {
        // Run the callback outside the critical section.
        let gauge = self.mailbox_length_gauge();
        gauge.observe()
    }

    /// Registers `source` with the backend as the mailbox-length gauge and installs it.
    ///
    /// Returns `false` if the backend refused the gauge. The failure is reported like a
    /// construction failure and the previously installed gauge stays in place.
    pub fn register_mailbox_length_source<F>(&self, meter: &dyn Meter, source: F) -> bool
    where
        F: Fn() -> i64 + Send + Sync + 'static,
    {
        let descriptor = &descriptors::ACTOR_MAILBOX_LENGTH;
        match meter.create_gauge(descriptor, Arc::new(source)) {
            Ok(inner) => {
                self.set_mailbox_length_gauge(Gauge::new(inner));
                true
            }
            Err(source) => {
                self.report(Error::InstrumentCreation {
                    instrument: descriptor.field,
                    name: descriptor.name,
                    source,
                });
                false
            }
        }
    }
}

impl fmt::Debug for ActorMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorMetrics")
            .field("id", &self.id)
            .field("degraded", &self.degraded_instruments())
            .finish_non_exhaustive()
    }
}

/// RAII guard that records message processing time.
///
/// Created by [`ActorMetrics::time_message_receive`]. When the guard is dropped the
/// elapsed time is recorded, in seconds, into the message-receive histogram.
#[must_use = "the duration is recorded when the timer is dropped"]
pub struct ReceiveTimer<'a> {
    histogram: &'a Histogram<f64>,
    start: Instant,
}

impl ReceiveTimer<'_> {
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for ReceiveTimer<'_> {
    #[inline]
    fn drop(&mut self) {
        self.histogram.record(self.start.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryMeter;
    use crate::NoopMeter;
    use std::sync::Mutex as StdMutex;

    fn collecting_builder() -> (ActorMetricsBuilder, Arc<StdMutex<Vec<String>>>) {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();
        let builder = ActorMetrics::builder().on_error(move |err| {
            sink.lock().unwrap().push(err.instrument().to_string());
        });
        (builder, seen)
    }

    #[test]
    fn test_healthy_backend_creates_everything_but_the_gauge() {
        let meter = InMemoryMeter::new();
        let (builder, seen) = collecting_builder();
        let metrics = builder.build(&meter);

        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(metrics.degraded_instruments(), vec!["ActorMailboxLength"]);
        assert_eq!(meter.requests().len(), 10);
        assert!(!meter
            .requests()
            .contains(&descriptors::ACTOR_MAILBOX_LENGTH.name));
    }

    #[test]
    fn test_requests_follow_table_order() {
        let meter = InMemoryMeter::new();
        let _metrics = ActorMetrics::new(&meter);

        let expected: Vec<_> = CONSTRUCTED.iter().map(|(d, _)| d.name).collect();
        assert_eq!(meter.requests(), expected);
    }

    #[test]
    fn test_single_failure_is_reported_and_isolated() {
        let meter = InMemoryMeter::new();
        meter.fail_on(descriptors::DEAD_LETTER_COUNT.name);
        let (builder, seen) = collecting_builder();
        let metrics = builder.build(&meter);

        assert_eq!(*seen.lock().unwrap(), vec!["DeadLetterCount".to_string()]);
        assert!(metrics.dead_letter_count().is_noop());
        assert!(!metrics.actor_spawn_count().is_noop());

        metrics.record_dead_letter();
        metrics.record_actor_spawned();

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(meter.counter_value(descriptors::DEAD_LETTER_COUNT.name), None);
        assert_eq!(meter.counter_value(descriptors::ACTOR_SPAWN_COUNT.name), Some(1));
    }

    #[test]
    fn test_every_failure_still_yields_usable_registry() {
        let meter = InMemoryMeter::new();
        meter.fail_all();
        let (builder, seen) = collecting_builder();
        let metrics = builder.build(&meter);

        assert_eq!(seen.lock().unwrap().len(), 10);
        assert_eq!(metrics.degraded_instruments().len(), 11);

        metrics.record_actor_spawned();
        metrics.record_actor_restarted();
        metrics.record_actor_stopped();
        metrics.record_actor_failed();
        metrics.record_dead_letter();
        metrics.record_future_started();
        metrics.record_future_completed();
        metrics.record_future_timed_out();
        metrics.record_message_received(Duration::from_millis(3));
        metrics.record_thread_pool_latency(Duration::from_millis(3));
        drop(metrics.time_message_receive());

        assert_eq!(metrics.observe_mailbox_length(), None);
    }

    #[test]
    fn test_duplicate_registration_degrades_second_registry() {
        let meter = InMemoryMeter::new();
        let first = ActorMetrics::new(&meter);
        let (builder, seen) = collecting_builder();
        let second = builder.build(&meter);

        assert_eq!(first.degraded_instruments(), vec!["ActorMailboxLength"]);
        assert_eq!(seen.lock().unwrap().len(), 10);
        assert_eq!(second.degraded_instruments().len(), 11);

        second.record_actor_spawned();
        first.record_actor_spawned();
        assert_eq!(meter.counter_value(descriptors::ACTOR_SPAWN_COUNT.name), Some(1));
    }

    #[test]
    fn test_message_receive_recorded_in_seconds() {
        let meter = InMemoryMeter::new();
        let metrics = ActorMetrics::new(&meter);

        metrics.record_message_received(Duration::from_millis(250));

        assert_eq!(
            meter.f64_histogram(descriptors::ACTOR_MESSAGE_RECEIVE_HISTOGRAM.name),
            Some(vec![0.25])
        );
    }

    #[test]
    fn test_thread_pool_latency_recorded_in_millis() {
        let meter = InMemoryMeter::new();
        let metrics = ActorMetrics::new(&meter);

        metrics.record_thread_pool_latency(Duration::from_micros(2_500));
        metrics.record_thread_pool_latency(Duration::from_secs(1));

        assert_eq!(
            meter.u64_histogram(descriptors::THREAD_POOL_LATENCY.name),
            Some(vec![2, 1000])
        );
    }

    #[test]
    fn test_receive_timer_records_on_drop() {
        let meter = InMemoryMeter::new();
        let metrics = ActorMetrics::new(&meter);

        {
            let timer = metrics.time_message_receive();
            std::thread::sleep(Duration::from_millis(10));
            assert!(timer.elapsed() >= Duration::from_millis(10));
        }

        let samples = meter
            .f64_histogram(descriptors::ACTOR_MESSAGE_RECEIVE_HISTOGRAM.name)
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert!(samples[0] >= 0.010);
    }

    #[test]
    fn test_mailbox_gauge_last_writer_wins() {
        let meter = InMemoryMeter::new();
        let metrics = ActorMetrics::new(&meter);

        assert!(metrics.register_mailbox_length_source(&meter, || 3));
        assert_eq!(metrics.observe_mailbox_length(), Some(3));

        assert!(metrics.register_mailbox_length_source(&meter, || 8));
        assert_eq!(metrics.observe_mailbox_length(), Some(8));
        assert_eq!(meter.poll_gauge(descriptors::ACTOR_MAILBOX_LENGTH.name), Some(8));
        assert!(metrics.degraded_instruments().is_empty());
    }

    #[test]
    fn test_registry_and_backend_agree_after_backend_replacement() {
        let meter = InMemoryMeter::new();
        let metrics = ActorMetrics::new(&meter);
        let name = descriptors::ACTOR_MAILBOX_LENGTH.name;

        assert!(metrics.register_mailbox_length_source(&meter, || 1));
        meter
            .create_gauge(&descriptors::ACTOR_MAILBOX_LENGTH, Arc::new(|| 2))
            .unwrap();

        assert_eq!(meter.poll_gauge(name), Some(2));
        assert_eq!(metrics.observe_mailbox_length(), meter.poll_gauge(name));
    }

    #[test]
    fn test_set_mailbox_gauge_directly() {
        let metrics = ActorMetrics::new(&NoopMeter);
        let gauge = NoopMeter
            .create_gauge(&descriptors::ACTOR_MAILBOX_LENGTH, Arc::new(|| 42))
            .map(Gauge::new)
            .unwrap();

        metrics.set_mailbox_length_gauge(gauge.clone());

        assert!(metrics.mailbox_length_gauge().same_instrument(&gauge));
        assert_eq!(metrics.observe_mailbox_length(), Some(42));
    }

    #[test]
    fn test_failed_gauge_registration_keeps_previous() {
        let meter = InMemoryMeter::new();
        let (builder, seen) = collecting_builder();
        let metrics = builder.build(&meter);

        assert!(metrics.register_mailbox_length_source(&meter, || 5));
        meter.fail_on(descriptors::ACTOR_MAILBOX_LENGTH.name);
        assert!(!metrics.register_mailbox_length_source(&meter, || 9));

        assert_eq!(metrics.observe_mailbox_length(), Some(5));
        assert_eq!(*seen.lock().unwrap(), vec!["ActorMailboxLength".to_string()]);
    }

    #[test]
    fn test_default_id_and_debug() {
        let metrics = ActorMetrics::new(&NoopMeter);
        assert_eq!(metrics.id(), LIB_NAME);

        let debug_str = format!("{:?}", metrics);
        assert!(debug_str.contains("ActorMetrics"));
        assert!(debug_str.contains("ActorMailboxLength"));
    }

    #[test]
    fn test_registry_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ActorMetrics>();
    }
}
