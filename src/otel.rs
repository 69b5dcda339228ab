// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

//! OpenTelemetry backend.
//!
//! Enabled with the `opentelemetry` feature. [`OtelMeter`] adapts an
//! [`opentelemetry::metrics::Meter`] to this crate's [`Meter`] trait, and
//! [`ActorMetrics::from_global`] builds a registry against the process-wide provider.
//!
//! ```rust,ignore
//! use protoactor_metrics::otel::OtelMeter;
//! use protoactor_metrics::ActorMetrics;
//!
//! // After opentelemetry::global::set_meter_provider(...)
//! let meter = OtelMeter::global();
//! let metrics = ActorMetrics::new(&meter);
//! metrics.register_mailbox_length_source(&meter, || 0);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use opentelemetry::metrics as otel;
use parking_lot::Mutex;

use crate::error::Result;
use crate::instrument::{
    CounterInstrument, GaugeCallback, GaugeInstrument, HistogramInstrument, InstrumentDescriptor,
};
use crate::meter::Meter;
use crate::{ActorMetrics, LIB_NAME};

struct OtelCounter(otel::Counter<u64>);

impl CounterInstrument for OtelCounter {
    fn add(&self, delta: u64) {
        self.0.add(delta, &[]);
    }
}

struct OtelHistogram<T>(otel::Histogram<T>);

impl HistogramInstrument<f64> for OtelHistogram<f64> {
    fn record(&self, value: f64) {
        self.0.record(value, &[]);
    }
}

impl HistogramInstrument<u64> for OtelHistogram<u64> {
    fn record(&self, value: u64) {
        self.0.record(value, &[]);
    }
}

type GaugeSlot = Arc<Mutex<GaugeCallback>>;

struct OtelGauge(GaugeSlot);

impl GaugeInstrument for OtelGauge {
    fn observe(&self) -> i64 {
        let read = self.0.lock().clone();
        read()
    }
}

/// [`Meter`] backed by an OpenTelemetry meter.
///
/// OpenTelemetry never rejects an instrument, so every creation request succeeds.
/// Each gauge name is registered with OpenTelemetry once; creating it again swaps the
/// callback the exporter polls.
pub struct OtelMeter {
    meter: otel::Meter,
    gauges: Mutex<HashMap<&'static str, GaugeSlot>>,
}

impl OtelMeter {
    pub fn new(meter: otel::Meter) -> Self {
        Self {
            meter,
            gauges: Mutex::new(HashMap::new()),
        }
    }

    /// Meter named [`LIB_NAME`] from the globally installed meter provider.
    pub fn global() -> Self {
        Self::new(opentelemetry::global::meter(LIB_NAME))
    }
}

impl std::fmt::Debug for OtelMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtelMeter")
            .field("gauges", &self.gauges.lock().len())
            .finish_non_exhaustive()
    }
}

impl Meter for OtelMeter {
    fn create_counter(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn CounterInstrument>> {
        let mut builder = self
            .meter
            .u64_counter(descriptor.name)
            .with_description(descriptor.description);
        if let Some(unit) = descriptor.unit {
            builder = builder.with_unit(unit.as_str());
        }
        Ok(Arc::new(OtelCounter(builder.build())))
    }

    fn create_f64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<f64>>> {
        let mut builder = self
            .meter
            .f64_histogram(descriptor.name)
            .with_description(descriptor.description);
        if let Some(unit) = descriptor.unit {
            builder = builder.with_unit(unit.as_str());
        }
        Ok(Arc::new(OtelHistogram(builder.build())))
    }

    fn create_u64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<u64>>> {
        let mut builder = self
            .meter
            .u64_histogram(descriptor.name)
            .with_description(descriptor.description);
        if let Some(unit) = descriptor.unit {
            builder = builder.with_unit(unit.as_str());
        }
        Ok(Arc::new(OtelHistogram(builder.build())))
    }

    fn create_gauge(
        &self,
        descriptor: &InstrumentDescriptor,
        callback: GaugeCallback,
    ) -> Result<Arc<dyn GaugeInstrument>> {
        let mut gauges = self.gauges.lock();
        if let Some(slot) = gauges.get(descriptor.name) {
            *slot.lock() = callback;
            return Ok(Arc::new(OtelGauge(slot.clone())));
        }

        let slot: GaugeSlot = Arc::new(Mutex::new(callback));
        let polled = slot.clone();
        let mut builder = self
            .meter
            .i64_observable_gauge(descriptor.name)
            .with_description(descriptor.description)
            .with_callback(move |observer| {
                let read = polled.lock().clone();
                observer.observe(read(), &[]);
            });
        if let Some(unit) = descriptor.unit {
            builder = builder.with_unit(unit.as_str());
        }
        let _registration = builder.build();

        gauges.insert(descriptor.name, slot.clone());
        Ok(Arc::new(OtelGauge(slot)))
    }
}

impl ActorMetrics {
    /// Creates a registry against the globally installed OpenTelemetry meter provider.
    pub fn from_global() -> Self {
        Self::new(&OtelMeter::global())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors;

    fn meter() -> OtelMeter {
        // Without an installed provider the global meter is a no-op.
        OtelMeter::global()
    }

    #[test]
    fn test_every_instrument_is_created() {
        let metrics = ActorMetrics::new(&meter());
        assert_eq!(metrics.degraded_instruments(), vec!["ActorMailboxLength"]);

        metrics.record_actor_spawned();
        metrics.record_message_received(std::time::Duration::from_millis(1));
    }

    #[test]
    fn test_gauge_replacement_swaps_callback() {
        let meter = meter();
        let first = meter
            .create_gauge(&descriptors::ACTOR_MAILBOX_LENGTH, Arc::new(|| 1))
            .unwrap();
        let second = meter
            .create_gauge(&descriptors::ACTOR_MAILBOX_LENGTH, Arc::new(|| 2))
            .unwrap();

        assert_eq!(first.observe(), 2);
        assert_eq!(second.observe(), 2);
    }
}
