// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use crate::error::Result;
use crate::instrument::{
    CounterInstrument, GaugeCallback, GaugeInstrument, HistogramInstrument, InstrumentDescriptor,
};

/// The metrics backend capability the registry is built against.
///
/// Each call registers one named instrument and either returns its backend handle or
/// a [`BackendError`](crate::BackendError). Implementations must be safe to share between
/// threads, and the handles they return must accept concurrent recordings.
///
/// # Example
///
/// ```rust
/// use protoactor_metrics::{ActorMetrics, NoopMeter};
///
/// let metrics = ActorMetrics::new(&NoopMeter);
/// metrics.record_actor_spawned();
/// ```
pub trait Meter: Send + Sync {
    fn create_counter(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn CounterInstrument>>;

    fn create_f64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<f64>>>;

    fn create_u64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<u64>>>;

    /// Registers a pull-based gauge. The backend owns `callback` and polls it.
    fn create_gauge(
        &self,
        descriptor: &InstrumentDescriptor,
        callback: GaugeCallback,
    ) -> Result<Arc<dyn GaugeInstrument>>;
}

impl<M: Meter + ?Sized> Meter for Arc<M> {
    fn create_counter(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn CounterInstrument>> {
        (**self).create_counter(descriptor)
    }

    fn create_f64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<f64>>> {
        (**self).create_f64_histogram(descriptor)
    }

    fn create_u64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<u64>>> {
        (**self).create_u64_histogram(descriptor)
    }

    fn create_gauge(
        &self,
        descriptor: &InstrumentDescriptor,
        callback: GaugeCallback,
    ) -> Result<Arc<dyn GaugeInstrument>> {
        (**self).create_gauge(descriptor, callback)
    }
}

/// A backend that accepts every registration and drops every value.
///
/// Gauges still answer `observe` through their callback, so the runtime can read
/// mailbox length even when nothing is exported.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMeter;

struct Discard;

impl CounterInstrument for Discard {
    fn add(&self, _delta: u64) {}
}

impl<T> HistogramInstrument<T> for Discard {
    fn record(&self, _value: T) {}
}

struct CallbackGauge(GaugeCallback);

impl GaugeInstrument for CallbackGauge {
    fn observe(&self) -> i64 {
        (self.0)()
    }
}

impl Meter for NoopMeter {
    fn create_counter(&self, _: &InstrumentDescriptor) -> Result<Arc<dyn CounterInstrument>> {
        Ok(Arc::new(Discard))
    }

    fn create_f64_histogram(
        &self,
        _: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<f64>>> {
        Ok(Arc::new(Discard))
    }

    fn create_u64_histogram(
        &self,
        _: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<u64>>> {
        Ok(Arc::new(Discard))
    }

    fn create_gauge(
        &self,
        _: &InstrumentDescriptor,
        callback: GaugeCallback,
    ) -> Result<Arc<dyn GaugeInstrument>> {
        Ok(Arc::new(CallbackGauge(callback)))
    }
}
