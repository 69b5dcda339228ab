// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

//! Instrument descriptors and handles.
//!
//! A backend hands out `Arc<dyn ...Instrument>` objects. The registry wraps each of them
//! in a handle ([`Counter`], [`Histogram`], [`Gauge`]) whose zero value is a no-op, so
//! callers record without ever checking whether creation succeeded.

use std::fmt;
use std::sync::Arc;

/// The shape of an instrument as requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    /// Monotonic `u64` counter.
    Counter,
    /// Pull-based `i64` gauge read through a callback.
    Gauge,
    /// Distribution of `f64` values.
    F64Histogram,
    /// Distribution of `u64` values.
    U64Histogram,
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstrumentKind::Counter => write!(f, "counter"),
            InstrumentKind::Gauge => write!(f, "gauge"),
            InstrumentKind::F64Histogram => write!(f, "f64 histogram"),
            InstrumentKind::U64Histogram => write!(f, "u64 histogram"),
        }
    }
}

/// Unit attached to an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Unit {
    /// A plain count, rendered as `1`.
    Dimensionless,
    /// Milliseconds, rendered as `ms`.
    Milliseconds,
    /// Seconds, rendered as `s`.
    Seconds,
}

impl Unit {
    /// UCUM symbol understood by OpenTelemetry-style backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Dimensionless => "1",
            Unit::Milliseconds => "ms",
            Unit::Seconds => "s",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a backend needs to register one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentDescriptor {
    /// Registry field name, used only for error context (`ActorSpawnCount`).
    pub field: &'static str,
    /// Wire name seen by exporters and dashboards (`protoactor_actor_spawn_count`).
    pub name: &'static str,
    /// Human-readable description shown by exporters.
    pub description: &'static str,
    /// `None` leaves the unit to the backend's convention.
    pub unit: Option<Unit>,
    /// Which backend creation method the descriptor is meant for.
    pub kind: InstrumentKind,
}

/// Backend side of a counter.
pub trait CounterInstrument: Send + Sync {
    fn add(&self, delta: u64);
}

/// Backend side of a histogram recording values of type `T`.
pub trait HistogramInstrument<T>: Send + Sync {
    fn record(&self, value: T);
}

/// Backend side of a pull-based gauge.
///
/// The backend polls the reading function on its own schedule; `observe` exposes the
/// same reading so the runtime can inspect the current value directly.
pub trait GaugeInstrument: Send + Sync {
    fn observe(&self) -> i64;
}

/// Reading function behind a gauge.
pub type GaugeCallback = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Monotonic counter handle. The default value is a no-op.
#[derive(Clone, Default)]
pub struct Counter {
    inner: Option<Arc<dyn CounterInstrument>>,
}

impl Counter {
    pub fn new(inner: Arc<dyn CounterInstrument>) -> Self {
        Self { inner: Some(inner) }
    }

    /// A handle that discards every increment.
    pub fn noop() -> Self {
        Self::default()
    }

    /// Returns `true` when the backend failed to create this instrument.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    #[inline]
    pub fn add(&self, delta: u64) {
        if let Some(inner) = &self.inner {
            inner.add(delta);
        }
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Histogram handle. The default value is a no-op.
pub struct Histogram<T> {
    inner: Option<Arc<dyn HistogramInstrument<T>>>,
}

impl<T> Histogram<T> {
    pub fn new(inner: Arc<dyn HistogramInstrument<T>>) -> Self {
        Self { inner: Some(inner) }
    }

    /// A handle that discards every value.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Returns `true` when the backend failed to create this instrument.
    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    #[inline]
    pub fn record(&self, value: T) {
        if let Some(inner) = &self.inner {
            inner.record(value);
        }
    }
}

impl<T> Clone for Histogram<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Histogram<T> {
    fn default() -> Self {
        Self::noop()
    }
}

impl<T> fmt::Debug for Histogram<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("value_type", &std::any::type_name::<T>())
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// Gauge handle. The default value is unset and observes nothing.
#[derive(Clone, Default)]
pub struct Gauge {
    inner: Option<Arc<dyn GaugeInstrument>>,
}

impl Gauge {
    pub fn new(inner: Arc<dyn GaugeInstrument>) -> Self {
        Self { inner: Some(inner) }
    }

    pub fn noop() -> Self {
        Self::default()
    }

    pub fn is_noop(&self) -> bool {
        self.inner.is_none()
    }

    /// Reads the current value, or `None` for an unset gauge.
    pub fn observe(&self) -> Option<i64> {
        self.inner.as_ref().map(|inner| inner.observe())
    }

    /// Returns `true` if both handles point at the same backend instrument.
    pub fn same_instrument(&self, other: &Gauge) -> bool {
        match (&self.inner, &other.inner) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("noop", &self.is_noop())
            .finish()
    }
}
