// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::snapshot::{HistogramSummary, MeterSnapshot};
use crate::error::{BackendError, Result};
use crate::instrument::{
    CounterInstrument, GaugeCallback, GaugeInstrument, HistogramInstrument, InstrumentDescriptor,
};
use crate::meter::Meter;

/// Lock-free counter storage.
#[derive(Debug, Default)]
struct MemoryCounter(AtomicU64);

impl CounterInstrument for MemoryCounter {
    #[inline]
    fn add(&self, delta: u64) {
        // Saturating add to prevent wraparound
        let _ = self
            .0
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_add(delta))
            });
    }
}

struct MemoryHistogram<T>(Mutex<Vec<T>>);

impl<T> Default for MemoryHistogram<T> {
    fn default() -> Self {
        Self(Mutex::new(Vec::new()))
    }
}

impl<T: Send> HistogramInstrument<T> for MemoryHistogram<T> {
    fn record(&self, value: T) {
        self.0.lock().push(value);
    }
}

// Shared by every handle created under one gauge name.
type GaugeSlot = Arc<Mutex<GaugeCallback>>;

struct MemoryGauge(GaugeSlot);

impl GaugeInstrument for MemoryGauge {
    fn observe(&self) -> i64 {
        let read = self.0.lock().clone();
        read()
    }
}

#[derive(Default)]
struct State {
    requests: Vec<&'static str>,
    fail: HashSet<&'static str>,
    fail_all: bool,
    counters: BTreeMap<&'static str, Arc<MemoryCounter>>,
    f64_histograms: BTreeMap<&'static str, Arc<MemoryHistogram<f64>>>,
    u64_histograms: BTreeMap<&'static str, Arc<MemoryHistogram<u64>>>,
    gauges: BTreeMap<&'static str, GaugeSlot>,
}

impl State {
    fn admit(&mut self, descriptor: &InstrumentDescriptor) -> Result<()> {
        self.requests.push(descriptor.name);

        if self.fail_all || self.fail.contains(descriptor.name) {
            return Err(BackendError::Unavailable {
                details: format!("injected failure for '{}'", descriptor.name),
            });
        }
        Ok(())
    }

    fn reject_duplicate(&self, name: &'static str) -> Result<()> {
        if self.counters.contains_key(name)
            || self.f64_histograms.contains_key(name)
            || self.u64_histograms.contains_key(name)
            || self.gauges.contains_key(name)
        {
            return Err(BackendError::DuplicateName {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

/// A [`Meter`] that stores every observation in memory.
///
/// Clones share the same storage, so a test can keep one clone for assertions while
/// the registry holds handles created from another.
#[derive(Clone, Default)]
pub struct InMemoryMeter {
    state: Arc<Mutex<State>>,
}

impl InMemoryMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later creation request for `name` fail.
    pub fn fail_on(&self, name: &'static str) {
        self.state.lock().fail.insert(name);
    }

    /// Makes every later creation request fail.
    pub fn fail_all(&self) {
        self.state.lock().fail_all = true;
    }

    /// Clears all injected failures.
    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.fail.clear();
        state.fail_all = false;
    }

    /// Names of all creation requests received so far, in order.
    pub fn requests(&self) -> Vec<&'static str> {
        self.state.lock().requests.clone()
    }

    pub fn counter_value(&self, name: &str) -> Option<u64> {
        self.state
            .lock()
            .counters
            .get(name)
            .map(|counter| counter.0.load(Ordering::Relaxed))
    }

    pub fn f64_histogram(&self, name: &str) -> Option<Vec<f64>> {
        let histogram = self.state.lock().f64_histograms.get(name).cloned()?;
        let values = histogram.0.lock().clone();
        Some(values)
    }

    pub fn u64_histogram(&self, name: &str) -> Option<Vec<u64>> {
        let histogram = self.state.lock().u64_histograms.get(name).cloned()?;
        let values = histogram.0.lock().clone();
        Some(values)
    }

    /// Polls the gauge registered under `name`, as an exporter would.
    pub fn poll_gauge(&self, name: &str) -> Option<i64> {
        // Callbacks run without holding the state lock.
        let slot = self.state.lock().gauges.get(name).cloned()?;
        let read = slot.lock().clone();
        Some(read())
    }

    /// Takes a snapshot of every instrument, polling all gauges.
    pub fn snapshot(&self) -> MeterSnapshot {
        let (counters, f64_histograms, u64_histograms, gauges) = {
            let state = self.state.lock();
            (
                state.counters.clone(),
                state.f64_histograms.clone(),
                state.u64_histograms.clone(),
                state.gauges.clone(),
            )
        };

        let mut snapshot = MeterSnapshot::default();
        for (name, counter) in counters {
            snapshot
                .counters
                .insert(name, counter.0.load(Ordering::Relaxed));
        }
        for (name, histogram) in f64_histograms {
            let values = histogram.0.lock();
            snapshot
                .histograms
                .insert(name, HistogramSummary::from_values(values.iter().copied()));
        }
        for (name, histogram) in u64_histograms {
            let values = histogram.0.lock();
            snapshot.histograms.insert(
                name,
                HistogramSummary::from_values(values.iter().map(|&v| v as f64)),
            );
        }
        for (name, slot) in gauges {
            let read = slot.lock().clone();
            snapshot.gauges.insert(name, read());
        }
        snapshot
    }
}

impl fmt::Debug for InMemoryMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("InMemoryMeter")
            .field("requests", &state.requests.len())
            .field("counters", &state.counters.len())
            .field(
                "histograms",
                &(state.f64_histograms.len() + state.u64_histograms.len()),
            )
            .field("gauges", &state.gauges.len())
            .finish()
    }
}

impl Meter for InMemoryMeter {
    fn create_counter(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn CounterInstrument>> {
        let mut state = self.state.lock();
        state.admit(descriptor)?;
        state.reject_duplicate(descriptor.name)?;

        let counter = Arc::new(MemoryCounter::default());
        state.counters.insert(descriptor.name, counter.clone());
        Ok(counter)
    }

    fn create_f64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<f64>>> {
        let mut state = self.state.lock();
        state.admit(descriptor)?;
        state.reject_duplicate(descriptor.name)?;

        let histogram = Arc::new(MemoryHistogram::default());
        state.f64_histograms.insert(descriptor.name, histogram.clone());
        Ok(histogram)
    }

    fn create_u64_histogram(
        &self,
        descriptor: &InstrumentDescriptor,
    ) -> Result<Arc<dyn HistogramInstrument<u64>>> {
        let mut state = self.state.lock();
        state.admit(descriptor)?;
        state.reject_duplicate(descriptor.name)?;

        let histogram = Arc::new(MemoryHistogram::default());
        state.u64_histograms.insert(descriptor.name, histogram.clone());
        Ok(histogram)
    }

    fn create_gauge(
        &self,
        descriptor: &InstrumentDescriptor,
        callback: GaugeCallback,
    ) -> Result<Arc<dyn GaugeInstrument>> {
        let mut state = self.state.lock();
        state.admit(descriptor)?;
        if let Some(slot) = state.gauges.get(descriptor.name) {
            *slot.lock() = callback;
            return Ok(Arc::new(MemoryGauge(slot.clone())));
        }
        state.reject_duplicate(descriptor.name)?;

        let slot: GaugeSlot = Arc::new(Mutex::new(callback));
        state.gauges.insert(descriptor.name, slot.clone());
        Ok(Arc::new(MemoryGauge(slot)))
    }
}
