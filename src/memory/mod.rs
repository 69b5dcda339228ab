// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

//! In-Memory Metrics Backend
//!
//! [`InMemoryMeter`] keeps every recorded value in process memory. It is the backend
//! used by this crate's tests and is handy for inspecting a runtime locally.
//!
//! # Behavior
//!
//! - **Duplicate names**: a second counter or histogram with an existing name is
//!   rejected with [`BackendError::DuplicateName`](crate::BackendError::DuplicateName),
//!   like a live backend would
//! - **Gauges**: keyed by name; registering a gauge again replaces the callback
//!   polled, and every handle created under that name reads the new callback
//! - **Failure injection**: [`InMemoryMeter::fail_on`] and [`InMemoryMeter::fail_all`]
//!   make selected creation requests fail
//! - **Request log**: every creation request is recorded in order, including failed ones
//!
//! # Example
//!
//! ```rust
//! use protoactor_metrics::memory::InMemoryMeter;
//! use protoactor_metrics::{descriptors, ActorMetrics};
//!
//! let meter = InMemoryMeter::new();
//! let metrics = ActorMetrics::new(&meter);
//!
//! metrics.record_actor_spawned();
//!
//! let snapshot = meter.snapshot();
//! assert_eq!(snapshot.counters[descriptors::ACTOR_SPAWN_COUNT.name], 1);
//! ```

mod meter;
mod snapshot;

pub use meter::InMemoryMeter;
pub use snapshot::{HistogramSummary, MeterSnapshot};
