// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

//! # protoactor-metrics: Runtime Telemetry for an Actor Runtime
//!
//! `protoactor-metrics` creates and names the instruments an actor runtime reports
//! into: actor lifecycle counters, mailbox length, message processing latency, dead
//! letters, future lifecycle and thread-pool latency.
//!
//! It does not aggregate or export anything itself. Instruments are created against
//! an injected [`Meter`], which hands them to whatever backend the process uses.
//!
//! ## Features
//!
//! - **Create once**: [`ActorMetrics::new`] requests each instrument exactly once.
//! - **Degrade, never crash**: an instrument the backend refuses is logged and left as
//!   a no-op handle. Callers record without checking.
//! - **Guarded gauge**: the mailbox-length gauge is installed after construction and
//!   is the only field behind a lock.
//! - **Stable names**: every metric name is fixed in [`descriptors`].
//!
//! ## Instruments
//!
//! | Name | Kind | Unit |
//! |------|------|------|
//! | `protoactor_actor_failure_count` | counter | `1` |
//! | `protoactor_actor_mailbox_length` | gauge | `1` |
//! | `protoactor_actor_message_receive_duration_seconds` | f64 histogram | unset (seconds) |
//! | `protoactor_actor_restarted_count` | counter | `1` |
//! | `protoactor_actor_spawn_count` | counter | `1` |
//! | `protoactor_actor_stopped_count` | counter | `1` |
//! | `protoactor_deadletter_count` | counter | `1` |
//! | `protoactor_futures_completed_count` | counter | `1` |
//! | `protoactor_futures_started_count` | counter | `1` |
//! | `protoactor_futures_timed_out_count` | counter | `1` |
//! | `protoactor_thread_pool_latency_duration_seconds` | u64 histogram | `ms` |
//!
//! ## Cargo Features
//!
//! - `tracing`: report creation failures through `tracing` with structured fields
//!   instead of `log`.
//! - `opentelemetry`: [`otel::OtelMeter`] and [`ActorMetrics::from_global`].
//!
//! ## Getting Started
//!
//! ```rust
//! use protoactor_metrics::memory::InMemoryMeter;
//! use protoactor_metrics::{descriptors, ActorMetrics};
//! use std::time::Duration;
//!
//! let meter = InMemoryMeter::new();
//! let metrics = ActorMetrics::new(&meter);
//!
//! // Runtime events
//! metrics.record_actor_spawned();
//! metrics.record_message_received(Duration::from_millis(12));
//!
//! // Mailbox length is pulled by the backend
//! metrics.register_mailbox_length_source(&meter, || 4);
//!
//! assert_eq!(meter.counter_value(descriptors::ACTOR_SPAWN_COUNT.name), Some(1));
//! assert_eq!(meter.poll_gauge(descriptors::ACTOR_MAILBOX_LENGTH.name), Some(4));
//! ```

mod actor_metrics;
pub mod descriptors;
mod error;
mod instrument;
pub mod memory;
mod meter;
#[cfg(feature = "opentelemetry")]
pub mod otel;

pub use actor_metrics::{
    log_creation_failure, ActorMetrics, ActorMetricsBuilder, ErrorHandler, ReceiveTimer,
};
pub use error::{BackendError, Error, Result};
pub use instrument::{
    Counter, CounterInstrument, Gauge, GaugeCallback, GaugeInstrument, Histogram,
    HistogramInstrument, InstrumentDescriptor, InstrumentKind, Unit,
};
pub use meter::{Meter, NoopMeter};

/// Name under which the meter is looked up and the prefix of every metric name.
pub const LIB_NAME: &str = "protoactor";
