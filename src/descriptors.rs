// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

//! Names, descriptions and units of every instrument the registry owns.
//!
//! The `name` strings are the contract with exporters and dashboards and must never change.

use crate::instrument::{InstrumentDescriptor, InstrumentKind, Unit};

pub const ACTOR_FAILURE_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "ActorFailureCount",
    name: "protoactor_actor_failure_count",
    description: "Number of actor failures",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

pub const ACTOR_MAILBOX_LENGTH: InstrumentDescriptor = InstrumentDescriptor {
    field: "ActorMailboxLength",
    name: "protoactor_actor_mailbox_length",
    description: "Actor's mailbox length",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Gauge,
};

pub const ACTOR_MESSAGE_RECEIVE_HISTOGRAM: InstrumentDescriptor = InstrumentDescriptor {
    field: "ActorMessageReceiveHistogram",
    name: "protoactor_actor_message_receive_duration_seconds",
    description: "Actor's messages received duration in seconds",
    unit: None,
    kind: InstrumentKind::F64Histogram,
};

pub const ACTOR_RESTARTED_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "ActorRestartedCount",
    name: "protoactor_actor_restarted_count",
    description: "Number of actors restarts",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

pub const ACTOR_STOPPED_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "ActorStoppedCount",
    name: "protoactor_actor_stopped_count",
    description: "Number of actors stopped",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

pub const ACTOR_SPAWN_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "ActorSpawnCount",
    name: "protoactor_actor_spawn_count",
    description: "Number of actors spawn",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

pub const DEAD_LETTER_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "DeadLetterCount",
    name: "protoactor_deadletter_count",
    description: "Number of deadletters",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

pub const FUTURES_COMPLETED_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "FuturesCompletedCount",
    name: "protoactor_futures_completed_count",
    description: "Number of futures completed",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

pub const FUTURES_STARTED_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "FuturesStartedCount",
    name: "protoactor_futures_started_count",
    description: "Number of futures started",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

pub const FUTURES_TIMED_OUT_COUNT: InstrumentDescriptor = InstrumentDescriptor {
    field: "FuturesTimedOutCount",
    name: "protoactor_futures_timed_out_count",
    description: "Number of futures timed out",
    unit: Some(Unit::Dimensionless),
    kind: InstrumentKind::Counter,
};

// Name says seconds, unit says milliseconds. Both are kept as published.
pub const THREAD_POOL_LATENCY: InstrumentDescriptor = InstrumentDescriptor {
    field: "ThreadPoolLatency",
    name: "protoactor_thread_pool_latency_duration_seconds",
    description: "History of latency in second",
    unit: Some(Unit::Milliseconds),
    kind: InstrumentKind::U64Histogram,
};

/// Every instrument in creation order.
pub static ALL: [InstrumentDescriptor; 11] = [
    ACTOR_FAILURE_COUNT,
    ACTOR_MAILBOX_LENGTH,
    ACTOR_MESSAGE_RECEIVE_HISTOGRAM,
    ACTOR_RESTARTED_COUNT,
    ACTOR_STOPPED_COUNT,
    ACTOR_SPAWN_COUNT,
    DEAD_LETTER_COUNT,
    FUTURES_COMPLETED_COUNT,
    FUTURES_STARTED_COUNT,
    FUTURES_TIMED_OUT_COUNT,
    THREAD_POOL_LATENCY,
];

/// Looks up a descriptor by its wire name.
pub fn by_name(name: &str) -> Option<&'static InstrumentDescriptor> {
    ALL.iter().find(|descriptor| descriptor.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = ALL.iter().map(|d| d.name).collect();
        let fields: HashSet<_> = ALL.iter().map(|d| d.field).collect();

        assert_eq!(names.len(), ALL.len());
        assert_eq!(fields.len(), ALL.len());
    }

    #[test]
    fn test_names_are_prefixed_snake_case() {
        for descriptor in ALL.iter() {
            assert!(
                descriptor.name.starts_with("protoactor_"),
                "{} is missing the library prefix",
                descriptor.name
            );
            assert!(
                descriptor
                    .name
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "{} is not lowercase snake case",
                descriptor.name
            );
        }
    }

    #[test]
    fn test_thread_pool_latency_keeps_published_unit() {
        assert_eq!(THREAD_POOL_LATENCY.unit, Some(Unit::Milliseconds));
        assert!(THREAD_POOL_LATENCY.name.ends_with("_seconds"));
        assert_eq!(ACTOR_MESSAGE_RECEIVE_HISTOGRAM.unit, None);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(
            by_name("protoactor_deadletter_count").map(|d| d.field),
            Some("DeadLetterCount")
        );
        assert!(by_name("protoactor_unknown").is_none());
    }
}
