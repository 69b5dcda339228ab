// Copyright 2022 Jeff Kim <hiking90@gmail.com>
// SPDX-License-Identifier: Apache-2.0

//! Registry Demo - Actor Runtime Telemetry
//!
//! This example drives an `ActorMetrics` registry the way an actor runtime would:
//! - Lifecycle events from several worker tasks
//! - Message processing time through `time_message_receive`
//! - A mailbox-length gauge polled from a shared depth counter
//! - A backend that refuses one instrument
//!
//! Run with: `RUST_LOG=debug cargo run --example registry_demo`

use protoactor_metrics::memory::InMemoryMeter;
use protoactor_metrics::{descriptors, ActorMetrics};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    println!("=== protoactor-metrics Registry Demo ===\n");

    let meter = InMemoryMeter::new();
    // Simulate a backend that rejects the dead-letter counter
    meter.fail_on(descriptors::DEAD_LETTER_COUNT.name);

    let metrics = Arc::new(ActorMetrics::builder().id("demo-node").build(&meter));
    println!("Degraded instruments: {:?}\n", metrics.degraded_instruments());

    let depth = Arc::new(AtomicI64::new(0));
    let polled = depth.clone();
    metrics.register_mailbox_length_source(&meter, move || polled.load(Ordering::Relaxed));

    let mut workers = Vec::new();
    for worker in 0..4u64 {
        let metrics = metrics.clone();
        let depth = depth.clone();
        workers.push(tokio::spawn(async move {
            metrics.record_actor_spawned();
            for message in 0..5u64 {
                depth.fetch_add(1, Ordering::Relaxed);
                {
                    let _timer = metrics.time_message_receive();
                    tokio::time::sleep(Duration::from_millis(worker + message)).await;
                }
                depth.fetch_sub(1, Ordering::Relaxed);
            }
            // Recorded, but dropped: the backend refused this counter
            metrics.record_dead_letter();
            metrics.record_actor_stopped();
        }));
    }

    for worker in workers {
        worker.await?;
    }

    let snapshot = meter.snapshot();
    println!("Counters:");
    for (name, value) in &snapshot.counters {
        println!("  {name}: {value}");
    }
    println!("Histograms:");
    for (name, summary) in &snapshot.histograms {
        println!(
            "  {name}: count={} mean={:.4} max={:.4}",
            summary.count,
            summary.mean(),
            summary.max
        );
    }
    println!("Gauges:");
    for (name, value) in &snapshot.gauges {
        println!("  {name}: {value}");
    }

    Ok(())
}
