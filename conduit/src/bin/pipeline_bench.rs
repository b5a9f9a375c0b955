//! Bounded queue and pipeline throughput benchmark.
//!
//! Usage:
//!     cargo run --release --bin pipeline_bench
//!
//! Environment variables:
//!     ITEMS=1048576   Items moved per measurement (default: 2^20)
//!     CAPACITY=1024   Queue capacity (default: 1024)
//!     PRODUCER_CPU=0  Pin producer to CPU 0 (default: 0)
//!     CONSUMER_CPU=2  Pin consumer to CPU 2 (default: 2)

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use minstant::Instant;

use conduit::placement::{CpuConfig, pin_to_core};
use conduit::{BoundedQueue, Pipeline, PipelineConfig};

const DEFAULT_ITEMS: usize = 1 << 20;
const DEFAULT_CAPACITY: usize = 1024;

type Payload = u64;

struct BenchConfig {
    items: usize,
    capacity: usize,
    producer_cpu: Option<usize>,
    consumer_cpu: Option<usize>,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn load_config() -> BenchConfig {
    BenchConfig {
        items: env_or("ITEMS", DEFAULT_ITEMS),
        capacity: env_or("CAPACITY", DEFAULT_CAPACITY),
        producer_cpu: Some(env_or("PRODUCER_CPU", 0)),
        consumer_cpu: Some(env_or("CONSUMER_CPU", 2)),
    }
}

fn pin(cpu: Option<usize>) {
    if let Some(id) = cpu
        && !pin_to_core(id)
    {
        eprintln!("warning: could not pin to CPU {id}");
    }
}

fn report(label: &str, items: usize, elapsed: std::time::Duration) {
    let ops_per_ms = items as u128 * 1_000_000 / elapsed.as_nanos().max(1);
    println!("{label}: {ops_per_ms} ops/ms");
}

fn bench_queue(config: &BenchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let queue = Arc::new(BoundedQueue::<Payload>::new(config.capacity)?);
    let ready = Arc::new(AtomicBool::new(false));
    let items = config.items as Payload;

    let consumer_thread = {
        let queue = Arc::clone(&queue);
        let ready = Arc::clone(&ready);
        let consumer_cpu = config.consumer_cpu;
        thread::spawn(move || {
            pin(consumer_cpu);
            ready.store(true, Ordering::Release);

            for expected in 0..items {
                let value = queue.get();
                assert_eq!(value, expected, "data corruption");
            }
        })
    };

    while !ready.load(Ordering::Acquire) {
        std::hint::spin_loop();
    }

    pin(config.producer_cpu);

    let start = Instant::now();
    for i in 0..items {
        queue.put(i);
    }
    consumer_thread
        .join()
        .map_err(|_| "consumer thread panicked")?;

    report("queue", config.items, start.elapsed());
    Ok(())
}

fn bench_pipeline(config: &BenchConfig) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(PipelineConfig {
        cpu: CpuConfig::Manual {
            producer_core: config.producer_cpu,
            consumer_core: config.consumer_cpu,
        },
        ..PipelineConfig::with_capacity(config.capacity)
    });
    let source: Vec<Payload> = (0..config.items as Payload).collect();

    let start = Instant::now();
    let output = pipeline.run(source)?;
    let elapsed = start.elapsed();

    if output.len() != config.items {
        return Err(format!("expected {} items, got {}", config.items, output.len()).into());
    }
    report("pipeline", config.items, elapsed);
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    conduit::init_tracing();
    let config = load_config();

    println!(
        "conduit bounded queue (capacity={}, items={}):",
        config.capacity, config.items
    );
    bench_queue(&config)?;
    bench_pipeline(&config)?;
    Ok(())
}
