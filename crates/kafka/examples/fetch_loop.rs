use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use kafka_lowlevel::{new_client, FetchConfig, OffsetMarker, StaticCoordinator};

/// Example demonstrating a single-partition fetch loop with offset recovery
///
/// This example shows how to:
/// 1. Build a fetch client for the configured backend
/// 2. Start at the earliest available offset
/// 3. Fetch repeatedly, advancing past the last record received
/// 4. Recover from an out-of-range offset by jumping to the latest offset
///
/// To run this example:
/// 1. Start Kafka with Docker
///   docker run -d --name kafka -p 9092:9092 apache/kafka:3.9.0
/// 2. Run the example (`--backend rdkafka` for the librdkafka backend)
///   cargo run --example fetch_loop -- --topic user-events
#[derive(Parser)]
struct Args {
    /// Comma-separated broker list
    #[clap(long, env = "KAFKA_BROKERS", default_value = "localhost:9092")]
    brokers: String,

    #[clap(long, default_value = "user-events")]
    topic: String,

    #[clap(long, default_value_t = 0)]
    partition: i32,

    #[clap(flatten)]
    fetch: FetchConfig,
}

fn main() {
    tracing_subscriber::fmt::init();

    if let Err(e) = run_main() {
        eprintln!("Error: {e:?}");
        std::process::exit(1);
    }
}

fn run_main() -> anyhow::Result<()> {
    let args = Args::parse();
    let coordinator = Arc::new(StaticCoordinator::parse(&args.brokers)?);

    let mut client = new_client(args.fetch, coordinator);
    client.initialize()?;
    println!("Using {client}");

    let mut offset =
        client.get_available_offset(&args.topic, args.partition, OffsetMarker::Smallest)?;

    loop {
        match client.fetch(&args.topic, args.partition, offset) {
            Ok(messages) if messages.is_empty() => thread::sleep(Duration::from_millis(500)),
            Ok(messages) => {
                for message in &messages {
                    println!(
                        "[{}:{}@{}] {}",
                        message.topic,
                        message.partition,
                        message.offset,
                        String::from_utf8_lossy(&message.value)
                    );
                }
                if let Some(last) = messages.last() {
                    offset = last.offset + 1;
                }
            }
            Err(e) if client.is_offset_out_of_range(&e) => {
                offset = client.get_available_offset(
                    &args.topic,
                    args.partition,
                    OffsetMarker::Largest,
                )?;
                println!("Offset out of range, resuming at {offset}");
            }
            Err(e) => {
                eprintln!("Fetch failed, retrying: {e}");
                thread::sleep(Duration::from_secs(1));
            }
        }
    }
}
