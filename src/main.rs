// Copyright 2026 channel-recorder contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::{bail, Result};
use bytes::Bytes;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use channel_recorder::config::ConfigLoader;
use channel_recorder::{
    load_config_with_env, ChannelDescriptor, InProcessBus, LogFactory, Recorder, RecorderConfig,
    RecorderOptions,
};

/// Channel Recorder - capture pub/sub channels to an append-only record log
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Output record file (overrides config file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Record every discovered channel
    #[arg(short, long)]
    all: bool,

    /// Channel to record; may be given multiple times
    #[arg(short = 'C', long = "channel")]
    channels: Vec<String>,

    /// Publish synthetic demo channels so the capture path can be
    /// exercised end-to-end without an external system
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file; fall back to defaults when the
    // default config file is absent
    let mut recorder_config = if args.config.exists() {
        load_config_with_env(&args.config)?
    } else if args.config == PathBuf::from("config/default.yaml") {
        RecorderConfig::default()
    } else {
        bail!("config file not found: {}", args.config.display());
    };

    // Apply CLI overrides
    if let Some(output) = args.output {
        recorder_config.storage.path = output;
    }
    if args.all {
        recorder_config.recording.all_channels = true;
    }
    if !args.channels.is_empty() {
        recorder_config.recording.channels = args.channels;
    }
    ConfigLoader::validate(&recorder_config)?;

    if !recorder_config.recording.all_channels && recorder_config.recording.channels.is_empty() {
        bail!("nothing to record: pass --all or name channels with --channel");
    }

    // Initialize tracing with configured level
    let log_level = match recorder_config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Channel Recorder");
    info!("Storage backend: {}", recorder_config.storage.backend);
    info!("Output: {}", recorder_config.storage.path.display());

    let bus = InProcessBus::new();
    let log = LogFactory::create(&recorder_config.storage)?;
    let recorder = Recorder::new(
        RecorderOptions {
            scope: recorder_config.recording.scope(),
            pending_queue_size: recorder_config.recording.pending_queue_size,
        },
        log,
        Arc::new(bus.clone()),
        Arc::new(bus.clone()),
    );

    recorder.start().await?;

    let mut demo_tasks = Vec::new();
    if args.demo {
        demo_tasks = spawn_demo_publishers(&bus);
        info!("Demo publishers running; press Ctrl+C to stop");
    } else {
        info!("Recording; press Ctrl+C to stop");
    }

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down");

    for task in demo_tasks {
        task.abort();
    }
    recorder.stop()?;

    let stats = recorder.stats();
    info!(
        "Recorded {} channels, {} messages, {} bytes",
        stats.channels, stats.messages, stats.bytes
    );

    Ok(())
}

/// Advertise a couple of synthetic channels and publish heartbeats on
/// them at a steady rate.
fn spawn_demo_publishers(bus: &InProcessBus) -> Vec<tokio::task::JoinHandle<()>> {
    const DEMO_CHANNELS: [(&str, &str); 2] =
        [("chassis", "demo.ChassisMsg"), ("pose", "demo.PoseMsg")];

    DEMO_CHANNELS
        .iter()
        .map(|(name, message_type)| {
            let publisher = bus.advertise(ChannelDescriptor::new(
                *name,
                *message_type,
                format!("schema:{message_type}").into_bytes(),
            ));
            let channel = name.to_string();
            tokio::spawn(async move {
                let mut seq = 0u64;
                let mut tick = tokio::time::interval(Duration::from_millis(100));
                loop {
                    tick.tick().await;
                    publisher.publish(Bytes::from(format!("{channel} #{seq}")));
                    seq += 1;
                }
            })
        })
        .collect()
}
