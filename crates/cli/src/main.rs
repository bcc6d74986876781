use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ffwatch_core::{
    load_config, validate_config, CancelToken, Config, ConfigError, FfmpegArgs, TranscodeJob,
    Transcoder,
};

const USAGE: &str = "usage: ffwatch <input> <output> [key=value|flag]...";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let job = parse_job(std::env::args().skip(1))?;

    let config_path = std::env::var("FFWATCH_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("ffwatch.toml"));

    let config = match load_config(&config_path) {
        Ok(config) => {
            info!("Loaded configuration from {:?}", config_path);
            config
        }
        Err(ConfigError::FileNotFound(_)) => {
            info!("No configuration at {:?}, using defaults", config_path);
            Config::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load config from {:?}", config_path))
        }
    };
    validate_config(&config).context("Configuration validation failed")?;

    let mut transcoder = Transcoder::new(config);
    transcoder
        .validate()
        .await
        .context("FFmpeg tooling is not usable")?;

    let events = transcoder.events_mut();
    events.on_start(|source, output| async move {
        info!("Encoding {:?} -> {:?}", source, output);
    });
    events.on_progress(|update| async move {
        info!(
            frame = update.frame,
            bitrate_kbps = update.bitrate_kbps,
            "{:.0}% done, {:.1}s elapsed, {:.1}s remaining",
            update.percent(),
            update.elapsed.as_secs_f64(),
            update.remaining.as_secs_f64()
        );
    });
    events.on_end(|elapsed| async move {
        info!("Encoding finished in {:.1}s", elapsed.as_secs_f64());
    });

    let cancel = CancelToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling run");
            on_signal.cancel();
        }
    });

    let report = transcoder
        .run_with_cancel(job, &cancel)
        .await
        .context("Encoding failed")?;

    info!(
        frames = report.frames,
        "Wrote {:?} in {:.1}s",
        report.output,
        report.elapsed.as_secs_f64()
    );
    Ok(())
}

/// Builds a job from `<input> <output> [key=value|flag]...`.
fn parse_job(mut args: impl Iterator<Item = String>) -> Result<TranscodeJob> {
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        bail!(USAGE);
    };

    let options: FfmpegArgs = args
        .map(|token| match token.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (token.clone(), None),
        })
        .collect();

    Ok(TranscodeJob::new(input, output).with_args(options))
}
