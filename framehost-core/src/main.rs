//! framehost: run a guest module's frame loop from the command line.
//!
//! Usage: `framehost <guest.wasm|guest.wat> [--config FILE] [--frames N] [--width W] [--height H]`
//!
//! Logging follows `RUST_LOG` (default `info`); guest log lines use target `guest`.

use anyhow::{Context, Result, anyhow, bail};
use framehost_core::{Bridge, FrameScheduler, HostConfig, IntervalPacer, ModuleSource};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

struct Args {
    guest: PathBuf,
    config: Option<PathBuf>,
    frames: Option<u64>,
    width: Option<i32>,
    height: Option<i32>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut guest = None;
        let mut parsed = Args {
            guest: PathBuf::new(),
            config: None,
            frames: None,
            width: None,
            height: None,
        };

        while let Some(arg) = args.next() {
            let mut value = |flag: &str| {
                args.next()
                    .ok_or_else(|| anyhow!("{flag} expects a value"))
            };
            match arg.as_str() {
                "--config" => parsed.config = Some(value("--config")?.into()),
                "--frames" => parsed.frames = Some(value("--frames")?.parse().context("--frames")?),
                "--width" => parsed.width = Some(value("--width")?.parse().context("--width")?),
                "--height" => parsed.height = Some(value("--height")?.parse().context("--height")?),
                flag if flag.starts_with("--") => bail!("unknown option {flag}"),
                path if guest.is_none() => guest = Some(PathBuf::from(path)),
                extra => bail!("unexpected argument {extra}"),
            }
        }

        parsed.guest = guest.ok_or_else(|| {
            anyhow!("usage: framehost <guest.wasm|guest.wat> [--config FILE] [--frames N] [--width W] [--height H]")
        })?;
        Ok(parsed)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse(std::env::args().skip(1))?;

    let mut config = match &args.config {
        Some(path) => HostConfig::from_json_file(path)?,
        None => HostConfig::default(),
    };
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }

    let bridge = Bridge::new(ModuleSource::File(args.guest), config);
    let mut api = bridge.ready().await.context("guest failed to boot")?;

    let config = bridge.config();
    api.init(config.width, config.height)?;
    api.cls(0)?;

    let (pacer, stop) = IntervalPacer::new(config.frame_rate);
    let mut pacer = match args.frames {
        Some(frames) => pacer.with_frame_limit(frames),
        None => pacer,
    };

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted; stopping after the current frame");
            stop.stop();
        }
    });

    let mut scheduler = FrameScheduler::new();
    let ticks = scheduler.run(&mut api, &mut pacer).await?;
    tracing::info!(ticks, "frame loop finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_guest_and_options() {
        let args = parse(&["game.wat", "--frames", "10", "--width", "320"]).unwrap();
        assert_eq!(args.guest, PathBuf::from("game.wat"));
        assert_eq!(args.frames, Some(10));
        assert_eq!(args.width, Some(320));
        assert_eq!(args.height, None);
        assert!(args.config.is_none());
    }

    #[test]
    fn rejects_missing_guest_and_unknown_flags() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["game.wasm", "--fast"]).is_err());
        assert!(parse(&["game.wasm", "--frames"]).is_err());
    }
}
