// SPDX-License-Identifier: MIT OR Apache-2.0
//! `OrdoPlay` path runner - headless boss pattern playback
//!
//! Loads a runner settings file and a pattern library, drives a path mover
//! at a fixed tick rate and prints the body trajectory as JSON lines on
//! stdout. Logs go to stderr.
//!
//! ```text
//! ordoplay_path_runner [runner.ron]
//! ordoplay_path_runner --init [runner.ron]
//! ```
//!
//! Without an argument, `runner.ron` in the working directory is used when
//! present; otherwise the built-in defaults play the bundled patterns.
//! `--init` writes the default settings to a file and exits.

mod settings;
mod sim;

use ordoplay_path_sequencer::PatternLibrary;
use settings::{RunnerError, RunnerSettings, BUNDLED_ASSETS_DIR, RUNNER_FILE_NAME};
use sim::Simulation;
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ordoplay_path_runner=info,ordoplay_path_sequencer=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting OrdoPlay path runner v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run() {
        tracing::error!("Runner failed: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), RunnerError> {
    let mut args = std::env::args_os().skip(1);
    let first = args.next();

    if first.as_deref() == Some(std::ffi::OsStr::new("--init")) {
        let path = args.next().map_or_else(|| PathBuf::from(RUNNER_FILE_NAME), PathBuf::from);
        RunnerSettings::default().save(&path)?;
        tracing::info!(path = %path.display(), "Wrote default runner settings");
        return Ok(());
    }

    let settings = match first.map(PathBuf::from) {
        Some(path) => RunnerSettings::load(&path)?,
        None => {
            let path = PathBuf::from(RUNNER_FILE_NAME);
            if path.exists() {
                RunnerSettings::load(&path)?
            } else {
                tracing::info!("No {RUNNER_FILE_NAME} found, using defaults");
                let mut settings = RunnerSettings::default();
                settings.resolve_patterns_path(Path::new(BUNDLED_ASSETS_DIR));
                settings
            }
        }
    };

    let library = PatternLibrary::load(&settings.patterns_path)?;
    let simulation = Simulation::new(&settings, &library)?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    simulation.run(&mut out)?;

    std::io::Write::flush(&mut out)?;
    Ok(())
}
