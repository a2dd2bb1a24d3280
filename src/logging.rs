use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// 0 → warn, 1 → info, 2 → debug, 3+ → trace.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// `RUST_LOG` wins; otherwise dependencies stay at warn and this crate
/// follows the requested level.
fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!("warn,{}={level}", env!("CARGO_CRATE_NAME")))
    })
}

/// Installs the global subscriber. With `log_file`, lines are appended to
/// that file instead of stderr so they cannot tear a full-screen UI.
pub fn init(verbosity: u8, log_file: Option<&Path>) -> io::Result<()> {
    let filter = build_env_filter(level_for(verbosity));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(false),
                )
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_writer(io::stderr)
                        .with_target(false)
                        .without_time(),
                )
                .init();
        }
    }
    Ok(())
}
