//! Logging and tracing configuration
//!
//! Logs go to stderr so stdout stays free for reports. When a log file is
//! configured, a second, more detailed layer writes there.

use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("ami_lifecycle=debug,info")
        } else {
            EnvFilter::new("ami_lifecycle=info,warn")
        }
    })
}

/// Initialize tracing for the CLI
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for
/// dependencies. With `log_file`, every block sent and received is also
/// written there at DEBUG level regardless of the console filter.
pub fn init_cli(verbose: bool, log_file: Option<&Path>) {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(default_filter(verbose));

    let file_layer = log_file.and_then(|path| {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
        {
            Ok(file) => Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(EnvFilter::new("ami_lifecycle=debug,info")),
            ),
            Err(e) => {
                eprintln!("Warning: Could not open log file {}: {}", path.display(), e);
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();
}
