use crate::config::Config;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initializes the global logger once; later calls are ignored.
///
/// The filter comes from `RUST_LOG` when set, `info` otherwise. With
/// `debug.log_to_file` the output is redirected to `debug.log_file`, which is
/// truncated and stamped with a header first.
pub fn init_logging(config: &Config) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder.filter_level(log::LevelFilter::Info);
        }

        let mut file_error = None;
        if config.debug.log_to_file {
            match open_log_file(&config.debug.log_file) {
                Ok(file) => {
                    builder.target(env_logger::Target::Pipe(Box::new(file)));
                }
                Err(e) => file_error = Some(e),
            }
        }

        // Another logger may already be installed (tests, host applications).
        if builder.try_init().is_err() {
            return;
        }

        if let Some(e) = file_error {
            log::warn!("Could not open log file {:?}: {}", config.debug.log_file, e);
        }
        log::debug!("logging initialized");
    });
}

fn open_log_file(path: &str) -> std::io::Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;

    writeln!(file, "=== hop log ===")?;
    writeln!(file, "Started: {:?}", std::time::SystemTime::now())?;
    writeln!(file)?;
    Ok(file)
}
