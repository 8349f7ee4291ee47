//! Tracing setup for the edge node
//!
//! Events go to stderr and, when configured, are appended to a log file.

use crate::Result;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Open `path` for appending, creating parent directories as needed
pub fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

/// Plain-text fmt layer writing into `file`
pub fn file_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer().with_ansi(false).with_writer(Mutex::new(file))
}

/// Install the global subscriber: `RUST_LOG` filter (default `gk_edge=info`),
/// stderr output, plus the log file when one is given.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let file = log_file.map(open_log_file).transpose()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "gk_edge=info".into()))
        .with(fmt::layer())
        .with(file.map(|f| file_layer(f)))
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::info;

    #[test]
    fn test_open_log_file_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("nested").join("edge.log");

        open_log_file(&path).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn test_file_layer_appends_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edge.log");
        std::fs::write(&path, "previous run\n").unwrap();

        let file = open_log_file(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(file_layer(file));
        tracing::subscriber::with_default(subscriber, || {
            info!(plate = "AB1234", "Upload accepted");
        });

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("previous run\n"));
        assert!(written.contains("Upload accepted"));
        assert!(written.contains("plate=\"AB1234\""));
        assert!(!written.contains('\u{1b}'));
    }
}
