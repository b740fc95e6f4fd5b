use std::path::Path;

use neural_style::StyleTransferError;
use tracing_core::{Level, LevelFilter, Metadata};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{Layer, registry};

/// Install the global subscriber: human readable logs on stderr and, optionally, a plain
/// copy in `file_path`. Records emitted through `log` are forwarded as well.
pub fn install_logger(file_path: Option<&Path>) -> Result<(), StyleTransferError> {
    let stderr = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(LevelFilter::INFO)
        .with_filter(filter_fn(not_wgpu_chatter));

    let file = match file_path {
        Some(path) => {
            let file_name = path.file_name().ok_or_else(|| {
                StyleTransferError::Configuration(format!(
                    "log file path '{}' does not point to a file",
                    path.display()
                ))
            })?;
            let writer = tracing_appender::rolling::never(
                path.parent().unwrap_or_else(|| Path::new(".")),
                file_name,
            );
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(LevelFilter::INFO)
                .with_filter(filter_fn(not_wgpu_chatter));
            Some(layer)
        }
        None => None,
    };

    // Already installed by an embedding process: keep theirs.
    let _ = registry().with(stderr).with(file).try_init();

    Ok(())
}

// The wgpu crate is logging too much, so we skip its `info` level.
fn not_wgpu_chatter(metadata: &Metadata<'_>) -> bool {
    match metadata.module_path() {
        Some(path) => !(path.starts_with("wgpu") && *metadata.level() >= Level::INFO),
        None => true,
    }
}
