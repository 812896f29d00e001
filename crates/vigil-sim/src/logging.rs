//! Tracing setup shared by the binaries.
//!
//! Normal runs log INFO to stderr, leaving stdout to the sink. Debug runs log
//! every scored sample at DEBUG into a file.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;

pub const DEBUG_LOG_FILE: &str = "anomaly_detection_debug.log";

pub fn init_tracing(debug: bool) -> std::io::Result<()> {
    if debug {
        init_file_tracing(Path::new(DEBUG_LOG_FILE))
    } else {
        tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    }
}

pub fn init_file_tracing(path: &Path) -> std::io::Result<()> {
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}
