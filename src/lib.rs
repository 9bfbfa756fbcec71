//! SEO Forge MCP proxy.
//!
//! Exposes the SEO Forge HTTP API as a set of validated tools. This crate handles:
//! - Tool catalogs and argument validation (`tools`)
//! - HTTP execution with retry and exponential backoff (`upstream`)
//! - The per-call dispatch state machine and response envelope (`dispatch`)
//! - The stdio JSON-RPC MCP server (`server`)
//! - Layered configuration (`config`)

pub mod config;
pub mod dispatch;
pub mod server;
pub mod tools;
pub mod upstream;

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Number of rotated log files kept next to the active one.
pub const LOG_FILES_KEPT: u32 = 3;

/// How the process logs.
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of the human format.
    pub json: bool,
    /// Log to this file (rotated on startup) instead of stderr.
    pub file: Option<PathBuf>,
}

/// Initialize the global tracing subscriber.
///
/// Logs never go to stdout: in `serve` mode stdout carries the JSON-RPC stream.
/// With a log file, existing logs are rotated (`x.log` → `x.log.1` … `.3`)
/// and a line-flushing writer is used.
pub fn init_tracing(options: &LogOptions) -> io::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&options.level))
        .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_LEVEL));

    let builder = fmt::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);

    let result = match &options.file {
        Some(path) => {
            let writer = open_log_file(path)?;
            if options.json {
                builder.json().with_writer(writer).with_ansi(false).try_init()
            } else {
                builder.with_writer(writer).with_ansi(false).try_init()
            }
        }
        None => {
            if options.json {
                builder.json().with_writer(std::io::stderr).try_init()
            } else {
                builder.with_writer(std::io::stderr).try_init()
            }
        }
    };
    result.map_err(|e| io::Error::other(format!("failed to install subscriber: {e}")))?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        log_file = ?options.file,
        pid = std::process::id(),
        "logging initialized"
    );
    Ok(())
}

fn open_log_file(path: &Path) -> io::Result<FlushingWriter> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    rotate_log_file(path, LOG_FILES_KEPT);

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(FlushingWriter::new(file))
}

/// Shift `path` to `path.1`, `path.1` to `path.2` and so on, keeping at most
/// `keep` old files. Gaps in the chain are tolerated.
pub fn rotate_log_file(path: &Path, keep: u32) {
    let numbered = |n: u32| PathBuf::from(format!("{}.{n}", path.display()));

    if keep == 0 {
        let _ = std::fs::remove_file(path);
        return;
    }

    let _ = std::fs::remove_file(numbered(keep));
    for n in (1..keep).rev() {
        let _ = std::fs::rename(numbered(n), numbered(n + 1));
    }
    if path.exists() {
        let _ = std::fs::rename(path, numbered(1));
    }
}

/// Shared log file handle that flushes on every write.
#[derive(Clone)]
struct FlushingWriter {
    file: Arc<Mutex<File>>,
}

impl FlushingWriter {
    fn new(file: File) -> Self {
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    fn locked(&self) -> io::Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|e| io::Error::other(format!("log file lock poisoned: {e}")))
    }
}

impl Write for FlushingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.locked()?;
        let written = file.write(buf)?;
        file.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.locked()?.flush()
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for FlushingWriter {
    type Writer = FlushingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
