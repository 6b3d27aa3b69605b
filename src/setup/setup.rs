use std::fs::{self, File, OpenOptions};
use std::io::{self, Error, ErrorKind, Write};
use std::path::Path;

use slog::Drain;
use slog::Logger;
use slog_async::AsyncGuard;

use super::log_format::NodeFormat;

/// init_logger builds the root logger of a node.
/// Logs go to `path` in append mode, or to stderr if no path is given.
///
/// The returned guard flushes buffered records when dropped; keep it alive until exit.
pub fn init_logger(path: Option<&Path>) -> io::Result<(Logger, AsyncGuard)> {
    let (logger, guard) = match path {
        Some(p) => build_logger(open_log_file(p)?),
        None => build_logger(io::stderr()),
    };

    slog::info!(logger, "logger ready"; "to" => path.map(|p| p.display().to_string()).unwrap_or_else(|| "stderr".into()));
    Ok((logger, guard))
}

fn build_logger<W: Write + Send + 'static>(w: W) -> (Logger, AsyncGuard) {
    let decorator = slog_term::PlainDecorator::new(w);
    let drain = NodeFormat::new(decorator).fuse();
    let (drain, guard) = slog_async::Async::new(drain).build_with_guard();

    (Logger::root(drain.fuse(), slog::o!()), guard)
}

/// Opens log file with append mode. Creates a new log file if it doesn't exist.
fn open_log_file<P: AsRef<Path>>(path: P) -> io::Result<File> {
    let path = path.as_ref();
    let parent = path.parent().ok_or_else(|| {
        Error::new(
            ErrorKind::Other,
            "Unable to get parent directory of log file",
        )
    })?;
    if !parent.as_os_str().is_empty() && !parent.is_dir() {
        fs::create_dir_all(parent)?
    }
    OpenOptions::new().append(true).create(true).open(path)
}
