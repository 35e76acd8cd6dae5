//! Logging utilities with indicatif integration and an optional log file

use std::fs::{File, OpenOptions};
use std::io::{self, LineWriter, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use indicatif::MultiProgress;

/// ANSI color code and padded label for a log level.
fn level_style(level: log::Level, color: bool) -> (&'static str, &'static str, &'static str) {
    let label = match level {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN ",
        log::Level::Info => "INFO ",
        log::Level::Debug => "DEBUG",
        log::Level::Trace => "TRACE",
    };
    if !color {
        return ("", label, "");
    }
    let ansi = match level {
        log::Level::Error => "\x1b[31m",
        log::Level::Warn => "\x1b[33m",
        log::Level::Info => "\x1b[32m",
        log::Level::Debug => "\x1b[36m",
        log::Level::Trace => "\x1b[35m",
    };
    (ansi, label, "\x1b[0m")
}

/// Logging setup chosen by the CLI
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub quiet: bool,
    pub debug: bool,
    /// Also append every record (with timestamp) to this file
    pub file: Option<PathBuf>,
}

impl LogOptions {
    fn default_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

/// Logger that prints through indicatif MultiProgress to avoid mixing with
/// progress bars, and mirrors records into an optional log file.
///
/// Filtering follows `RUST_LOG` through the wrapped env_logger.
pub struct IndicatifLogger {
    inner: env_logger::Logger,
    multi: Option<MultiProgress>,
    file: Option<Mutex<LineWriter<File>>>,
}

impl IndicatifLogger {
    pub fn new(inner: env_logger::Logger, multi: Option<MultiProgress>, file: Option<File>) -> Self {
        Self {
            inner,
            multi,
            file: file.map(|f| Mutex::new(LineWriter::new(f))),
        }
    }
}

impl log::Log for IndicatifLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &log::Record) {
        if !self.inner.enabled(record.metadata()) {
            return;
        }
        match &self.multi {
            Some(multi) => {
                let (pre, label, post) = level_style(record.level(), true);
                let line = format!("[{pre}{label}{post}] {}", record.args());
                multi.suspend(|| eprintln!("{line}"));
            }
            None => {
                let (_, label, _) = level_style(record.level(), false);
                eprintln!("[{label}] {}", record.args());
            }
        }
        if let Some(file) = &self.file {
            let (_, label, _) = level_style(record.level(), false);
            let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            if let Ok(mut w) = file.lock() {
                let _ = writeln!(w, "{stamp} [{label}] {}: {}", record.target(), record.args());
            }
        }
    }

    fn flush(&self) {
        self.inner.flush();
        if let Some(file) = &self.file {
            if let Ok(mut w) = file.lock() {
                let _ = w.flush();
            }
        }
    }
}

/// Install the global logger.
///
/// With `multi` (TTY mode) log lines are printed above the progress bars.
/// Fails if the log file cannot be opened or a logger is already installed.
pub fn init_logging(opts: &LogOptions, multi: Option<&MultiProgress>) -> io::Result<()> {
    let logger = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(opts.default_level()),
    )
    .build();
    let max_level = logger.filter();

    let file = match &opts.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            Some(OpenOptions::new().create(true).append(true).open(path)?)
        }
        None => None,
    };

    log::set_boxed_logger(Box::new(IndicatifLogger::new(logger, multi.cloned(), file)))
        .map_err(io::Error::other)?;
    log::set_max_level(max_level);
    Ok(())
}
