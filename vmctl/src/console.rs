//! Timestamped user-facing output.
//!
//! Progress and outcomes go to stdout, failures to stderr, each line
//! prefixed with `[YYYY-MM-DD HH:MM:SS]`. Every line is mirrored as a
//! debug-level `tracing` event so diagnostics and console output share one
//! timeline when `VMCTL_LOG=debug`.

use std::fmt::Display;
use std::io::Write;
use std::sync::{Arc, Mutex};

use vmctl_core::timestamp;

/// Shared in-memory buffer used by [`Console::captured`].
pub type Buffer = Arc<Mutex<Vec<u8>>>;

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    Stderr,
    Buffer(Buffer),
}

impl Sink {
    fn write_line(&self, line: &str) {
        // Console output is best effort; a closed pipe must not abort the VM lifecycle.
        let _ = match self {
            Self::Stdout => writeln!(std::io::stdout().lock(), "{line}"),
            Self::Stderr => writeln!(std::io::stderr().lock(), "{line}"),
            Self::Buffer(buf) => match buf.lock() {
                Ok(mut bytes) => writeln!(bytes, "{line}"),
                Err(_) => Ok(()),
            },
        };
    }
}

/// Console writer threaded through every command handler.
#[derive(Debug, Clone)]
pub struct Console {
    out: Sink,
    err: Sink,
    report_soft_errors: bool,
}

/// Handles to the buffers of a captured console.
#[derive(Debug, Clone)]
pub struct Captured {
    out: Buffer,
    err: Buffer,
}

impl Captured {
    /// Everything written to the output stream so far.
    #[must_use]
    pub fn stdout(&self) -> String {
        read(&self.out)
    }

    /// Everything written to the error stream so far.
    #[must_use]
    pub fn stderr(&self) -> String {
        read(&self.err)
    }
}

fn read(buf: &Buffer) -> String {
    buf.lock()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

impl Console {
    /// Console bound to the process's stdout and stderr.
    #[must_use]
    pub fn stdio() -> Self {
        Self { out: Sink::Stdout, err: Sink::Stderr, report_soft_errors: true }
    }

    /// Console writing into memory, for tests.
    #[must_use]
    pub fn captured() -> (Self, Captured) {
        let out = Buffer::default();
        let err = Buffer::default();
        let console = Self {
            out: Sink::Buffer(Arc::clone(&out)),
            err: Sink::Buffer(Arc::clone(&err)),
            report_soft_errors: true,
        };
        (console, Captured { out, err })
    }

    /// Whether soft failures are printed (they are always traced).
    #[must_use]
    pub fn report_soft_errors(mut self, report: bool) -> Self {
        self.report_soft_errors = report;
        self
    }

    /// Progress or outcome message on stdout.
    pub fn info(&self, msg: impl Display) {
        tracing::debug!(stream = "stdout", "{msg}");
        self.out.write_line(&format!("[{}] {msg}", timestamp()));
    }

    /// Fatal or local failure on stderr.
    pub fn error(&self, msg: impl Display) {
        tracing::debug!(stream = "stderr", "{msg}");
        self.err.write_line(&format!("[{}] {msg}", timestamp()));
    }

    /// Soft failure on stderr, unless suppressed.
    pub fn soft(&self, msg: impl Display) {
        tracing::debug!(stream = "stderr", soft = true, "{msg}");
        if self.report_soft_errors {
            self.err.write_line(&format!("[{}] {msg}", timestamp()));
        }
    }

    /// Untimestamped text on stdout, e.g. usage.
    pub fn raw(&self, text: &str) {
        self.out.write_line(text.trim_end_matches('\n'));
    }
}
