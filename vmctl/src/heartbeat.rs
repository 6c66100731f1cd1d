//! Heartbeat status file.
//!
//! Each write replaces the whole file with the latest record. External
//! readers get no locking and may observe a partially written file.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use vmctl_core::HeartbeatRecord;

/// Errors raised while writing the heartbeat file.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HeartbeatError {
    /// The file could not be created or truncated.
    #[error("failed to open heartbeat file {path} for writing: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was opened but the record could not be written.
    #[error("failed to write heartbeat file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Writes [`HeartbeatRecord`]s to a fixed path.
#[derive(Debug, Clone)]
pub struct HeartbeatRecorder {
    path: PathBuf,
    enabled: bool,
}

impl HeartbeatRecorder {
    /// Recorder for `path`. A disabled recorder never touches the filesystem.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, enabled: bool) -> Self {
        Self { path: path.into(), enabled }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file contents with `record`.
    ///
    /// The file handle lives only for the duration of this call.
    ///
    /// # Errors
    /// Returns [`HeartbeatError`] if the file cannot be opened or written.
    pub async fn write(&self, record: &HeartbeatRecord) -> Result<(), HeartbeatError> {
        if !self.enabled {
            return Ok(());
        }

        let text = record.render();
        let mut file = tokio::fs::File::create(&self.path)
            .await
            .map_err(|source| HeartbeatError::Open { path: self.path.clone(), source })?;

        let written = async {
            file.write_all(text.as_bytes()).await?;
            file.flush().await
        };
        written
            .await
            .map_err(|source| HeartbeatError::Write { path: self.path.clone(), source })?;

        tracing::debug!(path = %self.path.display(), state = %record.state, "heartbeat written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use vmctl_core::{GuestVariable, PowerState};

    use super::*;

    fn tempdir() -> tempfile::TempDir {
        match tempfile::tempdir() {
            Ok(d) => d,
            Err(e) => panic!("tempdir: {e}"),
        }
    }

    fn read(path: &Path) -> String {
        match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => panic!("read {}: {e}", path.display()),
        }
    }

    #[tokio::test]
    async fn write_replaces_previous_contents() {
        let dir = tempdir();
        let recorder = HeartbeatRecorder::new(dir.path().join("heartbeat.log"), true);

        let running = HeartbeatRecord::new(
            PowerState::PoweredOn,
            vec![GuestVariable::new("ip", "10.0.0.5"), GuestVariable::new("status", "ready")],
        );
        assert!(recorder.write(&running).await.is_ok());
        assert!(read(recorder.path()).contains("ip = 10.0.0.5\n"));

        let stopped = HeartbeatRecord::new(PowerState::PoweredOff, Vec::new());
        assert!(recorder.write(&stopped).await.is_ok());
        let contents = read(recorder.path());
        assert!(contents.starts_with("date = "));
        assert!(contents.ends_with("state = STOPPED\n"));
        assert!(!contents.contains("ip ="), "previous record must be fully overwritten");
    }

    #[tokio::test]
    async fn same_record_writes_identical_bytes() {
        let dir = tempdir();
        let recorder = HeartbeatRecorder::new(dir.path().join("heartbeat.log"), true);
        let record = HeartbeatRecord::new(PowerState::PoweredOn, vec![GuestVariable::new("ip", "")]);

        assert!(recorder.write(&record).await.is_ok());
        let first = read(recorder.path());
        assert!(recorder.write(&record).await.is_ok());
        assert_eq!(first, read(recorder.path()));
    }

    #[tokio::test]
    async fn disabled_recorder_never_creates_file() {
        let dir = tempdir();
        let recorder = HeartbeatRecorder::new(dir.path().join("heartbeat.log"), false);
        let record = HeartbeatRecord::new(PowerState::PoweredOn, Vec::new());
        for _ in 0..3 {
            assert!(recorder.write(&record).await.is_ok());
        }
        assert!(!recorder.path().exists(), "disabled recorder must not write");
    }

    #[tokio::test]
    async fn unwritable_path_reports_open_error() {
        let dir = tempdir();
        let recorder = HeartbeatRecorder::new(dir.path().join("missing").join("heartbeat.log"), true);
        let record = HeartbeatRecord::new(PowerState::PoweredOff, Vec::new());
        assert!(matches!(
            recorder.write(&record).await,
            Err(HeartbeatError::Open { .. })
        ));
    }
}
