use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use crate::domain::control_model::command::command_types::WrapCommandRef;
use crate::domain::control_model::command_manager::control_mode::ControlMode;
use crate::error::Result;

/// `tracing` target of command and scenario lifecycle events.
pub const AUDIT_TARGET: &str = "field_control_plane::audit";

/// Lifecycle event written as one CSV row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AuditEvent {
    Submitted,
    NoOp,
    Rejected,
    Cancelled,
    Achieved,
    Completed,
    Failed,
    ScenarioFinished,
}

/// One row of the audit file. Columns follow the field order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditRecord {
    /// Control-plane clock time in ms.
    pub time_ms: i64,
    pub event: AuditEvent,

    /// Wrap command type or "SCENARIO".
    pub subject_type: String,
    pub subject_id: String,
    pub control_mode: Option<String>,
    pub detail: Option<String>,
}

impl AuditRecord {
    pub fn command(time_ms: i64, event: AuditEvent, wrap_ref: &WrapCommandRef, mode: ControlMode) -> Self {
        AuditRecord {
            time_ms,
            event,
            subject_type: wrap_ref.wrap_cmd_type.as_str().to_string(),
            subject_id: wrap_ref.wrap_cmd_id.to_string(),
            control_mode: Some(mode.as_str().to_string()),
            detail: None,
        }
    }

    pub fn scenario(time_ms: i64, scenario_id: &str, status: &str) -> Self {
        AuditRecord {
            time_ms,
            event: AuditEvent::ScenarioFinished,
            subject_type: "SCENARIO".to_string(),
            subject_id: scenario_id.to_string(),
            control_mode: None,
            detail: Some(status.to_string()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

enum AuditMessage {
    Record(AuditRecord),
    Flush,
    Shutdown,
}

/// Writes audit records to a `;` separated CSV file from a background thread.
///
/// Recording never blocks the control loop. Records are lost if the writer thread died.
#[derive(Debug)]
pub struct AuditRecorder {
    sender: mpsc::Sender<AuditMessage>,
    worker: Option<JoinHandle<()>>,
}

impl AuditRecorder {
    pub fn to_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::create(path.as_ref())?;
        log::info!("Writing audit records to {}.", path.as_ref().display());
        Ok(Self::to_writer(Box::new(file)))
    }

    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        let (sender, receiver) = mpsc::channel();
        let worker = thread::spawn(move || Self::worker_loop(receiver, writer));
        AuditRecorder { sender, worker: Some(worker) }
    }

    fn worker_loop(receiver: mpsc::Receiver<AuditMessage>, writer: Box<dyn Write + Send>) {
        let mut csv_writer = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);

        for message in receiver {
            match message {
                AuditMessage::Record(record) => {
                    if let Err(e) = csv_writer.serialize(&record) {
                        log::error!("Audit error: failed to write record: {}", e);
                    }
                }
                AuditMessage::Flush => {
                    if let Err(e) = csv_writer.flush() {
                        log::error!("Audit error: failed to flush: {}", e);
                    }
                }
                AuditMessage::Shutdown => break,
            }
        }

        if let Err(e) = csv_writer.flush() {
            log::error!("Audit error: failed to flush on shutdown: {}", e);
        }
    }

    pub fn record(&self, record: AuditRecord) {
        if self.sender.send(AuditMessage::Record(record)).is_err() {
            log::error!("Audit record dropped, the writer thread is gone.");
        }
    }

    pub fn flush(&self) {
        let _ = self.sender.send(AuditMessage::Flush);
    }

    /// Flushes outstanding records and waits for the writer thread.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _ = self.sender.send(AuditMessage::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Audit writer thread panicked.");
            }
        }
    }
}

impl Drop for AuditRecorder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Writer that keeps everything in memory so the test can read it back.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_records_are_written_as_csv_rows() {
        let buffer = SharedBuffer::default();
        let recorder = AuditRecorder::to_writer(Box::new(buffer.clone()));

        recorder.record(AuditRecord::command(1_500, AuditEvent::Submitted, &WrapCommandRef::control("fill"), ControlMode::Automatic));
        recorder.record(AuditRecord::scenario(9_000, "transfer", "Completed"));
        recorder.close();

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines[0], "TimeMs;Event;SubjectType;SubjectId;ControlMode;Detail");
        assert_eq!(lines[1], "1500;Submitted;CONTROL;fill;Automatic;");
        assert_eq!(lines[2], "9000;ScenarioFinished;SCENARIO;transfer;;Completed");
    }
}
