use super::{BarStyle, JobStatus, StatusReporter};
use crate::models::GeneratedItem;
use std::io::Write;
use std::sync::Mutex;

/// Renders a job to a writer (stdout by default): one alignment row per item,
/// a progress line per design and the final status.
pub struct ConsoleReporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::with_writer(Box::new(std::io::stdout()))
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    fn emit(&self, line: &str) {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            tracing::warn!("Failed to write report line: {}", e);
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusReporter for ConsoleReporter {
    fn on_state_changed(&self, status: JobStatus) {
        let style = BarStyle::for_status(&status);
        match style.as_str() {
            "" => self.emit(&format!("== {}", status)),
            style => self.emit(&format!("== {} [{}]", status, style)),
        }
    }

    fn on_progress(&self, current: usize, max: usize) {
        self.emit(&format!("-- progress {}/{}", current, max));
    }

    fn on_item_appended(&self, item: &GeneratedItem) {
        self.emit(&item.alignment_row());
    }

    fn on_error(&self, message: &str) {
        self.emit(&format!("!! Encountered an exception: {}", message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::FailureReason;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_output() {
        let buf = SharedBuf::default();
        let reporter = ConsoleReporter::with_writer(Box::new(buf.clone()));

        reporter.on_state_changed(JobStatus::Running);
        reporter.on_item_appended(&GeneratedItem {
            id: 2,
            label: "Design 1".to_string(),
            sequence: "MKVL".to_string(),
            is_reference: false,
        });
        reporter.on_progress(1, 1);
        reporter.on_state_changed(JobStatus::Success);
        reporter.on_state_changed(JobStatus::Failed(FailureReason::Cancelled));

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "== running\n\
             Design 1  : MKVL\n\
             -- progress 1/1\n\
             == success [success]\n\
             == failed (cancelled) [danger]\n"
        );
    }
}
