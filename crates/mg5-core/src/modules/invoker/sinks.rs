use crate::modules::traits::OutputSink;
use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;
use tracing::debug;

/// Relays MG5 output to the terminal so a long run shows live progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn accept_line(&mut self, line: &str) {
        let mut stdout = std::io::stdout().lock();
        // a closed terminal must not abort the run
        let _ = writeln!(stdout, "{}", line);
        let _ = stdout.flush();
    }
}

/// Relays MG5 output as debug-level log events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn accept_line(&mut self, line: &str) {
        debug!(target: "mg5_core::mg5", "{}", line);
    }
}

/// Keeps a shared copy of every line; clones observe the same buffer.
#[derive(Debug, Default, Clone)]
pub struct CapturingSink {
    lines: Rc<RefCell<Vec<String>>>,
}

impl CapturingSink {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
}

impl OutputSink for CapturingSink {
    fn accept_line(&mut self, line: &str) {
        self.lines.borrow_mut().push(line.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::CapturingSink;
    use crate::modules::traits::OutputSink;

    #[test]
    fn capturing_sink_clones_share_buffer() {
        let sink = CapturingSink::default();
        let mut writer = sink.clone();
        writer.accept_line("=== Results Summary for run: run_01 tag: tag_1 ===");
        writer.accept_line("Nb of events: 10");
        assert_eq!(sink.lines().len(), 2);
        assert_eq!(sink.lines()[1], "Nb of events: 10");
    }
}
