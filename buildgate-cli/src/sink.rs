//! Console output toward the build server
//!
//! Everything the build agent is meant to read (progress lines, service
//! messages, per-dependency summaries) goes through a [`MessageSink`], so
//! tracing output on stderr never mixes with it.

use std::io::Write;

use buildgate_core::service_message::ServiceMessage;

/// Destination for build-log lines
pub trait MessageSink: Send + Sync {
    /// Write one line
    fn line(&self, text: &str);

    /// Write a TeamCity service message
    fn service(&self, message: &ServiceMessage) {
        self.line(&message.to_string());
    }
}

/// Writes lines to stdout, flushing after each one
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl MessageSink for StdoutSink {
    fn line(&self, text: &str) {
        let mut out = std::io::stdout().lock();
        // a closed stdout leaves nobody to tell
        let _ = writeln!(out, "{}", text);
        let _ = out.flush();
    }
}

#[cfg(test)]
pub use memory::InMemorySink;

#[cfg(test)]
mod memory {
    use std::sync::{Arc, Mutex};

    use super::MessageSink;

    /// Collects lines for assertions
    #[derive(Debug, Clone, Default)]
    pub struct InMemorySink {
        lines: Arc<Mutex<Vec<String>>>,
    }

    impl InMemorySink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn lines(&self) -> Vec<String> {
            self.lines.lock().unwrap().clone()
        }

        pub fn contains(&self, needle: &str) -> bool {
            self.lines().iter().any(|l| l.contains(needle))
        }
    }

    impl MessageSink for InMemorySink {
        fn line(&self, text: &str) {
            self.lines.lock().unwrap().push(text.to_string());
        }
    }
}
