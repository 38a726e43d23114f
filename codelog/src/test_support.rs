//! Helpers shared by unit tests

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use crate::log_file::LogFile;

/// In-memory writer whose contents stay readable after it is boxed.
#[derive(Clone, Default)]
pub struct MemorySink(Arc<Mutex<Vec<u8>>>);

impl MemorySink {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for MemorySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A header-less text log backed by a [`MemorySink`].
pub fn memory_log() -> (Arc<LogFile>, MemorySink) {
    let sink = MemorySink::default();
    let log = Arc::new(LogFile::with_writer("memory", Box::new(sink.clone())));
    (log, sink)
}
