//! Fan-out to multiple write destinations

use std::io::{self, Write};

/// Writer that duplicates every write across a fixed set of sinks
///
/// Sinks are attempted in order; the first error is recorded and returned,
/// but the remaining sinks still receive the bytes. One failing destination
/// never silences the others.
pub struct FanoutWriter {
    sinks: Vec<Box<dyn Write + Send>>,
}

impl FanoutWriter {
    pub fn new(sinks: Vec<Box<dyn Write + Send>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Write for FanoutWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.write_all(buf) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(buf.len()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.flush() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
