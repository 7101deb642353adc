//! Assembled sink: console and rotating file behind fan-out and buffering

use std::io::{self, Write};
use std::time::Duration;

use rotolog_core::{Result, SinkConfig};

use crate::buffer::BufferedWriter;
use crate::fanout::FanoutWriter;
use crate::rotate::{RollingFile, RotationPolicy};

/// Handle through which formatted log records reach durable storage
///
/// Built once from a [`SinkConfig`]; the caller holds the handle (or an
/// `Arc` of it) and writes byte records through it from any number of
/// threads. Construction fails if the log directory cannot be created;
/// everything after that follows best-effort logging semantics.
pub struct LogSink {
    writer: BufferedWriter<FanoutWriter>,
}

impl LogSink {
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let cfg = config.normalized();

        let mut sinks: Vec<Box<dyn Write + Send>> = Vec::new();
        if cfg.write_to_console {
            sinks.push(Box::new(io::stdout()));
        }
        if cfg.write_to_file {
            let policy = RotationPolicy {
                max_size_bytes: cfg.max_size_bytes(),
                max_age_days: cfg.max_age_days as u64,
                max_backups: cfg.max_backups as usize,
                compress: cfg.compress,
                local_time: cfg.local_time,
            };
            sinks.push(Box::new(RollingFile::new(
                cfg.dir.clone(),
                &cfg.label,
                policy,
            )?));
        }
        if sinks.is_empty() {
            // neither destination enabled, keep records visible somewhere
            sinks.push(Box::new(io::stdout()));
        }

        let fanout = FanoutWriter::new(sinks);
        let writer = BufferedWriter::new(
            fanout,
            cfg.buffer_size_bytes as usize,
            Duration::from_secs(cfg.flush_interval_secs as u64),
        );

        Ok(Self { writer })
    }

    /// Write one formatted record; the bytes land in every configured
    /// destination as a single unit
    pub fn write(&self, record: &[u8]) -> io::Result<usize> {
        self.writer.write(record)
    }

    /// Drain buffered records to the configured destinations
    pub fn flush(&self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Flush and stop the background flush timer
    pub fn close(&self) -> io::Result<()> {
        self.writer.close()
    }
}

impl Write for &LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        LogSink::write(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        LogSink::flush(*self)
    }
}
