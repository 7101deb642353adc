//! Rotolog - buffered, rotation-aware log writing
//!
//! Byte records flow from [`LogSink::write`] through an optional bounded
//! buffer ([`BufferedWriter`]) into a fan-out over the configured
//! destinations ([`FanoutWriter`]): standard output and/or a size- and
//! date-rotated file ([`RollingFile`]) with count/age retention and optional
//! gzip of backups. A background timer flushes the buffer at a fixed
//! interval so records are never exposed in memory indefinitely.

mod buffer;
mod fanout;
pub mod global;
mod pipeline;
mod rotate;
mod scheduler;

pub use buffer::BufferedWriter;
pub use fanout::FanoutWriter;
pub use pipeline::LogSink;
pub use rotate::{RollingFile, RotationPolicy};

pub use rotolog_core::{ConfigFormat, Error, Result, SinkConfig};
