//! Optional process-wide sink handle
//!
//! Thin convenience layer for applications that want one ambient sink
//! instead of passing a [`LogSink`] handle around. Everything here delegates
//! to a normally-constructed sink; the core never depends on this module.

use once_cell::sync::OnceCell;
use std::sync::Arc;

use rotolog_core::{Error, Result, SinkConfig};

use crate::pipeline::LogSink;

static GLOBAL: OnceCell<Arc<LogSink>> = OnceCell::new();

/// Build the process-wide sink; fails if called twice
pub fn init(config: &SinkConfig) -> Result<()> {
    let sink = Arc::new(LogSink::new(config)?);
    GLOBAL
        .set(sink)
        .map_err(|_| Error::config("global log sink already initialized"))
}

/// The process-wide sink, if [`init`] has run
pub fn get() -> Option<Arc<LogSink>> {
    GLOBAL.get().cloned()
}
