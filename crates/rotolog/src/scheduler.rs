//! Periodic flush task for buffered writers

use crossbeam_channel::{bounded, tick, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::warn;

/// Handle to a background thread flushing its owner at a fixed interval
///
/// Dropping the handle signals the thread to stop and joins it.
pub(crate) struct FlushScheduler {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl FlushScheduler {
    /// Spawn the timer thread; `flush` runs once per tick until the handle
    /// is dropped
    pub(crate) fn start<F>(interval: Duration, flush: F) -> Self
    where
        F: Fn() -> std::io::Result<()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let ticker = tick(interval);

        let thread = thread::Builder::new()
            .name("rotolog-flush".to_string())
            .spawn(move || loop {
                crossbeam_channel::select! {
                    recv(ticker) -> _ => {
                        if let Err(e) = flush() {
                            warn!("periodic flush failed: {}", e);
                        }
                    }
                    recv(stop_rx) -> _ => break,
                }
            });

        match thread {
            Ok(handle) => Self {
                stop: stop_tx,
                thread: Some(handle),
            },
            Err(e) => {
                warn!("failed to spawn flush thread: {}", e);
                Self {
                    stop: stop_tx,
                    thread: None,
                }
            }
        }
    }
}

impl Drop for FlushScheduler {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}
