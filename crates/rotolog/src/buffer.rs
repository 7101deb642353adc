//! Bounded in-memory write buffering with periodic forced flush

use parking_lot::Mutex;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::scheduler::FlushScheduler;
use rotolog_core::constants::DEFAULT_FLUSH_INTERVAL_SECS;

/// Write-side buffer of bounded capacity in front of a downstream writer
///
/// With capacity 0 every write passes straight through. Otherwise writes
/// accumulate until the buffer would overflow, an explicit [`flush`] is
/// called, or the background flush timer fires; the timer starts lazily on
/// the first buffered write and stops when the writer is dropped.
///
/// `write` and `flush` take `&self` and may be called concurrently from any
/// number of threads; a single mutex serializes all buffer mutations, so
/// each write lands downstream whole, never interleaved with another.
///
/// A record larger than the capacity is flushed past the buffer and written
/// downstream in one piece, never truncated or split. Bytes handed to the
/// downstream writer are consumed even when it reports an error; the error
/// goes to the caller that triggered the downstream call and nothing is
/// retried or replayed.
///
/// [`flush`]: BufferedWriter::flush
pub struct BufferedWriter<W: Write + Send + 'static> {
    shared: Arc<Shared<W>>,
    interval: Duration,
    scheduler: Mutex<Option<FlushScheduler>>,
}

struct Shared<W> {
    capacity: usize,
    state: Mutex<State<W>>,
}

struct State<W> {
    buf: Vec<u8>,
    inner: W,
}

impl<W: Write + Send> Shared<W> {
    fn flush_now(&self) -> io::Result<()> {
        let mut state = self.state.lock();
        Self::drain(&mut state)
    }

    fn drain(state: &mut State<W>) -> io::Result<()> {
        if !state.buf.is_empty() {
            let pending = std::mem::take(&mut state.buf);
            state.inner.write_all(&pending)?;
        }
        state.inner.flush()
    }
}

impl<W: Write + Send + 'static> BufferedWriter<W> {
    /// Wrap `inner` with a buffer of `capacity` bytes, flushed at least every
    /// `flush_interval`
    ///
    /// Capacity 0 disables buffering. A zero interval falls back to the
    /// 5-second default so buffered bytes are never exposed indefinitely.
    pub fn new(inner: W, capacity: usize, flush_interval: Duration) -> Self {
        let interval = if flush_interval.is_zero() {
            Duration::from_secs(DEFAULT_FLUSH_INTERVAL_SECS)
        } else {
            flush_interval
        };

        Self {
            shared: Arc::new(Shared {
                capacity,
                state: Mutex::new(State {
                    buf: Vec::new(),
                    inner,
                }),
            }),
            interval,
            scheduler: Mutex::new(None),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Bytes currently queued and unflushed
    pub fn pending(&self) -> usize {
        self.shared.state.lock().buf.len()
    }

    /// Queue `bytes`, draining to the downstream writer first if they would
    /// overflow the buffer
    pub fn write(&self, bytes: &[u8]) -> io::Result<usize> {
        if self.shared.capacity == 0 {
            let mut state = self.shared.state.lock();
            state.inner.write_all(bytes)?;
            return Ok(bytes.len());
        }

        self.ensure_scheduler();

        let mut state = self.shared.state.lock();
        if state.buf.len() + bytes.len() > self.shared.capacity {
            Shared::drain(&mut state)?;
        }
        if bytes.len() > self.shared.capacity {
            // oversized record, force it through whole
            state.inner.write_all(bytes)?;
        } else {
            state.buf.extend_from_slice(bytes);
        }
        Ok(bytes.len())
    }

    /// Drain buffered bytes downstream and flush the downstream writer
    pub fn flush(&self) -> io::Result<()> {
        self.shared.flush_now()
    }

    /// Flush and stop the background flush timer
    pub fn close(&self) -> io::Result<()> {
        self.scheduler.lock().take();
        self.flush()
    }

    fn ensure_scheduler(&self) {
        let mut guard = self.scheduler.lock();
        if guard.is_none() {
            let shared = Arc::clone(&self.shared);
            *guard = Some(FlushScheduler::start(self.interval, move || {
                shared.flush_now()
            }));
        }
    }
}

impl<W: Write + Send + 'static> Drop for BufferedWriter<W> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl<W: Write + Send + 'static> Write for &BufferedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        BufferedWriter::write(*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        BufferedWriter::flush(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[derive(Clone, Default)]
    struct MemSink(Arc<Mutex<Vec<u8>>>);

    impl MemSink {
        fn contents(&self) -> Vec<u8> {
            self.0.lock().clone()
        }
    }

    impl Write for MemSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct FailSink;

    impl Write for FailSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    const INTERVAL: Duration = Duration::from_secs(60);

    #[test]
    fn test_capacity_zero_passes_through_immediately() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 0, INTERVAL);

        writer.write(b"one ").unwrap();
        writer.write(b"two ").unwrap();
        writer.write(b"three").unwrap();

        assert_eq!(sink.contents(), b"one two three");
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_writes_accumulate_until_capacity() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 16, INTERVAL);

        writer.write(b"aaaaaa").unwrap();
        assert_eq!(writer.pending(), 6);
        assert!(sink.contents().is_empty());

        writer.write(b"bbbbbb").unwrap();
        assert_eq!(writer.pending(), 12);
        assert!(sink.contents().is_empty());

        // 12 + 6 > 16, so the existing buffer drains first
        writer.write(b"cccccc").unwrap();
        assert_eq!(sink.contents(), b"aaaaaabbbbbb");
        assert_eq!(writer.pending(), 6);
    }

    #[test]
    fn test_pending_never_exceeds_capacity() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 32, INTERVAL);

        for i in 0..200 {
            writer.write(format!("record {:03}\n", i).as_bytes()).unwrap();
            assert!(writer.pending() <= 32);
        }
    }

    #[test]
    fn test_oversized_write_forced_through() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 8, INTERVAL);

        writer.write(b"abc").unwrap();
        writer.write(b"0123456789abcdef").unwrap();

        // buffered prefix drained first, then the oversized record, in order
        assert_eq!(sink.contents(), b"abc0123456789abcdef");
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_explicit_flush_drains_buffer() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 1024, INTERVAL);

        writer.write(b"queued\n").unwrap();
        assert!(sink.contents().is_empty());

        writer.flush().unwrap();
        assert_eq!(sink.contents(), b"queued\n");
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 1024, INTERVAL);

        writer.write(b"once\n").unwrap();
        writer.flush().unwrap();
        let snapshot = sink.contents();

        writer.flush().unwrap();
        assert_eq!(sink.contents(), snapshot);
    }

    #[test]
    fn test_periodic_flush_makes_write_visible() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 1024, Duration::from_millis(30));

        writer.write(b"eventually\n").unwrap();
        assert!(sink.contents().is_empty());

        thread::sleep(Duration::from_millis(200));
        assert_eq!(sink.contents(), b"eventually\n");
    }

    #[test]
    fn test_zero_interval_substitutes_default() {
        let writer = BufferedWriter::new(MemSink::default(), 64, Duration::ZERO);
        assert_eq!(writer.interval, Duration::from_secs(5));
    }

    #[test]
    fn test_downstream_error_propagates_without_replay() {
        let writer = BufferedWriter::new(FailSink, 8, INTERVAL);

        writer.write(b"abc").unwrap();
        // the drain on overflow hits the failing sink
        let err = writer.write(b"defghi").unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        // the drained bytes are consumed, not replayed on the next flush
        assert_eq!(writer.pending(), 0);
        writer.flush().unwrap();
    }

    #[test]
    fn test_close_stops_scheduler_and_flushes() {
        let sink = MemSink::default();
        let writer = BufferedWriter::new(sink.clone(), 1024, Duration::from_millis(10));

        writer.write(b"tail\n").unwrap();
        writer.close().unwrap();

        assert_eq!(sink.contents(), b"tail\n");
        assert!(writer.scheduler.lock().is_none());
    }

    #[test]
    fn test_concurrent_writes_are_never_torn() {
        let sink = MemSink::default();
        let writer = Arc::new(BufferedWriter::new(sink.clone(), 64, INTERVAL));

        let threads = 8;
        let records = 50;
        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let writer = Arc::clone(&writer);
                thread::spawn(move || {
                    for r in 0..records {
                        let line = format!("thread-{:02}-record-{:03}\n", t, r);
                        writer.write(line.as_bytes()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        writer.flush().unwrap();

        let output = String::from_utf8(sink.contents()).unwrap();
        let lines: HashSet<&str> = output.lines().collect();
        assert_eq!(output.lines().count(), threads * records);
        for t in 0..threads {
            for r in 0..records {
                let line = format!("thread-{:02}-record-{:03}", t, r);
                assert!(lines.contains(line.as_str()), "missing {}", line);
            }
        }
    }
}
