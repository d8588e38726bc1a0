// src/exec/multiplexer.rs

//! Stream multiplexer: merges a child's stdout and stderr into one ordered
//! sequence of [`LineEvent`]s.
//!
//! - One reader task per stream, each splitting on `\n`.
//! - Both readers share a [`LineSink`]: assigning the next sequence number
//!   and pushing the event onto the bounded channel happen under the same
//!   lock, so delivery order always equals sequence order.
//! - The channel is bounded; a slow consumer blocks the readers (and in turn
//!   the child, once its pipe buffer fills).
//! - Read errors end the affected reader early. They never produce an
//!   outcome on their own.
//! - [`StreamReaders::stop`] only interrupts a reader that is waiting on an
//!   empty pipe. Data the pipe already holds is still read, and a reader
//!   blocked on a slow consumer finishes delivering before it stops.

use std::sync::Arc;
use std::time::SystemTime;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::event::{ExecutionEvent, LineEvent, StreamSource};

struct SinkState {
    last_sequence: u64,
    tx: mpsc::Sender<ExecutionEvent>,
    consumer_gone: bool,
}

/// Shared emission point for both readers.
#[derive(Clone)]
pub struct LineSink {
    state: Arc<Mutex<SinkState>>,
}

impl LineSink {
    pub fn new(tx: mpsc::Sender<ExecutionEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SinkState {
                last_sequence: 0,
                tx,
                consumer_gone: false,
            })),
        }
    }

    /// Sequence the line and deliver it.
    ///
    /// Once the consumer has dropped its receiver, lines are still sequenced
    /// but discarded so the child's pipes keep draining.
    pub async fn emit(&self, source: StreamSource, text: String) {
        let mut state = self.state.lock().await;
        state.last_sequence += 1;
        if state.consumer_gone {
            return;
        }

        let event = LineEvent {
            sequence: state.last_sequence,
            source,
            text,
            timestamp: SystemTime::now(),
        };
        trace!(sequence = event.sequence, %source, "line captured");

        if state.tx.send(ExecutionEvent::Line(event)).await.is_err() {
            debug!("event consumer dropped; discarding further output");
            state.consumer_gone = true;
        }
    }

    /// Highest sequence number handed out so far.
    pub async fn last_sequence(&self) -> u64 {
        self.state.lock().await.last_sequence
    }
}

/// Join handles of the two reader tasks for one execution.
#[derive(Debug)]
pub struct StreamReaders {
    stdout: JoinHandle<()>,
    stderr: JoinHandle<()>,
    stop: CancellationToken,
}

impl StreamReaders {
    /// Resolves once both streams reached end-of-file (or failed).
    pub async fn closed(&mut self) {
        let _ = (&mut self.stdout).await;
        let _ = (&mut self.stderr).await;
    }

    /// Stop reading once the pipes run dry. Used when descendants keep the
    /// pipes open after the child itself is gone.
    pub fn stop(&self) {
        self.stop.cancel();
    }
}

/// Spawn one reader per stream, both feeding `sink`.
pub fn spawn_readers<O, E>(stdout: O, stderr: E, sink: LineSink) -> StreamReaders
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    let stop = CancellationToken::new();
    let stdout = tokio::spawn(read_lines(
        stdout,
        StreamSource::Stdout,
        sink.clone(),
        stop.clone(),
    ));
    let stderr = tokio::spawn(read_lines(stderr, StreamSource::Stderr, sink, stop.clone()));
    StreamReaders {
        stdout,
        stderr,
        stop,
    }
}

/// Read `reader` line by line until EOF, an I/O error, or `stop` while the
/// pipe has nothing more to give.
///
/// A final line without a trailing newline is still emitted. Invalid UTF-8
/// is replaced rather than dropped.
pub async fn read_lines<R>(reader: R, source: StreamSource, sink: LineSink, stop: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        let read = tokio::select! {
            biased;
            read = reader.read_until(b'\n', &mut buf) => Some(read),
            _ = stop.cancelled() => None,
        };

        let Some(read) = read else {
            debug!(%source, "stream still open after drain window; stopping reader");
            // read_until keeps what it consumed before the pipe ran dry.
            if !buf.is_empty() {
                sink.emit(source, decode_line(&buf)).await;
            }
            break;
        };

        match read {
            Ok(0) => break,
            Ok(_) => {
                sink.emit(source, decode_line(&buf)).await;
                // Let the other stream's reader interleave when both have
                // buffered lines.
                tokio::task::yield_now().await;
            }
            Err(e) => {
                debug!(%source, error = %e, "stream closed early");
                break;
            }
        }
    }

    debug!(%source, "stream reader finished");
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
