//! Reader subprocess supervision and event dispatch.
//!
//! The [`Supervisor`] launches the reader binary with the pin pair of the
//! selected sensor, reads its merged stdout/stderr line by line, and feeds
//! each line through a bounded queue to a fixed pool of publisher workers.
//!
//! ```text
//! NotStarted --start()--> Running --EOF / read error / stop()--> Terminated
//! ```

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use gatesight_bridge_framework::{Destination, EventSink, PublishCounters, PublishStats};

use crate::config::{RfidConfig, SensorIdentity};
use crate::formatter::EventFormatter;

/// Error type for supervisor operations.
#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("Failed to spawn reader '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("Supervisor already started")]
    AlreadyStarted,
    #[error("Supervisor is not running")]
    NotRunning,
    #[error("Reader task failed: {0}")]
    Join(String),
}

/// Why the supervisor left the `Running` state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationReason {
    /// The reader closed its output.
    EndOfStream,
    /// Reading the reader's output failed.
    ReadError(String),
    /// [`Supervisor::stop`] was called or the supervisor was dropped.
    Stopped,
}

/// Lifecycle state of a [`Supervisor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorState {
    NotStarted,
    Running,
    Terminated(TerminationReason),
}

/// Final report of a supervised reader run.
#[derive(Debug, Clone)]
pub struct Termination {
    pub reason: TerminationReason,
    /// Lines read from the reader (stdout and stderr).
    pub lines_read: usize,
    /// Outcomes of the publish attempts made for those lines.
    pub publish: PublishStats,
    /// Exit status of the reader, if it could be collected.
    pub exit_status: Option<ExitStatus>,
}

/// One line of reader output and when it was read.
#[derive(Debug)]
struct RawReading {
    line: String,
    captured_at: DateTime<Utc>,
}

/// Format-and-publish step shared by all workers.
struct Dispatch<S> {
    formatter: EventFormatter,
    identity: SensorIdentity,
    destination: Destination,
    sink: S,
    counters: PublishCounters,
}

impl<S: EventSink> Dispatch<S> {
    async fn handle(&self, reading: RawReading) {
        let event = self
            .formatter
            .format(&reading.line, reading.captured_at, &self.identity);

        // The sink logs failures itself; they stop here.
        let outcome = self.sink.publish(&self.destination, &event).await;
        self.counters.record(&outcome);
    }
}

/// Owns the reader subprocess and its dispatch pipeline.
pub struct Supervisor<S: EventSink> {
    config: RfidConfig,
    exchange: String,
    sink: Option<S>,
    state_tx: Arc<watch::Sender<SupervisorState>>,
    stop_tx: watch::Sender<bool>,
    reader: Option<JoinHandle<Termination>>,
}

impl<S: EventSink> Supervisor<S> {
    /// Create a supervisor in the `NotStarted` state.
    pub fn new(config: RfidConfig, exchange: impl Into<String>, sink: S) -> Self {
        let (state_tx, _) = watch::channel(SupervisorState::NotStarted);
        let (stop_tx, _) = watch::channel(false);

        Self {
            config,
            exchange: exchange.into(),
            sink: Some(sink),
            state_tx: Arc::new(state_tx),
            stop_tx,
            reader: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SupervisorState {
        self.state_tx.borrow().clone()
    }

    /// Receiver for lifecycle state changes.
    pub fn subscribe(&self) -> watch::Receiver<SupervisorState> {
        self.state_tx.subscribe()
    }

    /// Launch the reader for `identity` and start dispatching its output.
    ///
    /// Unknown identities use the default pins. A spawn failure is returned
    /// as-is and leaves the supervisor in `NotStarted`; it is not retried.
    pub fn start(&mut self, identity: &SensorIdentity) -> Result<(), SupervisorError> {
        if self.state() != SupervisorState::NotStarted {
            return Err(SupervisorError::AlreadyStarted);
        }

        let pins = self.config.resolve_pins(identity);
        let binary = self.config.reader.binary.display().to_string();

        let mut command = Command::new(&self.config.reader.binary);
        command
            .args(&self.config.reader.args)
            .args(pins.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(binary = %binary, identity = %identity, pins = %pins, "Starting reader");

        let mut child = command.spawn().map_err(|source| SupervisorError::Spawn {
            binary: binary.clone(),
            source,
        })?;

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(SupervisorError::Spawn {
                binary,
                source: io::Error::other("reader output was not captured"),
            });
        };

        let Some(sink) = self.sink.take() else {
            return Err(SupervisorError::AlreadyStarted);
        };

        let dispatch = Arc::new(Dispatch {
            formatter: EventFormatter::new(self.config.sensor_kind),
            identity: identity.clone(),
            destination: self
                .config
                .routing_keys()
                .destination(&self.exchange, identity.as_str()),
            sink,
            counters: PublishCounters::default(),
        });

        let pool = PoolSettings {
            workers: self.config.workers,
            queue_capacity: self.config.queue_capacity,
            drain_timeout: self.config.shutdown_timeout(),
        };

        self.state_tx.send_replace(SupervisorState::Running);

        self.reader = Some(tokio::spawn(read_loop(
            child,
            MergedLines::new(stdout, stderr),
            dispatch,
            pool,
            self.stop_tx.subscribe(),
            self.state_tx.clone(),
        )));

        Ok(())
    }

    /// Wait until the supervisor reaches `Terminated`.
    ///
    /// Cancel safe: if the returned future is dropped the reader keeps
    /// running and `wait` or `stop` can be called again.
    pub async fn wait(&mut self) -> Result<Termination, SupervisorError> {
        let handle = self.reader.as_mut().ok_or(SupervisorError::NotRunning)?;
        let joined = handle.await;
        self.reader = None;

        joined.map_err(|e| SupervisorError::Join(e.to_string()))
    }

    /// Kill the reader, let in-flight events drain, and wait for `Terminated`.
    pub async fn stop(&mut self) -> Result<Termination, SupervisorError> {
        if self.reader.is_none() {
            return Err(SupervisorError::NotRunning);
        }

        info!("Stopping reader");
        self.stop_tx.send_replace(true);
        self.wait().await
    }
}

impl<S: EventSink> Drop for Supervisor<S> {
    fn drop(&mut self) {
        // The read task owns the child; tell it to kill and clean up.
        self.stop_tx.send_replace(true);
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, Copy)]
struct PoolSettings {
    workers: usize,
    queue_capacity: usize,
    drain_timeout: Duration,
}

/// Spawn the publisher workers and return the queue that feeds them.
fn spawn_workers<S: EventSink>(
    dispatch: &Arc<Dispatch<S>>,
    pool: PoolSettings,
) -> (mpsc::Sender<RawReading>, JoinSet<()>) {
    let (tx, rx) = mpsc::channel(pool.queue_capacity);
    let rx = Arc::new(Mutex::new(rx));
    let mut workers = JoinSet::new();

    for worker in 0..pool.workers {
        let rx = rx.clone();
        let dispatch = dispatch.clone();

        workers.spawn(async move {
            loop {
                let next = rx.lock().await.recv().await;
                let Some(reading) = next else {
                    break;
                };
                dispatch.handle(reading).await;
            }
            debug!(worker, "Publisher worker finished");
        });
    }

    (tx, workers)
}

/// Resolve once a stop has been requested; never if the sender is gone.
pub(crate) async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// The reader task: read, enqueue, then tear down exactly once.
async fn read_loop<S, O, E>(
    mut child: Child,
    mut lines: MergedLines<O, E>,
    dispatch: Arc<Dispatch<S>>,
    pool: PoolSettings,
    mut stop: watch::Receiver<bool>,
    state: Arc<watch::Sender<SupervisorState>>,
) -> Termination
where
    S: EventSink,
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    let (queue, mut workers) = spawn_workers(&dispatch, pool);
    let mut lines_read = 0usize;

    info!(
        workers = pool.workers,
        destination = %dispatch.destination,
        "Reader running"
    );

    let reason = loop {
        tokio::select! {
            biased;
            _ = stop_requested(&mut stop) => break TerminationReason::Stopped,
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    lines_read += 1;
                    let line = line.trim().to_string();
                    info!(reading = %line, "Reader output");

                    let reading = RawReading {
                        line,
                        captured_at: Utc::now(),
                    };

                    // Blocks while the queue is full, but not past a stop.
                    tokio::select! {
                        biased;
                        _ = stop_requested(&mut stop) => {
                            warn!("Stop requested while queue was full, dropping reading");
                            break TerminationReason::Stopped;
                        }
                        sent = queue.send(reading) => {
                            if sent.is_err() {
                                break TerminationReason::ReadError(
                                    "all publisher workers exited".to_string(),
                                );
                            }
                        }
                    }
                }
                Ok(None) => {
                    info!("Reader reached end of stream");
                    break TerminationReason::EndOfStream;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read reader output");
                    break TerminationReason::ReadError(e.to_string());
                }
            },
        }
    };

    if reason != TerminationReason::EndOfStream {
        if let Err(e) = child.start_kill() {
            debug!(error = %e, "Reader already exited");
        }
    }
    drop(lines);

    // Closing the queue lets workers finish what is queued, then exit.
    drop(queue);
    drain_workers(&mut workers, pool.drain_timeout).await;

    let exit_status = reap(&mut child, pool.drain_timeout).await;
    let termination = Termination {
        reason,
        lines_read,
        publish: dispatch.counters.snapshot(),
        exit_status,
    };

    info!(
        reason = ?termination.reason,
        lines_read = termination.lines_read,
        attempted = termination.publish.total(),
        published = termination.publish.success,
        failed = termination.publish.failed,
        exit_status = ?termination.exit_status,
        "Reader terminated"
    );

    state.send_replace(SupervisorState::Terminated(termination.reason.clone()));
    termination
}

/// Wait for workers to empty the queue, aborting them after `timeout`.
async fn drain_workers(workers: &mut JoinSet<()>, timeout: Duration) {
    let drained = tokio::time::timeout(timeout, async {
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Publisher worker failed");
            }
        }
    })
    .await;

    if drained.is_err() {
        warn!(
            remaining = workers.len(),
            timeout = ?timeout,
            "Publisher workers did not drain in time, aborting in-flight events"
        );
        workers.shutdown().await;
    }
}

/// Collect the reader's exit status, killing it if it lingers past `timeout`.
async fn reap(child: &mut Child, timeout: Duration) -> Option<ExitStatus> {
    let status = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!("Reader still running after closing its output, killing it");
            if let Err(e) = child.start_kill() {
                debug!(error = %e, "Failed to kill reader");
            }
            child.wait().await
        }
    };

    status
        .map_err(|e| warn!(error = %e, "Failed to collect reader exit status"))
        .ok()
}

/// Line reader over one stream.
///
/// Bytes that are not valid UTF-8 are replaced rather than reported, so a
/// noisy reader never ends the stream early.
struct LineStream<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    open: bool,
}

impl<R: AsyncRead + Unpin> LineStream<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            buf: Vec::new(),
            open: true,
        }
    }

    /// Next line without its terminator, or `None` at end-of-file.
    ///
    /// Cancel safe: a partial line stays in `buf` and is completed by the
    /// next call.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        let read = self.reader.read_until(b'\n', &mut self.buf).await?;
        if read == 0 {
            self.open = false;
            if self.buf.is_empty() {
                return Ok(None);
            }
        }

        let line = decode_line(&self.buf);
        self.buf.clear();
        Ok(Some(line))
    }
}

/// Strip `\n` or `\r\n` and decode lossily.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Line reader over two streams, yielding lines from whichever is ready.
///
/// Ends once both streams reach end-of-file.
struct MergedLines<O, E> {
    stdout: LineStream<O>,
    stderr: LineStream<E>,
}

impl<O, E> MergedLines<O, E>
where
    O: AsyncRead + Unpin,
    E: AsyncRead + Unpin,
{
    fn new(stdout: O, stderr: E) -> Self {
        Self {
            stdout: LineStream::new(stdout),
            stderr: LineStream::new(stderr),
        }
    }

    /// Next line from either stream, or `None` once both are closed.
    async fn next_line(&mut self) -> io::Result<Option<String>> {
        while self.stdout.open || self.stderr.open {
            let line = tokio::select! {
                line = self.stdout.next_line(), if self.stdout.open => line?,
                line = self.stderr.next_line(), if self.stderr.open => line?,
            };

            if line.is_some() {
                return Ok(line);
            }
        }

        Ok(None)
    }
}
