//! Persistence writer task: one per enabled stream.
//!
//! ```text
//! Opening ──(empty file)──▶ WritingHeader ──▶ Appending ◀──▶ Flushing
//!    │                                            │
//!    └──(open/header failure)──▶ Closed ◀──(Stop)─┘
//! ```
//!
//! An existing log is appended to only if its header names this stream at
//! the current version; a partial record at its end is cut off first.
//!
//! Each record is written and flushed to the OS as soon as it is dequeued.
//! Durability (`fsync`) happens separately on a fixed interval. All file
//! I/O runs on tokio's blocking pool.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::event::{emit, EventCallback};
use crate::pipeline::queue::QueueConsumer;
use crate::record::{FileHeader, HeaderError, LogRecord, ReadError};
use crate::stats::StreamCounters;
use crate::{CaptureEvent, SnifferError, StreamKind, WriterError};

/// Command sent to a writer task.
#[derive(Debug)]
pub(crate) enum WriterCommand {
    /// Close the file and exit. Queued records are not drained.
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Opening,
    WritingHeader,
    Appending,
    Flushing,
    Closed,
}

struct FileState {
    writer: Option<BufWriter<File>>,
    buf: Vec<u8>,
}

/// Owns one stream's log file for the lifetime of the capture phase.
pub(crate) struct LogWriter<R: LogRecord> {
    path: Arc<PathBuf>,
    header: FileHeader,
    sync_interval: Duration,
    state: WriterState,
    file: Arc<Mutex<FileState>>,
    counters: Arc<StreamCounters>,
    event_callback: Option<EventCallback>,
    reported_drops: u64,
    _record: PhantomData<R>,
}

impl<R: LogRecord> LogWriter<R> {
    /// Creates a writer for `path`. Nothing is opened until [`run`](Self::run).
    pub fn new(
        path: impl Into<PathBuf>,
        header: FileHeader,
        sync_interval: Duration,
        counters: Arc<StreamCounters>,
    ) -> Self {
        Self {
            path: Arc::new(path.into()),
            header,
            sync_interval,
            state: WriterState::Opening,
            file: Arc::new(Mutex::new(FileState {
                writer: None,
                buf: Vec::with_capacity(R::ENCODED_LEN),
            })),
            counters,
            event_callback: None,
            reported_drops: 0,
            _record: PhantomData,
        }
    }

    /// Sets the event callback.
    pub fn with_event_callback(mut self, callback: Option<EventCallback>) -> Self {
        self.event_callback = callback;
        self
    }

    fn stream(&self) -> StreamKind {
        R::STREAM
    }

    fn emit_event(&self, event: CaptureEvent) {
        emit(self.event_callback.as_ref(), event);
    }

    fn transition(&mut self, to: WriterState) {
        tracing::trace!(stream = %self.stream(), from = ?self.state, to = ?to, "writer state");
        self.state = to;
    }

    /// Opens the log in append mode and writes the header if it is empty.
    ///
    /// An existing log must carry this stream's header at the current
    /// version. A partial record left at the end by an interrupted write is
    /// cut off so appends stay on record boundaries, and a partial header
    /// is rewritten. Returns whether the header was written.
    fn open_blocking(path: &Path, header: &FileHeader) -> Result<(BufWriter<File>, bool), WriterError> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| WriterError::Open {
                path: path.to_path_buf(),
                source,
            })?;

        let len = file
            .metadata()
            .map_err(|source| WriterError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        let header_len = FileHeader::ENCODED_LEN as u64;
        if len >= header_len {
            Self::check_header(path, &mut file)?;
            let trailing = (len - header_len) % R::ENCODED_LEN as u64;
            if trailing > 0 {
                file.set_len(len - trailing)
                    .map_err(|source| WriterError::Repair {
                        path: path.to_path_buf(),
                        source,
                    })?;
                tracing::warn!(
                    stream = %R::STREAM,
                    path = %path.display(),
                    trailing,
                    "discarded partial record at end of log"
                );
            }
            return Ok((BufWriter::new(file), false));
        }

        if len > 0 {
            Self::check_partial_header(path, &mut file, len, header)?;
            file.set_len(0).map_err(|source| WriterError::Repair {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::warn!(
                stream = %R::STREAM,
                path = %path.display(),
                len,
                "discarded partial header"
            );
        }

        if let Err(source) = file.write_all(&header.encode()) {
            // Truncate so the next open writes the header again.
            let _ = file.set_len(0);
            return Err(WriterError::Header {
                path: path.to_path_buf(),
                source,
            });
        }
        Ok((BufWriter::new(file), true))
    }

    /// Checks that an existing log belongs to this stream and version.
    fn check_header(path: &Path, file: &mut File) -> Result<(), WriterError> {
        let mut raw = [0u8; FileHeader::ENCODED_LEN];
        file.read_exact(&mut raw).map_err(|source| WriterError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let incompatible = |source: ReadError| WriterError::IncompatibleLog {
            path: path.to_path_buf(),
            source,
        };
        let existing = FileHeader::decode(&raw).map_err(|e| incompatible(e.into()))?;
        match existing.stream() {
            Some(found) if found == R::STREAM => Ok(()),
            Some(found) => Err(incompatible(ReadError::WrongStream {
                expected: R::STREAM,
                found,
            })),
            None => Err(incompatible(
                HeaderError::UnknownIdentifier {
                    identifier: existing.identifier,
                }
                .into(),
            )),
        }
    }

    /// A log shorter than a header is only recoverable if what is there
    /// starts like the header this writer would write.
    fn check_partial_header(
        path: &Path,
        file: &mut File,
        len: u64,
        header: &FileHeader,
    ) -> Result<(), WriterError> {
        let mut raw = Vec::with_capacity(FileHeader::ENCODED_LEN);
        file.read_to_end(&mut raw).map_err(|source| WriterError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        // Identifier and version; the rest differs between boots.
        let expected = header.encode();
        let n = raw.len().min(8);
        if raw[..n] == expected[..n] {
            return Ok(());
        }
        Err(WriterError::IncompatibleLog {
            path: path.to_path_buf(),
            source: HeaderError::Truncated { len: len as usize }.into(),
        })
    }

    fn append_blocking(state: &mut FileState, record: &R) -> std::io::Result<()> {
        let FileState { writer, buf } = state;
        let writer = writer.as_mut().ok_or_else(not_open)?;
        buf.clear();
        record.encode_into(buf);
        writer.write_all(buf)?;
        writer.flush()
    }

    fn sync_blocking(state: &mut FileState) -> std::io::Result<()> {
        let writer = state.writer.as_mut().ok_or_else(not_open)?;
        writer.flush()?;
        writer.get_ref().sync_all()
    }

    fn close_blocking(state: &mut FileState) -> std::io::Result<()> {
        match state.writer.take() {
            Some(mut writer) => {
                writer.flush()?;
                writer.get_ref().sync_all()
            }
            None => Ok(()),
        }
    }

    async fn open(&mut self) -> Result<bool, WriterError> {
        let file = Arc::clone(&self.file);
        let path = Arc::clone(&self.path);
        let header = self.header;

        let (writer, header_written) =
            tokio::task::spawn_blocking(move || Self::open_blocking(&path, &header))
                .await
                .map_err(|e| WriterError::Join(format!("open task panicked: {e}")))??;

        if header_written {
            self.transition(WriterState::WritingHeader);
        }
        file.lock().await.writer = Some(writer);
        Ok(header_written)
    }

    async fn append(&mut self, record: R) {
        let file = Arc::clone(&self.file);
        let result = tokio::task::spawn_blocking(move || {
            let mut state = file.blocking_lock();
            Self::append_blocking(&mut state, &record)
        })
        .await;

        match flatten(result) {
            Ok(()) => {
                self.counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(error) => {
                self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(stream = %self.stream(), %error, "record write failed");
                self.emit_event(CaptureEvent::WriteFailed {
                    stream: self.stream(),
                    error,
                });
            }
        }
    }

    async fn sync(&mut self) {
        self.transition(WriterState::Flushing);

        let file = Arc::clone(&self.file);
        let result = tokio::task::spawn_blocking(move || {
            let mut state = file.blocking_lock();
            Self::sync_blocking(&mut state)
        })
        .await;

        let records_written = self.counters.written.load(Ordering::Relaxed);
        match flatten(result) {
            Ok(()) => {
                self.counters.syncs.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(stream = %self.stream(), records_written, "log synced");
                self.emit_event(CaptureEvent::Synced {
                    stream: self.stream(),
                    records_written,
                });
            }
            Err(error) => {
                tracing::warn!(stream = %self.stream(), %error, "log sync failed");
                self.emit_event(CaptureEvent::WriteFailed {
                    stream: self.stream(),
                    error: format!("sync failed: {error}"),
                });
            }
        }

        self.report_drops();
        self.transition(WriterState::Appending);
    }

    /// Reports drops counted by the capture callback since the last report.
    fn report_drops(&mut self) {
        let total = self.counters.dropped.load(Ordering::Relaxed);
        if total > self.reported_drops {
            let dropped = total - self.reported_drops;
            self.reported_drops = total;
            tracing::warn!(stream = %self.stream(), dropped, total, "capture queue full, records dropped");
            self.emit_event(CaptureEvent::RecordsDropped {
                stream: self.stream(),
                dropped,
                total,
            });
        }
    }

    async fn close(&mut self) {
        let file = Arc::clone(&self.file);
        let result = tokio::task::spawn_blocking(move || {
            let mut state = file.blocking_lock();
            Self::close_blocking(&mut state)
        })
        .await;

        if let Err(error) = flatten(result) {
            tracing::warn!(stream = %self.stream(), %error, "error closing log");
        }
        self.report_drops();
        self.transition(WriterState::Closed);

        let records_written = self.counters.written.load(Ordering::Relaxed);
        tracing::info!(stream = %self.stream(), records_written, "writer stopped");
        self.emit_event(CaptureEvent::WriterStopped {
            stream: self.stream(),
            records_written,
        });
    }

    /// Runs the writer until a [`WriterCommand::Stop`] arrives or the
    /// command channel closes.
    pub async fn run(mut self, mut queue: QueueConsumer<R>, mut cmd_rx: mpsc::Receiver<WriterCommand>) {
        let header_written = match self.open().await {
            Ok(header_written) => header_written,
            Err(err) => {
                tracing::error!(
                    stream = %self.stream(),
                    path = ?err.path(),
                    error = %err,
                    "writer failed to start"
                );
                self.transition(WriterState::Closed);
                self.emit_event(CaptureEvent::WriterFailed {
                    stream: self.stream(),
                    error: err.to_string(),
                });
                return;
            }
        };

        self.transition(WriterState::Appending);
        tracing::info!(
            stream = %self.stream(),
            path = %self.path.display(),
            header_written,
            "writer started"
        );
        self.emit_event(CaptureEvent::WriterStarted {
            stream: self.stream(),
            path: (*self.path).clone(),
            header_written,
        });

        let mut sync = tokio::time::interval_at(
            tokio::time::Instant::now() + self.sync_interval,
            self.sync_interval,
        );
        sync.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(WriterCommand::Stop) | None => break,
                    }
                }
                _ = sync.tick() => self.sync().await,
                record = queue.dequeue_blocking() => self.append(record).await,
            }
        }

        let discarded = queue.len();
        if discarded > 0 {
            tracing::debug!(stream = %self.stream(), discarded, "queued records discarded at shutdown");
        }
        self.close().await;
    }
}

fn not_open() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::NotConnected, "log file is not open")
}

fn flatten(result: Result<std::io::Result<()>, tokio::task::JoinError>) -> Result<(), String> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(e.to_string()),
        Err(e) => Err(format!("I/O task panicked: {e}")),
    }
}

/// Handle to a running writer task.
pub(crate) struct WriterHandle {
    stream: StreamKind,
    cmd_tx: mpsc::Sender<WriterCommand>,
    handle: JoinHandle<()>,
}

impl WriterHandle {
    /// Spawns `writer` on the current runtime.
    pub fn spawn<R: LogRecord>(writer: LogWriter<R>, queue: QueueConsumer<R>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        let handle = tokio::spawn(writer.run(queue, cmd_rx));
        Self {
            stream: R::STREAM,
            cmd_tx,
            handle,
        }
    }

    /// Signals the writer to stop without waiting for it.
    pub fn signal_stop(&self) {
        let _ = self.cmd_tx.try_send(WriterCommand::Stop);
    }

    /// Stops the writer and waits up to `timeout` for it to close its file.
    ///
    /// A writer that does not finish in time is aborted.
    pub async fn stop(mut self, timeout: Duration) -> Result<(), SnifferError> {
        self.signal_stop();
        match tokio::time::timeout(timeout, &mut self.handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!(stream = %self.stream, error = %e, "writer task ended abnormally");
                Ok(())
            }
            Err(_) => {
                self.handle.abort();
                Err(SnifferError::ShutdownTimedOut {
                    stream: self.stream,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                })
            }
        }
    }
}
