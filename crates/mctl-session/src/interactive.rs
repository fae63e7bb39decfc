//! Interactive shell session
//!
//! One background reader task per session drains remote output into the
//! open capture window and hands it to a forwarder task, which delivers
//! [`ClientEvent::Output`] events on the bounded queue. A slow consumer
//! backs up the forwarder, never the reader. The foreground writes lines
//! through a single async-locked writer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::capture::{CaptureSlot, CaptureWindow, Captured};
use crate::decode::Utf8Decoder;
use crate::error::{ChannelError, SessionError};
use crate::event::{ClientEvent, EventSender};

/// Bytes requested per read from the remote shell
const READ_BUFFER_SIZE: usize = 4096;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Guards the one-interactive-session-per-channel rule
#[derive(Debug, Clone, Default)]
pub struct InteractiveSlot(Arc<AtomicBool>);

impl InteractiveSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot, failing if a live session already holds it
    pub fn try_acquire(&self) -> Result<SlotLease, ChannelError> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChannelError::SessionAlreadyActive)?;
        Ok(SlotLease(Arc::clone(&self.0)))
    }

    pub fn is_taken(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Held by the reader task; frees the slot when the session ends
#[derive(Debug)]
pub struct SlotLease(Arc<AtomicBool>);

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// A running remote shell
pub struct InteractiveSession {
    writer: Mutex<BoxedWriter>,
    capture: Arc<CaptureSlot>,
    /// Asks the reader to stop
    stop: CancellationToken,
    /// Cancelled once the session can no longer be used
    closed: CancellationToken,
    reader: Option<JoinHandle<()>>,
    forwarder: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for InteractiveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractiveSession")
            .field("closed", &self.closed.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl InteractiveSession {
    /// Start the reader task over `reader` and wrap `writer`.
    ///
    /// `lease`, when given, is released once the reader exits.
    pub fn spawn<R>(
        reader: R,
        writer: BoxedWriter,
        events: EventSender,
        lease: Option<SlotLease>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let capture = Arc::new(CaptureSlot::default());
        let stop = CancellationToken::new();
        let closed = CancellationToken::new();

        let (pending_tx, pending_rx) = mpsc::unbounded_channel();
        let forwarder = tokio::spawn(forward_events(pending_rx, events, stop.clone()));
        let handle = tokio::spawn(read_loop(
            reader,
            Arc::clone(&capture),
            pending_tx,
            stop.clone(),
            closed.clone(),
            lease,
        ));

        Self {
            writer: Mutex::new(writer),
            capture,
            stop,
            closed,
            reader: Some(handle),
            forwarder: Some(forwarder),
        }
    }

    /// Write `line` followed by a newline
    pub async fn send(&self, line: &str) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::ChannelUnusable);
        }

        let mut writer = self.writer.lock().await;
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;

        if let Err(e) = result {
            tracing::warn!("Write to remote shell failed: {}", e);
            self.closed.cancel();
            self.stop.cancel();
            return Err(SessionError::WriteFailed(e));
        }
        Ok(())
    }

    /// Whether the shell has ended
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolves once the shell has ended
    pub async fn closed(&self) {
        self.closed.cancelled().await
    }

    /// Open a capture window that collects output until it is closed
    pub fn open_capture(&self) -> Result<CaptureWindow, SessionError> {
        CaptureWindow::open(Arc::clone(&self.capture), self.closed.clone())
    }

    /// Collect everything the shell prints during `settle`
    pub async fn capture(&self, settle: Duration) -> Result<Captured, SessionError> {
        let window = self.open_capture()?;
        window.settle(settle).await;
        Ok(window.close())
    }

    /// Send `exit`, wait `grace`, then stop the reader and shut the write
    /// side. Calling it again does nothing.
    pub async fn close(&mut self, grace: Duration) {
        if self.reader.is_none() {
            return;
        }

        if !self.is_closed() && self.send("exit").await.is_ok() {
            tokio::select! {
                _ = tokio::time::sleep(grace) => {}
                _ = self.closed.cancelled() => {}
            }
        }

        self.shutdown().await;
    }

    /// Stop immediately without saying goodbye to the remote shell
    pub async fn shutdown(&mut self) {
        self.stop.cancel();
        self.closed.cancel();

        if let Err(e) = self.writer.lock().await.shutdown().await {
            tracing::trace!("Shutting down shell writer: {}", e);
        }

        if let Some(handle) = self.reader.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Shell reader task failed: {}", e);
            }
        }
        if let Some(handle) = self.forwarder.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Shell event forwarder failed: {}", e);
            }
        }
    }
}

impl Drop for InteractiveSession {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Deliver queued events in order. Once the session is stopping, events
/// that do not fit in the queue are dropped.
async fn forward_events(
    mut pending: mpsc::UnboundedReceiver<ClientEvent>,
    events: EventSender,
    stop: CancellationToken,
) {
    while let Some(event) = pending.recv().await {
        tokio::select! {
            biased;
            _ = events.send(event) => {}
            _ = stop.cancelled() => {}
        }
    }
}

fn publish(capture: &CaptureSlot, pending: &mpsc::UnboundedSender<ClientEvent>, text: String) {
    if text.is_empty() {
        return;
    }
    capture.append(&text);
    let _ = pending.send(ClientEvent::Output(text));
}

async fn read_loop<R>(
    mut reader: R,
    capture: Arc<CaptureSlot>,
    pending: mpsc::UnboundedSender<ClientEvent>,
    stop: CancellationToken,
    closed: CancellationToken,
    lease: Option<SlotLease>,
) where
    R: AsyncRead + Send + Unpin,
{
    let mut decoder = Utf8Decoder::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    let reason = loop {
        let read = tokio::select! {
            _ = stop.cancelled() => break "closed".to_string(),
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => break "end of stream".to_string(),
            Ok(n) => {
                let text = decoder.decode(&buf[..n]);
                publish(&capture, &pending, text);
            }
            Err(e) => break format!("read error: {}", e),
        }
    };

    publish(&capture, &pending, decoder.finish());

    tracing::debug!("Interactive session ended: {}", reason);
    closed.cancel();
    drop(lease);
    let _ = pending.send(ClientEvent::SessionClosed { reason });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::event_channel;
    use tokio::io::{duplex, AsyncBufReadExt, BufReader};

    #[tokio::test]
    async fn test_output_events_in_order() {
        let (local, remote) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let (_remote_read, mut remote_write) = tokio::io::split(remote);
        let (tx, mut rx) = event_channel(16);

        let _session = InteractiveSession::spawn(read_half, Box::new(write_half), tx, None);

        remote_write.write_all(b"first ").await.unwrap();
        let mut seen = String::new();
        while seen != "first " {
            match rx.recv().await.unwrap() {
                ClientEvent::Output(text) => seen.push_str(&text),
                other => panic!("unexpected event: {:?}", other),
            }
        }

        remote_write.write_all(b"second").await.unwrap();
        while seen != "first second" {
            if let ClientEvent::Output(text) = rx.recv().await.unwrap() {
                seen.push_str(&text);
            }
        }
    }

    #[tokio::test]
    async fn test_send_appends_newline() {
        let (local, remote) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let (remote_read, _remote_write) = tokio::io::split(remote);
        let (tx, _rx) = event_channel(16);

        let session = InteractiveSession::spawn(read_half, Box::new(write_half), tx, None);
        session.send("3").await.unwrap();
        session.send("").await.unwrap();

        let mut lines = BufReader::new(remote_read).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("3"));
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some(""));
    }

    #[tokio::test]
    async fn test_end_of_stream_closes_session() {
        let (local, remote) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let (tx, mut rx) = event_channel(16);
        let slot = InteractiveSlot::new();
        let lease = slot.try_acquire().unwrap();

        let session =
            InteractiveSession::spawn(read_half, Box::new(write_half), tx, Some(lease));
        drop(remote);

        session.closed().await;
        assert!(session.is_closed());
        assert!(matches!(
            session.send("2").await,
            Err(SessionError::ChannelUnusable)
        ));

        loop {
            if let ClientEvent::SessionClosed { reason } = rx.recv().await.unwrap() {
                assert_eq!(reason, "end of stream");
                break;
            }
        }
        assert!(!slot.is_taken());
    }

    #[tokio::test]
    async fn test_slot_allows_one_session() {
        let slot = InteractiveSlot::new();
        let lease = slot.try_acquire().unwrap();
        assert!(matches!(
            slot.try_acquire(),
            Err(ChannelError::SessionAlreadyActive)
        ));
        drop(lease);
        assert!(slot.try_acquire().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_consumer_does_not_stall_capture() {
        let (local, remote) = duplex(64);
        let (read_half, write_half) = tokio::io::split(local);
        let (_remote_read, mut remote_write) = tokio::io::split(remote);
        // Nobody reads `_rx`, so the queue fills after one event
        let (tx, _rx) = event_channel(1);

        let session = InteractiveSession::spawn(read_half, Box::new(write_half), tx, None);
        let window = session.open_capture().unwrap();

        let mut expected = String::new();
        for i in 0..40 {
            let line = format!("prod {} file{}.pgm\n", 1000 + i, i);
            expected.push_str(&line);
            tokio::time::timeout(Duration::from_secs(5), remote_write.write_all(line.as_bytes()))
                .await
                .expect("reader stopped draining the shell")
                .unwrap();
        }

        window.settle(Duration::from_secs(1)).await;
        let captured = window.close();
        assert_eq!(captured.text, expected);
        assert!(!captured.end_of_stream);
    }

    #[tokio::test]
    async fn test_output_precedes_session_closed() {
        let (local, remote) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let (tx, mut rx) = event_channel(1);

        let session = InteractiveSession::spawn(read_half, Box::new(write_half), tx, None);
        let (remote_read, mut remote_write) = tokio::io::split(remote);
        remote_write.write_all(b"bye").await.unwrap();
        drop(remote_write);
        drop(remote_read);
        session.closed().await;

        let mut seen = String::new();
        loop {
            match rx.recv().await.unwrap() {
                ClientEvent::Output(text) => seen.push_str(&text),
                ClientEvent::SessionClosed { reason } => {
                    assert_eq!(reason, "end of stream");
                    break;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }
        assert_eq!(seen, "bye");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_sends_exit_and_is_idempotent() {
        let (local, remote) = duplex(1024);
        let (read_half, write_half) = tokio::io::split(local);
        let (remote_read, _remote_write) = tokio::io::split(remote);
        let (tx, _rx) = event_channel(16);

        let mut session = InteractiveSession::spawn(read_half, Box::new(write_half), tx, None);
        session.close(Duration::from_millis(500)).await;
        session.close(Duration::from_millis(500)).await;
        assert!(session.is_closed());

        let mut lines = BufReader::new(remote_read).lines();
        assert_eq!(lines.next_line().await.unwrap().as_deref(), Some("exit"));
        assert_eq!(lines.next_line().await.unwrap(), None);
    }
}
