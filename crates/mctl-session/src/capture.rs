//! Capture windows over interactive output
//!
//! While a window is open, every chunk the reader decodes is also appended
//! to it. Only one window may be open per session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::SessionError;

/// Shared slot the reader task appends into
#[derive(Debug, Default)]
pub(crate) struct CaptureSlot {
    buffer: Mutex<Option<String>>,
}

impl CaptureSlot {
    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start an empty capture
    pub(crate) fn open(&self) -> Result<(), SessionError> {
        let mut buffer = self.lock();
        if buffer.is_some() {
            return Err(SessionError::CaptureAlreadyOpen);
        }
        *buffer = Some(String::new());
        Ok(())
    }

    /// Append if a capture is open
    pub(crate) fn append(&self, text: &str) {
        if let Some(buffer) = self.lock().as_mut() {
            buffer.push_str(text);
        }
    }

    fn peek(&self) -> String {
        self.lock().clone().unwrap_or_default()
    }

    fn take(&self) -> String {
        self.lock().take().unwrap_or_default()
    }
}

/// Text collected by a closed window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub text: String,
    /// The shell ended before the window closed
    pub end_of_stream: bool,
}

/// An open capture window. Dropping it closes the window.
#[derive(Debug)]
pub struct CaptureWindow {
    slot: Arc<CaptureSlot>,
    closed: CancellationToken,
    open: bool,
}

impl CaptureWindow {
    pub(crate) fn open(
        slot: Arc<CaptureSlot>,
        closed: CancellationToken,
    ) -> Result<Self, SessionError> {
        slot.open()?;
        Ok(Self {
            slot,
            closed,
            open: true,
        })
    }

    /// Text captured so far
    pub fn snapshot(&self) -> String {
        self.slot.peek()
    }

    /// Wait for `delay`, returning early if the shell ends
    pub async fn settle(&self, delay: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = self.closed.cancelled() => {}
        }
    }

    /// Close the window and return what it collected
    pub fn close(mut self) -> Captured {
        self.open = false;
        Captured {
            text: self.slot.take(),
            end_of_stream: self.closed.is_cancelled(),
        }
    }
}

impl Drop for CaptureWindow {
    fn drop(&mut self) {
        if self.open {
            self.slot.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_window_is_refused() {
        let slot = Arc::new(CaptureSlot::default());
        let token = CancellationToken::new();

        let first = CaptureWindow::open(Arc::clone(&slot), token.clone()).unwrap();
        assert!(matches!(
            CaptureWindow::open(Arc::clone(&slot), token.clone()),
            Err(SessionError::CaptureAlreadyOpen)
        ));

        drop(first);
        assert!(CaptureWindow::open(slot, token).is_ok());
    }

    #[test]
    fn test_append_only_while_open() {
        let slot = Arc::new(CaptureSlot::default());
        let token = CancellationToken::new();

        slot.append("before ");
        let window = CaptureWindow::open(Arc::clone(&slot), token).unwrap();
        slot.append("one ");
        slot.append("two");
        assert_eq!(window.snapshot(), "one two");

        let captured = window.close();
        assert_eq!(captured.text, "one two");
        assert!(!captured.end_of_stream);

        slot.append("after");
        assert_eq!(slot.peek(), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_returns_early_on_close() {
        let slot = Arc::new(CaptureSlot::default());
        let token = CancellationToken::new();
        let window = CaptureWindow::open(slot, token.clone()).unwrap();

        token.cancel();
        let start = tokio::time::Instant::now();
        window.settle(Duration::from_secs(60)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(window.close().end_of_stream);
    }
}
