//! Exit channel: how any component asks the supervising loop to shut down.

use tokio::sync::{mpsc, Mutex};

/// Single-slot channel carrying a process exit code.
///
/// One sender slot is buffered so a request posted before the
/// supervising loop starts waiting is not lost; a second request made
/// before the first is drained waits until it is.
#[derive(Debug)]
pub struct ExitChannel {
    tx: mpsc::Sender<i32>,
    rx: Mutex<mpsc::Receiver<i32>>,
}

impl ExitChannel {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self {
            tx,
            rx: Mutex::new(rx),
        }
    }

    /// Post an exit code. Returns `false` if the receiver is gone.
    pub async fn request(&self, code: i32) -> bool {
        self.tx.send(code).await.is_ok()
    }

    /// Post an exit code without waiting. Returns `false` if a request is
    /// already pending.
    pub fn try_request(&self, code: i32) -> bool {
        self.tx.try_send(code).is_ok()
    }

    /// Wait for the next exit code.
    pub async fn recv(&self) -> Option<i32> {
        self.rx.lock().await.recv().await
    }

    /// Discard codes left over from an earlier invocation. Returns how
    /// many were dropped.
    pub async fn drain(&self) -> usize {
        let mut rx = self.rx.lock().await;
        let mut dropped = 0;
        while rx.try_recv().is_ok() {
            dropped += 1;
        }
        dropped
    }
}

impl Default for ExitChannel {
    fn default() -> Self {
        Self::new()
    }
}
