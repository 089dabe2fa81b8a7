//! Trailing-edge debounce of map bounding-box changes.

use crate::domain::BoundingBox;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Quiet period required before a viewport change is considered settled.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(150);

/// Input side of a running tracker.
#[derive(Debug, Clone)]
pub struct ViewportHandle {
    changes: mpsc::UnboundedSender<BoundingBox>,
}

impl ViewportHandle {
    /// Reports a raw bounding-box change from the map surface.
    ///
    /// Returns `false` once the tracker has stopped.
    pub fn notify(&self, bbox: BoundingBox) -> bool {
        self.changes.send(bbox).is_ok()
    }
}

/// Debounced, cancellable viewport subscription.
///
/// Each change restarts the window. When the window elapses with no further
/// change, the most recent box is emitted, unless it equals the box emitted
/// last. The tracker stops when its token is cancelled or every handle is
/// dropped; a change still buffered at that point is discarded.
#[derive(Debug)]
pub struct ViewportTracker {
    window: Duration,
    changes: mpsc::UnboundedReceiver<BoundingBox>,
    settled: mpsc::UnboundedSender<BoundingBox>,
    cancel: CancellationToken,
    pending: Option<BoundingBox>,
    deadline: Option<Instant>,
    last_emitted: Option<BoundingBox>,
}

impl ViewportTracker {
    /// Spawns a tracker task on the current Tokio runtime.
    ///
    /// Returns the handle to feed changes into and the receiver of settled
    /// bounding boxes.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(
        window: Duration,
        cancel: CancellationToken,
    ) -> (ViewportHandle, mpsc::UnboundedReceiver<BoundingBox>) {
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        let (settled_tx, settled_rx) = mpsc::unbounded_channel();

        let tracker = Self {
            window,
            changes: changes_rx,
            settled: settled_tx,
            cancel,
            pending: None,
            deadline: None,
            last_emitted: None,
        };
        tokio::spawn(tracker.run());

        (ViewportHandle { changes: changes_tx }, settled_rx)
    }

    async fn run(mut self) {
        tracing::debug!(window_ms = self.window.as_millis(), "viewport tracker started");

        loop {
            let wake = self.deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                biased;

                () = self.cancel.cancelled() => break,

                change = self.changes.recv() => match change {
                    Some(bbox) => {
                        tracing::trace!(?bbox, "viewport changed");
                        self.pending = Some(bbox);
                        self.deadline = Some(Instant::now() + self.window);
                    }
                    None => break,
                },

                () = tokio::time::sleep_until(wake), if self.deadline.is_some() => {
                    self.deadline = None;
                    if !self.flush() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("viewport tracker stopped");
    }

    /// Emits the buffered box. Returns `false` when nobody listens anymore.
    fn flush(&mut self) -> bool {
        let Some(bbox) = self.pending.take() else {
            return true;
        };
        if self.last_emitted == Some(bbox) {
            tracing::debug!(?bbox, "viewport settled on unchanged bounds, skipping");
            return true;
        }
        self.last_emitted = Some(bbox);
        tracing::debug!(?bbox, "viewport settled");
        self.settled.send(bbox).is_ok()
    }
}
