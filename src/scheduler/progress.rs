//! Progress reporting from the coordinating thread
use crossbeam_channel::{Receiver, Sender};

/// Receives the fraction of frames muxed so far, in `[0, 1]` and never decreasing
///
/// Called on the coordinating thread after every appended frame; keep it short.
pub trait ProgressReporter: Send {
    fn on_progress(&mut self, fraction: f32);
}

/// Discards progress
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn on_progress(&mut self, _: f32) {}
}

impl<F: FnMut(f32) + Send> ProgressReporter for F {
    fn on_progress(&mut self, fraction: f32) {
        self(fraction)
    }
}

/// Queues progress for another thread to consume
pub struct ProgressSender {
    tx: Sender<f32>,
}

/// Consumer end of [`progress_channel`]
pub type ProgressReceiver = Receiver<f32>;

/// Creates a reporter that never blocks the coordinator, plus the queue it feeds.
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (ProgressSender { tx }, rx)
}

impl ProgressReporter for ProgressSender {
    fn on_progress(&mut self, fraction: f32) {
        // Nobody listening is fine.
        let _ = self.tx.send(fraction);
    }
}
