//! Background pose intake.
//!
//! Spawns a thread that owns the `PoseSource` and hands frames over through a
//! single-slot mailbox. When a frame arrives while the previous one is still
//! waiting, the waiting one is discarded: only the newest frame is worth
//! processing. End of stream is latched so the consumer can drain and stop.
//! [`FrameFeed::stalled_for`] reports how long the source has been silent.
//!
//! Each `FrameFeed` owns exactly one thread, joined when the feed is dropped.
use crossbeam_channel as xch;
use reptrack_traits::PoseFrame;
use reptrack_traits::PoseSource;
use reptrack_traits::clock::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct FrameFeed {
    rx: xch::Receiver<PoseFrame>,
    received: Arc<AtomicU64>,
    dropped: Arc<AtomicU64>,
    errors: Arc<AtomicU64>,
    last_ok: Arc<AtomicU64>,
    ended: Arc<AtomicBool>,
    epoch: Instant,
    clock: Arc<dyn Clock + Send + Sync>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl FrameFeed {
    pub fn spawn<S: PoseSource + Send + 'static, C: Clock + Send + Sync + 'static>(
        mut source: S,
        timeout: Duration,
        clock: C,
    ) -> Self {
        let (tx, rx) = xch::bounded(1);
        let drain = rx.clone();
        let shutdown = Arc::new(AtomicBool::new(false));
        let received = Arc::new(AtomicU64::new(0));
        let dropped = Arc::new(AtomicU64::new(0));
        let errors = Arc::new(AtomicU64::new(0));
        let last_ok = Arc::new(AtomicU64::new(0));
        let ended = Arc::new(AtomicBool::new(false));
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(clock);
        let epoch = clock.now();

        let join_handle = {
            let shutdown = Arc::clone(&shutdown);
            let received = Arc::clone(&received);
            let dropped = Arc::clone(&dropped);
            let errors = Arc::clone(&errors);
            let last_ok = Arc::clone(&last_ok);
            let ended = Arc::clone(&ended);
            let clock = Arc::clone(&clock);
            std::thread::spawn(move || {
                loop {
                    if shutdown.load(Ordering::Relaxed) {
                        tracing::debug!("frame feed received shutdown signal");
                        break;
                    }
                    match source.next_frame(timeout) {
                        Ok(Some(frame)) => {
                            last_ok.store(clock.ms_since(epoch), Ordering::Relaxed);
                            received.fetch_add(1, Ordering::Relaxed);
                            if let Err(xch::TrySendError::Full(frame)) = tx.try_send(frame) {
                                if drain.try_recv().is_ok() {
                                    dropped.fetch_add(1, Ordering::Relaxed);
                                }
                                if tx.try_send(frame).is_err() {
                                    dropped.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                        }
                        Ok(None) => {
                            tracing::debug!("pose source reached end of stream");
                            ended.store(true, Ordering::Release);
                            break;
                        }
                        Err(e) => {
                            errors.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(error = %e, "pose source read failed");
                        }
                    }
                }
                tracing::trace!("frame feed thread exiting cleanly");
            })
        };

        Self {
            rx,
            received,
            dropped,
            errors,
            last_ok,
            ended,
            epoch,
            clock,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    /// Newest pending frame, if any.
    pub fn latest(&self) -> Option<PoseFrame> {
        self.rx.try_iter().last()
    }

    /// Wait up to `timeout` for the next frame.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PoseFrame> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// The source has ended and every delivered frame was taken.
    pub fn is_finished(&self) -> bool {
        self.ended.load(Ordering::Acquire) && self.rx.is_empty()
    }

    pub fn received(&self) -> u64 {
        self.received.load(Ordering::Relaxed)
    }

    /// Frames replaced by a newer one before they were taken.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Milliseconds since the source last produced a frame.
    pub fn stalled_for(&self) -> u64 {
        self.clock
            .ms_since(self.epoch)
            .saturating_sub(self.last_ok.load(Ordering::Relaxed))
    }
}

impl Drop for FrameFeed {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // The thread notices after its current read returns (at most `timeout`).
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => {
                    tracing::trace!("frame feed thread joined");
                }
                Err(e) => {
                    tracing::warn!(?e, "frame feed thread panicked during shutdown");
                }
            }
        }
    }
}
