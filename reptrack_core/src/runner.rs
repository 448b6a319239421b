use crate::aggregator::RepCount;
use crate::config::{RunCfg, RunMode, TrackerCfg};
use crate::error::{Result, TrackerError};
use crate::exercise::ExerciseDefinition;
use crate::frame_feed::FrameFeed;
use crate::session::{Orchestrator, SessionEvent, SessionSink};
use crate::tracker::RepTracker;
use crate::util::MILLIS_PER_SEC;
use reptrack_traits::clock::{ManualClock, MonotonicClock};
use reptrack_traits::{PoseFrame, PoseSource};
use std::sync::Arc;
use std::time::Duration;

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    /// Frames skipped: replaced in the feed mailbox or out of order.
    pub dropped: u64,
    pub reps_completed: u64,
    pub reps: RepCount,
    pub records: usize,
    /// The session ran to completion.
    pub finished: bool,
    pub cancelled: bool,
    /// Frame time covered, in milliseconds.
    pub duration_ms: u64,
}

#[derive(Debug, Default)]
struct Progress {
    first_ts: Option<u64>,
    last_ts: Option<u64>,
    next_tick_ms: u64,
    cancel_hits: u8,
}

/// Drives a pose source through a tracker and, optionally, a session.
///
/// Tracker time follows frame timestamps, so a recorded stream replays with the
/// same debounce and tick timing it was captured with. Session ticks fire once
/// per second of frame time.
pub struct Runner {
    tracker: RepTracker,
    clock: ManualClock,
    cfg: RunCfg,
    read_timeout: Duration,
    cancel_check: Option<Box<dyn Fn() -> bool>>,
    cancel_debounce_n: u8,
}

impl core::fmt::Debug for Runner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Runner")
            .field("tracker", &self.tracker)
            .field("cfg", &self.cfg)
            .field("read_timeout", &self.read_timeout)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(
        exercise: Arc<ExerciseDefinition>,
        tracker_cfg: TrackerCfg,
        cfg: RunCfg,
    ) -> Result<Self> {
        let clock = ManualClock::new();
        let tracker = RepTracker::builder()
            .with_exercise(exercise)
            .with_config(tracker_cfg)
            .with_clock(clock.clone())
            .build()?;
        Ok(Self {
            tracker,
            clock,
            cfg,
            read_timeout: Duration::from_millis(500),
            cancel_check: None,
            cancel_debounce_n: 1,
        })
    }

    /// Stop once `check` has returned true on `debounce_n` consecutive polls.
    pub fn with_cancel<F>(mut self, check: F, debounce_n: u8) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.cancel_check = Some(Box::new(check));
        self.cancel_debounce_n = debounce_n.max(1);
        self
    }

    /// How long a single source read may block.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn tracker(&self) -> &RepTracker {
        &self.tracker
    }

    pub fn tracker_mut(&mut self) -> &mut RepTracker {
        &mut self.tracker
    }

    /// Apply session events. Returns true when one of them finished the session.
    pub fn apply(&mut self, events: Vec<SessionEvent>, sink: &mut dyn SessionSink) -> Result<bool> {
        let mut finished = false;
        for event in events {
            match event {
                SessionEvent::ExerciseChanged(ex) => self.tracker.set_exercise(ex),
                SessionEvent::SetCompleted {
                    exercise_id,
                    set_number,
                    reps,
                } => {
                    tracing::info!(
                        exercise = %exercise_id,
                        set = set_number,
                        reps,
                        "set completed"
                    );
                }
                SessionEvent::Finished(record) => {
                    sink.append(&record)?;
                    finished = true;
                }
            }
        }
        Ok(finished)
    }

    fn cancelled(&self, progress: &mut Progress) -> bool {
        let Some(check) = self.cancel_check.as_ref() else {
            return false;
        };
        if check() {
            progress.cancel_hits = progress.cancel_hits.saturating_add(1);
        } else {
            progress.cancel_hits = 0;
        }
        progress.cancel_hits >= self.cancel_debounce_n
    }

    /// Process one frame and let the session react. Returns true once the
    /// session has finished.
    fn on_frame(
        &mut self,
        frame: &PoseFrame,
        mut session: Option<&mut (dyn Orchestrator + '_)>,
        sink: &mut dyn SessionSink,
        progress: &mut Progress,
        summary: &mut RunSummary,
    ) -> Result<bool> {
        if progress.last_ts.is_some_and(|last| frame.timestamp_ms < last) {
            tracing::warn!(ts = frame.timestamp_ms, "out-of-order frame skipped");
            summary.dropped += 1;
            return Ok(false);
        }
        progress.last_ts = Some(frame.timestamp_ms);
        let first = *progress.first_ts.get_or_insert(frame.timestamp_ms);
        let rel = frame.timestamp_ms.saturating_sub(first);
        self.clock.set_ms(rel);

        let report = self.tracker.process_frame(&frame.landmarks);
        summary.frames += 1;
        summary.duration_ms = rel;
        if report.rep_completed() {
            summary.reps_completed += 1;
            tracing::info!(left = report.reps.left, right = report.reps.right, "rep");
        }

        let Some(session) = session.as_deref_mut() else {
            return Ok(false);
        };
        let events = session.observe(&mut self.tracker);
        if self.apply(events, sink)? {
            return Ok(true);
        }
        if progress.next_tick_ms == 0 {
            progress.next_tick_ms = MILLIS_PER_SEC;
        }
        while rel >= progress.next_tick_ms {
            progress.next_tick_ms += MILLIS_PER_SEC;
            let Some(handle) = session.timer() else {
                continue;
            };
            let events = session.tick(handle, &mut self.tracker);
            if self.apply(events, sink)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run until the source ends, the session finishes, or the cancel check fires.
    ///
    /// A session still active at that point is stopped and its partial record
    /// handed to `sink`.
    pub fn run<S>(
        &mut self,
        source: S,
        mut session: Option<&mut (dyn Orchestrator + '_)>,
        sink: &mut dyn SessionSink,
    ) -> Result<RunSummary>
    where
        S: PoseSource + Send + 'static,
    {
        let mut summary = RunSummary::default();
        let mut progress = Progress::default();
        tracing::info!(
            exercise = %self.tracker.exercise().id,
            mode = ?self.cfg.mode,
            session = ?session.as_ref().map(|s| s.kind()),
            "run start"
        );
        match self.cfg.mode {
            RunMode::Direct => {
                self.run_direct(source, session.as_deref_mut(), sink, &mut progress, &mut summary)?;
            }
            RunMode::Feed => {
                self.run_feed(source, session.as_deref_mut(), sink, &mut progress, &mut summary)?;
            }
        }
        if !summary.finished
            && let Some(session) = session.as_deref_mut()
            && session.is_active()
            && let Some(record) = session.stop(&mut self.tracker)
        {
            sink.append(&record)?;
            summary.records += 1;
        }
        summary.reps = self.tracker.reps();
        tracing::info!(
            frames = summary.frames,
            dropped = summary.dropped,
            reps = summary.reps_completed,
            finished = summary.finished,
            cancelled = summary.cancelled,
            "run complete"
        );
        Ok(summary)
    }

    fn run_direct<S: PoseSource>(
        &mut self,
        mut source: S,
        mut session: Option<&mut (dyn Orchestrator + '_)>,
        sink: &mut dyn SessionSink,
        progress: &mut Progress,
        summary: &mut RunSummary,
    ) -> Result<()> {
        loop {
            if self.cancelled(progress) {
                summary.cancelled = true;
                return Ok(());
            }
            let frame = source
                .next_frame(self.read_timeout)
                .map_err(|e| eyre::Report::new(TrackerError::Source(e.to_string())))?;
            let Some(frame) = frame else {
                return Ok(());
            };
            if self.on_frame(&frame, session.as_deref_mut(), sink, progress, summary)? {
                summary.finished = true;
                summary.records += 1;
                return Ok(());
            }
        }
    }

    fn run_feed<S: PoseSource + Send + 'static>(
        &mut self,
        source: S,
        mut session: Option<&mut (dyn Orchestrator + '_)>,
        sink: &mut dyn SessionSink,
        progress: &mut Progress,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let feed = FrameFeed::spawn(source, self.read_timeout, MonotonicClock::new());
        let period = Duration::from_micros(crate::util::period_us(self.cfg.frame_rate_hz));
        let result = loop {
            if self.cancelled(progress) {
                summary.cancelled = true;
                break Ok(());
            }
            let Some(frame) = feed.recv_timeout(period) else {
                if feed.is_finished() {
                    break Ok(());
                }
                let stalled_ms = feed.stalled_for();
                if self.cfg.stall_timeout_ms > 0 && stalled_ms >= self.cfg.stall_timeout_ms {
                    tracing::warn!(stalled_ms, "pose source went silent");
                    break Err(eyre::Report::new(TrackerError::Source(format!(
                        "no frames for {stalled_ms} ms"
                    ))));
                }
                continue;
            };
            match self.on_frame(&frame, session.as_deref_mut(), sink, progress, summary) {
                Ok(true) => {
                    summary.finished = true;
                    summary.records += 1;
                    break Ok(());
                }
                Ok(false) => {}
                Err(e) => break Err(e),
            }
        };
        summary.dropped += feed.dropped();
        if feed.errors() > 0 {
            tracing::warn!(errors = feed.errors(), "pose source reported read errors");
        }
        result
    }
}
