//! Tick-driven playback of a loaded [`Session`].
//!
//! The scheduler maps driver time onto an index into the session. Time is
//! tracked as an anchor pair: at driver time `anchor_now` the session was
//! at `anchor_elapsed`, so `target = anchor_elapsed + (now - anchor_now) * speed`.
//! Every frame whose timestamp is at or before `target` is dispatched in
//! order. Pausing, seeking and speed changes re-anchor so the target never
//! jumps.

use serde::Serialize;

use crate::{FrameDispatcher, MocapError, PlaybackConfig, Result, RigSink, Session};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaybackState {
    /// No session loaded.
    Idle,
    /// Session loaded, not advancing. Also where `stop` lands.
    Ready,
    Playing,
    Paused,
    /// Every frame was dispatched; playback halted on its own.
    Completed,
}

/// Snapshot of the scheduler for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackStatus {
    pub state: PlaybackState,
    pub index: usize,
    pub frame_count: usize,
    pub speed: f32,
    /// Fraction of frames dispatched, in `[0, 1]`.
    pub progress: f32,
    pub capture_date: Option<String>,
    pub total_duration: f32,
}

#[derive(Debug)]
pub struct PlaybackScheduler {
    session: Option<Session>,
    state: PlaybackState,
    index: usize,
    speed: f32,
    min_speed: f32,
    max_speed: f32,
    speed_step: f32,
    anchor_now: f64,
    anchor_elapsed: f64,
    last_now: f64,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::with_config(&PlaybackConfig::default())
    }
}

impl PlaybackScheduler {
    /// Creates an idle scheduler. The speed range in `config` is validated
    /// first, so an inverted or non-finite range is an `InvalidConfig` error.
    pub fn new(config: &PlaybackConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: &PlaybackConfig) -> Self {
        Self {
            session: None,
            state: PlaybackState::Idle,
            index: 0,
            speed: config.speed.clamp(config.min_speed, config.max_speed),
            min_speed: config.min_speed,
            max_speed: config.max_speed,
            speed_step: config.speed_step,
            anchor_now: 0.0,
            anchor_elapsed: 0.0,
            last_now: 0.0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Index of the next frame to dispatch.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Replaces the loaded session and rewinds to its first frame.
    pub fn load(&mut self, session: Session) {
        tracing::info!(
            frames = session.frame_count(),
            duration = session.total_duration(),
            "session ready for playback"
        );
        self.session = Some(session);
        self.index = 0;
        self.state = PlaybackState::Ready;
    }

    /// Starts or resumes playback at driver time `now`.
    ///
    /// Resuming lines the target up with the current frame's timestamp so
    /// time spent paused is skipped rather than replayed. Playing again
    /// after completion starts over.
    pub fn play(&mut self, now: f64) -> Result<()> {
        let frame_count = self.frame_count()?;

        match self.state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Completed => self.index = 0,
            _ => {}
        }

        if self.index >= frame_count {
            self.state = PlaybackState::Completed;
            tracing::info!(frames = frame_count, "playback completed");
            return Ok(());
        }

        let resumed = self.state == PlaybackState::Paused;
        self.rebase(now);
        self.state = PlaybackState::Playing;

        if resumed {
            tracing::info!(index = self.index, "playback resumed");
        } else {
            tracing::info!(
                index = self.index,
                frames = frame_count,
                speed = self.speed,
                "playback started"
            );
        }
        Ok(())
    }

    /// Freezes advancement. Ignored unless playing.
    pub fn pause(&mut self) -> Result<()> {
        self.frame_count()?;
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
            tracing::info!(index = self.index, "playback paused");
        }
        Ok(())
    }

    /// Plays from Ready, Paused or Completed; pauses while playing.
    pub fn toggle(&mut self, now: f64) -> Result<()> {
        if self.state == PlaybackState::Playing {
            self.pause()
        } else {
            self.play(now)
        }
    }

    /// Halts playback and rewinds to frame 0.
    pub fn stop(&mut self) -> Result<()> {
        self.frame_count()?;
        if self.state != PlaybackState::Ready || self.index != 0 {
            tracing::info!(index = self.index, "playback stopped");
        }
        self.index = 0;
        self.state = PlaybackState::Ready;
        Ok(())
    }

    /// Dispatches every frame that has become due by `now` and returns how
    /// many were dispatched. Does nothing unless playing.
    ///
    /// A sink failure is returned as is; the failing frame stays current
    /// and playback keeps its state.
    pub fn advance<K: RigSink + ?Sized>(
        &mut self,
        now: f64,
        dispatcher: &FrameDispatcher,
        sink: &mut K,
    ) -> Result<usize> {
        if self.state != PlaybackState::Playing {
            return Ok(0);
        }
        self.last_now = now;

        let Some(session) = self.session.as_ref() else {
            return Err(MocapError::NoSessionLoaded);
        };
        let frames = session.frames();
        let target = self.target_elapsed(now);

        let mut dispatched = 0;
        while let Some(frame) = frames.get(self.index) {
            if f64::from(frame.timestamp()) > target {
                break;
            }
            dispatcher.dispatch(frame, sink)?;
            self.index += 1;
            dispatched += 1;
        }

        if self.index >= frames.len() {
            self.state = PlaybackState::Completed;
            tracing::info!(frames = frames.len(), "playback completed");
        }
        Ok(dispatched)
    }

    /// Elapsed session time that `now` maps onto.
    pub fn target_elapsed(&self, now: f64) -> f64 {
        self.anchor_elapsed + (now - self.anchor_now) * f64::from(self.speed)
    }

    /// Driver time at which session time zero falls at the current speed.
    pub fn reference_start(&self) -> f64 {
        self.anchor_now - self.anchor_elapsed / f64::from(self.speed)
    }

    /// Sets the speed factor, clamped to the configured range, and returns
    /// the applied value. Zero, negative and non-finite factors are
    /// rejected.
    pub fn set_speed(&mut self, factor: f32) -> Result<f32> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(MocapError::InvalidSpeed(factor));
        }

        let speed = factor.clamp(self.min_speed, self.max_speed);
        if self.state == PlaybackState::Playing {
            // Keep the target continuous at the last observed tick.
            self.anchor_elapsed = self.target_elapsed(self.last_now);
            self.anchor_now = self.last_now;
        }
        self.speed = speed;

        tracing::info!(speed, "playback speed changed");
        Ok(speed)
    }

    pub fn increase_speed(&mut self) -> Result<f32> {
        self.step_speed(self.speed_step)
    }

    pub fn decrease_speed(&mut self) -> Result<f32> {
        self.step_speed(-self.speed_step)
    }

    /// Moves to the frame at `index`, clamped to the last frame, and
    /// returns the index reached.
    pub fn seek(&mut self, index: usize) -> Result<usize> {
        let frame_count = self.frame_count()?;
        self.index = index.min(frame_count.saturating_sub(1));

        match self.state {
            PlaybackState::Completed => self.state = PlaybackState::Ready,
            PlaybackState::Playing => self.rebase(self.last_now),
            _ => {}
        }

        tracing::debug!(index = self.index, "playback seek");
        Ok(self.index)
    }

    /// Moves to the first frame at or after `seconds` of session time.
    pub fn seek_time(&mut self, seconds: f32) -> Result<usize> {
        let index = self
            .session
            .as_ref()
            .ok_or(MocapError::NoSessionLoaded)?
            .index_at(seconds)
            .unwrap_or(0);
        self.seek(index)
    }

    pub fn status(&self) -> PlaybackStatus {
        let frame_count = self.session.as_ref().map(Session::frame_count).unwrap_or(0);
        let progress = if frame_count == 0 {
            if self.state == PlaybackState::Completed {
                1.0
            } else {
                0.0
            }
        } else {
            self.index as f32 / frame_count as f32
        };

        PlaybackStatus {
            state: self.state,
            index: self.index,
            frame_count,
            speed: self.speed,
            progress,
            capture_date: self.session.as_ref().map(|s| s.capture_date().to_string()),
            total_duration: self.session.as_ref().map(Session::total_duration).unwrap_or(0.0),
        }
    }

    fn frame_count(&self) -> Result<usize> {
        self.session
            .as_ref()
            .map(Session::frame_count)
            .ok_or(MocapError::NoSessionLoaded)
    }

    /// Session time implied by the current frame; zero before the first.
    fn implied_elapsed(&self) -> f64 {
        if self.index == 0 {
            return 0.0;
        }
        self.session
            .as_ref()
            .and_then(|session| session.frame(self.index))
            .map(|frame| f64::from(frame.timestamp()))
            .unwrap_or(0.0)
    }

    fn rebase(&mut self, now: f64) {
        self.anchor_elapsed = self.implied_elapsed();
        self.anchor_now = now;
        self.last_now = now;
    }

    fn step_speed(&mut self, delta: f32) -> Result<f32> {
        let raw = self.speed + delta;
        let snapped = (raw / self.speed_step).round() * self.speed_step;
        self.set_speed(snapped.clamp(self.min_speed, self.max_speed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AvatarFrame, FieldSample, RecordingSink, SinkError};

    fn session(timestamps: &[f32]) -> Session {
        let frames = timestamps.iter().map(|&t| AvatarFrame::at(t)).collect();
        Session::new("2025-07-17 18:40:50", 0.0, frames).unwrap()
    }

    fn five_frames() -> Session {
        session(&[0.0, 0.1, 0.2, 0.3, 0.4])
    }

    fn loaded(session: Session) -> PlaybackScheduler {
        let mut scheduler = PlaybackScheduler::default();
        scheduler.load(session);
        scheduler
    }

    fn advance(scheduler: &mut PlaybackScheduler, now: f64, sink: &mut RecordingSink) -> usize {
        scheduler
            .advance(now, &FrameDispatcher::default(), sink)
            .unwrap()
    }

    #[test]
    fn commands_need_a_session() {
        let mut scheduler = PlaybackScheduler::default();
        assert_eq!(scheduler.state(), PlaybackState::Idle);
        assert!(matches!(scheduler.play(0.0), Err(MocapError::NoSessionLoaded)));
        assert!(matches!(scheduler.pause(), Err(MocapError::NoSessionLoaded)));
        assert!(matches!(scheduler.stop(), Err(MocapError::NoSessionLoaded)));
        assert!(matches!(scheduler.seek(2), Err(MocapError::NoSessionLoaded)));
        assert_eq!(scheduler.state(), PlaybackState::Idle);
    }

    #[test]
    fn drains_every_due_frame_in_one_tick() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();

        scheduler.play(10.0).unwrap();
        assert_eq!(advance(&mut scheduler, 10.25, &mut sink), 3);
        assert_eq!(scheduler.index(), 3);
        assert_eq!(scheduler.state(), PlaybackState::Playing);
        assert_eq!(sink.timestamps(), vec![0.0, 0.1, 0.2]);
    }

    #[test]
    fn completes_after_the_last_frame() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();

        scheduler.play(0.0).unwrap();
        assert_eq!(advance(&mut scheduler, 0.05, &mut sink), 1);
        assert_eq!(advance(&mut scheduler, 5.0, &mut sink), 4);
        assert_eq!(scheduler.state(), PlaybackState::Completed);
        assert_eq!(sink.timestamps(), vec![0.0, 0.1, 0.2, 0.3, 0.4]);
        assert_eq!(advance(&mut scheduler, 6.0, &mut sink), 0);
        assert_eq!(scheduler.status().progress, 1.0);

        // Playing a completed session starts over.
        scheduler.play(7.0).unwrap();
        assert_eq!(scheduler.index(), 0);
        assert_eq!(scheduler.state(), PlaybackState::Playing);
    }

    #[test]
    fn empty_session_completes_immediately() {
        let mut scheduler = loaded(session(&[]));
        let mut sink = RecordingSink::new();

        assert_eq!(scheduler.state(), PlaybackState::Ready);
        scheduler.play(1.0).unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Completed);
        assert_eq!(advance(&mut scheduler, 2.0, &mut sink), 0);
        assert!(sink.samples().is_empty());
    }

    #[test]
    fn single_frame_session_plays_once() {
        let mut scheduler = loaded(session(&[0.0]));
        let mut sink = RecordingSink::new();

        scheduler.play(3.0).unwrap();
        scheduler.pause().unwrap();
        scheduler.play(4.0).unwrap();
        assert_eq!(advance(&mut scheduler, 4.0, &mut sink), 1);
        assert_eq!(scheduler.state(), PlaybackState::Completed);
    }

    #[test]
    fn resume_does_not_jump() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();

        scheduler.play(0.0).unwrap();
        advance(&mut scheduler, 0.15, &mut sink);
        assert_eq!(scheduler.index(), 2);

        scheduler.pause().unwrap();
        assert_eq!(advance(&mut scheduler, 50.0, &mut sink), 0);

        scheduler.set_speed(2.0).unwrap();
        scheduler.play(100.0).unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Playing);
        assert_eq!(scheduler.target_elapsed(100.0), f64::from(0.2_f32));
        assert!((scheduler.reference_start() - (100.0 - f64::from(0.2_f32) / 2.0)).abs() < 1e-9);

        // The paused frame is due right away, the next one 0.05s later at 2x.
        assert_eq!(advance(&mut scheduler, 100.0, &mut sink), 1);
        assert_eq!(advance(&mut scheduler, 100.04, &mut sink), 0);
        assert_eq!(advance(&mut scheduler, 100.051, &mut sink), 1);
        assert_eq!(sink.timestamps(), vec![0.0, 0.1, 0.2, 0.3]);
    }

    #[test]
    fn speed_changes_keep_the_target_continuous() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();

        scheduler.play(0.0).unwrap();
        advance(&mut scheduler, 0.15, &mut sink);
        let before = scheduler.target_elapsed(0.15);

        scheduler.set_speed(3.0).unwrap();
        assert_eq!(scheduler.target_elapsed(0.15), before);
        assert!((scheduler.target_elapsed(0.25) - (before + 0.3)).abs() < 1e-6);
        assert!((scheduler.reference_start() - 0.1).abs() < 1e-9);
        assert_eq!(sink.timestamps(), vec![0.0, 0.1]);
    }

    #[test]
    fn speed_is_validated_and_clamped() {
        let mut scheduler = PlaybackScheduler::default();
        assert!(matches!(scheduler.set_speed(0.0), Err(MocapError::InvalidSpeed(_))));
        assert!(matches!(scheduler.set_speed(-1.0), Err(MocapError::InvalidSpeed(_))));
        assert!(matches!(
            scheduler.set_speed(f32::NAN),
            Err(MocapError::InvalidSpeed(_))
        ));
        assert_eq!(scheduler.speed(), 1.0);

        assert_eq!(scheduler.set_speed(10.0).unwrap(), 3.0);
        assert_eq!(scheduler.set_speed(0.01).unwrap(), 0.1);
    }

    #[test]
    fn inverted_speed_range_is_rejected() {
        let config = PlaybackConfig {
            min_speed: 2.0,
            max_speed: 1.0,
            ..PlaybackConfig::default()
        };
        assert!(matches!(
            PlaybackScheduler::new(&config),
            Err(MocapError::InvalidConfig(_))
        ));

        let config = PlaybackConfig {
            max_speed: f32::NAN,
            ..PlaybackConfig::default()
        };
        assert!(matches!(
            PlaybackScheduler::new(&config),
            Err(MocapError::InvalidConfig(_))
        ));

        let scheduler = PlaybackScheduler::new(&PlaybackConfig::default()).unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Idle);
        assert_eq!(scheduler.speed(), 1.0);
    }

    #[test]
    fn speed_steps_stay_on_the_grid() {
        let mut scheduler = PlaybackScheduler::default();
        let up = scheduler.increase_speed().unwrap();
        assert!((up - 1.1).abs() < 1e-5);

        for _ in 0..40 {
            scheduler.decrease_speed().unwrap();
        }
        assert!((scheduler.speed() - 0.1).abs() < 1e-6);

        for _ in 0..40 {
            scheduler.increase_speed().unwrap();
        }
        assert!((scheduler.speed() - 3.0).abs() < 1e-6);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();
        scheduler.play(0.0).unwrap();
        advance(&mut scheduler, 0.3, &mut sink);

        scheduler.stop().unwrap();
        let once = scheduler.status();
        scheduler.stop().unwrap();
        assert_eq!(scheduler.status(), once);
        assert_eq!(scheduler.index(), 0);
        assert_eq!(scheduler.state(), PlaybackState::Ready);
        assert_eq!(advance(&mut scheduler, 1.0, &mut sink), 0);
    }

    #[test]
    fn loading_resets_playback() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();
        scheduler.play(0.0).unwrap();
        advance(&mut scheduler, 0.2, &mut sink);

        scheduler.load(session(&[0.0, 1.0]));
        assert_eq!(scheduler.state(), PlaybackState::Ready);
        assert_eq!(scheduler.index(), 0);
        assert_eq!(scheduler.status().frame_count, 2);
    }

    #[test]
    fn toggle_cycles_play_and_pause() {
        let mut scheduler = loaded(five_frames());
        scheduler.toggle(0.0).unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Playing);
        scheduler.toggle(1.0).unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Paused);
        scheduler.toggle(2.0).unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Playing);
    }

    #[test]
    fn seeking_is_frame_accurate() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();

        assert_eq!(scheduler.seek(3).unwrap(), 3);
        assert_eq!(scheduler.seek(99).unwrap(), 4);
        assert_eq!(scheduler.seek_time(0.15).unwrap(), 2);

        scheduler.play(10.0).unwrap();
        assert_eq!(advance(&mut scheduler, 10.0, &mut sink), 1);
        assert_eq!(sink.timestamps(), vec![0.2]);

        // Seeking while playing continues from the new frame.
        scheduler.seek(1).unwrap();
        assert_eq!(advance(&mut scheduler, 10.0, &mut sink), 1);
        assert_eq!(scheduler.index(), 2);
        assert_eq!(scheduler.state(), PlaybackState::Playing);
    }

    #[test]
    fn seeking_after_completion_returns_to_ready() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();
        scheduler.play(0.0).unwrap();
        advance(&mut scheduler, 1.0, &mut sink);
        assert_eq!(scheduler.state(), PlaybackState::Completed);

        scheduler.seek(2).unwrap();
        assert_eq!(scheduler.state(), PlaybackState::Ready);
        assert_eq!(scheduler.index(), 2);
    }

    struct BrokenSink;

    impl RigSink for BrokenSink {
        fn push(&mut self, _sample: FieldSample) -> std::result::Result<(), SinkError> {
            Err(SinkError::new("offline"))
        }
    }

    #[test]
    fn sink_failures_keep_the_current_frame() {
        let mut scheduler = loaded(five_frames());
        scheduler.play(0.0).unwrap();

        let err = scheduler
            .advance(0.2, &FrameDispatcher::default(), &mut BrokenSink)
            .unwrap_err();
        assert!(matches!(err, MocapError::SinkRejected { .. }));
        assert_eq!(scheduler.index(), 0);
        assert_eq!(scheduler.state(), PlaybackState::Playing);
    }

    #[test]
    fn status_reports_progress() {
        let mut scheduler = loaded(five_frames());
        let mut sink = RecordingSink::new();
        scheduler.play(0.0).unwrap();
        advance(&mut scheduler, 0.15, &mut sink);

        let status = scheduler.status();
        assert_eq!(status.index, 2);
        assert_eq!(status.frame_count, 5);
        assert!((status.progress - 0.4).abs() < 1e-6);
        assert_eq!(status.capture_date.as_deref(), Some("2025-07-17 18:40:50"));
        assert_eq!(status.total_duration, 0.4);
    }
}
