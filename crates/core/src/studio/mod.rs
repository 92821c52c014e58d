//! Command surface tying capture, persistence and playback together.
//!
//! A driver owns one [`Studio`], forwards its commands (start/stop/save
//! capture, load, play, pause, stop, speed) and calls [`Studio::tick`] once
//! per update with its clock reading. Capture and playback never run at the
//! same time: starting a capture stops playback and loading a session
//! stops the capture.

use std::path::{Path, PathBuf};

use crate::{
    AppConfig, CaptureController, FrameDispatcher, MocapError, PlaybackScheduler, PlaybackState,
    PlaybackStatus, Result, RigSink, RigSource, Session, SessionStore,
};

/// What a single [`Studio::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub captured: bool,
    pub dispatched: usize,
}

#[derive(Debug)]
pub struct Studio<S, K> {
    source: S,
    sink: K,
    capture: CaptureController,
    playback: PlaybackScheduler,
    dispatcher: FrameDispatcher,
    store: SessionStore,
    capture_started_at: f64,
}

impl<S: RigSource, K: RigSink> Studio<S, K> {
    pub fn new(config: &AppConfig, source: S, sink: K) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            sink,
            capture: CaptureController::new(&config.capture, &config.rig),
            playback: PlaybackScheduler::new(&config.playback)?,
            dispatcher: FrameDispatcher::new(&config.rig),
            store: SessionStore::new(
                &config.capture.output_dir,
                config.capture.base_name.as_str(),
            ),
            capture_started_at: 0.0,
        })
    }

    pub fn capture(&self) -> &CaptureController {
        &self.capture
    }

    pub fn playback(&self) -> &PlaybackScheduler {
        &self.playback
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.playback.status()
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Starts a new capture at driver time `now`, halting any playback.
    pub fn start_capture(&mut self, now: f64) -> Result<()> {
        if self.capture.is_capturing() {
            return Err(MocapError::AlreadyCapturing);
        }
        if matches!(
            self.playback.state(),
            PlaybackState::Playing | PlaybackState::Paused
        ) {
            self.playback.stop()?;
        }

        self.capture.start(now as f32)?;
        self.capture_started_at = now;
        Ok(())
    }

    pub fn stop_capture(&mut self) {
        self.capture.stop();
    }

    /// Stops the capture and writes it to the store. The buffer is only
    /// cleared once the file has been written.
    pub fn save_capture(&mut self) -> Result<PathBuf> {
        self.capture.stop();
        let session = self.capture.snapshot()?;
        let path = self.store.save(&session)?;
        self.capture.finalize()?;
        Ok(path)
    }

    /// Loads a session document for playback. On failure the previously
    /// loaded session stays active.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let session = self.store.load(path)?;
        self.load_session(session);
        Ok(())
    }

    pub fn load_session(&mut self, session: Session) {
        self.capture.stop();
        self.playback.load(session);
    }

    pub fn play(&mut self, now: f64) -> Result<()> {
        self.playback.play(now)
    }

    pub fn toggle(&mut self, now: f64) -> Result<()> {
        self.playback.toggle(now)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.playback.pause()
    }

    pub fn stop(&mut self) -> Result<()> {
        self.playback.stop()
    }

    pub fn set_speed(&mut self, factor: f32) -> Result<f32> {
        self.playback.set_speed(factor)
    }

    pub fn seek(&mut self, index: usize) -> Result<usize> {
        self.playback.seek(index)
    }

    /// Advances whichever of capture and playback is active.
    pub fn tick(&mut self, now: f64) -> Result<TickReport> {
        let mut report = TickReport::default();

        if self.capture.is_capturing() {
            let elapsed = (now - self.capture_started_at) as f32;
            report.captured = self.capture.tick(elapsed, &self.source);
        }
        report.dispatched = self
            .playback
            .advance(now, &self.dispatcher, &mut self.sink)?;

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        AvatarFrame, FaceFrame, FieldSample, HandFrame, HandSide, PoseFrame, RecordingSink,
        SinkError, Vec3,
    };
    use tempfile::TempDir;

    struct WavingRig;

    impl RigSource for WavingRig {
        fn pose(&self, timestamp: f32) -> PoseFrame {
            PoseFrame {
                chest_rotation: Vec3::new(0.0, timestamp * 90.0, 0.0),
                ..Default::default()
            }
        }

        fn hand(&self, _side: HandSide, _timestamp: f32) -> HandFrame {
            HandFrame::default()
        }

        fn face(&self, timestamp: f32) -> FaceFrame {
            FaceFrame {
                mouth_open: timestamp.sin().abs(),
                ..Default::default()
            }
        }
    }

    fn studio(dir: &Path) -> Studio<WavingRig, RecordingSink> {
        let mut config = AppConfig::default();
        config.capture.output_dir = dir.join("captureAvatar").to_string_lossy().into_owned();
        config.capture.rate = 20.0;
        Studio::new(&config, WavingRig, RecordingSink::new()).unwrap()
    }

    fn record(studio: &mut Studio<WavingRig, RecordingSink>, from: f64, seconds: f64) {
        studio.start_capture(from).unwrap();
        let mut now = from;
        while now < from + seconds {
            now += 0.01;
            studio.tick(now).unwrap();
        }
        studio.stop_capture();
    }

    #[test]
    fn records_saves_loads_and_replays() {
        let temp = TempDir::new().unwrap();
        let mut studio = studio(temp.path());

        record(&mut studio, 100.0, 0.5);
        let captured = studio.capture().frame_count();
        assert!((9..=10).contains(&captured), "captured {captured}");

        let path = studio.save_capture().unwrap();
        assert!(path.exists());
        assert_eq!(studio.capture().frame_count(), 0);
        assert_eq!(studio.store().list().unwrap(), vec![path.clone()]);

        studio.load(&path).unwrap();
        let session = studio.playback().session().unwrap();
        assert_eq!(session.frame_count(), captured);
        assert_eq!(session.capture_start_time(), 100.0);

        studio.play(200.0).unwrap();
        let mut now = 200.0;
        while studio.playback().state() == PlaybackState::Playing {
            now += 0.016;
            studio.tick(now).unwrap();
        }
        assert_eq!(studio.playback().state(), PlaybackState::Completed);
        assert_eq!(studio.sink().timestamps().len(), captured);
    }

    #[test]
    fn saving_an_empty_capture_fails() {
        let temp = TempDir::new().unwrap();
        let mut studio = studio(temp.path());
        assert!(matches!(studio.save_capture(), Err(MocapError::EmptyCapture)));
        assert!(studio.store().list().unwrap().is_empty());
    }

    #[test]
    fn capture_and_playback_are_exclusive() {
        let temp = TempDir::new().unwrap();
        let mut studio = studio(temp.path());
        let frames = vec![AvatarFrame::at(0.0), AvatarFrame::at(5.0)];
        let session = Session::new("x", 0.0, frames).unwrap();

        studio.load_session(session.clone());
        studio.play(0.0).unwrap();
        studio.tick(0.1).unwrap();
        assert_eq!(studio.playback().state(), PlaybackState::Playing);

        studio.start_capture(1.0).unwrap();
        assert_eq!(studio.playback().state(), PlaybackState::Ready);
        assert!(studio.capture().is_capturing());
        assert!(matches!(
            studio.start_capture(2.0),
            Err(MocapError::AlreadyCapturing)
        ));

        studio.load_session(session);
        assert!(!studio.capture().is_capturing());
    }

    #[test]
    fn failed_load_keeps_previous_session() {
        let temp = TempDir::new().unwrap();
        let mut studio = studio(temp.path());
        let session = Session::new("kept", 0.0, vec![AvatarFrame::at(0.0)]).unwrap();
        studio.load_session(session);

        let broken = temp.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        assert!(matches!(
            studio.load(&broken),
            Err(MocapError::MalformedDocument { .. })
        ));
        assert_eq!(studio.playback_status().capture_date.as_deref(), Some("kept"));
        assert_eq!(studio.playback().state(), PlaybackState::Ready);
    }

    struct DeafSink;

    impl RigSink for DeafSink {
        fn push(&mut self, sample: FieldSample) -> std::result::Result<(), SinkError> {
            Err(SinkError::new(format!("cannot drive {}", sample.field)))
        }
    }

    #[test]
    fn sink_failures_surface_from_tick() {
        let temp = TempDir::new().unwrap();
        let mut config = AppConfig::default();
        config.capture.output_dir = temp.path().to_string_lossy().into_owned();
        let mut studio = Studio::new(&config, WavingRig, DeafSink).unwrap();

        let session = Session::new("x", 0.0, vec![AvatarFrame::at(0.0)]).unwrap();
        studio.load_session(session);
        studio.play(0.0).unwrap();
        match studio.tick(0.5) {
            Err(MocapError::SinkRejected { field, .. }) => assert_eq!(field, "pose.neckRotation"),
            other => panic!("expected sink rejection, got {other:?}"),
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = AppConfig::default();
        config.playback.speed_step = 0.0;
        assert!(Studio::new(&config, WavingRig, RecordingSink::new()).is_err());
    }
}
