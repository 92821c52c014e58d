use chrono::Local;

use crate::{
    AvatarFrame, CaptureConfig, HandSide, MocapError, Result, RigConfig, RigSource, Session,
};

/// Slack, in intervals, for ticks that land on a boundary the f32 clock
/// cannot represent exactly (0.7 s at 10 Hz reads as 6.99999 intervals).
const BOUNDARY_EPSILON: f64 = 1e-4;

/// Fixed-rate downsampler over the upstream update loop.
///
/// The controller owns the in-progress frame buffer until [`finalize`]
/// turns it into a [`Session`]. Sampling is anchored on the interval grid
/// measured from capture start: a frame is taken on the first tick that
/// crosses a boundary not yet captured, stamped with that tick's elapsed
/// time. Missed boundaries are not backfilled.
///
/// [`finalize`]: CaptureController::finalize
#[derive(Debug)]
pub struct CaptureController {
    rate: f32,
    leg_rotation: bool,
    is_capturing: bool,
    frames: Vec<AvatarFrame>,
    start_offset: f32,
    capture_date: String,
    last_boundary: i64,
    last_capture_time: f32,
}

impl CaptureController {
    pub fn new(capture: &CaptureConfig, rig: &RigConfig) -> Self {
        Self::with_rate(capture.rate, rig.leg_rotation)
    }

    /// Creates a controller sampling at `rate` frames per second.
    pub fn with_rate(rate: f32, leg_rotation: bool) -> Self {
        Self {
            rate,
            leg_rotation,
            is_capturing: false,
            frames: Vec::new(),
            start_offset: 0.0,
            capture_date: String::new(),
            last_boundary: 0,
            last_capture_time: 0.0,
        }
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    /// Seconds between captured frames.
    pub fn frame_interval(&self) -> f32 {
        1.0 / self.rate
    }

    pub fn is_capturing(&self) -> bool {
        self.is_capturing
    }

    /// Frames buffered since the last `start`.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[AvatarFrame] {
        &self.frames
    }

    pub fn last_capture_time(&self) -> f32 {
        self.last_capture_time
    }

    /// Begins a new capture. `start_offset` is the driver's clock reading at
    /// start and is kept as session metadata; `tick` expects times relative
    /// to it.
    pub fn start(&mut self, start_offset: f32) -> Result<()> {
        if self.is_capturing {
            return Err(MocapError::AlreadyCapturing);
        }

        self.is_capturing = true;
        self.frames.clear();
        self.start_offset = start_offset;
        self.capture_date = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.last_boundary = 0;
        self.last_capture_time = 0.0;

        tracing::info!(rate = self.rate, start_offset, "capture started");
        Ok(())
    }

    /// Samples one frame from `source` if a new interval boundary has been
    /// crossed. Returns whether a frame was captured.
    pub fn tick<S: RigSource + ?Sized>(&mut self, elapsed: f32, source: &S) -> bool {
        if !self.is_capturing {
            return false;
        }

        let boundary =
            (f64::from(elapsed) * f64::from(self.rate) + BOUNDARY_EPSILON).floor() as i64;
        if boundary <= self.last_boundary {
            return false;
        }

        let frame = self.sample(source, elapsed);
        self.frames.push(frame);
        self.last_boundary = boundary;
        self.last_capture_time = elapsed;

        tracing::trace!(elapsed, frames = self.frames.len(), "frame captured");
        true
    }

    /// Ends the capture, keeping the buffer for [`CaptureController::finalize`].
    pub fn stop(&mut self) {
        if !self.is_capturing {
            return;
        }

        self.is_capturing = false;
        tracing::info!(
            frames = self.frames.len(),
            duration = self.last_capture_time,
            "capture stopped"
        );
    }

    /// Builds a session from the buffered frames without consuming them.
    pub fn snapshot(&self) -> Result<Session> {
        if self.frames.is_empty() {
            return Err(MocapError::EmptyCapture);
        }
        Session::new(self.capture_date.clone(), self.start_offset, self.frames.clone())
    }

    /// Turns the buffered frames into a session and clears the buffer.
    /// A capture still running is stopped first.
    pub fn finalize(&mut self) -> Result<Session> {
        if self.frames.is_empty() {
            return Err(MocapError::EmptyCapture);
        }
        self.stop();

        let frames = std::mem::take(&mut self.frames);
        let session = Session::new(self.capture_date.clone(), self.start_offset, frames)?;
        tracing::debug!(frames = session.frame_count(), "capture finalized");
        Ok(session)
    }

    fn sample<S: RigSource + ?Sized>(&self, source: &S, timestamp: f32) -> AvatarFrame {
        let mut frame = AvatarFrame {
            pose: source.pose(timestamp),
            right_hand: source.hand(HandSide::Right, timestamp),
            left_hand: source.hand(HandSide::Left, timestamp),
            face: source.face(timestamp),
        };
        frame.stamp(timestamp);
        if !self.leg_rotation {
            frame.pose.clear_legs();
        }
        frame
    }
}
