//! Core library for recording and replaying avatar motion captures.
//!
//! Capture samples a live rig at a fixed cadence into a growing frame
//! buffer, sessions persist that buffer as a JSON document, and playback
//! maps driver time back onto the frame sequence, pushing each due frame
//! into a rig sink. Everything is tick-driven and single-threaded: the
//! driver owns the clock and calls into the core once per update.

pub mod capture;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod frame;
pub mod playback;
pub mod rig;
pub mod session;
pub mod studio;

pub use capture::CaptureController;
pub use config::{AppConfig, CaptureConfig, PlaybackConfig, RigConfig};
pub use dispatch::FrameDispatcher;
pub use error::{MocapError, Result};
pub use frame::{AvatarFrame, FaceFrame, HandFrame, PoseFrame};
pub use playback::{PlaybackScheduler, PlaybackState, PlaybackStatus};
pub use rig::{
    FieldSample, FieldValue, HandSide, RecordingSink, RigPart, RigSink, RigSource, SinkError,
    Vec2, Vec3,
};
pub use session::{artifact_name, Session, SessionStore};
pub use studio::{Studio, TickReport};
