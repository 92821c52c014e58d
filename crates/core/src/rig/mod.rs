//! Boundary between the capture/playback core and the live avatar rig.
//!
//! The rig itself (solvers, smoothing containers, bone transforms) lives
//! outside this crate. Capture reads from it through [`RigSource`] and
//! playback writes to it through [`RigSink`], one named field at a time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{FaceFrame, HandFrame, PoseFrame};

/// Three component vector. Rotations are Euler angles in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Two component vector used for iris positions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self::new(0.0, 0.0);

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandSide {
    Left,
    Right,
}

/// Which part of the avatar a field belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RigPart {
    Pose,
    RightHand,
    LeftHand,
    Face,
}

impl RigPart {
    /// Key used for the part in persisted documents.
    pub fn as_str(self) -> &'static str {
        match self {
            RigPart::Pose => "pose",
            RigPart::RightHand => "rightHand",
            RigPart::LeftHand => "leftHand",
            RigPart::Face => "face",
        }
    }
}

impl From<HandSide> for RigPart {
    fn from(side: HandSide) -> Self {
        match side {
            HandSide::Left => RigPart::LeftHand,
            HandSide::Right => RigPart::RightHand,
        }
    }
}

impl fmt::Display for RigPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a single rig field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Rotation(Vec3),
    Position(Vec3),
    Point(Vec2),
    Scalar(f32),
}

/// One `(timestamp, value)` pair addressed to a named rig field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSample {
    pub part: RigPart,
    /// Field name as it appears in persisted documents, e.g. `neckRotation`.
    pub field: &'static str,
    pub timestamp: f32,
    pub value: FieldValue,
}

impl FieldSample {
    /// `part.field`, used in logs and error reports.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.part, self.field)
    }
}

/// Failure reported by a [`RigSink`] for a single field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new<T: Into<String>>(reason: T) -> Self {
        Self(reason.into())
    }
}

/// Read side of the rig, sampled while capturing.
///
/// Implementations must not mutate the rig. The timestamp is a hint for
/// sources that interpolate; the capture controller re-stamps every part
/// with the capture time regardless.
pub trait RigSource {
    fn pose(&self, timestamp: f32) -> PoseFrame;

    fn hand(&self, side: HandSide, timestamp: f32) -> HandFrame;

    fn face(&self, timestamp: f32) -> FaceFrame;
}

/// Write side of the rig, fed during playback.
///
/// A sink may smooth or interpolate internally. Returning an error aborts
/// the rest of the frame being dispatched.
pub trait RigSink {
    fn push(&mut self, sample: FieldSample) -> std::result::Result<(), SinkError>;
}

impl<T: RigSink + ?Sized> RigSink for &mut T {
    fn push(&mut self, sample: FieldSample) -> std::result::Result<(), SinkError> {
        (**self).push(sample)
    }
}

/// Sink that keeps every pushed sample in order. Handy for tests and for
/// tooling that wants to inspect a dispatch.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    samples: Vec<FieldSample>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn samples(&self) -> &[FieldSample] {
        &self.samples
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Distinct timestamps in the order they were first seen.
    pub fn timestamps(&self) -> Vec<f32> {
        let mut seen: Vec<f32> = Vec::new();
        for sample in &self.samples {
            if seen.last() != Some(&sample.timestamp) {
                seen.push(sample.timestamp);
            }
        }
        seen
    }
}

impl RigSink for RecordingSink {
    fn push(&mut self, sample: FieldSample) -> std::result::Result<(), SinkError> {
        self.samples.push(sample);
        Ok(())
    }
}
