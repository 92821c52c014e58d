//! Finished captures and their persisted document form.

mod store;

pub use store::{artifact_name, load, SessionStore};

use serde::{Deserialize, Serialize};

use crate::{AvatarFrame, MocapError, Result};

/// An ordered, immutable sequence of frames plus capture metadata.
///
/// `frame_count` and `total_duration` are derived from the frames so they
/// can never drift from them.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    capture_date: String,
    capture_start_time: f32,
    frames: Vec<AvatarFrame>,
}

impl Session {
    /// Builds a session, rejecting frame sequences whose timestamps go
    /// backwards.
    pub fn new(
        capture_date: impl Into<String>,
        capture_start_time: f32,
        frames: Vec<AvatarFrame>,
    ) -> Result<Self> {
        if let Some(index) = frames
            .windows(2)
            .position(|pair| pair[1].timestamp() < pair[0].timestamp())
        {
            return Err(MocapError::malformed(format!(
                "frame {} timestamp {} precedes {}",
                index + 1,
                frames[index + 1].timestamp(),
                frames[index].timestamp()
            )));
        }

        Ok(Self {
            capture_date: capture_date.into(),
            capture_start_time,
            frames,
        })
    }

    pub fn capture_date(&self) -> &str {
        &self.capture_date
    }

    /// Engine time at which the capture started.
    pub fn capture_start_time(&self) -> f32 {
        self.capture_start_time
    }

    /// Timestamp of the last frame, or zero for an empty session.
    pub fn total_duration(&self) -> f32 {
        self.frames.last().map(AvatarFrame::timestamp).unwrap_or(0.0)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[AvatarFrame] {
        &self.frames
    }

    pub fn frame(&self, index: usize) -> Option<&AvatarFrame> {
        self.frames.get(index)
    }

    /// Mean spacing between consecutive frames. `None` with fewer than two
    /// frames.
    pub fn average_interval(&self) -> Option<f32> {
        let (first, last) = (self.frames.first()?, self.frames.last()?);
        if self.frames.len() < 2 {
            return None;
        }
        Some((last.timestamp() - first.timestamp()) / (self.frames.len() - 1) as f32)
    }

    /// Index of the first frame at or after `seconds`, clamped to the last
    /// frame. `None` for an empty session.
    pub fn index_at(&self, seconds: f32) -> Option<usize> {
        if self.frames.is_empty() {
            return None;
        }
        let index = self
            .frames
            .partition_point(|frame| frame.timestamp() < seconds);
        Some(index.min(self.frames.len() - 1))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentOut<'a> {
    capture_date: &'a str,
    capture_start_time: f32,
    total_duration: f32,
    frame_count: usize,
    frames: &'a [AvatarFrame],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentIn {
    capture_date: String,
    capture_start_time: f32,
    total_duration: f32,
    frame_count: i64,
    frames: Vec<AvatarFrame>,
}

/// Encodes a session as a pretty-printed JSON document. Field order is
/// fixed, so equal sessions always produce identical text.
pub fn serialize(session: &Session) -> Result<String> {
    let document = DocumentOut {
        capture_date: &session.capture_date,
        capture_start_time: session.capture_start_time,
        total_duration: session.total_duration(),
        frame_count: session.frame_count(),
        frames: &session.frames,
    };
    serde_json::to_string_pretty(&document).map_err(|err| MocapError::malformed(err.to_string()))
}

/// Decodes a session document.
///
/// The declared `frameCount` must match the decoded frames exactly. A
/// `totalDuration` that disagrees with the last frame is only logged; the
/// frames are authoritative.
pub fn deserialize(document: &str) -> Result<Session> {
    let raw: DocumentIn =
        serde_json::from_str(document).map_err(|err| MocapError::malformed(err.to_string()))?;

    let actual = raw.frames.len();
    if usize::try_from(raw.frame_count).ok() != Some(actual) {
        return Err(MocapError::InconsistentFrameCount {
            declared: raw.frame_count,
            actual,
        });
    }

    let session = Session::new(raw.capture_date, raw.capture_start_time, raw.frames)?;
    if (session.total_duration() - raw.total_duration).abs() > f32::EPSILON {
        tracing::warn!(
            declared = raw.total_duration,
            actual = session.total_duration(),
            "session totalDuration disagrees with its frames"
        );
    }
    Ok(session)
}
