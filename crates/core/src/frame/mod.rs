//! Plain frame data captured from and replayed into the avatar rig.
//!
//! Field names and nesting double as the persisted wire format, so the
//! serde attributes here must stay compatible with earlier captures.

use serde::{Deserialize, Serialize};

use crate::{Vec2, Vec3};

/// Torso pose for one timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoseFrame {
    pub timestamp: f32,
    pub neck_rotation: Vec3,
    pub chest_rotation: Vec3,
    pub hips_rotation: Vec3,
    pub hips_position: Vec3,
    pub right_shoulder_position: Vec3,
    pub right_elbow_position: Vec3,
    pub right_hand_position: Vec3,
    pub left_shoulder_position: Vec3,
    pub left_elbow_position: Vec3,
    pub left_hand_position: Vec3,
    /// Leg rotations are only present when leg tracking was enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_upper_leg_rotation: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_lower_leg_rotation: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_upper_leg_rotation: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_lower_leg_rotation: Option<Vec3>,
}

impl PoseFrame {
    /// Removes the optional leg rotations.
    pub fn clear_legs(&mut self) {
        self.right_upper_leg_rotation = None;
        self.right_lower_leg_rotation = None;
        self.left_upper_leg_rotation = None;
        self.left_lower_leg_rotation = None;
    }
}

/// Wrist plus 15 finger joints (5 digits x pip/dip/tip) for one hand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandFrame {
    pub timestamp: f32,
    pub wrist_rotation: Vec3,
    pub index_pip_rotation: Vec3,
    pub index_dip_rotation: Vec3,
    pub index_tip_rotation: Vec3,
    pub middle_pip_rotation: Vec3,
    pub middle_dip_rotation: Vec3,
    pub middle_tip_rotation: Vec3,
    pub ring_pip_rotation: Vec3,
    pub ring_dip_rotation: Vec3,
    pub ring_tip_rotation: Vec3,
    pub pinky_pip_rotation: Vec3,
    pub pinky_dip_rotation: Vec3,
    pub pinky_tip_rotation: Vec3,
    pub thumb_pip_rotation: Vec3,
    pub thumb_dip_rotation: Vec3,
    pub thumb_tip_rotation: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceFrame {
    pub timestamp: f32,
    pub mouth_open: f32,
    pub left_eye_iris: Vec2,
    pub right_eye_iris: Vec2,
    pub left_eye_open: f32,
    pub right_eye_open: f32,
}

/// Everything captured for the avatar at one logical timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarFrame {
    pub pose: PoseFrame,
    pub right_hand: HandFrame,
    pub left_hand: HandFrame,
    pub face: FaceFrame,
}

impl AvatarFrame {
    /// Logical timestamp of the frame. All parts share it.
    pub fn timestamp(&self) -> f32 {
        self.pose.timestamp
    }

    /// Stamps every part with the same timestamp.
    pub fn stamp(&mut self, timestamp: f32) {
        self.pose.timestamp = timestamp;
        self.right_hand.timestamp = timestamp;
        self.left_hand.timestamp = timestamp;
        self.face.timestamp = timestamp;
    }

    pub fn at(timestamp: f32) -> Self {
        let mut frame = Self::default();
        frame.stamp(timestamp);
        frame
    }
}
