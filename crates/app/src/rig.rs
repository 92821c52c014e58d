//! Stand-in rig endpoints for driving the core without a tracking backend.

use avatar_mocap_core::{
    FaceFrame, FieldSample, FieldValue, HandFrame, HandSide, PoseFrame, RigSink, RigSource,
    SinkError, Vec2, Vec3,
};

/// Procedural rig: a slow torso sway, a waving right arm, curling fingers
/// and a talking mouth. Values only depend on the timestamp.
#[derive(Debug, Clone, Copy)]
pub struct SyntheticRig {
    pub legs: bool,
}

impl RigSource for SyntheticRig {
    fn pose(&self, t: f32) -> PoseFrame {
        let sway = (t * 0.8).sin() * 10.0;
        let wave = (t * 4.0).sin();
        let legs = self.legs.then(|| Vec3::new((t * 2.0).sin() * 15.0, 0.0, 0.0));

        PoseFrame {
            timestamp: t,
            neck_rotation: Vec3::new(0.0, sway * 0.5, 0.0),
            chest_rotation: Vec3::new(0.0, sway, 0.0),
            hips_rotation: Vec3::new(0.0, sway * 0.25, 0.0),
            hips_position: Vec3::new(0.0, 1.0, 0.0),
            right_shoulder_position: Vec3::new(0.2, 1.45, 0.0),
            right_elbow_position: Vec3::new(0.35, 1.6, 0.05),
            right_hand_position: Vec3::new(0.35 + wave * 0.15, 1.85, 0.1),
            left_shoulder_position: Vec3::new(-0.2, 1.45, 0.0),
            left_elbow_position: Vec3::new(-0.3, 1.2, 0.0),
            left_hand_position: Vec3::new(-0.32, 0.95, 0.05),
            right_upper_leg_rotation: legs,
            right_lower_leg_rotation: legs,
            left_upper_leg_rotation: legs,
            left_lower_leg_rotation: legs,
        }
    }

    fn hand(&self, side: HandSide, t: f32) -> HandFrame {
        let phase = match side {
            HandSide::Right => 0.0,
            HandSide::Left => std::f32::consts::PI,
        };
        let curl = Vec3::new(0.0, 0.0, ((t * 3.0 + phase).sin() * 0.5 + 0.5) * 60.0);

        HandFrame {
            timestamp: t,
            wrist_rotation: Vec3::new(0.0, 0.0, (t * 4.0 + phase).sin() * 20.0),
            index_pip_rotation: curl,
            index_dip_rotation: curl,
            index_tip_rotation: curl,
            middle_pip_rotation: curl,
            middle_dip_rotation: curl,
            middle_tip_rotation: curl,
            ring_pip_rotation: curl,
            ring_dip_rotation: curl,
            ring_tip_rotation: curl,
            pinky_pip_rotation: curl,
            pinky_dip_rotation: curl,
            pinky_tip_rotation: curl,
            thumb_pip_rotation: Vec3::ZERO,
            thumb_dip_rotation: Vec3::ZERO,
            thumb_tip_rotation: Vec3::ZERO,
        }
    }

    fn face(&self, t: f32) -> FaceFrame {
        let glance = Vec2::new((t * 0.5).sin() * 0.3, 0.0);
        let blink = if (t % 4.0) < 0.15 { 0.0 } else { 1.0 };

        FaceFrame {
            timestamp: t,
            mouth_open: ((t * 9.0).sin() * 0.5 + 0.5).clamp(0.0, 1.0),
            left_eye_iris: glance,
            right_eye_iris: glance,
            left_eye_open: blink,
            right_eye_open: blink,
        }
    }
}

/// Sink that reports what it receives through `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink {
    fields: usize,
    last_timestamp: Option<f32>,
    frames: usize,
}

impl TracingSink {
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn fields(&self) -> usize {
        self.fields
    }
}

impl RigSink for TracingSink {
    fn push(&mut self, sample: FieldSample) -> Result<(), SinkError> {
        if self.last_timestamp != Some(sample.timestamp) {
            self.last_timestamp = Some(sample.timestamp);
            self.frames += 1;
            tracing::debug!(timestamp = sample.timestamp, frame = self.frames, "applying frame");
        }
        self.fields += 1;

        match sample.value {
            FieldValue::Rotation(v) | FieldValue::Position(v) => {
                tracing::trace!(field = %sample.qualified_name(), x = v.x, y = v.y, z = v.z)
            }
            FieldValue::Point(v) => {
                tracing::trace!(field = %sample.qualified_name(), x = v.x, y = v.y)
            }
            FieldValue::Scalar(value) => {
                tracing::trace!(field = %sample.qualified_name(), value)
            }
        }
        Ok(())
    }
}
