use crate::{
    AvatarFrame, FaceFrame, FieldSample, FieldValue, HandFrame, MocapError, PoseFrame, Result,
    RigConfig, RigPart, RigSink,
};

/// Pushes a frame into a [`RigSink`] one field at a time.
///
/// Order is fixed: pose, right hand, left hand, face, and within each part
/// the order the fields appear in the document. A sink failure aborts the
/// rest of the frame; fields already pushed stay applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameDispatcher {
    leg_rotation: bool,
}

impl FrameDispatcher {
    pub fn new(rig: &RigConfig) -> Self {
        Self {
            leg_rotation: rig.leg_rotation,
        }
    }

    pub fn with_leg_rotation(leg_rotation: bool) -> Self {
        Self { leg_rotation }
    }

    pub fn leg_rotation(&self) -> bool {
        self.leg_rotation
    }

    /// Dispatches every field of `frame`, returning how many were pushed.
    pub fn dispatch<K: RigSink + ?Sized>(&self, frame: &AvatarFrame, sink: &mut K) -> Result<usize> {
        let timestamp = frame.timestamp();
        let mut pushed = 0;

        let parts = [
            (RigPart::Pose, self.pose_fields(&frame.pose)),
            (RigPart::RightHand, hand_fields(&frame.right_hand)),
            (RigPart::LeftHand, hand_fields(&frame.left_hand)),
            (RigPart::Face, face_fields(&frame.face)),
        ];

        for (part, fields) in parts {
            for (field, value) in fields {
                let sample = FieldSample {
                    part,
                    field,
                    timestamp,
                    value,
                };
                sink.push(sample).map_err(|err| MocapError::SinkRejected {
                    field: sample.qualified_name(),
                    reason: err.to_string(),
                })?;
                pushed += 1;
            }
        }

        tracing::trace!(timestamp, fields = pushed, "frame dispatched");
        Ok(pushed)
    }

    fn pose_fields(&self, pose: &PoseFrame) -> Vec<(&'static str, FieldValue)> {
        use FieldValue::{Position, Rotation};

        let mut fields = vec![
            ("neckRotation", Rotation(pose.neck_rotation)),
            ("chestRotation", Rotation(pose.chest_rotation)),
            ("hipsRotation", Rotation(pose.hips_rotation)),
            ("hipsPosition", Position(pose.hips_position)),
            ("rightShoulderPosition", Position(pose.right_shoulder_position)),
            ("rightElbowPosition", Position(pose.right_elbow_position)),
            ("rightHandPosition", Position(pose.right_hand_position)),
            ("leftShoulderPosition", Position(pose.left_shoulder_position)),
            ("leftElbowPosition", Position(pose.left_elbow_position)),
            ("leftHandPosition", Position(pose.left_hand_position)),
        ];

        if self.leg_rotation {
            let legs = [
                ("rightUpperLegRotation", pose.right_upper_leg_rotation),
                ("rightLowerLegRotation", pose.right_lower_leg_rotation),
                ("leftUpperLegRotation", pose.left_upper_leg_rotation),
                ("leftLowerLegRotation", pose.left_lower_leg_rotation),
            ];
            fields.extend(
                legs.into_iter()
                    .filter_map(|(name, value)| value.map(|v| (name, Rotation(v)))),
            );
        }

        fields
    }
}

fn hand_fields(hand: &HandFrame) -> Vec<(&'static str, FieldValue)> {
    use FieldValue::Rotation;

    vec![
        ("wristRotation", Rotation(hand.wrist_rotation)),
        ("indexPipRotation", Rotation(hand.index_pip_rotation)),
        ("indexDipRotation", Rotation(hand.index_dip_rotation)),
        ("indexTipRotation", Rotation(hand.index_tip_rotation)),
        ("middlePipRotation", Rotation(hand.middle_pip_rotation)),
        ("middleDipRotation", Rotation(hand.middle_dip_rotation)),
        ("middleTipRotation", Rotation(hand.middle_tip_rotation)),
        ("ringPipRotation", Rotation(hand.ring_pip_rotation)),
        ("ringDipRotation", Rotation(hand.ring_dip_rotation)),
        ("ringTipRotation", Rotation(hand.ring_tip_rotation)),
        ("pinkyPipRotation", Rotation(hand.pinky_pip_rotation)),
        ("pinkyDipRotation", Rotation(hand.pinky_dip_rotation)),
        ("pinkyTipRotation", Rotation(hand.pinky_tip_rotation)),
        ("thumbPipRotation", Rotation(hand.thumb_pip_rotation)),
        ("thumbDipRotation", Rotation(hand.thumb_dip_rotation)),
        ("thumbTipRotation", Rotation(hand.thumb_tip_rotation)),
    ]
}

fn face_fields(face: &FaceFrame) -> Vec<(&'static str, FieldValue)> {
    use FieldValue::{Point, Scalar};

    vec![
        ("mouthOpen", Scalar(face.mouth_open)),
        ("leftEyeIris", Point(face.left_eye_iris)),
        ("rightEyeIris", Point(face.right_eye_iris)),
        ("leftEyeOpen", Scalar(face.left_eye_open)),
        ("rightEyeOpen", Scalar(face.right_eye_open)),
    ]
}
