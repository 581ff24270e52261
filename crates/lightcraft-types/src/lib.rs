use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// SMPTE-style timestamp attached to every motion-capture frame.
///
/// Motion servers pack hour/minute/second/frame into a single `u32` (one
/// byte each, hour in the most significant byte) and carry the subframe
/// separately.  Only the four whole-frame fields ever reach the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Timecode {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub frame: u8,
    pub subframe: u32,
}

impl Timecode {
    pub fn new(hour: u8, minute: u8, second: u8, frame: u8) -> Self {
        Self {
            hour,
            minute,
            second,
            frame,
            subframe: 0,
        }
    }

    /// Decode a packed timecode word and its subframe counter.
    pub fn decode(packed: u32, subframe: u32) -> Self {
        let [hour, minute, second, frame] = packed.to_be_bytes();
        Self {
            hour,
            minute,
            second,
            frame,
            subframe,
        }
    }

    /// Inverse of [`Timecode::decode`] for the whole-frame fields.
    pub fn pack(&self) -> u32 {
        u32::from_be_bytes([self.hour, self.minute, self.second, self.frame])
    }

    /// The four bytes transmitted on the wire, in transmission order.
    pub fn wire_bytes(&self) -> [u8; 4] {
        [self.hour, self.minute, self.second, self.frame]
    }
}

impl fmt::Display for Timecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}.{}",
            self.hour, self.minute, self.second, self.frame, self.subframe
        )
    }
}

/// One tracked rigid body inside a [`MocapFrame`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyPose {
    /// Stable identifier assigned by the motion-capture server.
    pub id: i32,
    /// Position in metres (x, y, z).
    pub position: [f32; 3],
    /// Orientation quaternion in (x, y, z, w) order.
    pub orientation: [f32; 4],
    /// `true` when the body was successfully tracked in this frame.
    #[serde(default = "default_tracking_valid")]
    pub tracking_valid: bool,
    /// Mean marker residual reported by the server, in metres.
    #[serde(default)]
    pub mean_error: f32,
}

fn default_tracking_valid() -> bool {
    true
}

impl RigidBodyPose {
    pub fn new(id: i32, position: [f32; 3], orientation: [f32; 4]) -> Self {
        Self {
            id,
            position,
            orientation,
            tracking_valid: true,
            mean_error: 0.0,
        }
    }
}

/// A single delivery from the motion source: timecode plus every rigid body
/// seen in that frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MocapFrame {
    pub frame_number: i32,
    /// Packed timecode word, see [`Timecode::decode`].
    #[serde(default)]
    pub timecode: u32,
    #[serde(default)]
    pub timecode_subframe: u32,
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBodyPose>,
}

impl MocapFrame {
    pub fn decoded_timecode(&self) -> Timecode {
        Timecode::decode(self.timecode, self.timecode_subframe)
    }

    /// First rigid body carrying `id`, if present in this frame.
    pub fn body(&self, id: i32) -> Option<&RigidBodyPose> {
        self.rigid_bodies.iter().find(|b| b.id == id)
    }
}

/// Error type shared by every Lightcraft crate.
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Transport Fault on {port}: {details}")]
    Transport { port: String, details: String },

    #[error("Malformed pose for rigid body {body_id}: {details}")]
    MalformedPose { body_id: i32, details: String },

    #[error("Motion source disconnected: {0}")]
    SourceDisconnected(String),

    #[error("Driver is not connected to a motion source")]
    NotConnected,

    #[error("Session is closed")]
    SessionClosed,

    #[error("Invalid wire frame: {0}")]
    InvalidFrame(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timecode_decode_splits_packed_word() {
        let tc = Timecode::decode(0x0102_0304, 7);
        assert_eq!(tc.hour, 1);
        assert_eq!(tc.minute, 2);
        assert_eq!(tc.second, 3);
        assert_eq!(tc.frame, 4);
        assert_eq!(tc.subframe, 7);
        assert_eq!(tc.wire_bytes(), [1, 2, 3, 4]);
    }

    #[test]
    fn timecode_pack_inverts_decode() {
        let tc = Timecode::new(23, 59, 58, 29);
        assert_eq!(Timecode::decode(tc.pack(), 0), tc);
    }

    #[test]
    fn timecode_display() {
        let tc = Timecode::decode(0x0A0B_0C0D, 1);
        assert_eq!(tc.to_string(), "10:11:12:13.1");
    }

    #[test]
    fn mocap_frame_body_lookup() {
        let frame = MocapFrame {
            frame_number: 10,
            timecode: 0,
            timecode_subframe: 0,
            rigid_bodies: vec![
                RigidBodyPose::new(1, [0.0; 3], [0.0, 0.0, 0.0, 1.0]),
                RigidBodyPose::new(42, [1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]),
            ],
        };
        assert_eq!(frame.body(42).map(|b| b.position), Some([1.0, 2.0, 3.0]));
        assert!(frame.body(7).is_none());
    }

    #[test]
    fn mocap_frame_json_defaults() {
        let json = r#"{"frame_number":3,"rigid_bodies":[{"id":42,"position":[1.0,2.0,3.0],"orientation":[0.0,0.0,0.0,1.0]}]}"#;
        let frame: MocapFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.timecode, 0);
        let body = frame.body(42).unwrap();
        assert!(body.tracking_valid);
        assert_eq!(body.mean_error, 0.0);
    }

    #[test]
    fn relay_error_display() {
        let err = RelayError::Transport {
            port: "/dev/ttyUSB0".to_string(),
            details: "broken pipe".to_string(),
        };
        assert!(err.to_string().contains("/dev/ttyUSB0"));

        let err = RelayError::MalformedPose {
            body_id: 42,
            details: "NaN".to_string(),
        };
        assert!(err.to_string().contains("42"));
    }
}
