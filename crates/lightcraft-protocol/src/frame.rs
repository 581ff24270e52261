//! The 48-byte Lightcraft telemetry frame.
//!
//! One frame is sent per matched motion-capture sample.  Every multi-byte
//! field is a 32-bit IEEE float transmitted big-endian; single-byte fields go
//! out as-is.  The last byte is the low 8 bits of the sum of the 47 bytes in
//! front of it.
//!
//! | Offset | Len | Field |
//! |---|---|---|
//! | 0 | 1 | header `0xD1` |
//! | 1 | 4 | timecode hour, minute, second, frame |
//! | 5 | 12 | forward vector x, y, z |
//! | 17 | 4 | roll, degrees |
//! | 21 | 12 | position x, y, z, centimetres |
//! | 33 | 14 | reserved (zoom, focus, iris, interaxial, convergence), zero |
//! | 47 | 1 | checksum |
//!
//! # Example
//!
//! ```rust
//! use lightcraft_perception::Vec3;
//! use lightcraft_protocol::frame::{FramePayload, WireFrame, encode, FRAME_LEN, HEADER};
//! use lightcraft_types::Timecode;
//!
//! let frame = encode(&FramePayload {
//!     timecode: Timecode::new(1, 2, 3, 4),
//!     forward: Vec3::unit_z(),
//!     roll_degrees: 0.0,
//!     position_m: Vec3::new(1.0, 2.0, 3.0),
//! });
//! assert_eq!(frame.as_bytes().len(), FRAME_LEN);
//! assert_eq!(frame.as_bytes()[0], HEADER);
//! assert!(WireFrame::parse(frame.as_bytes()).is_ok());
//! ```

use std::fmt::Write as _;

use lightcraft_perception::{PoseDecomposition, Vec3};
use lightcraft_types::{RelayError, Timecode};

/// Total length of a frame on the wire.
pub const FRAME_LEN: usize = 48;

/// Leading byte of every frame.
pub const HEADER: u8 = 0xD1;

/// Metres → centimetres.
pub const POSITION_SCALE: f32 = 100.0;

const TIMECODE_OFFSET: usize = 1;
const FORWARD_OFFSET: usize = 5;
const ROLL_OFFSET: usize = 17;
const POSITION_OFFSET: usize = 21;
const RESERVED_OFFSET: usize = 33;
const RESERVED_LEN: usize = 14;
const CHECKSUM_OFFSET: usize = FRAME_LEN - 1;

// ────────────────────────────────────────────────────────────────────────────
// Byte reversal and checksum
// ────────────────────────────────────────────────────────────────────────────

/// Swap the order of four raw bytes.  Applying it twice is the identity.
pub fn reverse_bytes(bytes: [u8; 4]) -> [u8; 4] {
    let [a, b, c, d] = bytes;
    [d, c, b, a]
}

/// Raw little-endian bytes of `value`, reversed: the big-endian wire image.
///
/// The swap happens on the byte array, never on the float value, so NaN
/// payloads and signed zeros survive untouched.
pub fn reverse_f32_bytes(value: f32) -> [u8; 4] {
    reverse_bytes(value.to_le_bytes())
}

/// Low 8 bits of the sum of every byte in `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

// ────────────────────────────────────────────────────────────────────────────
// Encoding
// ────────────────────────────────────────────────────────────────────────────

/// Everything that goes into one frame, before scaling and byte reversal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePayload {
    pub timecode: Timecode,
    pub forward: Vec3,
    pub roll_degrees: f32,
    /// Position in metres; scaled by [`POSITION_SCALE`] on encode.
    pub position_m: Vec3,
}

impl FramePayload {
    pub fn new(timecode: Timecode, pose: &PoseDecomposition, position_m: Vec3) -> Self {
        Self {
            timecode,
            forward: pose.forward,
            roll_degrees: pose.roll_degrees,
            position_m,
        }
    }
}

/// A fully assembled frame, checksum included.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct WireFrame([u8; FRAME_LEN]);

/// Serialise `payload` into a [`WireFrame`].
pub fn encode(payload: &FramePayload) -> WireFrame {
    let mut buf = [0u8; FRAME_LEN];
    buf[0] = HEADER;
    buf[TIMECODE_OFFSET..FORWARD_OFFSET].copy_from_slice(&payload.timecode.wire_bytes());

    let position_cm = payload.position_m * POSITION_SCALE;
    let floats = [
        payload.forward.x,
        payload.forward.y,
        payload.forward.z,
        payload.roll_degrees,
        position_cm.x,
        position_cm.y,
        position_cm.z,
    ];
    for (i, value) in floats.into_iter().enumerate() {
        let at = FORWARD_OFFSET + i * 4;
        buf[at..at + 4].copy_from_slice(&reverse_f32_bytes(value));
    }
    debug_assert_eq!(FORWARD_OFFSET + floats.len() * 4, RESERVED_OFFSET);

    // Reserved bytes stay zero.
    buf[CHECKSUM_OFFSET] = checksum(&buf[..CHECKSUM_OFFSET]);
    WireFrame(buf)
}

// ────────────────────────────────────────────────────────────────────────────
// WireFrame
// ────────────────────────────────────────────────────────────────────────────

/// Field values recovered from a frame by [`WireFrame::parse`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedFrame {
    pub timecode: Timecode,
    pub forward: Vec3,
    pub roll_degrees: f32,
    /// Position as transmitted, in centimetres.
    pub position_cm: Vec3,
}

impl WireFrame {
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn checksum(&self) -> u8 {
        self.0[CHECKSUM_OFFSET]
    }

    /// Space-separated upper-case hex, e.g. `"D1 01 02 …"`.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(FRAME_LEN * 3);
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            let _ = write!(out, "{b:02X}");
        }
        out
    }

    /// Validate and decode a received frame.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidFrame`] on a wrong length, header,
    /// checksum, or non-zero reserved bytes.
    pub fn parse(bytes: &[u8]) -> Result<DecodedFrame, RelayError> {
        let buf: &[u8; FRAME_LEN] = bytes.try_into().map_err(|_| {
            RelayError::InvalidFrame(format!("expected {FRAME_LEN} bytes, got {}", bytes.len()))
        })?;

        if buf[0] != HEADER {
            return Err(RelayError::InvalidFrame(format!(
                "bad header 0x{:02X}",
                buf[0]
            )));
        }
        let expected = checksum(&buf[..CHECKSUM_OFFSET]);
        if buf[CHECKSUM_OFFSET] != expected {
            return Err(RelayError::InvalidFrame(format!(
                "checksum mismatch: got 0x{:02X}, expected 0x{expected:02X}",
                buf[CHECKSUM_OFFSET]
            )));
        }
        if buf[RESERVED_OFFSET..RESERVED_OFFSET + RESERVED_LEN]
            .iter()
            .any(|b| *b != 0)
        {
            return Err(RelayError::InvalidFrame(
                "reserved bytes are not zero".to_string(),
            ));
        }

        let float_at = |at: usize| {
            let raw = [buf[at], buf[at + 1], buf[at + 2], buf[at + 3]];
            f32::from_le_bytes(reverse_bytes(raw))
        };

        Ok(DecodedFrame {
            timecode: Timecode::new(buf[1], buf[2], buf[3], buf[4]),
            forward: Vec3::new(
                float_at(FORWARD_OFFSET),
                float_at(FORWARD_OFFSET + 4),
                float_at(FORWARD_OFFSET + 8),
            ),
            roll_degrees: float_at(ROLL_OFFSET),
            position_cm: Vec3::new(
                float_at(POSITION_OFFSET),
                float_at(POSITION_OFFSET + 4),
                float_at(POSITION_OFFSET + 8),
            ),
        })
    }
}

impl AsRef<[u8]> for WireFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for WireFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WireFrame").field(&self.to_hex()).finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
