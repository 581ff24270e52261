//! `lightcraft-protocol` – the Previzion serial wire format.
//!
//! [`frame`] assembles the fixed 48-byte telemetry frame from a decomposed
//! pose, position and timecode, and can parse one back for diagnostics.

pub mod frame;

pub use frame::{
    DecodedFrame, FRAME_LEN, FramePayload, HEADER, POSITION_SCALE, WireFrame, checksum, encode,
    reverse_bytes, reverse_f32_bytes,
};
