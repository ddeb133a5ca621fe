//! Raw MIDI event plumbing for the pad input path.
//!
//! The gateway reacts to exactly one message family (note-on for the pads,
//! channel 10), so incoming traffic is kept as a raw three-byte tuple
//! instead of going through a full parser.

/// Status byte the MiniLab mkII pads emit: note-on on channel 10.
pub const PAD_NOTE_ON: u8 = 0x99;

/// Velocity reported for a pad press.
pub const VELOCITY_PRESS: u8 = 127;

/// Velocity reported for a pad release.
pub const VELOCITY_RELEASE: u8 = 0;

/// A raw channel-voice message as delivered by the input callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMidiEvent {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl RawMidiEvent {
    /// Build from a raw callback buffer.
    ///
    /// Anything shorter than a three-byte message, or starting with a data
    /// byte (running status), is not a pad event and is dropped upstream.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 3 || data[0] < 0x80 {
            return None;
        }
        Some(Self {
            status: data[0],
            data1: data[1] & 0x7F,
            data2: data[2] & 0x7F,
        })
    }

    /// Whether this is a pad note-on event.
    pub fn is_pad_note(&self) -> bool {
        self.status == PAD_NOTE_ON
    }
}

/// Format MIDI bytes as hex string for debugging
pub fn format_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
