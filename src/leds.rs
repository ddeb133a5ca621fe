//! Pad backlight control for the MiniLab mkII.
//!
//! Builds the vendor sysex frame that sets one pad's LED color and writes it
//! to the shared output handle. Sends are best-effort: a missing device or a
//! transport error is logged and absorbed, and the LED heals on the next
//! state change.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::FeedbackError;
use crate::midi::format_hex;

/// Arturia manufacturer/device prefix plus the pad-color command header.
const FRAME_HEADER: [u8; 9] = [0xF0, 0x00, 0x20, 0x6B, 0x7F, 0x42, 0x02, 0x00, 0x10];

/// Pads are addressed at 0x70 + button index.
const PAD_BASE_ADDRESS: u8 = 0x70;

const SYSEX_END: u8 = 0xF7;

/// Palette value that turns a pad's backlight off.
pub const COLOR_OFF: u8 = 0x00;

/// Build the 12-byte color command for one pad.
pub fn sysex_frame(button_index: usize, color: u8) -> [u8; 12] {
    let mut frame = [0u8; 12];
    frame[..9].copy_from_slice(&FRAME_HEADER);
    frame[9] = PAD_BASE_ADDRESS + button_index as u8;
    frame[10] = color;
    frame[11] = SYSEX_END;
    frame
}

/// Transport the emitter writes frames to.
///
/// midir's output connection implements this; tests substitute a recorder.
pub trait MidiSink: Send {
    fn send(&mut self, message: &[u8]) -> Result<(), FeedbackError>;
}

impl MidiSink for midir::MidiOutputConnection {
    fn send(&mut self, message: &[u8]) -> Result<(), FeedbackError> {
        midir::MidiOutputConnection::send(self, message)
            .map_err(|e| FeedbackError::SendFailure(e.to_string()))
    }
}

/// Shared handle to the pad backlight output.
///
/// Cloned into every blink task and the controller; the inner mutex
/// serializes frames on the single device handle.
#[derive(Clone)]
pub struct PadLeds {
    sink: Arc<Mutex<Option<Box<dyn MidiSink>>>>,
}

impl PadLeds {
    /// Create a handle with no device attached. Sends are no-ops until
    /// [`attach`](Self::attach) is called.
    pub fn disconnected() -> Self {
        Self {
            sink: Arc::new(Mutex::new(None)),
        }
    }

    pub fn new(sink: Box<dyn MidiSink>) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Some(sink))),
        }
    }

    /// Attach (or replace) the output device.
    pub fn attach(&self, sink: Box<dyn MidiSink>) {
        *self.sink.lock() = Some(sink);
    }

    /// Drop the output device. Subsequent sends become no-ops.
    pub fn detach(&self) {
        *self.sink.lock() = None;
    }

    pub fn is_attached(&self) -> bool {
        self.sink.lock().is_some()
    }

    /// Set one pad's backlight color.
    ///
    /// Never fails from the caller's point of view: with no device attached
    /// this silently returns, and transport errors are logged and absorbed.
    pub fn send_color(&self, button_index: usize, color: u8) {
        let frame = sysex_frame(button_index, color);

        let mut sink = self.sink.lock();
        match &mut *sink {
            Some(conn) => {
                if let Err(e) = conn.send(&frame) {
                    warn!("LED send failed for pad {}: {}", button_index, e);
                } else {
                    debug!("LED TX pad {} | {}", button_index, format_hex(&frame));
                }
            },
            None => {
                debug!(
                    "LED send skipped (no output device): pad {} color {:#04X}",
                    button_index, color
                );
            },
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_layout() {
        let frame = sysex_frame(3, 0x05);
        assert_eq!(
            frame,
            [0xF0, 0x00, 0x20, 0x6B, 0x7F, 0x42, 0x02, 0x00, 0x10, 0x73, 0x05, 0xF7]
        );
    }

    #[test]
    fn test_frame_first_pad() {
        let frame = sysex_frame(0, 0x7F);
        assert_eq!(frame[9], 0x70);
        assert_eq!(frame[10], 0x7F);
        assert_eq!(frame[0], 0xF0);
        assert_eq!(frame[11], 0xF7);
    }

    #[test]
    fn test_send_without_device_is_noop() {
        let leds = PadLeds::disconnected();
        // Must not panic or error
        leds.send_color(0, 0x01);
        assert!(!leds.is_attached());
    }

    #[test]
    fn test_send_records_frame() {
        let log = recording::FrameLog::new();
        let leds = log.leds();

        leds.send_color(2, 0x04);

        let frames = log.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0], sysex_frame(2, 0x04).to_vec());
    }

    #[test]
    fn test_detach_stops_sending() {
        let log = recording::FrameLog::new();
        let leds = log.leds();

        leds.send_color(0, 0x01);
        leds.detach();
        leds.send_color(0, 0x02);

        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_failed_send_is_absorbed() {
        struct BrokenSink;
        impl MidiSink for BrokenSink {
            fn send(&mut self, _message: &[u8]) -> Result<(), FeedbackError> {
                Err(FeedbackError::SendFailure("device unplugged".into()))
            }
        }

        let leds = PadLeds::new(Box::new(BrokenSink));
        // Absorbed, not propagated
        leds.send_color(0, 0x01);
    }
}
