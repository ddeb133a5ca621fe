//! minilab-mutesync - mirror mixer mute state onto MiniLab mkII pad LEDs.
//!
//! The core is a per-pad feedback state machine: a muted channel blinks its
//! pad between off and the configured mute color, an unmuted channel shows
//! its resting color. Mute state comes either from polling the Voicemeeter
//! Remote API (mirror mode) or from the controller's own pad presses
//! (direct mode).

pub mod blink;
pub mod config;
pub mod controller;
pub mod device;
pub mod error;
pub mod leds;
pub mod midi;
pub mod mixer;
pub mod store;
