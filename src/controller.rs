//! Feedback controller - drives pad LEDs from mute-state signals.
//!
//! Both operating modes funnel into the same transition:
//! a button's observed mute state changed, so update the store, start or
//! stop the blink, and repaint. Mirror mode feeds it from mixer polls,
//! direct mode from the controller's own pad presses.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use crate::blink::BlinkScheduler;
use crate::error::FeedbackError;
use crate::leds::PadLeds;
use crate::midi::{RawMidiEvent, VELOCITY_PRESS, VELOCITY_RELEASE};
use crate::mixer::MixerSource;
use crate::store::ButtonStore;

/// Gap between the per-pad sends of the startup paint pass.
const STARTUP_PAINT_SPACING: Duration = Duration::from_millis(50);

pub struct FeedbackController {
    store: Arc<ButtonStore>,
    leds: PadLeds,
    blink: Arc<BlinkScheduler>,
    /// Pause between a pad release and the resting-color repaint, so the
    /// restore never lands mid-blink-cycle as a color flash.
    release_settle: Duration,
}

impl FeedbackController {
    pub fn new(
        store: Arc<ButtonStore>,
        leds: PadLeds,
        blink: Arc<BlinkScheduler>,
        release_settle: Duration,
    ) -> Self {
        Self {
            store,
            leds,
            blink,
            release_settle,
        }
    }

    /// Paint every pad with its configured resting color.
    ///
    /// Run once at startup before entering the event loop. The spacing
    /// keeps the controller's sysex input from being flooded.
    pub async fn paint_defaults(&self) {
        for index in 0..self.store.len() {
            if let Ok(color) = self.store.default_color(index) {
                self.leds.send_color(index, color);
            }
            tokio::time::sleep(STARTUP_PAINT_SPACING).await;
        }
    }

    /// Apply an observed mute state to one button.
    ///
    /// Unchanged state is a no-op (no LED command), which is what makes
    /// reconciliation safe to run unconditionally. Returns whether a
    /// transition was applied.
    pub async fn apply_mute_state(
        &self,
        index: usize,
        muted_now: bool,
    ) -> Result<bool, FeedbackError> {
        let was_muted = self.store.is_muted(index)?;
        if was_muted == muted_now {
            return Ok(false);
        }

        self.store.set_muted(index, muted_now)?;

        if muted_now {
            let color = self.store.mute_color(index)?;
            debug!(
                "Pad {} ({}) muted, blinking {:#04X}",
                index,
                self.store.label(index)?,
                color
            );
            self.blink.start(index, color).await;
        } else {
            debug!("Pad {} ({}) unmuted", index, self.store.label(index)?);
            self.blink.stop(index).await;
        }

        Ok(true)
    }

    /// Mirror mode: reconcile one button's LED against the mixer.
    pub async fn reconcile(&self, index: usize, mixer: &dyn MixerSource) -> Result<()> {
        let strip = self.store.strip(index)?;
        let muted = mixer.strip_mute(strip).await?;
        self.apply_mute_state(index, muted).await?;
        Ok(())
    }

    /// Mirror mode: reconcile every configured button.
    ///
    /// Per-button failures are logged and skipped; the next poll pass
    /// retries naturally.
    pub async fn reconcile_all(&self, mixer: &dyn MixerSource) {
        for index in 0..self.store.len() {
            if let Err(e) = self.reconcile(index, mixer).await {
                warn!("Reconcile failed for pad {}: {}", index, e);
            }
        }
    }

    /// Direct mode: react to one raw event from the controller's pads.
    ///
    /// Everything that is not a mapped pad press or release is ignored.
    pub async fn on_note_event(&self, event: RawMidiEvent) {
        if !event.is_pad_note() {
            trace!("Ignoring non-pad event: status {:#04X}", event.status);
            return;
        }

        let index = match self.store.index_for_note(event.data1) {
            Some(index) => index,
            None => {
                trace!("Ignoring unmapped pad note {}", event.data1);
                return;
            },
        };

        match event.data2 {
            VELOCITY_PRESS => {
                // Press while already muted is a no-op
                if let Err(e) = self.apply_mute_state(index, true).await {
                    warn!("Press handling failed for pad {}: {}", index, e);
                }
            },
            VELOCITY_RELEASE => {
                if !self.store.is_muted(index).unwrap_or(false) {
                    return;
                }
                if self.store.set_muted(index, false).is_err() {
                    return;
                }
                self.blink.halt(index).await;

                // Let the final blink cycle die down before repainting
                tokio::time::sleep(self.release_settle).await;
                if let Ok(color) = self.store.default_color(index) {
                    self.leds.send_color(index, color);
                }
            },
            velocity => {
                trace!("Ignoring pad {} velocity {}", event.data1, velocity);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ButtonConfig;
    use crate::leds::recording::FrameLog;
    use crate::leds::COLOR_OFF;
    use crate::midi::PAD_NOTE_ON;
    use crate::mixer::ConsoleMixer;

    const HALF: Duration = Duration::from_millis(500);
    const SETTLE: Duration = Duration::from_millis(100);

    fn test_button(note: u8, strip: usize, default_color: u8, mute_color: u8) -> ButtonConfig {
        ButtonConfig {
            note,
            label: format!("Pad {}", note),
            strip,
            default_color,
            mute_color,
        }
    }

    /// Distinct default/mute colors so restores are distinguishable from
    /// blink frames in the recorded traffic.
    fn test_buttons() -> Vec<ButtonConfig> {
        vec![
            test_button(48, 0, 0x01, 0x11),
            test_button(49, 1, 0x10, 0x12),
            test_button(50, 2, 0x04, 0x13),
        ]
    }

    fn make_controller(log: &FrameLog) -> (Arc<ButtonStore>, FeedbackController) {
        let store = Arc::new(ButtonStore::new(&test_buttons()));
        let leds = log.leds();
        let blink = Arc::new(BlinkScheduler::new(store.clone(), leds.clone(), HALF));
        let controller = FeedbackController::new(store.clone(), leds, blink, SETTLE);
        (store, controller)
    }

    fn pad_event(note: u8, velocity: u8) -> RawMidiEvent {
        RawMidiEvent {
            status: PAD_NOTE_ON,
            data1: note,
            data2: velocity,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconcile_unchanged_state_sends_nothing() {
        let log = FrameLog::new();
        let (_store, controller) = make_controller(&log);
        let mixer = ConsoleMixer::new(8);

        controller.reconcile(0, &mixer).await.unwrap();
        assert_eq!(log.len(), 0);

        mixer.set_strip_mute(0, true);
        controller.reconcile(0, &mixer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let after_transition = log.len();

        // Second pass with no mixer change: no further LED commands
        controller.reconcile(0, &mixer).await.unwrap();
        assert_eq!(log.len(), after_transition);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mirror_mute_then_unmute_sequence() {
        let log = FrameLog::new();
        let (store, controller) = make_controller(&log);
        let mixer = ConsoleMixer::new(8);

        mixer.set_strip_mute(0, true);
        controller.reconcile(0, &mixer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        mixer.set_strip_mute(0, false);
        controller.reconcile(0, &mixer).await.unwrap();

        let colors = log.colors_for(0);
        let mute_color = store.mute_color(0).unwrap();
        let default_color = store.default_color(0).unwrap();

        // Blink frames alternate off and the mute color...
        assert!(colors.len() >= 3);
        for (i, &color) in colors[..colors.len() - 1].iter().enumerate() {
            let expected = if i % 2 == 0 { COLOR_OFF } else { mute_color };
            assert_eq!(color, expected, "frame {} of {:?}", i, colors);
        }

        // ...and exactly one restore closes the sequence
        assert_eq!(colors.last(), Some(&default_color));
        assert_eq!(
            colors.iter().filter(|&&c| c == default_color).count(),
            1,
            "restore must appear exactly once: {:?}",
            colors
        );
        assert!(!store.is_muted(0).unwrap());
        assert!(!store.is_blinking(0).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_press_release_scenario() {
        let log = FrameLog::new();
        let (store, controller) = make_controller(&log);

        // Note 50 maps to button 2
        controller.on_note_event(pad_event(50, 127)).await;
        assert!(store.is_muted(2).unwrap());
        assert!(store.is_blinking(2).unwrap());

        // Release lands within the first blink half-period
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.on_note_event(pad_event(50, 0)).await;

        assert!(!store.is_muted(2).unwrap());
        assert!(!store.is_blinking(2).unwrap());

        // One blink-start frame, then one settle-delayed restore
        let default_color = store.default_color(2).unwrap();
        assert_eq!(log.colors_for(2), vec![COLOR_OFF, default_color]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_press_is_noop() {
        let log = FrameLog::new();
        let (store, controller) = make_controller(&log);

        controller.on_note_event(pad_event(48, 127)).await;
        tokio::time::sleep(Duration::from_millis(1)).await;
        let frames_after_first = log.len();

        controller.on_note_event(pad_event(48, 127)).await;
        controller.on_note_event(pad_event(48, 127)).await;

        assert!(store.is_muted(0).unwrap());
        assert!(store.is_blinking(0).unwrap());
        assert_eq!(log.len(), frames_after_first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_without_press_is_ignored() {
        let log = FrameLog::new();
        let (store, controller) = make_controller(&log);

        controller.on_note_event(pad_event(48, 0)).await;

        assert!(!store.is_muted(0).unwrap());
        assert_eq!(log.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmapped_and_foreign_events_ignored() {
        let log = FrameLog::new();
        let (_store, controller) = make_controller(&log);

        // Unmapped note
        controller.on_note_event(pad_event(99, 127)).await;
        // Wrong status byte (note-on, channel 1)
        controller
            .on_note_event(RawMidiEvent {
                status: 0x90,
                data1: 48,
                data2: 127,
            })
            .await;
        // In-between velocity
        controller.on_note_event(pad_event(48, 64)).await;

        assert_eq!(log.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paint_defaults_covers_every_pad() {
        let log = FrameLog::new();
        let (store, controller) = make_controller(&log);

        controller.paint_defaults().await;

        assert_eq!(log.len(), store.len());
        for index in 0..store.len() {
            assert_eq!(
                log.colors_for(index),
                vec![store.default_color(index).unwrap()]
            );
        }
    }

    #[test]
    fn test_press_release_parity() {
        use proptest::prelude::*;

        proptest!(ProptestConfig::with_cases(64), |(events in proptest::collection::vec(any::<bool>(), 0..12))| {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            rt.block_on(async {
                let log = FrameLog::new();
                let (store, controller) = make_controller(&log);

                // Reference model: press mutes, release unmutes, anything
                // redundant is a no-op
                let mut expected = false;
                for &press in &events {
                    let velocity = if press { 127 } else { 0 };
                    controller.on_note_event(pad_event(50, velocity)).await;
                    expected = press;
                }

                prop_assert_eq!(store.is_muted(2).unwrap(), expected);
                // Blinking only ever accompanies mute
                if store.is_blinking(2).unwrap() {
                    prop_assert!(store.is_muted(2).unwrap());
                }
                Ok(())
            })?;
        });
    }
}
