//! Blink scheduling for muted pads.
//!
//! One managed task per pad alternates the backlight between off and the
//! pad's mute color while the pad stays muted. Starting a new blink always
//! cancels and joins the previous task for that pad first, so at most one
//! task ever drives a given LED. Cancellation is cooperative: the loop
//! re-checks its flags after every sleep and before every send, which bounds
//! stop latency to one half-period.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::leds::{PadLeds, COLOR_OFF};
use crate::store::ButtonStore;

pub struct BlinkScheduler {
    store: Arc<ButtonStore>,
    leds: PadLeds,
    half_period: Duration,
    shutting_down: Arc<AtomicBool>,
    /// One task slot per pad; the slot lock also serializes start/stop
    /// for that pad without blocking any other pad.
    slots: Vec<Mutex<Option<JoinHandle<()>>>>,
}

fn should_blink(
    store: &ButtonStore,
    shutting_down: &AtomicBool,
    index: usize,
) -> bool {
    !shutting_down.load(Ordering::SeqCst)
        && store.is_blinking(index).unwrap_or(false)
        && store.is_muted(index).unwrap_or(false)
}

impl BlinkScheduler {
    pub fn new(store: Arc<ButtonStore>, leds: PadLeds, half_period: Duration) -> Self {
        let slots = (0..store.len()).map(|_| Mutex::new(None)).collect();
        Self {
            store,
            leds,
            half_period,
            shutting_down: Arc::new(AtomicBool::new(false)),
            slots,
        }
    }

    /// Start blinking a pad with the given color.
    ///
    /// Any blink task already running for this pad is cancelled and joined
    /// before the new loop is spawned, so two loops never race on one LED.
    pub async fn start(&self, index: usize, blink_color: u8) {
        let slot = match self.slots.get(index) {
            Some(slot) => slot,
            None => {
                debug!("Blink start ignored for unknown pad {}", index);
                return;
            },
        };
        let mut slot = slot.lock().await;

        // Wind down the previous loop before replacing it
        let _ = self.store.set_blinking(index, false);
        if let Some(handle) = slot.take() {
            let _ = handle.await;
        }

        if self.shutting_down.load(Ordering::SeqCst) {
            return;
        }

        let _ = self.store.set_blinking(index, true);

        let store = self.store.clone();
        let leds = self.leds.clone();
        let shutting_down = self.shutting_down.clone();
        let half_period = self.half_period;

        trace!("Blink start: pad {} color {:#04X}", index, blink_color);
        *slot = Some(tokio::spawn(async move {
            loop {
                if !should_blink(&store, &shutting_down, index) {
                    break;
                }
                leds.send_color(index, COLOR_OFF);
                tokio::time::sleep(half_period).await;

                if !should_blink(&store, &shutting_down, index) {
                    break;
                }
                leds.send_color(index, blink_color);
                tokio::time::sleep(half_period).await;
            }
            trace!("Blink loop exited: pad {}", index);
        }));
    }

    /// Cancel and join a pad's blink task without touching the LED.
    ///
    /// No-op when nothing is running. Returns whether a task was taken down.
    pub async fn halt(&self, index: usize) -> bool {
        let slot = match self.slots.get(index) {
            Some(slot) => slot,
            None => return false,
        };
        let _ = self.store.set_blinking(index, false);

        let mut slot = slot.lock().await;
        match slot.take() {
            Some(handle) => {
                let _ = handle.await;
                true
            },
            None => false,
        }
    }

    /// Stop blinking and restore the pad to its resting color.
    ///
    /// When no blink was running this sends nothing at all.
    pub async fn stop(&self, index: usize) {
        if !self.halt(index).await {
            return;
        }
        if let Ok(color) = self.store.default_color(index) {
            self.leds.send_color(index, color);
        }
    }

    /// Signal every blink loop to exit and join them all.
    ///
    /// Must complete before the output device handle is dropped so no send
    /// ever hits a closed handle.
    pub async fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        for index in 0..self.slots.len() {
            self.halt(index).await;
        }
        debug!("Blink scheduler shut down");
    }
}
