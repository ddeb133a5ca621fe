//! Button state store - the single source of truth for pad state.
//!
//! One entry per configured pad, created at startup and alive for the whole
//! process. The mute/blink flags are atomics so the poll loop, the input
//! consumer, and the blink tasks can read and update them without locking.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::ButtonConfig;
use crate::error::FeedbackError;

struct ButtonEntry {
    config: ButtonConfig,
    muted: AtomicBool,
    blinking: AtomicBool,
}

/// Per-button color configuration and live mute/blink flags.
pub struct ButtonStore {
    entries: Vec<ButtonEntry>,
    note_index: HashMap<u8, usize>,
}

impl ButtonStore {
    pub fn new(configs: &[ButtonConfig]) -> Self {
        let mut note_index = HashMap::new();
        for (index, config) in configs.iter().enumerate() {
            // First mapping wins if a note number is configured twice
            note_index.entry(config.note).or_insert(index);
        }

        let entries = configs
            .iter()
            .map(|config| ButtonEntry {
                config: config.clone(),
                muted: AtomicBool::new(false),
                blinking: AtomicBool::new(false),
            })
            .collect();

        Self {
            entries,
            note_index,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, index: usize) -> Result<&ButtonEntry, FeedbackError> {
        self.entries
            .get(index)
            .ok_or(FeedbackError::InvalidButtonIndex {
                index,
                count: self.entries.len(),
            })
    }

    /// Button index for a pad note number, if the note is mapped.
    pub fn index_for_note(&self, note: u8) -> Option<usize> {
        self.note_index.get(&note).copied()
    }

    pub fn is_muted(&self, index: usize) -> Result<bool, FeedbackError> {
        Ok(self.entry(index)?.muted.load(Ordering::SeqCst))
    }

    pub fn set_muted(&self, index: usize, muted: bool) -> Result<(), FeedbackError> {
        self.entry(index)?.muted.store(muted, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_blinking(&self, index: usize) -> Result<bool, FeedbackError> {
        Ok(self.entry(index)?.blinking.load(Ordering::SeqCst))
    }

    pub fn set_blinking(&self, index: usize, blinking: bool) -> Result<(), FeedbackError> {
        self.entry(index)?.blinking.store(blinking, Ordering::SeqCst);
        Ok(())
    }

    pub fn default_color(&self, index: usize) -> Result<u8, FeedbackError> {
        Ok(self.entry(index)?.config.default_color)
    }

    pub fn mute_color(&self, index: usize) -> Result<u8, FeedbackError> {
        Ok(self.entry(index)?.config.mute_color)
    }

    /// Mixer strip mirrored by this button.
    pub fn strip(&self, index: usize) -> Result<usize, FeedbackError> {
        Ok(self.entry(index)?.config.strip)
    }

    pub fn label(&self, index: usize) -> Result<&str, FeedbackError> {
        Ok(self.entry(index)?.config.label.as_str())
    }
}
