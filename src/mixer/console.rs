//! Console mixer - an in-memory stand-in for the real mixer.
//!
//! Useful for:
//! - Running mirror mode without Voicemeeter installed
//! - Exercising the reconcile path in tests
//! - Development on platforms without the Remote API

use anyhow::{bail, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

use super::MixerSource;

pub struct ConsoleMixer {
    strips: Mutex<Vec<bool>>,
    dirty: AtomicBool,
    logged_in: AtomicBool,
}

impl ConsoleMixer {
    pub fn new(strip_count: usize) -> Self {
        Self {
            strips: Mutex::new(vec![false; strip_count]),
            dirty: AtomicBool::new(false),
            logged_in: AtomicBool::new(false),
        }
    }

    /// Flip a simulated strip's mute flag and mark parameters dirty.
    pub fn set_strip_mute(&self, strip: usize, muted: bool) {
        let mut strips = self.strips.lock();
        if let Some(slot) = strips.get_mut(strip) {
            *slot = muted;
            self.dirty.store(true, Ordering::SeqCst);
        }
    }
}

#[async_trait]
impl MixerSource for ConsoleMixer {
    fn name(&self) -> &str {
        "console"
    }

    async fn login(&self) -> Result<()> {
        self.logged_in.store(true, Ordering::SeqCst);
        info!(
            "🔌 [{}] Console mixer session opened ({} strips)",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.strips.lock().len()
        );
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        self.logged_in.store(false, Ordering::SeqCst);
        info!("🛑 Console mixer session closed");
        Ok(())
    }

    async fn is_dirty(&self) -> Result<bool> {
        // Reading the flag clears it, like the real API
        Ok(self.dirty.swap(false, Ordering::SeqCst))
    }

    async fn strip_mute(&self, strip: usize) -> Result<bool> {
        let strips = self.strips.lock();
        match strips.get(strip) {
            Some(&muted) => Ok(muted),
            None => bail!(
                "Strip {} out of range ({} simulated strips)",
                strip,
                strips.len()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dirty_flag_clears_on_read() {
        let mixer = ConsoleMixer::new(8);

        assert!(!mixer.is_dirty().await.unwrap());

        mixer.set_strip_mute(0, true);
        assert!(mixer.is_dirty().await.unwrap());
        // Cleared by the previous read
        assert!(!mixer.is_dirty().await.unwrap());
    }

    #[tokio::test]
    async fn test_strip_mute_roundtrip() {
        let mixer = ConsoleMixer::new(8);

        assert!(!mixer.strip_mute(3).await.unwrap());
        mixer.set_strip_mute(3, true);
        assert!(mixer.strip_mute(3).await.unwrap());
        mixer.set_strip_mute(3, false);
        assert!(!mixer.strip_mute(3).await.unwrap());
    }

    #[tokio::test]
    async fn test_out_of_range_strip_errors() {
        let mixer = ConsoleMixer::new(2);

        assert!(mixer.strip_mute(5).await.is_err());
        // Out-of-range writes are dropped without marking dirty
        mixer.set_strip_mute(5, true);
        assert!(!mixer.is_dirty().await.unwrap());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let mixer = ConsoleMixer::new(1);

        mixer.login().await.unwrap();
        assert!(mixer.logged_in.load(Ordering::SeqCst));
        mixer.logout().await.unwrap();
        assert!(!mixer.logged_in.load(Ordering::SeqCst));
    }
}
