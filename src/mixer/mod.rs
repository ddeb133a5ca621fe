//! Mixer state sources for mirror mode.
//!
//! The gateway only ever asks the mixer four things: open a session, close
//! it, "did anything change", and "is this strip muted". Everything else
//! about the mixer stays behind this seam.

use anyhow::Result;
use async_trait::async_trait;

pub mod console;
#[cfg(windows)]
pub mod voicemeeter;

pub use console::ConsoleMixer;
#[cfg(windows)]
pub use voicemeeter::VoicemeeterRemote;

/// Remote-control seam to the audio mixer.
///
/// All methods take &self to support `Arc<dyn MixerSource>`; implementations
/// use interior mutability for their session state.
#[async_trait]
pub trait MixerSource: Send + Sync {
    /// Backend name for logs (e.g. "voicemeeter", "console")
    fn name(&self) -> &str;

    /// Open the remote-control session. Failure here is fatal at startup.
    async fn login(&self) -> Result<()>;

    /// Close the session. Called once during shutdown.
    async fn logout(&self) -> Result<()>;

    /// True when any mixer parameter changed since the last call.
    ///
    /// Purely an optimization gate for the poll loop; reconciliation is
    /// idempotent and may run unconditionally.
    async fn is_dirty(&self) -> Result<bool>;

    /// Mute flag of one input strip.
    async fn strip_mute(&self, strip: usize) -> Result<bool>;
}

/// Parameter name addressing one strip's mute flag.
pub(crate) fn strip_mute_param(strip: usize) -> String {
    format!("Strip[{}].Mute", strip)
}

/// The remote API reports parameters as floats; >= 1.0 means muted.
pub(crate) fn is_muted_value(value: f32) -> bool {
    value >= 1.0
}
