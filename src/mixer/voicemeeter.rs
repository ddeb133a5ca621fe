//! Voicemeeter Remote API backend (Windows only).
//!
//! Loads VoicemeeterRemote64.dll from the stock install locations, resolves
//! the four entry points the gateway needs, and exposes them through the
//! [`MixerSource`] seam. All calls are thin wrappers over the C API; the
//! float/parameter-name protocol lives in the parent module.

use anyhow::Result;
use async_trait::async_trait;
use std::ffi::CString;
use std::os::raw::{c_char, c_long};
use tracing::{debug, info};
use windows::core::PCWSTR;
use windows::Win32::Foundation::{FreeLibrary, HMODULE};
use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};

use super::{is_muted_value, strip_mute_param, MixerSource};
use crate::error::FeedbackError;

/// Stock install locations for Voicemeeter (Potato/Banana share the DLL).
const DLL_PATHS: [&str; 2] = [
    r"C:\Program Files (x86)\VB\Voicemeeter\VoicemeeterRemote64.dll",
    r"C:\Program Files\VB\Voicemeeter\VoicemeeterRemote64.dll",
];

type LoginFn = unsafe extern "system" fn() -> c_long;
type LogoutFn = unsafe extern "system" fn() -> c_long;
type IsParametersDirtyFn = unsafe extern "system" fn() -> c_long;
type GetParameterFloatFn = unsafe extern "system" fn(*mut c_char, *mut f32) -> c_long;

pub struct VoicemeeterRemote {
    module: HMODULE,
    login: LoginFn,
    logout: LogoutFn,
    is_parameters_dirty: IsParametersDirtyFn,
    get_parameter_float: GetParameterFloatFn,
}

// The resolved function pointers and module handle are process-global and
// the Remote API serializes internally.
unsafe impl Send for VoicemeeterRemote {}
unsafe impl Sync for VoicemeeterRemote {}

fn load_module() -> Result<HMODULE, FeedbackError> {
    for path in DLL_PATHS {
        let wide: Vec<u16> = path.encode_utf16().chain(std::iter::once(0)).collect();
        match unsafe { LoadLibraryW(PCWSTR(wide.as_ptr())) } {
            Ok(module) if !module.is_invalid() => {
                debug!("Loaded Voicemeeter Remote DLL from '{}'", path);
                return Ok(module);
            },
            _ => continue,
        }
    }
    Err(FeedbackError::BackendUnavailable(
        "VoicemeeterRemote64.dll not found in the stock install paths".into(),
    ))
}

/// Resolve one exported symbol or fail with its name.
unsafe fn resolve(
    module: HMODULE,
    name: &'static str,
    symbol: windows::core::PCSTR,
) -> Result<unsafe extern "system" fn() -> isize, FeedbackError> {
    GetProcAddress(module, symbol).ok_or_else(|| {
        FeedbackError::BackendUnavailable(format!("missing Remote API export '{}'", name))
    })
}

impl VoicemeeterRemote {
    /// Load the DLL and resolve the entry points. Does not log in yet.
    pub fn new() -> Result<Self, FeedbackError> {
        let module = load_module()?;

        let remote = unsafe {
            use windows::core::s;
            Self {
                module,
                login: std::mem::transmute(resolve(module, "VBVMR_Login", s!("VBVMR_Login"))?),
                logout: std::mem::transmute(resolve(module, "VBVMR_Logout", s!("VBVMR_Logout"))?),
                is_parameters_dirty: std::mem::transmute(resolve(
                    module,
                    "VBVMR_IsParametersDirty",
                    s!("VBVMR_IsParametersDirty"),
                )?),
                get_parameter_float: std::mem::transmute(resolve(
                    module,
                    "VBVMR_GetParameterFloat",
                    s!("VBVMR_GetParameterFloat"),
                )?),
            }
        };

        Ok(remote)
    }
}

impl Drop for VoicemeeterRemote {
    fn drop(&mut self) {
        unsafe {
            let _ = FreeLibrary(self.module);
        }
    }
}

#[async_trait]
impl MixerSource for VoicemeeterRemote {
    fn name(&self) -> &str {
        "voicemeeter"
    }

    async fn login(&self) -> Result<()> {
        let rc = unsafe { (self.login)() };
        if rc < 0 {
            return Err(FeedbackError::BackendUnavailable(format!(
                "VBVMR_Login returned {}",
                rc
            ))
            .into());
        }
        info!("Voicemeeter Remote session opened (rc={})", rc);
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let rc = unsafe { (self.logout)() };
        debug!("VBVMR_Logout returned {}", rc);
        Ok(())
    }

    async fn is_dirty(&self) -> Result<bool> {
        let rc = unsafe { (self.is_parameters_dirty)() };
        Ok(rc > 0)
    }

    async fn strip_mute(&self, strip: usize) -> Result<bool> {
        let param = CString::new(strip_mute_param(strip))?;
        let mut value: f32 = 0.0;

        let rc = unsafe {
            (self.get_parameter_float)(param.as_ptr() as *mut c_char, &mut value)
        };
        if rc != 0 {
            anyhow::bail!("VBVMR_GetParameterFloat('{}') returned {}", strip_mute_param(strip), rc);
        }

        Ok(is_muted_value(value))
    }
}
