//! Windows environment backend over the registry.
//!
//! - user: `HKEY_CURRENT_USER\Environment`
//! - machine: `HKEY_LOCAL_MACHINE\SYSTEM\CurrentControlSet\Control\Session Manager\Environment`
//!
//! PATH is stored as `REG_EXPAND_SZ` so `%VAR%` references other tools put
//! there keep expanding; home variables are plain `REG_SZ`.

use std::io;

use winreg::enums::{
    HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_SET_VALUE, KEY_WRITE, REG_EXPAND_SZ,
};
use winreg::{RegKey, RegValue};

use crate::environment::{EnvironmentStore, PATH_VARIABLE, Scope};
use crate::errors::SdkError;

const USER_KEY: &str = "Environment";
const MACHINE_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";

/// Milliseconds each top-level window gets to process the change broadcast.
const BROADCAST_TIMEOUT_MS: u32 = 2000;

#[derive(Debug, Default)]
pub struct RegistryEnvironment;

impl RegistryEnvironment {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn open(scope: Scope, flags: u32) -> io::Result<RegKey> {
        match scope {
            Scope::User => RegKey::predef(HKEY_CURRENT_USER).open_subkey_with_flags(USER_KEY, flags),
            Scope::Machine => {
                RegKey::predef(HKEY_LOCAL_MACHINE).open_subkey_with_flags(MACHINE_KEY, flags)
            }
        }
    }

    fn open_for_write(scope: Scope) -> Result<RegKey, SdkError> {
        Self::open(scope, KEY_READ | KEY_WRITE).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                SdkError::elevation_required(format!("writing the {scope} environment"))
            } else {
                SdkError::path_mutation_with_source(
                    scope,
                    "failed to open environment registry key",
                    Box::new(e),
                )
            }
        })
    }
}

impl EnvironmentStore for RegistryEnvironment {
    fn separator(&self) -> char {
        ';'
    }

    fn read(&self, scope: Scope, name: &str) -> Result<Option<String>, SdkError> {
        let key = Self::open(scope, KEY_READ).map_err(|e| {
            SdkError::io(format!("failed to open {scope} environment key"), e)
        })?;
        match key.get_value::<String, _>(name) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SdkError::io(
                format!("failed to read {scope} variable {name}"),
                e,
            )),
        }
    }

    fn write(&self, scope: Scope, name: &str, value: &str) -> Result<(), SdkError> {
        let key = Self::open_for_write(scope)?;
        let result = if name.eq_ignore_ascii_case(PATH_VARIABLE) {
            let bytes: Vec<u8> = value
                .encode_utf16()
                .chain(std::iter::once(0))
                .flat_map(u16::to_le_bytes)
                .collect();
            key.set_raw_value(
                name,
                &RegValue {
                    bytes: bytes.into(),
                    vtype: REG_EXPAND_SZ,
                },
            )
        } else {
            key.set_value(name, &value)
        };
        result.map_err(|e| {
            SdkError::path_mutation_with_source(scope, format!("failed to set {name}"), Box::new(e))
        })
    }

    fn delete(&self, scope: Scope, name: &str) -> Result<(), SdkError> {
        let key = Self::open_for_write(scope)?;
        match key.delete_value(name) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SdkError::path_mutation_with_source(
                scope,
                format!("failed to delete {name}"),
                Box::new(e),
            )),
        }
    }

    fn can_write_machine(&self) -> bool {
        Self::open(Scope::Machine, KEY_SET_VALUE).is_ok()
    }

    fn broadcast_change(&self) -> Result<(), SdkError> {
        use windows_sys::Win32::UI::WindowsAndMessaging::{
            HWND_BROADCAST, SMTO_ABORTIFHUNG, SendMessageTimeoutW, WM_SETTINGCHANGE,
        };

        let area: Vec<u16> = "Environment".encode_utf16().chain(std::iter::once(0)).collect();
        let mut result: usize = 0;
        // SAFETY: `area` is a NUL-terminated UTF-16 buffer that outlives the
        // call, and `result` is a valid out pointer.
        let sent = unsafe {
            SendMessageTimeoutW(
                HWND_BROADCAST,
                WM_SETTINGCHANGE,
                0,
                area.as_ptr() as isize,
                SMTO_ABORTIFHUNG,
                BROADCAST_TIMEOUT_MS,
                &raw mut result,
            )
        };
        if sent == 0 {
            return Err(SdkError::path_mutation_with_source(
                Scope::User,
                "WM_SETTINGCHANGE broadcast failed",
                Box::new(io::Error::last_os_error()),
            ));
        }
        Ok(())
    }

    fn activation_hint(&self) -> Option<String> {
        Some("Open a new terminal to pick up the updated environment.".to_string())
    }
}
