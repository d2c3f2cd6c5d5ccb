//! User configuration loading.
//!
//! User config location: $XDG_CONFIG_HOME/utsushi/utsushi.toml
//! Fallback: the platform config directory (`dirs::config_dir()`).

use std::path::PathBuf;

use super::settings::{ConfigResult, InjectionSettings, load_settings};

/// Returns the path to the user configuration file.
///
/// The path is determined by:
/// 1. If $XDG_CONFIG_HOME is set: $XDG_CONFIG_HOME/utsushi/utsushi.toml
/// 2. Otherwise: `dirs::config_dir()`/utsushi/utsushi.toml
///
/// Returns None if no config directory can be determined.
pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        return Some(PathBuf::from(xdg_config).join("utsushi").join("utsushi.toml"));
    }

    dirs::config_dir().map(|dir| dir.join("utsushi").join("utsushi.toml"))
}

/// Load the user configuration, if one exists.
///
/// A missing file is not an error; a file that exists but cannot be read or
/// parsed is.
pub fn load_user_settings() -> ConfigResult<Option<InjectionSettings>> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        log::debug!(target: "utsushi::config", "No user config at {}", path.display());
        return Ok(None);
    }
    load_settings(&path).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn user_config_path_uses_xdg_config_home_when_set() {
        let original = env::var("XDG_CONFIG_HOME").ok();

        // SAFETY: this is the only test in the crate touching XDG_CONFIG_HOME
        unsafe {
            env::set_var("XDG_CONFIG_HOME", "/custom/config");
        }

        let path = user_config_path();

        // SAFETY: Same as above - restoring original env state
        unsafe {
            match original {
                Some(val) => env::set_var("XDG_CONFIG_HOME", val),
                None => env::remove_var("XDG_CONFIG_HOME"),
            }
        }

        assert_eq!(
            path,
            Some(PathBuf::from("/custom/config/utsushi/utsushi.toml")),
            "should use XDG_CONFIG_HOME/utsushi/utsushi.toml"
        );
    }
}
