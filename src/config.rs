pub mod settings;
pub mod user;

pub use settings::{ConfigError, ConfigResult, InjectionSettings, load_settings};
pub use user::{load_user_settings, user_config_path};
