//! Store and user configuration.

pub mod loader;
pub mod types;

pub use loader::{
    default_user_config_path, load_store_config, load_user_config, save_store_config,
    save_user_config, ConfigError, STORE_CONFIG_FILE,
};
pub use types::{StoreConfig, UserConfig};
