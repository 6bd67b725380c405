use serde::{Deserialize, Serialize};

use crate::frontmatter::HeaderFormat;
use crate::ids::IdScheme;
use crate::identity::Identity;

/// Store-level configuration, persisted as `config.toml` in the store root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub version: u32,
    /// Header block format every document in this store uses.
    #[serde(default)]
    pub format: HeaderFormat,
    /// Identifier allocation scheme.
    #[serde(default)]
    pub id_scheme: IdScheme,
}

impl StoreConfig {
    pub const CURRENT_VERSION: u32 = 1;

    pub fn new(format: HeaderFormat, id_scheme: IdScheme) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            format,
            id_scheme,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(HeaderFormat::default(), IdScheme::default())
    }
}

/// User-level configuration (`~/.config/casefile/user.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    pub user: Option<Identity>,
}
