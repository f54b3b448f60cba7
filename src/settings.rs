use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-instance tracker configuration, supplied by the embedding host.
///
/// Mirrors the per-root options the web template exposes: which participant
/// slot the instance owns, whether the viewer may edit, where local state is
/// cached and which endpoint receives remote updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSettings {
    /// Participant slot this instance is bound to. `0` means "take the slot
    /// from the hydrated state".
    #[serde(default)]
    pub slot: u32,
    /// Viewers without edit capability never mutate state and never send
    /// network updates. Defaults to `false`.
    #[serde(default)]
    pub can_edit: bool,
    /// Mirror state into the local durable cache.
    #[serde(default = "default_use_storage")]
    pub use_storage: bool,
    /// Explicit cache key. If `None`, a key is derived from the slot.
    #[serde(default)]
    pub storage_key: Option<String>,
    /// Directory for the local cache. If `None`, a platform default is used.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Remote update endpoint. If `None`, no network persistence happens.
    #[serde(default)]
    pub update_url: Option<String>,
    /// Prefix for derived asset URLs.
    #[serde(default = "default_asset_root")]
    pub asset_root: String,
    /// Quiet interval in milliseconds before a state change is sent.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_use_storage() -> bool {
    true
}

fn default_asset_root() -> String {
    "/static".to_string()
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            slot: 0,
            can_edit: false,
            use_storage: true,
            storage_key: None,
            storage_dir: None,
            update_url: None,
            asset_root: default_asset_root(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl TrackerSettings {
    /// Cache key for the local durable store. Slot-bound instances get a
    /// per-slot key so several trackers on one page do not clobber each other.
    pub fn cache_key(&self, slot: u32) -> String {
        if let Some(key) = &self.storage_key {
            return key.clone();
        }
        if slot != 0 {
            format!("tracker_state_v1_slot{slot}")
        } else {
            "tracker_state_v1".to_string()
        }
    }
}
