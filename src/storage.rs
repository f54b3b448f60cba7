use crate::state::ParticipantState;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// On-disk shape of one cached participant, stamped so stale caches can be
/// told apart when debugging a session.
#[derive(Debug, Serialize, Deserialize)]
struct CachedState {
    saved_at: String,
    participant: ParticipantState,
}

/// Durable per-instance state cache.
///
/// Best-effort by design: the cache only bridges refreshes and offline
/// viewing, it is never the source of truth once a push update has arrived.
/// Write failures are logged and swallowed, corrupt files read as absent.
pub struct StateCache {
    dir: PathBuf,
}

impl StateCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Platform default cache directory.
    pub fn default_dir() -> PathBuf {
        dirs_next::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("restream_tracker")
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    pub fn load(&self, key: &str) -> Option<ParticipantState> {
        let path = self.path_for(key);
        let content = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str::<CachedState>(&content) {
            Ok(cached) => Some(cached.participant),
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "ignoring corrupt state cache"
                );
                None
            }
        }
    }

    pub fn save(&self, key: &str, state: &ParticipantState) {
        let cached = CachedState {
            saved_at: chrono::Utc::now().to_rfc3339(),
            participant: state.clone(),
        };
        if let Err(err) = self.write_atomic(key, &cached) {
            tracing::warn!(key, error = %err, "state cache write failed");
        }
    }

    fn write_atomic(&self, key: &str, cached: &CachedState) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(cached)?;
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
