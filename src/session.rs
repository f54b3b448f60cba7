use crate::instance::TrackerInstance;
use crate::state::ParticipantState;
use anyhow::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;

/// Whole-session document delivered by the push channel: one snapshot per
/// participant, each addressed by its slot.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub tracker_type: Option<String>,
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub participants: Vec<ParticipantState>,
}

pub fn parse_session(payload: &str) -> Result<SessionSnapshot> {
    Ok(serde_json::from_str(payload)?)
}

/// Page-level registry of tracker instances, keyed by slot. Push payloads
/// fan out to the instance owning each participant's slot.
#[derive(Default)]
pub struct TrackerSession {
    instances: HashMap<u32, TrackerInstance>,
}

impl TrackerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, instance: TrackerInstance) {
        self.instances.insert(instance.slot(), instance);
    }

    pub fn instance(&self, slot: u32) -> Option<&TrackerInstance> {
        self.instances.get(&slot)
    }

    pub fn instance_mut(&mut self, slot: u32) -> Option<&mut TrackerInstance> {
        self.instances.get_mut(&slot)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Apply one push payload. Malformed documents are logged and skipped
    /// wholesale; participants for unknown slots are ignored. Returns how
    /// many instances applied a snapshot.
    pub fn apply_payload(&mut self, payload: &str) -> usize {
        let session = match parse_session(payload) {
            Ok(session) => session,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed push payload");
                return 0;
            }
        };

        if let Some(version) = session.version {
            tracing::debug!(version, "applying session snapshot");
        }

        let mut applied = 0;
        for participant in session.participants {
            let Some(instance) = self.instances.get_mut(&participant.slot) else {
                continue;
            };
            if instance.apply_remote(participant) {
                applied += 1;
            }
        }
        applied
    }

    /// Drive every instance's persistence bridge.
    pub fn tick(&mut self, now: Instant) {
        for instance in self.instances.values_mut() {
            instance.tick(now);
        }
    }
}
