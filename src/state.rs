use crate::catalog::Catalog;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type CompositeFlags = HashMap<String, bool>;

/// Authoritative state of one participant, owned by exactly one tracker
/// instance. Replaced wholesale on remote sync, mutated field-by-field on
/// local interaction.
///
/// The server merges whole participant documents, so fields this core does
/// not interpret (`label`, `team_id`, `gomode`, ...) are carried in `extra`
/// and survive a replace-then-persist round trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantState {
    #[serde(default)]
    pub slot: u32,
    #[serde(default)]
    pub items: HashMap<String, i64>,
    /// Dungeon code to tri-state progress (0 off, 1 todo, 2 done).
    #[serde(default)]
    pub dungeons: HashMap<String, u8>,
    #[serde(default)]
    pub wallet_bonus: i64,
    #[serde(default)]
    pub tablets: CompositeFlags,
    #[serde(default)]
    pub triforces: CompositeFlags,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ParticipantState {
    /// Fresh participant derived from the catalog: every item at its first
    /// level value, every dungeon at zero, composite flags cleared.
    pub fn initial(catalog: &Catalog) -> Self {
        let mut state = ParticipantState::default();

        for item in &catalog.items {
            if item.behavior.is_composite() {
                if let Some(flags) = state.composite_flags_mut(&item.id) {
                    for overlay in item.behavior.overlays() {
                        flags.insert(overlay.key.clone(), false);
                    }
                }
                continue;
            }
            let first = item.behavior.levels().first().copied().unwrap_or(0);
            state.items.insert(item.id.clone(), first);
        }

        for code in &catalog.dungeons {
            state.dungeons.insert(code.clone(), 0);
        }

        state
            .extra
            .insert("gomode".to_string(), serde_json::Value::from(0));
        state
    }

    pub fn composite_flags(&self, composite_id: &str) -> Option<&CompositeFlags> {
        match composite_id {
            "tablets" => Some(&self.tablets),
            "triforces" => Some(&self.triforces),
            _ => None,
        }
    }

    pub fn composite_flags_mut(&mut self, composite_id: &str) -> Option<&mut CompositeFlags> {
        match composite_id {
            "tablets" => Some(&mut self.tablets),
            "triforces" => Some(&mut self.triforces),
            _ => None,
        }
    }
}

/// A single field-level mutation of participant state.
#[derive(Debug, Clone, Copy)]
pub enum StatePatch<'a> {
    /// Move a leveled item up or down its ordered value list.
    CycleItem { id: &'a str, delta: i32 },
    /// Step a counter by its configured increment.
    StepCounter { id: &'a str, delta: i32 },
    /// Cycle a dungeon through off/todo/done.
    CycleDungeon { code: &'a str, delta: i32 },
    /// Toggle one composite overlay flag, or force it to a value.
    ToggleComposite {
        composite_id: &'a str,
        key: &'a str,
        force: Option<bool>,
    },
    /// Move the wallet bonus along its configured value sequence.
    CycleWalletBonus { delta: i32 },
}

/// Owns the participant state and applies clamped mutations to it.
pub struct StateStore {
    state: ParticipantState,
}

impl StateStore {
    pub fn new(state: ParticipantState) -> Self {
        Self { state }
    }

    pub fn get(&self) -> &ParticipantState {
        &self.state
    }

    /// Swap the whole state, used when a remote snapshot arrives.
    pub fn replace(&mut self, next: ParticipantState) {
        self.state = next;
    }

    /// Apply a patch. Returns whether the state actually changed; clamped
    /// moves that land on the current value report `false`.
    pub fn apply(&mut self, catalog: &Catalog, patch: StatePatch<'_>) -> bool {
        match patch {
            StatePatch::CycleItem { id, delta } => self.cycle_item(catalog, id, delta),
            StatePatch::StepCounter { id, delta } => self.step_counter(catalog, id, delta),
            StatePatch::CycleDungeon { code, delta } => self.cycle_dungeon(code, delta),
            StatePatch::ToggleComposite {
                composite_id,
                key,
                force,
            } => self.toggle_composite(composite_id, key, force),
            StatePatch::CycleWalletBonus { delta } => self.cycle_wallet_bonus(catalog, delta),
        }
    }

    fn cycle_item(&mut self, catalog: &Catalog, id: &str, delta: i32) -> bool {
        let Some(meta) = catalog.item(id) else {
            return false;
        };
        let levels = meta.behavior.levels();
        let current = self
            .state
            .items
            .get(id)
            .copied()
            .unwrap_or_else(|| levels[0]);
        let index = levels.iter().position(|v| *v == current).unwrap_or(0);
        let next = levels[clamp_index(index as i64 + i64::from(delta), levels.len())];
        if next == current && self.state.items.contains_key(id) {
            return false;
        }
        self.state.items.insert(id.to_string(), next);
        next != current
    }

    fn step_counter(&mut self, catalog: &Catalog, id: &str, delta: i32) -> bool {
        let Some(meta) = catalog.item(id) else {
            return false;
        };
        if !meta.behavior.is_counter() {
            return false;
        }
        let (min, max, step) = meta.behavior.counter_bounds();
        let current = self.state.items.get(id).copied().unwrap_or(0);
        let next = (current + i64::from(delta) * step).clamp(min, max);
        self.state.items.insert(id.to_string(), next);
        next != current
    }

    fn cycle_dungeon(&mut self, code: &str, delta: i32) -> bool {
        let current = self.state.dungeons.get(code).copied().unwrap_or(0);
        let next = (i64::from(current) + i64::from(delta)).clamp(0, 2) as u8;
        self.state.dungeons.insert(code.to_string(), next);
        next != current
    }

    fn toggle_composite(&mut self, composite_id: &str, key: &str, force: Option<bool>) -> bool {
        let Some(flags) = self.state.composite_flags_mut(composite_id) else {
            return false;
        };
        let current = flags.get(key).copied().unwrap_or(false);
        let next = force.unwrap_or(!current);
        flags.insert(key.to_string(), next);
        next != current
    }

    fn cycle_wallet_bonus(&mut self, catalog: &Catalog, delta: i32) -> bool {
        let values: Vec<i64> = match catalog.wallet_item() {
            Some(meta) => meta.behavior.wallet_bonus_values().to_vec(),
            None => return false,
        };
        let current = self.state.wallet_bonus;
        let index = values.iter().position(|v| *v == current).unwrap_or(0);
        let next = values[clamp_index(index as i64 + i64::from(delta), values.len())];
        self.state.wallet_bonus = next;
        next != current
    }
}

fn clamp_index(index: i64, len: usize) -> usize {
    index.clamp(0, len.saturating_sub(1) as i64) as usize
}
