use crate::catalog::{Catalog, ItemBehavior};
use crate::state::ParticipantState;

/// Visual description of one non-composite item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemVisual {
    /// Plain leveled icon (toggle and cycle items).
    Icon {
        item_id: String,
        level: i64,
        asset_url: String,
    },
    /// Counter: icon lights up while the count is non-zero, the overlay
    /// shows the numeric value.
    Counter {
        item_id: String,
        value: i64,
        icon_level: i64,
        asset_url: String,
    },
    /// Wallet: leveled icon plus the bonus badge text.
    Wallet {
        item_id: String,
        level: i64,
        bonus_text: String,
        asset_url: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DungeonProgress {
    Off,
    Todo,
    Done,
}

impl DungeonProgress {
    pub fn from_value(value: u8) -> Self {
        match value {
            0 => DungeonProgress::Off,
            1 => DungeonProgress::Todo,
            _ => DungeonProgress::Done,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            DungeonProgress::Off => "tracker-dungeon--off",
            DungeonProgress::Todo => "tracker-dungeon--todo",
            DungeonProgress::Done => "tracker-dungeon--done",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DungeonVisual {
    pub code: String,
    pub progress: DungeonProgress,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayVisual {
    pub key: String,
    pub asset_url: String,
    pub visible: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeVisual {
    pub composite_id: String,
    pub base_url: String,
    pub overlays: Vec<OverlayVisual>,
}

/// Full visual projection of a tracker instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerVisual {
    pub items: Vec<ItemVisual>,
    pub dungeons: Vec<DungeonVisual>,
    pub composites: Vec<CompositeVisual>,
}

/// Host-side surface that turns a [`TrackerVisual`] into actual pixels or
/// DOM nodes. The projection itself never touches the surface directly, so
/// it stays unit-testable without a UI.
pub trait VisualSurface {
    fn apply(&mut self, visual: &TrackerVisual);
}

/// Project participant state onto a visual description.
///
/// Pure: same `(state, catalog)` always yields the same visual, and calling
/// it has no storage or network effects.
pub fn project(state: &ParticipantState, catalog: &Catalog, asset_root: &str) -> TrackerVisual {
    let mut visual = TrackerVisual::default();

    for item in &catalog.items {
        match &item.behavior {
            ItemBehavior::Toggle { asset_base, .. } | ItemBehavior::Cycle { asset_base, .. } => {
                let level = state.items.get(&item.id).copied().unwrap_or(0);
                visual.items.push(ItemVisual::Icon {
                    item_id: item.id.clone(),
                    level,
                    asset_url: catalog.asset_url(asset_root, asset_base, level),
                });
            }
            ItemBehavior::Counter { asset_base, .. } => {
                let value = state.items.get(&item.id).copied().unwrap_or(0);
                let icon_level = i64::from(value > 0);
                visual.items.push(ItemVisual::Counter {
                    item_id: item.id.clone(),
                    value,
                    icon_level,
                    asset_url: catalog.asset_url(asset_root, asset_base, icon_level),
                });
            }
            ItemBehavior::Wallet { asset_base, .. } => {
                let level = state.items.get(&item.id).copied().unwrap_or(1);
                let bonus = state.wallet_bonus;
                let bonus_text = if bonus > 0 {
                    format!("+{bonus}")
                } else {
                    "+0".to_string()
                };
                visual.items.push(ItemVisual::Wallet {
                    item_id: item.id.clone(),
                    level,
                    bonus_text,
                    asset_url: catalog.asset_url(asset_root, asset_base, level),
                });
            }
            ItemBehavior::Composite {
                base_asset,
                overlays,
            } => {
                let flags = state.composite_flags(&item.id);
                let overlays = overlays
                    .iter()
                    .map(|overlay| OverlayVisual {
                        key: overlay.key.clone(),
                        asset_url: catalog.fixed_asset_url(asset_root, &overlay.asset),
                        visible: flags
                            .and_then(|f| f.get(&overlay.key).copied())
                            .unwrap_or(false),
                    })
                    .collect();
                visual.composites.push(CompositeVisual {
                    composite_id: item.id.clone(),
                    base_url: catalog.fixed_asset_url(asset_root, base_asset),
                    overlays,
                });
            }
        }
    }

    for code in &catalog.dungeons {
        let value = state.dungeons.get(code).copied().unwrap_or(0);
        visual.dungeons.push(DungeonVisual {
            code: code.clone(),
            progress: DungeonProgress::from_value(value),
        });
    }

    visual
}
