use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Levels assumed for cycling items that do not declare an explicit list.
const DEFAULT_LEVELS: &[i64] = &[0, 1];
/// Bonus steps assumed for a wallet that does not declare its own.
const DEFAULT_WALLET_BONUS: &[i64] = &[0, 300, 600, 900];
const DEFAULT_COUNTER_MAX: i64 = 999_999;

/// One layer of a composite widget. Overlays are listed in z-order: the hit
/// test walks them front to back and the first opaque layer wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayDef {
    pub key: String,
    pub asset: String,
}

/// Behavior of a catalog item, dispatched by the `kind` tag.
///
/// `toggle` and `cycle` share the level-cycling semantics; a toggle is just
/// the two-level case. Counters step within configured bounds, wallets cycle
/// a level list and carry a separate bonus sequence, composites are a set of
/// independently toggled overlay flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemBehavior {
    Toggle {
        asset_base: String,
        #[serde(default)]
        level_values: Option<Vec<i64>>,
    },
    Cycle {
        asset_base: String,
        #[serde(default)]
        level_values: Option<Vec<i64>>,
    },
    Counter {
        asset_base: String,
        #[serde(default)]
        counter_min: Option<i64>,
        #[serde(default)]
        counter_max: Option<i64>,
        #[serde(default)]
        counter_step: Option<i64>,
    },
    Wallet {
        asset_base: String,
        #[serde(default)]
        level_values: Option<Vec<i64>>,
        #[serde(default)]
        wallet_bonus_values: Option<Vec<i64>>,
    },
    Composite {
        base_asset: String,
        #[serde(default)]
        overlays: Vec<OverlayDef>,
    },
}

impl ItemBehavior {
    /// Ordered level list for cycling items. Falls back to `[0, 1]` when the
    /// catalog omits it.
    pub fn levels(&self) -> &[i64] {
        match self {
            ItemBehavior::Toggle { level_values, .. }
            | ItemBehavior::Cycle { level_values, .. }
            | ItemBehavior::Wallet { level_values, .. } => match level_values {
                Some(values) if !values.is_empty() => values,
                _ => DEFAULT_LEVELS,
            },
            _ => DEFAULT_LEVELS,
        }
    }

    /// `(min, max, step)` bounds for counter items.
    pub fn counter_bounds(&self) -> (i64, i64, i64) {
        match self {
            ItemBehavior::Counter {
                counter_min,
                counter_max,
                counter_step,
                ..
            } => (
                counter_min.unwrap_or(0),
                counter_max.unwrap_or(DEFAULT_COUNTER_MAX),
                counter_step.unwrap_or(1),
            ),
            _ => (0, DEFAULT_COUNTER_MAX, 1),
        }
    }

    pub fn wallet_bonus_values(&self) -> &[i64] {
        match self {
            ItemBehavior::Wallet {
                wallet_bonus_values,
                ..
            } => match wallet_bonus_values {
                Some(values) if !values.is_empty() => values,
                _ => DEFAULT_WALLET_BONUS,
            },
            _ => DEFAULT_WALLET_BONUS,
        }
    }

    pub fn overlays(&self) -> &[OverlayDef] {
        match self {
            ItemBehavior::Composite { overlays, .. } => overlays,
            _ => &[],
        }
    }

    pub fn is_counter(&self) -> bool {
        matches!(self, ItemBehavior::Counter { .. })
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, ItemBehavior::Composite { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemMeta {
    pub id: String,
    #[serde(default)]
    pub label: String,
    /// Layout group for the host; carried through, not interpreted.
    #[serde(default)]
    pub group: String,
    #[serde(flatten)]
    pub behavior: ItemBehavior,
}

/// Static item catalog, loaded once per page from the host-provided JSON
/// document and shared read-only between tracker instances.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub tracker_type: String,
    /// Directory under the asset root containing this tracker's images.
    #[serde(default)]
    pub asset_dir: String,
    /// Dungeon codes, in display order.
    #[serde(default)]
    pub dungeons: Vec<String>,
    #[serde(default)]
    pub items: Vec<ItemMeta>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn item(&self, id: &str) -> Option<&ItemMeta> {
        self.items.iter().find(|item| item.id == id)
    }

    /// First wallet-kind item, if the catalog has one.
    pub fn wallet_item(&self) -> Option<&ItemMeta> {
        self.items
            .iter()
            .find(|item| matches!(item.behavior, ItemBehavior::Wallet { .. }))
    }

    /// Leveled icon URL, `{root}/{asset_dir}/{base}{level}.png`.
    pub fn asset_url(&self, root: &str, base: &str, level: i64) -> String {
        format!("{root}/{}/{base}{level}.png", self.asset_dir)
    }

    /// URL of a fixed asset such as a composite base or overlay image.
    pub fn fixed_asset_url(&self, root: &str, asset: &str) -> String {
        format!("{root}/{}/{asset}", self.asset_dir)
    }

    /// Root-relative path of an asset, for [`crate::composite::AssetSource`]
    /// lookups.
    pub fn asset_path(&self, asset: &str) -> String {
        format!("{}/{asset}", self.asset_dir)
    }
}
