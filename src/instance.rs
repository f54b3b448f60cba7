use crate::catalog::{Catalog, ItemBehavior};
use crate::composite::{AssetSource, CompositeHitCache, LocalPoint};
use crate::render::{project, TrackerVisual, VisualSurface};
use crate::state::{ParticipantState, StatePatch, StateStore};
use crate::storage::StateCache;
use crate::sync::{HttpSink, RemoteBridge, RemoteSink};
use crate::settings::TrackerSettings;
use std::sync::Arc;
use std::time::Instant;

/// Pointer gesture on a tracker target. Primary advances, secondary goes
/// back (or force-clears a composite overlay).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Primary,
    Secondary,
}

impl Gesture {
    fn delta(self) -> i32 {
        match self {
            Gesture::Primary => 1,
            Gesture::Secondary => -1,
        }
    }
}

/// What the pointer landed on, resolved by the host from its own hit
/// regions. Composite targets carry the element-relative point for the
/// pixel-accurate resolution.
#[derive(Debug, Clone, Copy)]
pub enum InteractionTarget<'a> {
    Item(&'a str),
    WalletBonus,
    Dungeon(&'a str),
    Composite {
        composite_id: &'a str,
        point: LocalPoint,
    },
}

/// One tracker widget: owned participant state, visual projection, hit
/// maps and the persistence bridge, bound to a single slot for the page
/// lifetime.
pub struct TrackerInstance {
    settings: TrackerSettings,
    catalog: Arc<Catalog>,
    store: StateStore,
    cache: Option<StateCache>,
    bridge: RemoteBridge,
    hits: CompositeHitCache,
    surface: Option<Box<dyn VisualSurface>>,
    slot: u32,
}

impl TrackerInstance {
    /// Build an instance with an HTTP sink derived from the settings'
    /// update URL (when present and valid).
    pub fn new(settings: TrackerSettings, catalog: Arc<Catalog>, embedded: Option<&str>) -> Self {
        let sink: Option<Arc<dyn RemoteSink>> = match settings.update_url.as_deref() {
            Some(url) => match HttpSink::new(url) {
                Ok(sink) => Some(Arc::new(sink)),
                Err(err) => {
                    tracing::warn!(error = %err, "remote updates disabled");
                    None
                }
            },
            None => None,
        };
        Self::with_sink(settings, catalog, sink, embedded)
    }

    /// Build an instance around an explicit sink. Tests and custom hosts
    /// inject their own transport here.
    pub fn with_sink(
        settings: TrackerSettings,
        catalog: Arc<Catalog>,
        sink: Option<Arc<dyn RemoteSink>>,
        embedded: Option<&str>,
    ) -> Self {
        // Hydrate: embedded state first, local cache override afterwards.
        let mut state = match embedded {
            Some(json) => match serde_json::from_str::<ParticipantState>(json) {
                Ok(state) => state,
                Err(err) => {
                    tracing::warn!(error = %err, "invalid embedded state, starting fresh");
                    ParticipantState::initial(&catalog)
                }
            },
            None => ParticipantState::initial(&catalog),
        };

        let slot = if state.slot != 0 {
            state.slot
        } else {
            settings.slot
        };

        let cache = settings.use_storage.then(|| {
            StateCache::new(
                settings
                    .storage_dir
                    .clone()
                    .unwrap_or_else(StateCache::default_dir),
            )
        });
        if let Some(cache) = &cache {
            if let Some(saved) = cache.load(&settings.cache_key(slot)) {
                state = saved;
            }
        }

        let bridge = RemoteBridge::new(
            sink,
            settings.can_edit,
            std::time::Duration::from_millis(settings.debounce_ms),
        );

        Self {
            settings,
            catalog,
            store: StateStore::new(state),
            cache,
            bridge,
            hits: CompositeHitCache::new(),
            surface: None,
            slot,
        }
    }

    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn state(&self) -> &ParticipantState {
        self.store.get()
    }

    pub fn can_edit(&self) -> bool {
        self.settings.can_edit
    }

    /// Current visual projection of the state.
    pub fn visual(&self) -> TrackerVisual {
        project(self.store.get(), &self.catalog, &self.settings.asset_root)
    }

    /// Attach a surface and push the current visual to it immediately.
    pub fn set_surface(&mut self, surface: Box<dyn VisualSurface>) {
        self.surface = Some(surface);
        self.render();
    }

    /// Decode the composite overlay images into hit maps. Composite
    /// interactions before this completes silently miss.
    pub fn prepare_composites(&mut self, assets: &dyn AssetSource) {
        self.hits.build_all(&self.catalog, assets);
    }

    pub fn composites_ready(&self, composite_id: &str) -> bool {
        self.hits.is_ready(composite_id)
    }

    /// Route one interaction. Returns whether state changed; changes render
    /// synchronously and arm the persistence bridge.
    pub fn interact(&mut self, target: InteractionTarget<'_>, gesture: Gesture, now: Instant) -> bool {
        if !self.settings.can_edit {
            return false;
        }
        let delta = gesture.delta();

        let changed = match target {
            InteractionTarget::WalletBonus => self
                .store
                .apply(&self.catalog, StatePatch::CycleWalletBonus { delta }),
            InteractionTarget::Dungeon(code) => self
                .store
                .apply(&self.catalog, StatePatch::CycleDungeon { code, delta }),
            InteractionTarget::Composite {
                composite_id,
                point,
            } => match self.hits.resolve(composite_id, &point) {
                Some(key) => {
                    // Secondary interaction force-clears instead of toggling.
                    let force = (delta < 0).then_some(false);
                    let key = key.to_string();
                    self.store.apply(
                        &self.catalog,
                        StatePatch::ToggleComposite {
                            composite_id,
                            key: &key,
                            force,
                        },
                    )
                }
                None => false,
            },
            InteractionTarget::Item(id) => match self.catalog.item(id).map(|meta| &meta.behavior) {
                Some(ItemBehavior::Counter { .. }) => self
                    .store
                    .apply(&self.catalog, StatePatch::StepCounter { id, delta }),
                Some(ItemBehavior::Composite { .. }) | None => false,
                Some(_) => self
                    .store
                    .apply(&self.catalog, StatePatch::CycleItem { id, delta }),
            },
        };

        if changed {
            self.render();
            self.persist(now);
        }
        changed
    }

    /// Apply a participant snapshot from the push channel.
    ///
    /// Slot-mismatched snapshots are ignored. An applied snapshot replaces
    /// state wholesale, re-renders, rewrites the local cache, and never
    /// schedules a network send; any pending send is cancelled since the
    /// remote state wins.
    pub fn apply_remote(&mut self, participant: ParticipantState) -> bool {
        if self.slot != 0 && participant.slot != 0 && participant.slot != self.slot {
            return false;
        }

        self.bridge.suppress();
        self.store.replace(participant);
        self.render();
        self.save_local();
        self.bridge.release();
        self.bridge.cancel_pending();
        true
    }

    /// Drive the persistence bridge. Hosts call this from their event loop.
    pub fn tick(&mut self, now: Instant) {
        self.bridge.tick(now, self.store.get());
    }

    /// Whether a remote send is armed, deferred or in flight.
    pub fn sync_pending(&self) -> bool {
        self.bridge.is_busy()
    }

    fn render(&mut self) {
        let visual = project(self.store.get(), &self.catalog, &self.settings.asset_root);
        if let Some(surface) = self.surface.as_mut() {
            surface.apply(&visual);
        }
    }

    fn persist(&mut self, now: Instant) {
        self.save_local();
        self.bridge.mark_dirty(now);
    }

    fn save_local(&self) {
        if let Some(cache) = &self.cache {
            cache.save(&self.settings.cache_key(self.slot), self.store.get());
        }
    }
}
