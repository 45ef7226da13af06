use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::app::clock::TimeSource;
use crate::app::snapshot::warn_shared_lock_poison_once;
use crate::app::{Rgba, Vec2};

pub const HIT_DURATION_MS: u64 = 300;
pub const DEATH_DURATION_MS: u64 = 800;
pub const TELEPORT_DURATION_MS: u64 = 600;
pub const EXPLOSION_DURATION_MS: u64 = 800;

pub const EXPLOSION_SHAKE_INTENSITY: f32 = 6.0;
pub const EXPLOSION_SHAKE_DURATION_MS: u64 = 350;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectId(u64);

#[derive(Debug, Clone)]
struct EffectEntry<P> {
    start_ms: u64,
    duration_ms: u64,
    payload: P,
}

/// A registered effect that is still inside its lifetime window, handed to
/// the kind-specific draw routine together with normalized progress.
#[derive(Debug, Clone)]
pub struct LiveEffect<P> {
    pub id: EffectId,
    pub elapsed_ms: u64,
    pub progress: f32,
    pub payload: P,
}

/// Generic time-keyed store for short-lived visual events. Producers (the
/// network thread) only ever insert; the render loop owns eviction, which
/// happens the first frame an entry outlives its duration. Entries are
/// immutable once registered.
#[derive(Debug)]
pub struct EffectMap<P> {
    inner: Arc<RwLock<HashMap<EffectId, EffectEntry<P>>>>,
    next_id: Arc<AtomicU64>,
}

impl<P> Clone for EffectMap<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<P> Default for EffectMap<P> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }
}

impl<P: Clone> EffectMap<P> {
    pub fn register(&self, start_ms: u64, duration_ms: u64, payload: P) -> EffectId {
        let id = EffectId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = EffectEntry {
            start_ms,
            duration_ms: duration_ms.max(1),
            payload,
        };
        match self.inner.write() {
            Ok(mut guard) => {
                guard.insert(id, entry);
            }
            Err(poisoned) => {
                warn_shared_lock_poison_once("effect_register");
                poisoned.into_inner().insert(id, entry);
            }
        }
        id
    }

    /// Evict entries past their duration and return a snapshot of the live
    /// ones with their progress. Iteration order across entries is
    /// unspecified; events are visually independent.
    pub fn live(&self, now_ms: u64) -> Vec<LiveEffect<P>> {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_shared_lock_poison_once("effect_live");
                poisoned.into_inner()
            }
        };
        guard.retain(|_, entry| now_ms.saturating_sub(entry.start_ms) <= entry.duration_ms);
        guard
            .iter()
            .map(|(id, entry)| {
                let elapsed_ms = now_ms.saturating_sub(entry.start_ms);
                LiveEffect {
                    id: *id,
                    elapsed_ms,
                    progress: (elapsed_ms as f32 / entry.duration_ms as f32).clamp(0.0, 1.0),
                    payload: entry.payload.clone(),
                }
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(guard) => guard.len(),
            Err(poisoned) => {
                warn_shared_lock_poison_once("effect_len");
                poisoned.into_inner().len()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEffect {
    pub position: Vec2,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathEffect {
    pub position: Vec2,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportEffect {
    pub position: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExplosionEffect {
    pub position: Vec2,
    pub radius_tiles: f32,
}

/// One registry per event kind, sharing a clock so producers can trigger
/// effects without passing timestamps around.
#[derive(Clone)]
pub struct TransientEffects {
    clock: Arc<dyn TimeSource>,
    pub hits: EffectMap<HitEffect>,
    pub deaths: EffectMap<DeathEffect>,
    pub teleports: EffectMap<TeleportEffect>,
    pub explosions: EffectMap<ExplosionEffect>,
}

impl TransientEffects {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            clock,
            hits: EffectMap::default(),
            deaths: EffectMap::default(),
            teleports: EffectMap::default(),
            explosions: EffectMap::default(),
        }
    }

    pub fn trigger_hit(&self, position: Vec2, color: Rgba) -> EffectId {
        self.hits.register(
            self.clock.now_ms(),
            HIT_DURATION_MS,
            HitEffect { position, color },
        )
    }

    pub fn trigger_death(&self, position: Vec2, color: Rgba) -> EffectId {
        self.deaths.register(
            self.clock.now_ms(),
            DEATH_DURATION_MS,
            DeathEffect { position, color },
        )
    }

    pub fn trigger_teleport(&self, position: Vec2) -> EffectId {
        self.teleports.register(
            self.clock.now_ms(),
            TELEPORT_DURATION_MS,
            TeleportEffect { position },
        )
    }

    pub fn trigger_explosion(&self, position: Vec2, radius_tiles: f32) -> EffectId {
        self.explosions.register(
            self.clock.now_ms(),
            EXPLOSION_DURATION_MS,
            ExplosionEffect {
                position,
                radius_tiles,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::clock::ManualTimeSource;

    #[test]
    fn effect_is_live_before_its_duration_and_evicted_after() {
        let map: EffectMap<HitEffect> = EffectMap::default();
        map.register(
            1_000,
            800,
            HitEffect {
                position: Vec2::default(),
                color: [255, 255, 255, 255],
            },
        );

        assert_eq!(map.live(1_799).len(), 1);
        assert_eq!(map.live(1_801).len(), 0);
        assert!(map.is_empty());
    }

    #[test]
    fn progress_is_normalized_and_clamped() {
        let map: EffectMap<TeleportEffect> = EffectMap::default();
        map.register(
            0,
            400,
            TeleportEffect {
                position: Vec2::default(),
            },
        );

        let live = map.live(100);
        assert!((live[0].progress - 0.25).abs() < 1e-4);
        let live = map.live(400);
        assert!((live[0].progress - 1.0).abs() < 1e-4);
    }

    #[test]
    fn clock_before_start_yields_zero_progress_not_eviction() {
        let map: EffectMap<TeleportEffect> = EffectMap::default();
        map.register(
            500,
            100,
            TeleportEffect {
                position: Vec2::default(),
            },
        );
        let live = map.live(400);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].progress, 0.0);
    }

    #[test]
    fn producer_thread_inserts_are_seen_by_the_render_side() {
        let clock = ManualTimeSource::shared(10_000);
        let effects = TransientEffects::new(clock.clone());
        let producer = effects.clone();
        std::thread::spawn(move || {
            producer.trigger_explosion(Vec2::new(4.0, 4.0), 2.0);
        })
        .join()
        .expect("producer thread");

        let live = effects.explosions.live(clock.now_ms());
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].elapsed_ms, 0);
    }

    #[test]
    fn trigger_helpers_stamp_the_shared_clock() {
        let clock = ManualTimeSource::shared(2_000);
        let effects = TransientEffects::new(clock.clone());
        effects.trigger_hit(Vec2::new(1.0, 1.0), [200, 40, 40, 255]);

        clock.advance_ms(HIT_DURATION_MS);
        assert_eq!(effects.hits.live(clock.now_ms()).len(), 1);
        clock.advance_ms(1);
        assert_eq!(effects.hits.live(clock.now_ms()).len(), 0);
    }
}
