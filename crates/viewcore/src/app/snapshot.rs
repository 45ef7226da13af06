use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tracing::warn;

static SHARED_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

pub(crate) fn warn_shared_lock_poison_once(operation: &'static str) {
    if SHARED_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "shared state lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Integer grid cell this position occupies. Rounds rather than floors
    /// so a position near a cell center maps to that cell; exact .5
    /// boundaries round away from zero.
    pub fn cell(self) -> (i32, i32) {
        (self.x.round() as i32, self.y.round() as i32)
    }
}

pub type Rgba = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    North,
    #[default]
    South,
    East,
    West,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackgroundKind {
    #[default]
    Void,
    Plains,
    Cavern,
}

/// One grid tile of the world snapshot. The walkable flag decides which
/// compositing pass draws it: walkable tiles are ground, the rest are
/// elevated geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub walkable: bool,
    pub visual: u16,
}

/// Read-only view of the authoritative world grid. Owned by the network
/// layer; the view layer only reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldSnapshot {
    width: u32,
    height: u32,
    background: BackgroundKind,
    tiles: Vec<Tile>,
}

impl WorldSnapshot {
    pub fn new(width: u32, height: u32, background: BackgroundKind, tiles: Vec<Tile>) -> Self {
        debug_assert_eq!(tiles.len(), (width as usize) * (height as usize));
        Self {
            width,
            height,
            background,
            tiles,
        }
    }

    pub fn filled(width: u32, height: u32, background: BackgroundKind, tile: Tile) -> Self {
        Self::new(
            width,
            height,
            background,
            vec![tile; (width as usize) * (height as usize)],
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn background(&self) -> BackgroundKind {
        self.background
    }

    pub fn tile(&self, x: i32, y: i32) -> Option<Tile> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        self.tiles
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn set_tile(&mut self, x: i32, y: i32, tile: Tile) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        if let Some(slot) = self.tiles.get_mut(index) {
            *slot = tile;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Health,
    Ammo,
    Relic,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileKind {
    Bolt,
    Rocket,
    Shard,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: PlayerId,
    pub position: Vec2,
    pub facing: Facing,
    pub character: u8,
    pub color: Rgba,
    pub dead: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub id: u64,
    pub cell: (i32, i32),
    pub kind: ItemKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectileSnapshot {
    pub id: u64,
    pub position: Vec2,
    pub kind: ProjectileKind,
}

/// Session-local state for the controlled player: which map entry is ours,
/// whether we are in a full-screen dead/respawning state (which excludes the
/// player from the compositor), and the current aim direction for the
/// ground-plane indicator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalState {
    pub player_id: Option<PlayerId>,
    pub dead: bool,
    pub charging: bool,
    pub aim: Option<Vec2>,
}

/// Keyed collection written by network producer threads and snapshotted by
/// the render loop at frame start. Snapshot semantics are weakly consistent:
/// the render loop needs a reasonably fresh view, not linearizability.
#[derive(Debug)]
pub struct SharedMap<K, V> {
    inner: Arc<RwLock<HashMap<K, V>>>,
}

impl<K, V> Clone for SharedMap<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for SharedMap<K, V> {
    fn default() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> SharedMap<K, V> {
    pub fn insert(&self, key: K, value: V) {
        match self.inner.write() {
            Ok(mut guard) => {
                guard.insert(key, value);
            }
            Err(poisoned) => {
                warn_shared_lock_poison_once("insert");
                poisoned.into_inner().insert(key, value);
            }
        }
    }

    pub fn remove(&self, key: &K) {
        match self.inner.write() {
            Ok(mut guard) => {
                guard.remove(key);
            }
            Err(poisoned) => {
                warn_shared_lock_poison_once("remove");
                poisoned.into_inner().remove(key);
            }
        }
    }

    pub fn clear(&self) {
        match self.inner.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => {
                warn_shared_lock_poison_once("clear");
                poisoned.into_inner().clear();
            }
        }
    }

    pub fn snapshot(&self) -> HashMap<K, V> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn_shared_lock_poison_once("snapshot");
                poisoned.into_inner().clone()
            }
        }
    }
}

/// Single shared value with the same snapshot-at-frame-start semantics as
/// `SharedMap`.
#[derive(Debug)]
pub struct SharedCell<T> {
    inner: Arc<RwLock<T>>,
}

impl<T> Clone for SharedCell<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Default> Default for SharedCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone> SharedCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(RwLock::new(value)),
        }
    }

    pub fn set(&self, value: T) {
        match self.inner.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => {
                warn_shared_lock_poison_once("set");
                *poisoned.into_inner() = value;
            }
        }
    }

    pub fn update(&self, apply: impl FnOnce(&mut T)) {
        match self.inner.write() {
            Ok(mut guard) => apply(&mut *guard),
            Err(poisoned) => {
                warn_shared_lock_poison_once("update");
                let mut guard = poisoned.into_inner();
                apply(&mut *guard)
            }
        }
    }

    pub fn snapshot(&self) -> T {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => {
                warn_shared_lock_poison_once("snapshot");
                poisoned.into_inner().clone()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_rounds_instead_of_flooring() {
        assert_eq!(Vec2::new(3.5, 4.49).cell(), (4, 4));
        // Half boundaries round away from zero on the negative axis too.
        assert_eq!(Vec2::new(-0.5, -1.51).cell(), (-1, -2));
        assert_eq!(Vec2::new(-0.49, -1.49).cell(), (0, -1));
    }

    #[test]
    fn world_tile_lookup_is_none_out_of_bounds() {
        let world = WorldSnapshot::filled(
            4,
            3,
            BackgroundKind::Void,
            Tile {
                walkable: true,
                visual: 0,
            },
        );
        assert!(world.tile(0, 0).is_some());
        assert!(world.tile(3, 2).is_some());
        assert!(world.tile(4, 0).is_none());
        assert!(world.tile(0, 3).is_none());
        assert!(world.tile(-1, 0).is_none());
    }

    #[test]
    fn set_tile_updates_in_bounds_only() {
        let mut world = WorldSnapshot::filled(
            2,
            2,
            BackgroundKind::Void,
            Tile {
                walkable: true,
                visual: 0,
            },
        );
        world.set_tile(
            1,
            1,
            Tile {
                walkable: false,
                visual: 7,
            },
        );
        world.set_tile(
            5,
            5,
            Tile {
                walkable: false,
                visual: 9,
            },
        );
        assert_eq!(world.tile(1, 1).map(|tile| tile.visual), Some(7));
        assert!(world.tile(5, 5).is_none());
    }

    #[test]
    fn shared_map_snapshot_sees_producer_inserts() {
        let players: SharedMap<PlayerId, PlayerSnapshot> = SharedMap::default();
        let producer = players.clone();
        let handle = std::thread::spawn(move || {
            producer.insert(
                PlayerId(1),
                PlayerSnapshot {
                    id: PlayerId(1),
                    position: Vec2::new(2.0, 3.0),
                    facing: Facing::South,
                    character: 0,
                    color: [255, 0, 0, 255],
                    dead: false,
                },
            );
        });
        handle.join().expect("producer thread");
        let snapshot = players.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&PlayerId(1)));
    }

    #[test]
    fn shared_cell_update_mutates_in_place() {
        let local: SharedCell<LocalState> = SharedCell::default();
        local.update(|state| state.dead = true);
        assert!(local.snapshot().dead);
    }
}
