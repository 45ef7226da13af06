use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use image::ImageReader;
use tracing::warn;

use super::draw::clear_frame;
use crate::app::{BackgroundKind, Facing, ItemKind, ProjectileKind, Rgba, Vec2};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSprite {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Narrow interface to the pixel-art side of the game. Every lookup may
/// fail; the rasterizer falls back to flat-color placeholders so a missing
/// or unknown visual never fails a frame.
pub trait ArtProvider: Send {
    fn tile_image(&mut self, visual: u16, elevated: bool, anim_frame: u64)
        -> Option<&LoadedSprite>;

    fn player_image(
        &mut self,
        color: Rgba,
        facing: Facing,
        anim_frame: u64,
        character: u8,
    ) -> Option<&LoadedSprite>;

    fn item_image(&mut self, kind: ItemKind, anim_frame: u64) -> Option<&LoadedSprite>;

    fn projectile_image(&mut self, kind: ProjectileKind) -> Option<&LoadedSprite>;

    /// Paint the frame background. The default clears to a flat color per
    /// background kind; camera offset and tick allow parallax/animated
    /// implementations.
    fn draw_background(
        &mut self,
        kind: BackgroundKind,
        _tick: u64,
        _camera_offset: Vec2,
        frame: &mut [u8],
        _width: u32,
        _height: u32,
    ) {
        clear_frame(frame, background_clear_color(kind));
    }
}

pub fn background_clear_color(kind: BackgroundKind) -> Rgba {
    match kind {
        BackgroundKind::Void => [12, 12, 18, 255],
        BackgroundKind::Plains => [24, 34, 24, 255],
        BackgroundKind::Cavern => [20, 16, 24, 255],
    }
}

// Keys become file paths, so they are constrained to a safe subset.
fn sprite_key_is_valid(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('/')
        && !key.contains('\\')
        && !key.contains("..")
        && key
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '_' | '/' | '-'))
}

/// File-backed sprite store with per-key negative caching: a key that fails
/// to load is logged once and resolves to `None` (placeholder) from then on.
#[derive(Debug, Default)]
pub struct SpriteCache {
    root: PathBuf,
    loaded: HashMap<String, Option<LoadedSprite>>,
    warned_keys: HashSet<String>,
}

impl SpriteCache {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            loaded: HashMap::new(),
            warned_keys: HashSet::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<&LoadedSprite> {
        if !self.loaded.contains_key(key) {
            let sprite = self.load(key);
            self.loaded.insert(key.to_string(), sprite);
        }
        self.loaded.get(key).and_then(Option::as_ref)
    }

    fn load(&mut self, key: &str) -> Option<LoadedSprite> {
        if !sprite_key_is_valid(key) {
            self.warn_once(key, None, "invalid_key");
            return None;
        }
        let path = self.root.join(format!("{key}.png"));
        match load_sprite_rgba(&path) {
            Ok(sprite) => Some(sprite),
            Err(reason) => {
                self.warn_once(key, Some(&path), reason.as_str());
                None
            }
        }
    }

    fn warn_once(&mut self, key: &str, path: Option<&Path>, reason: &str) {
        if !self.warned_keys.insert(key.to_string()) {
            return;
        }
        let path_display = path
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unresolved>".to_string());
        warn!(
            sprite_key = key,
            path = %path_display,
            reason,
            "sprite_load_failed_using_placeholder"
        );
    }
}

fn load_sprite_rgba(path: &Path) -> Result<LoadedSprite, String> {
    let reader = ImageReader::open(path).map_err(|error| format!("file_open_failed:{error}"))?;
    let decoded = reader
        .decode()
        .map_err(|error| format!("decode_failed:{error}"))?;
    let image = decoded.to_rgba8();
    Ok(LoadedSprite {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

const PLAYER_WALK_FRAMES: u64 = 4;
const TILE_ANIM_FRAMES: u64 = 2;

fn facing_token(facing: Facing) -> &'static str {
    match facing {
        Facing::North => "north",
        Facing::South => "south",
        Facing::East => "east",
        Facing::West => "west",
    }
}

fn item_token(kind: ItemKind) -> &'static str {
    match kind {
        ItemKind::Health => "health",
        ItemKind::Ammo => "ammo",
        ItemKind::Relic => "relic",
        ItemKind::Unknown => "unknown",
    }
}

fn projectile_token(kind: ProjectileKind) -> &'static str {
    match kind {
        ProjectileKind::Bolt => "bolt",
        ProjectileKind::Rocket => "rocket",
        ProjectileKind::Shard => "shard",
        ProjectileKind::Unknown => "unknown",
    }
}

/// `ArtProvider` reading pre-rendered pixel art from an asset directory.
/// Pointing it at an empty or missing directory degrades every draw to the
/// rasterizer's placeholders, one warning per key.
#[derive(Debug)]
pub struct FileArtProvider {
    cache: SpriteCache,
}

impl FileArtProvider {
    pub fn new(asset_root: PathBuf) -> Self {
        Self {
            cache: SpriteCache::new(asset_root),
        }
    }
}

impl ArtProvider for FileArtProvider {
    fn tile_image(
        &mut self,
        visual: u16,
        elevated: bool,
        anim_frame: u64,
    ) -> Option<&LoadedSprite> {
        let layer = if elevated { "wall" } else { "floor" };
        let frame = anim_frame % TILE_ANIM_FRAMES;
        self.cache
            .get(&format!("tiles/{layer}_{visual:03}_{frame}"))
    }

    fn player_image(
        &mut self,
        _color: Rgba,
        facing: Facing,
        anim_frame: u64,
        character: u8,
    ) -> Option<&LoadedSprite> {
        let frame = anim_frame % PLAYER_WALK_FRAMES;
        self.cache.get(&format!(
            "players/c{character}_{facing}_{frame}",
            facing = facing_token(facing)
        ))
    }

    fn item_image(&mut self, kind: ItemKind, anim_frame: u64) -> Option<&LoadedSprite> {
        let frame = anim_frame % TILE_ANIM_FRAMES;
        self.cache
            .get(&format!("items/{kind}_{frame}", kind = item_token(kind)))
    }

    fn projectile_image(&mut self, kind: ProjectileKind) -> Option<&LoadedSprite> {
        self.cache
            .get(&format!("projectiles/{kind}", kind = projectile_token(kind)))
    }
}
