mod clock;
mod effects;
mod engine;
mod interp;
mod loop_runner;
mod metrics;
mod rendering;
mod snapshot;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use effects::{
    DeathEffect, EffectId, EffectMap, ExplosionEffect, HitEffect, LiveEffect, TeleportEffect,
    TransientEffects, DEATH_DURATION_MS, EXPLOSION_DURATION_MS, HIT_DURATION_MS,
    TELEPORT_DURATION_MS,
};
pub use engine::{FrameOverlays, FramePrep, ViewEngine, ViewScene, ViewState};
pub use interp::{VisualPositions, VISUAL_LERP_FACTOR, VISUAL_SNAP_EPSILON};
pub use loop_runner::{run_view, run_view_with_metrics, AppError, LoopConfig};
pub use metrics::{MetricsHandle, RenderMetricsSnapshot};
pub use rendering::{
    background_clear_color, build_draw_plan, camera_offset, clamp_camera_zoom, rasterize_overlays,
    rasterize_plan, screen_to_world, visible_tile_rect, world_to_screen, ArtProvider, CameraShake,
    CellBuckets, DrawCommand, FileArtProvider, FrameEntities, LoadedSprite, Renderer, SpriteCache,
    TileRect, CAMERA_ZOOM_DEFAULT, CAMERA_ZOOM_MAX, CAMERA_ZOOM_MIN, CULL_MARGIN_TILES,
    HALF_TILE_H, HALF_TILE_W,
};
pub use snapshot::{
    BackgroundKind, Facing, ItemKind, ItemSnapshot, LocalState, PlayerId, PlayerSnapshot,
    ProjectileKind, ProjectileSnapshot, Rgba, SharedCell, SharedMap, Tile, Vec2, WorldSnapshot,
};
