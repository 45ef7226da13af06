pub(crate) mod camera;
pub(crate) mod compositor;
pub(crate) mod culling;
pub(crate) mod draw;
pub(crate) mod projection;
pub(crate) mod renderer;
pub(crate) mod sprites;

pub use camera::{
    camera_offset, clamp_camera_zoom, CameraShake, CAMERA_ZOOM_DEFAULT, CAMERA_ZOOM_MAX,
    CAMERA_ZOOM_MIN,
};
pub use compositor::{build_draw_plan, CellBuckets, DrawCommand, FrameEntities};
pub use culling::{visible_tile_rect, TileRect, CULL_MARGIN_TILES};
pub use projection::{screen_to_world, world_to_screen, HALF_TILE_H, HALF_TILE_W};
pub use renderer::{rasterize_overlays, rasterize_plan, Renderer};
pub use sprites::{background_clear_color, ArtProvider, FileArtProvider, LoadedSprite, SpriteCache};
