use super::projection::screen_to_world;
use crate::app::Vec2;

/// Extra tiles iterated beyond the exact viewport bounds, covering partially
/// visible tiles and sprites whose center sits just off-screen.
pub const CULL_MARGIN_TILES: i32 = 2;

/// Inclusive integer tile range to iterate for one frame. Only ever used to
/// pick which tiles are scanned; entity visibility is never decided by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl TileRect {
    pub fn contains(&self, cell: (i32, i32)) -> bool {
        cell.0 >= self.x_min && cell.0 <= self.x_max && cell.1 >= self.y_min && cell.1 <= self.y_max
    }
}

/// Map the virtual viewport back to world space: inverse-project all four
/// corners (the iso transform rotates the rectangle, so no single pair of
/// corners bounds it), take the bounding box, pad by the margin, clamp to
/// world bounds.
pub fn visible_tile_rect(
    viewport: (u32, u32),
    camera_offset: Vec2,
    world_width: u32,
    world_height: u32,
) -> Option<TileRect> {
    if world_width == 0 || world_height == 0 {
        return None;
    }
    let width = viewport.0 as f32;
    let height = viewport.1 as f32;
    let corners = [
        screen_to_world(Vec2::new(0.0, 0.0), camera_offset),
        screen_to_world(Vec2::new(width, 0.0), camera_offset),
        screen_to_world(Vec2::new(0.0, height), camera_offset),
        screen_to_world(Vec2::new(width, height), camera_offset),
    ];

    let mut min_x = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for corner in corners {
        min_x = min_x.min(corner.x);
        max_x = max_x.max(corner.x);
        min_y = min_y.min(corner.y);
        max_y = max_y.max(corner.y);
    }

    let x_min = (min_x.floor() as i32 - CULL_MARGIN_TILES).max(0);
    let x_max = (max_x.ceil() as i32 + CULL_MARGIN_TILES).min(world_width as i32 - 1);
    let y_min = (min_y.floor() as i32 - CULL_MARGIN_TILES).max(0);
    let y_max = (max_y.ceil() as i32 + CULL_MARGIN_TILES).min(world_height as i32 - 1);

    if x_min > x_max || y_min > y_max {
        return None;
    }

    Some(TileRect {
        x_min,
        x_max,
        y_min,
        y_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::camera::camera_offset;
    use crate::app::rendering::projection::world_to_screen;

    #[test]
    fn rect_covers_every_tile_projecting_into_the_viewport() {
        let viewport = (640, 360);
        let offset = camera_offset(viewport, Vec2::new(20.0, 20.0), Vec2::default());
        let rect = visible_tile_rect(viewport, offset, 64, 64).expect("rect");

        for y in 0..64 {
            for x in 0..64 {
                let screen = world_to_screen(Vec2::new(x as f32, y as f32), offset);
                let on_screen = screen.x >= 0.0
                    && screen.x <= viewport.0 as f32
                    && screen.y >= 0.0
                    && screen.y <= viewport.1 as f32;
                if on_screen {
                    assert!(rect.contains((x, y)), "tile ({x}, {y}) fell outside the rect");
                }
            }
        }
    }

    #[test]
    fn rect_is_clamped_to_world_bounds() {
        let viewport = (640, 360);
        let offset = camera_offset(viewport, Vec2::new(0.0, 0.0), Vec2::default());
        let rect = visible_tile_rect(viewport, offset, 8, 8).expect("rect");
        assert!(rect.x_min >= 0);
        assert!(rect.y_min >= 0);
        assert!(rect.x_max <= 7);
        assert!(rect.y_max <= 7);
    }

    #[test]
    fn rect_includes_the_safety_margin() {
        let viewport = (640, 360);
        let center = Vec2::new(32.0, 32.0);
        let offset = camera_offset(viewport, center, Vec2::default());
        let rect = visible_tile_rect(viewport, offset, 256, 256).expect("rect");

        // The centered tile is on-screen, so the rect must extend at least
        // the margin beyond it in every direction.
        assert!(rect.x_min <= 32 - CULL_MARGIN_TILES);
        assert!(rect.x_max >= 32 + CULL_MARGIN_TILES);
        assert!(rect.y_min <= 32 - CULL_MARGIN_TILES);
        assert!(rect.y_max >= 32 + CULL_MARGIN_TILES);
    }

    #[test]
    fn empty_world_yields_no_rect() {
        assert!(visible_tile_rect((640, 360), Vec2::default(), 0, 16).is_none());
        assert!(visible_tile_rect((640, 360), Vec2::default(), 16, 0).is_none());
    }

    #[test]
    fn camera_far_outside_world_yields_no_rect() {
        // Focal point far past the world corner, beyond margin reach.
        let offset = camera_offset((320, 180), Vec2::new(10_000.0, 10_000.0), Vec2::default());
        assert!(visible_tile_rect((320, 180), offset, 16, 16).is_none());
    }
}
