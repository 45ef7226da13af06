use crate::app::Vec2;

/// Half-tile dimensions of the isometric diamond, in virtual pixels.
pub const HALF_TILE_W: f32 = 32.0;
pub const HALF_TILE_H: f32 = 16.0;

/// Forward isometric transform: fractional grid coordinates plus a camera
/// offset to virtual screen coordinates.
pub fn world_to_screen(world: Vec2, offset: Vec2) -> Vec2 {
    Vec2 {
        x: (world.x - world.y) * HALF_TILE_W + offset.x,
        y: (world.x + world.y) * HALF_TILE_H + offset.y,
    }
}

/// Inverse of `world_to_screen` for the same camera offset.
pub fn screen_to_world(screen: Vec2, offset: Vec2) -> Vec2 {
    let rx = screen.x - offset.x;
    let ry = screen.y - offset.y;
    Vec2 {
        x: (rx / HALF_TILE_W + ry / HALF_TILE_H) * 0.5,
        y: (ry / HALF_TILE_H - rx / HALF_TILE_W) * 0.5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Vec2, expected: Vec2) {
        assert!(
            (actual.x - expected.x).abs() < 1e-3,
            "x {} vs {}",
            actual.x,
            expected.x
        );
        assert!(
            (actual.y - expected.y).abs() < 1e-3,
            "y {} vs {}",
            actual.y,
            expected.y
        );
    }

    #[test]
    fn origin_maps_to_offset() {
        let screen = world_to_screen(Vec2::default(), Vec2::new(640.0, 360.0));
        assert_close(screen, Vec2::new(640.0, 360.0));
    }

    #[test]
    fn unit_steps_follow_the_diamond_axes() {
        let offset = Vec2::default();
        assert_close(
            world_to_screen(Vec2::new(1.0, 0.0), offset),
            Vec2::new(HALF_TILE_W, HALF_TILE_H),
        );
        assert_close(
            world_to_screen(Vec2::new(0.0, 1.0), offset),
            Vec2::new(-HALF_TILE_W, HALF_TILE_H),
        );
    }

    #[test]
    fn forward_then_inverse_is_identity() {
        let offset = Vec2::new(412.5, -97.25);
        for (wx, wy) in [
            (0.0, 0.0),
            (5.0, 5.0),
            (-3.25, 12.75),
            (1017.5, -409.125),
            (0.001, -0.001),
        ] {
            let world = Vec2::new(wx, wy);
            let round_trip = screen_to_world(world_to_screen(world, offset), offset);
            assert_close(round_trip, world);
        }
    }

    #[test]
    fn inverse_then_forward_is_identity() {
        let offset = Vec2::new(-64.0, 128.0);
        for (sx, sy) in [(0.0, 0.0), (640.0, 360.0), (-31.5, 977.25)] {
            let screen = Vec2::new(sx, sy);
            let round_trip = world_to_screen(screen_to_world(screen, offset), offset);
            assert_close(round_trip, screen);
        }
    }
}
