use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use super::camera::clamp_camera_zoom;
use super::compositor::DrawCommand;
use super::draw::{
    draw_line, draw_ring, draw_square, draw_sprite_centered_scaled, fill_circle, fill_diamond,
    fill_elevated_block, write_pixel_rgba_clipped,
};
use super::projection::{world_to_screen, HALF_TILE_H, HALF_TILE_W};
use super::sprites::ArtProvider;
use crate::app::engine::{FrameOverlays, FramePrep};
use crate::app::{ItemKind, ProjectileKind, Rgba, Vec2};

const TILE_W: i32 = HALF_TILE_W as i32;
const TILE_H: i32 = HALF_TILE_H as i32;
const ELEVATED_RISE_PX: i32 = 20;

const GROUND_FALLBACK_COLORS: [Rgba; 3] = [
    [74, 112, 56, 255],
    [112, 83, 58, 255],
    [90, 98, 110, 255],
];
const GROUND_FALLBACK_UNKNOWN: Rgba = [68, 74, 62, 255];
const ELEVATED_TOP_COLOR: Rgba = [126, 130, 140, 255];
const ELEVATED_SIDE_COLOR: Rgba = [78, 82, 92, 255];
const PLAYER_PLACEHOLDER_RADIUS: f32 = 9.0;
const LOCAL_MARKER_COLOR: Rgba = [240, 240, 255, 255];
const ITEM_HALF_SIZE_PX: i32 = 5;
const PROJECTILE_RADIUS_PX: f32 = 3.0;
const AIM_LENGTH_TILES: f32 = 2.5;
const AIM_COLOR: Rgba = [255, 236, 120, 255];
const CHARGE_RING_RADIUS: f32 = 7.0;
const MIN_AIM_DIRECTION_LEN: f32 = 1e-4;

const HIT_RING_BASE_RADIUS: f32 = 4.0;
const HIT_RING_GROWTH: f32 = 10.0;
const DEATH_RING_MAX_RADIUS: f32 = 28.0;
const TELEPORT_RING_MAX_RADIUS: f32 = 18.0;
const TELEPORT_COLOR: Rgba = [120, 220, 255, 255];
const EXPLOSION_CORE_COLOR: Rgba = [255, 190, 80, 255];
const EXPLOSION_RING_COLOR: Rgba = [255, 120, 40, 255];
const EXPLOSION_CORE_PHASE: f32 = 0.35;

fn item_color(kind: ItemKind) -> Rgba {
    match kind {
        ItemKind::Health => [220, 70, 70, 255],
        ItemKind::Ammo => [220, 200, 70, 255],
        ItemKind::Relic => [150, 90, 220, 255],
        ItemKind::Unknown => [180, 180, 180, 255],
    }
}

fn projectile_color(kind: ProjectileKind) -> Rgba {
    match kind {
        ProjectileKind::Bolt => [120, 200, 255, 255],
        ProjectileKind::Rocket => [255, 140, 60, 255],
        ProjectileKind::Shard => [200, 255, 200, 255],
        ProjectileKind::Unknown => [230, 230, 230, 255],
    }
}

fn ground_color(visual: u16) -> Rgba {
    GROUND_FALLBACK_COLORS
        .get(visual as usize)
        .copied()
        .unwrap_or(GROUND_FALLBACK_UNKNOWN)
}

fn screen_px(world: Vec2, offset: Vec2) -> (i32, i32) {
    let screen = world_to_screen(world, offset);
    (screen.x.round() as i32, screen.y.round() as i32)
}

fn cell_center_px(x: i32, y: i32, offset: Vec2) -> (i32, i32) {
    screen_px(Vec2::new(x as f32, y as f32), offset)
}

/// Execute one frame plan into the frame buffer. Sprite lookups that come
/// back empty fall through to flat-color placeholders, so a missing asset
/// never costs a frame. The plan's order is the depth order.
pub fn rasterize_plan(
    frame: &mut [u8],
    width: u32,
    height: u32,
    plan: &[DrawCommand],
    offset: Vec2,
    tick: u64,
    art: &mut dyn ArtProvider,
) {
    for command in plan {
        match *command {
            DrawCommand::Ground { x, y, visual } => {
                let (cx, cy) = cell_center_px(x, y, offset);
                if let Some(sprite) = art.tile_image(visual, false, tick) {
                    draw_sprite_centered_scaled(frame, width, height, cx, cy, sprite, 1.0);
                } else {
                    fill_diamond(
                        frame,
                        width,
                        height,
                        cx,
                        cy,
                        TILE_W,
                        TILE_H,
                        ground_color(visual),
                    );
                }
            }
            DrawCommand::Elevated { x, y, visual } => {
                let (cx, cy) = cell_center_px(x, y, offset);
                if let Some(sprite) = art.tile_image(visual, true, tick) {
                    // Sprite anchor is the raised top face.
                    draw_sprite_centered_scaled(
                        frame,
                        width,
                        height,
                        cx,
                        cy - ELEVATED_RISE_PX,
                        sprite,
                        1.0,
                    );
                } else {
                    fill_elevated_block(
                        frame,
                        width,
                        height,
                        cx,
                        cy,
                        TILE_W,
                        TILE_H,
                        ELEVATED_RISE_PX,
                        ELEVATED_TOP_COLOR,
                        ELEVATED_SIDE_COLOR,
                    );
                }
            }
            DrawCommand::AimDecal {
                origin,
                direction,
                charging,
            } => {
                rasterize_aim_decal(frame, width, height, origin, direction, charging, offset);
            }
            DrawCommand::Item { cell, kind } => {
                let (cx, cy) = cell_center_px(cell.0, cell.1, offset);
                if let Some(sprite) = art.item_image(kind, tick) {
                    draw_sprite_centered_scaled(frame, width, height, cx, cy, sprite, 1.0);
                } else {
                    draw_square(
                        frame,
                        width,
                        height,
                        cx,
                        cy,
                        ITEM_HALF_SIZE_PX,
                        item_color(kind),
                    );
                }
            }
            DrawCommand::Projectile { position, kind } => {
                let (cx, cy) = screen_px(position, offset);
                if let Some(sprite) = art.projectile_image(kind) {
                    draw_sprite_centered_scaled(frame, width, height, cx, cy, sprite, 1.0);
                } else {
                    fill_circle(
                        frame,
                        width,
                        height,
                        cx,
                        cy,
                        PROJECTILE_RADIUS_PX,
                        projectile_color(kind),
                    );
                }
            }
            DrawCommand::Player {
                position,
                facing,
                character,
                color,
                local,
                ..
            } => {
                let (cx, cy) = screen_px(position, offset);
                if let Some(sprite) = art.player_image(color, facing, tick, character) {
                    draw_sprite_centered_scaled(frame, width, height, cx, cy, sprite, 1.0);
                } else {
                    fill_circle(frame, width, height, cx, cy, PLAYER_PLACEHOLDER_RADIUS, color);
                }
                if local {
                    write_pixel_rgba_clipped(
                        frame,
                        width as usize,
                        cx,
                        cy - TILE_H - 4,
                        LOCAL_MARKER_COLOR,
                    );
                }
            }
        }
    }
}

fn rasterize_aim_decal(
    frame: &mut [u8],
    width: u32,
    height: u32,
    origin: Vec2,
    direction: Vec2,
    charging: bool,
    offset: Vec2,
) {
    let length = (direction.x * direction.x + direction.y * direction.y).sqrt();
    if !length.is_finite() || length < MIN_AIM_DIRECTION_LEN {
        return;
    }
    let tip = Vec2::new(
        origin.x + direction.x / length * AIM_LENGTH_TILES,
        origin.y + direction.y / length * AIM_LENGTH_TILES,
    );
    let from = world_to_screen(origin, offset);
    let to = world_to_screen(tip, offset);
    draw_line(frame, width, height, (from.x, from.y), (to.x, to.y), AIM_COLOR);
    if charging {
        draw_ring(
            frame,
            width,
            height,
            to.x.round() as i32,
            to.y.round() as i32,
            CHARGE_RING_RADIUS,
            1.5,
            AIM_COLOR,
        );
    }
}

/// Draw transient overlay effects in screen space, after depth compositing.
/// They are radial bursts, never occluded by world geometry.
pub fn rasterize_overlays(
    frame: &mut [u8],
    width: u32,
    height: u32,
    overlays: &FrameOverlays,
    offset: Vec2,
) {
    for hit in &overlays.hits {
        let (cx, cy) = screen_px(hit.payload.position, offset);
        let radius = HIT_RING_BASE_RADIUS + HIT_RING_GROWTH * hit.progress;
        draw_ring(frame, width, height, cx, cy, radius, 1.5, hit.payload.color);
    }
    for death in &overlays.deaths {
        let (cx, cy) = screen_px(death.payload.position, offset);
        let radius = DEATH_RING_MAX_RADIUS * death.progress;
        draw_ring(frame, width, height, cx, cy, radius, 2.0, death.payload.color);
        let core = PLAYER_PLACEHOLDER_RADIUS * (1.0 - death.progress);
        fill_circle(frame, width, height, cx, cy, core, death.payload.color);
    }
    for teleport in &overlays.teleports {
        let (cx, cy) = screen_px(teleport.payload.position, offset);
        let radius = TELEPORT_RING_MAX_RADIUS * (1.0 - teleport.progress);
        draw_ring(frame, width, height, cx, cy, radius, 1.5, TELEPORT_COLOR);
    }
    for explosion in &overlays.explosions {
        let (cx, cy) = screen_px(explosion.payload.position, offset);
        let max_radius = explosion.payload.radius_tiles * HALF_TILE_W;
        if explosion.progress < EXPLOSION_CORE_PHASE {
            let radius = max_radius * (explosion.progress / EXPLOSION_CORE_PHASE);
            fill_circle(frame, width, height, cx, cy, radius, EXPLOSION_CORE_COLOR);
        } else {
            let phase =
                (explosion.progress - EXPLOSION_CORE_PHASE) / (1.0 - EXPLOSION_CORE_PHASE);
            let radius = max_radius * (1.0 + phase * 0.5);
            draw_ring(frame, width, height, cx, cy, radius, 2.5, EXPLOSION_RING_COLOR);
        }
    }
}

/// Windowed frame target: a `pixels` buffer at the virtual resolution
/// (`window / zoom`), scaled to the surface once per present. Everything
/// upstream of this type is zoom-agnostic.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    virtual_viewport: (u32, u32),
    zoom: f32,
    art: Box<dyn ArtProvider>,
}

impl Renderer {
    pub fn new(window: Arc<Window>, zoom: f32, art: Box<dyn ArtProvider>) -> Result<Self, Error> {
        let zoom = clamp_camera_zoom(zoom);
        let size = window.inner_size();
        let virtual_viewport = virtual_size(size.width, size.height, zoom);
        let pixels =
            Self::build_pixels(Arc::clone(&window), size.width, size.height, virtual_viewport)?;
        Ok(Self {
            window,
            pixels,
            virtual_viewport,
            zoom,
            art,
        })
    }

    fn build_pixels(
        window: Arc<Window>,
        surface_width: u32,
        surface_height: u32,
        virtual_viewport: (u32, u32),
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width.max(1), surface_height.max(1), window);
        Pixels::new(virtual_viewport.0, virtual_viewport.1, surface)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.virtual_viewport = virtual_size(width, height, self.zoom);
        self.pixels =
            Self::build_pixels(Arc::clone(&self.window), width, height, self.virtual_viewport)?;
        Ok(())
    }

    pub fn virtual_viewport(&self) -> (u32, u32) {
        self.virtual_viewport
    }

    pub fn render_frame(&mut self, prep: &FramePrep) -> Result<(), Error> {
        let (width, height) = self.virtual_viewport;
        if width == 0 || height == 0 {
            return Ok(());
        }
        let frame = self.pixels.frame_mut();
        self.art.draw_background(
            prep.background,
            prep.tick,
            prep.camera_offset,
            frame,
            width,
            height,
        );
        rasterize_plan(
            frame,
            width,
            height,
            &prep.plan,
            prep.camera_offset,
            prep.tick,
            self.art.as_mut(),
        );
        rasterize_overlays(frame, width, height, &prep.overlays, prep.camera_offset);
        self.pixels.render()
    }
}

fn virtual_size(width: u32, height: u32, zoom: f32) -> (u32, u32) {
    let zoom = clamp_camera_zoom(zoom);
    (
        ((width as f32 / zoom).round() as u32).max(1),
        ((height as f32 / zoom).round() as u32).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::effects::{EffectMap, HitEffect};
    use crate::app::rendering::sprites::LoadedSprite;
    use crate::app::Facing;

    #[derive(Default)]
    struct CountingArt {
        tile_lookups: usize,
    }

    impl ArtProvider for CountingArt {
        fn tile_image(
            &mut self,
            _visual: u16,
            _elevated: bool,
            _anim_frame: u64,
        ) -> Option<&LoadedSprite> {
            self.tile_lookups += 1;
            None
        }

        fn player_image(
            &mut self,
            _color: Rgba,
            _facing: Facing,
            _anim_frame: u64,
            _character: u8,
        ) -> Option<&LoadedSprite> {
            None
        }

        fn item_image(&mut self, _kind: ItemKind, _anim_frame: u64) -> Option<&LoadedSprite> {
            None
        }

        fn projectile_image(&mut self, _kind: ProjectileKind) -> Option<&LoadedSprite> {
            None
        }
    }

    fn frame(width: u32, height: u32) -> Vec<u8> {
        vec![0; (width * height * 4) as usize]
    }

    #[test]
    fn virtual_size_divides_by_zoom_and_never_hits_zero() {
        assert_eq!(virtual_size(1280, 720, 2.0), (640, 360));
        assert_eq!(virtual_size(1, 1, 4.0), (1, 1));
    }

    #[test]
    fn plan_without_sprites_rasterizes_placeholders() {
        let mut buffer = frame(128, 128);
        let mut art = CountingArt::default();
        let plan = vec![
            DrawCommand::Ground {
                x: 0,
                y: 0,
                visual: 0,
            },
            DrawCommand::Elevated {
                x: 1,
                y: 0,
                visual: 1,
            },
        ];
        rasterize_plan(
            &mut buffer,
            128,
            128,
            &plan,
            Vec2::new(64.0, 64.0),
            0,
            &mut art,
        );
        assert_eq!(art.tile_lookups, 2);
        assert!(buffer.chunks_exact(4).any(|px| px[3] != 0));
    }

    #[test]
    fn zero_length_aim_direction_draws_nothing() {
        let mut buffer = frame(64, 64);
        let mut art = CountingArt::default();
        let plan = vec![DrawCommand::AimDecal {
            origin: Vec2::new(0.0, 0.0),
            direction: Vec2::new(0.0, 0.0),
            charging: true,
        }];
        rasterize_plan(
            &mut buffer,
            64,
            64,
            &plan,
            Vec2::new(32.0, 32.0),
            0,
            &mut art,
        );
        assert!(buffer.iter().all(|byte| *byte == 0));
    }

    #[test]
    fn hit_overlay_paints_in_screen_space() {
        let mut buffer = frame(64, 64);
        let map: EffectMap<HitEffect> = EffectMap::default();
        map.register(
            0,
            300,
            HitEffect {
                position: Vec2::new(0.0, 0.0),
                color: [255, 0, 0, 255],
            },
        );
        let overlays = FrameOverlays {
            hits: map.live(150),
            ..FrameOverlays::default()
        };
        rasterize_overlays(&mut buffer, 64, 64, &overlays, Vec2::new(32.0, 32.0));
        assert!(buffer.chunks_exact(4).any(|px| px == [255, 0, 0, 255]));
    }
}
