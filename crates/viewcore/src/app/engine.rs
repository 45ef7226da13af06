use std::collections::HashSet;
use std::sync::Arc;

use crate::app::clock::TimeSource;
use crate::app::effects::{
    DeathEffect, EffectId, ExplosionEffect, HitEffect, LiveEffect, TeleportEffect,
    TransientEffects, EXPLOSION_SHAKE_DURATION_MS, EXPLOSION_SHAKE_INTENSITY,
};
use crate::app::interp::VisualPositions;
use crate::app::rendering::camera::{camera_offset, CameraShake};
use crate::app::rendering::compositor::{build_draw_plan, DrawCommand, FrameEntities};
use crate::app::rendering::culling::visible_tile_rect;
use crate::app::rendering::projection;
use crate::app::rendering::renderer::Renderer;
use crate::app::snapshot::{
    BackgroundKind, ItemSnapshot, LocalState, PlayerId, PlayerSnapshot, ProjectileSnapshot,
    SharedCell, SharedMap, Vec2, WorldSnapshot,
};

/// Shared handles between the render loop and its producers. Producers
/// (network thread, input thread) write through these; the render loop takes
/// one snapshot of each at the start of every frame and never sees mid-frame
/// writes.
#[derive(Clone)]
pub struct ViewScene {
    pub world: SharedCell<WorldSnapshot>,
    pub players: SharedMap<PlayerId, PlayerSnapshot>,
    pub items: SharedMap<u64, ItemSnapshot>,
    pub projectiles: SharedMap<u64, ProjectileSnapshot>,
    pub local: SharedCell<LocalState>,
    pub effects: TransientEffects,
}

impl ViewScene {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            world: SharedCell::new(WorldSnapshot::default()),
            players: SharedMap::default(),
            items: SharedMap::default(),
            projectiles: SharedMap::default(),
            local: SharedCell::new(LocalState::default()),
            effects: TransientEffects::new(clock),
        }
    }
}

/// Live transient effects for one frame, drawn after depth compositing.
#[derive(Debug, Default)]
pub struct FrameOverlays {
    pub hits: Vec<LiveEffect<HitEffect>>,
    pub deaths: Vec<LiveEffect<DeathEffect>>,
    pub teleports: Vec<LiveEffect<TeleportEffect>>,
    pub explosions: Vec<LiveEffect<ExplosionEffect>>,
}

/// Everything a frame needs, computed headlessly before any pixel is
/// touched.
#[derive(Debug)]
pub struct FramePrep {
    pub now_ms: u64,
    pub tick: u64,
    pub background: BackgroundKind,
    pub camera_offset: Vec2,
    pub plan: Vec<DrawCommand>,
    pub overlays: FrameOverlays,
}

/// Render-side state that persists across frames: the animation tick, the
/// shake generator, smoothed positions, and the last camera offset (which
/// anchors screen/world conversions between frames).
pub struct ViewState {
    clock: Arc<dyn TimeSource>,
    tick: u64,
    shake: CameraShake,
    visual_positions: VisualPositions,
    shaken_explosions: HashSet<EffectId>,
    focus: Option<Vec2>,
    last_camera_offset: Vec2,
}

impl ViewState {
    pub fn new(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            clock,
            tick: 0,
            shake: CameraShake::default(),
            visual_positions: VisualPositions::default(),
            shaken_explosions: HashSet::new(),
            focus: None,
            last_camera_offset: Vec2::default(),
        }
    }

    pub fn trigger_shake(&mut self, intensity: f32, duration_ms: u64) {
        self.shake
            .trigger(self.clock.now_ms(), intensity, duration_ms);
    }

    /// Drop all smoothed positions. Call on respawn or world change so
    /// entities reappear in place instead of sliding from stale positions.
    pub fn reset_visual_positions(&mut self) {
        self.visual_positions.reset();
        self.focus = None;
    }

    /// Project a world position with the camera offset of the last prepared
    /// frame.
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        projection::world_to_screen(world, self.last_camera_offset)
    }

    /// Inverse of [`ViewState::world_to_screen`], for picking.
    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        projection::screen_to_world(screen, self.last_camera_offset)
    }

    /// Advance one frame: snapshot the scene, smooth positions, collect live
    /// effects, place the camera, cull, and build the depth-ordered plan.
    ///
    /// Explosions observed on their first frame request a shake before the
    /// camera offset is computed, so the jolt lands on the same frame the
    /// explosion appears.
    pub fn prepare_frame(&mut self, scene: &ViewScene, viewport: (u32, u32)) -> FramePrep {
        self.tick = self.tick.wrapping_add(1);
        let now_ms = self.clock.now_ms();

        let world = scene.world.snapshot();
        let players = scene.players.snapshot();
        let local_state = scene.local.snapshot();

        self.visual_positions
            .prune(|id| players.contains_key(&id));

        let overlays = FrameOverlays {
            hits: scene.effects.hits.live(now_ms),
            deaths: scene.effects.deaths.live(now_ms),
            teleports: scene.effects.teleports.live(now_ms),
            explosions: scene.effects.explosions.live(now_ms),
        };
        // Each explosion jolts the camera exactly once, on its first observed
        // frame. The id set is pruned alongside the registry so it cannot grow
        // past the live explosion count.
        self.shaken_explosions
            .retain(|id| overlays.explosions.iter().any(|explosion| explosion.id == *id));
        for explosion in &overlays.explosions {
            if self.shaken_explosions.insert(explosion.id) {
                self.shake
                    .trigger(now_ms, EXPLOSION_SHAKE_INTENSITY, EXPLOSION_SHAKE_DURATION_MS);
            }
        }

        let local_id = local_state.player_id;
        let mut local_player: Option<(PlayerSnapshot, Vec2)> = None;
        let mut remote_players: Vec<(PlayerSnapshot, Vec2)> = Vec::new();

        let mut sorted: Vec<&PlayerSnapshot> = players.values().collect();
        sorted.sort_by_key(|player| player.id);
        for player in sorted {
            let visual = self.visual_positions.update(player.id, player.position);
            if Some(player.id) == local_id {
                // The camera follows the local player even through death.
                self.focus = Some(visual);
                if !player.dead && !local_state.dead {
                    local_player = Some((*player, visual));
                }
            } else if !player.dead {
                remote_players.push((*player, visual));
            }
        }

        let focus = self.focus.unwrap_or_else(|| {
            Vec2::new(world.width() as f32 * 0.5, world.height() as f32 * 0.5)
        });
        let offset = camera_offset(viewport, focus, self.shake.offset(now_ms));
        self.last_camera_offset = offset;

        let mut items: Vec<ItemSnapshot> = scene.items.snapshot().into_values().collect();
        items.sort_by_key(|item| item.id);
        let mut projectiles: Vec<ProjectileSnapshot> =
            scene.projectiles.snapshot().into_values().collect();
        projectiles.sort_by_key(|projectile| projectile.id);

        let aim = local_player.as_ref().and_then(|(_, visual)| {
            local_state
                .aim
                .map(|direction| (*visual, direction, local_state.charging))
        });

        let entities = FrameEntities {
            items,
            projectiles,
            remote_players,
            local_player,
            aim,
        };

        let rect = visible_tile_rect(viewport, offset, world.width(), world.height());
        let plan = build_draw_plan(&world, rect, &entities);

        FramePrep {
            now_ms,
            tick: self.tick,
            background: world.background(),
            camera_offset: offset,
            plan,
            overlays,
        }
    }
}

/// Owning bundle of the scene handles, the per-frame state, and the
/// windowed renderer. One instance per window; the loop runner drives it.
pub struct ViewEngine {
    state: ViewState,
    scene: ViewScene,
    renderer: Renderer,
}

impl ViewEngine {
    pub fn new(scene: ViewScene, clock: Arc<dyn TimeSource>, renderer: Renderer) -> Self {
        Self {
            state: ViewState::new(clock),
            scene,
            renderer,
        }
    }

    /// Prepare and present one frame, returning what was drawn.
    pub fn render(&mut self) -> Result<FramePrep, pixels::Error> {
        let prep = self
            .state
            .prepare_frame(&self.scene, self.renderer.virtual_viewport());
        self.renderer.render_frame(&prep)?;
        Ok(prep)
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), pixels::Error> {
        self.renderer.resize(width, height)
    }

    pub fn scene(&self) -> &ViewScene {
        &self.scene
    }

    pub fn trigger_shake(&mut self, intensity: f32, duration_ms: u64) {
        self.state.trigger_shake(intensity, duration_ms);
    }

    pub fn reset_visual_positions(&mut self) {
        self.state.reset_visual_positions();
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        self.state.world_to_screen(world)
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        self.state.screen_to_world(screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::clock::ManualTimeSource;
    use crate::app::effects::EXPLOSION_DURATION_MS;
    use crate::app::snapshot::{Facing, Tile};

    const VIEWPORT: (u32, u32) = (640, 360);

    fn ground_world(size: u32) -> WorldSnapshot {
        WorldSnapshot::filled(
            size,
            size,
            BackgroundKind::Plains,
            Tile {
                walkable: true,
                visual: 0,
            },
        )
    }

    fn player(id: u64, x: f32, y: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            id: PlayerId(id),
            position: Vec2::new(x, y),
            facing: Facing::South,
            character: 0,
            color: [200, 60, 60, 255],
            dead: false,
        }
    }

    fn scene_with_local(clock: Arc<ManualTimeSource>) -> ViewScene {
        let scene = ViewScene::new(clock);
        scene.world.set(ground_world(16));
        scene.players.insert(PlayerId(1), player(1, 5.0, 5.0));
        scene.local.update(|local| {
            local.player_id = Some(PlayerId(1));
        });
        scene
    }

    #[test]
    fn local_player_lands_at_viewport_center() {
        let clock = ManualTimeSource::shared(0);
        let scene = scene_with_local(clock.clone());
        let mut state = ViewState::new(clock);

        let prep = state.prepare_frame(&scene, VIEWPORT);
        let on_screen =
            projection::world_to_screen(Vec2::new(5.0, 5.0), prep.camera_offset);
        assert!((on_screen.x - 320.0).abs() < 1e-3);
        assert!((on_screen.y - 180.0).abs() < 1e-3);
    }

    #[test]
    fn screen_world_round_trip_uses_last_frame_offset() {
        let clock = ManualTimeSource::shared(0);
        let scene = scene_with_local(clock.clone());
        let mut state = ViewState::new(clock);
        state.prepare_frame(&scene, VIEWPORT);

        let world = Vec2::new(3.5, 7.25);
        let back = state.screen_to_world(state.world_to_screen(world));
        assert!(world.distance_to(back) < 1e-3);
    }

    #[test]
    fn dead_local_player_is_not_drawn_but_still_anchors_the_camera() {
        let clock = ManualTimeSource::shared(0);
        let scene = scene_with_local(clock.clone());
        scene.players.insert(PlayerId(1), {
            let mut dead = player(1, 5.0, 5.0);
            dead.dead = true;
            dead
        });
        let mut state = ViewState::new(clock);

        let prep = state.prepare_frame(&scene, VIEWPORT);
        assert!(!prep
            .plan
            .iter()
            .any(|command| matches!(command, DrawCommand::Player { .. })));
        let on_screen =
            projection::world_to_screen(Vec2::new(5.0, 5.0), prep.camera_offset);
        assert!((on_screen.x - 320.0).abs() < 1e-3);
    }

    #[test]
    fn first_frame_explosion_shakes_that_same_frame() {
        let clock = ManualTimeSource::shared(1_000);
        let scene = scene_with_local(clock.clone());
        let mut state = ViewState::new(clock.clone());
        let steady = state.prepare_frame(&scene, VIEWPORT).camera_offset;

        scene.effects.trigger_explosion(Vec2::new(5.0, 5.0), 2.0);
        clock.advance_ms(16);
        let shaken = state.prepare_frame(&scene, VIEWPORT).camera_offset;
        assert!(steady.distance_to(shaken) > 1e-3);
    }

    #[test]
    fn explosion_shakes_once_and_decays_instead_of_restarting() {
        let clock = ManualTimeSource::shared(0);
        let scene = scene_with_local(clock.clone());
        let mut state = ViewState::new(clock.clone());

        scene.effects.trigger_explosion(Vec2::new(5.0, 5.0), 2.0);
        clock.advance_ms(10);
        state.prepare_frame(&scene, VIEWPORT);
        let remaining_first = state.shake.remaining_intensity(clock.now_ms());
        assert!((remaining_first - EXPLOSION_SHAKE_INTENSITY).abs() < 1e-4);

        // Later frames see the same live explosion but must not re-trigger;
        // the remainder keeps decaying below full intensity.
        clock.advance_ms(20);
        state.prepare_frame(&scene, VIEWPORT);
        let remaining_second = state.shake.remaining_intensity(clock.now_ms());
        assert!(remaining_second < remaining_first);
        assert!(remaining_second < EXPLOSION_SHAKE_INTENSITY - 1e-4);
    }

    #[test]
    fn a_later_explosion_triggers_a_fresh_shake() {
        let clock = ManualTimeSource::shared(0);
        let scene = scene_with_local(clock.clone());
        let mut state = ViewState::new(clock.clone());

        scene.effects.trigger_explosion(Vec2::new(5.0, 5.0), 2.0);
        state.prepare_frame(&scene, VIEWPORT);

        // Let both the explosion and its shake run out entirely.
        clock.advance_ms(EXPLOSION_DURATION_MS + 100);
        state.prepare_frame(&scene, VIEWPORT);
        assert!(state.shake.remaining_intensity(clock.now_ms()) < 1e-6);

        scene.effects.trigger_explosion(Vec2::new(4.0, 4.0), 1.0);
        state.prepare_frame(&scene, VIEWPORT);
        assert!(state.shake.remaining_intensity(clock.now_ms()) > 1.0);
    }

    #[test]
    fn aim_decal_present_only_while_aiming_and_alive() {
        let clock = ManualTimeSource::shared(0);
        let scene = scene_with_local(clock.clone());
        let mut state = ViewState::new(clock);

        let prep = state.prepare_frame(&scene, VIEWPORT);
        assert!(!prep
            .plan
            .iter()
            .any(|command| matches!(command, DrawCommand::AimDecal { .. })));

        scene.local.update(|local| {
            local.aim = Some(Vec2::new(1.0, 0.0));
            local.charging = true;
        });
        let prep = state.prepare_frame(&scene, VIEWPORT);
        assert!(prep.plan.iter().any(|command| matches!(
            command,
            DrawCommand::AimDecal { charging: true, .. }
        )));
    }

    #[test]
    fn missing_local_player_centers_on_the_world() {
        let clock = ManualTimeSource::shared(0);
        let scene = ViewScene::new(clock.clone());
        scene.world.set(ground_world(10));
        let mut state = ViewState::new(clock);

        let prep = state.prepare_frame(&scene, VIEWPORT);
        let on_screen =
            projection::world_to_screen(Vec2::new(5.0, 5.0), prep.camera_offset);
        assert!((on_screen.x - 320.0).abs() < 1e-3);
        assert!((on_screen.y - 180.0).abs() < 1e-3);
    }

    #[test]
    fn removed_players_are_pruned_and_snap_on_return() {
        let clock = ManualTimeSource::shared(0);
        let scene = scene_with_local(clock.clone());
        scene.players.insert(PlayerId(2), player(2, 1.0, 1.0));
        let mut state = ViewState::new(clock);
        state.prepare_frame(&scene, VIEWPORT);

        scene.players.remove(&PlayerId(2));
        state.prepare_frame(&scene, VIEWPORT);
        assert!(state.visual_positions.get(PlayerId(2)).is_none());

        // Reappearing far away snaps instead of sliding.
        scene.players.insert(PlayerId(2), player(2, 9.0, 9.0));
        state.prepare_frame(&scene, VIEWPORT);
        assert_eq!(
            state.visual_positions.get(PlayerId(2)),
            Some(Vec2::new(9.0, 9.0))
        );
    }
}
