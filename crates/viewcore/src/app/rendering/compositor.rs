use std::collections::HashMap;

use super::culling::TileRect;
use crate::app::{
    Facing, ItemKind, ItemSnapshot, PlayerId, PlayerSnapshot, ProjectileKind, ProjectileSnapshot,
    Rgba, Vec2, WorldSnapshot,
};

/// One composited draw step. A fixed tagged variant rather than a boxed
/// closure so draw order is testable without touching pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Ground {
        x: i32,
        y: i32,
        visual: u16,
    },
    Elevated {
        x: i32,
        y: i32,
        visual: u16,
    },
    AimDecal {
        origin: Vec2,
        direction: Vec2,
        charging: bool,
    },
    Item {
        cell: (i32, i32),
        kind: ItemKind,
    },
    Projectile {
        position: Vec2,
        kind: ProjectileKind,
    },
    Player {
        id: PlayerId,
        position: Vec2,
        facing: Facing,
        character: u8,
        color: Rgba,
        local: bool,
    },
}

/// Ephemeral per-frame multimap from grid cell to pending entity draws.
/// Built fresh each frame, drained during the pass-2 scan, and whatever is
/// left (cells outside the culled rect) is flushed afterwards so nothing is
/// silently dropped.
#[derive(Debug, Default)]
pub struct CellBuckets {
    by_cell: HashMap<(i32, i32), Vec<DrawCommand>>,
}

impl CellBuckets {
    pub fn push(&mut self, cell: (i32, i32), command: DrawCommand) {
        self.by_cell.entry(cell).or_default().push(command);
    }

    pub fn drain_cell(&mut self, cell: (i32, i32)) -> Vec<DrawCommand> {
        self.by_cell.remove(&cell).unwrap_or_default()
    }

    /// Remaining entries in deterministic raster order (same row-major order
    /// as the tile scan), insertion order within a cell.
    pub fn drain_remaining(&mut self) -> Vec<DrawCommand> {
        let mut cells: Vec<(i32, i32)> = self.by_cell.keys().copied().collect();
        cells.sort_by_key(|&(x, y)| (y, x));
        let mut drained = Vec::new();
        for cell in cells {
            if let Some(mut commands) = self.by_cell.remove(&cell) {
                drained.append(&mut commands);
            }
        }
        drained
    }

    pub fn is_empty(&self) -> bool {
        self.by_cell.is_empty()
    }
}

/// Per-frame entity snapshots feeding the compositor. Player positions are
/// the smoothed visual positions; dead players are excluded upstream since a
/// full-screen state already covers them.
#[derive(Debug, Default)]
pub struct FrameEntities {
    pub items: Vec<ItemSnapshot>,
    pub projectiles: Vec<ProjectileSnapshot>,
    pub remote_players: Vec<(PlayerSnapshot, Vec2)>,
    pub local_player: Option<(PlayerSnapshot, Vec2)>,
    pub aim: Option<(Vec2, Vec2, bool)>,
}

/// Cell-granularity painter's algorithm for one frame.
///
/// Pass 1 draws every walkable tile in the culled rect row-major; ground
/// never occludes anything. Ground-plane decals go next, under elevated
/// geometry. Pass 2 repeats the scan drawing elevated tiles and draining the
/// entity bucket at each cell, so anything a row north of a wall lands
/// behind it and anything south lands in front. Bucket entries whose cell
/// fell outside the rect are flushed at the end, exactly once each.
///
/// Insertion order within a cell (items, projectiles, remote players, local
/// player) is the tie-break for co-located entities. It is a stable visual
/// parity choice, not an occlusion rule.
pub fn build_draw_plan(
    world: &WorldSnapshot,
    rect: Option<TileRect>,
    entities: &FrameEntities,
) -> Vec<DrawCommand> {
    let mut buckets = CellBuckets::default();
    for item in &entities.items {
        buckets.push(
            item.cell,
            DrawCommand::Item {
                cell: item.cell,
                kind: item.kind,
            },
        );
    }
    for projectile in &entities.projectiles {
        buckets.push(
            projectile.position.cell(),
            DrawCommand::Projectile {
                position: projectile.position,
                kind: projectile.kind,
            },
        );
    }
    for (player, visual) in &entities.remote_players {
        buckets.push(visual.cell(), player_command(player, *visual, false));
    }
    if let Some((player, visual)) = &entities.local_player {
        buckets.push(visual.cell(), player_command(player, *visual, true));
    }

    let mut plan = Vec::new();

    if let Some(rect) = rect {
        for y in rect.y_min..=rect.y_max {
            for x in rect.x_min..=rect.x_max {
                if let Some(tile) = world.tile(x, y) {
                    if tile.walkable {
                        plan.push(DrawCommand::Ground {
                            x,
                            y,
                            visual: tile.visual,
                        });
                    }
                }
            }
        }
    }

    if let Some((origin, direction, charging)) = entities.aim {
        plan.push(DrawCommand::AimDecal {
            origin,
            direction,
            charging,
        });
    }

    if let Some(rect) = rect {
        for y in rect.y_min..=rect.y_max {
            for x in rect.x_min..=rect.x_max {
                if let Some(tile) = world.tile(x, y) {
                    if !tile.walkable {
                        plan.push(DrawCommand::Elevated {
                            x,
                            y,
                            visual: tile.visual,
                        });
                    }
                }
                plan.extend(buckets.drain_cell((x, y)));
            }
        }
    }

    plan.extend(buckets.drain_remaining());
    plan
}

fn player_command(player: &PlayerSnapshot, visual: Vec2, local: bool) -> DrawCommand {
    DrawCommand::Player {
        id: player.id,
        position: visual,
        facing: player.facing,
        character: player.character,
        color: player.color,
        local,
    }
}
