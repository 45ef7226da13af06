use std::collections::HashMap;

use crate::app::{PlayerId, Vec2};

/// Fraction of the residual distance closed per frame.
pub const VISUAL_LERP_FACTOR: f32 = 0.3;
/// Below this residual distance the visual position snaps exactly onto the
/// world position, ending the approach.
pub const VISUAL_SNAP_EPSILON: f32 = 0.01;

/// Render-owned smoothed positions that hide discrete grid movement. One
/// entry per observed player; the first observation snaps, later frames
/// exponentially approach the authoritative position.
///
/// Owned exclusively by the render loop. Must be reset explicitly on
/// respawn/world change or a teleported entity would visibly slide from its
/// old position.
#[derive(Debug, Default)]
pub struct VisualPositions {
    by_entity: HashMap<PlayerId, Vec2>,
}

impl VisualPositions {
    /// Advance the entry for `id` one frame toward `target` and return the
    /// resulting visual position.
    pub fn update(&mut self, id: PlayerId, target: Vec2) -> Vec2 {
        let visual = self.by_entity.entry(id).or_insert(target);
        visual.x += (target.x - visual.x) * VISUAL_LERP_FACTOR;
        visual.y += (target.y - visual.y) * VISUAL_LERP_FACTOR;
        if visual.distance_to(target) < VISUAL_SNAP_EPSILON {
            *visual = target;
        }
        *visual
    }

    pub fn get(&self, id: PlayerId) -> Option<Vec2> {
        self.by_entity.get(&id).copied()
    }

    /// Drop entries for entities no longer present in the world snapshot.
    pub fn prune(&mut self, is_present: impl Fn(PlayerId) -> bool) {
        self.by_entity.retain(|id, _| is_present(*id));
    }

    /// Clear all interpolation state (respawn / world change).
    pub fn reset(&mut self) {
        self.by_entity.clear();
    }

    pub fn len(&self) -> usize {
        self.by_entity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_entity.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_observation_snaps_to_target() {
        let mut positions = VisualPositions::default();
        let visual = positions.update(PlayerId(1), Vec2::new(7.0, -2.0));
        assert_eq!(visual, Vec2::new(7.0, -2.0));
    }

    #[test]
    fn residual_distance_decays_geometrically() {
        let mut positions = VisualPositions::default();
        let id = PlayerId(1);
        positions.update(id, Vec2::new(0.0, 0.0));
        let target = Vec2::new(1.0, 0.0);

        let mut expected = 1.0f32;
        for _ in 0..12 {
            let visual = positions.update(id, target);
            expected *= 1.0 - VISUAL_LERP_FACTOR;
            let residual = visual.distance_to(target);
            assert!(
                (residual - expected).abs() < 1e-5,
                "residual {residual} vs expected {expected}"
            );
            assert!(visual != target);
        }
    }

    #[test]
    fn snaps_exactly_once_below_epsilon() {
        let mut positions = VisualPositions::default();
        let id = PlayerId(1);
        positions.update(id, Vec2::new(0.0, 0.0));
        let target = Vec2::new(1.0, 0.0);

        // (1 - 0.3)^13 ≈ 0.0097 < 0.01, so the 13th frame lands exactly.
        for _ in 0..13 {
            positions.update(id, target);
        }
        assert_eq!(positions.get(id), Some(target));
    }

    #[test]
    fn prune_discards_absent_entities() {
        let mut positions = VisualPositions::default();
        positions.update(PlayerId(1), Vec2::new(1.0, 1.0));
        positions.update(PlayerId(2), Vec2::new(2.0, 2.0));
        positions.prune(|id| id == PlayerId(2));
        assert!(positions.get(PlayerId(1)).is_none());
        assert!(positions.get(PlayerId(2)).is_some());
    }

    #[test]
    fn reset_clears_everything() {
        let mut positions = VisualPositions::default();
        positions.update(PlayerId(1), Vec2::new(1.0, 1.0));
        positions.reset();
        assert!(positions.is_empty());
    }
}
