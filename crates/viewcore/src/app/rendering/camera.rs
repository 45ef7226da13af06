use super::projection::world_to_screen;
use crate::app::Vec2;

pub const CAMERA_ZOOM_DEFAULT: f32 = 2.0;
pub const CAMERA_ZOOM_MIN: f32 = 1.0;
pub const CAMERA_ZOOM_MAX: f32 = 4.0;

// Two out-of-phase sine waves, vertical axis attenuated, so the shake reads
// as a jolt rather than a circular wobble. Frequencies in radians per ms.
const SHAKE_FREQ_X: f32 = 0.055;
const SHAKE_FREQ_Y: f32 = 0.041;
const SHAKE_PHASE_Y: f32 = 1.3;
const SHAKE_Y_ATTENUATION: f32 = 0.6;

#[derive(Debug, Clone, Copy)]
struct ShakeState {
    intensity: f32,
    start_ms: u64,
    end_ms: u64,
}

/// Impact-feedback offset generator. A new request only replaces the active
/// shake when its intensity exceeds what is still left of the old one after
/// linear decay, so chip damage cannot cut off an explosion mid-rumble.
#[derive(Debug, Default)]
pub struct CameraShake {
    state: Option<ShakeState>,
}

impl CameraShake {
    pub fn trigger(&mut self, now_ms: u64, intensity: f32, duration_ms: u64) {
        if !intensity.is_finite() || intensity <= 0.0 || duration_ms == 0 {
            return;
        }
        if intensity <= self.remaining_intensity(now_ms) {
            return;
        }
        self.state = Some(ShakeState {
            intensity,
            start_ms: now_ms,
            end_ms: now_ms.saturating_add(duration_ms),
        });
    }

    /// Linearly decayed intensity of the active shake, zero once elapsed.
    pub fn remaining_intensity(&self, now_ms: u64) -> f32 {
        let Some(state) = self.state else {
            return 0.0;
        };
        if now_ms >= state.end_ms {
            return 0.0;
        }
        let total_ms = state.end_ms.saturating_sub(state.start_ms) as f32;
        let elapsed_ms = now_ms.saturating_sub(state.start_ms) as f32;
        state.intensity * (1.0 - elapsed_ms / total_ms)
    }

    /// Deterministic screen-space offset for the given instant. `(0, 0)`
    /// once the shake window has elapsed.
    pub fn offset(&self, now_ms: u64) -> Vec2 {
        let remaining = self.remaining_intensity(now_ms);
        if remaining <= 0.0 {
            return Vec2::default();
        }
        let Some(state) = self.state else {
            return Vec2::default();
        };
        let elapsed_ms = now_ms.saturating_sub(state.start_ms) as f32;
        Vec2 {
            x: (elapsed_ms * SHAKE_FREQ_X).sin() * remaining,
            y: (elapsed_ms * SHAKE_FREQ_Y + SHAKE_PHASE_Y).sin() * remaining * SHAKE_Y_ATTENUATION,
        }
    }
}

/// Camera offset that puts the local player's smoothed visual position at
/// the center of the virtual viewport, with shake added on top. All math is
/// zoom-agnostic: the virtual viewport is already `real_size / zoom`.
pub fn camera_offset(viewport: (u32, u32), local_visual: Vec2, shake: Vec2) -> Vec2 {
    let projected = world_to_screen(local_visual, Vec2::default());
    Vec2 {
        x: viewport.0 as f32 * 0.5 - projected.x + shake.x,
        y: viewport.1 as f32 * 0.5 - projected.y + shake.y,
    }
}

pub fn clamp_camera_zoom(zoom: f32) -> f32 {
    if !zoom.is_finite() {
        return CAMERA_ZOOM_DEFAULT;
    }
    zoom.clamp(CAMERA_ZOOM_MIN, CAMERA_ZOOM_MAX)
}
