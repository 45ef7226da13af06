use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;

pub use app::{
    background_clear_color, build_draw_plan, camera_offset, clamp_camera_zoom, rasterize_overlays,
    rasterize_plan, run_view, run_view_with_metrics, screen_to_world, visible_tile_rect,
    world_to_screen, AppError, ArtProvider, BackgroundKind, CameraShake, CellBuckets, DeathEffect,
    DrawCommand, EffectId, EffectMap, ExplosionEffect, Facing, FileArtProvider, FrameEntities,
    FrameOverlays, FramePrep, HitEffect, ItemKind, ItemSnapshot, LiveEffect, LoadedSprite,
    LocalState, LoopConfig, ManualTimeSource, MetricsHandle, PlayerId, PlayerSnapshot,
    ProjectileKind, ProjectileSnapshot, RenderMetricsSnapshot, Renderer, Rgba, SharedCell,
    SharedMap, SpriteCache, SystemTimeSource, TeleportEffect, Tile, TileRect, TimeSource,
    TransientEffects, Vec2, ViewEngine, ViewScene, ViewState, VisualPositions, WorldSnapshot,
    CAMERA_ZOOM_DEFAULT, CAMERA_ZOOM_MAX, CAMERA_ZOOM_MIN, CULL_MARGIN_TILES, DEATH_DURATION_MS,
    EXPLOSION_DURATION_MS, HALF_TILE_H, HALF_TILE_W, HIT_DURATION_MS, TELEPORT_DURATION_MS,
    VISUAL_LERP_FACTOR, VISUAL_SNAP_EPSILON,
};

pub const ROOT_ENV_VAR: &str = "GRIDFALL_ROOT";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "GRIDFALL_ROOT is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and either crates/ or assets/."
    )]
    InvalidEnvRoot { path: PathBuf },
    #[error(
        "Could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and either crates/ or assets/.\n\
Set {env_var} explicitly, for example:\n\
Bash/zsh: export {env_var}=\"/path/to/gridfall\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

/// Locate the sprite asset directory: `$GRIDFALL_ROOT/assets` when the env
/// var is set, otherwise `assets/` under the nearest ancestor of the
/// executable that looks like the project root.
pub fn resolve_asset_root() -> Result<PathBuf, StartupError> {
    resolve_root().map(|root| root.join("assets"))
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot { path: normalized })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    let cargo_toml = path.join("Cargo.toml").is_file();
    let has_crates = path.join("crates").is_dir();
    let has_assets = path.join("assets").is_dir();

    cargo_toml && (has_crates || has_assets)
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
