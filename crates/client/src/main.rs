use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use viewcore::{
    resolve_asset_root, run_view, BackgroundKind, Facing, FileArtProvider, ItemKind, ItemSnapshot,
    LocalState, LoopConfig, PlayerId, PlayerSnapshot, ProjectileKind, ProjectileSnapshot,
    SystemTimeSource, Tile, Vec2, ViewScene, WorldSnapshot, CAMERA_ZOOM_DEFAULT,
};

const CONFIG_ENV_VAR: &str = "GRIDFALL_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "session.json";

const DEMO_WORLD_SIZE: u32 = 24;
const PRODUCER_STEP_MS: u64 = 100;
const REMOTE_PATROL_HALF_EXTENT: f32 = 6.0;
const PROJECTILE_ORBIT_RADIUS: f32 = 4.0;
const EXPLOSION_EVERY_STEPS: u64 = 30;
const HIT_EVERY_STEPS: u64 = 12;
const TELEPORT_EVERY_STEPS: u64 = 47;

const LOCAL_ID: PlayerId = PlayerId(1);
const REMOTE_ID: PlayerId = PlayerId(2);

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SessionConfig {
    window_title: String,
    window_width: u32,
    window_height: u32,
    zoom: f32,
    metrics_log_interval_ms: u64,
    max_render_fps: Option<u32>,
    asset_root: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window_title: "Gridfall".to_string(),
            window_width: 1280,
            window_height: 720,
            zoom: CAMERA_ZOOM_DEFAULT,
            metrics_log_interval_ms: 1_000,
            max_render_fps: None,
            asset_root: None,
        }
    }
}

#[derive(Debug, Error)]
enum ConfigError {
    #[error("failed to read session config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse session config at {path} (at {field}): {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Load the session config from `$GRIDFALL_CONFIG` or `session.json`. A
/// missing file is not an error; defaults apply.
fn load_session_config(path: &Path) -> Result<SessionConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "session_config_missing_using_defaults");
            return Ok(SessionConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|error| ConfigError::Parse {
        path: path.to_path_buf(),
        field: error.path().to_string(),
        source: error.into_inner(),
    })
}

fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// A bordered plains map with a few wall pillars and a dirt patch, enough to
/// exercise both compositing passes.
fn demo_world() -> WorldSnapshot {
    let mut world = WorldSnapshot::filled(
        DEMO_WORLD_SIZE,
        DEMO_WORLD_SIZE,
        BackgroundKind::Plains,
        Tile {
            walkable: true,
            visual: 0,
        },
    );
    let wall = Tile {
        walkable: false,
        visual: 0,
    };
    let edge = DEMO_WORLD_SIZE as i32 - 1;
    for i in 0..=edge {
        world.set_tile(i, 0, wall);
        world.set_tile(i, edge, wall);
        world.set_tile(0, i, wall);
        world.set_tile(edge, i, wall);
    }
    for (x, y) in [(8, 8), (8, 15), (15, 8), (15, 15), (12, 10)] {
        world.set_tile(x, y, wall);
    }
    let dirt = Tile {
        walkable: true,
        visual: 1,
    };
    for y in 4..7 {
        for x in 16..20 {
            world.set_tile(x, y, dirt);
        }
    }
    world
}

fn local_player(position: Vec2) -> PlayerSnapshot {
    PlayerSnapshot {
        id: LOCAL_ID,
        position,
        facing: Facing::South,
        character: 0,
        color: [90, 160, 255, 255],
        dead: false,
    }
}

/// Corner of a square patrol path around the map center, advanced one edge
/// per call count.
fn patrol_position(step: u64) -> (Vec2, Facing) {
    let center = DEMO_WORLD_SIZE as f32 * 0.5;
    let half = REMOTE_PATROL_HALF_EXTENT;
    let leg = (step / 20) % 4;
    let t = (step % 20) as f32 / 20.0;
    match leg {
        0 => (
            Vec2::new(center - half + 2.0 * half * t, center - half),
            Facing::East,
        ),
        1 => (
            Vec2::new(center + half, center - half + 2.0 * half * t),
            Facing::South,
        ),
        2 => (
            Vec2::new(center + half - 2.0 * half * t, center + half),
            Facing::West,
        ),
        _ => (
            Vec2::new(center - half, center + half - 2.0 * half * t),
            Facing::North,
        ),
    }
}

fn orbit_position(step: u64) -> Vec2 {
    let center = DEMO_WORLD_SIZE as f32 * 0.5;
    let angle = step as f32 * 0.12;
    Vec2::new(
        center + angle.cos() * PROJECTILE_ORBIT_RADIUS,
        center + angle.sin() * PROJECTILE_ORBIT_RADIUS,
    )
}

/// Stand-in for the network thread: pushes authoritative updates through the
/// shared scene handles at a server-ish cadence.
fn spawn_demo_producer(scene: ViewScene) {
    thread::spawn(move || {
        let mut step: u64 = 0;
        loop {
            let (position, facing) = patrol_position(step);
            scene.players.insert(
                REMOTE_ID,
                PlayerSnapshot {
                    id: REMOTE_ID,
                    position,
                    facing,
                    character: 1,
                    color: [230, 90, 90, 255],
                    dead: false,
                },
            );
            scene.projectiles.insert(
                1,
                ProjectileSnapshot {
                    id: 1,
                    position: orbit_position(step),
                    kind: ProjectileKind::Bolt,
                },
            );

            if step % HIT_EVERY_STEPS == 0 {
                scene.effects.trigger_hit(position, [230, 90, 90, 255]);
            }
            if step % EXPLOSION_EVERY_STEPS == 0 {
                scene.effects.trigger_explosion(orbit_position(step), 2.0);
            }
            if step % TELEPORT_EVERY_STEPS == 0 {
                scene.effects.trigger_teleport(position);
            }

            step = step.wrapping_add(1);
            thread::sleep(Duration::from_millis(PRODUCER_STEP_MS));
        }
    });
}

fn main() {
    init_tracing();
    info!("=== Gridfall Client Startup ===");

    let path = config_path();
    let session = match load_session_config(&path) {
        Ok(session) => session,
        Err(err) => {
            error!(error = %err, "config_load_failed");
            std::process::exit(1);
        }
    };

    let asset_root = session.asset_root.clone().unwrap_or_else(|| {
        resolve_asset_root().unwrap_or_else(|err| {
            warn!(error = %err, "asset_root_not_found_using_relative_assets");
            PathBuf::from("assets")
        })
    });
    info!(asset_root = %asset_root.display(), "asset_root_resolved");

    let clock = Arc::new(SystemTimeSource::new());
    let scene = ViewScene::new(clock.clone());
    scene.world.set(demo_world());

    let center = DEMO_WORLD_SIZE as f32 * 0.5;
    scene
        .players
        .insert(LOCAL_ID, local_player(Vec2::new(center, center)));
    scene.local.set(LocalState {
        player_id: Some(LOCAL_ID),
        dead: false,
        charging: false,
        aim: Some(Vec2::new(1.0, 0.0)),
    });
    scene.items.insert(
        1,
        ItemSnapshot {
            id: 1,
            cell: (10, 12),
            kind: ItemKind::Health,
        },
    );
    scene.items.insert(
        2,
        ItemSnapshot {
            id: 2,
            cell: (17, 5),
            kind: ItemKind::Relic,
        },
    );

    spawn_demo_producer(scene.clone());

    let config = LoopConfig {
        window_title: session.window_title.clone(),
        window_width: session.window_width,
        window_height: session.window_height,
        zoom: session.zoom,
        metrics_log_interval: Duration::from_millis(session.metrics_log_interval_ms.max(1)),
        max_render_fps: session.max_render_fps,
    };
    let art = Box::new(FileArtProvider::new(asset_root));

    if let Err(err) = run_view(config, scene, clock, art) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        let session =
            load_session_config(Path::new("definitely/not/a/real/session.json")).expect("defaults");
        assert_eq!(session.window_width, 1280);
        assert_eq!(session.window_height, 720);
        assert!(session.asset_root.is_none());
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"window_width": 800, "zoom": 3.0}"#).expect("write");

        let session = load_session_config(&path).expect("parse");
        assert_eq!(session.window_width, 800);
        assert_eq!(session.window_height, 720);
        assert!((session.zoom - 3.0).abs() < 1e-6);
    }

    #[test]
    fn unknown_config_field_is_reported_with_its_path() {
        let dir = tempfile::TempDir::new().expect("tempdir");
        let path = dir.path().join("session.json");
        fs::write(&path, r#"{"window_widht": 800}"#).expect("write");

        let error = load_session_config(&path).expect_err("should fail");
        assert!(matches!(error, ConfigError::Parse { .. }));
    }

    #[test]
    fn demo_world_has_walkable_interior_and_solid_border() {
        let world = demo_world();
        let edge = DEMO_WORLD_SIZE as i32 - 1;
        assert!(!world.tile(0, 0).expect("tile").walkable);
        assert!(!world.tile(edge, edge).expect("tile").walkable);
        assert!(world.tile(3, 3).expect("tile").walkable);
    }

    #[test]
    fn patrol_stays_inside_the_demo_world() {
        for step in 0..200 {
            let (position, _) = patrol_position(step);
            assert!(position.x > 0.0 && position.x < DEMO_WORLD_SIZE as f32);
            assert!(position.y > 0.0 && position.y < DEMO_WORLD_SIZE as f32);
        }
    }
}
