use std::env;
use std::path::PathBuf;

use station_engine::{resolve_app_paths, LoopConfig, Scene, StartupError};
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::layout::{self, LayoutError, StationLayout};
use super::station::StationScene;

const LAYOUT_ENV_VAR: &str = "STATION_LAYOUT";
const LAYOUT_FILE_NAME: &str = "station.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Station Startup ===");

    let layout = load_station_layout()?;
    let scene = StationScene::new(layout)?;

    Ok(AppWiring {
        config: LoopConfig::default(),
        scene: Box::new(scene),
    })
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

/// An explicit `STATION_LAYOUT` must load. Otherwise the project's
/// `assets/station.json` is used when present, and the built-in station when
/// it is not or when no project root can be found.
fn load_station_layout() -> Result<StationLayout, BootstrapError> {
    if let Some(path) = layout_override(env::var(LAYOUT_ENV_VAR)) {
        info!(
            env_var = LAYOUT_ENV_VAR,
            path = %path.display(),
            "station_layout_override"
        );
        return Ok(layout::load_layout(&path)?);
    }

    match resolve_app_paths() {
        Ok(paths) => Ok(layout::load_or_default(
            &paths.assets_dir.join(LAYOUT_FILE_NAME),
        )?),
        Err(StartupError::RootNotFound { start_dir, .. }) => {
            warn!(start_dir = %start_dir.display(), "project_root_not_found");
            Ok(StationLayout::builtin())
        }
        Err(err) => Err(err.into()),
    }
}

fn layout_override(raw: Result<String, env::VarError>) -> Option<PathBuf> {
    raw.ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
