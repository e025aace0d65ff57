mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::InputAction;
pub use loop_runner::{run_app, AppError, LoopConfig, SLOW_FRAME_ENV_VAR};
pub use metrics::LoopMetricsSnapshot;
pub use rendering::{
    map_to_screen_px, screen_to_map_px, MapCamera, Renderer, Viewport, MAP_PADDING_PX,
};
pub use scene::{
    InputSnapshot, MapFrame, MapMarker, MapMarkerKind, MapSegment, MapSegmentKind, Scene,
    SceneCommand, Vec2,
};
