mod renderer;
mod transform;

pub use renderer::{Renderer, MAP_PADDING_PX};
pub use transform::{map_to_screen_px, screen_to_map_px, MapCamera, Viewport};
