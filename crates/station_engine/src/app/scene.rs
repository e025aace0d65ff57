use super::input::ActionStates;
use super::InputAction;

/// Top-down map coordinates: `x` is world X, `y` is world Z.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputSnapshot {
    actions: ActionStates,
    look_delta_px: Vec2,
    pointer_captured: bool,
    pointer_released: bool,
    cursor_position_px: Option<Vec2>,
    left_click_pressed: bool,
    hotkey_slot: Option<u8>,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        actions: ActionStates,
        look_delta_px: Vec2,
        pointer_captured: bool,
        pointer_released: bool,
        cursor_position_px: Option<Vec2>,
        left_click_pressed: bool,
        hotkey_slot: Option<u8>,
        window_width: u32,
        window_height: u32,
    ) -> Self {
        Self {
            actions,
            look_delta_px,
            pointer_captured,
            pointer_released,
            cursor_position_px,
            left_click_pressed,
            hotkey_slot,
            window_width,
            window_height,
        }
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_look_delta_px(mut self, look_delta_px: Vec2) -> Self {
        self.look_delta_px = look_delta_px;
        self
    }

    pub fn with_pointer_captured(mut self, pointer_captured: bool) -> Self {
        self.pointer_captured = pointer_captured;
        self
    }

    pub fn with_pointer_released(mut self, pointer_released: bool) -> Self {
        self.pointer_released = pointer_released;
        self
    }

    pub fn with_cursor_position_px(mut self, cursor_position_px: Option<Vec2>) -> Self {
        self.cursor_position_px = cursor_position_px;
        self
    }

    pub fn with_left_click_pressed(mut self, left_click_pressed: bool) -> Self {
        self.left_click_pressed = left_click_pressed;
        self
    }

    pub fn with_hotkey_slot(mut self, hotkey_slot: Option<u8>) -> Self {
        self.hotkey_slot = hotkey_slot;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }

    /// Mouse movement since the previous tick, only collected while the
    /// pointer is captured.
    pub fn look_delta_px(&self) -> Vec2 {
        self.look_delta_px
    }

    pub fn pointer_captured(&self) -> bool {
        self.pointer_captured
    }

    /// True on the tick after capture was released (Escape or focus loss).
    pub fn pointer_released(&self) -> bool {
        self.pointer_released
    }

    pub fn cursor_position_px(&self) -> Option<Vec2> {
        self.cursor_position_px
    }

    pub fn left_click_pressed(&self) -> bool {
        self.left_click_pressed
    }

    /// Zero-based index of a digit hotkey pressed since the previous tick.
    pub fn hotkey_slot(&self) -> Option<u8> {
        self.hotkey_slot
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    CapturePointer,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapMarkerKind {
    Anchor,
    Console,
    ConsoleFocused,
    Walker,
    TravelEffect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapMarker {
    pub position: Vec2,
    pub kind: MapMarkerKind,
    /// Yaw in radians; drawn as a short heading line.
    pub heading: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSegmentKind {
    Bounds,
    Wall,
    Door,
    Path,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSegment {
    pub from: Vec2,
    pub to: Vec2,
    pub kind: MapSegmentKind,
}

/// Everything drawn for one frame, rebuilt by the scene each render.
#[derive(Debug, Clone, Default)]
pub struct MapFrame {
    pub bounds_min: Vec2,
    pub bounds_max: Vec2,
    pub segments: Vec<MapSegment>,
    pub markers: Vec<MapMarker>,
}

impl MapFrame {
    pub fn clear(&mut self) {
        self.segments.clear();
        self.markers.clear();
    }

    pub fn set_bounds(&mut self, min: Vec2, max: Vec2) {
        self.bounds_min = min;
        self.bounds_max = max;
    }

    pub fn push_marker(&mut self, position: Vec2, kind: MapMarkerKind, heading: Option<f32>) {
        self.markers.push(MapMarker {
            position,
            kind,
            heading,
        });
    }

    pub fn push_segment(&mut self, from: Vec2, to: Vec2, kind: MapSegmentKind) {
        self.segments.push(MapSegment { from, to, kind });
    }

    pub fn push_rect(&mut self, min: Vec2, max: Vec2, kind: MapSegmentKind) {
        let top_right = Vec2::new(max.x, min.y);
        let bottom_left = Vec2::new(min.x, max.y);
        self.push_segment(min, top_right, kind);
        self.push_segment(top_right, max, kind);
        self.push_segment(max, bottom_left, kind);
        self.push_segment(bottom_left, min, kind);
    }
}

pub trait Scene {
    fn load(&mut self);
    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand;
    fn render_map(&self, frame: &mut MapFrame);
    fn unload(&mut self);
    fn debug_title(&self) -> Option<String> {
        None
    }
    /// Short label logged with loop metrics.
    fn mode_label(&self) -> &'static str {
        "-"
    }
}
