use std::rc::Rc;

use station_engine::nav::{
    AnchorRegistry, CameraRig, DestinationId, InputGate, LocomotionFlag, Mode, ModeStore,
    NavError, SelectionOutcome, TransitionController, TravelContext, TravelEvent,
};
use station_engine::{
    screen_to_map_px, InputAction, InputSnapshot, MapCamera, MapFrame, MapMarkerKind,
    MapSegmentKind, Pose, Scene, SceneCommand, Vec2, Vec3, Viewport, MAP_PADDING_PX,
};
use tracing::{debug, info};

use super::layout::{
    to_vec3, DoorDef, LayoutError, RoomDef, StationLayout, DEFAULT_DOOR_OPEN_SECONDS,
    DEFAULT_DOOR_SLIDE,
};

mod fx;
mod hud;
mod walker;


use fx::{DoorAnimator, StationFx};
use hud::Hud;
use walker::{WalkBounds, Walker};

const CONSOLE_REACH: f32 = 14.0;
const CONSOLE_FOCUS_RADIUS: f32 = 1.2;
const CONSOLE_MAP_PICK_RADIUS: f32 = 1.0;
const PATH_PREVIEW_SEGMENTS: usize = 24;

#[derive(Debug, Clone)]
struct Console {
    destination: DestinationId,
    label: String,
    position: Vec3,
}

/// The walkable station. Wires the navigation core to the walker, the door
/// and travel-effect hooks, and the HUD, and draws everything on the map.
pub(crate) struct StationScene {
    store: ModeStore,
    registry: Rc<AnchorRegistry>,
    gate: InputGate,
    controller: TransitionController,
    walker: Walker,
    fx: StationFx,
    hud: Hud,
    consoles: Vec<Console>,
    hotkeys: Vec<DestinationId>,
    focused_console: Option<usize>,
    bounds_min: Vec2,
    bounds_max: Vec2,
    rooms: Vec<RoomDef>,
    door: Option<DoorDef>,
}

impl StationScene {
    pub(crate) fn new(layout: StationLayout) -> Result<Self, LayoutError> {
        layout.validate()?;
        let registry = Rc::new(layout.anchor_registry()?);
        let store = ModeStore::new();
        let locomotion = LocomotionFlag::new(true);
        let gate = InputGate::new(store.clone(), Rc::clone(&registry), locomotion.clone());
        let spawn = layout.spawn_pose();
        let controller = TransitionController::new(
            store.clone(),
            Rc::clone(&registry),
            layout.transition,
            spawn,
        );
        let bounds = layout.bounds;
        let walker = Walker::new(
            spawn,
            WalkBounds::new(bounds.width, bounds.depth, bounds.margin),
            locomotion,
        );
        let doors = match layout.door {
            Some(door) => DoorAnimator::new(door.open_seconds, door.slide),
            None => DoorAnimator::new(DEFAULT_DOOR_OPEN_SECONDS, DEFAULT_DOOR_SLIDE),
        };
        let consoles = layout
            .consoles
            .iter()
            .map(|console| Console {
                destination: DestinationId::new(console.destination.as_str()),
                label: console
                    .label
                    .clone()
                    .unwrap_or_else(|| console.destination.to_uppercase()),
                position: to_vec3(console.position),
            })
            .collect();
        let hud = Hud::new(&store);

        Ok(Self {
            hotkeys: layout.anchor_order(),
            bounds_min: Vec2::new(-bounds.width * 0.5, -bounds.depth * 0.5),
            bounds_max: Vec2::new(bounds.width * 0.5, bounds.depth * 0.5),
            rooms: layout.rooms,
            door: layout.door,
            store,
            registry,
            gate,
            controller,
            walker,
            fx: StationFx::new(doors),
            hud,
            consoles,
            focused_console: None,
        })
    }

    pub(crate) fn mode(&self) -> Mode {
        self.store.mode()
    }

    pub(crate) fn camera_pose(&self) -> Pose {
        self.walker.pose()
    }

    fn handle_hotkey(&mut self, slot: u8, teleport: bool) {
        let Some(destination) = self.hotkeys.get(usize::from(slot)).cloned() else {
            debug!(slot, "hotkey_unbound");
            return;
        };
        if teleport {
            self.teleport_to(&destination);
        } else {
            let result = self
                .gate
                .redirect(destination.as_str(), self.controller.phase());
            self.report_selection(result);
        }
    }

    /// Instant move to an anchor, bypassing travel. Only while docked.
    fn teleport_to(&mut self, destination: &DestinationId) {
        if self.store.mode() != Mode::Docked {
            debug!(destination = %destination, "teleport_ignored_traveling");
            return;
        }
        match self.registry.resolve(destination.as_str()) {
            Ok(anchor) => {
                self.walker.teleport(anchor.position, anchor.facing_yaw);
                info!(destination = %destination, "teleported");
            }
            Err(error) => self.hud.report_failure(&error),
        }
    }

    fn select_console(&self, index: usize) {
        let Some(console) = self.consoles.get(index) else {
            return;
        };
        debug!(console = console.label.as_str(), "console_clicked");
        let result = self.gate.select(console.destination.as_str());
        self.report_selection(result);
    }

    fn report_selection(&self, result: Result<SelectionOutcome, NavError>) {
        if let Err(error) = result {
            self.hud.report_failure(&error);
        }
    }

    fn console_under_cursor(&self, input: &InputSnapshot) -> Option<usize> {
        let cursor = input.cursor_position_px()?;
        let (width, height) = input.window_size();
        if width == 0 || height == 0 {
            return None;
        }
        let viewport = Viewport { width, height };
        let camera = MapCamera::fit(self.bounds_min, self.bounds_max, viewport, MAP_PADDING_PX);
        let point = screen_to_map_px(cursor, &camera, viewport);
        self.consoles
            .iter()
            .enumerate()
            .map(|(index, console)| {
                let dx = console.position.x - point.x;
                let dz = console.position.z - point.y;
                (index, dx * dx + dz * dz)
            })
            .filter(|(_, distance_sq)| {
                *distance_sq <= CONSOLE_MAP_PICK_RADIUS * CONSOLE_MAP_PICK_RADIUS
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Nearest console whose screen lies close to the center view ray.
    fn pick_focused_console(&self) -> Option<usize> {
        let pose = self.walker.pose();
        let direction = pose.look_direction();
        self.consoles
            .iter()
            .enumerate()
            .filter_map(|(index, console)| {
                let offset = console.position - pose.position;
                let along = offset.dot(direction);
                if along <= 0.0 || along > CONSOLE_REACH {
                    return None;
                }
                let miss_sq = offset.length_squared() - along * along;
                (miss_sq <= CONSOLE_FOCUS_RADIUS * CONSOLE_FOCUS_RADIUS).then_some((index, along))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    fn render_door(&self, frame: &mut MapFrame) {
        let Some(door) = self.door else {
            return;
        };
        let [center_x, center_z] = door.center;
        let offset = self.fx.doors().panel_offset();
        let panel = door.panel_half_width * 2.0;
        let left_inner = center_x - offset;
        let right_inner = center_x + offset;
        frame.push_segment(
            Vec2::new(left_inner - panel, center_z),
            Vec2::new(left_inner, center_z),
            MapSegmentKind::Door,
        );
        frame.push_segment(
            Vec2::new(right_inner, center_z),
            Vec2::new(right_inner + panel, center_z),
            MapSegmentKind::Door,
        );
    }

    fn render_path(&self, frame: &mut MapFrame) {
        let Some(path) = self.controller.active_path() else {
            return;
        };
        let curve = path.curve();
        let mut previous = map_point(curve.point_at(0.0));
        for step in 1..=PATH_PREVIEW_SEGMENTS {
            let next = map_point(curve.point_at(step as f32 / PATH_PREVIEW_SEGMENTS as f32));
            frame.push_segment(previous, next, MapSegmentKind::Path);
            previous = next;
        }
    }
}

impl Scene for StationScene {
    fn load(&mut self) {
        info!(
            anchors = self.registry.len(),
            consoles = self.consoles.len(),
            hotkeys = self.hotkeys.len(),
            status = %self.hud.status(),
            "scene_loaded"
        );
    }

    fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        let mut command = SceneCommand::None;
        if input.pointer_released() {
            debug!(mode = %self.store.mode(), "walk_mode_released");
        }
        self.hud.set_resume_prompt(!input.pointer_captured());

        if let Some(slot) = input.hotkey_slot() {
            self.handle_hotkey(slot, input.is_down(InputAction::TeleportModifier));
        }

        if input.left_click_pressed() {
            if input.pointer_captured() {
                if let Some(index) = self.focused_console {
                    self.select_console(index);
                }
            } else if let Some(index) = self.console_under_cursor(input) {
                self.select_console(index);
            } else {
                command = SceneCommand::CapturePointer;
            }
        }

        self.walker.update(fixed_dt_seconds, input);

        let event = {
            let mut ctx = TravelContext::new(&mut self.walker, &mut self.fx);
            self.controller.tick(fixed_dt_seconds, &mut ctx)
        };
        if let TravelEvent::Aborted(error) = &event {
            self.hud.report_failure(error);
        }

        self.fx.update(fixed_dt_seconds, self.walker.pose().position);
        self.focused_console = if self.walker.is_active(input) {
            self.pick_focused_console()
        } else {
            None
        };
        command
    }

    fn render_map(&self, frame: &mut MapFrame) {
        frame.set_bounds(self.bounds_min, self.bounds_max);
        frame.push_rect(self.bounds_min, self.bounds_max, MapSegmentKind::Bounds);
        for room in &self.rooms {
            frame.push_rect(
                Vec2::new(room.min[0], room.min[1]),
                Vec2::new(room.max[0], room.max[1]),
                MapSegmentKind::Wall,
            );
        }
        self.render_door(frame);
        self.render_path(frame);

        for (_, anchor) in self.registry.iter() {
            frame.push_marker(
                map_point(anchor.position),
                MapMarkerKind::Anchor,
                Some(anchor.facing_yaw),
            );
        }
        for (index, console) in self.consoles.iter().enumerate() {
            let kind = if self.focused_console == Some(index) {
                MapMarkerKind::ConsoleFocused
            } else {
                MapMarkerKind::Console
            };
            frame.push_marker(map_point(console.position), kind, None);
        }
        let effect = self.fx.effect();
        if effect.is_visible() {
            frame.push_marker(
                map_point(effect.position()),
                MapMarkerKind::TravelEffect,
                None,
            );
        }
        let pose = self.camera_pose();
        frame.push_marker(
            map_point(pose.position),
            MapMarkerKind::Walker,
            Some(pose.yaw),
        );
    }

    fn unload(&mut self) {
        info!(mode = %self.store.mode(), "scene_unload");
        self.focused_console = None;
    }

    fn debug_title(&self) -> Option<String> {
        Some(self.hud.title())
    }

    fn mode_label(&self) -> &'static str {
        self.mode().as_str()
    }
}

fn map_point(position: Vec3) -> Vec2 {
    Vec2::new(position.x, position.z)
}
