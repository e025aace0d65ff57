use std::f32::consts::{FRAC_PI_2, PI};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use station_engine::nav::{
    Anchor, AnchorRegistry, AnchorRegistryError, DestinationId, TransitionConfig,
};
use station_engine::{Pose, Vec3};
use thiserror::Error;
use tracing::info;

const DEFAULT_BOUNDS_MARGIN: f32 = 1.0;
const DEFAULT_DOOR_PANEL_HALF_WIDTH: f32 = 1.5;
pub(crate) const DEFAULT_DOOR_SLIDE: f32 = 2.2;
pub(crate) const DEFAULT_DOOR_OPEN_SECONDS: f32 = 1.2;

#[derive(Debug, Error)]
pub(crate) enum LayoutError {
    #[error("failed to read station layout {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse station layout {} at {location}: {source}", path.display())]
    Parse {
        path: PathBuf,
        location: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid station layout at {field}: {message}")]
    Invalid { field: String, message: String },
    #[error("invalid station anchors: {0}")]
    Anchors(#[from] AnchorRegistryError),
}

/// Static description of the station: where the walker starts, where travel
/// can go, and what the map shows.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StationLayout {
    pub(crate) spawn: SpawnDef,
    pub(crate) bounds: BoundsDef,
    /// Destination anchors. Their order is the order of the teleport hotkeys.
    pub(crate) anchors: Vec<AnchorDef>,
    #[serde(default)]
    pub(crate) consoles: Vec<ConsoleDef>,
    #[serde(default)]
    pub(crate) rooms: Vec<RoomDef>,
    #[serde(default)]
    pub(crate) door: Option<DoorDef>,
    #[serde(default)]
    pub(crate) transition: TransitionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpawnDef {
    pub(crate) position: [f32; 3],
    #[serde(default)]
    pub(crate) yaw: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct BoundsDef {
    pub(crate) width: f32,
    pub(crate) depth: f32,
    #[serde(default = "default_bounds_margin")]
    pub(crate) margin: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct AnchorDef {
    pub(crate) id: String,
    pub(crate) position: [f32; 3],
    #[serde(default)]
    pub(crate) yaw: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ConsoleDef {
    pub(crate) destination: String,
    #[serde(default)]
    pub(crate) label: Option<String>,
    /// Center of the console screen.
    pub(crate) position: [f32; 3],
}

/// Map outline of a room on the floor plane, as `[x, z]` corners.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RoomDef {
    pub(crate) name: String,
    pub(crate) min: [f32; 2],
    pub(crate) max: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct DoorDef {
    /// Door center as `[x, z]`.
    pub(crate) center: [f32; 2],
    #[serde(default = "default_door_panel_half_width")]
    pub(crate) panel_half_width: f32,
    #[serde(default = "default_door_slide")]
    pub(crate) slide: f32,
    #[serde(default = "default_door_open_seconds")]
    pub(crate) open_seconds: f32,
}

fn default_bounds_margin() -> f32 {
    DEFAULT_BOUNDS_MARGIN
}

fn default_door_panel_half_width() -> f32 {
    DEFAULT_DOOR_PANEL_HALF_WIDTH
}

fn default_door_slide() -> f32 {
    DEFAULT_DOOR_SLIDE
}

fn default_door_open_seconds() -> f32 {
    DEFAULT_DOOR_OPEN_SECONDS
}

impl StationLayout {
    /// The stock station: a central hangar with the tunnel door at the back,
    /// one side room on each flank, and three destination consoles near the
    /// entrance.
    pub(crate) fn builtin() -> Self {
        let hangar_half_width = 8.0;
        let hangar_half_depth = 12.0;
        let side_room_center_x = hangar_half_width + 5.0 + 1.0;
        let console = |destination: &str, label: &str, spread: f32| ConsoleDef {
            destination: destination.to_string(),
            label: Some(label.to_string()),
            position: [spread * 2.4, 1.45, 3.5 + spread.abs() * 0.4],
        };
        let anchor = |id: &str, position: [f32; 3], yaw: f32| AnchorDef {
            id: id.to_string(),
            position,
            yaw,
        };
        let room = |name: &str, min: [f32; 2], max: [f32; 2]| RoomDef {
            name: name.to_string(),
            min,
            max,
        };

        Self {
            spawn: SpawnDef {
                position: [0.0, 2.6, 13.5],
                yaw: PI,
            },
            bounds: BoundsDef {
                width: 40.0,
                depth: 74.0,
                margin: DEFAULT_BOUNDS_MARGIN,
            },
            anchors: vec![
                anchor("home", [0.0, 2.6, -4.0], PI),
                anchor("projects", [-side_room_center_x, 2.6, 0.0], -FRAC_PI_2),
                anchor("skills", [0.0, 2.6, 4.0], PI),
                anchor("experience", [side_room_center_x, 2.6, 0.0], FRAC_PI_2),
            ],
            consoles: vec![
                console("projects", "PROJECTS", -1.0),
                console("skills", "SKILLS", 0.0),
                console("experience", "EXPERIENCE", 1.0),
            ],
            rooms: vec![
                room(
                    "hangar",
                    [-hangar_half_width, -hangar_half_depth],
                    [hangar_half_width, hangar_half_depth],
                ),
                room(
                    "projects",
                    [-side_room_center_x - 5.0, -7.0],
                    [-side_room_center_x + 5.0, 7.0],
                ),
                room(
                    "experience",
                    [side_room_center_x - 5.0, -7.0],
                    [side_room_center_x + 5.0, 7.0],
                ),
            ],
            door: Some(DoorDef {
                center: [0.0, -hangar_half_depth],
                panel_half_width: DEFAULT_DOOR_PANEL_HALF_WIDTH,
                slide: DEFAULT_DOOR_SLIDE,
                open_seconds: DEFAULT_DOOR_OPEN_SECONDS,
            }),
            transition: TransitionConfig::default(),
        }
    }

    pub(crate) fn spawn_pose(&self) -> Pose {
        Pose::new(to_vec3(self.spawn.position), self.spawn.yaw, 0.0)
    }

    pub(crate) fn anchor_order(&self) -> Vec<DestinationId> {
        self.anchors
            .iter()
            .map(|anchor| DestinationId::new(anchor.id.as_str()))
            .collect()
    }

    pub(crate) fn anchor_registry(&self) -> Result<AnchorRegistry, LayoutError> {
        let entries = self.anchors.iter().map(|anchor| {
            (
                DestinationId::new(anchor.id.as_str()),
                Anchor::new(to_vec3(anchor.position), anchor.yaw),
            )
        });
        Ok(AnchorRegistry::from_entries(entries)?)
    }

    pub(crate) fn validate(&self) -> Result<(), LayoutError> {
        if self.anchors.is_empty() {
            return Err(invalid("anchors", "at least one anchor is required"));
        }
        let registry = self.anchor_registry()?;

        if !to_vec3(self.spawn.position).is_finite() || !self.spawn.yaw.is_finite() {
            return Err(invalid("spawn", "expected finite position and yaw"));
        }

        let bounds = self.bounds;
        if !bounds.margin.is_finite() || bounds.margin < 0.0 {
            return Err(invalid(
                "bounds.margin",
                format!("expected non-negative number, got {}", bounds.margin),
            ));
        }
        for (field, extent) in [("bounds.width", bounds.width), ("bounds.depth", bounds.depth)] {
            if !extent.is_finite() || extent <= 2.0 * bounds.margin {
                return Err(invalid(
                    field,
                    format!("expected more than twice the margin, got {extent}"),
                ));
            }
        }

        for (index, console) in self.consoles.iter().enumerate() {
            if !registry.contains(&console.destination) {
                return Err(invalid(
                    format!("consoles[{index}].destination"),
                    format!("unknown destination `{}`", console.destination),
                ));
            }
            if !to_vec3(console.position).is_finite() {
                return Err(invalid(
                    format!("consoles[{index}].position"),
                    "expected finite coordinates",
                ));
            }
        }

        for (index, room) in self.rooms.iter().enumerate() {
            let finite = room.min.iter().chain(&room.max).all(|value| value.is_finite());
            if !finite || room.min[0] >= room.max[0] || room.min[1] >= room.max[1] {
                return Err(invalid(
                    format!("rooms[{index}]"),
                    format!("`{}` needs finite corners with min < max", room.name),
                ));
            }
        }

        if let Some(door) = self.door {
            if !door.open_seconds.is_finite() || door.open_seconds <= 0.0 {
                return Err(invalid(
                    "door.open_seconds",
                    format!("expected positive number, got {}", door.open_seconds),
                ));
            }
            let finite = door.center.iter().all(|value| value.is_finite())
                && door.slide.is_finite()
                && door.panel_half_width.is_finite();
            if !finite {
                return Err(invalid("door", "expected finite geometry"));
            }
        }

        Ok(())
    }
}

pub(crate) fn to_vec3(value: [f32; 3]) -> Vec3 {
    Vec3::new(value[0], value[1], value[2])
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> LayoutError {
    LayoutError::Invalid {
        field: field.into(),
        message: message.into(),
    }
}

/// Reads and validates the layout at `path`. A missing file is an error.
pub(crate) fn load_layout(path: &Path) -> Result<StationLayout, LayoutError> {
    let raw = fs::read_to_string(path).map_err(|source| LayoutError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let layout = parse_layout(&raw, path)?;
    layout.validate()?;
    info!(
        path = %path.display(),
        anchors = layout.anchors.len(),
        consoles = layout.consoles.len(),
        "station_layout_loaded"
    );
    Ok(layout)
}

/// Like [`load_layout`], but falls back to the built-in station when nothing
/// exists at `path`.
pub(crate) fn load_or_default(path: &Path) -> Result<StationLayout, LayoutError> {
    if !path.exists() {
        info!(path = %path.display(), "station_layout_default");
        return Ok(StationLayout::builtin());
    }
    load_layout(path)
}

fn parse_layout(raw: &str, path: &Path) -> Result<StationLayout, LayoutError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, StationLayout>(&mut deserializer).map_err(|error| {
        let location = error.path().to_string();
        LayoutError::Parse {
            path: path.to_path_buf(),
            location,
            source: error.into_inner(),
        }
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    const SHIPPED_LAYOUT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/station.json");

    fn write_layout(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("station.json");
        fs::write(&path, contents).expect("write layout");
        path
    }

    fn minimal_json(extra: &str) -> String {
        format!(
            r#"{{
                "spawn": {{ "position": [0.0, 2.6, 5.0], "yaw": 3.14159 }},
                "bounds": {{ "width": 20.0, "depth": 30.0 }},
                "anchors": [
                    {{ "id": "home", "position": [0.0, 2.6, 0.0] }},
                    {{ "id": "lab", "position": [6.0, 2.6, -4.0], "yaw": 1.5 }}
                ]{extra}
            }}"#
        )
    }

    #[test]
    fn builtin_layout_is_valid() {
        let layout = StationLayout::builtin();
        layout.validate().expect("valid");
        let order: Vec<_> = layout
            .anchor_order()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect();
        assert_eq!(order, ["home", "projects", "skills", "experience"]);
        assert_eq!(layout.anchors[1].position, [-14.0, 2.6, 0.0]);
        assert_eq!(layout.spawn.position, [0.0, 2.6, 13.5]);
    }

    #[test]
    fn shipped_layout_matches_builtin_destinations() {
        let layout = load_layout(Path::new(SHIPPED_LAYOUT)).expect("shipped layout");
        let builtin = StationLayout::builtin();
        assert_eq!(layout.anchor_order(), builtin.anchor_order());
        assert_eq!(layout.consoles.len(), builtin.consoles.len());
        assert_eq!(layout.rooms.len(), builtin.rooms.len());
        assert!(layout.door.is_some());
    }

    #[test]
    fn minimal_layout_fills_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let path = write_layout(&temp, &minimal_json(""));
        let layout = load_layout(&path).expect("layout");
        assert_eq!(layout.bounds.margin, DEFAULT_BOUNDS_MARGIN);
        assert_eq!(layout.anchors[0].yaw, 0.0);
        assert!(layout.consoles.is_empty());
        assert!(layout.door.is_none());
        assert_eq!(layout.transition, TransitionConfig::default());
    }

    #[test]
    fn transition_overrides_keep_other_defaults() {
        let temp = TempDir::new().expect("temp dir");
        let path = write_layout(
            &temp,
            &minimal_json(r#", "transition": { "priming_delay_seconds": 0.5 }"#),
        );
        let layout = load_layout(&path).expect("layout");
        assert_eq!(layout.transition.priming_delay_seconds, 0.5);
        assert_eq!(
            layout.transition.travel_seconds,
            TransitionConfig::default().travel_seconds
        );
    }

    #[test]
    fn parse_error_reports_json_location() {
        let temp = TempDir::new().expect("temp dir");
        let path = write_layout(
            &temp,
            r#"{ "spawn": { "position": [0.0, 2.6, "far"] }, "bounds": { "width": 1, "depth": 1 }, "anchors": [] }"#,
        );
        match load_layout(&path) {
            Err(LayoutError::Parse { location, .. }) => {
                assert!(location.starts_with("spawn.position"), "{location}");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let temp = TempDir::new().expect("temp dir");
        let path = write_layout(&temp, &minimal_json(r#", "gravity": 9.8"#));
        assert!(matches!(
            load_layout(&path),
            Err(LayoutError::Parse { .. })
        ));
    }

    #[test]
    fn console_must_reference_known_anchor() {
        let temp = TempDir::new().expect("temp dir");
        let path = write_layout(
            &temp,
            &minimal_json(
                r#", "consoles": [ { "destination": "mars", "position": [0.0, 1.4, 2.0] } ]"#,
            ),
        );
        match load_layout(&path) {
            Err(LayoutError::Invalid { field, message }) => {
                assert_eq!(field, "consoles[0].destination");
                assert!(message.contains("mars"));
            }
            other => panic!("expected invalid layout, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_anchor_ids_are_rejected() {
        let mut layout = StationLayout::builtin();
        layout.anchors.push(layout.anchors[0].clone());
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::Anchors(AnchorRegistryError::Duplicate(_)))
        ));
    }

    #[test]
    fn empty_anchor_list_is_rejected() {
        let mut layout = StationLayout::builtin();
        layout.anchors.clear();
        layout.consoles.clear();
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::Invalid { field, .. }) if field == "anchors"
        ));
    }

    #[test]
    fn bounds_must_exceed_margin() {
        let mut layout = StationLayout::builtin();
        layout.bounds.width = 1.5;
        assert!(matches!(
            layout.validate(),
            Err(LayoutError::Invalid { field, .. }) if field == "bounds.width"
        ));
    }

    #[test]
    fn missing_file_uses_builtin_only_through_fallback() {
        let temp = TempDir::new().expect("temp dir");
        let path = temp.path().join("absent.json");
        assert_eq!(
            load_or_default(&path).expect("fallback"),
            StationLayout::builtin()
        );
        assert!(matches!(load_layout(&path), Err(LayoutError::Read { .. })));
    }
}
