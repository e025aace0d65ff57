use crate::app::Vec2;

const MIN_PIXELS_PER_UNIT: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Top-down camera over the map plane. Map `y` (world Z) grows downward on
/// screen, so yaw `PI` points up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapCamera {
    pub center: Vec2,
    pub pixels_per_unit: f32,
}

impl Default for MapCamera {
    fn default() -> Self {
        Self {
            center: Vec2::default(),
            pixels_per_unit: 10.0,
        }
    }
}

impl MapCamera {
    /// Largest scale that keeps the `min..max` rectangle inside the viewport
    /// with `padding_px` on every side.
    pub fn fit(min: Vec2, max: Vec2, viewport: Viewport, padding_px: f32) -> Self {
        let span_x = (max.x - min.x).abs().max(1.0);
        let span_y = (max.y - min.y).abs().max(1.0);
        let usable_w = (viewport.width as f32 - 2.0 * padding_px).max(1.0);
        let usable_h = (viewport.height as f32 - 2.0 * padding_px).max(1.0);
        let pixels_per_unit = (usable_w / span_x)
            .min(usable_h / span_y)
            .max(MIN_PIXELS_PER_UNIT);
        Self {
            center: Vec2::new((min.x + max.x) * 0.5, (min.y + max.y) * 0.5),
            pixels_per_unit,
        }
    }
}

pub fn map_to_screen_px(point: Vec2, camera: &MapCamera, viewport: Viewport) -> (i32, i32) {
    let x = (point.x - camera.center.x) * camera.pixels_per_unit + viewport.width as f32 * 0.5;
    let y = (point.y - camera.center.y) * camera.pixels_per_unit + viewport.height as f32 * 0.5;
    (x.round() as i32, y.round() as i32)
}

pub fn screen_to_map_px(screen_px: Vec2, camera: &MapCamera, viewport: Viewport) -> Vec2 {
    let scale = camera.pixels_per_unit.max(MIN_PIXELS_PER_UNIT);
    Vec2::new(
        (screen_px.x - viewport.width as f32 * 0.5) / scale + camera.center.x,
        (screen_px.y - viewport.height as f32 * 0.5) / scale + camera.center.y,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 800,
        height: 600,
    };

    #[test]
    fn camera_center_maps_to_viewport_center() {
        let camera = MapCamera {
            center: Vec2::new(3.0, -2.0),
            pixels_per_unit: 10.0,
        };
        assert_eq!(
            map_to_screen_px(Vec2::new(3.0, -2.0), &camera, VIEWPORT),
            (400, 300)
        );
        assert_eq!(
            map_to_screen_px(Vec2::new(5.0, 1.0), &camera, VIEWPORT),
            (420, 330)
        );
    }

    #[test]
    fn screen_to_map_inverts_map_to_screen() {
        let camera = MapCamera::fit(
            Vec2::new(-20.0, -37.0),
            Vec2::new(20.0, 37.0),
            VIEWPORT,
            16.0,
        );
        let point = Vec2::new(-10.0, 5.0);
        let (sx, sy) = map_to_screen_px(point, &camera, VIEWPORT);
        let back = screen_to_map_px(Vec2::new(sx as f32, sy as f32), &camera, VIEWPORT);
        let tolerance = 1.0 / camera.pixels_per_unit;
        assert!((back.x - point.x).abs() <= tolerance);
        assert!((back.y - point.y).abs() <= tolerance);
    }

    #[test]
    fn fit_keeps_bounds_on_screen() {
        let camera = MapCamera::fit(
            Vec2::new(-20.0, -37.0),
            Vec2::new(20.0, 37.0),
            VIEWPORT,
            16.0,
        );
        for corner in [Vec2::new(-20.0, -37.0), Vec2::new(20.0, 37.0)] {
            let (x, y) = map_to_screen_px(corner, &camera, VIEWPORT);
            assert!((0..800).contains(&x), "x={x}");
            assert!((0..600).contains(&y), "y={y}");
        }
    }
}
