use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::app::{MapFrame, MapMarker, MapMarkerKind, MapSegmentKind, Vec2};

use super::{map_to_screen_px, MapCamera, Viewport};

const CLEAR_COLOR: [u8; 4] = [12, 14, 22, 255];
const GRID_CELL_WORLD: f32 = 1.0;
const GRID_MAJOR_EVERY: i32 = 5;
const GRID_MINOR_COLOR: [u8; 4] = [24, 28, 40, 255];
const GRID_MAJOR_COLOR: [u8; 4] = [38, 44, 62, 255];
const BOUNDS_COLOR: [u8; 4] = [90, 110, 150, 255];
const WALL_COLOR: [u8; 4] = [140, 150, 170, 255];
const DOOR_COLOR: [u8; 4] = [255, 170, 60, 255];
const PATH_COLOR: [u8; 4] = [70, 200, 255, 255];
const ANCHOR_COLOR: [u8; 4] = [120, 230, 140, 255];
const CONSOLE_COLOR: [u8; 4] = [180, 180, 220, 255];
const CONSOLE_FOCUS_COLOR: [u8; 4] = [255, 236, 120, 255];
const WALKER_COLOR: [u8; 4] = [240, 240, 255, 255];
const TRAVEL_EFFECT_COLOR: [u8; 4] = [255, 110, 70, 255];
const ANCHOR_HALF_SIZE_PX: i32 = 5;
const CONSOLE_HALF_SIZE_PX: i32 = 3;
const CONSOLE_FOCUS_HALF_SIZE_PX: i32 = 6;
const WALKER_HALF_SIZE_PX: i32 = 3;
const TRAVEL_EFFECT_HALF_SIZE_PX: i32 = 7;
const HEADING_LENGTH_PX: f32 = 14.0;
pub const MAP_PADDING_PX: f32 = 16.0;

/// Draws a [`MapFrame`] into a `pixels` framebuffer.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render_map(&mut self, map: &MapFrame) -> Result<(), Error> {
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Ok(());
        }
        let viewport = self.viewport;
        let camera = MapCamera::fit(map.bounds_min, map.bounds_max, viewport, MAP_PADDING_PX);
        draw_map(self.pixels.frame_mut(), viewport, &camera, map);
        self.pixels.render()
    }
}

fn draw_map(frame: &mut [u8], viewport: Viewport, camera: &MapCamera, map: &MapFrame) {
    for chunk in frame.chunks_exact_mut(4) {
        chunk.copy_from_slice(&CLEAR_COLOR);
    }
    draw_grid(frame, viewport, camera);

    for segment in &map.segments {
        let from = map_to_screen_px(segment.from, camera, viewport);
        let to = map_to_screen_px(segment.to, camera, viewport);
        draw_line(frame, viewport, from, to, segment_color(segment.kind));
    }
    for marker in &map.markers {
        draw_marker(frame, viewport, camera, marker);
    }
}

fn segment_color(kind: MapSegmentKind) -> [u8; 4] {
    match kind {
        MapSegmentKind::Bounds => BOUNDS_COLOR,
        MapSegmentKind::Wall => WALL_COLOR,
        MapSegmentKind::Door => DOOR_COLOR,
        MapSegmentKind::Path => PATH_COLOR,
    }
}

fn draw_marker(frame: &mut [u8], viewport: Viewport, camera: &MapCamera, marker: &MapMarker) {
    let (cx, cy) = map_to_screen_px(marker.position, camera, viewport);
    let color = match marker.kind {
        MapMarkerKind::Anchor => {
            draw_square_outline(frame, viewport, cx, cy, ANCHOR_HALF_SIZE_PX, ANCHOR_COLOR);
            ANCHOR_COLOR
        }
        MapMarkerKind::Console => {
            draw_square(frame, viewport, cx, cy, CONSOLE_HALF_SIZE_PX, CONSOLE_COLOR);
            CONSOLE_COLOR
        }
        MapMarkerKind::ConsoleFocused => {
            draw_square(frame, viewport, cx, cy, CONSOLE_HALF_SIZE_PX, CONSOLE_COLOR);
            draw_square_outline(
                frame,
                viewport,
                cx,
                cy,
                CONSOLE_FOCUS_HALF_SIZE_PX,
                CONSOLE_FOCUS_COLOR,
            );
            CONSOLE_FOCUS_COLOR
        }
        MapMarkerKind::Walker => {
            draw_square(frame, viewport, cx, cy, WALKER_HALF_SIZE_PX, WALKER_COLOR);
            WALKER_COLOR
        }
        MapMarkerKind::TravelEffect => {
            draw_cross(
                frame,
                viewport,
                cx,
                cy,
                TRAVEL_EFFECT_HALF_SIZE_PX,
                TRAVEL_EFFECT_COLOR,
            );
            TRAVEL_EFFECT_COLOR
        }
    };

    if let Some(yaw) = marker.heading {
        let tip = heading_tip((cx, cy), yaw);
        draw_line(frame, viewport, (cx, cy), tip, color);
    }
}

fn heading_tip(origin: (i32, i32), yaw: f32) -> (i32, i32) {
    (
        origin.0 + (yaw.sin() * HEADING_LENGTH_PX).round() as i32,
        origin.1 + (yaw.cos() * HEADING_LENGTH_PX).round() as i32,
    )
}

fn draw_grid(frame: &mut [u8], viewport: Viewport, camera: &MapCamera) {
    let (ix_start, ix_end, iy_start, iy_end) = visible_grid_index_bounds(camera, viewport);
    for ix in ix_start..=ix_end {
        let (screen_x, _) = map_to_screen_px(
            Vec2::new(ix as f32 * GRID_CELL_WORLD, camera.center.y),
            camera,
            viewport,
        );
        draw_vertical_line_clipped(frame, viewport, screen_x, grid_color(ix));
    }
    for iy in iy_start..=iy_end {
        let (_, screen_y) = map_to_screen_px(
            Vec2::new(camera.center.x, iy as f32 * GRID_CELL_WORLD),
            camera,
            viewport,
        );
        draw_horizontal_line_clipped(frame, viewport, screen_y, grid_color(iy));
    }
}

fn grid_color(index: i32) -> [u8; 4] {
    if index.rem_euclid(GRID_MAJOR_EVERY) == 0 {
        GRID_MAJOR_COLOR
    } else {
        GRID_MINOR_COLOR
    }
}

fn visible_grid_index_bounds(camera: &MapCamera, viewport: Viewport) -> (i32, i32, i32, i32) {
    let scale = camera.pixels_per_unit.max(f32::EPSILON);
    let half_w_world = viewport.width as f32 / (2.0 * scale);
    let half_h_world = viewport.height as f32 / (2.0 * scale);
    let ix_start = ((camera.center.x - half_w_world) / GRID_CELL_WORLD).floor() as i32 - 1;
    let ix_end = ((camera.center.x + half_w_world) / GRID_CELL_WORLD).ceil() as i32 + 1;
    let iy_start = ((camera.center.y - half_h_world) / GRID_CELL_WORLD).floor() as i32 - 1;
    let iy_end = ((camera.center.y + half_h_world) / GRID_CELL_WORLD).ceil() as i32 + 1;
    (ix_start, ix_end, iy_start, iy_end)
}

fn draw_vertical_line_clipped(frame: &mut [u8], viewport: Viewport, x: i32, color: [u8; 4]) {
    if x < 0 || x >= viewport.width as i32 {
        return;
    }
    for y in 0..viewport.height as i32 {
        write_pixel_rgba_clipped(frame, viewport, x, y, color);
    }
}

fn draw_horizontal_line_clipped(frame: &mut [u8], viewport: Viewport, y: i32, color: [u8; 4]) {
    if y < 0 || y >= viewport.height as i32 {
        return;
    }
    for x in 0..viewport.width as i32 {
        write_pixel_rgba_clipped(frame, viewport, x, y, color);
    }
}

/// Bresenham line; off-screen pixels are skipped.
fn draw_line(
    frame: &mut [u8],
    viewport: Viewport,
    from: (i32, i32),
    to: (i32, i32),
    color: [u8; 4],
) {
    let (mut x, mut y) = from;
    let dx = (to.0 - x).abs();
    let dy = -(to.1 - y).abs();
    let step_x = if x < to.0 { 1 } else { -1 };
    let step_y = if y < to.1 { 1 } else { -1 };
    let mut error = dx + dy;
    let max_steps = (dx - dy).saturating_add(1);

    for _ in 0..=max_steps {
        write_pixel_rgba_clipped(frame, viewport, x, y, color);
        if x == to.0 && y == to.1 {
            break;
        }
        let doubled = 2 * error;
        if doubled >= dy {
            error += dy;
            x += step_x;
        }
        if doubled <= dx {
            error += dx;
            y += step_y;
        }
    }
}

fn write_pixel_rgba_clipped(frame: &mut [u8], viewport: Viewport, x: i32, y: i32, color: [u8; 4]) {
    if x < 0 || y < 0 || x >= viewport.width as i32 || y >= viewport.height as i32 {
        return;
    }
    let Some(pixel_offset) = (y as usize)
        .checked_mul(viewport.width as usize)
        .and_then(|row| row.checked_add(x as usize))
    else {
        return;
    };
    let Some(byte_offset) = pixel_offset.checked_mul(4) else {
        return;
    };
    let Some(end) = byte_offset.checked_add(4) else {
        return;
    };
    if end > frame.len() {
        return;
    }
    frame[byte_offset..end].copy_from_slice(&color);
}

fn draw_square(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for y in (cy - half_size)..=(cy + half_size) {
        for x in (cx - half_size)..=(cx + half_size) {
            write_pixel_rgba_clipped(frame, viewport, x, y, color);
        }
    }
}

fn draw_square_outline(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    let (left, right) = (cx - half_size, cx + half_size);
    let (top, bottom) = (cy - half_size, cy + half_size);
    for x in left..=right {
        write_pixel_rgba_clipped(frame, viewport, x, top, color);
        write_pixel_rgba_clipped(frame, viewport, x, bottom, color);
    }
    for y in top..=bottom {
        write_pixel_rgba_clipped(frame, viewport, left, y, color);
        write_pixel_rgba_clipped(frame, viewport, right, y, color);
    }
}

fn draw_cross(
    frame: &mut [u8],
    viewport: Viewport,
    cx: i32,
    cy: i32,
    half_size: i32,
    color: [u8; 4],
) {
    for offset in -half_size..=half_size {
        write_pixel_rgba_clipped(frame, viewport, cx + offset, cy + offset, color);
        write_pixel_rgba_clipped(frame, viewport, cx + offset, cy - offset, color);
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;

    const VIEWPORT: Viewport = Viewport {
        width: 64,
        height: 48,
    };

    fn blank_frame() -> Vec<u8> {
        vec![0; (VIEWPORT.width * VIEWPORT.height * 4) as usize]
    }

    fn pixel(frame: &[u8], x: i32, y: i32) -> [u8; 4] {
        let offset = (y as usize * VIEWPORT.width as usize + x as usize) * 4;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn renderer_type_is_non_generic() {
        let _renderer: Option<Renderer> = None;
    }

    #[test]
    fn out_of_bounds_writes_are_ignored() {
        let mut frame = blank_frame();
        write_pixel_rgba_clipped(&mut frame, VIEWPORT, -1, 0, WALKER_COLOR);
        write_pixel_rgba_clipped(&mut frame, VIEWPORT, 64, 0, WALKER_COLOR);
        write_pixel_rgba_clipped(&mut frame, VIEWPORT, 0, 48, WALKER_COLOR);
        assert!(frame.iter().all(|byte| *byte == 0));

        let mut empty: Vec<u8> = Vec::new();
        draw_square(&mut empty, VIEWPORT, 10, 10, 3, WALKER_COLOR);
    }

    #[test]
    fn line_reaches_both_endpoints() {
        let mut frame = blank_frame();
        draw_line(&mut frame, VIEWPORT, (2, 3), (40, 20), PATH_COLOR);
        assert_eq!(pixel(&frame, 2, 3), PATH_COLOR);
        assert_eq!(pixel(&frame, 40, 20), PATH_COLOR);

        let mut steep = blank_frame();
        draw_line(&mut steep, VIEWPORT, (30, 40), (28, 1), DOOR_COLOR);
        assert_eq!(pixel(&steep, 30, 40), DOOR_COLOR);
        assert_eq!(pixel(&steep, 28, 1), DOOR_COLOR);
    }

    #[test]
    fn heading_tip_points_up_for_yaw_pi() {
        let (x, y) = heading_tip((20, 20), PI);
        assert_eq!(x, 20);
        assert!(y < 20);
    }

    #[test]
    fn draw_map_paints_markers_over_grid() {
        let mut frame = blank_frame();
        let mut map = MapFrame::default();
        map.set_bounds(Vec2::new(-10.0, -10.0), Vec2::new(10.0, 10.0));
        map.push_marker(Vec2::new(0.0, 0.0), MapMarkerKind::Walker, None);
        let camera = MapCamera::fit(map.bounds_min, map.bounds_max, VIEWPORT, 2.0);
        draw_map(&mut frame, VIEWPORT, &camera, &map);

        let (cx, cy) = map_to_screen_px(Vec2::new(0.0, 0.0), &camera, VIEWPORT);
        assert_eq!(pixel(&frame, cx, cy), WALKER_COLOR);
        assert_ne!(pixel(&frame, 0, 0), [0, 0, 0, 0]);
    }

    #[test]
    fn major_grid_lines_handle_negative_indices() {
        for index in -10..=10 {
            let expected = if index % 5 == 0 {
                GRID_MAJOR_COLOR
            } else {
                GRID_MINOR_COLOR
            };
            assert_eq!(grid_color(index), expected, "index={index}");
        }
    }
}
