use macroquad::prelude::{Color, Vec2, draw_poly, draw_poly_lines};

pub const FOCUS_COLOR: Color = Color::from_rgba(100, 200, 255, 255);
pub const FOCUS_OUTLINE: Color = Color::from_rgba(12, 28, 48, 255);

/// Draw the followed point as a small diamond using vector primitives to stay crisp when zoomed.
pub fn draw_focus_marker(center: Vec2, tile_size: f32) {
    let radius = (tile_size * 0.3).max(1.0);
    draw_poly(center.x, center.y, 4, radius, 0.0, FOCUS_COLOR);
    draw_poly_lines(center.x, center.y, 4, radius, 0.0, 2.0, FOCUS_OUTLINE);
}
