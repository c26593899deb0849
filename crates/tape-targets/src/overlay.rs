//! Debug overlay drawing.
//!
//! Purely observational output for the operator's video feed: every
//! contour descriptor gets its rectangle outlined, every refined corner
//! a filled dot. Never consumed by control logic.

use image::{Rgb, RgbImage};
use nalgebra::Point2;
use tape_targets_core::ContourRect;

/// Outline color for contour descriptors.
pub const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
/// Marker color for refined corners.
pub const CORNER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

/// Outline a descriptor's rotated rectangle.
pub fn draw_rect(img: &mut RgbImage, rect: &ContourRect, color: Rgb<u8>) {
    let corners = rect.box_points();
    for i in 0..4 {
        draw_line(img, &corners[i], &corners[(i + 1) % 4], color);
    }
}

/// Bresenham line between two (rounded) image points. Segments leaving
/// the frame are clipped per pixel.
pub fn draw_line(img: &mut RgbImage, a: &Point2<f64>, b: &Point2<f64>, color: Rgb<u8>) {
    let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
    let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);

    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put_pixel_checked(img, x0, y0, color);
        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

/// Filled dot of radius 3 at a refined corner.
pub fn draw_marker(img: &mut RgbImage, center: &Point2<f64>, color: Rgb<u8>) {
    const RADIUS: i64 = 3;
    let cx = center.x.round() as i64;
    let cy = center.y.round() as i64;
    for dy in -RADIUS..=RADIUS {
        for dx in -RADIUS..=RADIUS {
            if dx * dx + dy * dy <= RADIUS * RADIUS {
                put_pixel_checked(img, cx + dx, cy + dy, color);
            }
        }
    }
}

#[inline]
fn put_pixel_checked(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}
