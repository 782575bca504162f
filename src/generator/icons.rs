//! Launcher icon rasterization.
//!
//! Glyphs are described in normalized coordinates over a circular plate, so
//! one registry entry renders consistently at every density. Rendering is
//! pure integer/float math over pixel centers; no randomness, no clock, so
//! output bytes are stable for a given [`IconSpec`] and size.

use crate::error::GenerationError;
use crate::registry::{Glyph, IconSpec};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};

/// Renders one icon at the given edge length and encodes it as PNG.
pub fn render_png(spec: &IconSpec, size_px: u32) -> Result<Vec<u8>, GenerationError> {
    let img = rasterize(spec, size_px);

    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), size_px, size_px, ExtendedColorType::Rgba8)
        .map_err(|e| GenerationError::IconEncoding {
            key: spec.key.to_string(),
            reason: e.to_string(),
        })?;
    Ok(bytes)
}

fn rasterize(spec: &IconSpec, size_px: u32) -> RgbaImage {
    let plate = [spec.plate[0], spec.plate[1], spec.plate[2], 0xFF];
    let ink = [spec.ink[0], spec.ink[1], spec.ink[2], 0xFF];
    let transparent = [0u8; 4];

    RgbaImage::from_fn(size_px, size_px, |px, py| {
        // Pixel center in normalized [0,1] space.
        let x = (px as f32 + 0.5) / size_px as f32;
        let y = (py as f32 + 0.5) / size_px as f32;

        let dx = x - 0.5;
        let dy = y - 0.5;
        let on_plate = dx * dx + dy * dy <= 0.48 * 0.48;

        if !on_plate {
            image::Rgba(transparent)
        } else if glyph_hit(spec.glyph, x, y) {
            image::Rgba(ink)
        } else {
            image::Rgba(plate)
        }
    })
}

/// Whether the normalized point lies inside the glyph.
fn glyph_hit(glyph: Glyph, x: f32, y: f32) -> bool {
    let dx = x - 0.5;
    let dy = y - 0.5;
    match glyph {
        Glyph::Phone => {
            let body = dx.abs() < 0.16 && dy.abs() < 0.30;
            let screen = dx.abs() < 0.12 && (0.26..0.66).contains(&y);
            let button = dx * dx + (y - 0.73) * (y - 0.73) < 0.025 * 0.025;
            (body && !screen) || button
        }
        Glyph::Globe => {
            let r = (dx * dx + dy * dy).sqrt();
            let ring = (r - 0.30).abs() < 0.030;
            let meridian = {
                let e = (dx / 0.14) * (dx / 0.14) + (dy / 0.30) * (dy / 0.30);
                (e - 1.0).abs() < 0.28 && r < 0.30
            };
            let equator = dy.abs() < 0.028 && r < 0.30;
            ring || meridian || equator
        }
        Glyph::Bolt => {
            // Two overlapping triangles forming the zig-zag.
            let upper = point_in_triangle(x, y, (0.58, 0.18), (0.36, 0.56), (0.52, 0.56));
            let lower = point_in_triangle(x, y, (0.64, 0.44), (0.48, 0.44), (0.42, 0.82));
            upper || lower
        }
        Glyph::Cart => {
            let basket = (0.30..0.70).contains(&x)
                && (0.34..0.56).contains(&y)
                && (x - 0.30) + (0.56 - y) > 0.04;
            let handle = (dy.abs() < 0.014 && (0.24..0.34).contains(&x))
                || ((x - 0.30).abs() < 0.02 && (0.34..0.50).contains(&y));
            let wheel_l = (x - 0.38) * (x - 0.38) + (y - 0.66) * (y - 0.66) < 0.035 * 0.035;
            let wheel_r = (x - 0.62) * (x - 0.62) + (y - 0.66) * (y - 0.66) < 0.035 * 0.035;
            basket || handle || wheel_l || wheel_r
        }
        Glyph::Chat => {
            let bubble = dx.abs() < 0.24 && (0.30..0.60).contains(&y);
            let tail = point_in_triangle(x, y, (0.38, 0.60), (0.52, 0.60), (0.40, 0.74));
            let dot = |cx: f32| (x - cx) * (x - cx) + (y - 0.45) * (y - 0.45) < 0.022 * 0.022;
            (bubble || tail) && !(dot(0.38) || dot(0.50) || dot(0.62))
        }
    }
}

fn point_in_triangle(px: f32, py: f32, a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> bool {
    let sign = |p1: (f32, f32), p2: (f32, f32), p3: (f32, f32)| {
        (p1.0 - p3.0) * (p2.1 - p3.1) - (p2.0 - p3.0) * (p1.1 - p3.1)
    };
    let d1 = sign((px, py), a, b);
    let d2 = sign((px, py), b, c);
    let d3 = sign((px, py), c, a);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
