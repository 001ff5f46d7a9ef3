// src/debug_render.rs - PNG snapshots of slices with contour outlines drawn on top

use bresenham::Bresenham;
use image::{ImageFormat, Rgb, RgbImage};
use std::fs;
use std::path::Path;

use crate::errors::{ContourError, Result};
use crate::grid::{Grid2, Label, Point2F, Volume};
use crate::polygon::SmoothPolygon;
use crate::volume::ContoursPerSlice;

const BACKGROUND_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const OUTLINE_COLOR: Rgb<u8> = Rgb([255, 0, 255]);

/// Muted fill color for a label, stable across slices
fn label_color(label: Label) -> Rgb<u8> {
    let h = (label as u32).wrapping_mul(2_654_435_761);
    Rgb([
        64 + (h >> 24) as u8 % 128,
        64 + (h >> 16) as u8 % 128,
        64 + (h >> 8) as u8 % 128,
    ])
}

/// Image position of a pixel-edge point at `scale` image pixels per grid pixel
fn to_image(p: Point2F, scale: u32, width: u32, height: u32) -> (isize, isize) {
    let x = ((p.x + 0.5) * scale as f64).round() as isize;
    let y = ((p.y + 0.5) * scale as f64).round() as isize;
    (x.clamp(0, width as isize - 1), y.clamp(0, height as isize - 1))
}

/// Render a slice enlarged by `scale`, with each polygon outlined
pub fn render_slice(
    slice: &Grid2<Label>,
    polygons: &[SmoothPolygon],
    background: Label,
    scale: u32,
) -> Result<RgbImage> {
    if scale == 0 {
        return Err(ContourError::InvalidInput("render scale must be > 0".to_string()));
    }

    let width = slice.width() as u32 * scale;
    let height = slice.height() as u32 * scale;
    let mut image = RgbImage::from_pixel(width, height, BACKGROUND_COLOR);

    for y in 0..height {
        for x in 0..width {
            let value = slice.get((x / scale) as usize, (y / scale) as usize);
            if value != background {
                image.put_pixel(x, y, label_color(value));
            }
        }
    }

    for polygon in polygons.iter().filter(|p| p.len() >= 2) {
        let n = polygon.len();
        for i in 0..n {
            let start = to_image(polygon.points[i], scale, width, height);
            let end = to_image(polygon.points[(i + 1) % n], scale, width, height);
            for (x, y) in Bresenham::new(start, end) {
                image.put_pixel(x as u32, y as u32, OUTLINE_COLOR);
            }
        }
    }

    Ok(image)
}

/// Write one PNG per contoured slice of a structure; returns the number written
pub fn save_structure_debug<P: AsRef<Path>>(
    volume: &Volume<Label>,
    contours: &ContoursPerSlice,
    background: Label,
    scale: u32,
    output_dir: P,
) -> Result<usize> {
    let dir = output_dir.as_ref();
    fs::create_dir_all(dir)?;

    let mut written = 0;
    for (z, polygons) in contours.iter() {
        let slice = volume.slice(z)?;
        let image = render_slice(&slice, polygons, background, scale)?;
        let path = dir.join(format!("label_{}_slice_{:03}.png", contours.label, z));
        image.save_with_format(&path, ImageFormat::Png)?;
        written += 1;
    }

    log::debug!("Saved {} debug image(s) for label {}", written, contours.label);

    Ok(written)
}
