// src/filler.rs - Even-odd scanline rasterization of polygons into label grids

use crate::errors::Result;
use crate::grid::{Grid2, Point2F};
use crate::polygon::{RawPolygon, SmoothPolygon};

/// Visit every pixel whose center lies inside the rings under the even-odd rule.
///
/// Crossings are taken half-open in y, so a vertex on a scanline is counted once and
/// horizontal edges never are. A pixel is inside when `x_in <= x < x_out`.
fn scanline_even_odd<F>(width: usize, height: usize, rings: &[&[Point2F]], mut visit: F)
where
    F: FnMut(usize, usize),
{
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for ring in rings.iter().filter(|r| r.len() >= 3) {
        for p in ring.iter() {
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
    }
    if !min_y.is_finite() || !max_y.is_finite() {
        return;
    }

    let y_start = (min_y.floor() as i64).max(0);
    let y_end = (max_y.ceil() as i64).min(height as i64 - 1);
    let last_x = width as i64 - 1;
    let mut crossings: Vec<f64> = Vec::new();

    for y in y_start..=y_end {
        let yc = y as f64;
        crossings.clear();

        for ring in rings.iter().filter(|r| r.len() >= 3) {
            let n = ring.len();
            for i in 0..n {
                let a = ring[i];
                let b = ring[(i + 1) % n];
                if (a.y > yc) != (b.y > yc) {
                    crossings.push(a.x + (yc - a.y) * (b.x - a.x) / (b.y - a.y));
                }
            }
        }

        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let start = (span[0].ceil() as i64).max(0);
            let end = (span[1].ceil() as i64 - 1).min(last_x);
            for x in start..=end {
                visit(x as usize, y as usize);
            }
        }
    }
}

/// Write `value` into every pixel enclosed by the rings; returns the number written
pub fn fill_rings<T: Copy + PartialEq>(grid: &mut Grid2<T>, rings: &[&[Point2F]], value: T) -> usize {
    let (width, height) = (grid.width(), grid.height());
    let mut written = 0;
    scanline_even_odd(width, height, rings, |x, y| {
        grid.set(x, y, value);
        written += 1;
    });
    written
}

/// Fill smoothed polygons; all rings share one even-odd parity
pub fn fill_polygons<T: Copy + PartialEq>(
    grid: &mut Grid2<T>,
    polygons: &[SmoothPolygon],
    value: T,
) -> usize {
    let rings: Vec<&[Point2F]> = polygons.iter().map(|p| p.points.as_slice()).collect();
    fill_rings(grid, &rings, value)
}

/// Fill raw tracer chains through their exact pixel-edge outlines
pub fn fill_raw_polygons<T: Copy + PartialEq>(
    grid: &mut Grid2<T>,
    polygons: &[RawPolygon],
    value: T,
) -> Result<usize> {
    let outlines = polygons
        .iter()
        .map(|p| p.pixel_edge_outline())
        .collect::<Result<Vec<_>>>()?;
    let rings: Vec<&[Point2F]> = outlines.iter().map(|o| o.as_slice()).collect();
    Ok(fill_rings(grid, &rings, value))
}

/// Number of pixels of a `width` x `height` grid the polygons enclose
pub fn count_enclosed(width: usize, height: usize, polygons: &[SmoothPolygon]) -> usize {
    let rings: Vec<&[Point2F]> = polygons.iter().map(|p| p.points.as_slice()).collect();
    let mut count = 0;
    scanline_even_odd(width, height, &rings, |_, _| count += 1);
    count
}
