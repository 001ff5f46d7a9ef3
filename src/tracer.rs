// src/tracer.rs - Per-slice boundary extraction with Moore-Neighbor tracing

use crate::errors::{ContourError, Result};
use crate::filler::fill_raw_polygons;
use crate::grid::{Grid2, Label, Point2I};
use crate::polygon::{Polygon, RawPolygon, MOORE_NEIGHBORHOOD};

/// Find one closed boundary per 8-connected `foreground` region of a slice.
///
/// Regions are discovered in raster order. After each trace the region is filled into a
/// private working copy with a fresh marker, which marks it visited and swallows any
/// holes (and anything inside them) before the scan reaches them. Each returned polygon
/// records how many pixels that fill covered.
pub fn trace_slice(slice: &Grid2<Label>, foreground: Label, background: Label) -> Result<Vec<RawPolygon>> {
    if foreground == background {
        return Err(ContourError::InvalidInput(format!(
            "foreground id {} equals background id",
            foreground
        )));
    }

    let mut work: Grid2<u32> = slice.map(u32::from);
    let fg = u32::from(foreground);
    let highest = work.data().iter().copied().max().unwrap_or(0);
    let mut next_marker = highest.max(fg).max(u32::from(background)) + 1;

    let mut polygons = Vec::new();

    for y in 0..work.height() {
        for x in 0..work.width() {
            if work.get(x, y) != fg {
                continue;
            }

            let start = Point2I::new(x as i32, y as i32);
            let chain = moore_walk(&work, start, fg)?;
            let mut polygon = Polygon::new(chain, 0);

            polygon.pixel_count = fill_raw_polygons(&mut work, std::slice::from_ref(&polygon), next_marker)?;
            if work.get(x, y) == fg {
                return Err(ContourError::DegenerateContour(format!(
                    "boundary traced from ({}, {}) does not enclose its start pixel",
                    x, y
                )));
            }

            next_marker = next_marker.checked_add(1).ok_or_else(|| {
                ContourError::InvalidInput("ran out of region markers".to_string())
            })?;
            polygons.push(polygon);
        }
    }

    log::trace!(
        "Traced {} region(s) of label {} in {}x{} slice",
        polygons.len(),
        foreground,
        slice.width(),
        slice.height()
    );

    Ok(polygons)
}

/// Walk the outer boundary clockwise from `start`, the first region pixel in raster order.
///
/// The search around each pixel begins two steps counter-clockwise of the last move.
/// The walk ends when it stands on `start` and is about to repeat its first move, so a
/// start pixel that is revisited mid-walk (spurs, one-pixel bridges) does not end it.
fn moore_walk(work: &Grid2<u32>, start: Point2I, fg: u32) -> Result<Vec<Point2I>> {
    let max_steps = 4 * work.width() * work.height() + 8;
    let is_region = |p: Point2I| work.get_signed(p.x, p.y) == Some(fg);

    let mut chain = vec![start];
    let mut current = start;
    // Scanning reached `start` moving right
    let mut last_dir = 0usize;
    let mut first_dir: Option<usize> = None;

    for _ in 0..max_steps {
        let next_dir = (0..8).map(|i| (last_dir + 6 + i) % 8).find(|&d| {
            let (dx, dy) = MOORE_NEIGHBORHOOD[d];
            is_region(Point2I::new(current.x + dx, current.y + dy))
        });

        let dir = match next_dir {
            Some(dir) => dir,
            // Isolated pixel
            None => return Ok(chain),
        };

        if current == start {
            match first_dir {
                None => first_dir = Some(dir),
                Some(first) if first == dir => {
                    chain.pop();
                    return Ok(chain);
                }
                Some(_) => {}
            }
        }

        let (dx, dy) = MOORE_NEIGHBORHOOD[dir];
        current = Point2I::new(current.x + dx, current.y + dy);
        last_dir = dir;
        chain.push(current);
    }

    Err(ContourError::DegenerateContour(format!(
        "boundary walk from ({}, {}) did not close within {} steps",
        start.x, start.y, max_steps
    )))
}
