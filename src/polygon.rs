// src/polygon.rs - Polygon types and the raw-chain to pixel-edge outline conversion

use serde::{Deserialize, Serialize};

use crate::errors::{ContourError, Result};
use crate::grid::{Point2F, Point2I};

/// Direction vectors for Moore-Neighbor contour tracing, clockwise on screen (y down)
pub static MOORE_NEIGHBORHOOD: [(i32, i32); 8] = [
    (1, 0),   // right
    (1, 1),   // down-right
    (0, 1),   // down
    (-1, 1),  // down-left
    (-1, 0),  // left
    (-1, -1), // up-left
    (0, -1),  // up
    (1, -1),  // up-right
];

/// Pixel corners in clockwise order: top-left, top-right, bottom-right, bottom-left
static PIXEL_CORNERS: [(f64, f64); 4] = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];

const COLLINEAR_EPSILON: f64 = 1e-9;

/// Closed polygon with the number of pixels it encloses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon<P> {
    pub points: Vec<P>,
    pub pixel_count: usize,
}

/// Boundary chain of pixel centers as produced by the tracer
pub type RawPolygon = Polygon<Point2I>;

/// Storage-ready polygon on the pixel-edge lattice
pub type SmoothPolygon = Polygon<Point2F>;

impl<P> Polygon<P> {
    pub fn new(points: Vec<P>, pixel_count: usize) -> Self {
        Self { points, pixel_count }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl Polygon<Point2F> {
    /// Shoelace area; positive for clockwise order on screen (y down)
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }
}

impl Polygon<Point2I> {
    /// Exact outline along pixel edges of the pixels this chain walks through.
    ///
    /// Every pixel contributes the corners on its exterior side, swept clockwise from
    /// the corner fixed by the incoming step to the corner fixed by the outgoing step.
    /// Filling the result with the even-odd rule reproduces the traced region exactly.
    pub fn pixel_edge_outline(&self) -> Result<Vec<Point2F>> {
        let points = &self.points;
        match points.len() {
            0 => {
                return Err(ContourError::DegenerateContour(
                    "raw polygon has no points".to_string(),
                ))
            }
            1 => return Ok((0..4).map(|c| corner(points[0], c)).collect()),
            _ => {}
        }

        let n = points.len();
        let mut steps = Vec::with_capacity(n);
        for i in 0..n {
            let (a, b) = (points[i], points[(i + 1) % n]);
            let dir = direction_between(a, b).ok_or_else(|| {
                ContourError::DegenerateContour(format!(
                    "step ({}, {}) -> ({}, {}) is not a unit compass step",
                    a.x, a.y, b.x, b.y
                ))
            })?;
            steps.push(dir);
        }

        let mut outline: Vec<Point2F> = Vec::with_capacity(n * 2);
        for i in 0..n {
            let incoming = steps[(i + n - 1) % n];
            let outgoing = steps[i];
            let entry = incoming / 2;
            let exit = ((outgoing + 1) / 2 + 1) % 4;

            let mut span = (exit + 4 - entry) % 4;
            // Diagonal spur tip: walk all the way around the pixel
            if span == 0 && outgoing == (incoming + 4) % 8 {
                span = 4;
            }

            for k in 0..=span {
                let p = corner(points[i], (entry + k) % 4);
                if outline.last() != Some(&p) {
                    outline.push(p);
                }
            }
        }

        while outline.len() > 1 && outline.last() == outline.first() {
            outline.pop();
        }

        Ok(outline)
    }
}

/// Index into `MOORE_NEIGHBORHOOD` of the unit step from `a` to `b`
pub fn direction_between(a: Point2I, b: Point2I) -> Option<usize> {
    let delta = (b.x - a.x, b.y - a.y);
    MOORE_NEIGHBORHOOD.iter().position(|&d| d == delta)
}

#[inline]
fn corner(pixel: Point2I, index: usize) -> Point2F {
    let (dx, dy) = PIXEL_CORNERS[index];
    Point2F::new(pixel.x as f64 + dx, pixel.y as f64 + dy)
}

/// Shoelace area of an implicitly closed ring
pub fn signed_area(points: &[Point2F]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    twice / 2.0
}

#[inline]
fn is_strictly_collinear(a: Point2F, b: Point2F, c: Point2F) -> bool {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let (bcx, bcy) = (c.x - b.x, c.y - b.y);
    let cross = abx * bcy - aby * bcx;
    let dot = abx * bcx + aby * bcy;
    cross.abs() < COLLINEAR_EPSILON && dot > 0.0
}

/// Drop repeated points and points lying strictly between their neighbours on a
/// straight line, treating the ring as closed
pub fn remove_collinear(points: &[Point2F]) -> Vec<Point2F> {
    let mut kept: Vec<Point2F> = Vec::with_capacity(points.len());
    for &p in points {
        if kept.last() == Some(&p) {
            continue;
        }
        kept.push(p);
        while kept.len() >= 3 {
            let n = kept.len();
            if is_strictly_collinear(kept[n - 3], kept[n - 2], kept[n - 1]) {
                kept.remove(n - 2);
            } else {
                break;
            }
        }
    }

    // Seam between the last and first point
    loop {
        let n = kept.len();
        if n < 3 {
            break;
        }
        if kept[n - 1] == kept[0] {
            kept.pop();
        } else if is_strictly_collinear(kept[n - 2], kept[n - 1], kept[0]) {
            kept.pop();
        } else if is_strictly_collinear(kept[n - 1], kept[0], kept[1]) {
            kept.remove(0);
        } else {
            break;
        }
    }

    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(points: &[(i32, i32)]) -> RawPolygon {
        Polygon::new(points.iter().map(|&(x, y)| Point2I::new(x, y)).collect(), 0)
    }

    #[test]
    fn single_pixel_outline_is_unit_square() {
        let outline = raw(&[(2, 2)]).pixel_edge_outline().unwrap();
        assert_eq!(
            outline,
            vec![
                Point2F::new(1.5, 1.5),
                Point2F::new(2.5, 1.5),
                Point2F::new(2.5, 2.5),
                Point2F::new(1.5, 2.5),
            ]
        );
    }

    #[test]
    fn horizontal_domino_outline_encloses_two_pixels() {
        let outline = raw(&[(0, 0), (1, 0)]).pixel_edge_outline().unwrap();
        let simplified = remove_collinear(&outline);
        assert_eq!(simplified.len(), 4);
        assert!((signed_area(&outline) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn diagonal_spur_wraps_around_tip_pixel() {
        // Two pixels touching only at a corner
        let outline = raw(&[(0, 0), (1, 1)]).pixel_edge_outline().unwrap();
        assert_eq!(outline.len(), 8);
        assert!((signed_area(&outline) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn non_unit_step_is_degenerate() {
        let err = raw(&[(0, 0), (2, 0)]).pixel_edge_outline().unwrap_err();
        assert!(matches!(err, ContourError::DegenerateContour(_)));
    }

    #[test]
    fn remove_collinear_handles_seam() {
        let ring = vec![
            Point2F::new(1.0, 0.0),
            Point2F::new(2.0, 0.0),
            Point2F::new(2.0, 2.0),
            Point2F::new(0.0, 2.0),
            Point2F::new(0.0, 0.0),
        ];
        let kept = remove_collinear(&ring);
        assert_eq!(kept.len(), 4);
        assert!(!kept.contains(&Point2F::new(1.0, 0.0)));
    }

    #[test]
    fn remove_collinear_keeps_spike_tips() {
        let ring = vec![
            Point2F::new(0.0, 0.0),
            Point2F::new(2.0, 0.0),
            Point2F::new(1.0, 0.0),
            Point2F::new(1.0, 1.0),
        ];
        assert_eq!(remove_collinear(&ring).len(), 4);
    }
}
