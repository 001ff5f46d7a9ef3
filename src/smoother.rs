// src/smoother.rs - Raw boundary chains to compact storage polygons

use serde::{Deserialize, Serialize};

use crate::errors::{ContourError, Result};
use crate::grid::Point2F;
use crate::polygon::{remove_collinear, Polygon, RawPolygon, SmoothPolygon};

const STEP_EPSILON: f64 = 1e-9;

/// How aggressively raw boundaries are reduced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingLevel {
    /// Exact pixel-edge outline, collinear points dropped
    None,
    /// Staircase jogs cut at their midpoints
    #[default]
    Small,
    /// Interpolated and neighbour-averaged, for display only
    Large,
}

impl SmoothingLevel {
    /// Only the default level may be written into a structure set
    pub fn is_persistable(self) -> bool {
        self == SmoothingLevel::Small
    }

    /// Whether round-trip verification applies to this level
    pub fn is_verifiable(self) -> bool {
        self != SmoothingLevel::Large
    }
}

/// Parameters of the display-only `Large` level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LargeSmoothingParams {
    pub interpolation_points: usize,
    pub strength: f64,
    pub iterations: usize,
}

impl Default for LargeSmoothingParams {
    fn default() -> Self {
        Self {
            interpolation_points: 2,
            strength: 0.5,
            iterations: 5,
        }
    }
}

/// Turn taken at an outline vertex relative to the incoming heading (screen y down)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Forward,
    Left,
    Right,
}

/// Outline re-expressed as a start point, an initial heading and one turn per vertex
#[derive(Debug, Clone, PartialEq)]
pub struct TurnString {
    pub start: Point2F,
    pub heading: (i32, i32),
    pub turns: Vec<Turn>,
}

/// What the codebook does with the corner opening a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Replacement {
    /// Keep the corner as a polygon vertex
    Corner,
    /// Replace this corner and the next by the midpoint of the unit run between them
    JogMidpoint,
}

/// Codebook over (turn, run length to next corner, next turn).
///
/// A unit run between opposite turns is one riser of a staircase; cutting it at its
/// midpoint moves no boundary point more than half a pixel. Same-direction turns around a
/// unit run are one-pixel tips or notches and stay exact.
fn codebook(opening: Turn, run: usize, closing: Turn) -> Replacement {
    match (opening, run, closing) {
        (Turn::Left, 1, Turn::Right) | (Turn::Right, 1, Turn::Left) => Replacement::JogMidpoint,
        _ => Replacement::Corner,
    }
}

fn unit_heading(a: Point2F, b: Point2F) -> Option<(i32, i32)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    if (dx.abs() - 1.0).abs() < STEP_EPSILON && dy.abs() < STEP_EPSILON {
        Some((dx.signum() as i32, 0))
    } else if (dy.abs() - 1.0).abs() < STEP_EPSILON && dx.abs() < STEP_EPSILON {
        Some((0, dy.signum() as i32))
    } else {
        None
    }
}

fn classify_turn(from: (i32, i32), to: (i32, i32)) -> Option<Turn> {
    let cross = from.0 * to.1 - from.1 * to.0;
    match cross {
        0 if from == to => Some(Turn::Forward),
        1 => Some(Turn::Right),
        -1 => Some(Turn::Left),
        _ => None,
    }
}

/// Build the turn string of a unit-step pixel-edge outline.
///
/// `turns[i]` is the turn made at `outline[i]`, with the closing step feeding vertex 0.
pub fn turn_string(outline: &[Point2F]) -> Result<TurnString> {
    let n = outline.len();
    if n < 4 {
        return Err(ContourError::DegenerateContour(format!(
            "outline has {} points, at least 4 required",
            n
        )));
    }

    let headings = (0..n)
        .map(|i| {
            let (a, b) = (outline[i], outline[(i + 1) % n]);
            unit_heading(a, b).ok_or_else(|| {
                ContourError::DegenerateContour(format!(
                    "outline step ({}, {}) -> ({}, {}) is not a unit edge",
                    a.x, a.y, b.x, b.y
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let turns = (0..n)
        .map(|i| {
            let incoming = headings[(i + n - 1) % n];
            classify_turn(incoming, headings[i]).ok_or_else(|| {
                ContourError::DegenerateContour(format!(
                    "outline reverses direction at ({}, {})",
                    outline[i].x, outline[i].y
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(TurnString {
        start: outline[0],
        heading: headings[0],
        turns,
    })
}

/// Smooth one traced boundary at the requested level
pub fn smooth(raw: &RawPolygon, level: SmoothingLevel, params: &LargeSmoothingParams) -> Result<SmoothPolygon> {
    let outline = raw.pixel_edge_outline()?;
    let turns = turn_string(&outline)?;

    let points = match level {
        SmoothingLevel::None => remove_collinear(&outline),
        SmoothingLevel::Small => collapse_with_codebook(&outline, &turns),
        SmoothingLevel::Large => {
            let coarse = collapse_with_codebook(&outline, &turns);
            relax(&interpolate_edges(&coarse, params.interpolation_points), params)
        }
    };

    Ok(Polygon::new(points, raw.pixel_count))
}

/// Smooth every polygon of a slice, failing on the first degenerate one
pub fn smooth_all(raws: &[RawPolygon], level: SmoothingLevel, params: &LargeSmoothingParams) -> Result<Vec<SmoothPolygon>> {
    raws.iter().map(|raw| smooth(raw, level, params)).collect()
}

fn collapse_with_codebook(outline: &[Point2F], turns: &TurnString) -> Vec<Point2F> {
    let corners: Vec<usize> = turns
        .turns
        .iter()
        .enumerate()
        .filter(|(_, t)| **t != Turn::Forward)
        .map(|(i, _)| i)
        .collect();
    let m = corners.len();
    if m < 4 {
        return remove_collinear(outline);
    }

    let corner_point = |k: usize| outline[corners[k % m]];
    let corner_turn = |k: usize| turns.turns[corners[k % m]];
    // Runs between corners are axis-aligned
    let run_after = |k: usize| {
        let (a, b) = (corner_point(k), corner_point(k + 1));
        ((b.x - a.x).abs() + (b.y - a.y).abs()).round() as usize
    };
    let replacement = |k: usize| codebook(corner_turn(k), run_after(k), corner_turn(k + 1));

    // Start on a corner that does not close a jog so the seam does not split one
    let offset = (0..m)
        .find(|&k| replacement((k + m - 1) % m) == Replacement::Corner)
        .unwrap_or(0);

    let mut collapsed = Vec::with_capacity(m);
    let mut k = 0;
    while k < m {
        let at = offset + k;
        match replacement(at % m) {
            Replacement::JogMidpoint if k + 1 < m => {
                let (a, b) = (corner_point(at), corner_point(at + 1));
                collapsed.push(Point2F::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0));
                k += 2;
            }
            _ => {
                collapsed.push(corner_point(at));
                k += 1;
            }
        }
    }

    let simplified = remove_collinear(&collapsed);
    if simplified.len() < 3 {
        log::debug!("Codebook collapse left {} points, keeping exact outline", simplified.len());
        return remove_collinear(outline);
    }
    simplified
}

/// Insert `count` evenly spaced points inside every edge of a closed ring
fn interpolate_edges(points: &[Point2F], count: usize) -> Vec<Point2F> {
    let n = points.len();
    let mut dense = Vec::with_capacity(n * (count + 1));
    for i in 0..n {
        let (a, b) = (points[i], points[(i + 1) % n]);
        dense.push(a);
        for j in 1..=count {
            let t = j as f64 / (count + 1) as f64;
            dense.push(Point2F::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t));
        }
    }
    dense
}

/// Pull every point towards the mean of its neighbours, treating the ring as periodic
fn relax(points: &[Point2F], params: &LargeSmoothingParams) -> Vec<Point2F> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }

    let strength = params.strength.clamp(0.0, 1.0);
    let mut current = points.to_vec();
    for _ in 0..params.iterations {
        current = (0..n)
            .map(|i| {
                let prev = current[(i + n - 1) % n];
                let next = current[(i + 1) % n];
                let p = current[i];
                Point2F::new(
                    p.x * (1.0 - strength) + (prev.x + next.x) / 2.0 * strength,
                    p.y * (1.0 - strength) + (prev.y + next.y) / 2.0 * strength,
                )
            })
            .collect();
    }
    current
}
