// src/structure_set.rs - Physical-space contour records and the reverse grouping by slice

use serde::{Deserialize, Serialize};

use crate::errors::{ContourError, Result};
use crate::filler::count_enclosed;
use crate::grid::{Label, Point2F};
use crate::polygon::{Polygon, SmoothPolygon};
use crate::smoother::SmoothingLevel;
use crate::transform::VoxelTransform;
use crate::volume::ContoursPerSlice;
use nalgebra::Point3;

/// Geometric type tag carried by every stored contour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContourType {
    ClosedPlanar,
    OpenPlanar,
    OpenNonplanar,
    Point,
}

/// One contour as (x, y, z) triples in physical space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredContour {
    pub contour_type: ContourType,
    pub points: Vec<[f64; 3]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureRecord {
    pub label: Label,
    pub name: String,
    pub contours: Vec<StoredContour>,
}

impl StructureRecord {
    pub fn closed_planar_count(&self) -> usize {
        self.contours
            .iter()
            .filter(|c| c.contour_type == ContourType::ClosedPlanar)
            .count()
    }
}

/// Structures sharing one image frame
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureSet {
    /// Voxel to physical mapping of the frame
    #[serde(default)]
    pub transform: VoxelTransform,
    pub structures: Vec<StructureRecord>,
}

impl StructureSet {
    pub fn new(transform: VoxelTransform) -> Self {
        Self {
            transform,
            structures: Vec::new(),
        }
    }

    /// Add a structure, converting it to physical space
    pub fn push(&mut self, contours: &ContoursPerSlice, name: &str) -> Result<()> {
        let record = to_structure_record(contours, &self.transform, name)?;
        self.structures.push(record);
        Ok(())
    }

    pub fn get(&self, label: Label) -> Option<&StructureRecord> {
        self.structures.iter().find(|s| s.label == label)
    }
}

/// Map a structure's polygons to physical space, every contour tagged closed planar.
///
/// Only small-level contours may be stored.
pub fn to_structure_record(
    contours: &ContoursPerSlice,
    transform: &VoxelTransform,
    name: &str,
) -> Result<StructureRecord> {
    if !contours.level.is_persistable() {
        return Err(ContourError::InvalidInput(format!(
            "{:?} smoothing cannot be stored, only {:?}",
            contours.level,
            SmoothingLevel::Small
        )));
    }

    let stored = contours
        .iter()
        .flat_map(|(z, polygons)| {
            polygons.iter().map(move |polygon| StoredContour {
                contour_type: ContourType::ClosedPlanar,
                points: polygon
                    .points
                    .iter()
                    .map(|&p| transform.slice_point_to_physical(p, z))
                    .collect(),
            })
        })
        .collect();

    Ok(StructureRecord {
        label: contours.label,
        name: name.to_string(),
        contours: stored,
    })
}

/// Group a stored structure back into slices of a volume of `dims`.
///
/// Contours that are not closed planar, that span several slices or that fall outside
/// the volume are dropped with a warning. Pixel counts are recomputed by filling.
pub fn from_structure_record(
    record: &StructureRecord,
    transform: &VoxelTransform,
    dims: [usize; 3],
) -> Result<ContoursPerSlice> {
    let [width, height, depth] = dims;
    let mut contours = ContoursPerSlice::new(record.label, SmoothingLevel::Small);
    let mut dropped = 0usize;

    for (i, stored) in record.contours.iter().enumerate() {
        if stored.contour_type != ContourType::ClosedPlanar {
            log::warn!(
                "Structure '{}': skipping {:?} contour {}",
                record.name,
                stored.contour_type,
                i
            );
            dropped += 1;
            continue;
        }

        if stored.points.len() < 3 {
            log::warn!(
                "Structure '{}': contour {} has {} point(s), skipping",
                record.name,
                i,
                stored.points.len()
            );
            dropped += 1;
            continue;
        }

        let voxels: Vec<Point3<f64>> = stored
            .points
            .iter()
            .map(|p| transform.to_voxel(Point3::new(p[0], p[1], p[2])))
            .collect();

        let z = voxels[0].z.round();
        if voxels.iter().any(|v| v.z.round() != z) {
            log::warn!(
                "Structure '{}': contour {} crosses slices, skipping",
                record.name,
                i
            );
            dropped += 1;
            continue;
        }

        if z < 0.0 || z >= depth as f64 {
            log::warn!(
                "Structure '{}': contour {} lies on slice {} outside depth {}",
                record.name,
                i,
                z,
                depth
            );
            dropped += 1;
            continue;
        }

        let mut polygon: SmoothPolygon =
            Polygon::new(voxels.iter().map(|v| Point2F::new(v.x, v.y)).collect(), 0);
        polygon.pixel_count = count_enclosed(width, height, std::slice::from_ref(&polygon));
        contours.insert(z as usize, vec![polygon]);
    }

    if dropped > 0 {
        log::info!(
            "Structure '{}': kept {} of {} contour(s)",
            record.name,
            record.contours.len() - dropped,
            record.contours.len()
        );
    }

    Ok(contours)
}
