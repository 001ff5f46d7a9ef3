// src/transform.rs - Voxel index <-> physical (patient) coordinate affine

use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

use crate::errors::{ContourError, Result};
use crate::grid::Point2F;

const AFFINE_EPSILON: f64 = 1e-12;

/// Affine map from continuous voxel coordinates (x, y, slice) to physical space.
///
/// Serialized as its four matrix rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 4]; 4]", into = "[[f64; 4]; 4]")]
pub struct VoxelTransform {
    forward: Matrix4<f64>,
    inverse: Matrix4<f64>,
}

impl VoxelTransform {
    pub fn new(forward: Matrix4<f64>) -> Result<Self> {
        let last_row = forward.row(3);
        if (last_row[0].abs() + last_row[1].abs() + last_row[2].abs()) > AFFINE_EPSILON
            || (last_row[3] - 1.0).abs() > AFFINE_EPSILON
        {
            return Err(ContourError::InvalidInput(
                "transform must be affine (last row 0 0 0 1)".to_string(),
            ));
        }

        let inverse = forward.try_inverse().ok_or_else(|| {
            ContourError::InvalidInput("transform matrix is singular".to_string())
        })?;

        Ok(Self { forward, inverse })
    }

    pub fn identity() -> Self {
        Self {
            forward: Matrix4::identity(),
            inverse: Matrix4::identity(),
        }
    }

    /// Axis-aligned grid with the given voxel spacing and the origin at voxel (0, 0, 0)
    pub fn from_spacing_origin(spacing: [f64; 3], origin: [f64; 3]) -> Result<Self> {
        #[rustfmt::skip]
        let forward = Matrix4::new(
            spacing[0], 0.0, 0.0, origin[0],
            0.0, spacing[1], 0.0, origin[1],
            0.0, 0.0, spacing[2], origin[2],
            0.0, 0.0, 0.0, 1.0,
        );
        Self::new(forward)
    }

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Result<Self> {
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(Matrix4::from_row_slice(&flat))
    }

    pub fn rows(&self) -> [[f64; 4]; 4] {
        let mut rows = [[0.0; 4]; 4];
        for (r, row) in rows.iter_mut().enumerate() {
            for (c, value) in row.iter_mut().enumerate() {
                *value = self.forward[(r, c)];
            }
        }
        rows
    }

    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.forward
    }

    /// Physical volume of one voxel
    pub fn voxel_volume(&self) -> f64 {
        self.forward.determinant().abs()
    }

    pub fn to_physical(&self, voxel: Point3<f64>) -> Point3<f64> {
        self.forward.transform_point(&voxel)
    }

    pub fn to_voxel(&self, physical: Point3<f64>) -> Point3<f64> {
        self.inverse.transform_point(&physical)
    }

    /// Physical position of an in-plane polygon point on a slice
    pub fn slice_point_to_physical(&self, point: Point2F, slice: usize) -> [f64; 3] {
        let p = self.to_physical(Point3::new(point.x, point.y, slice as f64));
        [p.x, p.y, p.z]
    }
}

impl Default for VoxelTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<[[f64; 4]; 4]> for VoxelTransform {
    type Error = ContourError;

    fn try_from(rows: [[f64; 4]; 4]) -> Result<Self> {
        Self::from_rows(rows)
    }
}

impl From<VoxelTransform> for [[f64; 4]; 4] {
    fn from(transform: VoxelTransform) -> Self {
        transform.rows()
    }
}
