// src/grid.rs - Row-major label grids (2D slices and 3D volumes)

use serde::{Deserialize, Serialize};

use crate::errors::{ContourError, Result};

/// Label value stored in masks
pub type Label = u16;

/// Pixel-center grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point2I {
    pub x: i32,
    pub y: i32,
}

impl Point2I {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Pixel-edge coordinate; pixel (x, y) covers [x-0.5, x+0.5] x [y-0.5, y+0.5]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2F {
    pub x: f64,
    pub y: f64,
}

impl Point2F {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// 2D row-major grid
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

impl<T: Copy + PartialEq> Grid2<T> {
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(ContourError::InvalidInput(format!(
                "grid dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = width.checked_mul(height).ok_or_else(|| {
            ContourError::InvalidInput(format!("grid {}x{} overflows usize", width, height))
        })?;
        if data.len() != expected {
            return Err(ContourError::InvalidInput(format!(
                "grid {}x{} expects {} values, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }

        Ok(Self { width, height, data })
    }

    pub fn new_fill(width: usize, height: usize, value: T) -> Result<Self> {
        let len = width.checked_mul(height).ok_or_else(|| {
            ContourError::InvalidInput(format!("grid {}x{} overflows usize", width, height))
        })?;
        Self::from_vec(width, height, vec![value; len])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[y * self.width + x]
    }

    /// Signed lookup; `None` outside the grid
    #[inline]
    pub fn get_signed(&self, x: i32, y: i32) -> Option<T> {
        if self.in_bounds(x, y) {
            Some(self.data[y as usize * self.width + x as usize])
        } else {
            None
        }
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.data[y * self.width + x] = value;
    }

    pub fn count(&self, value: T) -> usize {
        self.data.iter().filter(|&&v| v == value).count()
    }

    /// Convert element type, e.g. labels into a wider working grid
    pub fn map<U, F: Fn(T) -> U>(&self, f: F) -> Grid2<U> {
        Grid2 {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }
}

/// 3D row-major volume, indexed z * w * h + y * w + x
#[derive(Debug, Clone, PartialEq)]
pub struct Volume<T> {
    width: usize,
    height: usize,
    depth: usize,
    data: Vec<T>,
}

impl<T: Copy + PartialEq> Volume<T> {
    pub fn from_vec(dims: [usize; 3], data: Vec<T>) -> Result<Self> {
        let [width, height, depth] = dims;
        if width == 0 || height == 0 || depth == 0 {
            return Err(ContourError::InvalidInput(format!(
                "volume dimensions must be non-zero, got {:?}",
                dims
            )));
        }
        let expected = width
            .checked_mul(height)
            .and_then(|n| n.checked_mul(depth))
            .ok_or_else(|| {
                ContourError::InvalidInput(format!("volume {:?} overflows usize", dims))
            })?;
        if data.len() != expected {
            return Err(ContourError::InvalidInput(format!(
                "volume {:?} expects {} values, got {}",
                dims,
                expected,
                data.len()
            )));
        }

        Ok(Self { width, height, depth, data })
    }

    pub fn new_fill(dims: [usize; 3], value: T) -> Result<Self> {
        let len = dims[0]
            .checked_mul(dims[1])
            .and_then(|n| n.checked_mul(dims[2]))
            .ok_or_else(|| {
                ContourError::InvalidInput(format!("volume {:?} overflows usize", dims))
            })?;
        Self::from_vec(dims, vec![value; len])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn dims(&self) -> [usize; 3] {
        [self.width, self.height, self.depth]
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        (z * self.height + y) * self.width + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> T {
        self.data[self.index(x, y, z)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, value: T) {
        let idx = self.index(x, y, z);
        self.data[idx] = value;
    }

    /// Copy one axial slice out as an owned 2D grid
    pub fn slice(&self, z: usize) -> Result<Grid2<T>> {
        if z >= self.depth {
            return Err(ContourError::InvalidInput(format!(
                "slice {} outside volume depth {}",
                z, self.depth
            )));
        }
        let plane = self.width * self.height;
        let start = z * plane;
        Grid2::from_vec(self.width, self.height, self.data[start..start + plane].to_vec())
    }

    /// Overwrite one axial slice
    pub fn set_slice(&mut self, z: usize, slice: &Grid2<T>) -> Result<()> {
        if z >= self.depth || slice.width() != self.width || slice.height() != self.height {
            return Err(ContourError::InvalidInput(format!(
                "slice {} ({}x{}) does not fit volume {:?}",
                z,
                slice.width(),
                slice.height(),
                self.dims()
            )));
        }
        let plane = self.width * self.height;
        self.data[z * plane..(z + 1) * plane].copy_from_slice(slice.data());
        Ok(())
    }
}

impl Volume<Label> {
    /// Distinct non-background labels present, ascending
    pub fn labels_present(&self, background: Label) -> Vec<Label> {
        let mut seen = vec![false; Label::MAX as usize + 1];
        for &v in &self.data {
            seen[v as usize] = true;
        }
        seen.iter()
            .enumerate()
            .filter(|&(v, &present)| present && v != background as usize)
            .map(|(v, _)| v as Label)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_vec_rejects_length_mismatch() {
        let err = Grid2::from_vec(3, 3, vec![0u16; 8]).unwrap_err();
        assert!(matches!(err, ContourError::InvalidInput(_)));
    }

    #[test]
    fn from_vec_rejects_zero_dimension() {
        assert!(Volume::from_vec([0, 3, 1], Vec::<u16>::new()).is_err());
    }

    #[test]
    fn slice_round_trips_through_set_slice() {
        let mut volume = Volume::new_fill([2, 2, 3], 0u16).unwrap();
        let plane = Grid2::from_vec(2, 2, vec![1, 2, 3, 4]).unwrap();
        volume.set_slice(1, &plane).unwrap();

        assert_eq!(volume.slice(1).unwrap(), plane);
        assert_eq!(volume.get(1, 1, 1), 4);
        assert_eq!(volume.slice(0).unwrap().count(0), 4);
    }

    #[test]
    fn labels_present_skips_background() {
        let volume = Volume::from_vec([4, 1, 1], vec![0u16, 3, 7, 3]).unwrap();
        assert_eq!(volume.labels_present(0), vec![3, 7]);
    }
}
