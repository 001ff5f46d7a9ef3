// src/volume.rs - Slice-parallel mask to contour extraction with round-trip verification

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::Config;
use crate::errors::{ContourError, Result};
use crate::filler::{count_enclosed, fill_polygons};
use crate::grid::{Grid2, Label, Volume};
use crate::polygon::SmoothPolygon;
use crate::smoother::{smooth_all, LargeSmoothingParams, SmoothingLevel};
use crate::tracer::trace_slice;

/// Limits on how far a refilled slice may drift from the original mask
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconciliationTolerance {
    /// Pixel difference that must be exceeded
    pub absolute: usize,
    /// Fraction of the original count that must be exceeded
    pub relative: f64,
}

impl Default for ReconciliationTolerance {
    fn default() -> Self {
        Self {
            absolute: 10,
            relative: 0.15,
        }
    }
}

impl ReconciliationTolerance {
    /// Fail only when both the absolute and the relative limit are exceeded.
    ///
    /// The relative difference is taken against the original count (at least 1).
    pub fn check(&self, slice: usize, original: usize, reconstructed: usize) -> Result<()> {
        let absolute = original.abs_diff(reconstructed);
        let relative = absolute as f64 / original.max(1) as f64;

        if absolute > self.absolute && relative > self.relative {
            return Err(ContourError::ReconciliationFailure {
                slice,
                original,
                reconstructed,
                absolute,
                relative,
            });
        }

        Ok(())
    }
}

/// Smoothed polygons of one structure, keyed by slice index.
///
/// Slices without polygons are not stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContoursPerSlice {
    pub label: Label,
    pub level: SmoothingLevel,
    pub slices: BTreeMap<usize, Vec<SmoothPolygon>>,
}

impl ContoursPerSlice {
    pub fn new(label: Label, level: SmoothingLevel) -> Self {
        Self {
            label,
            level,
            slices: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, slice: usize, polygons: Vec<SmoothPolygon>) {
        if !polygons.is_empty() {
            self.slices.entry(slice).or_default().extend(polygons);
        }
    }

    pub fn get(&self, slice: usize) -> Option<&[SmoothPolygon]> {
        self.slices.get(&slice).map(|p| p.as_slice())
    }

    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    pub fn polygon_count(&self) -> usize {
        self.slices.values().map(|p| p.len()).sum()
    }

    pub fn point_count(&self) -> usize {
        self.slices.values().flatten().map(|p| p.len()).sum()
    }

    /// Pixels enclosed across all slices, as recorded on the polygons
    pub fn enclosed_pixels(&self) -> usize {
        self.slices.values().flatten().map(|p| p.pixel_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &[SmoothPolygon])> {
        self.slices.iter().map(|(&z, p)| (z, p.as_slice()))
    }
}

/// Result of converting one slice
#[derive(Debug)]
pub struct SliceOutcome {
    pub slice: usize,
    pub result: Result<Vec<SmoothPolygon>>,
}

/// Settings for `ContourVolumeAdapter`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOptions {
    pub background: Label,
    pub level: SmoothingLevel,
    pub large: LargeSmoothingParams,
    pub verify: bool,
    pub tolerance: ReconciliationTolerance,
    pub use_parallel: bool,
    pub num_threads: Option<usize>,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            background: 0,
            level: SmoothingLevel::Small,
            large: LargeSmoothingParams::default(),
            verify: true,
            tolerance: ReconciliationTolerance::default(),
            use_parallel: true,
            num_threads: None,
        }
    }
}

impl From<&Config> for ExtractionOptions {
    fn from(config: &Config) -> Self {
        Self {
            background: config.background_label,
            level: config.smoothing_level,
            large: config.large_smoothing(),
            verify: config.verify_round_trip,
            tolerance: config.tolerance(),
            use_parallel: config.use_parallel,
            num_threads: config.num_threads,
        }
    }
}

/// Converts label volumes to per-slice contours and back
#[derive(Debug, Clone, Default)]
pub struct ContourVolumeAdapter {
    options: ExtractionOptions,
}

impl ContourVolumeAdapter {
    pub fn new(options: ExtractionOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(ExtractionOptions::from(config))
    }

    pub fn options(&self) -> &ExtractionOptions {
        &self.options
    }

    /// Trace, smooth and verify a single slice
    pub fn extract_slice(&self, slice: &Grid2<Label>, index: usize, label: Label) -> Result<Vec<SmoothPolygon>> {
        let raw = trace_slice(slice, label, self.options.background)?;
        let polygons = smooth_all(&raw, self.options.level, &self.options.large)?;

        if self.options.verify && self.options.level.is_verifiable() {
            verify_slice(index, slice, label, &polygons, &self.options.tolerance)?;
        }

        Ok(polygons)
    }

    /// Convert every slice of `volume` for `label`; one outcome per slice in slice order.
    ///
    /// Only problems with the request itself (label equal to background, pool setup)
    /// fail the call. Per-slice errors are reported in the outcomes.
    pub fn extract_slices(&self, volume: &Volume<Label>, label: Label) -> Result<Vec<SliceOutcome>> {
        if label == self.options.background {
            return Err(ContourError::InvalidInput(format!(
                "structure label {} equals background label",
                label
            )));
        }

        let depth = volume.depth();
        let run = |z: usize| SliceOutcome {
            slice: z,
            result: volume
                .slice(z)
                .and_then(|slice| self.extract_slice(&slice, z, label)),
        };

        if !self.options.use_parallel {
            return Ok((0..depth).map(run).collect());
        }

        let num_threads = self
            .options
            .num_threads
            .unwrap_or_else(num_cpus::get)
            .clamp(1, depth.max(1));
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;

        log::debug!("Extracting label {} from {} slices on {} threads", label, depth, num_threads);

        Ok(pool.install(|| (0..depth).into_par_iter().map(run).collect()))
    }

    /// Convert one structure, failing with the lowest failing slice's error.
    ///
    /// Every failing slice is logged before the error is returned.
    pub fn extract_structure(&self, volume: &Volume<Label>, label: Label) -> Result<ContoursPerSlice> {
        let mut contours = ContoursPerSlice::new(label, self.options.level);
        let mut first_error: Option<ContourError> = None;
        let mut failed = 0usize;

        for outcome in self.extract_slices(volume, label)? {
            match outcome.result {
                Ok(polygons) => contours.insert(outcome.slice, polygons),
                Err(e) => {
                    log::error!("Label {} slice {}: {}", label, outcome.slice, e);
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        if let Some(e) = first_error {
            log::warn!("Label {}: {} slice(s) failed, structure rejected", label, failed);
            return Err(e);
        }

        log::info!(
            "Label {}: {} polygon(s) on {} slice(s)",
            label,
            contours.polygon_count(),
            contours.slice_count()
        );

        Ok(contours)
    }

    /// Convert every non-background label of the volume, keeping each label's result
    pub fn extract_all(&self, volume: &Volume<Label>) -> Vec<(Label, Result<ContoursPerSlice>)> {
        volume
            .labels_present(self.options.background)
            .into_iter()
            .map(|label| (label, self.extract_structure(volume, label)))
            .collect()
    }
}

/// Refill `polygons` and compare against the `label` pixels of `original`.
///
/// Returns the reconstructed pixel count.
pub fn verify_slice(
    index: usize,
    original: &Grid2<Label>,
    label: Label,
    polygons: &[SmoothPolygon],
    tolerance: &ReconciliationTolerance,
) -> Result<usize> {
    let original_count = original.count(label);
    let reconstructed = count_enclosed(original.width(), original.height(), polygons);

    if original_count != reconstructed {
        log::debug!(
            "Slice {}: label {} refills to {} px from {} px",
            index,
            label,
            reconstructed,
            original_count
        );
    }

    tolerance.check(index, original_count, reconstructed)?;
    Ok(reconstructed)
}

/// Rasterize one structure into a fresh volume of `dims` filled with `background`
pub fn rasterize_structure(contours: &ContoursPerSlice, dims: [usize; 3], background: Label) -> Result<Volume<Label>> {
    let mut volume = Volume::new_fill(dims, background)?;
    rasterize_into(&mut volume, contours, background)?;
    Ok(volume)
}

/// Paint one structure into an existing volume; returns the number of voxels written
pub fn rasterize_into(volume: &mut Volume<Label>, contours: &ContoursPerSlice, background: Label) -> Result<usize> {
    if contours.label == background {
        return Err(ContourError::InvalidInput(format!(
            "structure label {} equals background label",
            contours.label
        )));
    }

    let mut written = 0;
    for (z, polygons) in contours.iter() {
        if z >= volume.depth() {
            return Err(ContourError::InvalidInput(format!(
                "contour slice {} outside volume depth {}",
                z,
                volume.depth()
            )));
        }

        let mut slice = volume.slice(z)?;
        written += fill_polygons(&mut slice, polygons, contours.label);
        volume.set_slice(z, &slice)?;
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(level: SmoothingLevel, use_parallel: bool) -> ExtractionOptions {
        ExtractionOptions {
            level,
            use_parallel,
            num_threads: Some(2),
            ..ExtractionOptions::default()
        }
    }

    fn disk_slice(size: usize, radius: f64, label: Label) -> Grid2<Label> {
        let c = (size as f64 - 1.0) / 2.0;
        let data = (0..size * size)
            .map(|i| {
                let (x, y) = ((i % size) as f64, (i / size) as f64);
                if (x - c).powi(2) + (y - c).powi(2) <= radius * radius { label } else { 0 }
            })
            .collect();
        Grid2::from_vec(size, size, data).unwrap()
    }

    /// Remove every fifth pixel of `label`, in raster order
    fn corrupt(slice: &Grid2<Label>, label: Label) -> Grid2<Label> {
        let mut seen = 0;
        let data = slice
            .data()
            .iter()
            .map(|&v| {
                if v != label {
                    return v;
                }
                seen += 1;
                if seen % 5 == 0 { 0 } else { v }
            })
            .collect();
        Grid2::from_vec(slice.width(), slice.height(), data).unwrap()
    }

    fn blocks_volume() -> Volume<Label> {
        // Three 6x6 slices: a block on 0 and 1, an L-shape on 2, label 2 on slice 1
        let mut volume = Volume::new_fill([6, 6, 3], 0).unwrap();
        for z in 0..2 {
            for y in 1..4 {
                for x in 1..5 {
                    volume.set(x, y, z, 1);
                }
            }
        }
        for &(x, y) in &[(0, 0), (0, 1), (0, 2), (1, 2), (2, 2)] {
            volume.set(x, y, 2, 1);
        }
        volume.set(5, 5, 1, 2);
        volume
    }

    #[test]
    fn tolerance_needs_both_limits_exceeded() {
        let tolerance = ReconciliationTolerance::default();

        // Both exceeded
        assert!(matches!(
            tolerance.check(0, 100, 80),
            Err(ContourError::ReconciliationFailure { absolute: 20, .. })
        ));
        // Absolute only: 120 px but 12 %
        assert!(tolerance.check(0, 1000, 880).is_ok());
        // Relative only: 20 % but 4 px
        assert!(tolerance.check(0, 20, 16).is_ok());
        // Exactly at the limits is tolerated
        assert!(tolerance.check(0, 100, 110).is_ok());
    }

    #[test]
    fn empty_original_uses_unit_denominator() {
        let tolerance = ReconciliationTolerance::default();
        assert!(tolerance.check(3, 0, 12).is_err());
        assert!(tolerance.check(3, 0, 0).is_ok());
    }

    #[test]
    fn corrupted_large_region_fails_reconciliation() {
        let slice = disk_slice(40, 14.0, 1);
        let adapter = ContourVolumeAdapter::new(options(SmoothingLevel::Small, false));
        let polygons = adapter.extract_slice(&slice, 0, 1).unwrap();

        let corrupted = corrupt(&slice, 1);
        let err = verify_slice(7, &corrupted, 1, &polygons, &ReconciliationTolerance::default()).unwrap_err();
        match err {
            ContourError::ReconciliationFailure { slice, absolute, relative, .. } => {
                assert_eq!(slice, 7);
                assert!(absolute > 10);
                assert!(relative > 0.15);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn corrupted_small_region_is_tolerated() {
        // 21 pixels: a 20 % loss stays under the absolute limit
        let slice = disk_slice(9, 2.5, 1);
        let adapter = ContourVolumeAdapter::new(options(SmoothingLevel::None, false));
        let polygons = adapter.extract_slice(&slice, 0, 1).unwrap();

        let corrupted = corrupt(&slice, 1);
        let reconstructed = verify_slice(0, &corrupted, 1, &polygons, &ReconciliationTolerance::default()).unwrap();
        assert_eq!(reconstructed, slice.count(1));
    }

    #[test]
    fn none_level_rasterizes_back_exactly() {
        let volume = blocks_volume();
        let adapter = ContourVolumeAdapter::new(options(SmoothingLevel::None, true));
        let contours = adapter.extract_structure(&volume, 1).unwrap();

        assert_eq!(contours.slice_count(), 3);
        assert_eq!(contours.enclosed_pixels(), 12 + 12 + 5);

        let back = rasterize_structure(&contours, volume.dims(), 0).unwrap();
        let expected: Vec<Label> = volume.data().iter().map(|&v| if v == 1 { 1 } else { 0 }).collect();
        assert_eq!(back.data(), expected.as_slice());
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let volume = blocks_volume();
        let sequential = ContourVolumeAdapter::new(options(SmoothingLevel::Small, false))
            .extract_structure(&volume, 1)
            .unwrap();
        let parallel = ContourVolumeAdapter::new(options(SmoothingLevel::Small, true))
            .extract_structure(&volume, 1)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn outcomes_cover_every_slice() {
        let volume = blocks_volume();
        let adapter = ContourVolumeAdapter::new(options(SmoothingLevel::Small, true));
        let outcomes = adapter.extract_slices(&volume, 2).unwrap();

        let slices: Vec<usize> = outcomes.iter().map(|o| o.slice).collect();
        assert_eq!(slices, vec![0, 1, 2]);
        assert_eq!(outcomes[0].result.as_ref().unwrap().len(), 0);
        assert_eq!(outcomes[1].result.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn lowest_failing_slice_is_reported() {
        // Rings refill one pixel more than they cover; zero tolerance rejects them
        let mut volume = Volume::new_fill([3, 3, 4], 0).unwrap();
        volume.set(1, 1, 0, 1);
        for z in [1, 3] {
            for y in 0..3 {
                for x in 0..3 {
                    if (x, y) != (1, 1) {
                        volume.set(x, y, z, 1);
                    }
                }
            }
        }
        let adapter = ContourVolumeAdapter::new(ExtractionOptions {
            tolerance: ReconciliationTolerance { absolute: 0, relative: 0.0 },
            ..options(SmoothingLevel::None, true)
        });

        let outcomes = adapter.extract_slices(&volume, 1).unwrap();
        let failed: Vec<usize> = outcomes.iter().filter(|o| o.result.is_err()).map(|o| o.slice).collect();
        assert_eq!(failed, vec![1, 3]);

        let err = adapter.extract_structure(&volume, 1).unwrap_err();
        assert!(matches!(
            err,
            ContourError::ReconciliationFailure { slice: 1, original: 8, reconstructed: 9, .. }
        ));
    }

    #[test]
    fn large_level_skips_verification() {
        let volume = blocks_volume();
        let adapter = ContourVolumeAdapter::new(ExtractionOptions {
            tolerance: ReconciliationTolerance { absolute: 0, relative: 0.0 },
            ..options(SmoothingLevel::Large, false)
        });
        let contours = adapter.extract_structure(&volume, 1).unwrap();
        assert_eq!(contours.level, SmoothingLevel::Large);
        assert_eq!(contours.slice_count(), 3);
    }

    #[test]
    fn background_label_is_rejected() {
        let adapter = ContourVolumeAdapter::default();
        assert!(matches!(
            adapter.extract_slices(&blocks_volume(), 0),
            Err(ContourError::InvalidInput(_))
        ));
    }

    #[test]
    fn extract_all_keeps_each_label() {
        let adapter = ContourVolumeAdapter::new(options(SmoothingLevel::None, false));
        let results = adapter.extract_all(&blocks_volume());

        let labels: Vec<Label> = results.iter().map(|(l, _)| *l).collect();
        assert_eq!(labels, vec![1, 2]);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
    }

    #[test]
    fn rasterize_rejects_slices_outside_volume() {
        let mut contours = ContoursPerSlice::new(1, SmoothingLevel::None);
        let adapter = ContourVolumeAdapter::new(options(SmoothingLevel::None, false));
        let polygons = adapter.extract_slice(&disk_slice(5, 1.0, 1), 0, 1).unwrap();
        contours.insert(4, polygons);

        let err = rasterize_structure(&contours, [5, 5, 2], 0).unwrap_err();
        assert!(matches!(err, ContourError::InvalidInput(_)));
    }
}
