// src/statistics.rs - Per-structure summaries built on connected-component labelling

use serde::Serialize;
use std::collections::BTreeMap;

use crate::components::label_components;
use crate::errors::Result;
use crate::grid::{Label, Volume};
use crate::transform::VoxelTransform;

/// Summary of one label of a volume
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureStatistics {
    pub label: Label,
    pub voxel_count: usize,
    /// Voxel count times the physical voxel volume
    pub physical_volume: f64,
    /// Face-connected pieces the label falls apart into
    pub component_count: usize,
    pub largest_component: usize,
    pub first_slice: usize,
    pub last_slice: usize,
}

impl StructureStatistics {
    pub fn is_fragmented(&self) -> bool {
        self.component_count > 1
    }

    pub fn slice_span(&self) -> usize {
        self.last_slice - self.first_slice + 1
    }
}

/// Statistics for every non-background label, in ascending label order
pub fn structure_statistics(
    volume: &Volume<Label>,
    background: Label,
    transform: &VoxelTransform,
) -> Result<Vec<StructureStatistics>> {
    let labeling = label_components(volume, background)?;
    let plane = volume.width() * volume.height();
    let voxel_volume = transform.voxel_volume();

    let mut by_label: BTreeMap<Label, StructureStatistics> = BTreeMap::new();

    for component in &labeling.components {
        let entry = by_label.entry(component.label).or_insert_with(|| StructureStatistics {
            label: component.label,
            voxel_count: 0,
            physical_volume: 0.0,
            component_count: 0,
            largest_component: 0,
            first_slice: usize::MAX,
            last_slice: 0,
        });
        entry.voxel_count += component.voxel_count;
        entry.component_count += 1;
        entry.largest_component = entry.largest_component.max(component.voxel_count);
    }

    for (idx, &value) in volume.data().iter().enumerate() {
        if value == background {
            continue;
        }
        if let Some(entry) = by_label.get_mut(&value) {
            let z = idx / plane;
            entry.first_slice = entry.first_slice.min(z);
            entry.last_slice = entry.last_slice.max(z);
        }
    }

    let stats: Vec<StructureStatistics> = by_label
        .into_values()
        .map(|mut s| {
            s.physical_volume = s.voxel_count as f64 * voxel_volume;
            s
        })
        .collect();

    for s in stats.iter().filter(|s| s.is_fragmented()) {
        log::info!("Label {} is split into {} components", s.label, s.component_count);
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn summarises_each_label() {
        // Label 1: two pieces on slices 0 and 2; label 3: one voxel on slice 1
        let mut volume = Volume::new_fill([4, 4, 3], 0).unwrap();
        volume.set(0, 0, 0, 1);
        volume.set(1, 0, 0, 1);
        volume.set(3, 3, 2, 1);
        volume.set(2, 2, 1, 3);

        let transform = VoxelTransform::from_spacing_origin([1.0, 1.0, 2.5], [0.0; 3]).unwrap();
        let stats = structure_statistics(&volume, 0, &transform).unwrap();

        assert_eq!(stats.len(), 2);
        let first = &stats[0];
        assert_eq!(first.label, 1);
        assert_eq!(first.voxel_count, 3);
        assert_eq!(first.component_count, 2);
        assert_eq!(first.largest_component, 2);
        assert_eq!((first.first_slice, first.last_slice), (0, 2));
        assert_eq!(first.slice_span(), 3);
        assert!(first.is_fragmented());
        assert_approx_eq!(first.physical_volume, 7.5);

        assert_eq!(stats[1].label, 3);
        assert!(!stats[1].is_fragmented());
    }

    #[test]
    fn empty_volume_has_no_statistics() {
        let volume = Volume::new_fill([2, 2, 2], 5).unwrap();
        let stats = structure_statistics(&volume, 5, &VoxelTransform::identity()).unwrap();
        assert!(stats.is_empty());
    }
}
