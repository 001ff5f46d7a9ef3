// src/components.rs - 6-connected component labelling of label volumes

use serde::Serialize;

use crate::errors::{ContourError, Result};
use crate::grid::{Label, Volume};
use crate::union_find::UnionFind;

/// One connected component found by `label_components`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentRecord {
    pub id: Label,
    /// Label value the component carried in the source volume
    pub label: Label,
    pub voxel_count: usize,
}

/// Component id volume plus one record per component, in ascending id order
#[derive(Debug, Clone)]
pub struct ComponentLabeling {
    pub ids: Volume<Label>,
    pub components: Vec<ComponentRecord>,
}

impl ComponentLabeling {
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn get(&self, id: Label) -> Option<&ComponentRecord> {
        self.components
            .binary_search_by_key(&id, |c| c.id)
            .ok()
            .map(|i| &self.components[i])
    }
}

/// Label face-connected runs of equal non-background values with distinct ids
pub fn label_components(volume: &Volume<Label>, background: Label) -> Result<ComponentLabeling> {
    label_components_with_limit(volume, background, Label::MAX)
}

/// Same as `label_components` with ids restricted to `1..=max_id`.
///
/// Background voxels keep `background` in the output and that value is never issued
/// as a component id.
pub fn label_components_with_limit(
    volume: &Volume<Label>,
    background: Label,
    max_id: Label,
) -> Result<ComponentLabeling> {
    let [width, height, depth] = volume.dims();
    let plane = width * height;
    let data = volume.data();
    let mut forest = UnionFind::new(volume.len());

    // Forward scan: west, north and up neighbours are already visited
    for z in 0..depth {
        for y in 0..height {
            for x in 0..width {
                let idx = volume.index(x, y, z);
                let value = data[idx];
                if value == background {
                    continue;
                }
                forest.set_label(idx, value);

                if x > 0 && data[idx - 1] == value {
                    forest.union(idx - 1, idx);
                }
                if y > 0 && data[idx - width] == value {
                    forest.union(idx - width, idx);
                }
                if z > 0 && data[idx - plane] == value {
                    forest.union(idx - plane, idx);
                }
            }
        }
    }

    let mut ids = Volume::new_fill(volume.dims(), background)?;
    let mut root_slot: Vec<Option<usize>> = vec![None; volume.len()];
    let mut components: Vec<ComponentRecord> = Vec::new();
    let mut next_id: u32 = 1;

    for idx in 0..volume.len() {
        let value = data[idx];
        if value == background {
            continue;
        }

        let root = forest.find(idx);
        let slot = match root_slot[root] {
            Some(slot) => slot,
            None => {
                if next_id == background as u32 {
                    next_id += 1;
                }
                if next_id > max_id as u32 {
                    return Err(ContourError::ComponentOverflow { limit: max_id as u32 });
                }
                components.push(ComponentRecord {
                    id: next_id as Label,
                    label: forest.label(root).unwrap_or(value),
                    voxel_count: 0,
                });
                next_id += 1;
                root_slot[root] = Some(components.len() - 1);
                components.len() - 1
            }
        };

        components[slot].voxel_count += 1;
        ids.data_mut()[idx] = components[slot].id;
    }

    log::debug!(
        "Labelled {} components in {}x{}x{} volume",
        components.len(),
        width,
        height,
        depth
    );

    Ok(ComponentLabeling { ids, components })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn volume(dims: [usize; 3], data: &[Label]) -> Volume<Label> {
        Volume::from_vec(dims, data.to_vec()).unwrap()
    }

    #[test]
    fn corner_touching_blobs_stay_separate() {
        // 5-voxel plus and 9-voxel square, touching only diagonally
        let mut data = vec![0u16; 8 * 8];
        for &(x, y) in &[(1, 0), (0, 1), (1, 1), (2, 1), (1, 2)] {
            data[y * 8 + x] = 1;
        }
        for y in 2..5 {
            for x in 3..6 {
                data[y * 8 + x] = 1;
            }
        }
        let labeling = label_components(&volume([8, 8, 1], &data), 0).unwrap();

        let mut counts: Vec<usize> = labeling.components.iter().map(|c| c.voxel_count).collect();
        counts.sort_unstable();
        assert_eq!(counts, vec![5, 9]);
        assert!(labeling.components.iter().all(|c| c.label == 1));
    }

    #[test]
    fn different_labels_never_merge() {
        let labeling = label_components(&volume([4, 1, 1], &[1, 1, 2, 2]), 0).unwrap();
        assert_eq!(labeling.len(), 2);
        assert_eq!(labeling.get(1).map(|c| c.label), Some(1));
        assert_eq!(labeling.get(2).map(|c| c.label), Some(2));
        assert_eq!(labeling.ids.data(), &[1, 1, 2, 2]);
    }

    #[test]
    fn slices_join_through_faces() {
        // Same pixel on two slices joins; diagonal across slices does not
        let data = [1, 0, 0, 0, 1, 0, 0, 1];
        let labeling = label_components(&volume([2, 2, 2], &data), 0).unwrap();
        assert_eq!(labeling.len(), 2);
        assert_eq!(labeling.get(1).unwrap().voxel_count, 2);
        assert_eq!(labeling.get(2).unwrap().voxel_count, 1);
    }

    #[test]
    fn u_shape_merges_late() {
        // Arms only meet on the bottom row
        let data = [1, 0, 1, 1, 0, 1, 1, 1, 1];
        let labeling = label_components(&volume([3, 3, 1], &data), 0).unwrap();
        assert_eq!(labeling.len(), 1);
        assert_eq!(labeling.components[0].voxel_count, 7);
    }

    #[test]
    fn ids_skip_reserved_background() {
        let labeling = label_components(&volume([5, 1, 1], &[3, 1, 3, 1, 3]), 1).unwrap();
        let ids: Vec<Label> = labeling.components.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 4]);
        assert_eq!(labeling.ids.data(), &[2, 1, 3, 1, 4]);
    }

    #[test]
    fn too_many_components_overflow() {
        let err = label_components_with_limit(&volume([5, 1, 1], &[1, 0, 1, 0, 1]), 0, 2)
            .unwrap_err();
        assert!(matches!(err, ContourError::ComponentOverflow { limit: 2 }));
    }

    #[test]
    fn empty_volume_has_no_components() {
        let labeling = label_components(&volume([3, 3, 1], &[0; 9]), 0).unwrap();
        assert!(labeling.is_empty());
    }
}
