use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};

use crate::errors::{ContourError, Result};
use crate::grid::{Label, Volume};
use crate::structure_set::StructureSet;
use crate::transform::VoxelTransform;

/// Represents an input label volume with its metadata
#[derive(Debug, Clone)]
pub struct InputVolume {
    pub volume: Volume<Label>,
    pub transform: VoxelTransform,
    pub path: PathBuf,
    pub filename: String,
}

/// On-disk JSON layout of a label volume
#[derive(Debug, Serialize, Deserialize)]
struct VolumeFile {
    dims: [usize; 3],
    values: Vec<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    affine: Option<VoxelTransform>,
}

/// Load a label volume from JSON; a missing affine means identity
pub fn load_volume<P: AsRef<Path>>(path: P) -> Result<InputVolume> {
    let path = path.as_ref();

    // Get filename without extension
    let filename = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| ContourError::InvalidPath(path.to_path_buf()))?
        .to_string();

    let file = fs::File::open(path)?;
    let parsed: VolumeFile = serde_json::from_reader(BufReader::new(file))?;

    let volume = Volume::from_vec(parsed.dims, parsed.values)?;
    let transform = parsed.affine.unwrap_or_default();

    log::debug!(
        "Loaded {} ({}x{}x{})",
        path.display(),
        volume.width(),
        volume.height(),
        volume.depth()
    );

    Ok(InputVolume {
        volume,
        transform,
        path: path.to_path_buf(),
        filename,
    })
}

/// Save a label volume and its affine as JSON
pub fn save_volume<P: AsRef<Path>>(volume: &Volume<Label>, transform: &VoxelTransform, path: P) -> Result<()> {
    let file = VolumeFile {
        dims: volume.dims(),
        values: volume.data().to_vec(),
        affine: Some(transform.clone()),
    };

    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut writer, &file)?;
    writer.flush()?;

    Ok(())
}

/// Load a structure set written by `output::write_structure_set`
pub fn load_structure_set<P: AsRef<Path>>(path: P) -> Result<StructureSet> {
    let file = fs::File::open(path.as_ref())?;
    let set = serde_json::from_reader(BufReader::new(file))?;
    Ok(set)
}
