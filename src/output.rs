use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use csv::Writer;

use crate::errors::{ContourError, Result};
use crate::statistics::StructureStatistics;
use crate::structure_set::StructureSet;

/// Write per-structure statistics to `<output_dir>/statistics/<filename>.csv`
pub fn write_statistics_csv<P: AsRef<Path>>(
    stats: &[StructureStatistics],
    output_dir: P,
    filename: &str,
) -> Result<()> {
    let output_path = output_dir.as_ref().join("statistics").join(format!("{}.csv", filename));

    // Create directory if it doesn't exist
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = Writer::from_path(&output_path)?;

    writer.write_record([
        "Label",
        "Voxel_Count",
        "Physical_Volume",
        "Components",
        "Largest_Component",
        "First_Slice",
        "Last_Slice",
    ])?;

    for s in stats {
        writer.write_record(&[
            s.label.to_string(),
            s.voxel_count.to_string(),
            format!("{:.6}", s.physical_volume),
            s.component_count.to_string(),
            s.largest_component.to_string(),
            s.first_slice.to_string(),
            s.last_slice.to_string(),
        ])?;
    }

    writer.flush().map_err(|e| ContourError::CsvOutput(csv::Error::from(e)))?;

    log::info!("Wrote statistics for {} structure(s) to {}", stats.len(), output_path.display());

    Ok(())
}

/// Write a structure set as pretty JSON to `<output_dir>/structures/<filename>.json`
pub fn write_structure_set<P: AsRef<Path>>(
    set: &StructureSet,
    output_dir: P,
    filename: &str,
) -> Result<()> {
    let output_path = output_dir.as_ref().join("structures").join(format!("{}.json", filename));

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut writer = BufWriter::new(fs::File::create(&output_path)?);
    serde_json::to_writer_pretty(&mut writer, set)?;
    writer.flush()?;

    log::info!(
        "Wrote {} structure(s) to {}",
        set.structures.len(),
        output_path.display()
    );

    Ok(())
}
