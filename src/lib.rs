// src/lib.rs - Library interface for mask/contour conversion

pub mod components;
pub mod config;
pub mod debug_render;
pub mod errors;
pub mod filler;
pub mod grid;
pub mod image_io;
pub mod output;
pub mod polygon;
pub mod smoother;
pub mod statistics;
pub mod structure_set;
pub mod tracer;
pub mod transform;
pub mod union_find;
pub mod volume;

// Re-export commonly used types and functions
pub use errors::{ContourError, Result};
pub use config::Config;
pub use grid::{Grid2, Label, Point2F, Point2I, Volume};
pub use polygon::{Polygon, RawPolygon, SmoothPolygon};
pub use image_io::{load_volume, save_volume, load_structure_set, InputVolume};
pub use transform::VoxelTransform;

// Per-slice conversion
pub use tracer::trace_slice;
pub use smoother::{smooth, smooth_all, LargeSmoothingParams, SmoothingLevel};
pub use filler::{count_enclosed, fill_polygons, fill_raw_polygons};

// Volume conversion and verification
pub use volume::{
    rasterize_into,
    rasterize_structure,
    verify_slice,
    ContourVolumeAdapter,
    ContoursPerSlice,
    ExtractionOptions,
    ReconciliationTolerance,
    SliceOutcome,
};

// Structure sets and statistics
pub use structure_set::{
    from_structure_record,
    to_structure_record,
    ContourType,
    StoredContour,
    StructureRecord,
    StructureSet,
};
pub use components::{label_components, ComponentLabeling, ComponentRecord};
pub use statistics::{structure_statistics, StructureStatistics};
