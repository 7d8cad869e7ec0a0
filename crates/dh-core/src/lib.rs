//! dh-core: stable foundation for the district-heating planner.
//!
//! Contains:
//! - units (uom SI types + constructors and conversions)
//! - numeric (NaN-free ratios, mean, coefficient of variation)
//! - ids (typed junction and pipe indices)
//! - geom (planar points, snapping keys, segment projection, bounding boxes)
//! - site (street and building input records)
//! - water (design-point water properties)
//! - error (shared error types)

pub mod error;
pub mod geom;
pub mod ids;
pub mod numeric;
pub mod site;
pub mod units;
pub mod water;

// Re-exports: nice ergonomics for downstream crates
pub use error::{DhError, DhResult};
pub use geom::{BBox, NodeKey, Point, SegmentProjection};
pub use ids::*;
pub use numeric::*;
pub use site::{Building, StreetLine};
pub use water::WaterProps;
