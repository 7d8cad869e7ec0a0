//! Site input records: street centerlines and buildings.

use crate::geom::Point;

/// A street centerline as a connected sequence of points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StreetLine {
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    pub points: Vec<Point>,
}

impl StreetLine {
    pub fn new(name: Option<&str>, points: Vec<Point>) -> Self {
        Self {
            name: name.map(str::to_string),
            points,
        }
    }

    /// Total polyline length.
    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(&w[1])).sum()
    }
}

/// A building to be connected, reduced to its attachment reference point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Building {
    pub id: String,
    pub centroid: Point,
    /// Design heat load (kW)
    pub design_load_kw: f64,
}

impl Building {
    pub fn new(id: impl Into<String>, centroid: Point, design_load_kw: f64) -> Self {
        Self {
            id: id.into(),
            centroid,
            design_load_kw,
        }
    }
}
