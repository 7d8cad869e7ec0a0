//! Discrete pipe size catalog.

use serde::{Deserialize, Serialize};

use crate::error::{SizingError, SizingResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub dn: u32,
    pub inner_diameter_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_m: Option<f64>,
}

/// Pre-insulated steel service/trunk series: (DN, inner diameter mm, cost per m).
const EN253_STEEL_SERIES: [(u32, f64, f64); 15] = [
    (20, 21.7, 350.0),
    (25, 28.5, 380.0),
    (32, 37.2, 420.0),
    (40, 43.1, 450.0),
    (50, 54.5, 500.0),
    (65, 70.3, 560.0),
    (80, 82.5, 620.0),
    (100, 107.1, 720.0),
    (125, 132.5, 830.0),
    (150, 160.3, 950.0),
    (200, 210.1, 1200.0),
    (250, 263.0, 1450.0),
    (300, 312.7, 1700.0),
    (350, 344.4, 1950.0),
    (400, 393.8, 2200.0),
];

/// DN increment between synthesized sizes beyond the catalog.
const SYNTHETIC_DN_STEP: u32 = 100;

/// Sizes ordered by DN with strictly increasing inner diameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<CatalogEntry>", into = "Vec<CatalogEntry>")]
pub struct PipeCatalog {
    entries: Vec<CatalogEntry>,
}

impl PipeCatalog {
    /// Validate and sort a list of entries. Gaps in the DN series are fine.
    pub fn new(mut entries: Vec<CatalogEntry>) -> SizingResult<Self> {
        if entries.is_empty() {
            return Err(SizingError::EmptyCatalog);
        }
        entries.sort_by_key(|e| e.dn);
        for e in &entries {
            if !(e.inner_diameter_m.is_finite() && e.inner_diameter_m > 0.0) {
                return Err(SizingError::InvalidEntry {
                    dn: e.dn,
                    what: "inner diameter must be positive",
                });
            }
            if let Some(c) = e.cost_per_m {
                if !(c.is_finite() && c >= 0.0) {
                    return Err(SizingError::InvalidEntry {
                        dn: e.dn,
                        what: "cost must be non-negative",
                    });
                }
            }
        }
        for w in entries.windows(2) {
            if w[0].dn == w[1].dn {
                return Err(SizingError::DuplicateDn { dn: w[1].dn });
            }
            if w[1].inner_diameter_m <= w[0].inner_diameter_m {
                return Err(SizingError::NonMonotonic {
                    prev_dn: w[0].dn,
                    dn: w[1].dn,
                });
            }
        }
        Ok(Self { entries })
    }

    /// Built-in EN 253 steel series, DN 20 to DN 400.
    pub fn en253_steel() -> Self {
        Self {
            entries: EN253_STEEL_SERIES
                .iter()
                .map(|&(dn, d_mm, cost)| CatalogEntry {
                    dn,
                    inner_diameter_m: d_mm / 1000.0,
                    cost_per_m: Some(cost),
                })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_dn(&self, dn: u32) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.dn == dn)
    }

    /// Index of the first size with DN ≥ `min_dn`.
    pub fn first_at_least(&self, min_dn: u32) -> Option<usize> {
        self.entries.iter().position(|e| e.dn >= min_dn)
    }

    pub fn largest(&self) -> &CatalogEntry {
        // non-empty by construction
        &self.entries[self.entries.len() - 1]
    }

    /// Theoretical sizes beyond the largest entry, in DN steps of 100 with
    /// diameter and cost scaled proportionally to DN.
    pub fn synthetic_sizes(&self, count: usize) -> Vec<CatalogEntry> {
        let last = *self.largest();
        let base_dn = last.dn.max(1) as f64;
        (1..=count as u32)
            .map(|k| {
                let dn = last.dn + SYNTHETIC_DN_STEP * k;
                let scale = dn as f64 / base_dn;
                CatalogEntry {
                    dn,
                    inner_diameter_m: last.inner_diameter_m * scale,
                    cost_per_m: last.cost_per_m.map(|c| c * scale),
                }
            })
            .collect()
    }
}

impl Default for PipeCatalog {
    fn default() -> Self {
        Self::en253_steel()
    }
}

impl TryFrom<Vec<CatalogEntry>> for PipeCatalog {
    type Error = SizingError;

    fn try_from(entries: Vec<CatalogEntry>) -> SizingResult<Self> {
        Self::new(entries)
    }
}

impl From<PipeCatalog> for Vec<CatalogEntry> {
    fn from(c: PipeCatalog) -> Self {
        c.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dn: u32, d: f64) -> CatalogEntry {
        CatalogEntry {
            dn,
            inner_diameter_m: d,
            cost_per_m: None,
        }
    }

    #[test]
    fn builtin_series_is_valid() {
        let c = PipeCatalog::en253_steel();
        assert!(PipeCatalog::new(c.entries().to_vec()).is_ok());
        assert_eq!(c.len(), 15);
        assert_eq!(c.largest().dn, 400);
        assert_eq!(c.first_at_least(45).map(|i| c.entries()[i].dn), Some(50));
        assert_eq!(c.first_at_least(500), None);
    }

    #[test]
    fn unsorted_input_is_sorted() {
        let c = PipeCatalog::new(vec![entry(50, 0.05), entry(25, 0.028)]).unwrap();
        assert_eq!(c.entries()[0].dn, 25);
    }

    #[test]
    fn rejects_bad_catalogs() {
        assert_eq!(PipeCatalog::new(vec![]), Err(SizingError::EmptyCatalog));
        assert_eq!(
            PipeCatalog::new(vec![entry(25, 0.03), entry(32, 0.03)]),
            Err(SizingError::NonMonotonic {
                prev_dn: 25,
                dn: 32
            })
        );
        assert_eq!(
            PipeCatalog::new(vec![entry(25, 0.03), entry(25, 0.04)]),
            Err(SizingError::DuplicateDn { dn: 25 })
        );
        assert!(matches!(
            PipeCatalog::new(vec![entry(25, -1.0)]),
            Err(SizingError::InvalidEntry { dn: 25, .. })
        ));
    }

    #[test]
    fn synthetic_sizes_continue_series() {
        let c = PipeCatalog::en253_steel();
        let extra = c.synthetic_sizes(2);
        assert_eq!(extra[0].dn, 500);
        assert_eq!(extra[1].dn, 600);
        assert!(extra[0].inner_diameter_m > c.largest().inner_diameter_m);
        assert!(extra[1].inner_diameter_m > extra[0].inner_diameter_m);
        assert!(extra[0].cost_per_m.unwrap() > 2200.0);
    }
}
