//! Built-in EN 253 pre-insulated pipe data (insulation series 1).

/// (DN, reference loss W/m at 80 °C fluid / 10 °C soil)
const LOSS_W_PER_M: [(u32, f64); 15] = [
    (20, 17.0),
    (25, 19.0),
    (32, 21.5),
    (40, 22.5),
    (50, 25.0),
    (65, 28.5),
    (80, 30.0),
    (100, 33.5),
    (125, 37.5),
    (150, 41.0),
    (200, 48.0),
    (250, 52.5),
    (300, 57.0),
    (350, 60.0),
    (400, 65.0),
];

/// (DN, steel outer diameter mm, casing outer diameter mm)
const CASING_MM: [(u32, f64, f64); 15] = [
    (20, 26.9, 90.0),
    (25, 33.7, 90.0),
    (32, 42.4, 110.0),
    (40, 48.3, 110.0),
    (50, 60.3, 125.0),
    (65, 76.1, 140.0),
    (80, 88.9, 160.0),
    (100, 114.3, 200.0),
    (125, 139.7, 225.0),
    (150, 168.3, 250.0),
    (200, 219.1, 315.0),
    (250, 273.0, 400.0),
    (300, 323.9, 450.0),
    (350, 355.6, 500.0),
    (400, 406.4, 560.0),
];

pub fn reference_loss_w_per_m(dn: u32) -> Option<f64> {
    LOSS_W_PER_M
        .iter()
        .find(|(d, _)| *d == dn)
        .map(|&(_, q)| q)
}

/// Steel and casing outer diameters (m) for a catalog DN.
pub fn casing_dimensions_m(dn: u32) -> Option<(f64, f64)> {
    CASING_MM
        .iter()
        .find(|(d, _, _)| *d == dn)
        .map(|&(_, steel, casing)| (steel / 1000.0, casing / 1000.0))
}
