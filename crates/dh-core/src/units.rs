//! Canonical SI quantity types and unit constructors.

use uom::si::f64::{
    Length as UomLength, MassRate as UomMassRate, Power as UomPower, Pressure as UomPressure,
    ThermodynamicTemperature as UomThermodynamicTemperature, Velocity as UomVelocity,
};

// Public canonical unit types (SI, f64)
pub type Length = UomLength;
pub type MassRate = UomMassRate;
pub type Power = UomPower;
pub type Pressure = UomPressure;
pub type Temperature = UomThermodynamicTemperature;
pub type Velocity = UomVelocity;

#[inline]
pub fn pa(v: f64) -> Pressure {
    use uom::si::pressure::pascal;
    Pressure::new::<pascal>(v)
}

#[inline]
pub fn bar(v: f64) -> Pressure {
    use uom::si::pressure::bar;
    Pressure::new::<bar>(v)
}

#[inline]
pub fn k(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::kelvin;
    Temperature::new::<kelvin>(v)
}

#[inline]
pub fn celsius(v: f64) -> Temperature {
    use uom::si::thermodynamic_temperature::degree_celsius;
    Temperature::new::<degree_celsius>(v)
}

#[inline]
pub fn kgps(v: f64) -> MassRate {
    use uom::si::mass_rate::kilogram_per_second;
    MassRate::new::<kilogram_per_second>(v)
}

#[inline]
pub fn kw(v: f64) -> Power {
    use uom::si::power::kilowatt;
    Power::new::<kilowatt>(v)
}

#[inline]
pub fn w(v: f64) -> Power {
    use uom::si::power::watt;
    Power::new::<watt>(v)
}

#[inline]
pub fn mps(v: f64) -> Velocity {
    use uom::si::velocity::meter_per_second;
    Velocity::new::<meter_per_second>(v)
}

#[inline]
pub fn m(v: f64) -> Length {
    use uom::si::length::meter;
    Length::new::<meter>(v)
}

#[inline]
pub fn mm(v: f64) -> Length {
    use uom::si::length::millimeter;
    Length::new::<millimeter>(v)
}

/// Pressure in bar expressed in pascal.
#[inline]
pub fn bar_to_pa(v: f64) -> f64 {
    use uom::si::pressure::pascal;
    bar(v).get::<pascal>()
}

/// Pressure in pascal expressed in bar.
#[inline]
pub fn pa_to_bar(v: f64) -> f64 {
    use uom::si::pressure::bar;
    pa(v).get::<bar>()
}

/// Temperature in degrees Celsius expressed in kelvin.
#[inline]
pub fn celsius_to_kelvin(v: f64) -> f64 {
    use uom::si::thermodynamic_temperature::kelvin;
    celsius(v).get::<kelvin>()
}

/// Temperature in kelvin expressed in degrees Celsius.
#[inline]
pub fn kelvin_to_celsius(v: f64) -> f64 {
    use uom::si::thermodynamic_temperature::degree_celsius;
    k(v).get::<degree_celsius>()
}

/// Power in watt expressed in kilowatt.
#[inline]
pub fn w_to_kw(v: f64) -> f64 {
    use uom::si::power::kilowatt;
    w(v).get::<kilowatt>()
}

/// Power in kilowatt expressed in watt.
#[inline]
pub fn kw_to_w(v: f64) -> f64 {
    use uom::si::power::watt;
    kw(v).get::<watt>()
}
