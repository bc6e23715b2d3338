//! Platform-independent transcendentals.
//!
//! Generation code must produce identical values on every machine, so sine,
//! cosine and friends are routed through `libm` instead of the platform
//! math library.

/// `π` as `f64`.
pub const PI: f64 = std::f64::consts::PI;

/// `2π` as `f64`.
pub const TWO_PI: f64 = PI * 2.0;

/// Deterministic sine.
#[must_use]
pub fn sin(value: f64) -> f64 {
    libm::sin(value)
}

/// Deterministic cosine.
#[must_use]
pub fn cos(value: f64) -> f64 {
    libm::cos(value)
}

/// Deterministic single precision sine.
#[must_use]
pub fn sinf(value: f32) -> f32 {
    libm::sinf(value)
}

/// Deterministic single precision cosine.
#[must_use]
pub fn cosf(value: f32) -> f32 {
    libm::cosf(value)
}

/// Deterministic two-argument arctangent.
#[must_use]
pub fn atan2(y: f64, x: f64) -> f64 {
    libm::atan2(y, x)
}

/// Deterministic power function.
#[must_use]
pub fn pow(base: f64, exponent: f64) -> f64 {
    libm::pow(base, exponent)
}

/// Maps `x` on a world of circumference `width` onto a circle of the same
/// circumference, returning the two planar coordinates.
///
/// Sampling noise along this circle makes the result continuous across the
/// horizontal seam.
#[must_use]
pub fn wrap_to_circle(x: f64, width: f64) -> (f64, f64) {
    if width <= 0.0 {
        return (x, 0.0);
    }
    let angle = x / width * TWO_PI;
    let radius = width / TWO_PI;
    (cos(angle) * radius, sin(angle) * radius)
}

/// Linear interpolation between `a` and `b`.
#[must_use]
pub fn lerp(t: f32, a: f32, b: f32) -> f32 {
    a + (b - a) * t
}
