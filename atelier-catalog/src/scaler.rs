use atelier_shared::Dimensions;

/// Exponent applied to the area ratio when pricing an unlisted size
pub const DEFAULT_SCALING_EXPONENT: f64 = 0.7;

/// Scales a base price to a size that has no record of its own
#[derive(Debug, Clone, Copy)]
pub struct SizeScaler {
    exponent: f64,
}

impl SizeScaler {
    pub fn new(exponent: f64) -> Self {
        Self { exponent }
    }

    /// `None` unless the exponent is finite and positive
    pub fn checked(exponent: f64) -> Option<Self> {
        (exponent.is_finite() && exponent > 0.0).then(|| Self::new(exponent))
    }

    pub fn exponent(&self) -> f64 {
        self.exponent
    }

    pub fn area_ratio(base: &Dimensions, target: &Dimensions) -> f64 {
        target.area() / base.area()
    }

    /// `base_price * (target_area / base_area) ^ exponent`
    pub fn scale(&self, base_price: f64, base: &Dimensions, target: &Dimensions) -> f64 {
        base_price * Self::area_ratio(base, target).powf(self.exponent)
    }
}

impl Default for SizeScaler {
    fn default() -> Self {
        Self::new(DEFAULT_SCALING_EXPONENT)
    }
}
