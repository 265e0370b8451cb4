use serde::{Deserialize, Serialize};
use std::fmt;

/// Print orientation derived from the physical dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Horizontal,
    Vertical,
    Square,
}

impl Orientation {
    pub fn as_token(&self) -> &'static str {
        match self {
            Orientation::Horizontal => "horizontal",
            Orientation::Vertical => "vertical",
            Orientation::Square => "square",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token())
    }
}

/// Physical print size in inches
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Both sides must be finite and strictly positive
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn orientation(&self) -> Orientation {
        if self.width > self.height {
            Orientation::Horizontal
        } else if self.height > self.width {
            Orientation::Vertical
        } else {
            Orientation::Square
        }
    }

    /// Label used as the size component of a price record key, e.g. `8x10`
    pub fn size_label(&self) -> String {
        format!("{}x{}", format_dimension(self.width), format_dimension(self.height))
    }

    pub fn manhattan_distance(&self, other: &Dimensions) -> f64 {
        (self.width - other.width).abs() + (self.height - other.height).abs()
    }
}

/// Formats a dimension without trailing zeros (`8.0` -> `8`, `8.50` -> `8.5`)
pub fn format_dimension(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// An abstract print-product selection as submitted by a caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSelection {
    pub product_line_id: String,
    /// One choice per configured option level, in level order
    #[serde(default)]
    pub choices: Vec<String>,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

fn default_quantity() -> u32 {
    1
}

impl ProductSelection {
    pub fn new(
        product_line_id: impl Into<String>,
        choices: Vec<String>,
        width: f64,
        height: f64,
        quantity: u32,
    ) -> Self {
        Self {
            product_line_id: product_line_id.into(),
            choices,
            width,
            height,
            quantity,
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}
