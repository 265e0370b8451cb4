pub mod models;

pub use models::price_record::{PriceRecord, RecordKey};
pub use models::selection::{format_dimension, Dimensions, Orientation, ProductSelection};
