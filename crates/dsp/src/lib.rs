pub mod geometry;
pub mod power;

pub use geometry::BandGeometry;
pub use power::{rms_power, Power};
