//! Locating the target date without reading the whole file.

pub mod estimator;
pub mod refiner;

pub use estimator::{date_bounds, estimate, DateBounds, Estimate, SearchWindow};
pub use refiner::{refine, FallbackReason, HotRegion, Refinement};
