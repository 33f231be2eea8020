//! Utility modules

pub mod similarity;
pub mod validation;

pub use similarity::*;
pub use validation::*;
