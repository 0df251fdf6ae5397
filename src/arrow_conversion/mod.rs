//! Conversion of result rows into Apache Arrow arrays.

pub mod builders;
pub mod converter;

pub use converter::ArrowConverter;
