//! Column type handling.

pub mod mapping;

pub use mapping::{SqlType, TypeMapper};
