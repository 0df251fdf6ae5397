//! Arrow-backed result frames.
//!
//! [`Frame`] is what both fetch paths return. [`FrameAccumulator`]
//! reassembles batch chunks, and [`ToTabular`] hands a frame to other
//! Arrow-based libraries.

pub mod accumulate;
pub mod inspect;
pub mod interop;
mod table;

pub use accumulate::FrameAccumulator;
pub use interop::ToTabular;
pub use table::Frame;
