//! Pure raster transformations shared by every front end.
//!
//! Everything in here operates on in-memory RGBA buffers and nothing else:
//! no capture provenance, no session state, no I/O. Each transformation
//! returns a new raster; inputs are never mutated.

pub mod crop;
pub mod png;
pub mod preprocess;
pub mod stack;

pub use crop::{crop, SelectionArea};
pub use preprocess::{preprocess, PreprocessOptions};
pub use stack::{stack, MIN_STACK_INPUTS};
