//! Output Formatting
//!
//! Second pass of the save pipeline: raw marshaled markup in, indented
//! markup out.

pub mod pretty;

pub use pretty::pretty_print;
