//! Mesh entities of a local partition.
//!
//! - [`cell_type`]: element shapes and the type-tag registry
//! - [`element`]: node and element values addressed by local index

pub mod cell_type;
pub mod element;

pub use cell_type::{CellType, DefaultElementTypes, ElementTypeRegistry};
pub use element::{Element, Node};
