//! Core types, markup tree, and capability traits for the sprig component loader.
//!
//! This crate provides the foundational types used across all other sprig crates:
//! - Markup tree nodes for definitions, templates, and shadow content
//! - Declaration records produced by the definition parser
//! - Script values and the injected script engine capability
//! - Error types

pub mod declaration;
pub mod errors;
pub mod markup;
pub mod script;
pub mod value;

pub use declaration::*;
pub use errors::*;
pub use markup::*;
pub use script::*;
pub use value::*;
