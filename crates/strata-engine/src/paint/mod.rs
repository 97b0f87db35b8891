//! Paint model shared between brushes, effects and backends.
//!
//! Colors are linear and premultiplied everywhere below the public
//! constructors; backends blend with premultiplied source-over.

pub mod color;

pub use color::Color;
