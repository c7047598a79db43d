#![warn(missing_docs)]

//! bracket — parametric PSU mounting bracket generator.
//!
//! Turns a handful of design parameters into a single watertight solid: a
//! U channel that cradles a power supply, with a screw ear along each top
//! edge, optional stiffening ribs under the ears and optional key-slot
//! holes. The result exports to STL or 3MF for printing.
//!
//! # Example
//!
//! ```rust,no_run
//! use bracket::{build_mesh, export, BracketParams, Engine, EngineConfig};
//!
//! let engine = Engine::init(EngineConfig::default()).unwrap();
//! let params = BracketParams {
//!     width: 120.0,
//!     key_hole: true,
//!     ..BracketParams::default()
//! };
//! let (_solid, mesh) = build_mesh(&engine, &params.validate().unwrap()).unwrap();
//! let name = export::file_name(&params, export::Format::Stl);
//! export::write(&mesh, export::Format::Stl, &params, name).unwrap();
//! ```

pub mod builder;
pub mod export;
pub mod layout;
pub mod params;
pub mod plate;
pub mod shapes;
pub mod spacing;

pub use bracket_kernel::{BoundingBox, Engine, EngineConfig, KernelError, Solid, TriangleMesh};
pub use builder::{build, build_mesh, build_parts, build_validated, BracketParts, BuildError};
pub use params::{BracketParams, Dimensions, ParamError, RawParams, ValidParams, FIELDS};
pub use plate::PlateSize;
