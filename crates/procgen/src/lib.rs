//! Procedural geometry: noise heightfields, terrain meshes and surfaces of revolution.

pub mod heightfield;
pub mod revolve;
pub mod terrain;

pub use heightfield::*;
pub use revolve::*;
pub use terrain::*;
