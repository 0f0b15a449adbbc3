//! Planar geometry for candidate polygons.
//!
//! Boxes give a cheap, boundary-inclusive overlap pre-filter; polygons carry
//! the exact area and intersection computations; the bucket grid limits which
//! box pairs are compared at all.

pub mod bbox;
pub(crate) mod grid;
pub mod polygon;

pub use bbox::Box2D;
pub use polygon::{RayTable, StarPolygon};
