//! Geospatial helpers behind the `LocationInCircle` and `LocationInPolygon`
//! predicates.
//!
//! The Earth is modelled as a sphere. Circle membership compares great-circle
//! distances in degrees of arc; polygon membership is a planar ray-casting
//! test over longitude/latitude that treats the boundary as inside.

mod geometry;

pub use geometry::*;
