//! Level compiler
//!
//! Runs once per level load. Turns an authored vector document into:
//! - a `Level` record (bounds, camera, spawn, rules, markers)
//! - a `LevelGeometry` of static bodies made of convex shapes
//!
//! Nothing in here touches the physics engine except `registry`, which
//! instantiates a compiled `LevelGeometry` and tears it down again.

pub mod assembler;
pub mod document;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod geometry;
pub mod path;
pub mod registry;
pub mod transform;

pub use assembler::{
    Color, ConeLight, Level, LevelGeometry, LevelMarkers, ParticleAnchor, PointLight,
    StaticBodyDef, Zone, ZoneKind, assemble,
};
pub use document::Element;
pub use geometry::{ConvexShape, PhysicalProps, Polygon, compile_polygon, triangulate};
pub use path::{Coords, DecodedPath, PathCommand, PathDecoder, parse_path_data};
pub use registry::StaticBodyRegistry;
pub use transform::{Transform2D, element_transform, parse_transform_list, view_transform};
