//! Polygon decomposition into physics-ready convex shapes
//!
//! Physics engines only accept convex fixtures, so every closed polygon is
//! split into triangles by earcut. A triangle with coincident corners aborts
//! compilation.

use earcutr::earcut;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::cross;
use crate::error::LevelError;

/// Annotation key carrying `density,friction,restitution`
const PROPS_KEY: &str = "fp:";

/// Per-fixture material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProps {
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicalProps {
    fn default() -> Self {
        Self {
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
        }
    }
}

impl PhysicalProps {
    pub fn new(density: f32, friction: f32, restitution: f32) -> Self {
        Self {
            density,
            friction,
            restitution,
        }
    }

    /// Read `fp:d,f,r` tokens from a `;`-separated annotation.
    ///
    /// Unknown keys and malformed tokens are skipped; the last valid `fp:`
    /// token wins.
    pub fn from_annotation(annotation: &str, defaults: PhysicalProps) -> Self {
        let mut props = defaults;
        for token in annotation.split(';').map(str::trim) {
            let Some(values) = token.strip_prefix(PROPS_KEY) else {
                continue;
            };
            let parsed: Option<Vec<f32>> = values
                .split(',')
                .map(|v| v.trim().parse::<f32>().ok())
                .collect();
            match parsed.as_deref() {
                Some(&[density, friction, restitution]) => {
                    props = Self::new(density, friction, restitution);
                }
                _ => log::debug!("skipping malformed physics annotation {token:?}"),
            }
        }
        props
    }
}

/// Closed polygon: first point equals last, at least three distinct
/// points, no zero-length edges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Vec2>,
}

impl Polygon {
    /// Normalize a point list into a closed polygon.
    ///
    /// Consecutive points within `epsilon` are merged and the ring is
    /// closed. Returns `None` if fewer than three distinct points remain.
    pub fn new(points: &[Vec2], epsilon: f32) -> Option<Self> {
        let mut ring: Vec<Vec2> = Vec::with_capacity(points.len() + 1);
        for &p in points {
            if ring.last().is_none_or(|last| !last.abs_diff_eq(p, epsilon)) {
                ring.push(p);
            }
        }
        // Drop a trailing closing point; re-added below
        while ring.len() > 1 && ring[ring.len() - 1].abs_diff_eq(ring[0], epsilon) {
            ring.pop();
        }
        if ring.len() < 3 {
            return None;
        }
        ring.push(ring[0]);
        Some(Self { points: ring })
    }

    /// All points including the closing duplicate
    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Distinct vertices (closing duplicate removed)
    pub fn vertices(&self) -> &[Vec2] {
        &self.points[..self.points.len() - 1]
    }

    /// Shoelace area; positive for counter-clockwise rings
    pub fn signed_area(&self) -> f32 {
        signed_area(self.vertices())
    }

    pub fn area(&self) -> f32 {
        self.signed_area().abs()
    }
}

/// A convex fixture in body-local coordinates, counter-clockwise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexShape {
    pub vertices: Vec<Vec2>,
    pub props: PhysicalProps,
}

impl ConvexShape {
    /// Build from convex points in either winding
    pub fn new(mut vertices: Vec<Vec2>, props: PhysicalProps) -> Self {
        if signed_area(&vertices) < 0.0 {
            vertices.reverse();
        }
        Self { vertices, props }
    }

    pub fn area(&self) -> f32 {
        signed_area(&self.vertices).abs()
    }

    /// Same shape moved by `offset`
    pub fn translated(&self, offset: Vec2) -> Self {
        Self {
            vertices: self.vertices.iter().map(|v| *v + offset).collect(),
            props: self.props,
        }
    }
}

fn signed_area(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| vertices[i].perp_dot(vertices[(i + 1) % n]))
        .sum::<f32>()
        / 2.0
}

/// Triangulate a simple polygon (either winding) with earcut.
///
/// Returns triangles as indices into `vertices`, each counter-clockwise.
/// Collinear runs produce no triangles.
pub fn triangulate(vertices: &[Vec2]) -> Result<Vec<[usize; 3]>, LevelError> {
    if vertices.len() < 3 {
        return Ok(Vec::new());
    }
    let coords: Vec<f64> = vertices
        .iter()
        .flat_map(|v| [f64::from(v.x), f64::from(v.y)])
        .collect();
    let indices = earcut(&coords, &[], 2)
        .map_err(|_| LevelError::Untriangulable(vertices.len()))?;
    if indices.len() % 3 != 0 {
        return Err(LevelError::Untriangulable(vertices.len()));
    }

    Ok(indices
        .chunks_exact(3)
        .map(|t| {
            let (a, b, c) = (t[0], t[1], t[2]);
            if cross(vertices[a], vertices[b], vertices[c]) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect())
}

/// Triangulate a closed polygon into convex shapes sharing `props`.
///
/// Fails with `DegeneratePolygon(i)` on the first triangle `i` that has two
/// corners within `epsilon` of each other, or `Untriangulable` if earcut
/// rejects the ring.
pub fn compile_polygon(
    polygon: &Polygon,
    props: PhysicalProps,
    epsilon: f32,
) -> Result<Vec<ConvexShape>, LevelError> {
    let vertices = polygon.vertices();
    compile_triangles(vertices, &triangulate(vertices)?, props, epsilon)
}

/// Turn an index list into shapes, rejecting degenerate triangles
pub fn compile_triangles(
    vertices: &[Vec2],
    triangles: &[[usize; 3]],
    props: PhysicalProps,
    epsilon: f32,
) -> Result<Vec<ConvexShape>, LevelError> {
    triangles
        .iter()
        .enumerate()
        .map(|(i, &[a, b, c])| {
            let (pa, pb, pc) = (vertices[a], vertices[b], vertices[c]);
            if pa.abs_diff_eq(pb, epsilon)
                || pb.abs_diff_eq(pc, epsilon)
                || pc.abs_diff_eq(pa, epsilon)
            {
                return Err(LevelError::DegeneratePolygon(i));
            }
            Ok(ConvexShape::new(vec![pa, pb, pc], props))
        })
        .collect()
}
