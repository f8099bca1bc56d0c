//! Level assembly from an authored vector document
//!
//! Document layout:
//! - root carries `viewBox` (full level extent)
//! - a `Physics` layer: paths and rects become static terrain, subgroups nest
//! - a `Meta` layer: labelled markers (spawn, screen, zones, lights, particles)
//!
//! The `screen` rect doubles as the scale calibration: its authored height
//! maps to the configured world height.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::document::Element;
use super::geometry::{ConvexShape, PhysicalProps, compile_polygon};
use super::path::{PathDecoder, parse_path_data};
use super::transform::{Transform2D, compose, view_transform};
use crate::Rect;
use crate::error::LevelError;
use crate::settings::{LevelTuning, Tuning};

pub const LAYER_PHYSICS: &str = "Physics";
pub const LAYER_META: &str = "Meta";
pub const LABEL_SCREEN: &str = "screen";
pub const LABEL_SPAWN: &str = "spawn";
pub const PREFIX_PARTICLE: &str = "part:";
pub const PREFIX_HAZARD: &str = "kill";
pub const PREFIX_GOAL: &str = "win";
pub const PREFIX_POINT_LIGHT: &str = "light";
pub const PREFIX_CONE_LIGHT: &str = "conelight";

/// Attempts before the random samplers give up
const MAX_SAMPLE_ATTEMPTS: usize = 256;

/// RGBA color, components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    /// `rrggbb` or `rrggbbaa`
    pub fn from_hex(hex: &str) -> Option<Self> {
        if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|c| u8::from_str_radix(c, 16).ok())
                .map(|v| v as f32 / 255.0)
        };
        Some(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 1.0 },
        })
    }

    /// Fill color from an inline `style` (`fill:#rrggbb;fill-opacity:0.5`).
    /// Missing style or entries leave the defaults in place.
    pub fn from_style(style: Option<&str>) -> Self {
        let mut color = Self::WHITE;
        for entry in style.unwrap_or_default().split(';').map(str::trim) {
            if let Some(hex) = entry.strip_prefix("fill:#") {
                if let Some(fill) = Self::from_hex(hex) {
                    color = fill;
                }
            } else if let Some(opacity) = entry.strip_prefix("fill-opacity:") {
                if let Ok(a) = opacity.trim().parse::<f32>() {
                    color.a = a;
                }
            }
        }
        color
    }
}

/// Particle emitter position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleAnchor {
    /// Effect type (label after `part:`)
    pub kind: String,
    pub position: Vec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointLight {
    pub name: String,
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
}

/// Spot light; angles in radians, world space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConeLight {
    pub name: String,
    pub position: Vec2,
    pub radius: f32,
    pub start_angle: f32,
    pub end_angle: f32,
    pub color: Color,
}

impl ConeLight {
    /// Direction the cone points (mid angle)
    pub fn direction(&self) -> f32 {
        (self.start_angle + self.end_angle) / 2.0
    }

    /// Half the cone's opening angle
    pub fn half_angle(&self) -> f32 {
        (self.end_angle - self.start_angle).abs() / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneKind {
    Hazard,
    Goal,
}

/// Trigger zone, world-space corners of the authored rect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub kind: ZoneKind,
    pub corners: [Vec2; 4],
}

impl Zone {
    pub fn bounds(&self) -> Rect {
        Rect::from_points(&self.corners).unwrap_or_default()
    }
}

/// Typed marker lists for the renderer and trigger logic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelMarkers {
    pub particles: Vec<ParticleAnchor>,
    pub point_lights: Vec<PointLight>,
    pub cone_lights: Vec<ConeLight>,
    pub hazard_zones: Vec<Zone>,
    pub goal_zones: Vec<Zone>,
}

impl LevelMarkers {
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.hazard_zones.iter().chain(&self.goal_zones)
    }
}

/// One immovable body: shapes are relative to `origin`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticBodyDef {
    /// Element id or label, for diagnostics
    pub name: Option<String>,
    pub origin: Vec2,
    pub shapes: Vec<ConvexShape>,
}

/// Compiled terrain of one level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelGeometry {
    pub bodies: Vec<StaticBodyDef>,
}

impl LevelGeometry {
    pub fn shape_count(&self) -> usize {
        self.bodies.iter().map(|b| b.shapes.len()).sum()
    }

    /// All shapes in world space
    pub fn world_shapes(&self) -> impl Iterator<Item = ConvexShape> + '_ {
        self.bodies
            .iter()
            .flat_map(|b| b.shapes.iter().map(move |s| s.translated(b.origin)))
    }
}

/// Level record: everything but the terrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    /// Full level extent (world units)
    pub bounds: Rect,
    /// Playable area the camera is confined to
    pub camera_bounds: Rect,
    pub spawn: Vec2,
    pub score_goal: u32,
    /// Seconds
    pub time_limit: f32,
    /// Document units to world units
    pub scale: f32,
    pub markers: LevelMarkers,
}

impl Level {
    /// Anything whose lowest point drops below this is out of the level
    pub fn lower_bound(&self) -> f32 {
        self.bounds.y
    }

    /// Random point inside the camera bounds, optionally at least
    /// `distance` away from `point`
    pub fn random_point<R: Rng>(&self, rng: &mut R, avoid: Option<(Vec2, f32)>) -> Option<Vec2> {
        let (min, max) = (self.camera_bounds.min(), self.camera_bounds.max());
        (0..MAX_SAMPLE_ATTEMPTS)
            .map(|_| {
                Vec2::new(
                    rng.random_range(min.x..=max.x),
                    rng.random_range(min.y..=max.y),
                )
            })
            .find(|p| avoid.is_none_or(|(point, distance)| p.distance(point) >= distance))
    }

    /// Random point inside the level bounds but outside the camera bounds
    pub fn random_border_point<R: Rng>(&self, rng: &mut R) -> Option<Vec2> {
        let (min, max) = (self.bounds.min(), self.bounds.max());
        (0..MAX_SAMPLE_ATTEMPTS)
            .map(|_| {
                Vec2::new(
                    rng.random_range(min.x..=max.x),
                    rng.random_range(min.y..=max.y),
                )
            })
            .find(|p| !self.camera_bounds.contains(*p))
    }
}

/// Compile a document into its level record and terrain
pub fn assemble(document: &Element, tuning: &Tuning) -> Result<(Level, LevelGeometry), LevelError> {
    let physics = document
        .child_by_label("g", LAYER_PHYSICS)
        .ok_or(LevelError::MissingLayer(LAYER_PHYSICS))?;
    let meta = document
        .child_by_label("g", LAYER_META)
        .ok_or(LevelError::MissingLayer(LAYER_META))?;

    let screen = meta
        .child_by_label("rect", LABEL_SCREEN)
        .ok_or(LevelError::MissingCalibrationMarker)?;
    let screen_height = screen.number("height")?;
    if screen_height <= 0.0 {
        return Err(LevelError::InvalidAttribute {
            tag: screen.tag.clone(),
            name: "height".to_string(),
        });
    }
    let scale = tuning.level.world_height / screen_height;

    let bounds = view_box(document)?.scaled(scale);
    let view = view_transform(scale, bounds.height);

    let geometry = LevelGeometry {
        bodies: compile_group(physics, view, &tuning.level)?,
    };

    let meta_transform = compose(view, meta);
    let spawn_rect = meta
        .child_by_label("rect", LABEL_SPAWN)
        .ok_or(LevelError::MissingSpawnMarker)?;
    let spawn = rect_center(spawn_rect, meta_transform)?;
    let camera_bounds =
        Rect::from_points(&rect_corners(screen, meta_transform)?).unwrap_or_default();
    let markers = read_markers(meta, meta_transform)?;

    log::info!(
        "Level assembled: scale {:.3}, {} bodies, {} shapes, {} hazards, {} goals, {} lights",
        scale,
        geometry.bodies.len(),
        geometry.shape_count(),
        markers.hazard_zones.len(),
        markers.goal_zones.len(),
        markers.point_lights.len() + markers.cone_lights.len(),
    );

    let level = Level {
        bounds,
        camera_bounds,
        spawn,
        score_goal: tuning.rules.score_goal,
        time_limit: tuning.rules.time_limit,
        scale,
        markers,
    };
    Ok((level, geometry))
}

fn view_box(document: &Element) -> Result<Rect, LevelError> {
    let invalid = || LevelError::InvalidAttribute {
        tag: document.tag.clone(),
        name: "viewBox".to_string(),
    };
    let values: Vec<f32> = document
        .attr("viewBox")
        .ok_or_else(invalid)?
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>().map_err(|_| invalid()))
        .collect::<Result<_, _>>()?;
    match values[..] {
        [x, y, width, height] => Ok(Rect::new(x, y, width, height)),
        _ => Err(invalid()),
    }
}

/// Walk a physics group: its paths, then rects, then subgroups
fn compile_group(
    group: &Element,
    parent: Transform2D,
    tuning: &LevelTuning,
) -> Result<Vec<StaticBodyDef>, LevelError> {
    let transform = compose(parent, group);
    let mut bodies = Vec::new();

    for path in group.children_by_tag("path") {
        bodies.extend(compile_path(path, transform, tuning)?);
    }
    for rect in group.children_by_tag("rect") {
        bodies.push(compile_rect(rect, transform, tuning)?);
    }
    for subgroup in group.children_by_tag("g") {
        bodies.extend(compile_group(subgroup, transform, tuning)?);
    }
    Ok(bodies)
}

fn compile_path(
    path: &Element,
    parent: Transform2D,
    tuning: &LevelTuning,
) -> Result<Option<StaticBodyDef>, LevelError> {
    let data = path.attr("d").ok_or_else(|| LevelError::InvalidAttribute {
        tag: path.tag.clone(),
        name: "d".to_string(),
    })?;
    let commands = parse_path_data(data)?;
    let decoded = PathDecoder::new(compose(parent, path), tuning.curve_subdivs, tuning.epsilon)
        .decode(&commands)?;

    let props = physical_props(path, tuning);
    let mut shapes = Vec::new();
    for polygon in &decoded.polygons {
        shapes.extend(compile_polygon(polygon, props, tuning.epsilon)?);
    }

    if shapes.is_empty() {
        log::warn!("path {:?} has no fillable geometry, skipped", element_name(path));
        return Ok(None);
    }
    Ok(Some(StaticBodyDef {
        name: element_name(path),
        origin: decoded.origin,
        shapes,
    }))
}

/// A rect is already convex: one box shape, no triangulation
fn compile_rect(
    rect: &Element,
    parent: Transform2D,
    tuning: &LevelTuning,
) -> Result<StaticBodyDef, LevelError> {
    let corners = rect_corners(rect, parent)?;
    let origin = corners[0];
    if origin.abs_diff_eq(corners[1], tuning.epsilon) || origin.abs_diff_eq(corners[3], tuning.epsilon)
    {
        return Err(LevelError::DegeneratePolygon(0));
    }
    let local = corners.iter().map(|c| *c - origin).collect();
    Ok(StaticBodyDef {
        name: element_name(rect),
        origin,
        shapes: vec![ConvexShape::new(local, physical_props(rect, tuning))],
    })
}

fn physical_props(element: &Element, tuning: &LevelTuning) -> PhysicalProps {
    element
        .description()
        .map_or(tuning.default_props, |desc| {
            PhysicalProps::from_annotation(desc, tuning.default_props)
        })
}

fn element_name(element: &Element) -> Option<String> {
    element
        .attr("id")
        .or_else(|| element.label())
        .map(str::to_string)
}

/// Transformed corners: `[(x, y), (x, y+h), (x+w, y+h), (x+w, y)]`
fn rect_corners(rect: &Element, parent: Transform2D) -> Result<[Vec2; 4], LevelError> {
    let t = compose(parent, rect);
    let (x, y) = (rect.number("x")?, rect.number("y")?);
    let (w, h) = (rect.number("width")?, rect.number("height")?);
    Ok([
        Vec2::new(x, y),
        Vec2::new(x, y + h),
        Vec2::new(x + w, y + h),
        Vec2::new(x + w, y),
    ]
    .map(|p| t.transform_point2(p)))
}

fn rect_center(rect: &Element, parent: Transform2D) -> Result<Vec2, LevelError> {
    let c = rect_corners(rect, parent)?;
    Ok(c[0].lerp(c[2], 0.5))
}

fn read_markers(meta: &Element, transform: Transform2D) -> Result<LevelMarkers, LevelError> {
    let mut markers = LevelMarkers::default();

    for (kind, rect) in meta.children_by_prefix("rect", PREFIX_PARTICLE) {
        markers.particles.push(ParticleAnchor {
            kind: kind.to_string(),
            position: rect_center(rect, transform)?,
        });
    }
    for (name, rect) in meta.children_by_prefix("rect", PREFIX_HAZARD) {
        markers.hazard_zones.push(Zone {
            name: name.to_string(),
            kind: ZoneKind::Hazard,
            corners: rect_corners(rect, transform)?,
        });
    }
    for (name, rect) in meta.children_by_prefix("rect", PREFIX_GOAL) {
        markers.goal_zones.push(Zone {
            name: name.to_string(),
            kind: ZoneKind::Goal,
            corners: rect_corners(rect, transform)?,
        });
    }
    for (name, circle) in meta.children_by_prefix("circle", PREFIX_POINT_LIGHT) {
        let t = compose(transform, circle);
        let center = Vec2::new(circle.number("cx")?, circle.number("cy")?);
        let radius = circle.number("r")?;
        markers.point_lights.push(PointLight {
            name: name.to_string(),
            position: t.transform_point2(center),
            radius: t.transform_vector2(Vec2::new(radius, 0.0)).x.abs(),
            color: Color::from_style(circle.attr("style")),
        });
    }
    for (name, arc) in meta.children_by_prefix("path", PREFIX_CONE_LIGHT) {
        markers.cone_lights.push(read_cone_light(name, arc, transform)?);
    }

    Ok(markers)
}

/// Arc marker (Inkscape `sodipodi:*` arc attributes). Authored angles are
/// reflected to keep pointing the same way under a mirroring transform.
fn read_cone_light(name: &str, arc: &Element, parent: Transform2D) -> Result<ConeLight, LevelError> {
    use std::f32::consts::PI;

    let t = compose(parent, arc);
    let center = Vec2::new(arc.number("sodipodi:cx")?, arc.number("sodipodi:cy")?);
    let radius = arc.number("sodipodi:rx")?;
    let mut start = arc.number("sodipodi:start")?;
    let mut end = arc.number("sodipodi:end")?;

    let handedness = t.transform_vector2(Vec2::ONE);
    if handedness.x < 0.0 {
        start = PI - start;
        end = PI - end;
    }
    if handedness.y < 0.0 {
        start = -start;
        end = -end;
    }

    Ok(ConeLight {
        name: name.to_string(),
        position: t.transform_point2(center),
        radius: t.transform_vector2(Vec2::new(radius, 0.0)).x.abs(),
        start_angle: start,
        end_angle: end,
        color: Color::from_style(arc.attr("style")),
    })
}
