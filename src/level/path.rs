//! Vector path decoding
//!
//! Two stages:
//! - `parse_path_data` tokenizes an SVG `d` attribute into `PathCommand`s
//! - `PathDecoder` walks the commands and produces closed `Polygon`s in
//!   world space, relative to the path's first move point
//!
//! Relative commands accumulate in untransformed local space; each
//! resulting absolute point is then pushed through the active transform.
//! Arcs are not flattened: only their endpoint is kept.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::Polygon;
use super::transform::Transform2D;
use crate::error::LevelError;

/// Whether a command's coordinates are absolute or relative to the
/// current point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coords {
    Absolute,
    Relative,
}

/// A single path command
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo {
        coords: Coords,
        to: Vec2,
    },
    LineTo {
        coords: Coords,
        to: Vec2,
    },
    CubicCurveTo {
        coords: Coords,
        c1: Vec2,
        c2: Vec2,
        to: Vec2,
    },
    ArcTo {
        coords: Coords,
        radii: Vec2,
        /// x-axis rotation (degrees)
        rotation: f32,
        large_arc: bool,
        sweep: bool,
        to: Vec2,
    },
    ClosePath,
}

/// Polygons of one path element, relative to `origin`
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPath {
    /// World position of the path's first move point
    pub origin: Vec2,
    pub polygons: Vec<Polygon>,
}

/// Turns a command stream into closed polygons
#[derive(Debug)]
pub struct PathDecoder {
    transform: Transform2D,
    subdivs: f32,
    epsilon: f32,
    /// Current point, untransformed
    location: Vec2,
    /// Start of the current subpath, untransformed
    subpath_start: Vec2,
    /// Transformed start of the open subpath, `None` when closed
    start: Option<Vec2>,
    origin: Option<Vec2>,
    points: Vec<Vec2>,
    polygons: Vec<Polygon>,
}

impl PathDecoder {
    pub fn new(transform: Transform2D, subdivs: f32, epsilon: f32) -> Self {
        Self {
            transform,
            subdivs,
            epsilon,
            location: Vec2::ZERO,
            subpath_start: Vec2::ZERO,
            start: None,
            origin: None,
            points: Vec::new(),
            polygons: Vec::new(),
        }
    }

    /// Decode a whole command stream
    pub fn decode(mut self, commands: &[PathCommand]) -> Result<DecodedPath, LevelError> {
        for (index, command) in commands.iter().enumerate() {
            self.apply(index, command)?;
        }
        Ok(self.finish())
    }

    fn apply(&mut self, index: usize, command: &PathCommand) -> Result<(), LevelError> {
        match *command {
            PathCommand::MoveTo { coords, to } => {
                if self.start.is_some() {
                    self.close_subpath();
                }
                self.location = self.resolve(coords, to);
                self.subpath_start = self.location;
                let p = self.transform.transform_point2(self.location);
                self.start = Some(p);
                self.points.clear();
                self.points.push(p);
                self.origin.get_or_insert(p);
            }
            PathCommand::LineTo { coords, to } => {
                self.ensure_subpath(index)?;
                self.location = self.resolve(coords, to);
                self.points.push(self.transform.transform_point2(self.location));
            }
            PathCommand::CubicCurveTo { coords, c1, c2, to } => {
                self.ensure_subpath(index)?;
                let base = self.base(coords);
                let p0 = self.transform.transform_point2(self.location);
                let p1 = self.transform.transform_point2(base + c1);
                let p2 = self.transform.transform_point2(base + c2);
                let p3 = self.transform.transform_point2(base + to);
                self.location = base + to;
                self.flatten_cubic(p0, p1, p2, p3);
            }
            PathCommand::ArcTo { coords, to, .. } => {
                self.ensure_subpath(index)?;
                self.location = self.resolve(coords, to);
                self.points.push(self.transform.transform_point2(self.location));
            }
            PathCommand::ClosePath => {
                if self.origin.is_none() {
                    return Err(LevelError::MalformedPath { command: index });
                }
                if self.start.is_some() {
                    self.close_subpath();
                }
                self.location = self.subpath_start;
            }
        }
        Ok(())
    }

    fn base(&self, coords: Coords) -> Vec2 {
        match coords {
            Coords::Absolute => Vec2::ZERO,
            Coords::Relative => self.location,
        }
    }

    fn resolve(&self, coords: Coords, to: Vec2) -> Vec2 {
        self.base(coords) + to
    }

    /// Drawing needs a subpath. After a close, drawing resumes at the
    /// previous subpath's start.
    fn ensure_subpath(&mut self, index: usize) -> Result<(), LevelError> {
        if self.origin.is_none() {
            return Err(LevelError::MalformedPath { command: index });
        }
        if self.start.is_none() {
            let p = self.transform.transform_point2(self.subpath_start);
            self.start = Some(p);
            self.points.clear();
            self.points.push(p);
        }
        Ok(())
    }

    /// Approximate with `max(1, floor(subdivs * len))` segments, where
    /// `len` is chord + both control arm lengths
    fn flatten_cubic(&mut self, p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2) {
        let len = p3.distance(p0) + p0.distance(p1) + p3.distance(p2);
        let segments = ((self.subdivs * len).floor() as usize).max(1);
        let n = segments as f32;
        for i in 1..=segments {
            self.points.push(cubic_point(p0, p1, p2, p3, i as f32 / n));
        }
    }

    fn close_subpath(&mut self) {
        let Some(start) = self.start.take() else {
            return;
        };
        if self
            .points
            .last()
            .is_none_or(|last| !last.abs_diff_eq(start, self.epsilon))
        {
            self.points.push(start);
        }

        let origin = self.origin.unwrap_or(start);
        let local: Vec<Vec2> = self.points.drain(..).map(|p| p - origin).collect();
        match Polygon::new(&local, self.epsilon) {
            Some(polygon) => self.polygons.push(polygon),
            None => log::warn!("dropping subpath with fewer than 3 distinct points"),
        }
    }

    /// Close any pending subpath and hand back the polygons
    pub fn finish(mut self) -> DecodedPath {
        if self.start.is_some() {
            self.close_subpath();
        }
        DecodedPath {
            origin: self.origin.unwrap_or(Vec2::ZERO),
            polygons: self.polygons,
        }
    }
}

/// Cubic Bernstein blend at `t`
fn cubic_point(p0: Vec2, p1: Vec2, p2: Vec2, p3: Vec2, t: f32) -> Vec2 {
    let u = 1.0 - t;
    p0 * (u * u * u) + p1 * (3.0 * u * u * t) + p2 * (3.0 * u * t * t) + p3 * (t * t * t)
}

/// Tokenize SVG path data.
///
/// H/V/S/Q/T are lowered to absolute `LineTo` / `CubicCurveTo`; everything
/// else keeps its absolute/relative form.
pub fn parse_path_data(data: &str) -> Result<Vec<PathCommand>, LevelError> {
    let mut lexer = Lexer::new(data);
    let mut commands = Vec::new();

    let mut current = Vec2::ZERO;
    let mut subpath_start = Vec2::ZERO;
    let mut last_cubic: Option<Vec2> = None;
    let mut last_quad: Option<Vec2> = None;
    let mut previous: Option<u8> = None;

    loop {
        lexer.skip_separators();
        let Some(next) = lexer.peek() else {
            break;
        };

        let letter = if next.is_ascii_alphabetic() {
            lexer.pos += 1;
            next
        } else {
            // Repeated arguments reuse the previous command; repeated
            // move arguments become line arguments
            match previous {
                Some(b'M') => b'L',
                Some(b'm') => b'l',
                Some(b'Z' | b'z') | None => return Err(lexer.error("expected a command")),
                Some(p) => p,
            }
        };
        previous = Some(letter);

        let relative = letter.is_ascii_lowercase();
        let coords = if relative {
            Coords::Relative
        } else {
            Coords::Absolute
        };
        let base = if relative { current } else { Vec2::ZERO };
        let mut cubic_ctrl = None;
        let mut quad_ctrl = None;

        match letter.to_ascii_uppercase() {
            b'M' => {
                let to = lexer.point()?;
                commands.push(PathCommand::MoveTo { coords, to });
                current = base + to;
                subpath_start = current;
            }
            b'L' => {
                let to = lexer.point()?;
                commands.push(PathCommand::LineTo { coords, to });
                current = base + to;
            }
            b'H' => {
                let x = lexer.number()?;
                current.x = base.x + x;
                commands.push(PathCommand::LineTo {
                    coords: Coords::Absolute,
                    to: current,
                });
            }
            b'V' => {
                let y = lexer.number()?;
                current.y = base.y + y;
                commands.push(PathCommand::LineTo {
                    coords: Coords::Absolute,
                    to: current,
                });
            }
            b'C' => {
                let c1 = lexer.point()?;
                let c2 = lexer.point()?;
                let to = lexer.point()?;
                commands.push(PathCommand::CubicCurveTo { coords, c1, c2, to });
                cubic_ctrl = Some(base + c2);
                current = base + to;
            }
            b'S' => {
                let c2 = base + lexer.point()?;
                let to = base + lexer.point()?;
                let c1 = last_cubic.map_or(current, |c| current * 2.0 - c);
                commands.push(PathCommand::CubicCurveTo {
                    coords: Coords::Absolute,
                    c1,
                    c2,
                    to,
                });
                cubic_ctrl = Some(c2);
                current = to;
            }
            b'Q' => {
                let q = base + lexer.point()?;
                let to = base + lexer.point()?;
                commands.push(quad_as_cubic(current, q, to));
                quad_ctrl = Some(q);
                current = to;
            }
            b'T' => {
                let to = base + lexer.point()?;
                let q = last_quad.map_or(current, |c| current * 2.0 - c);
                commands.push(quad_as_cubic(current, q, to));
                quad_ctrl = Some(q);
                current = to;
            }
            b'A' => {
                let radii = lexer.point()?;
                let rotation = lexer.number()?;
                let large_arc = lexer.flag()?;
                let sweep = lexer.flag()?;
                let to = lexer.point()?;
                commands.push(PathCommand::ArcTo {
                    coords,
                    radii,
                    rotation,
                    large_arc,
                    sweep,
                    to,
                });
                current = base + to;
            }
            b'Z' => {
                commands.push(PathCommand::ClosePath);
                current = subpath_start;
            }
            _ => return Err(lexer.error("unknown command")),
        }

        last_cubic = cubic_ctrl;
        last_quad = quad_ctrl;
    }

    Ok(commands)
}

/// Exact degree elevation of a quadratic segment
fn quad_as_cubic(from: Vec2, q: Vec2, to: Vec2) -> PathCommand {
    PathCommand::CubicCurveTo {
        coords: Coords::Absolute,
        c1: from + (q - from) * (2.0 / 3.0),
        c2: to + (q - to) * (2.0 / 3.0),
        to,
    }
}

struct Lexer<'a> {
    bytes: &'a [u8],
    text: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            text,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_separators(&mut self) {
        while self
            .peek()
            .is_some_and(|b| b == b',' || b.is_ascii_whitespace())
        {
            self.pos += 1;
        }
    }

    fn eat_digits(&mut self) -> usize {
        let start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn number(&mut self) -> Result<f32, LevelError> {
        self.skip_separators();
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut digits = self.eat_digits();
        if self.peek() == Some(b'.') {
            self.pos += 1;
            digits += self.eat_digits();
        }
        if digits == 0 {
            self.pos = start;
            return Err(self.error("expected a number"));
        }
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.pos += 1;
            }
            if self.eat_digits() == 0 {
                self.pos = mark;
            }
        }
        self.text[start..self.pos]
            .parse::<f32>()
            .map_err(|_| LevelError::InvalidPathData {
                offset: start,
                reason: "malformed number".to_string(),
            })
    }

    fn point(&mut self) -> Result<Vec2, LevelError> {
        let x = self.number()?;
        let y = self.number()?;
        Ok(Vec2::new(x, y))
    }

    /// Arc flags are a single `0` or `1`, separators optional
    fn flag(&mut self) -> Result<bool, LevelError> {
        self.skip_separators();
        let flag = match self.peek() {
            Some(b'0') => false,
            Some(b'1') => true,
            _ => return Err(self.error("expected an arc flag")),
        };
        self.pos += 1;
        Ok(flag)
    }

    fn error(&self, reason: &str) -> LevelError {
        LevelError::InvalidPathData {
            offset: self.pos,
            reason: reason.to_string(),
        }
    }
}
