//! Coordinate-space pipeline
//!
//! Effective transform of an element, applied to points in this order:
//! element-local → enclosing groups (innermost first) → global view.
//! With `Affine2` that is `view * outer_group * ... * inner_group * local`.

use glam::{Affine2, Vec2};

use super::document::Element;

pub type Transform2D = Affine2;

/// Document-to-world view transform: uniform scale, then flip Y about the
/// level's vertical midline so authored "down" becomes world "down"
pub fn view_transform(scale: f32, world_height: f32) -> Transform2D {
    let mid = Vec2::new(0.0, world_height / 2.0);
    Affine2::from_translation(mid)
        * Affine2::from_scale(Vec2::new(1.0, -1.0))
        * Affine2::from_translation(-mid)
        * Affine2::from_scale(Vec2::splat(scale))
}

/// The element's own `transform` attribute; identity if absent or unparsable
pub fn element_transform(element: &Element) -> Transform2D {
    match element.attr("transform") {
        None => Affine2::IDENTITY,
        Some(list) => parse_transform_list(list).unwrap_or_else(|| {
            log::debug!("<{}> has unparsable transform {list:?}, using identity", element.tag);
            Affine2::IDENTITY
        }),
    }
}

/// `parent` composed with the element's local transform
#[inline]
pub fn compose(parent: Transform2D, element: &Element) -> Transform2D {
    parent * element_transform(element)
}

/// Parse a transform list such as `translate(10,20) rotate(45)`.
/// Transforms apply right to left, i.e. the last one listed acts first.
pub fn parse_transform_list(list: &str) -> Option<Transform2D> {
    let mut result = Affine2::IDENTITY;
    let mut rest = list.trim();

    while !rest.is_empty() {
        let open = rest.find('(')?;
        let close = open + rest[open..].find(')')?;
        let name = rest[..open].trim();
        let args = parse_numbers(&rest[open + 1..close])?;

        let t = match (name, args.as_slice()) {
            ("matrix", &[a, b, c, d, e, f]) => Affine2::from_cols_array(&[a, b, c, d, e, f]),
            ("translate", &[tx]) => Affine2::from_translation(Vec2::new(tx, 0.0)),
            ("translate", &[tx, ty]) => Affine2::from_translation(Vec2::new(tx, ty)),
            ("scale", &[s]) => Affine2::from_scale(Vec2::splat(s)),
            ("scale", &[sx, sy]) => Affine2::from_scale(Vec2::new(sx, sy)),
            ("rotate", &[deg]) => Affine2::from_angle(deg.to_radians()),
            ("rotate", &[deg, cx, cy]) => {
                let c = Vec2::new(cx, cy);
                Affine2::from_translation(c)
                    * Affine2::from_angle(deg.to_radians())
                    * Affine2::from_translation(-c)
            }
            ("skewX", &[deg]) => {
                Affine2::from_cols(Vec2::X, Vec2::new(deg.to_radians().tan(), 1.0), Vec2::ZERO)
            }
            ("skewY", &[deg]) => {
                Affine2::from_cols(Vec2::new(1.0, deg.to_radians().tan()), Vec2::Y, Vec2::ZERO)
            }
            _ => return None,
        };
        result = result * t;

        rest = rest[close + 1..].trim_start_matches(|c: char| c == ',' || c.is_whitespace());
    }

    Some(result)
}

fn parse_numbers(args: &str) -> Option<Vec<f32>> {
    args.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f32>().ok())
        .collect()
}
