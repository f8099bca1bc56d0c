//! Hand-built level document shared by tests
//!
//! 100 x 50 document units, `screen` 10 units tall, so the default world
//! height of 24 gives a scale of 2.4 and a 240 x 120 world.

use super::document::{ATTR_LABEL, Element};

fn rect(label: &str, x: f32, y: f32, w: f32, h: f32) -> Element {
    Element::new("rect")
        .with_attr(ATTR_LABEL, label)
        .with_attr("x", x.to_string())
        .with_attr("y", y.to_string())
        .with_attr("width", w.to_string())
        .with_attr("height", h.to_string())
}

pub(crate) fn sample_document() -> Element {
    let physics = Element::new("g")
        .with_attr(ATTR_LABEL, "Physics")
        .with_child(
            Element::new("path")
                .with_attr("id", "block")
                .with_attr("d", "M 10 30 L 20 30 L 20 40 L 10 40 Z"),
        )
        .with_child(rect("floor", 0.0, 40.0, 100.0, 10.0).with_attr("desc", "fp:1,0.8,0"))
        .with_child(
            Element::new("g")
                .with_attr("transform", "translate(50,0)")
                .with_child(
                    Element::new("path")
                        .with_attr("id", "hill")
                        .with_attr("d", "M 0 20 C 5 15 10 15 15 20 L 15 25 L 0 25 Z")
                        .with_child(Element::new("desc").with_text("fp:2,0.5,0.1")),
                ),
        );

    let meta = Element::new("g")
        .with_attr(ATTR_LABEL, "Meta")
        .with_child(rect("screen", 0.0, 0.0, 40.0, 10.0))
        .with_child(rect("spawn", 4.0, 30.0, 2.0, 2.0))
        .with_child(rect("part:fire", 60.0, 30.0, 2.0, 2.0))
        .with_child(rect("killLava", 30.0, 45.0, 10.0, 5.0))
        .with_child(rect("winExit", 90.0, 30.0, 5.0, 10.0))
        .with_child(
            Element::new("circle")
                .with_attr(ATTR_LABEL, "lightLamp")
                .with_attr("cx", "50")
                .with_attr("cy", "10")
                .with_attr("r", "2")
                .with_attr("style", "fill:#ff8000;fill-opacity:0.5"),
        )
        .with_child(
            Element::new("path")
                .with_attr(ATTR_LABEL, "conelightSpot")
                .with_attr("sodipodi:cx", "20")
                .with_attr("sodipodi:cy", "5")
                .with_attr("sodipodi:rx", "3")
                .with_attr("sodipodi:start", "0.5")
                .with_attr("sodipodi:end", "1.0"),
        );

    Element::new("svg")
        .with_attr("viewBox", "0 0 100 50")
        .with_child(physics)
        .with_child(meta)
}
