//! Display-space drawing primitives and SVG export.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Stroke settings for one primitive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Style {
    /// CSS color.
    pub color: String,
    pub width: f64,
    #[serde(default)]
    pub dashed: bool,
}

impl Style {
    pub fn solid(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
            dashed: false,
        }
    }

    pub fn dashed(color: impl Into<String>, width: f64) -> Self {
        Self {
            dashed: true,
            ..Self::solid(color, width)
        }
    }
}

/// Which part of the overlay a primitive belongs to, in drawing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Grid,
    Net,
    Annotation,
    Draft,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Primitive {
    Line {
        a: Point2<f64>,
        b: Point2<f64>,
        style: Style,
    },
    /// Axis-aligned rectangle given by two opposite corners.
    Rect {
        min: Point2<f64>,
        max: Point2<f64>,
        style: Style,
    },
    Polygon {
        pts: Vec<Point2<f64>>,
        style: Style,
    },
    Label {
        at: Point2<f64>,
        text: String,
        style: Style,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawItem {
    pub layer: Layer,
    pub primitive: Primitive,
}

/// Everything drawn for one frame, in display pixels of the element box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub width: f64,
    pub height: f64,
    pub items: Vec<DrawItem>,
}

impl Scene {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, layer: Layer, primitive: Primitive) {
        self.items.push(DrawItem { layer, primitive });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn layer(&self, layer: Layer) -> impl Iterator<Item = &Primitive> + '_ {
        self.items
            .iter()
            .filter(move |i| i.layer == layer)
            .map(|i| &i.primitive)
    }

    /// Standalone SVG document with a transparent background, sized to the
    /// element box so it can be laid over the video.
    pub fn to_svg(&self) -> String {
        let mut svg = String::with_capacity(256 + self.items.len() * 128);
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.2} {h:.2}">"#,
            w = self.width,
            h = self.height
        );
        for item in &self.items {
            write_primitive(&mut svg, item.layer, &item.primitive);
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn stroke_attrs(style: &Style) -> String {
    let mut attrs = format!(
        r#"stroke="{}" stroke-width="{:.2}" fill="none""#,
        escape(&style.color),
        style.width
    );
    if style.dashed {
        let dash = (style.width * 3.0).max(2.0);
        let _ = write!(attrs, r#" stroke-dasharray="{dash:.1} {dash:.1}""#);
    }
    attrs
}

fn layer_class(layer: Layer) -> &'static str {
    match layer {
        Layer::Grid => "grid",
        Layer::Net => "net",
        Layer::Annotation => "annotation",
        Layer::Draft => "draft",
    }
}

fn write_primitive(svg: &mut String, layer: Layer, p: &Primitive) {
    let class = layer_class(layer);
    match p {
        Primitive::Line { a, b, style } => {
            let _ = writeln!(
                svg,
                r#"<line class="{class}" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" {}/>"#,
                a.x,
                a.y,
                b.x,
                b.y,
                stroke_attrs(style)
            );
        }
        Primitive::Rect { min, max, style } => {
            let _ = writeln!(
                svg,
                r#"<rect class="{class}" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" {}/>"#,
                min.x,
                min.y,
                max.x - min.x,
                max.y - min.y,
                stroke_attrs(style)
            );
        }
        Primitive::Polygon { pts, style } => {
            let mut points = String::new();
            for (i, p) in pts.iter().enumerate() {
                let sep = if i == 0 { "" } else { " " };
                let _ = write!(points, "{sep}{:.2},{:.2}", p.x, p.y);
            }
            let _ = writeln!(
                svg,
                r#"<polygon class="{class}" points="{points}" {}/>"#,
                stroke_attrs(style)
            );
        }
        Primitive::Label { at, text, style } => {
            let _ = writeln!(
                svg,
                r#"<text class="{class}" x="{:.2}" y="{:.2}" fill="{}" font-family="sans-serif" font-size="12">{}</text>"#,
                at.x,
                at.y,
                escape(&style.color),
                escape(text)
            );
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
