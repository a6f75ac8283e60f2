//! Court template and zone classification in court space (meters).

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A straight segment between two points of the same coordinate space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub a: Point2<f64>,
    pub b: Point2<f64>,
}

impl Segment {
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }
}

/// Fixed planar court model used as the homography target.
///
/// Corners are ordered left-near, right-near, right-far, left-far, which is
/// also the order in which the calibration wizard asks for clicks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CourtTemplate {
    pub id: &'static str,
    /// Extent along `u` (meters).
    pub length: f64,
    /// Extent along `v` (meters).
    pub width: f64,
    /// `v` of the two attack lines.
    pub attack_lines: [f64; 2],
}

/// Indoor court, 18 m × 9 m.
pub const INDOOR_FIVB_18X9: CourtTemplate = CourtTemplate {
    id: "indoor_fivb_18x9",
    length: 18.0,
    width: 9.0,
    attack_lines: [1.5, 7.5],
};

static TEMPLATES: [&CourtTemplate; 1] = [&INDOOR_FIVB_18X9];

impl Default for CourtTemplate {
    fn default() -> Self {
        INDOOR_FIVB_18X9
    }
}

impl CourtTemplate {
    /// Look up a built-in template by its persisted identifier.
    pub fn by_id(id: &str) -> Option<&'static CourtTemplate> {
        TEMPLATES.iter().copied().find(|t| t.id == id)
    }

    pub fn corners(&self) -> [Point2<f64>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(self.length, 0.0),
            Point2::new(self.length, self.width),
            Point2::new(0.0, self.width),
        ]
    }

    /// `u` of the two lines splitting the court into left/center/right thirds.
    pub fn side_thirds(&self) -> [f64; 2] {
        [self.length / 3.0, 2.0 * self.length / 3.0]
    }

    pub fn centerline(&self) -> f64 {
        self.width / 2.0
    }

    /// The nine reference segments drawn as the calibration grid:
    /// boundary (4), attack lines (2), centerline (1), side thirds (2).
    pub fn reference_lines(&self) -> Vec<Segment> {
        let [c0, c1, c2, c3] = self.corners();
        let h = |v: f64| Segment::new(Point2::new(0.0, v), Point2::new(self.length, v));
        let vert = |u: f64| Segment::new(Point2::new(u, 0.0), Point2::new(u, self.width));

        let [third_a, third_b] = self.side_thirds();
        vec![
            Segment::new(c0, c1),
            Segment::new(c1, c2),
            Segment::new(c2, c3),
            Segment::new(c3, c0),
            h(self.attack_lines[0]),
            h(self.attack_lines[1]),
            h(self.centerline()),
            vert(third_a),
            vert(third_b),
        ]
    }

    pub fn contains(&self, p: Point2<f64>) -> bool {
        (0.0..=self.length).contains(&p.x) && (0.0..=self.width).contains(&p.y)
    }

    /// Classify a court-space point against this template's thirds and centerline.
    pub fn classify(&self, p: Point2<f64>) -> CourtZone {
        let [third_a, third_b] = self.side_thirds();
        let lane = if p.x < third_a {
            Lane::Left
        } else if p.x < third_b {
            Lane::Center
        } else {
            Lane::Right
        };
        let depth = if p.y < self.centerline() {
            Depth::Near
        } else {
            Depth::Far
        };
        CourtZone { depth, lane }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Depth {
    Near,
    Far,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Lane {
    Left,
    Center,
    Right,
}

/// Human-readable court region, rendered as `"{depth} {lane}"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourtZone {
    pub depth: Depth,
    pub lane: Lane,
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Depth::Near => "Near",
            Depth::Far => "Far",
        })
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lane::Left => "Left",
            Lane::Center => "Center",
            Lane::Right => "Right",
        })
    }
}

impl fmt::Display for CourtZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.depth, self.lane)
    }
}

/// Zone of court point `(u, v)` on the default 18×9 template.
///
/// Boundaries belong to the higher zone: `u = 6` is Center, `v = 4.5` is Far.
pub fn classify_zone(u: f64, v: f64) -> CourtZone {
    INDOOR_FIVB_18X9.classify(Point2::new(u, v))
}
