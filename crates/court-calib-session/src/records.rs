//! Persisted calibration and annotation records and their request payloads.

use chrono::{DateTime, Utc};
use court_calib_core::{
    CourtMapping, CourtTemplate, CourtZone, Homography, HomographyError, INDOOR_FIVB_18X9,
};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the video upload that owns calibrations and annotations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadId(String);

impl UploadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File-system safe key: path separators become `_`.
    pub fn storage_key(&self) -> String {
        self.0.replace(['/', '\\'], "_")
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn default_court_template() -> String {
    INDOOR_FIVB_18X9.id.to_string()
}

/// Payload submitted when the calibration wizard saves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRequest {
    pub frame_t: f64,
    /// `[width, height]` of the captured frame.
    pub image_size: [u32; 2],
    /// Corner clicks: left-near, right-near, right-far, left-far.
    pub image_points: [Point2<f64>; 4],
    #[serde(default = "default_court_template")]
    pub court_template: String,
    pub net_points: [Point2<f64>; 2],
}

/// Errors raised while turning a request into a record.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibrationRecordError {
    #[error("unknown court template `{0}`")]
    UnknownTemplate(String),
    #[error(transparent)]
    Degenerate(#[from] HomographyError),
}

/// Stored calibration for one upload.
///
/// `homography` maps image pixels to court meters and is normalized so its
/// bottom-right entry is 1; `homography_inv` is its matrix inverse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub frame_t: f64,
    pub image_size: [u32; 2],
    pub image_points: [Point2<f64>; 4],
    #[serde(default = "default_court_template")]
    pub court_template: String,
    /// Template corners the image points were matched against.
    #[serde(default)]
    pub court_points: Vec<Point2<f64>>,
    pub net_points: [Point2<f64>; 2],
    /// Net clicks projected into court space; `None` where unmappable.
    #[serde(default)]
    pub net_court_points: Vec<Option<Point2<f64>>>,
    pub homography: Homography,
    pub homography_inv: Homography,
}

impl Calibration {
    /// Compute both matrices for a request and assemble the full record.
    pub fn from_request(req: &CalibrationRequest) -> Result<Self, CalibrationRecordError> {
        let template = CourtTemplate::by_id(&req.court_template)
            .ok_or_else(|| CalibrationRecordError::UnknownTemplate(req.court_template.clone()))?;
        let mapping = CourtMapping::from_corners(&req.image_points, *template)?;

        Ok(Self {
            frame_t: req.frame_t,
            image_size: req.image_size,
            image_points: req.image_points,
            court_template: req.court_template.clone(),
            court_points: template.corners().to_vec(),
            net_points: req.net_points,
            net_court_points: mapping.to_court_all(&req.net_points),
            homography: mapping.image_to_court,
            homography_inv: mapping.court_to_image,
        })
    }

    /// Template named by the record, falling back to the default court.
    pub fn template(&self) -> CourtTemplate {
        CourtTemplate::by_id(&self.court_template)
            .copied()
            .unwrap_or_default()
    }

    /// Projection helper over the stored (authoritative) matrices.
    pub fn mapping(&self) -> CourtMapping {
        CourtMapping::from_matrices(self.homography, self.homography_inv, self.template())
    }

    /// Normalized `[0,1]` point in the pixel space the matrices were fitted in.
    pub fn calibrated_pixel(&self, normalized: Point2<f64>) -> Point2<f64> {
        Point2::new(
            normalized.x * self.image_size[0] as f64,
            normalized.y * self.image_size[1] as f64,
        )
    }

    /// Court zone under a normalized point, whatever the playback resolution.
    pub fn zone_at_normalized(&self, normalized: Point2<f64>) -> Option<CourtZone> {
        self.mapping().zone_at(self.calibrated_pixel(normalized))
    }

    /// Court zone of a normalized shape.
    pub fn zone_of(&self, shape: &AnnotationShape) -> Option<CourtZone> {
        self.zone_at_normalized(shape.anchor())
    }
}

/// Invalid annotation geometry.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("polygon needs at least 3 points, got {0}")]
    TooFewPoints(usize),
    #[error("shape has non-finite coordinates")]
    NonFinite,
    #[error("rectangle has negative size")]
    NegativeSize,
    #[error("shape extends outside the normalized [0,1] frame")]
    OutOfFrame,
    #[error("record has neither `rect` nor `poly`")]
    MissingShape,
    #[error("record has both `rect` and `poly`")]
    AmbiguousShape,
}

/// Axis-aligned rectangle in normalized `[0,1]` coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormRect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl NormRect {
    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn min(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }

    pub fn max(&self) -> Point2<f64> {
        Point2::new(self.x + self.w, self.y + self.h)
    }
}

/// Closed polygon in normalized coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormPolygon {
    pub pts: Vec<[f64; 2]>,
}

/// Annotation geometry. Serialized as either `"rect": {..}` or `"poly": {..}`.
///
/// On read the other key may be present as `null`, the way records written
/// with both optional fields look.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ShapeFields", into = "ShapeFields")]
pub enum AnnotationShape {
    Rect(NormRect),
    Polygon(NormPolygon),
}

#[derive(Serialize, Deserialize)]
struct ShapeFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rect: Option<NormRect>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poly: Option<NormPolygon>,
}

impl TryFrom<ShapeFields> for AnnotationShape {
    type Error = ShapeError;

    fn try_from(fields: ShapeFields) -> Result<Self, Self::Error> {
        match (fields.rect, fields.poly) {
            (Some(r), None) => Ok(Self::Rect(r)),
            (None, Some(p)) => Ok(Self::Polygon(p)),
            (None, None) => Err(ShapeError::MissingShape),
            (Some(_), Some(_)) => Err(ShapeError::AmbiguousShape),
        }
    }
}

impl From<AnnotationShape> for ShapeFields {
    fn from(shape: AnnotationShape) -> Self {
        match shape {
            AnnotationShape::Rect(r) => Self {
                rect: Some(r),
                poly: None,
            },
            AnnotationShape::Polygon(p) => Self {
                rect: None,
                poly: Some(p),
            },
        }
    }
}

// Small slack for values produced by dividing clamped pixel coordinates.
const FRAME_SLACK: f64 = 1e-9;

fn in_frame(v: f64) -> bool {
    (-FRAME_SLACK..=1.0 + FRAME_SLACK).contains(&v)
}

impl AnnotationShape {
    pub fn rect(x: f64, y: f64, w: f64, h: f64) -> Result<Self, ShapeError> {
        let shape = Self::Rect(NormRect { x, y, w, h });
        shape.validate()?;
        Ok(shape)
    }

    pub fn polygon(pts: Vec<[f64; 2]>) -> Result<Self, ShapeError> {
        let shape = Self::Polygon(NormPolygon { pts });
        shape.validate()?;
        Ok(shape)
    }

    pub fn validate(&self) -> Result<(), ShapeError> {
        match self {
            Self::Rect(r) => {
                if ![r.x, r.y, r.w, r.h].iter().all(|v| v.is_finite()) {
                    return Err(ShapeError::NonFinite);
                }
                if r.w < 0.0 || r.h < 0.0 {
                    return Err(ShapeError::NegativeSize);
                }
                if !(in_frame(r.x) && in_frame(r.y) && in_frame(r.x + r.w) && in_frame(r.y + r.h)) {
                    return Err(ShapeError::OutOfFrame);
                }
            }
            Self::Polygon(p) => {
                if p.pts.len() < 3 {
                    return Err(ShapeError::TooFewPoints(p.pts.len()));
                }
                if !p.pts.iter().flatten().all(|v| v.is_finite()) {
                    return Err(ShapeError::NonFinite);
                }
                if !p.pts.iter().flatten().all(|&v| in_frame(v)) {
                    return Err(ShapeError::OutOfFrame);
                }
            }
        }
        Ok(())
    }

    /// Normalized vertices in drawing order.
    pub fn vertices(&self) -> Vec<Point2<f64>> {
        match self {
            Self::Rect(r) => vec![
                r.min(),
                Point2::new(r.x + r.w, r.y),
                r.max(),
                Point2::new(r.x, r.y + r.h),
            ],
            Self::Polygon(p) => p.pts.iter().map(|&[x, y]| Point2::new(x, y)).collect(),
        }
    }

    /// Point used to classify the shape's court zone: the rect center or the
    /// polygon's vertex mean.
    pub fn anchor(&self) -> Point2<f64> {
        match self {
            Self::Rect(r) => r.center(),
            Self::Polygon(p) => {
                let n = p.pts.len().max(1) as f64;
                let (sx, sy) = p
                    .pts
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), [x, y]| (sx + x, sy + y));
                Point2::new(sx / n, sy / n)
            }
        }
    }
}

/// Payload for creating an annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRequest {
    pub frame_t: f64,
    #[serde(flatten)]
    pub shape: AnnotationShape,
    #[serde(default)]
    pub jersey: Option<u32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Persisted, immutable annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    pub frame_t: f64,
    #[serde(flatten)]
    pub shape: AnnotationShape,
    #[serde(default)]
    pub jersey: Option<u32>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Stamped by the store; absent on records that never carried one.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Annotation {
    pub fn from_request(
        id: impl Into<String>,
        req: &AnnotationRequest,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            frame_t: req.frame_t,
            shape: req.shape.clone(),
            jersey: req.jersey,
            label: req.label.clone(),
            notes: req.notes.clone(),
            created_at: Some(created_at),
        }
    }
}
