use crate::court::{CourtTemplate, CourtZone, Segment};
use crate::homography::{compute_homography, Homography, HomographyError};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Image ↔ court mapping built from one calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CourtMapping {
    /// Image pixels → court meters.
    pub image_to_court: Homography,
    /// Court meters → image pixels.
    pub court_to_image: Homography,
    pub template: CourtTemplate,
}

impl CourtMapping {
    /// Estimate both directions from four image clicks ordered like
    /// [`CourtTemplate::corners`].
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn from_corners(
        image_points: &[Point2<f64>; 4],
        template: CourtTemplate,
    ) -> Result<Self, HomographyError> {
        let image_to_court = compute_homography(image_points, &template.corners())?;
        let court_to_image = image_to_court
            .inverse()
            .ok_or(HomographyError::NotInvertible)?;
        Ok(Self {
            image_to_court,
            court_to_image,
            template,
        })
    }

    /// Wrap matrices loaded from a persisted record.
    pub fn from_matrices(
        image_to_court: Homography,
        court_to_image: Homography,
        template: CourtTemplate,
    ) -> Self {
        Self {
            image_to_court,
            court_to_image,
            template,
        }
    }

    pub fn to_court(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.image_to_court.apply(p)
    }

    pub fn to_image(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        self.court_to_image.apply(p)
    }

    pub fn to_court_all(&self, pts: &[Point2<f64>]) -> Vec<Option<Point2<f64>>> {
        pts.iter().map(|&p| self.to_court(p)).collect()
    }

    pub fn to_image_all(&self, pts: &[Point2<f64>]) -> Vec<Option<Point2<f64>>> {
        pts.iter().map(|&p| self.to_image(p)).collect()
    }

    /// Zone under an image-space point, if it maps to a finite court point.
    pub fn zone_at(&self, image_point: Point2<f64>) -> Option<CourtZone> {
        self.to_court(image_point)
            .map(|court| self.template.classify(court))
    }

    /// The template's reference lines in image space.
    ///
    /// A segment with an endpoint that maps to infinity is dropped.
    pub fn project_reference_lines(&self) -> Vec<Segment> {
        self.template
            .reference_lines()
            .into_iter()
            .filter_map(|s| Some(Segment::new(self.to_image(s.a)?, self.to_image(s.b)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::court::INDOOR_FIVB_18X9;
    use approx::assert_abs_diff_eq;

    fn clicks() -> [Point2<f64>; 4] {
        [
            Point2::new(180.0, 620.0),
            Point2::new(1100.0, 630.0),
            Point2::new(900.0, 300.0),
            Point2::new(360.0, 295.0),
        ]
    }

    #[test]
    fn corners_land_on_template_corners() {
        let m = CourtMapping::from_corners(&clicks(), INDOOR_FIVB_18X9).expect("mapping");
        for (img, court) in clicks().iter().zip(INDOOR_FIVB_18X9.corners()) {
            assert_abs_diff_eq!(m.to_court(*img).expect("finite"), court, epsilon = 1e-6);
            assert_abs_diff_eq!(m.to_image(court).expect("finite"), *img, epsilon = 1e-6);
        }
    }

    #[test]
    fn projected_grid_starts_at_clicked_corners() {
        let m = CourtMapping::from_corners(&clicks(), INDOOR_FIVB_18X9).expect("mapping");
        let lines = m.project_reference_lines();
        assert_eq!(lines.len(), 9);
        assert_abs_diff_eq!(lines[0].a, clicks()[0], epsilon = 1e-6);
        assert_abs_diff_eq!(lines[0].b, clicks()[1], epsilon = 1e-6);
    }

    #[test]
    fn zone_of_image_point() {
        let m = CourtMapping::from_corners(&clicks(), INDOOR_FIVB_18X9).expect("mapping");
        let near_left = m.to_image(Point2::new(3.0, 2.0)).expect("finite");
        assert_eq!(m.zone_at(near_left).expect("zone").to_string(), "Near Left");
        let far_right = m.to_image(Point2::new(16.0, 8.0)).expect("finite");
        assert_eq!(m.zone_at(far_right).expect("zone").to_string(), "Far Right");
    }

    #[test]
    fn batch_transform_preserves_order() {
        let m = CourtMapping::from_corners(&clicks(), INDOOR_FIVB_18X9).expect("mapping");
        let out = m.to_court_all(&clicks());
        assert_eq!(out.len(), 4);
        assert_abs_diff_eq!(out[2].expect("finite"), Point2::new(18.0, 9.0), epsilon = 1e-6);
    }
}
