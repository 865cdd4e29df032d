use image::GrayImage;
use imageproc::contours::{BorderType, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use tracing::{debug, trace};

use crate::config::{AreaMeasure, ShapeFilter};
use crate::models::{BoundingBox, CandidateRegion};

/// Outermost contours of the foreground (non-zero) pixels, in discovery order.
/// Holes and anything nested inside another contour are dropped.
pub fn find_external_contours(edges: &GrayImage) -> Vec<Vec<Point<i32>>> {
    find_contours::<i32>(edges)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| c.points)
        .collect()
}

/// Shoelace area of a closed polygon
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut twice_area = 0i64;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += points[i].x as i64 * points[j].y as i64;
        twice_area -= points[j].x as i64 * points[i].y as i64;
    }
    twice_area.abs() as f64 / 2.0
}

/// 4π·area / perimeter², or 0 for a degenerate contour
pub fn circularity(area: f64, perimeter: f64) -> f64 {
    if perimeter <= 0.0 {
        return 0.0;
    }
    4.0 * std::f64::consts::PI * area / (perimeter * perimeter)
}

/// Measure one contour. Returns `None` for an empty contour.
pub fn measure_contour(
    index: usize,
    points: Vec<Point<i32>>,
    epsilon_ratio: f64,
    area_measure: AreaMeasure,
) -> Option<CandidateRegion> {
    let bbox = BoundingBox::from_points(&points)?;
    let perimeter = arc_length(&points, true);

    let epsilon = epsilon_ratio * perimeter;
    let polygon = if points.len() >= 3 && epsilon > 0.0 {
        approximate_polygon_dp(&points, epsilon, true)
    } else {
        points.clone()
    };

    let area = match area_measure {
        AreaMeasure::Polygon => polygon_area(&polygon),
        AreaMeasure::BoundingBox => bbox.area() as f64,
    };

    Some(CandidateRegion {
        index,
        bbox,
        aspect_ratio: bbox.aspect_ratio(),
        circularity: circularity(area, perimeter),
        contour: points,
        polygon,
        area,
        perimeter,
    })
}

/// Find contours in the edge map and keep the ones shaped like fasteners
pub fn extract_candidates(
    edges: &GrayImage,
    filter: &ShapeFilter,
    epsilon_ratio: f64,
    area_measure: AreaMeasure,
) -> Vec<CandidateRegion> {
    let contours = find_external_contours(edges);
    let total = contours.len();

    let candidates: Vec<CandidateRegion> = contours
        .into_iter()
        .enumerate()
        .filter_map(|(index, points)| measure_contour(index, points, epsilon_ratio, area_measure))
        .filter(|region| {
            let accepted = filter.accepts(region.area, region.aspect_ratio, region.circularity);
            trace!(
                index = region.index,
                area = region.area,
                aspect_ratio = region.aspect_ratio,
                circularity = region.circularity,
                accepted,
                "contour measured"
            );
            accepted
        })
        .collect();

    debug!(contours = total, candidates = candidates.len(), "candidate extraction done");
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoelace_of_axis_square() {
        let square = vec![
            Point::new(0, 0),
            Point::new(10, 0),
            Point::new(10, 10),
            Point::new(0, 10),
        ];
        assert_eq!(polygon_area(&square), 100.0);
    }

    #[test]
    fn degenerate_contour_has_zero_circularity() {
        let region = measure_contour(0, vec![Point::new(3, 4)], 0.02, AreaMeasure::Polygon)
            .expect("single point still has a bounding box");
        assert_eq!(region.area, 0.0);
        assert_eq!(region.circularity, 0.0);
        assert_eq!(region.bbox.width, 1);
    }

    #[test]
    fn empty_contour_is_skipped() {
        assert!(measure_contour(0, Vec::new(), 0.02, AreaMeasure::Polygon).is_none());
    }
}
