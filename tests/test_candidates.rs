//! Candidate extraction and shape filter tests.
//!
//! Tests cover:
//! - Exclusive area, aspect and circularity bounds
//! - Only outermost contours become candidates
//! - Region crops that fall outside the image

mod common;

use boltmark::detection::contours::{extract_candidates, measure_contour};
use boltmark::detection::marks::{MarkParams, detect_mark, extract_roi};
use boltmark::{AreaMeasure, BoundingBox, ShapeFilter};
use image::{DynamicImage, GrayImage, Luma};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::point::Point;
use imageproc::rect::Rect;

use common::*;

fn square_filter() -> ShapeFilter {
    StrategyConfig::edge().shape_filter
}

fn round_filter() -> ShapeFilter {
    StrategyConfig::gradient().shape_filter
}

/// Edge map with one-pixel outlines of the given rectangles
fn outlines(width: u32, height: u32, rects: &[(i32, i32, u32, u32)]) -> GrayImage {
    let mut img = GrayImage::new(width, height);
    for &(x, y, w, h) in rects {
        draw_hollow_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), Luma([255u8]));
    }
    img
}

#[test]
fn test_area_bounds_are_exclusive() {
    let filter = square_filter();
    for (area, expected) in [
        (799.0, false),
        (800.0, false),
        (801.0, true),
        (2999.0, true),
        (3000.0, false),
        (3001.0, false),
    ] {
        assert_eq!(filter.accepts(area, 1.0, 0.0), expected, "area {}", area);
    }
}

#[test]
fn test_aspect_bounds_are_exclusive() {
    let filter = square_filter();
    assert!(!filter.accepts(1600.0, 0.9, 0.0));
    assert!(filter.accepts(1600.0, 0.91, 0.0));
    assert!(filter.accepts(1600.0, 1.09, 0.0));
    assert!(!filter.accepts(1600.0, 1.1, 0.0));
}

#[test]
fn test_circularity_bounds_are_exclusive() {
    let filter = round_filter();
    assert!(!filter.accepts(2000.0, 5.0, 0.2));
    assert!(filter.accepts(2000.0, 5.0, 0.21));
    assert!(!filter.accepts(6000.0, 1.0, 0.9));
    assert!(filter.accepts(5999.0, 1.0, 0.9));
    assert!(!filter.accepts(800.0, 1.0, 0.9));
}

#[test]
fn test_bounding_box_measure_on_outlines() {
    // 40x40 kept, 28x28 too small, 60x30 wrong aspect
    let edges = outlines(
        200,
        200,
        &[(10, 10, 40, 40), (100, 10, 28, 28), (10, 120, 60, 30)],
    );
    let candidates = extract_candidates(&edges, &square_filter(), 0.02, AreaMeasure::BoundingBox);

    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(
        c.bbox,
        BoundingBox {
            x: 10,
            y: 10,
            width: 40,
            height: 40
        }
    );
    assert_eq!(c.area, 1600.0);
    assert_eq!(c.aspect_ratio, 1.0);
}

#[test]
fn test_nested_outline_is_not_a_candidate() {
    // the inner square alone would qualify, but it sits inside the outer one
    let edges = outlines(200, 200, &[(20, 20, 120, 120), (60, 60, 40, 40)]);
    let candidates = extract_candidates(&edges, &square_filter(), 0.02, AreaMeasure::BoundingBox);
    assert!(candidates.is_empty(), "got {:?}", candidates.len());
}

#[test]
fn test_discovery_order_is_kept() {
    let edges = outlines(200, 200, &[(120, 10, 40, 40), (10, 80, 40, 40), (120, 140, 40, 40)]);
    let candidates = extract_candidates(&edges, &square_filter(), 0.02, AreaMeasure::BoundingBox);
    let origins: Vec<(u32, u32)> = candidates.iter().map(|c| (c.bbox.x, c.bbox.y)).collect();
    assert_eq!(origins, vec![(120, 10), (10, 80), (120, 140)]);

    let indices: Vec<usize> = candidates.iter().map(|c| c.index).collect();
    let mut sorted = indices.clone();
    sorted.sort();
    assert_eq!(indices, sorted);
}

#[test]
fn test_polygon_measure_of_square_contour() {
    let contour: Vec<Point<i32>> = (0..40)
        .map(|x| Point::new(x, 0))
        .chain((1..40).map(|y| Point::new(39, y)))
        .chain((0..39).rev().map(|x| Point::new(x, 39)))
        .chain((1..39).rev().map(|y| Point::new(0, y)))
        .collect();
    let region = measure_contour(0, contour, 0.02, AreaMeasure::Polygon).unwrap();

    // corners survive simplification; a collinear start point may too
    assert!((4..=5).contains(&region.polygon.len()), "{:?}", region.polygon);
    assert!((region.area - 39.0 * 39.0).abs() < 1e-9);
    assert!((region.perimeter - 156.0).abs() < 1e-9);
    let expected = 4.0 * std::f64::consts::PI * region.area / (156.0 * 156.0);
    assert!((region.circularity - expected).abs() < 1e-9);
}

#[test]
fn test_region_outside_image_is_region_fault() {
    let source = DynamicImage::ImageRgb8(blank_canvas(50, 50));
    let mut region = measure_contour(
        7,
        vec![Point::new(30, 30), Point::new(69, 30), Point::new(69, 69), Point::new(30, 69)],
        0.02,
        AreaMeasure::BoundingBox,
    )
    .unwrap();

    let err = extract_roi(&source, &region).unwrap_err();
    assert!(err.is_region_fault());
    assert!(matches!(err, InspectError::RegionExtraction { index: 7, .. }));

    let detector = boltmark::detection::hough::LineDetector::new(HoughParams::short_segments());
    let params = MarkParams {
        edge_low: 50.0,
        edge_high: 100.0,
        min_segment_length: 0.0,
        border_margin: 4,
    };
    assert!(detect_mark(&source, &region, &detector, &params).is_err());

    region.bbox = BoundingBox {
        x: 10,
        y: 10,
        width: 20,
        height: 20,
    };
    let roi = extract_roi(&source, &region).unwrap();
    assert_eq!((roi.width(), roi.height()), (20, 20));
}
