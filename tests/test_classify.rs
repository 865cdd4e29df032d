//! Classification and aggregation tests on hand-built segments.

mod common;

use boltmark::LineSegment;
use boltmark::detection::classify::classify;
use common::*;

fn angle_policy() -> AlignmentPolicy {
    AlignmentPolicy::default()
}

fn axis_policy() -> AlignmentPolicy {
    AlignmentPolicy::AxisAligned { tolerance_px: 10 }
}

/// Segment of the given length leaving the origin at `angle_deg`
fn segment_at(angle_deg: f64, length: f64) -> LineSegment {
    let (s, c) = angle_deg.to_radians().sin_cos();
    LineSegment::new(0, 0, (c * length).round() as i32, (s * length).round() as i32)
}

#[test]
fn test_no_segments_is_no_mark() {
    assert_eq!(classify(&[], &angle_policy()), Label::NoMark);
    assert_eq!(classify(&[], &axis_policy()), Label::NoMark);
}

#[test]
fn test_near_horizontal_is_aligned() {
    let segments = [segment_at(3.0, 40.0)];
    assert_eq!(classify(&segments, &angle_policy()), Label::Aligned);
}

#[test]
fn test_steep_mark_is_misaligned() {
    let segments = [segment_at(35.0, 40.0)];
    assert_eq!(classify(&segments, &angle_policy()), Label::Misaligned);
}

#[test]
fn test_single_diagonal_mark_is_misaligned() {
    let diagonal = segment_at(45.0, 30.0);
    assert_eq!(diagonal, LineSegment::new(0, 0, 21, 21));
    assert!((diagonal.deviation_from_horizontal() - 45.0).abs() < 1e-9);
    assert_eq!(classify(&[diagonal], &angle_policy()), Label::Misaligned);
}

#[test]
fn test_direction_of_travel_is_ignored() {
    // right-to-left horizontal line has atan2 angle 180
    let backwards = LineSegment::new(40, 5, 0, 5);
    assert_eq!(backwards.angle_deg(), 180.0);
    assert_eq!(backwards.deviation_from_horizontal(), 0.0);
    assert_eq!(classify(&[backwards], &angle_policy()), Label::Aligned);

    let down_left = LineSegment::new(40, 0, 0, 4);
    assert!(down_left.angle_deg() > 170.0);
    assert_eq!(classify(&[down_left], &angle_policy()), Label::Aligned);
}

#[test]
fn test_angle_tolerance_boundary_is_inclusive() {
    assert!(AlignmentPolicy::is_aligned_angle(10.0, 10.0));
    assert!(!AlignmentPolicy::is_aligned_angle(10.0, 10.000_001));
    assert!(AlignmentPolicy::is_aligned_angle(10.0, 9.999_999));
}

#[test]
fn test_only_first_segment_counts_for_angle_policy() {
    let segments = [segment_at(45.0, 40.0), segment_at(0.0, 40.0)];
    assert_eq!(classify(&segments, &angle_policy()), Label::Misaligned);

    let segments = [segment_at(0.0, 40.0), segment_at(45.0, 40.0)];
    assert_eq!(classify(&segments, &angle_policy()), Label::Aligned);
}

#[test]
fn test_axis_policy_any_segment() {
    let diagonal = LineSegment::new(0, 0, 30, 30);
    let vertical = LineSegment::new(5, 0, 7, 40);
    assert_eq!(classify(&[diagonal], &axis_policy()), Label::NoMark);
    assert_eq!(classify(&[diagonal, vertical], &axis_policy()), Label::Aligned);

    // a vertical mark counts as aligned under the axis rule, misaligned under the angle rule
    assert_eq!(classify(&[vertical], &angle_policy()), Label::Misaligned);
}

#[test]
fn test_axis_policy_bound_is_strict() {
    let just_outside = LineSegment::new(0, 0, 10, 10);
    let just_inside = LineSegment::new(0, 0, 9, 30);
    assert_eq!(classify(&[just_outside], &axis_policy()), Label::NoMark);
    assert_eq!(classify(&[just_inside], &axis_policy()), Label::Aligned);
}

#[test]
fn test_axis_policy_never_misaligned() {
    for angle in (0..360).step_by(5) {
        let label = classify(&[segment_at(angle as f64, 50.0)], &axis_policy());
        assert_ne!(label, Label::Misaligned, "angle {}", angle);
    }
}

#[test]
fn test_aggregate_preserves_order() {
    let labels = [Label::Aligned, Label::NoMark, Label::Misaligned, Label::Aligned];
    let result = InspectionResult::aggregate(labels);
    assert_eq!(result.labels(), &labels);
    assert_eq!(result.count(Label::Aligned), 2);
    assert_eq!(result.to_json().unwrap(), r#"["aligned","no-mark","misaligned","aligned"]"#);
}

#[test]
fn test_aggregate_is_idempotent() {
    let result: InspectionResult = [Label::Misaligned, Label::NoMark].into_iter().collect();
    let again = InspectionResult::aggregate(result.labels().iter().copied());
    assert_eq!(again, result);
    assert!(InspectionResult::aggregate([]).is_empty());
}

#[test]
fn test_result_json_parses_back() {
    let parsed = InspectionResult::from_json(r#"["no-mark","aligned"]"#).unwrap();
    assert_eq!(parsed.labels(), &[Label::NoMark, Label::Aligned]);
    assert!(InspectionResult::from_json(r#"["sideways"]"#).is_err());
    assert_eq!(Label::NoMark.to_string(), "no-mark");
}
