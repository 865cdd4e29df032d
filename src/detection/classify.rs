use crate::config::AlignmentPolicy;
use crate::models::{Label, LineSegment};

impl AlignmentPolicy {
    /// Inclusive tolerance check against the horizontal axis
    pub fn is_aligned_angle(tolerance_deg: f64, deviation_deg: f64) -> bool {
        deviation_deg <= tolerance_deg
    }

    pub fn classify(&self, segments: &[LineSegment]) -> Label {
        match *self {
            AlignmentPolicy::AngleTolerance { tolerance_deg } => match segments.first() {
                None => Label::NoMark,
                Some(first) => {
                    if Self::is_aligned_angle(tolerance_deg, first.deviation_from_horizontal()) {
                        Label::Aligned
                    } else {
                        Label::Misaligned
                    }
                }
            },
            // Never reports Misaligned: a mark that is not axis-parallel counts as absent
            AlignmentPolicy::AxisAligned { tolerance_px } => {
                let any_axis = segments
                    .iter()
                    .any(|s| s.dx().abs() < tolerance_px || s.dy().abs() < tolerance_px);
                if any_axis {
                    Label::Aligned
                } else {
                    Label::NoMark
                }
            }
        }
    }
}

/// Label for one region's segments under `policy`
pub fn classify(segments: &[LineSegment], policy: &AlignmentPolicy) -> Label {
    policy.classify(segments)
}
