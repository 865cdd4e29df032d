use std::fmt;

use imageproc::point::Point;
use serde::{Deserialize, Serialize};

/// Bounding box in the original image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Smallest axis-aligned box enclosing all points; `None` for an empty slice
    /// or points with negative coordinates.
    pub fn from_points(points: &[Point<i32>]) -> Option<Self> {
        let first = points.first()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
        for p in points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        if min_x < 0 || min_y < 0 {
            return None;
        }
        Some(Self {
            x: min_x as u32,
            y: min_y as u32,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
        })
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            return 0.0;
        }
        self.width as f64 / self.height as f64
    }

    /// True when the box is non-empty and lies entirely inside a `width`x`height` image
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.width > 0
            && self.height > 0
            && self.x.checked_add(self.width).is_some_and(|r| r <= width)
            && self.y.checked_add(self.height).is_some_and(|b| b <= height)
    }
}

/// A contour that passed geometric filtering and is treated as a fastener
#[derive(Debug, Clone)]
pub struct CandidateRegion {
    /// Position of the originating contour in discovery order
    pub index: usize,
    pub bbox: BoundingBox,
    pub contour: Vec<Point<i32>>,
    /// Douglas-Peucker simplification of `contour`
    pub polygon: Vec<Point<i32>>,
    pub area: f64,
    pub perimeter: f64,
    pub aspect_ratio: f64,
    pub circularity: f64,
}

impl CandidateRegion {
    pub fn center(&self) -> (u32, u32) {
        (
            self.bbox.x + self.bbox.width / 2,
            self.bbox.y + self.bbox.height / 2,
        )
    }
}

/// Straight segment reported by the line detector, in region-local pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSegment {
    pub start: Point<i32>,
    pub end: Point<i32>,
}

impl LineSegment {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            start: Point::new(x1, y1),
            end: Point::new(x2, y2),
        }
    }

    pub fn dx(&self) -> i32 {
        self.end.x - self.start.x
    }

    pub fn dy(&self) -> i32 {
        self.end.y - self.start.y
    }

    pub fn length(&self) -> f64 {
        (self.dx() as f64).hypot(self.dy() as f64)
    }

    /// atan2(dy, dx) in degrees, in (-180, 180]
    pub fn angle_deg(&self) -> f64 {
        (self.dy() as f64).atan2(self.dx() as f64).to_degrees()
    }

    /// Unsigned angle to the horizontal axis, in [0, 90]. Direction of travel is ignored,
    /// so 180° and -180° both count as horizontal.
    pub fn deviation_from_horizontal(&self) -> f64 {
        let a = self.angle_deg().abs();
        a.min(180.0 - a)
    }
}

/// Per-fastener verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Label {
    Aligned,
    Misaligned,
    NoMark,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Aligned => "aligned",
            Label::Misaligned => "misaligned",
            Label::NoMark => "no-mark",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered labels, one per accepted candidate in discovery order.
///
/// Serializes as a plain JSON array, e.g. `["aligned","no-mark"]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectionResult {
    labels: Vec<Label>,
}

impl InspectionResult {
    /// Concatenate per-region labels in the order given
    pub fn aggregate<I>(labels: I) -> Self
    where
        I: IntoIterator<Item = Label>,
    {
        Self {
            labels: labels.into_iter().collect(),
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn count(&self, label: Label) -> usize {
        self.labels.iter().filter(|l| **l == label).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

impl FromIterator<Label> for InspectionResult {
    fn from_iter<T: IntoIterator<Item = Label>>(iter: T) -> Self {
        Self::aggregate(iter)
    }
}

/// Full evidence for one accepted region
#[derive(Debug, Clone)]
pub struct RegionReport {
    pub region: CandidateRegion,
    pub segments: Vec<LineSegment>,
    pub label: Label,
}
