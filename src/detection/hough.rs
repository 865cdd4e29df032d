//! Progressive probabilistic Hough transform.
//!
//! Edge points are visited in a shuffled order. Each point votes in the
//! (theta, rho) accumulator; once a bin reaches the vote threshold the line
//! through that point is walked in both directions, tolerating gaps of up to
//! `max_line_gap` pixels. Points on an accepted segment are removed from the
//! accumulator so they cannot seed another line.
//!
//! The shuffle uses a fixed seed, so the output for a given edge image is
//! always the same.

use image::GrayImage;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::HoughParams;
use crate::models::LineSegment;

const DEFAULT_SEED: u64 = 0x00b0_17ed;
/// Fixed-point fraction bits used while stepping along a line
const SHIFT: u32 = 16;

/// Line detector with precomputed trig tables. Cheap to share between threads.
#[derive(Debug, Clone)]
pub struct LineDetector {
    params: HoughParams,
    // cos/sin of each accumulator angle, pre-divided by the rho resolution
    cos_table: Vec<f64>,
    sin_table: Vec<f64>,
    seed: u64,
}

impl LineDetector {
    pub fn new(params: HoughParams) -> Self {
        let theta = params.angle_resolution_deg.to_radians();
        let num_angle = (std::f64::consts::PI / theta).round().max(1.0) as usize;
        let inv_rho = 1.0 / params.distance_resolution;

        let (cos_table, sin_table) = (0..num_angle)
            .map(|n| {
                let angle = n as f64 * theta;
                (angle.cos() * inv_rho, angle.sin() * inv_rho)
            })
            .unzip();

        Self {
            params,
            cos_table,
            sin_table,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &HoughParams {
        &self.params
    }

    /// Detect line segments among the non-zero pixels of `edges`
    pub fn detect(&self, edges: &GrayImage) -> Vec<LineSegment> {
        let (width, height) = edges.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }
        let w = width as i64;
        let h = height as i64;

        let num_angle = self.cos_table.len();
        let num_rho = ((((w + h) * 2 + 1) as f64) / self.params.distance_resolution).round() as i64;
        let rho_offset = (num_rho - 1) / 2;
        let mut accum = vec![0i32; num_angle * num_rho as usize];

        let mut mask = vec![false; (w * h) as usize];
        let mut points = Vec::new();
        for (x, y, pixel) in edges.enumerate_pixels() {
            if pixel[0] != 0 {
                mask[(y as i64 * w + x as i64) as usize] = true;
                points.push((x as i64, y as i64));
            }
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        points.shuffle(&mut rng);

        let threshold = self.params.vote_threshold as i32;
        let min_length = self.params.min_line_length as i64;
        let max_gap = self.params.max_line_gap as i64;

        let bin = |n: usize, x: i64, y: i64| -> Option<usize> {
            let r = (x as f64 * self.cos_table[n] + y as f64 * self.sin_table[n]).round() as i64
                + rho_offset;
            (0..num_rho)
                .contains(&r)
                .then(|| n * num_rho as usize + r as usize)
        };

        let mut lines = Vec::new();

        for &(x, y) in &points {
            // already consumed by an earlier segment
            if !mask[(y * w + x) as usize] {
                continue;
            }

            let mut max_val = threshold - 1;
            let mut max_n = 0;
            for n in 0..num_angle {
                if let Some(idx) = bin(n, x, y) {
                    accum[idx] += 1;
                    if max_val < accum[idx] {
                        max_val = accum[idx];
                        max_n = n;
                    }
                }
            }
            if max_val < threshold {
                continue;
            }

            // Direction of the line is perpendicular to its normal (cos, sin)
            let a = -self.sin_table[max_n];
            let b = self.cos_table[max_n];
            let walk = LineWalk::new(x, y, a, b);

            let mut line_end = [(x, y); 2];
            for (k, end) in line_end.iter_mut().enumerate() {
                let mut gap = 0;
                for (px, py) in walk.steps(k == 1) {
                    if px < 0 || px >= w || py < 0 || py >= h {
                        break;
                    }
                    if mask[(py * w + px) as usize] {
                        gap = 0;
                        *end = (px, py);
                    } else {
                        gap += 1;
                        if gap > max_gap {
                            break;
                        }
                    }
                }
            }

            let good_line = (line_end[1].0 - line_end[0].0).abs() >= min_length
                || (line_end[1].1 - line_end[0].1).abs() >= min_length;

            // Remove the walked points; retract their votes only if the line is kept
            for (k, end) in line_end.iter().enumerate() {
                for (px, py) in walk.steps(k == 1) {
                    if px < 0 || px >= w || py < 0 || py >= h {
                        break;
                    }
                    let at = (py * w + px) as usize;
                    if mask[at] {
                        if good_line {
                            for n in 0..num_angle {
                                if let Some(idx) = bin(n, px, py) {
                                    accum[idx] -= 1;
                                }
                            }
                        }
                        mask[at] = false;
                    }
                    if (px, py) == *end {
                        break;
                    }
                }
            }

            if good_line {
                lines.push(LineSegment::new(
                    line_end[0].0 as i32,
                    line_end[0].1 as i32,
                    line_end[1].0 as i32,
                    line_end[1].1 as i32,
                ));
            }
        }

        lines
    }
}

/// Fixed-point stepping along a direction, one pixel per step on the major axis
#[derive(Debug, Clone, Copy)]
struct LineWalk {
    x0: i64,
    y0: i64,
    dx: i64,
    dy: i64,
    x_major: bool,
}

impl LineWalk {
    fn new(x: i64, y: i64, a: f64, b: f64) -> Self {
        let one = (1i64 << SHIFT) as f64;
        let half = 1i64 << (SHIFT - 1);
        if a.abs() > b.abs() {
            Self {
                x0: x,
                y0: (y << SHIFT) + half,
                dx: if a > 0.0 { 1 } else { -1 },
                dy: (b * one / a.abs()).round() as i64,
                x_major: true,
            }
        } else {
            Self {
                x0: (x << SHIFT) + half,
                y0: y,
                dx: (a * one / b.abs()).round() as i64,
                dy: if b > 0.0 { 1 } else { -1 },
                x_major: false,
            }
        }
    }

    /// Pixel positions starting at the seed point; `reverse` walks the other way.
    /// The iterator is unbounded, callers stop on bounds or gap.
    fn steps(self, reverse: bool) -> impl Iterator<Item = (i64, i64)> {
        let (dx, dy) = if reverse {
            (-self.dx, -self.dy)
        } else {
            (self.dx, self.dy)
        };
        let x_major = self.x_major;
        (0i64..).map(move |i| {
            let fx = self.x0 + i * dx;
            let fy = self.y0 + i * dy;
            if x_major {
                (fx, fy >> SHIFT)
            } else {
                (fx >> SHIFT, fy)
            }
        })
    }
}
