#![allow(dead_code)]

use boltmark::core::db::InspectionDb;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_polygon_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tempfile::NamedTempFile;

pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const PAINT: Rgb<u8> = Rgb([20, 20, 20]);

/// Paint mark drawn across a fastener
#[derive(Debug, Clone, Copy)]
pub enum Mark {
    None,
    /// Horizontal bar through the centre
    Horizontal,
    /// Bar rotated 30 degrees
    Tilted,
}

/// Black canvas of the given size
pub fn blank_canvas(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BLACK)
}

/// A filled rotated bar of the given half-length and half-width, centred on (cx, cy)
fn draw_bar(img: &mut RgbImage, cx: f32, cy: f32, angle_deg: f32, half_len: f32, half_w: f32) {
    let (s, c) = angle_deg.to_radians().sin_cos();
    let corner = |l: f32, w: f32| {
        Point::new(
            (cx + l * c - w * s).round() as i32,
            (cy + l * s + w * c).round() as i32,
        )
    };
    let poly = [
        corner(-half_len, -half_w),
        corner(half_len, -half_w),
        corner(half_len, half_w),
        corner(-half_len, half_w),
    ];
    draw_polygon_mut(img, &poly, PAINT);
}

/// White disc of radius 38 on a 200x200 black canvas with an optional paint mark
pub fn round_bolt(mark: Mark) -> DynamicImage {
    let mut img = blank_canvas(200, 200);
    draw_filled_circle_mut(&mut img, (100, 100), 38, WHITE);
    match mark {
        Mark::None => {}
        Mark::Horizontal => draw_bar(&mut img, 100.0, 100.0, 0.0, 34.0, 2.0),
        Mark::Tilted => draw_bar(&mut img, 100.0, 100.0, 30.0, 34.0, 2.0),
    }
    DynamicImage::ImageRgb8(img)
}

/// White 39x39 bolt head at (80, 80) on a 200x200 black canvas with an
/// optional 31px paint mark through its centre
pub fn square_bolt_marked(mark: Mark) -> DynamicImage {
    let mut img = blank_canvas(200, 200);
    draw_filled_rect_mut(&mut img, Rect::at(80, 80).of_size(39, 39), WHITE);
    match mark {
        Mark::None => {}
        Mark::Horizontal => draw_bar(&mut img, 99.0, 99.0, 0.0, 15.0, 1.5),
        Mark::Tilted => draw_bar(&mut img, 99.0, 99.0, 30.0, 15.0, 1.5),
    }
    DynamicImage::ImageRgb8(img)
}

/// Scattered specks far too small to be fasteners
pub fn speckled() -> DynamicImage {
    let mut img = blank_canvas(200, 200);
    for i in 0..8 {
        let x = 15 + i * 22;
        draw_filled_rect_mut(&mut img, Rect::at(x, 40 + i * 10).of_size(3, 3), WHITE);
    }
    DynamicImage::ImageRgb8(img)
}

/// Several discs of assorted sizes, some of them out of range
pub fn mixed_discs() -> DynamicImage {
    let mut img = blank_canvas(320, 240);
    draw_filled_circle_mut(&mut img, (60, 60), 36, WHITE);
    draw_filled_circle_mut(&mut img, (180, 60), 6, WHITE);
    draw_filled_circle_mut(&mut img, (250, 170), 34, WHITE);
    draw_filled_circle_mut(&mut img, (80, 180), 38, WHITE);
    DynamicImage::ImageRgb8(img)
}

/// Saves `img` as a temporary PNG. The file is removed when dropped.
pub fn save_temp_png(img: &DynamicImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Opens an inspection database in a temporary directory.
/// Returns both the database and the directory (which must be kept alive).
pub async fn create_test_db() -> (InspectionDb, tempfile::TempDir) {
    let dir = tempfile::TempDir::new().expect("Failed to create temp directory");
    let db = InspectionDb::open(dir.path().join("inspections.db"), dir.path().join("uploads"))
        .await
        .expect("Failed to open test database");
    (db, dir)
}
