//! Draws inspection evidence onto a copy of the source image: a green box per
//! accepted fastener and its detected segments in red.

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use tracing::info;

use crate::error::{InspectError, Result};
use crate::models::RegionReport;

const BBOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const SEGMENT_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const BBOX_THICKNESS: u32 = 2;

pub fn draw_reports(source: &DynamicImage, reports: &[RegionReport]) -> RgbImage {
    let mut canvas = source.to_rgb8();

    for report in reports {
        let bbox = report.region.bbox;
        for t in 0..BBOX_THICKNESS {
            let width = bbox.width + 2 * t;
            let height = bbox.height + 2 * t;
            let rect = Rect::at(bbox.x as i32 - t as i32, bbox.y as i32 - t as i32)
                .of_size(width, height);
            draw_hollow_rect_mut(&mut canvas, rect, BBOX_COLOR);
        }

        // segments are region-local
        let (ox, oy) = (bbox.x as f32, bbox.y as f32);
        for s in &report.segments {
            draw_line_segment_mut(
                &mut canvas,
                (ox + s.start.x as f32, oy + s.start.y as f32),
                (ox + s.end.x as f32, oy + s.end.y as f32),
                SEGMENT_COLOR,
            );
        }
    }

    canvas
}

pub fn save_annotated(source: &DynamicImage, reports: &[RegionReport], path: &Path) -> Result<()> {
    let canvas = draw_reports(source, reports);
    canvas.save(path).map_err(|e| {
        InspectError::debug_output(format!("Failed to save annotation {:?}", path), e)
    })?;
    info!(path = %path.display(), regions = reports.len(), "annotated image saved");
    Ok(())
}
