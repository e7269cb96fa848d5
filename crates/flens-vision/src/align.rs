//! Face crop extraction and eye-level alignment.
//!
//! Every primary detection that reaches the aligner ends up richly aligned,
//! plainly cropped, or dropped; an alignment problem never fails the frame.

use image::{imageops, Pixel, Rgb, RgbImage};
use tracing::debug;

use flens_models::BoundingBox;

use crate::landmarks::extract_landmarks;
use crate::providers::FaceRecord;

/// Produce a geometrically normalized face crop.
///
/// Decision tree:
/// 1. Matched record: expand its box, crop, and rotate about the crop
///    center so the eye line becomes horizontal, when both eyes land
///    inside the crop.
/// 2. Landmarks absent, invalid, or out of bounds: the unrotated expanded
///    crop of the record's box.
/// 3. No match, or the matched path produced nothing: the expanded crop of
///    the primary detector's own box, no rotation.
/// 4. `None` when even the fallback crop is empty; the caller skips the
///    detection.
pub fn align_face(
    frame: &RgbImage,
    matched: Option<&FaceRecord>,
    primary_box: &BoundingBox,
    expand_scale: f64,
) -> Option<RgbImage> {
    if let Some(record) = matched {
        if let Some(aligned) = align_matched(frame, record, expand_scale) {
            return Some(aligned);
        }
        debug!("matched-record alignment failed, falling back to primary box");
    }

    crop_expanded(frame, primary_box, expand_scale)
}

fn align_matched(frame: &RgbImage, record: &FaceRecord, expand_scale: f64) -> Option<RgbImage> {
    let (frame_w, frame_h) = frame.dimensions();
    let region = record.bbox.expand(expand_scale, frame_w, frame_h);
    let crop = crop_region(frame, &region)?;

    let Some(points) = extract_landmarks(record) else {
        return Some(crop);
    };

    // Translate the eyes into crop coordinates and require both inside.
    let left = (
        points[0].0 - region.x1 as f32,
        points[0].1 - region.y1 as f32,
    );
    let right = (
        points[1].0 - region.x1 as f32,
        points[1].1 - region.y1 as f32,
    );
    let (crop_w, crop_h) = crop.dimensions();
    let inside =
        |p: (f32, f32)| p.0 >= 0.0 && p.0 < crop_w as f32 && p.1 >= 0.0 && p.1 < crop_h as f32;
    if !inside(left) || !inside(right) {
        return Some(crop);
    }

    let angle = (right.1 - left.1).atan2(right.0 - left.0).to_degrees();
    Some(rotate_to_level(&crop, angle))
}

fn crop_expanded(frame: &RgbImage, bbox: &BoundingBox, expand_scale: f64) -> Option<RgbImage> {
    let (frame_w, frame_h) = frame.dimensions();
    let region = bbox.expand(expand_scale, frame_w, frame_h);
    crop_region(frame, &region)
}

/// Copy a region out of the frame, or `None` when the region is empty.
fn crop_region(frame: &RgbImage, region: &BoundingBox) -> Option<RgbImage> {
    if !region.is_valid() {
        return None;
    }
    let (frame_w, frame_h) = frame.dimensions();
    let x = region.x1.max(0) as u32;
    let y = region.y1.max(0) as u32;
    if x >= frame_w || y >= frame_h {
        return None;
    }
    let width = (region.width() as u32).min(frame_w - x);
    let height = (region.height() as u32).min(frame_h - y);
    if width == 0 || height == 0 {
        return None;
    }
    Some(imageops::crop_imm(frame, x, y, width, height).to_image())
}

/// Rotate the image about its center so that features lying along
/// `angle_deg` end up horizontal.
///
/// Destination pixels are inverse-mapped into the source and sampled
/// bilinearly with edge-clamped coordinates, so borders replicate instead
/// of going blank.
fn rotate_to_level(src: &RgbImage, angle_deg: f32) -> RgbImage {
    let (width, height) = src.dimensions();
    let cx = width as f32 / 2.0;
    let cy = height as f32 / 2.0;
    let theta = angle_deg.to_radians();
    let (sin_t, cos_t) = theta.sin_cos();

    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let sx = cx + cos_t * dx - sin_t * dy;
            let sy = cy + sin_t * dx + cos_t * dy;
            out.put_pixel(x, y, sample_clamped(src, sx, sy));
        }
    }
    out
}

/// Bilinear sample with coordinates clamped to the image bounds.
fn sample_clamped(img: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (width, height) = img.dimensions();
    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = img.get_pixel(x0, y0).channels();
    let p10 = img.get_pixel(x1, y0).channels();
    let p01 = img.get_pixel(x0, y1).channels();
    let p11 = img.get_pixel(x1, y1).channels();

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round() as u8;
    }
    Rgb(out)
}
