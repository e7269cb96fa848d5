//! Cross-detector fusion by spatial overlap.
//!
//! Matching is greedy and per-box: each primary detection independently
//! picks the best-overlapping secondary record, so one record may serve as
//! the match for several boxes. There is no global assignment step.

use flens_models::BoundingBox;

use crate::providers::FaceRecord;

/// Default IoU threshold for accepting a fusion match.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.25;

/// Outcome of matching one primary box against the frame's face records.
///
/// The best overlap is reported even when no record cleared the threshold,
/// so downstream gates (gender) can reason about near-misses.
#[derive(Debug, Clone, Copy)]
pub struct FusionMatch<'a> {
    pub record: Option<&'a FaceRecord>,
    pub best_iou: f64,
}

/// Find the secondary record best overlapping `primary`.
///
/// Records with an invalid box are skipped, not fatal. Ties keep the first
/// record encountered (strict `>` comparison), matching the upstream
/// ordering guarantee callers rely on.
pub fn best_matched_record<'a>(
    records: &'a [FaceRecord],
    primary: &BoundingBox,
    iou_threshold: f64,
) -> FusionMatch<'a> {
    let mut best_iou = 0.0;
    let mut best: Option<&FaceRecord> = None;

    for record in records {
        if !record.bbox.is_valid() {
            continue;
        }
        let score = primary.iou(&record.bbox);
        if score > best_iou {
            best_iou = score;
            best = Some(record);
        }
    }

    if best_iou >= iou_threshold {
        FusionMatch {
            record: best,
            best_iou,
        }
    } else {
        FusionMatch {
            record: None,
            best_iou,
        }
    }
}
