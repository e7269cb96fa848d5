//! Landmark representation probing.
//!
//! Different secondary-detector configurations expose different landmark
//! layouts. The extractor probes a fixed, ordered list of known
//! representations and normalizes the first usable one into an eye-first
//! point sequence, isolating the rest of the pipeline from which layout a
//! given model happens to emit.

use crate::providers::{FaceRecord, LandmarkKind};

/// Probe order over known landmark representations.
const PROBE_ORDER: [LandmarkKind; 3] = [
    LandmarkKind::FivePoint,
    LandmarkKind::Dense106,
    LandmarkKind::Dense68,
];

/// Extract an ordered landmark set from a face record.
///
/// Returns the first representation, in probe order, that carries at least
/// two finite points. Point 0 is the left eye and point 1 the right eye.
pub fn extract_landmarks(record: &FaceRecord) -> Option<&[(f32, f32)]> {
    for kind in PROBE_ORDER {
        let Some(repr) = record.landmarks.iter().find(|r| r.kind == kind) else {
            continue;
        };
        if well_formed(&repr.points) {
            return Some(&repr.points);
        }
    }
    None
}

fn well_formed(points: &[(f32, f32)]) -> bool {
    points.len() >= 2 && points.iter().all(|(x, y)| x.is_finite() && y.is_finite())
}
