//! Gender from the matched secondary record.
//!
//! Gender never looks at the crop: it is derived solely from the matched
//! record's score, and only when fusion succeeded with reasonable overlap.

use crate::providers::FaceRecord;

/// Gender is only trusted when fusion cleared this overlap.
const MIN_TRUSTED_IOU: f64 = 0.25;

const GENDER_UNKNOWN: &str = "N/A";

/// Derive a gender label and confidence from the fusion outcome.
pub fn estimate_gender(matched: Option<&FaceRecord>, best_iou: f64) -> (String, f32) {
    let Some(record) = matched else {
        return (GENDER_UNKNOWN.to_string(), 0.0);
    };
    if best_iou < MIN_TRUSTED_IOU {
        return (GENDER_UNKNOWN.to_string(), 0.0);
    }
    let Some(score) = record.gender else {
        return (GENDER_UNKNOWN.to_string(), 0.0);
    };

    let gender = if score == 1.0 || score > 0.5 {
        "Male"
    } else {
        "Female"
    };
    (gender.to_string(), score.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flens_models::BoundingBox;

    fn record(gender: Option<f32>) -> FaceRecord {
        FaceRecord {
            bbox: BoundingBox::new(0, 0, 10, 10),
            landmarks: vec![],
            gender,
        }
    }

    #[test]
    fn test_no_match_is_unknown() {
        assert_eq!(estimate_gender(None, 0.9), ("N/A".to_string(), 0.0));
    }

    #[test]
    fn test_low_overlap_is_unknown() {
        let rec = record(Some(0.9));
        assert_eq!(estimate_gender(Some(&rec), 0.2), ("N/A".to_string(), 0.0));
    }

    #[test]
    fn test_threshold_overlap_is_trusted() {
        let rec = record(Some(0.8));
        let (gender, conf) = estimate_gender(Some(&rec), 0.25);
        assert_eq!(gender, "Male");
        assert!((conf - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_low_score_is_female() {
        let rec = record(Some(0.3));
        let (gender, conf) = estimate_gender(Some(&rec), 0.5);
        assert_eq!(gender, "Female");
        assert!((conf - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_exact_one_is_male() {
        let rec = record(Some(1.0));
        assert_eq!(estimate_gender(Some(&rec), 0.5).0, "Male");
    }

    #[test]
    fn test_missing_score_is_unknown() {
        let rec = record(None);
        assert_eq!(estimate_gender(Some(&rec), 0.9), ("N/A".to_string(), 0.0));
    }
}
