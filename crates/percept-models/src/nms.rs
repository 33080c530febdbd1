//! Class-aware non-maximum suppression shared by the detection backends.

/// Candidate detection in corner-coordinate form, before suppression.
#[derive(Debug, Clone)]
pub(crate) struct RawBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class: usize,
}

/// Suppress overlapping candidates of the same class, keeping the
/// highest-scoring one. Output is sorted by descending score.
pub(crate) fn nms(mut boxes: Vec<RawBox>, iou_threshold: f32) -> Vec<RawBox> {
    boxes.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; boxes.len()];

    for i in 0..boxes.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(boxes[i].clone());

        for j in (i + 1)..boxes.len() {
            if suppressed[j] || boxes[j].class != boxes[i].class {
                continue;
            }
            if iou(&boxes[i], &boxes[j]) > iou_threshold {
                suppressed[j] = true;
            }
        }
    }

    keep
}

/// Intersection-over-union of two corner-form boxes.
fn iou(a: &RawBox, b: &RawBox) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1) * (a.y2 - a.y1);
    let area_b = (b.x2 - b.x1) * (b.y2 - b.y1);
    let union_area = area_a + area_b - inter_area;

    if union_area > 0.0 {
        inter_area / union_area
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, class: usize) -> RawBox {
        RawBox {
            x1,
            y1,
            x2,
            y2,
            score,
            class,
        }
    }

    #[test]
    fn test_iou_identical() {
        let a = raw(0.0, 0.0, 100.0, 100.0, 1.0, 0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint() {
        let a = raw(0.0, 0.0, 10.0, 10.0, 1.0, 0);
        let b = raw(20.0, 20.0, 30.0, 30.0, 1.0, 0);
        assert!(iou(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = raw(0.0, 0.0, 10.0, 10.0, 1.0, 0);
        let b = raw(5.0, 0.0, 15.0, 10.0, 1.0, 0);
        // Intersection 50, union 150.
        assert!((iou(&a, &b) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_same_class_overlap() {
        let boxes = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.9, 0),
            raw(5.0, 5.0, 105.0, 105.0, 0.8, 0),
            raw(200.0, 200.0, 250.0, 250.0, 0.7, 0),
        ];
        let kept = nms(boxes, 0.4);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.9).abs() < 1e-6);
        assert!((kept[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_nms_keeps_overlap_across_classes() {
        let boxes = vec![
            raw(0.0, 0.0, 100.0, 100.0, 0.9, 0),
            raw(5.0, 5.0, 105.0, 105.0, 0.8, 1),
        ];
        let kept = nms(boxes, 0.4);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_nms_empty() {
        assert!(nms(vec![], 0.4).is_empty());
    }

    #[test]
    fn test_nms_sorts_by_score() {
        let boxes = vec![
            raw(0.0, 0.0, 10.0, 10.0, 0.3, 0),
            raw(50.0, 50.0, 60.0, 60.0, 0.8, 0),
        ];
        let kept = nms(boxes, 0.4);
        assert!((kept[0].score - 0.8).abs() < 1e-6);
    }
}
