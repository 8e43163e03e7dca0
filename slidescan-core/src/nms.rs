use std::cmp::Ordering;

use crate::candidate::DetectionCandidate;

/// Collapses overlapping candidates into final detections.
///
/// Implementations receive every raw candidate of one image plus the
/// overlap threshold, and must return a subset of their input.
pub trait Suppression {
    fn suppress(
        &self,
        candidates: Vec<DetectionCandidate>,
        overlap_threshold: f32,
    ) -> Vec<DetectionCandidate>;
}

/// Greedy non-maximum suppression.
///
/// Candidates are visited in descending confidence; a candidate is kept
/// unless its IoU with an already kept one exceeds the threshold. Ties keep
/// the scan order.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyNms;

impl Suppression for GreedyNms {
    fn suppress(
        &self,
        mut candidates: Vec<DetectionCandidate>,
        overlap_threshold: f32,
    ) -> Vec<DetectionCandidate> {
        if candidates.len() <= 1 {
            return candidates;
        }

        candidates.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        let mut kept: Vec<DetectionCandidate> = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let overlaps = kept
                .iter()
                .any(|existing| existing.iou(&candidate) > overlap_threshold);
            if !overlaps {
                kept.push(candidate);
            }
        }
        kept
    }
}

impl<F> Suppression for F
where
    F: Fn(Vec<DetectionCandidate>, f32) -> Vec<DetectionCandidate>,
{
    fn suppress(
        &self,
        candidates: Vec<DetectionCandidate>,
        overlap_threshold: f32,
    ) -> Vec<DetectionCandidate> {
        self(candidates, overlap_threshold)
    }
}
