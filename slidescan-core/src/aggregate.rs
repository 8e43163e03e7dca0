use crate::{candidate::DetectionCandidate, error::ScanError, nms::Suppression};

/// Ordered collection of candidates for one image.
///
/// Collection keeps scan order (level by level, row-major within a level)
/// and never filters, merges or reorders. Only [`DetectionSet::suppress`]
/// changes the contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
    candidates: Vec<DetectionCandidate>,
}

impl DetectionSet {
    /// Drain a scan into a set, stopping at the first error.
    pub fn collect<I>(scan: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = Result<DetectionCandidate, ScanError>>,
    {
        let candidates = scan.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { candidates })
    }

    /// Hand every candidate to `routine` and return what it keeps.
    pub fn suppress<S>(self, routine: &S, overlap_threshold: f32) -> Self
    where
        S: Suppression + ?Sized,
    {
        let before = self.candidates.len();
        let candidates = routine.suppress(self.candidates, overlap_threshold);
        log::debug!(
            "suppression kept {} of {} candidate(s) at overlap {:.2}",
            candidates.len(),
            before,
            overlap_threshold
        );
        Self { candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectionCandidate> {
        self.candidates.iter()
    }

    pub fn as_slice(&self) -> &[DetectionCandidate] {
        &self.candidates
    }

    pub fn into_vec(self) -> Vec<DetectionCandidate> {
        self.candidates
    }
}

impl From<Vec<DetectionCandidate>> for DetectionSet {
    fn from(candidates: Vec<DetectionCandidate>) -> Self {
        Self { candidates }
    }
}

impl IntoIterator for DetectionSet {
    type Item = DetectionCandidate;
    type IntoIter = std::vec::IntoIter<DetectionCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.into_iter()
    }
}

impl<'a> IntoIterator for &'a DetectionSet {
    type Item = &'a DetectionCandidate;
    type IntoIter = std::slice::Iter<'a, DetectionCandidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.candidates.iter()
    }
}
