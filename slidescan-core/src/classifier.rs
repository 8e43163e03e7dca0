use std::fmt;

use anyhow::Result;

use crate::window::Patch;

/// Binary window label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Positive,
    Negative,
}

/// Classifier output for one window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub label: Label,
    /// Decision score; higher means more confident. Must be finite.
    pub confidence: f32,
}

impl Verdict {
    pub fn positive(confidence: f32) -> Self {
        Self {
            label: Label::Positive,
            confidence,
        }
    }

    pub fn negative(confidence: f32) -> Self {
        Self {
            label: Label::Negative,
            confidence,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.label == Label::Positive
    }
}

/// Decides whether a full-size window contains the target object.
///
/// Implementations see exactly one patch at a time and must not assume any
/// ordering between calls.
pub trait Classifier {
    fn classify(&self, patch: &Patch<'_>) -> Result<Verdict>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn classify(&self, patch: &Patch<'_>) -> Result<Verdict> {
        (**self).classify(patch)
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&self, patch: &Patch<'_>) -> Result<Verdict> {
        (**self).classify(patch)
    }
}

/// Adapter turning a closure into a [`Classifier`].
#[derive(Clone)]
pub struct FnClassifier<F>(F);

impl<F> fmt::Debug for FnClassifier<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnClassifier")
    }
}

impl<F> Classifier for FnClassifier<F>
where
    F: Fn(&Patch<'_>) -> Result<Verdict>,
{
    fn classify(&self, patch: &Patch<'_>) -> Result<Verdict> {
        (self.0)(patch)
    }
}

/// Wrap a closure as a classifier.
pub fn classify_fn<F>(f: F) -> FnClassifier<F>
where
    F: Fn(&Patch<'_>) -> Result<Verdict>,
{
    FnClassifier(f)
}
