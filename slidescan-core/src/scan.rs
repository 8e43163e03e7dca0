//! Multi-scale scan: pyramid levels × sliding windows × classifier.
//!
//! [`Scan`] is a lazy iterator of accepted candidates. For each pyramid level
//! it walks the window grid, skips windows truncated at the border, asks the
//! classifier about the rest and maps accepted windows back to original-image
//! coordinates. A level smaller than the window ends the whole scan, since
//! every later level is smaller still.

use std::borrow::Cow;

use image::{GenericImageView, GrayImage};
use log::debug;
use slidescan_utils::config::AppSettings;

use crate::{
    candidate::DetectionCandidate,
    classifier::{Classifier, Verdict},
    error::ScanError,
    pyramid::{Pyramid, PyramidConfig, pyramid},
    window::{Size, WindowGrid, crop_window},
};

/// Rounding each rescaled coordinate can push a box one pixel past the
/// original border before clamping.
const GEOMETRY_TOLERANCE: u64 = 1;

/// Parameters of one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanConfig {
    pub window: Size,
    pub step: Size,
    pub pyramid: PyramidConfig,
    /// Minimum confidence for a positive window to become a candidate.
    pub detection_threshold: f32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig::from(&AppSettings::default())
    }
}

impl From<&AppSettings> for ScanConfig {
    fn from(settings: &AppSettings) -> Self {
        Self {
            window: Size::new(settings.window.width, settings.window.height),
            step: Size::new(settings.window.step_x, settings.window.step_y),
            pyramid: PyramidConfig::from(&settings.pyramid),
            detection_threshold: settings.detection.score_threshold,
        }
    }
}

impl ScanConfig {
    /// Reject parameters that would make the scan meaningless or endless.
    pub fn validate(&self) -> Result<(), ScanError> {
        let invalid = |message: String| Err(ScanError::Configuration(message));
        if self.window.is_empty() {
            return invalid(format!(
                "window size must be positive (got {}x{})",
                self.window.width, self.window.height
            ));
        }
        if self.step.is_empty() {
            return invalid(format!(
                "step must be positive (got {}x{})",
                self.step.width, self.step.height
            ));
        }
        let factor = self.pyramid.scale_factor;
        if !factor.is_finite() || factor <= 1.0 {
            return invalid(format!("pyramid scale factor must exceed 1.0 (got {factor})"));
        }
        if self.pyramid.min_size.is_empty() {
            return invalid(format!(
                "pyramid minimum size must be positive (got {}x{})",
                self.pyramid.min_size.width, self.pyramid.min_size.height
            ));
        }
        if !self.detection_threshold.is_finite() {
            return invalid(format!(
                "detection threshold must be finite (got {})",
                self.detection_threshold
            ));
        }
        Ok(())
    }
}

/// Counters collected while a scan runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanStats {
    pub levels_scanned: u32,
    pub windows_classified: usize,
    /// Windows truncated at a level border and never classified.
    pub windows_skipped: usize,
    pub candidates_accepted: usize,
}

/// Pyramid level as seen by a [`ScanObserver`].
pub struct LevelView<'a> {
    pub scale_index: u32,
    /// Cumulative scale relative to the original image.
    pub scale: f64,
    pub image: &'a GrayImage,
}

/// Outcome of one classified window, in level coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowEvent {
    pub scale_index: u32,
    pub x: u32,
    pub y: u32,
    pub verdict: Verdict,
    pub accepted: bool,
}

/// Read-only side channel for progress reporting and debugging overlays.
///
/// Observers cannot influence which candidates a scan yields.
pub trait ScanObserver {
    fn on_level(&mut self, _level: &LevelView<'_>) {}
    fn on_window(&mut self, _event: &WindowEvent) {}
}

impl<O: ScanObserver + ?Sized> ScanObserver for &mut O {
    fn on_level(&mut self, level: &LevelView<'_>) {
        (**self).on_level(level);
    }

    fn on_window(&mut self, event: &WindowEvent) {
        (**self).on_window(event);
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ScanObserver for NoopObserver {}

/// Validated scan configuration, ready to scan any number of images.
#[derive(Debug, Clone)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Start a lazy scan of `image`.
    pub fn scan<'a, C>(&'a self, image: &'a GrayImage, classifier: &'a C) -> Scan<'a, C>
    where
        C: Classifier + ?Sized,
    {
        self.scan_observed(image, classifier, NoopObserver)
    }

    /// Start a lazy scan that reports every level and classified window to
    /// `observer`.
    pub fn scan_observed<'a, C, O>(
        &'a self,
        image: &'a GrayImage,
        classifier: &'a C,
        observer: O,
    ) -> Scan<'a, C, O>
    where
        C: Classifier + ?Sized,
        O: ScanObserver,
    {
        Scan {
            config: &self.config,
            original: image.dimensions(),
            classifier,
            levels: pyramid(image, self.config.pyramid),
            current: None,
            observer,
            stats: ScanStats::default(),
            done: false,
        }
    }
}

struct ActiveLevel<'a> {
    scale_index: u32,
    scale: f64,
    image: Cow<'a, GrayImage>,
    grid: WindowGrid,
    classified: usize,
    accepted: usize,
}

/// Lazy stream of accepted candidates for one image.
///
/// Yields candidates level by level, row-major within a level. The first
/// classifier failure is yielded as an error and ends the stream.
pub struct Scan<'a, C: ?Sized, O = NoopObserver> {
    config: &'a ScanConfig,
    original: (u32, u32),
    classifier: &'a C,
    levels: Pyramid<'a>,
    current: Option<ActiveLevel<'a>>,
    observer: O,
    stats: ScanStats,
    done: bool,
}

impl<C: ?Sized, O> Scan<'_, C, O> {
    /// Counters so far; final once the iterator is exhausted.
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Give back the observer, e.g. to read what it collected.
    pub fn into_observer(self) -> O {
        self.observer
    }
}

impl<C, O> Scan<'_, C, O>
where
    C: Classifier + ?Sized,
    O: ScanObserver,
{
    fn advance_level(&mut self) {
        let Some(level) = self.levels.next() else {
            self.finish();
            return;
        };
        let (width, height) = level.dimensions();
        let window = self.config.window;
        if !window.fits_within(width, height) {
            debug!(
                "scale {} ({}x{}) is smaller than the {}x{} window; stopping",
                level.scale_index, width, height, window.width, window.height
            );
            self.finish();
            return;
        }

        let scale = self.config.pyramid.level_scale(level.scale_index);
        self.stats.levels_scanned += 1;
        self.observer.on_level(&LevelView {
            scale_index: level.scale_index,
            scale,
            image: &level.image,
        });
        self.current = Some(ActiveLevel {
            scale_index: level.scale_index,
            scale,
            image: level.image,
            grid: WindowGrid::new(width, height, self.config.step),
            classified: 0,
            accepted: 0,
        });
    }

    fn finish(&mut self) {
        self.done = true;
        self.current = None;
        debug!(
            "scan finished: {} level(s), {} window(s) classified, {} skipped, {} candidate(s)",
            self.stats.levels_scanned,
            self.stats.windows_classified,
            self.stats.windows_skipped,
            self.stats.candidates_accepted
        );
    }
}

impl<C, O> Iterator for Scan<'_, C, O>
where
    C: Classifier + ?Sized,
    O: ScanObserver,
{
    type Item = Result<DetectionCandidate, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some(level) = self.current.as_mut() else {
                self.advance_level();
                continue;
            };
            let Some((x, y)) = level.grid.next() else {
                debug!(
                    "scale {} ({}x{}, x{:.3}): {} of {} window(s) accepted",
                    level.scale_index,
                    level.image.width(),
                    level.image.height(),
                    level.scale,
                    level.accepted,
                    level.classified
                );
                self.current = None;
                continue;
            };

            let window = self.config.window;
            let patch = crop_window(&level.image, x, y, window);
            if patch.dimensions() != (window.width, window.height) {
                self.stats.windows_skipped += 1;
                continue;
            }

            self.stats.windows_classified += 1;
            level.classified += 1;
            let scale_index = level.scale_index;
            let verdict = match self.classifier.classify(&patch).and_then(check_verdict) {
                Ok(verdict) => verdict,
                Err(source) => {
                    self.done = true;
                    return Some(Err(ScanError::Classification {
                        scale_index,
                        x,
                        y,
                        source,
                    }));
                }
            };

            let accepted =
                verdict.is_positive() && verdict.confidence >= self.config.detection_threshold;
            self.observer.on_window(&WindowEvent {
                scale_index,
                x,
                y,
                verdict,
                accepted,
            });
            if !accepted {
                continue;
            }

            level.accepted += 1;
            self.stats.candidates_accepted += 1;
            let candidate = rescale_window(
                x,
                y,
                window,
                level.scale,
                self.original,
                verdict.confidence,
            );
            log::trace!(
                "candidate at scale {scale_index}: ({x}, {y}) -> ({}, {}, {}x{}) conf {:.3}",
                candidate.x,
                candidate.y,
                candidate.width,
                candidate.height,
                candidate.confidence
            );
            return Some(Ok(candidate));
        }
        None
    }
}

impl<C, O> std::iter::FusedIterator for Scan<'_, C, O>
where
    C: Classifier + ?Sized,
    O: ScanObserver,
{
}

fn check_verdict(verdict: Verdict) -> anyhow::Result<Verdict> {
    anyhow::ensure!(
        verdict.confidence.is_finite(),
        "classifier returned non-finite confidence {}",
        verdict.confidence
    );
    Ok(verdict)
}

/// Map a window at `(x, y)` of a level with cumulative `scale` back onto the
/// original image, clamped to its bounds.
pub(crate) fn rescale_window(
    x: u32,
    y: u32,
    window: Size,
    scale: f64,
    (original_width, original_height): (u32, u32),
    confidence: f32,
) -> DetectionCandidate {
    let map = |value: u32| (f64::from(value) * scale).round() as u32;
    let (left, top) = (map(x), map(y));
    let (width, height) = (map(window.width), map(window.height));

    debug_assert!(
        u64::from(left) + u64::from(width) <= u64::from(original_width) + GEOMETRY_TOLERANCE,
        "rescaled box overshoots image width: {left}+{width} > {original_width}"
    );
    debug_assert!(
        u64::from(top) + u64::from(height) <= u64::from(original_height) + GEOMETRY_TOLERANCE,
        "rescaled box overshoots image height: {top}+{height} > {original_height}"
    );

    let left = left.min(original_width);
    let top = top.min(original_height);
    DetectionCandidate::new(
        left,
        top,
        width.min(original_width - left),
        height.min(original_height - top),
        confidence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify_fn;
    use image::Luma;
    use slidescan_utils::config::ResizeQuality;

    fn tiny_config() -> ScanConfig {
        ScanConfig {
            window: Size::new(16, 16),
            step: Size::new(16, 16),
            pyramid: PyramidConfig {
                scale_factor: 2.0,
                min_size: Size::new(16, 16),
                resize_quality: ResizeQuality::Speed,
            },
            detection_threshold: 0.5,
        }
    }

    #[test]
    fn validate_rejects_degenerate_parameters() {
        let mut config = tiny_config();
        config.step = Size::new(0, 4);
        assert!(matches!(config.validate(), Err(ScanError::Configuration(_))));

        let mut config = tiny_config();
        config.pyramid.scale_factor = 1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("scale factor"));

        let mut config = tiny_config();
        config.window = Size::new(16, 0);
        assert!(Scanner::new(config).is_err());

        let mut config = tiny_config();
        config.detection_threshold = f32::NAN;
        assert!(config.validate().is_err());

        assert!(tiny_config().validate().is_ok());
    }

    #[test]
    fn every_full_window_on_every_level_is_reported() {
        let scanner = Scanner::new(tiny_config()).expect("valid config");
        let image = GrayImage::from_pixel(32, 32, Luma([128]));
        let accept_all = classify_fn(|_| Ok(Verdict::positive(1.0)));

        let mut scan = scanner.scan(&image, &accept_all);
        let candidates: Vec<_> = scan.by_ref().collect::<Result<_, _>>().expect("scan");

        let boxes: Vec<_> = candidates
            .iter()
            .map(|c| (c.x, c.y, c.width, c.height))
            .collect();
        assert_eq!(
            boxes,
            vec![
                (0, 0, 16, 16),
                (16, 0, 16, 16),
                (0, 16, 16, 16),
                (16, 16, 16, 16),
                (0, 0, 32, 32),
            ]
        );
        assert_eq!(
            scan.stats(),
            ScanStats {
                levels_scanned: 2,
                windows_classified: 5,
                windows_skipped: 0,
                candidates_accepted: 5,
            }
        );
    }

    #[test]
    fn truncated_windows_are_skipped_without_classification() {
        let mut config = tiny_config();
        config.step = Size::new(8, 8);
        let scanner = Scanner::new(config).expect("valid config");
        let image = GrayImage::new(24, 16);
        let classify = classify_fn(|patch| {
            assert_eq!(patch.dimensions(), (16, 16));
            Ok(Verdict::negative(0.0))
        });

        let mut scan = scanner.scan(&image, &classify);
        assert_eq!(scan.by_ref().count(), 0);
        let stats = scan.stats();
        // Origins x = 0, 8, 16 and y = 0, 8 on the only level.
        assert_eq!(stats.windows_classified, 2);
        assert_eq!(stats.windows_skipped, 4);
    }

    #[test]
    fn negative_or_low_confidence_windows_are_rejected() {
        let scanner = Scanner::new(tiny_config()).expect("valid config");
        let image = GrayImage::new(16, 16);

        let weak = classify_fn(|_| Ok(Verdict::positive(0.49)));
        assert_eq!(scanner.scan(&image, &weak).count(), 0);

        let at_threshold = classify_fn(|_| Ok(Verdict::positive(0.5)));
        assert_eq!(scanner.scan(&image, &at_threshold).count(), 1);

        let negative = classify_fn(|_| Ok(Verdict::negative(5.0)));
        assert_eq!(scanner.scan(&image, &negative).count(), 0);
    }

    #[test]
    fn image_smaller_than_window_yields_nothing() {
        let scanner = Scanner::new(tiny_config()).expect("valid config");
        let image = GrayImage::new(15, 40);
        let never = classify_fn(|_| -> anyhow::Result<Verdict> {
            panic!("no window fits the image")
        });

        let mut scan = scanner.scan(&image, &never);
        assert!(scan.next().is_none());
        assert_eq!(scan.stats(), ScanStats::default());
    }

    #[test]
    fn classifier_error_is_reported_once_then_fused() {
        let scanner = Scanner::new(tiny_config()).expect("valid config");
        let image = GrayImage::new(32, 32);
        let failing = classify_fn(|_| Err(anyhow::anyhow!("model exploded")));

        let mut scan = scanner.scan(&image, &failing);
        match scan.next() {
            Some(Err(ScanError::Classification {
                scale_index, x, y, ..
            })) => assert_eq!((scale_index, x, y), (0, 0, 0)),
            other => panic!("expected classification error, got {other:?}"),
        }
        assert!(scan.next().is_none());
        assert_eq!(scan.stats().windows_classified, 1);
    }

    #[test]
    fn non_finite_confidence_is_a_classification_error() {
        let scanner = Scanner::new(tiny_config()).expect("valid config");
        let image = GrayImage::new(16, 16);
        let broken = classify_fn(|_| Ok(Verdict::positive(f32::NAN)));

        let first = scanner.scan(&image, &broken).next();
        assert!(matches!(first, Some(Err(ScanError::Classification { .. }))));
    }

    #[derive(Default)]
    struct Recorder {
        levels: Vec<(u32, u32, u32)>,
        windows: usize,
        accepted: usize,
    }

    impl ScanObserver for Recorder {
        fn on_level(&mut self, level: &LevelView<'_>) {
            self.levels
                .push((level.scale_index, level.image.width(), level.image.height()));
        }

        fn on_window(&mut self, event: &WindowEvent) {
            self.windows += 1;
            if event.accepted {
                self.accepted += 1;
            }
        }
    }

    #[test]
    fn observer_sees_levels_and_windows_without_changing_output() {
        let scanner = Scanner::new(tiny_config()).expect("valid config");
        let image = GrayImage::new(32, 32);
        let top_left = classify_fn(|_| Ok(Verdict::positive(0.9)));

        let plain: Vec<_> = scanner
            .scan(&image, &top_left)
            .collect::<Result<_, _>>()
            .expect("scan");

        let mut recorder = Recorder::default();
        let observed: Vec<_> = scanner
            .scan_observed(&image, &top_left, &mut recorder)
            .collect::<Result<_, _>>()
            .expect("scan");

        assert_eq!(plain, observed);
        assert_eq!(recorder.levels, vec![(0, 32, 32), (1, 16, 16)]);
        assert_eq!(recorder.windows, 5);
        assert_eq!(recorder.accepted, 5);
    }

    #[test]
    fn rescale_multiplies_and_rounds() {
        let candidate = rescale_window(8, 4, Size::new(100, 40), 1.5625, (400, 200), 0.8);
        assert_eq!(
            (candidate.x, candidate.y, candidate.width, candidate.height),
            (13, 6, 156, 63)
        );
        assert_eq!(candidate.confidence, 0.8);
    }

    #[test]
    fn rescale_clamps_single_pixel_overshoot() {
        // 3 * 1.5 = 4.5 rounds to 5 and 4 * 1.5 = 6; 5 + 6 = 11 > 10.
        let candidate = rescale_window(3, 0, Size::new(4, 4), 1.5, (10, 10), 1.0);
        assert_eq!((candidate.x, candidate.width), (5, 5));
        assert!(candidate.is_within(10, 10));
    }
}
