use image::{GenericImageView, GrayImage, Luma};
use slidescan_core::{
    DetectionCandidate, DetectionSet, DetectorConfig, GreedyNms, LevelView, PyramidConfig,
    ScanConfig, ScanObserver, Scanner, Size, SlidingWindowDetector, Suppression, Verdict,
    WindowEvent, classify_fn, level_sizes,
};
use slidescan_utils::config::{AppSettings, ResizeQuality};

fn scan_config(window: (u32, u32), step: (u32, u32), scale: f64, min: (u32, u32)) -> ScanConfig {
    ScanConfig {
        window: Size::from(window),
        step: Size::from(step),
        pyramid: PyramidConfig {
            scale_factor: scale,
            min_size: Size::from(min),
            resize_quality: ResizeQuality::Quality,
        },
        detection_threshold: 0.5,
    }
}

fn gradient_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| Luma([((x * 3 + y * 5) % 256) as u8]))
}

#[derive(Default)]
struct Recorder {
    levels: Vec<(u32, f64, u32, u32)>,
    windows: Vec<WindowEvent>,
}

impl ScanObserver for Recorder {
    fn on_level(&mut self, level: &LevelView<'_>) {
        let (width, height) = level.image.dimensions();
        self.levels.push((level.scale_index, level.scale, width, height));
    }

    fn on_window(&mut self, event: &WindowEvent) {
        self.windows.push(*event);
    }
}

#[test]
fn regression_scenario_walks_every_level() {
    let config = scan_config((64, 64), (32, 32), 1.25, (64, 64));
    let widths: Vec<u32> = level_sizes(200, 200, config.pyramid)
        .into_iter()
        .map(|(w, _)| w)
        .collect();
    assert_eq!(widths, vec![200, 160, 128, 102, 81, 64]);

    let scanner = Scanner::new(config).expect("valid config");
    let image = gradient_image(200, 200);
    let accept_all = classify_fn(|_| Ok(Verdict::positive(1.0)));
    let mut recorder = Recorder::default();

    let mut scan = scanner.scan_observed(&image, &accept_all, &mut recorder);
    let candidates = DetectionSet::collect(&mut scan).expect("scan");
    let stats = scan.stats();
    drop(scan);

    assert_eq!(stats.levels_scanned, 6);
    assert_eq!(stats.windows_classified, 25 + 16 + 9 + 4 + 1 + 1);
    assert_eq!(stats.windows_skipped, 119 - 56);
    assert_eq!(candidates.len(), 56);

    let indices: Vec<u32> = recorder.levels.iter().map(|level| level.0).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    let last = candidates.as_slice().last().expect("candidate on last level");
    // 64 * 1.25^5 = 195.31
    assert_eq!((last.x, last.y, last.width, last.height), (0, 0, 195, 195));
}

#[test]
fn level_zero_is_the_original_image() {
    let scanner = Scanner::new(scan_config((8, 8), (8, 8), 2.0, (8, 8))).expect("valid config");
    let image = gradient_image(32, 16);
    let mut seen = Vec::new();
    let classify = classify_fn(|patch| {
        if patch.dimensions() == (8, 8) {
            Ok(Verdict::negative(0.0))
        } else {
            anyhow::bail!("unexpected patch size {:?}", patch.dimensions())
        }
    });

    struct FirstLevel<'a>(&'a mut Vec<u8>);
    impl ScanObserver for FirstLevel<'_> {
        fn on_level(&mut self, level: &LevelView<'_>) {
            if level.scale_index == 0 {
                self.0.extend_from_slice(level.image.as_raw());
            }
        }
    }

    let scan = scanner.scan_observed(&image, &classify, FirstLevel(&mut seen));
    assert_eq!(scan.count(), 0);
    assert_eq!(seen, image.as_raw().clone());
}

#[test]
fn pyramid_level_count_matches_floor_chain() {
    for (width, height, scale, min) in [
        (640, 480, 1.25, (100, 40)),
        (300, 120, 1.5, (64, 64)),
        (1000, 50, 2.0, (10, 10)),
        (90, 90, 1.1, (90, 90)),
    ] {
        let config = scan_config((1, 1), (1, 1), scale, min).pyramid;
        let sizes = level_sizes(width, height, config);

        assert_eq!(sizes[0], (width, height));
        for pair in sizes.windows(2) {
            let (prev_w, prev_h) = pair[0];
            let (w, h) = pair[1];
            assert_eq!(w, (f64::from(prev_w) / scale).floor() as u32);
            assert_eq!(u64::from(h), u64::from(prev_h) * u64::from(w) / u64::from(prev_w));
            assert!(w >= min.0 && h >= min.1);
        }
        let &(last_w, last_h) = sizes.last().expect("at least one level");
        let next_w = (f64::from(last_w) / scale).floor() as u32;
        let next_h = (u64::from(last_h) * u64::from(next_w) / u64::from(last_w)) as u32;
        assert!(next_w < min.0 || next_h < min.1, "stopped too early at {last_w}x{last_h}");
    }
}

#[test]
fn truncated_trailing_windows_are_never_classified() {
    let scanner =
        Scanner::new(scan_config((50, 40), (50, 40), 1.25, (50, 40))).expect("valid config");
    let image = gradient_image(50, 100);
    let classify = classify_fn(|patch| {
        assert_eq!(patch.dimensions(), (50, 40), "truncated patch reached classifier");
        Ok(Verdict::positive(1.0))
    });
    let mut recorder = Recorder::default();

    let mut scan = scanner.scan_observed(&image, &classify, &mut recorder);
    let candidates = DetectionSet::collect(&mut scan).expect("scan");
    assert_eq!(scan.stats().windows_skipped, 1);
    drop(scan);

    let classified_rows: Vec<u32> = recorder.windows.iter().map(|event| event.y).collect();
    assert_eq!(classified_rows, vec![0, 40]);
    let ys: Vec<u32> = candidates.iter().map(|c| c.y).collect();
    assert_eq!(ys, vec![0, 40]);
}

#[test]
fn undersized_level_stops_the_whole_scan() {
    // Level 1 is 80x56: too short for a 60x60 window, although the
    // pyramid itself would continue down to the 10x10 floor.
    let config = scan_config((60, 60), (20, 20), 1.25, (10, 10));
    assert!(level_sizes(100, 70, config.pyramid).len() > 2);

    let scanner = Scanner::new(config).expect("valid config");
    let image = gradient_image(100, 70);
    let accept_all = classify_fn(|_| Ok(Verdict::positive(1.0)));
    let mut recorder = Recorder::default();

    let count = scanner
        .scan_observed(&image, &accept_all, &mut recorder)
        .count();
    assert_eq!(recorder.levels.len(), 1);
    // x = 0, 20, 40 on the single row that fits.
    assert_eq!(count, 3);
}

#[test]
fn rescaled_boxes_stay_inside_the_original() {
    for (width, height, scale) in [(200, 200, 1.25), (333, 157, 1.3), (641, 479, 1.5)] {
        let config = scan_config((48, 32), (12, 8), scale, (48, 32));
        let scanner = Scanner::new(config).expect("valid config");
        let image = gradient_image(width, height);
        let accept_all = classify_fn(|_| Ok(Verdict::positive(1.0)));
        let mut recorder = Recorder::default();

        let candidates: Vec<DetectionCandidate> = scanner
            .scan_observed(&image, &accept_all, &mut recorder)
            .collect::<Result<_, _>>()
            .expect("scan");
        assert_eq!(candidates.len(), recorder.windows.len());

        for (candidate, event) in candidates.iter().zip(&recorder.windows) {
            assert!(
                candidate.is_within(width, height),
                "{candidate:?} escapes {width}x{height}"
            );
            let factor = scale.powi(event.scale_index as i32);
            let exact_x = f64::from(event.x) * factor;
            let exact_y = f64::from(event.y) * factor;
            let exact_right = (f64::from(event.x) + 48.0) * factor;
            let exact_bottom = (f64::from(event.y) + 32.0) * factor;
            assert!((f64::from(candidate.x) - exact_x).abs() <= 1.0);
            assert!((f64::from(candidate.y) - exact_y).abs() <= 1.0);
            assert!((candidate.right() as f64 - exact_right).abs() <= 1.0 + 1e-9);
            assert!((candidate.bottom() as f64 - exact_bottom).abs() <= 1.0 + 1e-9);
        }
    }
}

#[test]
fn raising_the_threshold_never_adds_candidates() {
    let image = gradient_image(160, 120);
    let mean_brightness = classify_fn(|patch| {
        let (w, h) = patch.dimensions();
        let sum: u32 = patch.pixels().map(|(_, _, p)| u32::from(p.0[0])).sum();
        Ok(Verdict::positive(sum as f32 / (w * h) as f32 / 255.0))
    });

    let mut previous = usize::MAX;
    for threshold in [0.0, 0.2, 0.4, 0.45, 0.5, 0.55, 0.6, 0.8, 1.0] {
        let mut config = scan_config((32, 32), (8, 8), 1.25, (32, 32));
        config.detection_threshold = threshold;
        let scanner = Scanner::new(config).expect("valid config");
        let count = scanner.scan(&image, &mean_brightness).count();
        assert!(count <= previous, "threshold {threshold} produced {count} > {previous}");
        previous = count;
    }
}

#[test]
fn image_smaller_than_window_is_an_empty_result() {
    let scanner = Scanner::new(scan_config((64, 64), (32, 32), 1.25, (64, 64))).expect("valid config");
    let image = gradient_image(50, 50);
    let accept_all = classify_fn(|_| Ok(Verdict::positive(1.0)));

    let mut scan = scanner.scan(&image, &accept_all);
    let set = DetectionSet::collect(&mut scan).expect("no error for small images");
    assert!(set.is_empty());
    assert_eq!(scan.stats().levels_scanned, 0);
}

#[test]
fn single_candidate_survives_suppression() {
    let candidate = DetectionCandidate::new(7, 9, 100, 40, 0.51);
    let set = DetectionSet::from(vec![candidate]).suppress(&GreedyNms, 0.0);
    assert_eq!(set.as_slice(), &[candidate]);
    assert_eq!(GreedyNms.suppress(vec![candidate], 1.0), vec![candidate]);
}

#[test]
fn classifier_failure_aborts_only_the_current_image() {
    let mut settings = AppSettings::default();
    settings.window.width = 16;
    settings.window.height = 16;
    settings.window.step_x = 16;
    settings.window.step_y = 16;
    settings.pyramid.min_width = 16;
    settings.pyramid.min_height = 16;

    // Fails on dark windows only.
    let classifier = classify_fn(|patch| {
        let (_, _, pixel) = patch.pixels().next().expect("non-empty patch");
        anyhow::ensure!(pixel.0[0] > 10, "dark window");
        Ok(Verdict::positive(1.0))
    });
    let detector = SlidingWindowDetector::new(DetectorConfig::from(&settings), classifier)
        .expect("detector");

    let dark = GrayImage::from_pixel(32, 32, Luma([0]));
    let bright = GrayImage::from_pixel(32, 32, Luma([255]));

    assert!(detector.detect_image(&dark).is_err());
    let output = detector.detect_image(&bright).expect("next image still works");
    assert!(!output.detections.is_empty());
}
