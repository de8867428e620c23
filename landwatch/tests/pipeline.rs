use image::{Rgb, RgbImage};
use landwatch::core_modules::codec;
use landwatch::core_modules::visualizer::VisualizationKind;
use landwatch::pipeline::{Cause, RiskLevel, Severity};
use landwatch::{ChangeDetectionPipeline, Error};

fn flat(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

fn paint(image: &mut RgbImage, x0: u32, y0: u32, side: u32, value: u8) {
    for y in y0..y0 + side {
        for x in x0..x0 + side {
            image.put_pixel(x, y, Rgb([value, value, value]));
        }
    }
}

fn textured(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 13 + y * 7) % 256) as u8,
            ((x * 3) % 256) as u8,
            ((y * 11) % 256) as u8,
        ])
    })
}

#[test]
fn identical_inputs_give_an_empty_low_risk_report() {
    let image = textured(160, 120);
    let result = ChangeDetectionPipeline::default()
        .analyze(image.clone(), image)
        .unwrap();
    assert!(result.deviations.is_empty());
    assert_eq!(result.summary.changed_area_pixels, 0);
    assert_eq!(result.summary.change_percentage, 0.0);
    assert_eq!(result.summary.risk_level, RiskLevel::Low);
    assert_eq!(result.recommendations().len(), 1);
}

#[test]
fn repeated_runs_agree_except_for_the_id() {
    let reference = flat(300, 300, 200);
    let mut current = reference.clone();
    paint(&mut current, 40, 40, 50, 90);
    paint(&mut current, 180, 200, 30, 150);

    let pipeline = ChangeDetectionPipeline::default();
    let first = pipeline.analyze(reference.clone(), current.clone()).unwrap();
    let second = pipeline.analyze(reference, current).unwrap();

    assert_eq!(first.deviations, second.deviations);
    assert_eq!(first.summary, second.summary);
    assert_eq!(first.visualizations, second.visualizations);
}

#[test]
fn darkened_block_reads_as_encroachment() {
    let reference = flat(1000, 1000, 200);
    let mut current = reference.clone();
    paint(&mut current, 450, 450, 100, 100);

    let result = ChangeDetectionPipeline::default()
        .analyze(reference, current)
        .unwrap();

    assert_eq!(result.deviations.len(), 1);
    let deviation = &result.deviations[0];
    assert_eq!(deviation.id, "D1");
    assert_eq!(deviation.cause, Cause::EncroachmentOrConstruction);
    assert!(
        (9_500..=10_800).contains(&deviation.area_pixels),
        "area {}",
        deviation.area_pixels
    );
    // Roughly 1 % of the image puts it at Medium at least; the strong contrast pushes it up.
    assert!(deviation.avg_change_intensity > 80.0);
    assert_eq!(deviation.severity, Severity::Critical);
    assert_eq!(result.summary.risk_level, RiskLevel::Critical);
    assert!(result.summary.change_percentage > 0.9 && result.summary.change_percentage < 1.1);
    assert_eq!(result.summary.image_dimensions, "1000x1000");
}

#[test]
fn change_must_exceed_the_threshold() {
    let reference = flat(300, 300, 200);

    let mut at_threshold = reference.clone();
    paint(&mut at_threshold, 100, 100, 60, 170);
    let quiet = ChangeDetectionPipeline::default()
        .analyze(reference.clone(), at_threshold)
        .unwrap();
    assert!(quiet.deviations.is_empty());
    assert_eq!(quiet.summary.changed_area_pixels, 0);

    let mut above = reference.clone();
    paint(&mut above, 100, 100, 60, 169);
    let flagged = ChangeDetectionPipeline::default()
        .analyze(reference, above)
        .unwrap();
    assert_eq!(flagged.deviations.len(), 1);
}

#[test]
fn specks_under_the_noise_floor_are_dropped() {
    let reference = flat(1000, 1000, 200);
    let mut current = reference.clone();
    // About 0.05 % of the image.
    paint(&mut current, 100, 100, 22, 80);
    // Comfortably above the floor.
    paint(&mut current, 600, 600, 40, 80);

    let result = ChangeDetectionPipeline::default()
        .analyze(reference, current)
        .unwrap();

    assert_eq!(result.deviations.len(), 1);
    assert_eq!(result.deviations[0].bounding_box.x, 599);
    // The dropped speck still counts toward the changed area.
    assert!(result.summary.changed_area_pixels > result.deviations[0].area_pixels);
}

#[test]
fn stronger_regions_are_listed_first() {
    let reference = flat(400, 400, 200);
    let mut current = reference.clone();
    paint(&mut current, 20, 20, 20, 160);
    paint(&mut current, 200, 200, 60, 60);

    let result = ChangeDetectionPipeline::default()
        .analyze(reference, current)
        .unwrap();

    let ids: Vec<&str> = result.deviations.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["D2", "D1"]);
    assert_eq!(result.deviations[0].severity, Severity::Critical);
    assert_eq!(result.deviations[1].severity, Severity::Low);

    for pair in result.deviations.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.severity.rank() <= b.severity.rank());
        if a.severity == b.severity {
            assert!(a.discovery_index < b.discovery_index);
        }
    }
    for deviation in &result.deviations {
        assert!(deviation.area_pixels <= deviation.bounding_box.area());
        assert!(deviation.bounding_box.fits_within(400, 400));
    }
}

#[test]
fn current_is_resampled_onto_the_reference_grid() {
    let pipeline = ChangeDetectionPipeline::default();

    let larger = pipeline.analyze(flat(200, 150, 90), flat(400, 300, 90)).unwrap();
    assert_eq!(larger.summary.image_dimensions, "200x150");
    assert!(larger.deviations.is_empty());

    let smaller = pipeline.analyze(flat(200, 150, 90), flat(100, 75, 90)).unwrap();
    assert_eq!(smaller.summary.image_dimensions, "200x150");
    assert!(smaller.deviations.is_empty());
    assert_eq!(
        smaller.visualizations.unwrap().overlay.dimensions(),
        (200, 150)
    );
}

#[test]
fn bad_current_bytes_are_reported_as_a_decode_error() {
    let reference = codec::encode_png(&flat(20, 20, 10)).unwrap();
    let err = ChangeDetectionPipeline::default()
        .analyze_bytes(&reference, b"\x89PNG but not really")
        .unwrap_err();
    assert!(matches!(err, Error::Decode { role: "current", .. }));
    assert!(err.is_input_error());
}

#[test]
fn every_visualization_encodes_to_jpeg() {
    let reference = flat(120, 120, 200);
    let mut current = reference.clone();
    paint(&mut current, 30, 40, 30, 40);
    let result = ChangeDetectionPipeline::default()
        .analyze(reference, current)
        .unwrap();

    for kind in VisualizationKind::ALL {
        let bytes = result.encode_visualization(kind, 85).unwrap().unwrap();
        let decoded = codec::decode("current", &bytes).unwrap();
        assert_eq!(decoded.dimensions(), (120, 120), "{kind}");
    }
}
