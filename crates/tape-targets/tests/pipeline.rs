//! End-to-end pipeline tests over a fully synthetic scene: the target
//! model is projected through a known camera at a staged distance, the
//! projections become the contour list and an anti-aliased mask, and the
//! recovered telemetry is checked against the staged ground truth.

use std::fs;
use std::path::Path;

use image::RgbImage;
use nalgebra::{Point2, Point3, Rotation3, Vector3};

use tape_targets::core::BinaryImage;
use tape_targets::pose::CalibrationFile;
use tape_targets::strip::{StripConstants, TargetModel};
use tape_targets::{
    PipelineError, PipelineParams, PrecomputedSegmenter, Segmentation, TapePipeline,
    TelemetryWriter,
};

const FX: f64 = 600.0;
const CX: f64 = 320.0;
const CY: f64 = 240.0;
const DISTANCE: f64 = 48.0;

fn write_calibration(dir: &Path, width: u32, height: u32) {
    let file = CalibrationFile {
        camera_matrix: [[FX, 0.0, CX], [0.0, FX, CY], [0.0, 0.0, 1.0]],
        distortion_coefficients: vec![0.0; 5],
    };
    fs::write(
        dir.join(format!("calibration{width}x{height}.json")),
        serde_json::to_string_pretty(&file).unwrap(),
    )
    .unwrap();
}

fn project(rot: &Rotation3<f64>, t: &Vector3<f64>, p: &Point3<f64>) -> Point2<f64> {
    let pc = rot * p.coords + t;
    Point2::new(FX * pc.x / pc.z + CX, FX * pc.y / pc.z + CY)
}

/// Fill a convex polygon with 4×4 supersampled coverage, blended in with
/// max() so neighbouring shapes compose.
fn fill_convex(mask: &mut BinaryImage, poly: &[Point2<f64>]) {
    let min_x = poly.iter().map(|p| p.x).fold(f64::INFINITY, f64::min).floor() as i64 - 1;
    let max_x = poly.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max).ceil() as i64 + 1;
    let min_y = poly.iter().map(|p| p.y).fold(f64::INFINITY, f64::min).floor() as i64 - 1;
    let max_y = poly.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max).ceil() as i64 + 1;

    for y in min_y.max(0)..=max_y.min(mask.height as i64 - 1) {
        for x in min_x.max(0)..=max_x.min(mask.width as i64 - 1) {
            let mut hits = 0u32;
            for sy in 0..4 {
                for sx in 0..4 {
                    let px = x as f64 + (sx as f64 + 0.5) / 4.0;
                    let py = y as f64 + (sy as f64 + 0.5) / 4.0;
                    if inside_convex(poly, px, py) {
                        hits += 1;
                    }
                }
            }
            let v = ((hits * 255) / 16) as u8;
            let idx = y as usize * mask.width + x as usize;
            mask.data[idx] = mask.data[idx].max(v);
        }
    }
}

fn inside_convex(poly: &[Point2<f64>], x: f64, y: f64) -> bool {
    let mut sign = 0.0f64;
    for i in 0..poly.len() {
        let a = poly[i];
        let b = poly[(i + 1) % poly.len()];
        let cross = (b.x - a.x) * (y - a.y) - (b.y - a.y) * (x - a.x);
        if cross.abs() < 1e-12 {
            continue;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if sign != cross.signum() {
            return false;
        }
    }
    true
}

/// Stage the target upright in front of a y-down camera at the given
/// translation and build the segmentation artifacts a thresholding stage
/// would deliver.
fn staged_segmentation(t: &Vector3<f64>) -> Segmentation {
    let model = TargetModel::build(&StripConstants::default());
    // The model's +y is up; the image's +y is down. An upright target in
    // front of the camera is a 180° rotation about the camera x axis.
    let rot = Rotation3::from_euler_angles(std::f64::consts::PI, 0.0, 0.0);

    let mut mask = BinaryImage::new(640, 480);
    let mut contours = Vec::new();
    for strip in [model.left_strip(), model.right_strip()] {
        let quad: Vec<Point2<f64>> = strip.iter().map(|p| project(&rot, t, p)).collect();
        fill_convex(&mut mask, &quad);
        // Contour points come quantized to pixels from the upstream stage.
        contours.push(quad.iter().map(|p| Point2::new(p.x.round(), p.y.round())).collect());
    }

    Segmentation { contours, mask }
}

#[test]
fn staged_target_produces_one_accurate_telemetry_record() {
    let dir = tempfile::tempdir().unwrap();
    write_calibration(dir.path(), 640, 480);

    let t = Vector3::new(0.0, 0.0, DISTANCE);
    let segmenter = PrecomputedSegmenter::new(staged_segmentation(&t));
    let mut pipeline = TapePipeline::new(segmenter, dir.path(), PipelineParams::default());

    let frame = RgbImage::new(640, 480);
    let mut telemetry = TelemetryWriter::new(Vec::new());
    let result = pipeline.process_frame(&frame, &mut telemetry).unwrap();

    assert_eq!(result.contour_count, 2);
    assert_eq!(result.candidate_count, 1);
    assert_eq!(result.observations.len(), 1);

    let observation = &result.observations[0];
    assert!(
        (observation.distance - DISTANCE).abs() < DISTANCE * 0.02,
        "distance {:.2} should be within 2% of {DISTANCE}",
        observation.distance
    );
    assert!(observation.lateral.abs() < 1.0);
    assert!((observation.depth - DISTANCE).abs() < DISTANCE * 0.02);

    let output = String::from_utf8(telemetry.into_inner()).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].starts_with("RDIST "), "got {:?}", lines[0]);
    let fields: Vec<&str> = lines[0]["RDIST ".len()..].split(',').collect();
    assert_eq!(fields.len(), 3);
    let reported: f64 = fields[0].parse().unwrap();
    assert!((reported - observation.distance).abs() < 0.01);

    // The overlay carries the green descriptor outlines for the drivers.
    let green = image::Rgb([0u8, 255, 0]);
    assert!(result.overlay.pixels().any(|p| *p == green));
}

#[test]
fn laterally_offset_target_reports_the_offset() {
    let dir = tempfile::tempdir().unwrap();
    write_calibration(dir.path(), 640, 480);

    let t = Vector3::new(8.0, 0.0, 75.0);
    let segmenter = PrecomputedSegmenter::new(staged_segmentation(&t));
    let mut pipeline = TapePipeline::new(segmenter, dir.path(), PipelineParams::default());

    let frame = RgbImage::new(640, 480);
    let mut telemetry = TelemetryWriter::new(Vec::new());
    let result = pipeline.process_frame(&frame, &mut telemetry).unwrap();

    assert_eq!(result.observations.len(), 1);
    let observation = &result.observations[0];
    let expected = (8.0f64.powi(2) + 75.0f64.powi(2)).sqrt();
    assert!((observation.distance - expected).abs() < expected * 0.02);
    assert!((observation.lateral - 8.0).abs() < 1.5);
}

#[test]
fn missing_calibration_is_fatal_not_a_default() {
    let dir = tempfile::tempdir().unwrap(); // no artifacts inside

    let t = Vector3::new(0.0, 0.0, DISTANCE);
    let segmenter = PrecomputedSegmenter::new(staged_segmentation(&t));
    let mut pipeline = TapePipeline::new(segmenter, dir.path(), PipelineParams::default());

    let frame = RgbImage::new(640, 480);
    let mut telemetry = TelemetryWriter::new(Vec::new());
    let err = pipeline.process_frame(&frame, &mut telemetry).unwrap_err();
    assert!(matches!(err, PipelineError::Calibration(_)));
    assert!(String::from_utf8(telemetry.into_inner()).unwrap().is_empty());
}

#[test]
fn empty_frames_pass_through_without_calibration_or_telemetry() {
    // No artifacts on disk either: with zero candidates the pipeline
    // must not even try to load calibration.
    let dir = tempfile::tempdir().unwrap();
    let segmenter = PrecomputedSegmenter::new(Segmentation {
        contours: Vec::new(),
        mask: BinaryImage::new(640, 480),
    });
    let mut pipeline = TapePipeline::new(segmenter, dir.path(), PipelineParams::default());

    let frame = RgbImage::new(640, 480);
    let mut telemetry = TelemetryWriter::new(Vec::new());
    let result = pipeline.process_frame(&frame, &mut telemetry).unwrap();
    assert_eq!(result.candidate_count, 0);
    assert!(result.observations.is_empty());
    assert!(String::from_utf8(telemetry.into_inner()).unwrap().is_empty());
}
