use std::sync::Arc;

use log::debug;
use serde::Serialize;

use crate::classifier::Classifier;
use crate::decode::decode;
use crate::error::{Error, Result};
use crate::labels;
use crate::preprocess::preprocess;
use crate::timer::Timer;

/// Message returned to clients for any per-request failure.
pub const PROCESSING_ERROR: &str = "Error in processing the file";

/// Uploaded image as received from a client.
#[derive(Debug, Clone, Default)]
pub struct RawUpload {
    pub data: Vec<u8>,

    /// Content type declared by the client. Advisory only.
    pub content_type: Option<String>,

    pub file_name: Option<String>,
}

impl RawUpload {
    pub fn new(data: Vec<u8>) -> Self {
        RawUpload {
            data,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Class name from the vocabulary
    pub predicted_class: String,

    /// Top score as a percentage, two decimals
    pub confidence: f64,

    /// Remediation advice for the class
    pub solution: String,
}

/// Time spent in each pipeline stage, in milliseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StageTimings {
    pub time_image_load: i64,
    pub time_image_resize: i64,
    pub time_session_run: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub result: PredictionResult,
    pub timings: StageTimings,
}

/// Opaque error body, deliberately free of diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
}

impl Default for ErrorResponse {
    fn default() -> Self {
        ErrorResponse {
            error: PROCESSING_ERROR,
        }
    }
}

/// Runs decode, preprocess and inference for uploads against one shared
/// classifier.
pub struct Predictor {
    classifier: Arc<dyn Classifier>,
}

impl Predictor {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Predictor { classifier }
    }

    pub fn predict(&self, upload: &RawUpload) -> Result<Prediction> {
        let mut timings = StageTimings::default();

        let mut t = Timer::new_start("Load image from memory");
        let pixels = decode(&upload.data)?;
        t.stop();
        timings.time_image_load = t.duration_ms();

        t = Timer::new_start("Resizing image");
        let tensor = preprocess(&pixels, &self.classifier.input_spec())?;
        t.stop();
        timings.time_image_resize = t.duration_ms();

        t = Timer::new_start("Running session");
        let distribution = self.classifier.infer(&tensor)?;
        t.stop();
        timings.time_session_run = t.duration_ms();

        if distribution.len() != labels::NUM_CLASSES {
            return Err(Error::Inference(format!(
                "model produced {} scores, expected {}",
                distribution.len(),
                labels::NUM_CLASSES
            )));
        }

        let best = argmax(&distribution)
            .ok_or_else(|| Error::Inference("model produced no usable scores".to_owned()))?;

        let predicted_class = labels::label(best)
            .ok_or_else(|| Error::Inference(format!("no label for class index {}", best)))?;

        debug!(
            "Scores {:?}, picked {} ({})",
            distribution, best, predicted_class
        );

        Ok(Prediction {
            result: PredictionResult {
                predicted_class: predicted_class.to_owned(),
                confidence: round_confidence(distribution[best]),
                solution: labels::solution_for(predicted_class).to_owned(),
            },
            timings,
        })
    }
}

/// Index of the largest score. Ties go to the lowest index and NaN never
/// wins; `None` when no score is comparable.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (i, &score) in scores.iter().enumerate() {
        if score.is_nan() {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((i, score)),
        }
    }

    best.map(|(i, _)| i)
}

/// `score` as a percentage rounded half away from zero to two decimals,
/// clamped to `[0, 100]`.
pub fn round_confidence(score: f32) -> f64 {
    let percent = (f64::from(score) * 100.0 * 100.0).round() / 100.0;
    percent.max(0.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Distribution;
    use crate::preprocess::{InputSpec, InputTensor};
    use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::Mutex;

    /// Returns fixed scores and remembers the tensor shapes it saw.
    struct FixedClassifier {
        scores: Vec<f32>,
        seen: Mutex<Vec<Vec<u64>>>,
    }

    impl FixedClassifier {
        fn new(scores: &[f32]) -> Arc<Self> {
            Arc::new(FixedClassifier {
                scores: scores.to_vec(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl Classifier for FixedClassifier {
        fn input_spec(&self) -> InputSpec {
            InputSpec::default()
        }

        fn infer(&self, tensor: &InputTensor) -> Result<Distribution> {
            self.seen.lock().unwrap().push(tensor.dims().to_vec());
            Ok(self.scores.clone())
        }
    }

    fn png(image: DynamicImage) -> RawUpload {
        let mut buf = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        RawUpload::new(buf)
    }

    fn rgb_upload(width: u32, height: u32) -> RawUpload {
        png(DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        })))
    }

    #[test]
    fn healthy_prediction() {
        let classifier = FixedClassifier::new(&[0.01, 0.005, 0.9734, 0.01, 0.0016]);
        let predictor = Predictor::new(classifier.clone());

        let prediction = predictor.predict(&rgb_upload(512, 384)).unwrap();

        assert_eq!(prediction.result.predicted_class, "Healthy");
        assert_eq!(prediction.result.confidence, 97.34);
        assert_eq!(prediction.result.solution, labels::solution_for("Healthy"));
        assert_ne!(prediction.result.solution, labels::UNKNOWN_ADVISORY);
        assert_eq!(*classifier.seen.lock().unwrap(), vec![vec![1, 256, 256, 3]]);
    }

    #[test]
    fn bacterial_spot_prediction() {
        let predictor = Predictor::new(FixedClassifier::new(&[0.5, 0.2, 0.1, 0.1, 0.1]));

        let result = predictor.predict(&rgb_upload(300, 300)).unwrap().result;

        assert_eq!(result.predicted_class, "Bacterial Spot");
        assert_eq!(result.confidence, 50.0);
        assert!(result
            .solution
            .starts_with("1. Use certified disease-free seeds."));
    }

    #[test]
    fn grayscale_upload_is_shaped_like_rgb() {
        let classifier = FixedClassifier::new(&[0.1, 0.6, 0.1, 0.1, 0.1]);
        let predictor = Predictor::new(classifier.clone());
        let upload = png(DynamicImage::ImageLuma8(GrayImage::from_pixel(
            40,
            70,
            Luma([200]),
        )));

        let result = predictor.predict(&upload).unwrap().result;

        assert_eq!(result.predicted_class, "Early Blight");
        assert_eq!(*classifier.seen.lock().unwrap(), vec![vec![1, 256, 256, 3]]);
    }

    #[test]
    fn stretched_aspect_ratios_are_well_formed() {
        let predictor = Predictor::new(FixedClassifier::new(&[0.1, 0.1, 0.1, 0.3, 0.4]));

        for upload in &[rgb_upload(512, 256), rgb_upload(256, 512)] {
            let result = predictor.predict(upload).unwrap().result;
            assert!(labels::class_names().any(|c| c == result.predicted_class));
            assert!((0.0..=100.0).contains(&result.confidence));
        }
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let predictor = Predictor::new(FixedClassifier::new(&[0.2, 0.2, 0.2, 0.2, 0.2]));
        let upload = rgb_upload(64, 48);

        let first = predictor.predict(&upload).unwrap().result;
        let second = predictor.predict(&upload).unwrap().result;

        assert_eq!(first, second);
        assert_eq!(first.predicted_class, "Bacterial Spot");
    }

    #[test]
    fn malformed_upload_is_a_decode_error() {
        let classifier = FixedClassifier::new(&[1.0, 0.0, 0.0, 0.0, 0.0]);
        let predictor = Predictor::new(classifier.clone());

        let err = predictor
            .predict(&RawUpload::new(b"not an image".to_vec()))
            .unwrap_err();

        assert!(matches!(err, Error::Decode(_)));
        assert!(err.is_client_error());
        assert!(classifier.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn wrong_output_width_is_an_inference_error() {
        let predictor = Predictor::new(FixedClassifier::new(&[0.5, 0.5]));

        let err = predictor.predict(&rgb_upload(8, 8)).unwrap_err();

        assert!(matches!(err, Error::Inference(_)));
        assert!(!err.is_client_error());
    }

    #[test]
    fn all_nan_scores_are_an_inference_error() {
        let predictor = Predictor::new(FixedClassifier::new(&[f32::NAN; 5]));

        assert!(matches!(
            predictor.predict(&rgb_upload(8, 8)),
            Err(Error::Inference(_))
        ));
    }

    #[test]
    fn argmax_prefers_lowest_index_on_ties() {
        assert_eq!(argmax(&[0.1, 0.7, 0.7, 0.2]), Some(1));
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.1]), Some(1));
        assert_eq!(argmax(&[0.0, f32::NAN, 0.0]), Some(0));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn confidence_rounding() {
        assert_eq!(round_confidence(0.9734), 97.34);
        assert_eq!(round_confidence(0.5), 50.0);
        assert_eq!(round_confidence(0.123_456), 12.35);
        assert_eq!(round_confidence(1.7), 100.0);
        assert_eq!(round_confidence(-0.1), 0.0);
    }

    #[test]
    fn error_body_is_opaque() {
        let body = serde_json::to_string(&ErrorResponse::default()).unwrap();
        assert_eq!(body, r#"{"error":"Error in processing the file"}"#);
    }
}
