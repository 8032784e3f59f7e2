//! End-to-end pipeline tests with mock collaborators

#[cfg(test)]
mod integration_tests {
    use std::io::{Cursor, Write};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use parking_lot::Mutex;

    use crate::logic::config::{PipelineConfig, StageTimeouts};
    use crate::logic::detection::{BoundingBox, IssueClass, RawDetection};
    use crate::logic::model::classifier::softmax;
    use crate::logic::model::{
        ContextualCorrector, Correction, InferenceError, LesionDetector, SkinTypeClassifier,
    };
    use crate::logic::pipeline::{DiagnosticPipeline, ImageInput, PipelineBuilder};
    use crate::logic::profile::ProfileInput;
    use crate::logic::report::{
        Annotation, AnnotationRenderer, AnnotationStyle, RenderError, ReportThresholds, Severity,
    };
    use crate::logic::schema::ExpectedSchema;
    use crate::logic::skin::SkinType;

    // ------------------------------------------------------------------
    // Mocks
    // ------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct Calls(Arc<AtomicUsize>);

    impl Calls {
        fn hit(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn count(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    struct MockDetector {
        detections: Vec<RawDetection>,
        delay: Duration,
        calls: Calls,
    }

    impl LesionDetector for MockDetector {
        fn detect(&self, _image: &DynamicImage) -> Result<Vec<RawDetection>, InferenceError> {
            self.calls.hit();
            std::thread::sleep(self.delay);
            Ok(self.detections.clone())
        }
    }

    struct MockClassifier {
        output: Vec<f32>,
        delay: Duration,
    }

    impl SkinTypeClassifier for MockClassifier {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
            std::thread::sleep(self.delay);
            Ok(self.output.clone())
        }
    }

    /// Records its inputs; the label is the arg-max of a distribution
    /// derived from the input, so it is deterministic
    #[derive(Default)]
    struct MockCorrector {
        inputs: Arc<Mutex<Vec<Vec<f32>>>>,
        classes: usize,
        input_len: Option<usize>,
    }

    impl ContextualCorrector for MockCorrector {
        fn correct(&self, features: &[f32]) -> Result<Correction, InferenceError> {
            self.inputs.lock().push(features.to_vec());
            let classes = if self.classes == 0 { 10 } else { self.classes };

            let mut distribution = vec![0.05f32; classes];
            let label = (features.iter().sum::<f32>() as usize) % classes;
            distribution[label] = 1.0 - 0.05 * (classes as f32 - 1.0);
            Ok(Correction {
                label_id: label as i64,
                distribution,
            })
        }

        fn expected_input_len(&self) -> Option<usize> {
            self.input_len
        }
    }

    #[derive(Default)]
    struct MemoryRenderer {
        rendered: Arc<Mutex<Vec<Vec<Annotation>>>>,
    }

    impl AnnotationRenderer for MemoryRenderer {
        fn render(
            &self,
            _image: &DynamicImage,
            annotations: &[Annotation],
            _style: &AnnotationStyle,
        ) -> Result<String, RenderError> {
            self.rendered.lock().push(annotations.to_vec());
            Ok(format!("memory://{}", annotations.len()))
        }
    }

    // ------------------------------------------------------------------
    // Fixtures
    // ------------------------------------------------------------------

    fn png_bytes() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(32, 24, Rgb([200, 150, 120])));
        let mut buffer = Vec::new();
        image.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png).unwrap();
        buffer
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(2.0, 2.0, 12.0, 12.0)
    }

    fn sample_detections() -> Vec<RawDetection> {
        vec![
            RawDetection::new(0, 0.9, bbox()),
            RawDetection::new(0, 0.4, bbox()),
            RawDetection::new(7, 0.65, bbox()),
            RawDetection::new(3, 0.05, bbox()),
            RawDetection::new(15, 0.9, bbox()),
        ]
    }

    fn schema() -> ExpectedSchema {
        ExpectedSchema::new([
            "age",
            "tr_p0",
            "issue_7",
            "sk_p1",
            "predicted_skin_label_Normal",
            "smoker_Yes",
            "bmi",
        ])
        .unwrap()
    }

    struct Harness {
        builder: PipelineBuilder,
        detector_calls: Calls,
        corrector_inputs: Arc<Mutex<Vec<Vec<f32>>>>,
        rendered: Arc<Mutex<Vec<Vec<Annotation>>>>,
    }

    fn harness(detections: Vec<RawDetection>) -> Harness {
        let detector_calls = Calls::default();
        let corrector = MockCorrector::default();
        let corrector_inputs = Arc::clone(&corrector.inputs);
        let renderer = MemoryRenderer::default();
        let rendered = Arc::clone(&renderer.rendered);

        let builder = PipelineBuilder::new()
            .detector(MockDetector {
                detections,
                delay: Duration::ZERO,
                calls: detector_calls.clone(),
            })
            .classifier(MockClassifier {
                output: vec![0.2, 0.5, 0.3],
                delay: Duration::ZERO,
            })
            .corrector(corrector)
            .renderer(renderer)
            .schema(schema());

        Harness {
            builder,
            detector_calls,
            corrector_inputs,
            rendered,
        }
    }

    // ------------------------------------------------------------------
    // Tests
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_end_to_end() {
        let h = harness(sample_detections());
        let pipeline = h.builder.build().unwrap();
        let profile = ProfileInput::from_json_str(r#"{"age": 41, "smoker": "Yes"}"#).unwrap();

        let report = pipeline
            .analyze(&ImageInput::Bytes(png_bytes()), Some(&profile))
            .await
            .unwrap();

        // Corrector saw exactly the schema's columns, in order
        let inputs = h.corrector_inputs.lock();
        assert_eq!(inputs.len(), 1);
        let aligned = &inputs[0];
        assert_eq!(aligned.len(), 7);
        assert_eq!(aligned[0], 41.0);
        assert!((aligned[1] - 0.9 / 1.55).abs() < 1e-6);
        assert!((aligned[2] - 0.65 / 1.55).abs() < 1e-6);
        assert_eq!(aligned[3], 0.5);
        assert_eq!(aligned[4], 1.0);
        assert_eq!(aligned[5], 1.0);
        assert_eq!(aligned[6], 0.0);

        assert_eq!(report.detected_issues, vec![IssueClass::Acne, IssueClass::SkinRedness]);
        assert_eq!(report.severity(IssueClass::Acne), Severity::High);
        assert_eq!(report.severity(IssueClass::SkinRedness), Severity::Moderate);
        assert_eq!(report.severity(IssueClass::DrySkin), Severity::None);
        assert_eq!(report.severity_map.len(), 10);
        assert_eq!(report.skin_type, SkinType::Normal);
        assert_eq!(report.detections.len(), 3);
        assert_eq!(report.annotated_image_ref, "memory://3");

        let sum: f32 = report.issue_probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-5);

        let rendered = h.rendered.lock();
        assert_eq!(rendered[0][0].text, "Acne 90%");
    }

    #[tokio::test]
    async fn test_missing_profile_uses_defaults() {
        let h = harness(vec![]);
        let pipeline = h.builder.build().unwrap();

        let report = pipeline.analyze(&ImageInput::Bytes(png_bytes()), None).await.unwrap();

        let inputs = h.corrector_inputs.lock();
        assert_eq!(inputs[0][0], 25.0);
        assert_eq!(inputs[0][1], 0.0);
        assert!(report.detected_issues.is_empty());
        assert!(report.visual_diagnosis.is_none());
        assert!(report.issue_probabilities.values().all(|&p| p == 0.0));
    }

    #[tokio::test]
    async fn test_identical_inputs_identical_reports() {
        let h = harness(sample_detections());
        let pipeline = h.builder.build().unwrap();
        let image = ImageInput::Bytes(png_bytes());
        let profile = ProfileInput::from_json_str(r#"{"gender": "Male", "stress_level": 9}"#).unwrap();

        let first = pipeline.analyze(&image, Some(&profile)).await.unwrap();
        let second = pipeline.analyze(&image, Some(&profile)).await.unwrap();
        assert_eq!(first, second);

        let inputs = h.corrector_inputs.lock();
        let bits = |v: &Vec<f32>| v.iter().map(|f| f.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&inputs[0]), bits(&inputs[1]));
    }

    #[tokio::test]
    async fn test_png_renderer_reference_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = PipelineBuilder::new()
            .detector(MockDetector {
                detections: sample_detections(),
                delay: Duration::ZERO,
                calls: Calls::default(),
            })
            .classifier(MockClassifier {
                output: vec![0.6, 0.3, 0.1],
                delay: Duration::ZERO,
            })
            .corrector(MockCorrector::default())
            .schema(schema())
            .annotation_dir(dir.path())
            .build()
            .unwrap();

        let image = ImageInput::Bytes(png_bytes());
        let first = pipeline.analyze(&image, None).await.unwrap();
        let second = pipeline.analyze(&image, None).await.unwrap();

        assert_eq!(first.annotated_image_ref, second.annotated_image_ref);
        assert!(std::path::Path::new(&first.annotated_image_ref).starts_with(dir.path()));
        assert!(std::path::Path::new(&first.annotated_image_ref).is_file());
    }

    #[tokio::test]
    async fn test_detection_and_classification_overlap() {
        struct Probe {
            in_flight: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
        }

        impl Probe {
            fn enter(&self) {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(100));
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        }

        impl LesionDetector for Probe {
            fn detect(&self, _image: &DynamicImage) -> Result<Vec<RawDetection>, InferenceError> {
                self.enter();
                Ok(vec![])
            }
        }

        impl SkinTypeClassifier for Probe {
            fn classify(&self, _image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
                self.enter();
                Ok(vec![0.3, 0.3, 0.4])
            }
        }

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let probe = || Probe {
            in_flight: Arc::clone(&in_flight),
            peak: Arc::clone(&peak),
        };

        let pipeline = PipelineBuilder::new()
            .detector(probe())
            .classifier(probe())
            .corrector(MockCorrector::default())
            .renderer(MemoryRenderer::default())
            .schema(schema())
            .build()
            .unwrap();

        pipeline.analyze(&ImageInput::Bytes(png_bytes()), None).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_detector_timeout_aborts_request() {
        let corrector = MockCorrector::default();
        let corrector_inputs = Arc::clone(&corrector.inputs);
        let renderer = MemoryRenderer::default();
        let rendered = Arc::clone(&renderer.rendered);

        let pipeline = PipelineBuilder::new()
            .detector(MockDetector {
                detections: sample_detections(),
                delay: Duration::from_millis(300),
                calls: Calls::default(),
            })
            .classifier(MockClassifier {
                output: vec![0.2, 0.5, 0.3],
                delay: Duration::ZERO,
            })
            .corrector(corrector)
            .renderer(renderer)
            .schema(schema())
            .timeouts(StageTimeouts {
                detection_ms: 20,
                ..Default::default()
            })
            .build()
            .unwrap();

        let err = pipeline.analyze(&ImageInput::Bytes(png_bytes()), None).await.unwrap_err();

        assert_eq!(err.kind(), "INFERENCE_TIMEOUT");
        assert!(err.to_string().contains("detection"));
        assert!(corrector_inputs.lock().is_empty());
        assert!(rendered.lock().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_image_before_any_model() {
        let h = harness(sample_detections());
        let pipeline = h.builder.build().unwrap();

        let err = pipeline
            .analyze(&ImageInput::Bytes(b"definitely not a png".to_vec()), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_IMAGE");

        let err = pipeline.analyze(&ImageInput::Bytes(Vec::new()), None).await.unwrap_err();
        assert_eq!(err.kind(), "INVALID_IMAGE");

        let dir = tempfile::tempdir().unwrap();
        let err = pipeline
            .analyze(&ImageInput::Path(dir.path().join("missing.jpg")), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_IMAGE");

        assert_eq!(h.detector_calls.count(), 0);
    }

    #[tokio::test]
    async fn test_image_from_path() {
        let mut file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        file.write_all(&png_bytes()).unwrap();

        let h = harness(vec![RawDetection::new(5, 0.7, bbox())]);
        let pipeline = h.builder.build().unwrap();
        let report = pipeline.analyze(&ImageInput::from(file.path()), None).await.unwrap();

        assert_eq!(report.detected_issues, vec![IssueClass::Eyebags]);
        assert_eq!(h.detector_calls.count(), 1);
    }

    #[tokio::test]
    async fn test_image_without_extension_is_sniffed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload_1234");
        std::fs::write(&path, png_bytes()).unwrap();

        let decoded = ImageInput::from(path.as_path()).decode().unwrap();
        assert_eq!((decoded.width(), decoded.height()), (32, 24));

        let h = harness(vec![RawDetection::new(2, 0.8, bbox())]);
        let pipeline = h.builder.build().unwrap();
        let report = pipeline.analyze(&ImageInput::Path(path), None).await.unwrap();
        assert_eq!(report.detected_issues, vec![IssueClass::DarkSpots]);
    }

    fn pipeline_with_classifier(output: Vec<f32>) -> (DiagnosticPipeline, Arc<Mutex<Vec<Vec<f32>>>>) {
        let corrector = MockCorrector::default();
        let inputs = Arc::clone(&corrector.inputs);
        let pipeline = PipelineBuilder::new()
            .detector(MockDetector {
                detections: sample_detections(),
                delay: Duration::ZERO,
                calls: Calls::default(),
            })
            .classifier(MockClassifier {
                output,
                delay: Duration::ZERO,
            })
            .corrector(corrector)
            .renderer(MemoryRenderer::default())
            .schema(schema())
            .build()
            .unwrap();
        (pipeline, inputs)
    }

    #[tokio::test]
    async fn test_classifier_output_must_be_a_distribution() {
        for output in [vec![0.0, 0.0, 0.0], vec![5.0, 9.0, 2.0], vec![0.2, 0.2, 0.2]] {
            let (pipeline, corrector_inputs) = pipeline_with_classifier(output.clone());
            let err = pipeline.analyze(&ImageInput::Bytes(png_bytes()), None).await.unwrap_err();

            assert_eq!(err.kind(), "INFERENCE_FAILED", "{:?}", output);
            assert!(err.to_string().contains("classification"));
            assert!(corrector_inputs.lock().is_empty());
        }
    }

    #[tokio::test]
    async fn test_nan_logits_never_become_a_skin_type() {
        struct NanLogits;

        impl SkinTypeClassifier for NanLogits {
            fn classify(&self, _image: &DynamicImage) -> Result<Vec<f32>, InferenceError> {
                softmax(&[f32::NAN, 1.0, 2.0])
            }
        }

        let pipeline = PipelineBuilder::new()
            .detector(MockDetector {
                detections: vec![],
                delay: Duration::ZERO,
                calls: Calls::default(),
            })
            .classifier(NanLogits)
            .corrector(MockCorrector::default())
            .renderer(MemoryRenderer::default())
            .schema(schema())
            .build()
            .unwrap();

        let err = pipeline.analyze(&ImageInput::Bytes(png_bytes()), None).await.unwrap_err();
        assert_eq!(err.kind(), "INFERENCE_FAILED");
    }

    #[tokio::test]
    async fn test_mention_threshold_does_not_touch_severity() {
        let detections = vec![RawDetection::new(0, 0.55, bbox()), RawDetection::new(7, 0.85, bbox())];

        let baseline = harness(detections.clone()).builder.build().unwrap();
        let strict = harness(detections)
            .builder
            .thresholds(ReportThresholds {
                mention_min: 0.6,
                ..Default::default()
            })
            .build()
            .unwrap();

        let image = ImageInput::Bytes(png_bytes());
        let default_report = baseline.analyze(&image, None).await.unwrap();
        let strict_report = strict.analyze(&image, None).await.unwrap();

        assert_eq!(strict_report.severity_map, default_report.severity_map);
        assert_eq!(strict_report.severity(IssueClass::Acne), Severity::Low);
        assert_eq!(strict_report.detected_issues, vec![IssueClass::SkinRedness]);
        assert_eq!(default_report.detected_issues, vec![IssueClass::Acne, IssueClass::SkinRedness]);
        assert_eq!(strict_report.issue_probabilities, default_report.issue_probabilities);
        assert_eq!(strict_report.detections.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_classifier_output() {
        let pipeline = PipelineBuilder::new()
            .detector(MockDetector {
                detections: vec![],
                delay: Duration::ZERO,
                calls: Calls::default(),
            })
            .classifier(MockClassifier {
                output: vec![0.5, 0.5],
                delay: Duration::ZERO,
            })
            .corrector(MockCorrector::default())
            .renderer(MemoryRenderer::default())
            .schema(schema())
            .build()
            .unwrap();

        let err = pipeline.analyze(&ImageInput::Bytes(png_bytes()), None).await.unwrap_err();
        assert_eq!(err.kind(), "INFERENCE_FAILED");
    }

    #[tokio::test]
    async fn test_wrong_distribution_width_is_schema_mismatch() {
        let renderer = MemoryRenderer::default();
        let rendered = Arc::clone(&renderer.rendered);

        let pipeline = PipelineBuilder::new()
            .detector(MockDetector {
                detections: sample_detections(),
                delay: Duration::ZERO,
                calls: Calls::default(),
            })
            .classifier(MockClassifier {
                output: vec![0.2, 0.5, 0.3],
                delay: Duration::ZERO,
            })
            .corrector(MockCorrector {
                classes: 4,
                ..Default::default()
            })
            .renderer(renderer)
            .schema(schema())
            .build()
            .unwrap();

        let err = pipeline.analyze(&ImageInput::Bytes(png_bytes()), None).await.unwrap_err();
        assert_eq!(err.kind(), "SCHEMA_MISMATCH");
        assert!(rendered.lock().is_empty());
    }

    #[test]
    fn test_missing_corrector_refuses_to_build() {
        let result = PipelineBuilder::new()
            .detector(MockDetector {
                detections: vec![],
                delay: Duration::ZERO,
                calls: Calls::default(),
            })
            .classifier(MockClassifier {
                output: vec![0.2, 0.5, 0.3],
                delay: Duration::ZERO,
            })
            .schema(schema())
            .build();

        let err = result.err().unwrap();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("corrector"));
    }

    #[test]
    fn test_corrector_width_must_match_schema() {
        let h = harness(vec![]);
        let err = h
            .builder
            .corrector(MockCorrector {
                input_len: Some(12),
                ..Default::default()
            })
            .build()
            .err()
            .unwrap();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
    }

    #[test]
    fn test_from_config_fails_fast_on_missing_corrector_artifact() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("context_correction.columns.json"), r#"["age", "tr_p0"]"#).unwrap();

        let config = PipelineConfig {
            models_dir: dir.path().to_path_buf(),
            annotation_dir: dir.path().join("annotations"),
            ..Default::default()
        };

        let err = DiagnosticPipeline::from_config(&config).err().unwrap();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
        assert!(err.to_string().contains("corrector"));
    }

    #[test]
    fn test_from_config_checks_schema_pin() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("context_correction.columns.json"), r#"["age"]"#).unwrap();

        let mut config = PipelineConfig {
            models_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        config.checksums.schema = Some("0".repeat(64));

        let err = DiagnosticPipeline::from_config(&config).err().unwrap();
        assert_eq!(err.kind(), "MODEL_UNAVAILABLE");
        assert!(err.to_string().contains("checksum mismatch"));
    }
}
