//! Report assembly tests

#[cfg(test)]
mod integration_tests {
    use crate::logic::detection::{aggregate, retain_detections, BoundingBox, IssueClass, RawDetection};
    use crate::logic::features::{build_features, FusedFeatureVector};
    use crate::logic::model::Correction;
    use crate::logic::profile::PatientProfile;
    use crate::logic::report::{
        assemble, severity_for, severity_map, DiagnosticReport, ReportParts, ReportThresholds, Severity,
    };
    use crate::logic::skin::{SkinType, SkinTypeProbabilities};

    fn raw(class_id: i64, confidence: f32) -> RawDetection {
        RawDetection::new(class_id, confidence, BoundingBox::new(1.0, 1.0, 9.0, 9.0))
    }

    fn correction(label_id: i64) -> Correction {
        let mut distribution = vec![0.02; 10];
        distribution[label_id.clamp(0, 9) as usize] = 0.82;
        Correction { label_id, distribution }
    }

    fn build(raw_detections: &[RawDetection], correction: &Correction) -> crate::DiagnosticResult<DiagnosticReport> {
        let thresholds = ReportThresholds::default();
        let retained = retain_detections(raw_detections, thresholds.mention_min);
        let aggregation = aggregate(&retained, thresholds.mention_min);
        let skin = SkinTypeProbabilities::new([0.1, 0.7, 0.2]);
        let fused: FusedFeatureVector =
            build_features(&PatientProfile::default(), aggregation.probabilities.as_slice(), &skin)?;

        assemble(
            ReportParts {
                aggregation: &aggregation,
                skin: &skin,
                correction,
                fused: &fused,
                annotated_image_ref: "annotated.png".to_string(),
            },
            &thresholds,
        )
    }

    #[test]
    fn test_severity_ladder() {
        let t = ReportThresholds::default();
        assert_eq!(severity_for(0.0, &t), Severity::None);
        assert_eq!(severity_for(0.49, &t), Severity::None);
        assert_eq!(severity_for(0.5, &t), Severity::Low);
        assert_eq!(severity_for(0.59, &t), Severity::Low);
        assert_eq!(severity_for(0.6, &t), Severity::Moderate);
        assert_eq!(severity_for(0.79, &t), Severity::Moderate);
        assert_eq!(severity_for(0.8, &t), Severity::High);
        assert_eq!(severity_for(1.0, &t), Severity::High);
    }

    #[test]
    fn test_severity_map_lists_all_classes() {
        let mut max = [0.0f32; 10];
        max[4] = 0.85;
        let map = severity_map(&max, &ReportThresholds::default());

        assert_eq!(map.len(), 10);
        assert_eq!(map[&IssueClass::EnlargedPores], Severity::High);
        assert_eq!(map[&IssueClass::Acne], Severity::None);
    }

    #[test]
    fn test_mention_and_severity_are_independent() {
        // 0.3 is mentioned but grades NONE
        let report = build(&[raw(0, 0.3), raw(7, 0.65)], &correction(7)).unwrap();

        assert_eq!(report.detected_issues, vec![IssueClass::Acne, IssueClass::SkinRedness]);
        assert_eq!(report.severity(IssueClass::Acne), Severity::None);
        assert_eq!(report.severity(IssueClass::SkinRedness), Severity::Moderate);
    }

    #[test]
    fn test_severity_uses_raw_not_normalized_confidence() {
        // Alone, 0.55 normalizes to 1.0 but must still grade LOW
        let report = build(&[raw(2, 0.55)], &correction(2)).unwrap();

        assert_eq!(report.issue_probabilities[&IssueClass::DarkSpots], 1.0);
        assert_eq!(report.severity(IssueClass::DarkSpots), Severity::Low);
    }

    #[test]
    fn test_no_detections() {
        let report = build(&[], &correction(0)).unwrap();

        assert!(report.detected_issues.is_empty());
        assert!(report.issue_probabilities.values().all(|&p| p == 0.0));
        assert!(report.visual_diagnosis.is_none());
        assert!(report.severity_map.values().all(|&s| s == Severity::None));
        assert!(report.detections.is_empty());
    }

    #[test]
    fn test_primary_diagnosis_from_label_table() {
        let report = build(&[raw(9, 0.9)], &correction(4)).unwrap();

        assert_eq!(report.primary_diagnosis, IssueClass::EnlargedPores);
        assert_eq!(report.primary_diagnosis.label(), "Englarged-Pores");
        assert!((report.confidence - 0.82).abs() < 1e-6);
        assert_eq!(report.skin_type, SkinType::Normal);
        assert_eq!(report.correction_label_id, 4);

        let visual = report.visual_diagnosis.unwrap();
        assert_eq!(visual.issue, IssueClass::Wrinkles);
    }

    #[test]
    fn test_bad_correction_outputs() {
        let err = build(&[], &Correction { label_id: 0, distribution: vec![1.0; 3] }).unwrap_err();
        assert_eq!(err.kind(), "SCHEMA_MISMATCH");

        let mut bad_label = correction(0);
        bad_label.label_id = 12;
        assert_eq!(build(&[], &bad_label).unwrap_err().kind(), "SCHEMA_MISMATCH");

        let mut nan = correction(0);
        nan.distribution[3] = f32::NAN;
        assert_eq!(build(&[], &nan).unwrap_err().kind(), "INFERENCE_FAILED");
    }

    #[test]
    fn test_report_json_shape() {
        let report = build(&[raw(0, 0.9)], &correction(0)).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["primary_diagnosis"], "Acne");
        assert_eq!(json["skin_type"], "Normal");
        assert_eq!(json["severity_map"]["Acne"], "HIGH");
        assert_eq!(json["severity_map"]["Englarged-Pores"], "NONE");
        assert_eq!(json["detected_issues"][0], "Acne");

        let back: DiagnosticReport = serde_json::from_value(json).unwrap();
        assert_eq!(back, report);
    }
}
