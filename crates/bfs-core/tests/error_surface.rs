use bfs_core::errors::{ErrorInfo, SweepError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("variable", "Coil_11")
        .with_context("value", "150.2")
}

#[test]
fn solver_errors_are_the_only_recoverable_family() {
    let solver = SweepError::Solver(sample_info("S001", "did not converge"));
    assert!(solver.is_recoverable());

    for err in [
        SweepError::InvalidArgument(sample_info("A001", "bad count")),
        SweepError::Engine(sample_info("E001", "rebuild failed")),
        SweepError::Io(sample_info("I001", "disk full")),
        SweepError::Config(sample_info("C001", "bad yaml")),
        SweepError::Serde(sample_info("J001", "encode")),
    ] {
        assert!(!err.is_recoverable(), "{err}");
    }
}

#[test]
fn engine_error_surface() {
    let err = SweepError::Engine(sample_info("E002", "export failed"));
    assert_eq!(err.info().code, "E002");
    assert_eq!(err.info().context.get("variable").map(String::as_str), Some("Coil_11"));
}

#[test]
fn context_is_appended_to_any_family() {
    let err = SweepError::invalid("A002", "count must be positive").with_context("count", "0");
    assert_eq!(err.info().context.get("count").map(String::as_str), Some("0"));
    assert!(matches!(err, SweepError::InvalidArgument(_)));
}

#[test]
fn display_renders_context_and_hint() {
    let err = SweepError::Solver(
        ErrorInfo::new("S002", "solver aborted")
            .with_context("value", "1.5")
            .with_hint("check mesh"),
    );
    let rendered = err.to_string();
    assert_eq!(
        rendered,
        "solver error: solver aborted (code: S002) | context: [value=1.5] | hint: check mesh"
    );
}

#[test]
fn errors_round_trip_through_json() {
    let err = SweepError::Engine(sample_info("E003", "save failed").with_hint("disk"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"Engine\""));
    let decoded: SweepError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}
