//! External engine bridge tests against a scripted fake engine.

#![cfg(unix)]
#![allow(clippy::unwrap_used)]

use std::path::Path;

use idproof_adapters::CommandEngine;
use idproof_core::{
    CapabilityError, FaceCapability, ImageRef, QualitySignalCapability, TextExtractionCapability,
};
use tempfile::TempDir;

const FAKE_ENGINE: &str = r#"#!/bin/sh
op="$1"
shift
case "$op" in
  ocr) printf '%s\n' '{"text":"GOVERNMENT OF INDIA\nDOB: 15/08/1995"}' ;;
  detect-faces)
    case "$1" in
      *noface*) echo '{"faces":0}' ;;
      *) echo '{"faces":1}' ;;
    esac ;;
  compare) echo '{"verified":true,"distance":0.1,"threshold":0.4}' ;;
  estimate-age)
    case "$1" in
      *noface*) echo '{"error":"no_face"}' ;;
      *) echo '{"age":36}' ;;
    esac ;;
  quality)
    echo "$1" >> "$(dirname "$0")/quality.log"
    echo '{"blur":42.5,"brightness":131.0}' ;;
  *) echo "unknown op $op" >&2; exit 2 ;;
esac
"#;

fn engine(dir: &Path, body: &str) -> CommandEngine {
    let script = dir.join("engine.sh");
    std::fs::write(&script, body).unwrap();
    // Run through sh so the script never needs the exec bit.
    CommandEngine::new("sh").with_args([script.to_string_lossy().into_owned()])
}

#[test]
fn test_ocr_reply() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path(), FAKE_ENGINE);

    let text = engine.extract_text(&ImageRef::new("doc.png")).unwrap();
    assert!(text.contains("DOB: 15/08/1995"));
}

#[test]
fn test_face_ops() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path(), FAKE_ENGINE);
    let doc = ImageRef::new("doc.png");
    let selfie = ImageRef::new("selfie.png");

    assert_eq!(engine.detect_faces(&doc), Ok(1));
    assert_eq!(engine.detect_faces(&ImageRef::new("noface.png")), Ok(0));

    let comparison = engine.compare(&doc, &selfie).unwrap();
    assert!(comparison.verified);
    assert!((comparison.distance - 0.1).abs() < 1e-9);

    assert_eq!(engine.estimate_age(&selfie), Ok(36));
    assert_eq!(
        engine.estimate_age(&ImageRef::new("noface.png")),
        Err(CapabilityError::NoFaceDetected)
    );
}

#[test]
fn test_quality_signals_share_one_call() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path(), FAKE_ENGINE);
    let selfie = ImageRef::new("selfie.png");

    assert!((engine.blur_score(&selfie).unwrap() - 42.5).abs() < 1e-9);
    assert!((engine.brightness(&selfie).unwrap() - 131.0).abs() < 1e-9);

    let log = std::fs::read_to_string(dir.path().join("quality.log")).unwrap();
    assert_eq!(log.lines().count(), 1);
}

#[test]
fn test_failing_engine_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path(), "#!/bin/sh\necho boom >&2\nexit 3\n");

    assert!(matches!(
        engine.extract_text(&ImageRef::new("doc.png")),
        Err(CapabilityError::Unavailable(_))
    ));
}

#[test]
fn test_garbage_reply_is_unavailable() {
    let dir = TempDir::new().unwrap();
    let engine = engine(dir.path(), "#!/bin/sh\necho 'not json'\n");

    assert!(matches!(
        engine.detect_faces(&ImageRef::new("doc.png")),
        Err(CapabilityError::Unavailable(_))
    ));
}
