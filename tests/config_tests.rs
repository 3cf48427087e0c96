//! Loading labeler configuration from disk.

use fewtag::config::LabelerConfig;
use fewtag::scoring::Similarity;
use fewtag::{Error, LabelMask, TagAlphabet};
use std::fs;

#[test]
fn test_from_toml_file() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("fewtag.toml");
    fs::write(
        &path,
        r#"
emb_log = "emb.log"

[emission]
similarity = "cosine"
scale = 10.0
label_weight = 0.5

[transition]
init = -0.1
label_backoff = 0.3
"#,
    )
    .unwrap();

    let config = LabelerConfig::from_toml_file(&path).unwrap();
    assert_eq!(config.emission.similarity, Similarity::Cosine);
    assert_eq!(config.emission.label_weight, 0.5);
    assert_eq!(config.emb_log.as_deref(), Some(std::path::Path::new("emb.log")));
    let transition = config.transition.as_ref().unwrap();
    assert_eq!(transition.init, -0.1);
    assert_eq!(transition.label_backoff, 0.3);

    let alphabet = TagAlphabet::with_pad(["B-ORG", "I-ORG", "O"]).unwrap();
    let mask = LabelMask::bio(&alphabet);
    let labeler = config.build_seq_labeler(alphabet, Some(mask)).unwrap();
    assert!(labeler.is_structured());
    assert!(labeler.has_label_mask());
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let err = LabelerConfig::from_toml_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}

#[test]
fn test_json_and_toml_agree() {
    let toml = LabelerConfig::from_toml_str("[emission]\nscale = 2.0\n[transition]\n").unwrap();
    let json =
        LabelerConfig::from_json_str(r#"{"emission": {"scale": 2.0}, "transition": {}}"#).unwrap();
    assert_eq!(toml, json);
}

#[test]
fn test_unknown_similarity_rejected() {
    let err = LabelerConfig::from_toml_str("[emission]\nsimilarity = \"hamming\"").unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
