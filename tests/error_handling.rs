use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use recommender::{
    bootstrap_with, CatalogError, ConfigLoadError, EchoGenerator, IndexError, PipelineError,
    RecommenderConfig, ResourceCache, SchemaError, SourceError,
};
use tempfile::NamedTempFile;

const HEADER: &str =
    "Product Name,Description,Job Level,Languages,Test Duration,Test Type,Remote Testing\n";

fn catalog_file(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

async fn bootstrap_path(path: PathBuf) -> Result<(), PipelineError> {
    let mut cfg = RecommenderConfig::default();
    cfg.catalog.path = path;
    let cache = ResourceCache::new(1);
    bootstrap_with(&cfg, Arc::new(EchoGenerator), &cache)
        .await
        .map(|_| ())
}

#[tokio::test]
async fn missing_file_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = bootstrap_path(dir.path().join("absent.csv"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Catalog(CatalogError::Source(SourceError::NotFound { .. }))
    ));
    assert_eq!(err.kind(), "not_found");
    assert!(err.to_string().contains("absent.csv"));
}

#[tokio::test]
async fn whitespace_only_file_is_empty() {
    let file = catalog_file("  \n\n ");
    let err = bootstrap_path(file.path().to_path_buf()).await.unwrap_err();
    assert_eq!(err.kind(), "empty");
}

#[tokio::test]
async fn missing_columns_are_all_named() {
    let file = catalog_file("Product Name,Description\nVerify,Numerical\n");
    let err = bootstrap_path(file.path().to_path_buf()).await.unwrap_err();

    let PipelineError::Catalog(CatalogError::Schema(SchemaError::MissingColumns { missing, .. })) =
        &err
    else {
        panic!("expected missing columns, got {err:?}");
    };
    assert_eq!(missing.len(), 5);
    assert!(missing.iter().any(|c| c == "Test Duration"));
    assert_eq!(err.kind(), "missing_columns");
}

#[tokio::test]
async fn header_only_catalog_has_no_documents() {
    let file = catalog_file(HEADER);
    let err = bootstrap_path(file.path().to_path_buf()).await.unwrap_err();

    assert!(matches!(err, PipelineError::Index(IndexError::NoDocuments)));
    assert_eq!(err.kind(), "no_documents");
}

#[tokio::test]
async fn missing_credential_halts_before_catalog_work() {
    let mut cfg = RecommenderConfig::default();
    cfg.catalog.path = PathBuf::from("does/not/exist.csv");
    cfg.generation.provider = "openai".into();
    cfg.generation.api_key_env = "SHL_TEST_KEY_THAT_IS_NEVER_SET".into();

    let err = recommender::bootstrap(&cfg).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Config(ConfigLoadError::MissingCredential(ref env))
            if env == "SHL_TEST_KEY_THAT_IS_NEVER_SET"
    ));
    assert_eq!(err.kind(), "missing_credential");
    assert!(err
        .to_string()
        .contains("Please set SHL_TEST_KEY_THAT_IS_NEVER_SET"));
}

#[test]
fn invalid_yaml_values_are_rejected() {
    let err = RecommenderConfig::from_yaml("retrieval:\n  retrieval_k: 0\n").unwrap_err();
    assert!(matches!(err, ConfigLoadError::Validation(ref msg) if msg.starts_with("retrieval")));

    let err = RecommenderConfig::from_yaml("version: \"9\"\n").unwrap_err();
    assert!(matches!(err, ConfigLoadError::UnsupportedVersion(_)));
}
