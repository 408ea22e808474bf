use std::collections::BTreeMap;

use shipyard_core::properties::PropertyResolver;
use shipyard_ops::engine::MavenTaskEngine;
use shipyard_ops::ops_plan::plan_release;
use shipyard_ops::ops_release::{execute, release};
use shipyard_planner::coordinator::{CancelHandle, Outcome};
use shipyard_util::errors::ShipyardError;

const POM: &str = r#"<project>
    <groupId>com.example</groupId>
    <artifactId>widgets</artifactId>
    <version>1.2.0-SNAPSHOT</version>
</project>"#;

fn project_with_pom() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let publications = tmp.path().join("build/publications/nebula");
    std::fs::create_dir_all(&publications).unwrap();
    std::fs::write(publications.join("pom-default.xml"), POM).unwrap();
    std::fs::write(publications.join("module.json"), r#"{"formatVersion":"1.1"}"#).unwrap();
    tmp
}

fn no_settings() -> PropertyResolver {
    PropertyResolver::new(BTreeMap::new(), BTreeMap::new())
}

#[tokio::test]
async fn non_release_invocation_is_a_no_op() {
    let tmp = tempfile::tempdir().unwrap();
    let report = release(tmp.path(), &["build"]).await.unwrap();
    assert!(report.is_none());
}

#[tokio::test]
async fn snapshot_without_targets_only_checks_generated_files() {
    let tmp = project_with_pom();
    let planned = plan_release(tmp.path(), &["snapshot"], &no_settings())
        .unwrap()
        .unwrap();

    let engine = MavenTaskEngine::new(reqwest::Client::new());
    let report = execute(&planned, engine, &CancelHandle::new()).await.unwrap();

    assert!(report.succeeded());
    assert_eq!(
        report.outcome("generatePomFileForNebulaPublication"),
        Some(&Outcome::Succeeded)
    );
    assert!(matches!(
        report.outcome("publishToInternal"),
        Some(Outcome::Skipped(_))
    ));
    assert_eq!(report.outcome("postRelease"), Some(&Outcome::Succeeded));
}

#[tokio::test]
async fn missing_pom_aborts_the_release() {
    let tmp = tempfile::tempdir().unwrap();
    let planned = plan_release(tmp.path(), &["snapshot"], &no_settings())
        .unwrap()
        .unwrap();

    let engine = MavenTaskEngine::new(reqwest::Client::new());
    let err = execute(&planned, engine, &CancelHandle::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ShipyardError>(),
        Some(ShipyardError::PomParse { .. })
    ));
}

#[tokio::test]
async fn refused_upload_fails_the_release_with_a_composite_error() {
    let tmp = project_with_pom();
    std::fs::write(
        tmp.path().join("shipyard.toml"),
        "[publishing]\ninternal-base-url = \"http://repo.local/artifactory\"\n\
         internal-username = \"deployer\"\ninternal-password = \"secret\"\n\n\
         [capabilities]\ninsecure-protocol = false\n",
    )
    .unwrap();
    let planned = plan_release(tmp.path(), &["snapshot"], &no_settings())
        .unwrap()
        .unwrap();

    let engine = MavenTaskEngine::new(reqwest::Client::new());
    let err = execute(&planned, engine, &CancelHandle::new())
        .await
        .unwrap_err();
    match err.downcast_ref::<ShipyardError>() {
        Some(ShipyardError::Composite { failures }) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].operation, "publishToInternal");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn cancelled_release_runs_nothing() {
    let tmp = project_with_pom();
    let planned = plan_release(tmp.path(), &["snapshot"], &no_settings())
        .unwrap()
        .unwrap();

    let cancel = CancelHandle::new();
    cancel.cancel();
    let engine = MavenTaskEngine::new(reqwest::Client::new());
    let err = execute(&planned, engine, &cancel).await.unwrap_err();
    assert!(err.to_string().starts_with("Release cancelled"));
}
