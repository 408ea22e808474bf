use shipyard_core::registry::TargetRegistry;
use shipyard_core::stage::ReleaseStage;
use shipyard_core::target::{Credentials, PublishTarget, StageRepositories};
use shipyard_util::errors::ShipyardError;

const STAGES: [ReleaseStage; 3] = [
    ReleaseStage::Snapshot,
    ReleaseStage::Candidate,
    ReleaseStage::Final,
];

fn creds() -> Option<Credentials> {
    Credentials::from_parts(Some("user"), Some("password"))
}

fn internal(base_url: Option<&str>, repos: StageRepositories, creds: Option<Credentials>) -> PublishTarget {
    PublishTarget::internal("internal", base_url.map(str::to_string), repos, creds)
}

fn central(creds: Option<Credentials>, profile: Option<&str>) -> PublishTarget {
    PublishTarget::central(
        "sonatype",
        "https://oss.sonatype.org/service/local/",
        creds,
        profile.map(str::to_string),
    )
}

#[test]
fn duplicate_names_are_rejected() {
    let mut registry = TargetRegistry::new();
    registry
        .register(internal(None, StageRepositories::default(), None))
        .unwrap();
    let err = registry
        .register(internal(None, StageRepositories::default(), None))
        .unwrap_err();
    assert!(matches!(err, ShipyardError::Config { .. }));
    assert_eq!(registry.len(), 1);
}

#[test]
fn complete_internal_target_is_active_for_every_stage() {
    let mut registry = TargetRegistry::new();
    registry
        .register(internal(
            Some("https://repo.example.com/artifactory/"),
            StageRepositories::default(),
            creds(),
        ))
        .unwrap();

    let expected = [
        "https://repo.example.com/artifactory/maven-oss-snapshots",
        "https://repo.example.com/artifactory/maven-oss-candidates",
        "https://repo.example.com/artifactory/maven-oss-releases",
    ];
    for (stage, url) in STAGES.into_iter().zip(expected) {
        let active = registry.active_targets(stage, false).unwrap();
        assert_eq!(active.len(), 1, "{stage}");
        assert_eq!(active[0].url, url);
        assert!(!active[0].requires_staging);
    }
}

#[test]
fn removing_any_internal_value_disables_without_error() {
    let no_repo = StageRepositories {
        snapshots: None,
        candidates: None,
        releases: None,
        fixed: None,
    };
    let incomplete = [
        internal(None, StageRepositories::default(), creds()),
        internal(Some("https://repo"), no_repo, creds()),
        internal(
            Some("https://repo"),
            StageRepositories::default(),
            Credentials::from_parts(None, Some("password")),
        ),
        internal(
            Some("https://repo"),
            StageRepositories::default(),
            Credentials::from_parts(Some("user"), None),
        ),
    ];
    for target in incomplete {
        let mut registry = TargetRegistry::new();
        registry.register(target).unwrap();
        for stage in STAGES {
            let activation = registry.activation(stage, true).unwrap();
            assert!(activation.active.is_empty());
            assert_eq!(activation.inactive.len(), 1);
            assert_eq!(activation.inactive[0].name, "internal");
        }
    }
}

#[test]
fn central_target_final_requires_credentials() {
    let mut registry = TargetRegistry::new();
    registry.register(central(None, Some("abc123"))).unwrap();
    let err = registry
        .active_targets(ReleaseStage::Final, false)
        .unwrap_err();
    assert!(matches!(err, ShipyardError::Config { .. }));
    assert!(err.to_string().contains("sonatype"));
}

#[test]
fn central_target_final_requires_staging_profile() {
    let mut registry = TargetRegistry::new();
    registry.register(central(creds(), None)).unwrap();
    let err = registry
        .active_targets(ReleaseStage::Final, false)
        .unwrap_err();
    assert!(err.to_string().contains("staging profile id"));
}

#[test]
fn inactive_central_target_is_never_validated() {
    let mut registry = TargetRegistry::new();
    registry.register(central(None, None)).unwrap();

    for (stage, flag) in [
        (ReleaseStage::Snapshot, true),
        (ReleaseStage::Candidate, false),
    ] {
        let activation = registry.activation(stage, flag).unwrap();
        assert!(activation.active.is_empty());
        assert!(activation.inactive[0].is_central);
    }

    let inactive = registry
        .inactive_targets(ReleaseStage::Candidate, false)
        .unwrap();
    assert!(inactive[0].reason.contains("not submitted to Maven Central"));
}

#[test]
fn central_target_active_for_final_and_opted_in_candidate() {
    let mut registry = TargetRegistry::new();
    registry.register(central(creds(), Some("abc123"))).unwrap();

    let final_targets = registry.active_targets(ReleaseStage::Final, false).unwrap();
    assert_eq!(final_targets.len(), 1);
    assert!(final_targets[0].is_central);
    assert!(final_targets[0].requires_staging);
    assert_eq!(final_targets[0].staging_profile_id.as_deref(), Some("abc123"));

    assert_eq!(
        registry
            .active_targets(ReleaseStage::Candidate, true)
            .unwrap()
            .len(),
        1
    );
    assert!(registry
        .active_targets(ReleaseStage::Candidate, false)
        .unwrap()
        .is_empty());
}

#[test]
fn active_targets_are_sorted_by_name() {
    let mut registry = TargetRegistry::new();
    registry.register(central(creds(), Some("p"))).unwrap();
    registry
        .register(internal(
            Some("https://repo"),
            StageRepositories::default(),
            creds(),
        ))
        .unwrap();
    let names: Vec<_> = registry
        .active_targets(ReleaseStage::Final, false)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, ["internal", "sonatype"]);
}
