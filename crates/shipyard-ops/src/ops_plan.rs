//! Operation: resolve configuration and plan a release without running it.

use std::path::{Path, PathBuf};

use shipyard_core::config::{PublishingSettings, ShipyardConfig, CONFIG_FILE};
use shipyard_core::properties::{load_properties_file, PropertyResolver, PROPERTIES_FILE};
use shipyard_core::registry::Activation;
use shipyard_core::stage::{classify, StageClassification};
use shipyard_planner::planner::{self, Plan, PlanRequest};
use shipyard_util::progress::status_info;

/// A release resolved and planned for one invocation.
#[derive(Debug, Clone)]
pub struct ReleasePlan {
    pub classification: StageClassification,
    pub settings: PublishingSettings,
    pub activation: Activation,
    pub build_dir: PathBuf,
    pub plan: Plan,
}

/// Property resolver over the process environment and the project's
/// properties file.
pub fn load_resolver(project_root: &Path) -> miette::Result<PropertyResolver> {
    let properties = load_properties_file(&project_root.join(PROPERTIES_FILE))?;
    Ok(PropertyResolver::from_process_env(properties))
}

/// Classify the invocation and, if it is a release, plan it.
///
/// Returns `None` without reading any configuration when no task name
/// requests a release.
pub fn plan_release<S: AsRef<str>>(
    project_root: &Path,
    task_names: &[S],
    resolver: &PropertyResolver,
) -> miette::Result<Option<ReleasePlan>> {
    if !classify(task_names, false).is_release() {
        tracing::debug!("invocation is not a release, nothing to plan");
        return Ok(None);
    }

    let config = ShipyardConfig::load(&project_root.join(CONFIG_FILE))?;
    let settings = PublishingSettings::resolve(&config, resolver);
    let classification = classify(task_names, settings.publish_candidate_to_central);
    let Some(stage) = classification.stage else {
        return Ok(None);
    };
    tracing::info!("classified invocation as a {stage} release");

    if settings.signing.is_none() {
        tracing::info!(
            "signing key and/or password are not configured, artifacts will not be signed"
        );
    }

    let registry = settings.registry()?;
    let activation = registry.activation(stage, settings.publish_candidate_to_central)?;
    let request = PlanRequest::new(stage, activation.clone())
        .with_signing(settings.signing.is_some())
        .with_publications(settings.publications.clone());
    let plan = planner::plan(&request)?;

    Ok(Some(ReleasePlan {
        classification,
        settings,
        activation,
        build_dir: project_root.join(&config.project.build_dir),
        plan,
    }))
}

/// One line per operation in execution order, then one per skipped
/// operation.
pub fn describe(plan: &Plan) -> Vec<String> {
    let mut lines: Vec<String> = plan
        .operations()
        .iter()
        .enumerate()
        .map(|(i, op)| format!("{:>3}. {}", i + 1, op.task_name()))
        .collect();
    lines.extend(
        plan.skipped()
            .iter()
            .map(|skip| format!("   - {} (skipped: {})", skip.key.task_name(), skip.reason)),
    );
    lines
}

/// Print the plan of a release.
pub fn print_plan(release: &ReleasePlan) {
    let targets: Vec<&str> = release
        .activation
        .active
        .iter()
        .map(|t| t.name.as_str())
        .collect();
    status_info(
        "Planned",
        &format!(
            "{} release to {}",
            release.plan.stage(),
            if targets.is_empty() {
                "no targets".to_string()
            } else {
                targets.join(", ")
            }
        ),
    );
    for line in describe(&release.plan) {
        eprintln!("{line}");
    }
}
