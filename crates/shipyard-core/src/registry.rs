//! Target registry: the configured publish targets and their activation.

use std::collections::BTreeMap;

use shipyard_util::errors::ShipyardError;

use crate::stage::ReleaseStage;
use crate::target::{ActiveTarget, InactiveTarget, PublishTarget, TargetStyle};

/// Active and inactive targets for one stage, both sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activation {
    pub active: Vec<ActiveTarget>,
    pub inactive: Vec<InactiveTarget>,
}

/// All publish targets of an invocation, keyed by name.
///
/// Populated once during configuration resolution and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: BTreeMap<String, PublishTarget>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target. Names must be unique.
    pub fn register(&mut self, target: PublishTarget) -> Result<(), ShipyardError> {
        if self.targets.contains_key(&target.name) {
            return Err(ShipyardError::Config {
                message: format!("publish target '{}' is already registered", target.name),
            });
        }
        tracing::debug!("registered publish target {}", target.name);
        self.targets.insert(target.name.clone(), target);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PublishTarget> {
        self.targets.get(name)
    }

    pub fn targets(&self) -> impl Iterator<Item = &PublishTarget> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets that take part in a release of `stage`.
    pub fn active_targets(
        &self,
        stage: ReleaseStage,
        publish_candidate_to_central: bool,
    ) -> Result<Vec<ActiveTarget>, ShipyardError> {
        Ok(self.activation(stage, publish_candidate_to_central)?.active)
    }

    /// Targets that sit out a release of `stage`, each with the reason.
    pub fn inactive_targets(
        &self,
        stage: ReleaseStage,
        publish_candidate_to_central: bool,
    ) -> Result<Vec<InactiveTarget>, ShipyardError> {
        Ok(self.activation(stage, publish_candidate_to_central)?.inactive)
    }

    /// Split the registry into active and inactive targets for `stage`.
    ///
    /// Validation is lazy: a target is only checked for required settings
    /// when it would otherwise be active, so an incomplete internal target is
    /// silently disabled and an inactive central target is never an error.
    pub fn activation(
        &self,
        stage: ReleaseStage,
        publish_candidate_to_central: bool,
    ) -> Result<Activation, ShipyardError> {
        let mut activation = Activation::default();
        for target in self.targets.values() {
            match activate(target, stage, publish_candidate_to_central)? {
                Ok(active) => activation.active.push(active),
                Err(reason) => {
                    tracing::info!("publish target {} is inactive: {reason}", target.name);
                    activation.inactive.push(InactiveTarget {
                        name: target.name.clone(),
                        requires_staging: target.requires_staging,
                        is_central: target.is_central(),
                        reason,
                    });
                }
            }
        }
        Ok(activation)
    }
}

/// Outer `Err` is a configuration error; inner `Err` is the reason the
/// target is inactive.
fn activate(
    target: &PublishTarget,
    stage: ReleaseStage,
    publish_candidate_to_central: bool,
) -> Result<Result<ActiveTarget, String>, ShipyardError> {
    let url = match &target.style {
        TargetStyle::Internal(repositories) => {
            let Some(base_url) = non_blank(target.base_url.as_deref()) else {
                return Ok(Err("repository base URL is not configured".to_string()));
            };
            let Some(repository) = repositories.for_stage(stage) else {
                return Ok(Err(format!("no repository configured for {stage} releases")));
            };
            if target.credentials.is_none() {
                return Ok(Err("username and/or password are not configured".to_string()));
            }
            format!("{}/{}", base_url.trim_end_matches('/'), repository)
        }
        TargetStyle::Central => {
            if !stage.submits_to_central(publish_candidate_to_central) {
                return Ok(Err(format!(
                    "{stage} releases are not submitted to Maven Central"
                )));
            }
            let Some(base_url) = non_blank(target.base_url.as_deref()) else {
                return Err(config_error(target, "a staging server URL is required"));
            };
            if target.credentials.is_none() {
                return Err(config_error(target, "username and password are required"));
            }
            base_url.to_string()
        }
    };

    if target.requires_staging && non_blank(target.staging_profile_id.as_deref()).is_none() {
        return Err(config_error(target, "a staging profile id is required"));
    }

    let Some(credentials) = target.credentials.clone() else {
        return Ok(Err("username and/or password are not configured".to_string()));
    };

    Ok(Ok(ActiveTarget {
        name: target.name.clone(),
        url,
        credentials,
        requires_staging: target.requires_staging,
        staging_profile_id: target.staging_profile_id.clone(),
        package_group: target.package_group.clone(),
        allow_insecure_protocol: target.allow_insecure_protocol,
        is_central: target.is_central(),
    }))
}

fn config_error(target: &PublishTarget, message: &str) -> ShipyardError {
    ShipyardError::Config {
        message: format!("publish target '{}': {message}", target.name),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
