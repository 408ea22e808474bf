//! Repository authentication.
//!
//! Credentials come from the resolved publishing settings; both the upload
//! repositories and the staging REST API use HTTP basic auth.

use reqwest::RequestBuilder;
use shipyard_core::target::Credentials;

use crate::repository::MavenRepository;

/// Apply basic authentication to a request.
pub fn apply_credentials(request: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    request.basic_auth(&credentials.username, Some(&credentials.password))
}

/// Apply authentication to a request if the repository has credentials.
pub fn apply_auth(request: RequestBuilder, repo: &MavenRepository) -> RequestBuilder {
    match &repo.credentials {
        Some(credentials) => apply_credentials(request, credentials),
        None => request,
    }
}
