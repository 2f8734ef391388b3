use super::{error_response, invalid_request};
use crate::{
    api::AppState,
    recovery::{service::ChallengeQuestionResponse, RecoveryInitiation},
};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct SecurityQuestionParams {
    /// Username, optionally qualified with `@tenant`.
    pub username: Option<String>,
    /// User-store domain; skips the directory search when set.
    pub realm: Option<String>,
    /// Tenant domain; blank means the super tenant.
    #[serde(rename = "tenant-domain")]
    pub tenant_domain: Option<String>,
}

#[utoipa::path(
    get,
    path= "/v1/security-question",
    params(SecurityQuestionParams),
    responses (
        (status = 200, description = "Challenge question to answer", body = ChallengeQuestionResponse),
        (status = 204, description = "No challenge question configured for the user"),
        (status = 400, description = "Unknown or ambiguous user, or account not eligible", body = super::ErrorBody),
        (status = 500, description = "Server Error", body = super::ErrorBody),
    ),
    tag= "recovery"
)]
#[instrument(skip(state))]
pub async fn security_question(
    state: Extension<Arc<AppState>>,
    Query(params): Query<SecurityQuestionParams>,
) -> Response {
    let Some(username) = params.username.filter(|u| !u.trim().is_empty()) else {
        return invalid_request("username is required");
    };

    match state
        .service
        .initiate(
            &username,
            params.tenant_domain.as_deref().unwrap_or_default(),
            params.realm.as_deref().unwrap_or_default(),
        )
        .await
    {
        Ok(RecoveryInitiation::Challenge(response)) => {
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(RecoveryInitiation::NoContent) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(&err),
    }
}
