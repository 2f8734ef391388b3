use super::{error_response, invalid_request, valid_locale};
use crate::{api::AppState, recovery::question::ChallengeQuestion};
use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct LocaleParams {
    /// Locale such as `en_US`; omitted lists every record.
    pub locale: Option<String>,
}

/// First problem with `questions`, if any.
fn validate(questions: &[ChallengeQuestion]) -> Option<String> {
    if questions.is_empty() {
        return Some("at least one challenge question is required".to_string());
    }
    questions.iter().find_map(|q| {
        if q.question_set_id.trim().is_empty()
            || q.question_id.trim().is_empty()
            || q.question.trim().is_empty()
        {
            Some("question set id, question id and question are required".to_string())
        } else if !valid_locale(&q.locale) {
            Some(format!("invalid locale: {}", q.locale))
        } else {
            None
        }
    })
}

#[utoipa::path(
    get,
    path= "/v1/challenge-questions",
    params(LocaleParams),
    responses (
        (status = 200, description = "Challenge questions", body = [ChallengeQuestion]),
        (status = 400, description = "Invalid locale", body = super::ErrorBody),
        (status = 500, description = "Server Error", body = super::ErrorBody),
    ),
    tag= "challenge-questions"
)]
#[instrument(skip(state))]
pub async fn list_challenge_questions(
    state: Extension<Arc<AppState>>,
    Query(params): Query<LocaleParams>,
) -> Response {
    let result = match params.locale.as_deref().map(str::trim) {
        Some(locale) if !locale.is_empty() => {
            if !valid_locale(locale) {
                return invalid_request(format!("invalid locale: {locale}"));
            }
            state.catalog.list_by_locale(locale).await
        }
        _ => state.catalog.list_all().await,
    };

    match result {
        Ok(questions) => (StatusCode::OK, Json(questions)).into_response(),
        Err(err) => {
            error!("Failed to list challenge questions: {}", err.chain());
            error_response(&err)
        }
    }
}

#[utoipa::path(
    post,
    path= "/v1/challenge-questions",
    request_body = [ChallengeQuestion],
    responses (
        (status = 201, description = "Questions added or updated; returns the full catalog", body = [ChallengeQuestion]),
        (status = 400, description = "Missing or invalid payload", body = super::ErrorBody),
        (status = 500, description = "Server Error", body = super::ErrorBody),
    ),
    tag= "challenge-questions"
)]
#[instrument(skip(state, payload))]
pub async fn add_challenge_questions(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<Vec<ChallengeQuestion>>>,
) -> Response {
    let Some(Json(questions)) = payload else {
        return invalid_request("Missing payload");
    };
    if let Some(problem) = validate(&questions) {
        return invalid_request(problem);
    }

    if let Err(err) = state.catalog.add(&questions).await {
        error!("Failed to add challenge questions: {}", err.chain());
        return error_response(&err);
    }
    info!(count = questions.len(), "challenge questions added");

    match state.catalog.list_all().await {
        Ok(all) => (StatusCode::CREATED, Json(all)).into_response(),
        Err(err) => {
            error!("Failed to list challenge questions: {}", err.chain());
            error_response(&err)
        }
    }
}

#[utoipa::path(
    delete,
    path= "/v1/challenge-questions",
    request_body = [ChallengeQuestion],
    responses (
        (status = 204, description = "Matching questions removed"),
        (status = 400, description = "Missing or invalid payload", body = super::ErrorBody),
        (status = 500, description = "Server Error", body = super::ErrorBody),
    ),
    tag= "challenge-questions"
)]
#[instrument(skip(state, payload))]
pub async fn delete_challenge_questions(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<Vec<ChallengeQuestion>>>,
) -> Response {
    let Some(Json(questions)) = payload else {
        return invalid_request("Missing payload");
    };

    match state.catalog.delete(&questions).await {
        Ok(()) => {
            info!(count = questions.len(), "challenge questions deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            error!("Failed to delete challenge questions: {}", err.chain());
            error_response(&err)
        }
    }
}
