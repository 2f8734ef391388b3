use crate::recovery::{
    question::ChallengeQuestion, service::ChallengeQuestionResponse, ChallengeQuestionCatalog,
    RecoveryPreconditionService,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::get,
    Extension, Router,
};
use std::sync::Arc;
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;

const REQUEST_ID: &str = "x-request-id";

/// Shared state handed to every handler.
pub struct AppState {
    pub catalog: Arc<ChallengeQuestionCatalog>,
    pub service: RecoveryPreconditionService,
}

impl AppState {
    #[must_use]
    pub fn new(catalog: Arc<ChallengeQuestionCatalog>, service: RecoveryPreconditionService) -> Self {
        Self { catalog, service }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::security_question::security_question,
        handlers::challenge_questions::list_challenge_questions,
        handlers::challenge_questions::add_challenge_questions,
        handlers::challenge_questions::delete_challenge_questions,
    ),
    components(
        schemas(
            handlers::health::Health,
            handlers::ErrorBody,
            ChallengeQuestion,
            ChallengeQuestionResponse,
        )
    ),
    tags(
        (name = "recovery", description = "Security question based password recovery"),
        (name = "challenge-questions", description = "Challenge question catalog management"),
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

/// Build the application router around `state`.
pub fn router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .route(
            "/v1/security-question",
            get(handlers::security_question::security_question),
        )
        .route(
            "/v1/challenge-questions",
            get(handlers::challenge_questions::list_challenge_questions)
                .post(handlers::challenge_questions::add_challenge_questions)
                .delete(handlers::challenge_questions::delete_challenge_questions),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static(REQUEST_ID),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    REQUEST_ID,
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state.clone())),
        )
        .route(
            "/health",
            get(handlers::health::health).options(handlers::health::health),
        )
        .layer(Extension(state))
}

/// Serve the API on `port` until Ctrl+C or SIGTERM.
/// # Errors
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID)
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
