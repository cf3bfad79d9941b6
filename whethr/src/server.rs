use axum::{
    Form, Json, Router,
    extract::{
        ConnectInfo, Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::{net::SocketAddr, sync::Arc};
use tower_http::trace::TraceLayer;
use whethr_core::{FORM_SLOT, HatAdvisor, HatReport, QueryParams, SessionStore};

use crate::{error::WebResult, pages::Pages};

pub const HAT_PATH: &str = "/should_wear_a_hat";
const SESSION_COOKIE: &str = "whethr_session";

/// Shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub advisor: Arc<HatAdvisor>,
    pub sessions: Arc<dyn SessionStore>,
    pub pages: Arc<Pages>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(HAT_PATH, get(show_hat).post(submit_hat))
        // Older name for the same page.
        .route("/i_should_wear_a_hat", get(show_hat))
        .route("/api/should_wear_a_hat", get(hat_json))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    let app = router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// 302, as opposed to axum's `Redirect` helpers which use 303/307.
fn found(location: &'static str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

async fn root() -> Response {
    found(HAT_PATH)
}

/// Parameters that fail to parse (e.g. a repeated key) are treated as absent.
fn params_or_default(extracted: Result<QueryParams, impl std::fmt::Display>) -> QueryParams {
    match extracted {
        Ok(params) => params,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "ignoring unparseable location parameters");
            QueryParams::default()
        }
    }
}

/// Consume form fields left behind by a POST in this session, if any.
fn take_form(state: &AppState, jar: &CookieJar) -> Option<QueryParams> {
    let session_id = jar.get(SESSION_COOKIE)?.value();
    state.sessions.take(session_id, FORM_SLOT)
}

async fn show_hat(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> WebResult<Html<String>> {
    let params = match take_form(&state, &jar) {
        Some(form) => form,
        None => params_or_default(query.map(|Query(q)| q)),
    };
    let report = state.advisor.advise(&params, Some(peer.ip())).await;
    state.pages.hat(&report, &params).map(Html)
}

async fn submit_hat(
    State(state): State<AppState>,
    jar: CookieJar,
    form: Result<Form<QueryParams>, FormRejection>,
) -> (CookieJar, Response) {
    let form = params_or_default(form.map(|Form(f)| f));

    let (jar, session_id) = match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            let id = cookie.value().to_string();
            (jar, id)
        }
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax)
                .build();
            (jar.add(cookie), id)
        }
    };

    tracing::debug!(session = %session_id, "stashing submitted form");
    state.sessions.put(&session_id, FORM_SLOT, form);

    (jar, found(HAT_PATH))
}

async fn hat_json(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    query: Result<Query<QueryParams>, QueryRejection>,
) -> Json<HatReport> {
    let params = params_or_default(query.map(|Query(q)| q));
    Json(state.advisor.advise(&params, Some(peer.ip())).await)
}

async fn not_found(
    State(state): State<AppState>,
    uri: Uri,
) -> WebResult<(StatusCode, Html<String>)> {
    let page = state.pages.not_found(uri.path())?;
    Ok((StatusCode::NOT_FOUND, Html(page)))
}
