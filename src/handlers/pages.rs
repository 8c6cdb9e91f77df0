use axum::{extract::State, response::Html, Form};
use std::sync::Arc;

use super::ApiError;
use crate::aggregate::Submission;
use crate::schema::{DeviceClassSchema, ROUTER, SWITCH};
use crate::AppState;

/// GET /: landing page
pub async fn index(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.views.index()?))
}

/// GET /switches
pub async fn switches_form(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.views.device_class(&SWITCH, None, None)?))
}

/// POST /switches: configure every submitted switch card
pub async fn switches_submit(
    State(state): State<Arc<AppState>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Html<String>, ApiError> {
    submit(&state, &SWITCH, pairs).await
}

/// GET /routers
pub async fn routers_form(State(state): State<Arc<AppState>>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.views.device_class(&ROUTER, None, None)?))
}

/// POST /routers: configure every submitted router card
pub async fn routers_submit(
    State(state): State<Arc<AppState>>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Html<String>, ApiError> {
    submit(&state, &ROUTER, pairs).await
}

/// Run a form submission and render the page with its report, or with the
/// validation message when no device could be read from it
async fn submit(
    state: &AppState,
    schema: &DeviceClassSchema,
    pairs: Vec<(String, String)>,
) -> Result<Html<String>, ApiError> {
    let submission = Submission::from_pairs(pairs);

    let html = match state.provision(schema, &submission).await {
        Ok(result) => state.views.device_class(
            schema,
            result.combined_report().as_deref(),
            result.combined_failures().as_deref(),
        )?,
        Err(e) => {
            tracing::info!("Rejected {} submission: {}", schema.prefix, e);
            state.views.device_class(schema, None, Some(e.message()))?
        }
    };
    Ok(Html(html))
}
