use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::{class_schema, ApiError};
use crate::aggregate::{aggregate, Submission};
use crate::models::{DeviceFailure, DeviceRecord, DeviceReport};
use crate::AppState;

/// Field name → values, the JSON form of an indexed submission
pub type SubmissionBody = HashMap<String, Vec<String>>;

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub devices: Vec<DeviceRecord>,
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub batch_id: String,
    /// Combined report of every device that ran
    pub output: Option<String>,
    /// Combined failure text, absent when every device succeeded
    pub error: Option<String>,
    pub reports: Vec<DeviceReport>,
    pub failures: Vec<DeviceFailure>,
}

/// POST /api/:class/preview: aggregate without running any job
pub async fn preview(
    Path(class): Path<String>,
    Json(body): Json<SubmissionBody>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let schema = class_schema(&class)?;
    let devices = aggregate(&Submission::from(body), schema)?;
    Ok(Json(PreviewResponse { devices }))
}

/// POST /api/:class/run: aggregate and configure every device
pub async fn run(
    State(state): State<Arc<AppState>>,
    Path(class): Path<String>,
    Json(body): Json<SubmissionBody>,
) -> Result<Json<RunResponse>, ApiError> {
    let schema = class_schema(&class)?;
    let result = state.provision(schema, &Submission::from(body)).await?;

    Ok(Json(RunResponse {
        batch_id: result.batch_id.clone(),
        output: result.combined_report(),
        error: result.combined_failures(),
        reports: result.reports,
        failures: result.failures,
    }))
}
