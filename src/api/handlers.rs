use crate::db::OrderRepository;
use crate::error::VerificationError;
use crate::models::{
    ApplyChangesResult, ApprovedChangeSet, ChangePlan, VerificationItemInput, VerificationResult,
};
use crate::service::{report, VerificationService};
use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body: external list for one delivery
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub delivery_id: i64,
    pub items: Vec<VerificationItemInput>,
}

#[derive(Debug, Serialize)]
pub struct CompareResponse {
    pub success: bool,
    pub message: String,
    pub result: Option<VerificationResult>,
}

/// Request body: a previous result plus the operator's selection
#[derive(Debug, Deserialize)]
pub struct ApplyRequest {
    pub result: VerificationResult,
    #[serde(default)]
    pub approved: ApprovedChangeSet,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub success: bool,
    pub message: String,
    pub plan: ChangePlan,
}

#[derive(Debug, Serialize)]
pub struct ApplyResponse {
    pub success: bool,
    pub message: String,
    pub result: Option<ApplyChangesResult>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
}

#[derive(Debug, Deserialize)]
pub struct ReportRequest {
    pub delivery_id: i64,
    pub items: Vec<VerificationItemInput>,
    #[serde(default)]
    pub format: ReportFormat,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

fn error_response(e: &VerificationError) -> Response {
    let status = match e {
        VerificationError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!("Request failed: {}", e);
    }
    let body = ErrorResponse {
        success: false,
        message: format!("Error: {}", e),
    };
    (status, Json(body)).into_response()
}

fn validate(items: &[VerificationItemInput]) -> Result<(), VerificationError> {
    items
        .iter()
        .enumerate()
        .try_for_each(|(idx, item)| item.validate(idx + 1))
}

/// Health check
pub async fn health_check() -> &'static str {
    "OK"
}

/// Compare an external list with a delivery
pub async fn compare<R: OrderRepository + 'static>(
    State(service): State<Arc<VerificationService<R>>>,
    Json(req): Json<CompareRequest>,
) -> Response {
    if let Err(e) = validate(&req.items) {
        return error_response(&e);
    }

    match service.compare(&req.items, req.delivery_id).await {
        Ok(result) => {
            let s = &result.summary;
            let response = CompareResponse {
                success: true,
                message: format!(
                    "Verified {} items: {} matched, {} missing, {} excess, {} not found, {} duplicates",
                    s.total_items, s.matched, s.missing, s.excess, s.not_found, s.duplicates
                ),
                result: Some(result),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Show which operations an approval would run, without touching the store
pub async fn preview<R: OrderRepository + 'static>(
    State(service): State<Arc<VerificationService<R>>>,
    Json(req): Json<ApplyRequest>,
) -> Response {
    let plan = service.preview(&req.result, &req.approved);
    let response = PreviewResponse {
        success: plan.rejected.is_empty(),
        message: format!(
            "{} operations planned, {} selections rejected",
            plan.ops.len(),
            plan.rejected.len()
        ),
        plan,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Apply approved corrections (all or nothing)
pub async fn apply<R: OrderRepository + 'static>(
    State(service): State<Arc<VerificationService<R>>>,
    Json(req): Json<ApplyRequest>,
) -> Response {
    match service.apply(&req.result, &req.approved).await {
        Ok(result) => {
            let status = if result.committed {
                StatusCode::OK
            } else {
                StatusCode::CONFLICT
            };
            let response = ApplyResponse {
                success: result.committed,
                message: if result.committed {
                    format!("Linked {}, unlinked {}", result.linked, result.unlinked)
                } else {
                    format!("Rolled back, {} operations failed", result.failed.len())
                },
                result: Some(result),
            };
            (status, Json(response)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Compare and render the difference report as text or CSV
pub async fn report<R: OrderRepository + 'static>(
    State(service): State<Arc<VerificationService<R>>>,
    Json(req): Json<ReportRequest>,
) -> Response {
    if let Err(e) = validate(&req.items) {
        return error_response(&e);
    }

    let result = match service.compare(&req.items, req.delivery_id).await {
        Ok(result) => result,
        Err(e) => return error_response(&e),
    };

    match req.format {
        ReportFormat::Text => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            report::difference_report(&result),
        )
            .into_response(),
        ReportFormat::Csv => {
            let mut buf = Vec::new();
            if let Err(e) = report::write_csv(&result, &mut buf) {
                tracing::error!("CSV export failed: {}", e);
                return (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {}", e)).into_response();
            }
            (StatusCode::OK, [(header::CONTENT_TYPE, "text/csv")], buf).into_response()
        }
    }
}
