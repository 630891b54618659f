use std::collections::HashMap;

use axum::{
    extract::{Extension, Form, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::dtos::workflow::{AdjustmentSnapshot, WorkflowResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::repository::{adjustment as batches, ledger};
use crate::state::AppState;
use crate::workflow::form::{self, AdjustmentAction, AdjustmentSubmission};
use crate::workflow::{AdjustmentLine, DEFAULT_WORKSPACE_ID};

type AdjustmentReply = (StatusCode, Json<WorkflowResponse<AdjustmentSnapshot>>);

async fn snapshot(db_pool: &PgPool) -> Result<AdjustmentSnapshot, AppError> {
    let mut conn = db_pool.acquire().await?;
    let batch = batches::load_batch(&mut conn, DEFAULT_WORKSPACE_ID).await?;
    let ledger = ledger::load(&mut conn).await?;
    Ok(AdjustmentSnapshot::new(&batch, &ledger))
}

// GET /adjustment - Current batch with on-hand quantities
#[instrument(skip(state))]
pub async fn get_adjustment(
    State(state): State<AppState>,
) -> Result<Json<WorkflowResponse<AdjustmentSnapshot>>, AppError> {
    let data = snapshot(&state.db_pool).await?;
    Ok(Json(WorkflowResponse::success("Stock adjustment", data)))
}

// POST /adjustment - Form submission; `submit_type` selects the action
#[instrument(skip(state, payload), fields(user = %auth.username))]
pub async fn submit_adjustment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(payload): Form<HashMap<String, String>>,
) -> Result<AdjustmentReply, AppError> {
    let result = match form::decode_adjustment(&payload) {
        Ok(submission) => run(&state.db_pool, submission).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(message) => {
            info!(%message, "Adjustment updated");
            let data = snapshot(&state.db_pool).await?;
            Ok((StatusCode::OK, Json(WorkflowResponse::success(message, data))))
        }
        Err(AppError::Workflow(err)) => {
            warn!(error = %err, "Adjustment submission rejected");
            let data = snapshot(&state.db_pool).await?;
            Ok((err.status_code(), Json(WorkflowResponse::error(err.to_string(), data))))
        }
        Err(other) => Err(other),
    }
}

/// Runs one action in its own transaction. Any error drops the transaction, which rolls
/// back every write made so far.
async fn run(db_pool: &PgPool, submission: AdjustmentSubmission) -> Result<String, AppError> {
    let mut tx = db_pool.begin().await?;
    let mut batch = batches::lock_batch(&mut tx, DEFAULT_WORKSPACE_ID).await?;

    let message = match submission.action {
        AdjustmentAction::LoadProducts => {
            let ledger = ledger::load(&mut tx).await?;
            let missing = batch.missing_products(&ledger);
            let rows = batches::insert_lines(&mut tx, batch.id, &missing).await?;
            let loaded = batch.add_loaded_lines(rows.into_iter().map(AdjustmentLine::from));
            format!("{loaded} product(s) loaded")
        }
        AdjustmentAction::Save => {
            let touched = batch.stage(&submission.updates);
            batches::save_lines(&mut tx, &batch, &touched).await?;
            format!("Adjustment saved ({} line(s))", touched.len())
        }
        AdjustmentAction::Apply => {
            let mut ledger = ledger::load_for_update(&mut tx).await?;
            let applied = batch.apply(&submission.updates, &mut ledger, Utc::now())?;
            batches::save_lines(&mut tx, &batch, &applied.touched).await?;
            ledger::write_changes(&mut tx, &ledger).await?;
            format!("Adjustment applied to {} product(s)", applied.applied)
        }
        AdjustmentAction::DeleteLine(line_id) => match batch.remove_line(line_id) {
            Some(_) => {
                batches::delete_line(&mut tx, batch.id, line_id).await?;
                format!("Line {line_id} deleted")
            }
            None => format!("Line {line_id} not found"),
        },
    };

    batches::bump_version(&mut tx, batch.id).await?;
    tx.commit().await?;
    Ok(message)
}
