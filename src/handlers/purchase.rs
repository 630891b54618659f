use std::collections::{BTreeSet, HashMap};

use axum::{
    extract::{Extension, Form, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use crate::dtos::workflow::{PurchaseSnapshot, WorkflowResponse};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::repository::{ledger, purchase as orders};
use crate::state::AppState;
use crate::workflow::form::{self, PurchaseAction, PurchaseSubmission};
use crate::workflow::{PurchaseLine, DEFAULT_WORKSPACE_ID};

type PurchaseReply = (StatusCode, Json<WorkflowResponse<PurchaseSnapshot>>);

async fn snapshot(db_pool: &PgPool) -> Result<PurchaseSnapshot, AppError> {
    let mut conn = db_pool.acquire().await?;
    let order = orders::load_order(&mut conn, DEFAULT_WORKSPACE_ID).await?;
    let ledger = ledger::load(&mut conn).await?;
    Ok(PurchaseSnapshot::new(&order, &ledger))
}

// GET /purchase - Current purchase order with status and editable fields
#[instrument(skip(state))]
pub async fn get_purchase(
    State(state): State<AppState>,
) -> Result<Json<WorkflowResponse<PurchaseSnapshot>>, AppError> {
    let data = snapshot(&state.db_pool).await?;
    Ok(Json(WorkflowResponse::success("Purchase order", data)))
}

// POST /purchase - Form submission; `submit_type` selects the action
#[instrument(skip(state, payload), fields(user = %auth.username))]
pub async fn submit_purchase(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Form(payload): Form<HashMap<String, String>>,
) -> Result<PurchaseReply, AppError> {
    let result = match form::decode_purchase(&payload) {
        Ok(submission) => run(&state.db_pool, submission).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(message) => {
            info!(%message, "Purchase order updated");
            let data = snapshot(&state.db_pool).await?;
            Ok((StatusCode::OK, Json(WorkflowResponse::success(message, data))))
        }
        Err(AppError::Workflow(err)) => {
            warn!(error = %err, "Purchase submission rejected");
            let data = snapshot(&state.db_pool).await?;
            Ok((err.status_code(), Json(WorkflowResponse::error(err.to_string(), data))))
        }
        Err(other) => Err(other),
    }
}

/// Runs one action in its own transaction. Save, start, receive and apply write the
/// submitted lines first; if the status change then fails, those writes roll back too.
async fn run(db_pool: &PgPool, submission: PurchaseSubmission) -> Result<String, AppError> {
    let mut tx = db_pool.begin().await?;
    let mut order = orders::lock_order(&mut tx, DEFAULT_WORKSPACE_ID).await?;
    let mut touched = BTreeSet::new();

    let message = match submission.action {
        PurchaseAction::LoadProducts => {
            let ledger = ledger::load(&mut tx).await?;
            let missing = order.missing_products(&ledger);
            let rows = orders::insert_lines(&mut tx, order.id, &missing).await?;
            let loaded = order.add_loaded_lines(rows.into_iter().map(PurchaseLine::from));
            format!("{loaded} product(s) loaded")
        }
        PurchaseAction::Save => {
            let ledger = ledger::load(&mut tx).await?;
            touched.extend(order.save_lines(&submission.lines, &ledger)?);
            format!("Purchase saved ({} line(s))", touched.len())
        }
        PurchaseAction::Start => {
            let ledger = ledger::load(&mut tx).await?;
            touched.extend(order.save_lines(&submission.lines, &ledger)?);
            order.start()?;
            "Purchase started".to_string()
        }
        PurchaseAction::Receive => {
            let ledger = ledger::load(&mut tx).await?;
            touched.extend(order.save_lines(&submission.lines, &ledger)?);
            order.receive()?;
            "Purchase received".to_string()
        }
        PurchaseAction::Apply => {
            let mut ledger = ledger::load_for_update(&mut tx).await?;
            touched.extend(order.save_lines(&submission.lines, &ledger)?);
            let applied = order.apply(&mut ledger)?;
            touched.extend(applied.touched);
            ledger::write_changes(&mut tx, &ledger).await?;
            format!(
                "Purchase applied: {} unit(s) added to stock",
                applied.units_received
            )
        }
        PurchaseAction::Export => {
            order.export()?;
            "Purchase exported".to_string()
        }
        PurchaseAction::DeleteLine(line_id) => match order.remove_line(line_id)? {
            Some(_) => {
                orders::delete_line(&mut tx, order.id, line_id).await?;
                format!("Line {line_id} deleted")
            }
            None => format!("Line {line_id} not found"),
        },
    };

    orders::save_lines(&mut tx, &order, &touched).await?;
    orders::save_header(&mut tx, &order).await?;
    tx.commit().await?;
    Ok(message)
}
