use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::dtos::customer::{CustomerRequest, CustomerResponse};
use crate::dtos::product::error_summary;
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::state::AppState;

const CUSTOMER_COLUMNS: &str =
    "id, fullname, balance::FLOAT8 AS balance, remarks, created_at, updated_at";

#[instrument(skip(state))]
pub async fn get_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let customers = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY fullname, id"
    ))
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(customers.into_iter().map(CustomerResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_customer(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = sqlx::query_as::<_, Customer>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Customer not found"))?;

    Ok(Json(CustomerResponse::from(customer)))
}

#[instrument(skip(state, payload))]
pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    let valid = payload
        .validate()
        .map_err(|errors| AppError::validation(error_summary(&errors)))?;

    let customer = sqlx::query_as::<_, Customer>(&format!(
        "INSERT INTO customers (fullname, balance, remarks)
         VALUES ($1, $2, $3) RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(&valid.fullname)
    .bind(valid.balance)
    .bind(&valid.remarks)
    .fetch_one(&state.db_pool)
    .await?;

    info!(id = customer.id, "Customer added");
    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

#[instrument(skip(state, payload))]
pub async fn update_customer(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<CustomerRequest>,
) -> Result<Json<CustomerResponse>, AppError> {
    let valid = payload
        .validate()
        .map_err(|errors| AppError::validation(error_summary(&errors)))?;

    let customer = sqlx::query_as::<_, Customer>(&format!(
        "UPDATE customers SET fullname = $1, balance = $2, remarks = $3, updated_at = NOW()
         WHERE id = $4 RETURNING {CUSTOMER_COLUMNS}"
    ))
    .bind(&valid.fullname)
    .bind(valid.balance)
    .bind(&valid.remarks)
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Customer not found"))?;

    Ok(Json(CustomerResponse::from(customer)))
}

#[instrument(skip(state))]
pub async fn delete_customer(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Customer not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
