// src/handlers/product.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgConnection;
use crate::dtos::product::{error_summary, ProductRequest, ProductResponse, ValidProduct};
use crate::error::{map_unique_violation, AppError};
use crate::models::product::{Product, PRODUCT_COLUMNS};
use crate::state::AppState;
use tracing::{error, info, instrument};

fn duplicate_code(code: &str) -> AppError {
    AppError::validation(error_summary(&[format!("Product code: {code} already exist")]))
}

/// Validates the request and checks the code is not taken by another product.
async fn validated(
    conn: &mut PgConnection,
    payload: &ProductRequest,
    exclude_id: Option<i64>,
) -> Result<ValidProduct, AppError> {
    let (valid, mut errors) = match payload.validate() {
        Ok(valid) => (Some(valid), Vec::new()),
        Err(errors) => (None, errors),
    };

    let code = payload.code.trim();
    if !code.is_empty() {
        let taken = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM products WHERE code = $1 AND ($2::BIGINT IS NULL OR id <> $2))",
        )
        .bind(code)
        .bind(exclude_id)
        .fetch_one(conn)
        .await?;
        if taken {
            errors.push(format!("Product code: {code} already exist"));
        }
    }

    match valid {
        Some(valid) if errors.is_empty() => Ok(valid),
        _ => Err(AppError::validation(error_summary(&errors))),
    }
}

// GET /products - List all products, most recently updated first
#[instrument(skip(state))]
pub async fn get_products(State(state): State<AppState>) -> Result<Json<Vec<ProductResponse>>, AppError> {
    match sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY updated_at DESC, id DESC"
    ))
        .fetch_all(&state.db_pool)
        .await {
        Ok(products) => {
            let response = products.into_iter().map(ProductResponse::from).collect();
            Ok(Json(response))
        }
        Err(e) => {
            error!(?e, "Failed to fetch products");
            Err(e.into())
        }
    }
}

// GET /products/:id - Get single product
#[instrument(skip(state))]
pub async fn get_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ProductResponse>, AppError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    Ok(Json(ProductResponse::from(product)))
}

// POST /products - Create new product
#[instrument(skip(state, payload))]
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    let mut conn = state.db_pool.acquire().await?;
    let valid = validated(&mut conn, &payload, None).await?;

    let product = sqlx::query_as::<_, Product>(&format!(
        "INSERT INTO products (code, name, quantity, price)
         VALUES ($1, $2, $3, $4) RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&valid.code)
    .bind(&valid.name)
    .bind(valid.quantity)
    .bind(valid.price)
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| map_unique_violation(e, || duplicate_code(&valid.code)))?;

    info!(id = product.id, code = %product.code, "Product added");
    Ok((StatusCode::CREATED, Json(ProductResponse::from(product))))
}

// PUT /products/:id - Update product
#[instrument(skip(state, payload))]
pub async fn update_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ProductResponse>, AppError> {
    let mut conn = state.db_pool.acquire().await?;
    let valid = validated(&mut conn, &payload, Some(id)).await?;

    let product = sqlx::query_as::<_, Product>(&format!(
        "UPDATE products SET
         code = $1,
         name = $2,
         quantity = $3,
         price = $4,
         updated_at = NOW()
         WHERE id = $5 RETURNING {PRODUCT_COLUMNS}"
    ))
    .bind(&valid.code)
    .bind(&valid.name)
    .bind(valid.quantity)
    .bind(valid.price)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_unique_violation(e, || duplicate_code(&valid.code)))?
    .ok_or_else(|| AppError::not_found("Product not found"))?;

    info!(id, code = %product.code, "Product updated");
    Ok(Json(ProductResponse::from(product)))
}

// DELETE /products/:id - Delete product; its workflow lines go with it
#[instrument(skip(state))]
pub async fn delete_product(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Product not found"));
    }

    info!(id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}
