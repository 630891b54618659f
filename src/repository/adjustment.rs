use sqlx::PgConnection;

use crate::error::AppError;
use crate::models::adjustment::{AdjustmentDetail, AdjustmentHeader};
use crate::workflow::{AdjustmentBatch, AdjustmentLine};

/// Loads the batch and holds a row lock on its header until the transaction ends.
pub async fn lock_batch(conn: &mut PgConnection, header_id: i64) -> Result<AdjustmentBatch, AppError> {
    fetch(conn, header_id, "FOR UPDATE").await
}

pub async fn load_batch(conn: &mut PgConnection, header_id: i64) -> Result<AdjustmentBatch, AppError> {
    fetch(conn, header_id, "").await
}

async fn fetch(
    conn: &mut PgConnection,
    header_id: i64,
    lock: &str,
) -> Result<AdjustmentBatch, AppError> {
    let header = sqlx::query_as::<_, AdjustmentHeader>(&format!(
        "SELECT id, description, version FROM adjustment_headers WHERE id = $1 {lock}"
    ))
    .bind(header_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Adjustment batch not found"))?;

    let lines = sqlx::query_as::<_, AdjustmentDetail>(
        "SELECT id, product_id, quantity_adjust, quantity_applied, applied_at
         FROM adjustment_details WHERE header_id = $1 ORDER BY id",
    )
    .bind(header_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(AdjustmentBatch {
        id: header.id,
        description: header.description,
        version: header.version,
        lines: lines.into_iter().map(AdjustmentLine::from).collect(),
    })
}

/// Adds a zeroed line per product. Products that already have a line are left alone.
pub async fn insert_lines(
    conn: &mut PgConnection,
    header_id: i64,
    product_ids: &[i64],
) -> Result<Vec<AdjustmentDetail>, AppError> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, AdjustmentDetail>(
        "INSERT INTO adjustment_details (header_id, product_id, quantity_adjust)
         SELECT $1, product_id, 0 FROM UNNEST($2::BIGINT[]) AS t(product_id)
         ON CONFLICT (header_id, product_id) DO NOTHING
         RETURNING id, product_id, quantity_adjust, quantity_applied, applied_at",
    )
    .bind(header_id)
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn save_lines(
    conn: &mut PgConnection,
    batch: &AdjustmentBatch,
    line_ids: &[i64],
) -> Result<(), AppError> {
    for line in batch.lines.iter().filter(|l| line_ids.contains(&l.id)) {
        sqlx::query(
            "UPDATE adjustment_details
             SET quantity_adjust = $1, quantity_applied = $2, applied_at = $3
             WHERE id = $4 AND header_id = $5",
        )
        .bind(line.quantity_adjust)
        .bind(line.quantity_applied)
        .bind(line.applied_at)
        .bind(line.id)
        .bind(batch.id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub async fn delete_line(conn: &mut PgConnection, header_id: i64, line_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM adjustment_details WHERE id = $1 AND header_id = $2")
        .bind(line_id)
        .bind(header_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn bump_version(conn: &mut PgConnection, header_id: i64) -> Result<i64, AppError> {
    let version = sqlx::query_scalar::<_, i64>(
        "UPDATE adjustment_headers SET version = version + 1 WHERE id = $1 RETURNING version",
    )
    .bind(header_id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(version)
}
