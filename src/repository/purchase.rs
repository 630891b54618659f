use sqlx::PgConnection;

use crate::error::AppError;
use crate::models::purchase::{PurchaseDetail, PurchaseHeader};
use crate::workflow::{PurchaseLine, PurchaseOrder};

/// Loads the order and holds a row lock on its header until the transaction ends.
pub async fn lock_order(conn: &mut PgConnection, header_id: i64) -> Result<PurchaseOrder, AppError> {
    fetch(conn, header_id, "FOR UPDATE").await
}

pub async fn load_order(conn: &mut PgConnection, header_id: i64) -> Result<PurchaseOrder, AppError> {
    fetch(conn, header_id, "").await
}

async fn fetch(conn: &mut PgConnection, header_id: i64, lock: &str) -> Result<PurchaseOrder, AppError> {
    let header = sqlx::query_as::<_, PurchaseHeader>(&format!(
        "SELECT id, description, status, version FROM purchase_headers WHERE id = $1 {lock}"
    ))
    .bind(header_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::not_found("Purchase order not found"))?;

    let lines = sqlx::query_as::<_, PurchaseDetail>(
        "SELECT id, product_id, quantity_purchase, quantity_receive
         FROM purchase_details WHERE header_id = $1 ORDER BY id",
    )
    .bind(header_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(PurchaseOrder {
        id: header.id,
        description: header.description,
        status: header.status,
        version: header.version,
        lines: lines.into_iter().map(PurchaseLine::from).collect(),
    })
}

pub async fn insert_lines(
    conn: &mut PgConnection,
    header_id: i64,
    product_ids: &[i64],
) -> Result<Vec<PurchaseDetail>, AppError> {
    if product_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, PurchaseDetail>(
        "INSERT INTO purchase_details (header_id, product_id, quantity_purchase, quantity_receive)
         SELECT $1, product_id, 0, 0 FROM UNNEST($2::BIGINT[]) AS t(product_id)
         ON CONFLICT (header_id, product_id) DO NOTHING
         RETURNING id, product_id, quantity_purchase, quantity_receive",
    )
    .bind(header_id)
    .bind(product_ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows)
}

pub async fn save_lines<'a>(
    conn: &mut PgConnection,
    order: &PurchaseOrder,
    line_ids: impl IntoIterator<Item = &'a i64>,
) -> Result<(), AppError> {
    for id in line_ids {
        let Some(line) = order.line(*id) else { continue };
        sqlx::query(
            "UPDATE purchase_details SET quantity_purchase = $1, quantity_receive = $2
             WHERE id = $3 AND header_id = $4",
        )
        .bind(line.quantity_purchase)
        .bind(line.quantity_receive)
        .bind(line.id)
        .bind(order.id)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Persists the status and bumps the version counter.
pub async fn save_header(conn: &mut PgConnection, order: &PurchaseOrder) -> Result<i64, AppError> {
    let version = sqlx::query_scalar::<_, i64>(
        "UPDATE purchase_headers SET status = $1, version = version + 1
         WHERE id = $2 RETURNING version",
    )
    .bind(order.status)
    .bind(order.id)
    .fetch_one(&mut *conn)
    .await?;
    Ok(version)
}

pub async fn delete_line(conn: &mut PgConnection, header_id: i64, line_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM purchase_details WHERE id = $1 AND header_id = $2")
        .bind(line_id)
        .bind(header_id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected())
}
