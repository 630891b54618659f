use sqlx::PgConnection;

use crate::models::product::{Product, PRODUCT_COLUMNS};
use crate::workflow::{Ledger, StockItem};

pub async fn load(conn: &mut PgConnection) -> Result<Ledger, sqlx::Error> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id"
    ))
    .fetch_all(conn)
    .await?;

    Ok(Ledger::new(products.into_iter().map(StockItem::from)))
}

/// Same as [`load`] but row-locks every product until the transaction ends.
pub async fn load_for_update(conn: &mut PgConnection) -> Result<Ledger, sqlx::Error> {
    let products = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id FOR UPDATE"
    ))
    .fetch_all(conn)
    .await?;

    Ok(Ledger::new(products.into_iter().map(StockItem::from)))
}

/// Writes back every quantity the ledger changed. Returns the number of products updated.
pub async fn write_changes(conn: &mut PgConnection, ledger: &Ledger) -> Result<u64, sqlx::Error> {
    let mut updated = 0;
    for item in ledger.changed() {
        updated += sqlx::query(
            "UPDATE products SET quantity = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(item.quantity)
        .bind(item.id)
        .execute(&mut *conn)
        .await?
        .rows_affected();
    }
    Ok(updated)
}
