use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::models::{NewStockInfo, StockInfo};

fn info_from_row(row: &Row) -> rusqlite::Result<StockInfo> {
    Ok(StockInfo {
        stock_id: row.get(0)?,
        stock_name: row.get(1)?,
        industry: row.get(2)?,
        follow: row.get::<_, i64>(3)? != 0,
        market_type: row.get(4)?,
        source: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        conditions: None,
    })
}

/// Insert-or-replace keyed by stock_id; a re-upsert overwrites the full row
/// including the creation timestamp.
pub fn upsert_stock_info(conn: &Connection, rec: &NewStockInfo) -> rusqlite::Result<()> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT OR REPLACE INTO stock_info
         (stock_id, stock_name, industry, follow, market_type, source, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            rec.stock_id,
            rec.stock_name,
            rec.industry,
            rec.follow,
            rec.market_type,
            rec.source,
            now
        ],
    )?;

    Ok(())
}

/// Flip the follow flag. Returns false when no stock_info row matched.
pub fn set_follow(conn: &Connection, stock_id: &str, follow: bool) -> rusqlite::Result<bool> {
    let now = Utc::now().to_rfc3339();

    let changed = conn.execute(
        "UPDATE stock_info SET follow = ?1, updated_at = ?2 WHERE stock_id = ?3",
        params![follow, now, stock_id],
    )?;

    Ok(changed > 0)
}

pub fn get_stock_info(conn: &Connection, stock_id: &str) -> rusqlite::Result<Option<StockInfo>> {
    let mut stmt = conn.prepare(
        "SELECT stock_id, stock_name, industry, follow, market_type, source, created_at, updated_at
         FROM stock_info
         WHERE stock_id = ?1",
    )?;

    let mut rows = stmt.query_map(params![stock_id], info_from_row)?;
    if let Some(row) = rows.next() {
        Ok(Some(row?))
    } else {
        Ok(None)
    }
}

/// (stock_id, stock_name) of every followed stock.
pub fn get_followed_stocks(conn: &Connection) -> rusqlite::Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(
        "SELECT stock_id, stock_name FROM stock_info WHERE follow = 1 ORDER BY stock_id",
    )?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;

    let mut stocks = Vec::new();
    for row in rows {
        stocks.push(row?);
    }
    Ok(stocks)
}
