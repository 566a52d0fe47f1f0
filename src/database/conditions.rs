use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection};

use crate::error::StoreError;
use crate::models::{ConditionSet, StockInfo};

use super::info;

/// Overwrite a stock's condition rows with `set`. Delete-then-insert inside
/// one transaction; no merging with the previous mapping. Bumps the
/// stock_info updated_at when the row exists.
pub fn replace_conditions(
    conn: &mut Connection,
    stock_id: &str,
    set: &ConditionSet,
) -> Result<(), StoreError> {
    let now = Utc::now().to_rfc3339();

    let tx = conn.transaction()?;
    tx.execute(
        "DELETE FROM stock_conditions WHERE stock_id = ?1",
        params![stock_id],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO stock_conditions (stock_id, name, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (name, value) in set {
            stmt.execute(params![stock_id, name, value, now])?;
        }
    }
    tx.execute(
        "UPDATE stock_info SET updated_at = ?1 WHERE stock_id = ?2",
        params![now, stock_id],
    )?;
    tx.commit()?;

    Ok(())
}

/// The persisted condition mapping for a stock, `None` when the stock has
/// never been evaluated.
pub fn get_conditions(
    conn: &Connection,
    stock_id: &str,
) -> Result<Option<ConditionSet>, StoreError> {
    let mut stmt =
        conn.prepare("SELECT name, value FROM stock_conditions WHERE stock_id = ?1")?;
    let rows = stmt.query_map(params![stock_id], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;

    let mut set = ConditionSet::new();
    for row in rows {
        let (name, raw) = row?;
        let value = match raw {
            0 => false,
            1 => true,
            other => {
                return Err(StoreError::MalformedConditionData {
                    stock_id: stock_id.to_string(),
                    reason: format!("condition {} has non-boolean value {}", name, other),
                })
            }
        };
        set.insert(name, value);
    }

    if set.is_empty() {
        Ok(None)
    } else {
        Ok(Some(set))
    }
}

/// Screening: stocks that have been evaluated at least once and, for every
/// selected condition name, hold a true value. Zero selected names returns
/// the full evaluated set.
pub fn screen(conn: &Connection, selected: &[String]) -> Result<Vec<StockInfo>, StoreError> {
    let mut sql = String::from(
        "SELECT stock_id, stock_name, industry, follow, market_type, source, created_at, updated_at
         FROM stock_info si
         WHERE EXISTS (SELECT 1 FROM stock_conditions c WHERE c.stock_id = si.stock_id)",
    );
    for _ in selected {
        sql.push_str(
            " AND EXISTS (SELECT 1 FROM stock_conditions c
                          WHERE c.stock_id = si.stock_id AND c.name = ? AND c.value = 1)",
        );
    }
    sql.push_str(" ORDER BY stock_id");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(selected), |row| {
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
    })?;

    let mut stocks = Vec::new();
    for row in rows {
        stocks.push(row?);
    }
    for stock in &mut stocks {
        stock.conditions = get_conditions(conn, &stock.stock_id)?;
    }
    Ok(stocks)
}

/// Stock info lookup with the condition mapping attached.
pub fn get_stock_info_with_conditions(
    conn: &Connection,
    stock_id: &str,
) -> Result<Option<StockInfo>, StoreError> {
    let Some(mut stock) = info::get_stock_info(conn, stock_id)? else {
        return Ok(None);
    };
    stock.conditions = get_conditions(conn, stock_id)?;
    Ok(Some(stock))
}
