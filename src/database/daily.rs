use rusqlite::{params, params_from_iter, Connection, Row};

use crate::models::{DailyBar, MaUpdate};

const BAR_COLUMNS: &str = "date, stock_id, stock_name, trade_volume, trade_value, \
     opening_price, highest_price, lowest_price, closing_price, \
     price_change, change_percent, transaction_count, ma5, ma10, ma20, ma60";

fn bar_from_row(row: &Row) -> rusqlite::Result<DailyBar> {
    Ok(DailyBar {
        date: row.get(0)?,
        stock_id: row.get(1)?,
        stock_name: row.get(2)?,
        trade_volume: row.get(3)?,
        trade_value: row.get(4)?,
        opening_price: row.get(5)?,
        highest_price: row.get(6)?,
        lowest_price: row.get(7)?,
        closing_price: row.get(8)?,
        price_change: row.get(9)?,
        change_percent: row.get(10)?,
        transaction_count: row.get(11)?,
        ma5: row.get(12)?,
        ma10: row.get(13)?,
        ma20: row.get(14)?,
        ma60: row.get(15)?,
    })
}

/// Batch insert-or-replace keyed on (date, stock_id). The whole batch runs in
/// one transaction; a mid-batch failure rolls everything back.
pub fn upsert_daily_bars(conn: &mut Connection, bars: &[DailyBar]) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR REPLACE INTO stock_daily
             (date, stock_id, stock_name, trade_volume, trade_value,
              opening_price, highest_price, lowest_price, closing_price,
              price_change, change_percent, transaction_count,
              ma5, ma10, ma20, ma60)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )?;

        for bar in bars {
            stmt.execute(params![
                bar.date,
                bar.stock_id,
                bar.stock_name,
                bar.trade_volume,
                bar.trade_value,
                bar.opening_price,
                bar.highest_price,
                bar.lowest_price,
                bar.closing_price,
                bar.price_change,
                bar.change_percent,
                bar.transaction_count,
                bar.ma5,
                bar.ma10,
                bar.ma20,
                bar.ma60,
            ])?;
        }
    }
    tx.commit()?;

    Ok(bars.len())
}

/// Full history for a stock, optionally bounded by an inclusive date range,
/// ascending by date.
pub fn get_daily_history(
    conn: &Connection,
    stock_id: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> rusqlite::Result<Vec<DailyBar>> {
    let mut sql = format!("SELECT {} FROM stock_daily WHERE stock_id = ?", BAR_COLUMNS);
    let mut args: Vec<String> = vec![stock_id.to_string()];

    if let Some(from) = from {
        sql.push_str(" AND date >= ?");
        args.push(from.to_string());
    }
    if let Some(to) = to {
        sql.push_str(" AND date <= ?");
        args.push(to.to_string());
    }
    sql.push_str(" ORDER BY date");

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(args), bar_from_row)?;

    let mut bars = Vec::new();
    for row in rows {
        bars.push(row?);
    }
    Ok(bars)
}

/// The newest `limit` bars for a stock, returned in ascending date order.
pub fn get_recent_bars(
    conn: &Connection,
    stock_id: &str,
    limit: usize,
) -> rusqlite::Result<Vec<DailyBar>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM stock_daily WHERE stock_id = ?1 ORDER BY date DESC LIMIT ?2",
        BAR_COLUMNS
    ))?;
    let rows = stmt.query_map(params![stock_id, limit as i64], bar_from_row)?;

    let mut bars = Vec::new();
    for row in rows {
        bars.push(row?);
    }
    bars.reverse();
    Ok(bars)
}

/// Latest bar and the one before it, for condition evaluation.
pub fn get_latest_two_bars(
    conn: &Connection,
    stock_id: &str,
) -> rusqlite::Result<(Option<DailyBar>, Option<DailyBar>)> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM stock_daily WHERE stock_id = ?1 ORDER BY date DESC LIMIT 2",
        BAR_COLUMNS
    ))?;
    let rows = stmt.query_map(params![stock_id], bar_from_row)?;

    let mut bars = Vec::new();
    for row in rows {
        bars.push(row?);
    }
    let mut iter = bars.into_iter();
    Ok((iter.next(), iter.next()))
}

/// Stock ids that have at least one bar.
pub fn get_bar_stock_ids(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT stock_id FROM stock_daily ORDER BY stock_id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut ids = Vec::new();
    for row in rows {
        ids.push(row?);
    }
    Ok(ids)
}

/// Write all four moving-average columns per (stock_id, date), atomically
/// for the whole update set.
pub fn update_moving_averages(
    conn: &mut Connection,
    updates: &[MaUpdate],
) -> rusqlite::Result<usize> {
    let tx = conn.transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "UPDATE stock_daily SET ma5 = ?1, ma10 = ?2, ma20 = ?3, ma60 = ?4
             WHERE stock_id = ?5 AND date = ?6",
        )?;

        for update in updates {
            count += stmt.execute(params![
                update.ma5,
                update.ma10,
                update.ma20,
                update.ma60,
                update.stock_id,
                update.date,
            ])?;
        }
    }
    tx.commit()?;

    Ok(count)
}
