use rusqlite::Connection;

pub fn init_tables(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stock_daily (
            date TEXT NOT NULL,
            stock_id TEXT NOT NULL,
            stock_name TEXT NOT NULL,
            trade_volume INTEGER NOT NULL,
            trade_value INTEGER NOT NULL,
            opening_price REAL NOT NULL,
            highest_price REAL NOT NULL,
            lowest_price REAL NOT NULL,
            closing_price REAL NOT NULL,
            price_change REAL NOT NULL,
            change_percent REAL NOT NULL,
            transaction_count INTEGER NOT NULL,
            ma5 REAL,
            ma10 REAL,
            ma20 REAL,
            ma60 REAL,
            PRIMARY KEY (date, stock_id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stock_daily_stock_date ON stock_daily(stock_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS stock_info (
            stock_id TEXT PRIMARY KEY,
            stock_name TEXT NOT NULL,
            industry TEXT NOT NULL,
            follow INTEGER NOT NULL DEFAULT 0,
            market_type TEXT NOT NULL,
            source TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stock_info_follow ON stock_info(follow)",
        [],
    )?;

    // Screening conditions as (stock_id, name) -> boolean rows instead of a
    // serialized mapping column, so predicate filters stay indexable.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS stock_conditions (
            stock_id TEXT NOT NULL,
            name TEXT NOT NULL,
            value INTEGER NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (stock_id, name)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_stock_conditions_name_value ON stock_conditions(name, value)",
        [],
    )?;

    Ok(())
}
