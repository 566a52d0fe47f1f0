mod conditions;
mod daily;
mod info;
mod schema;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::error::StoreError;
use crate::models::{ConditionSet, DailyBar, MaUpdate, NewStockInfo, StockInfo};

/// Facade over the SQLite file. Opening is idempotent: tables are created if
/// missing. Every write flips the modified flag consumed by the sync session.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
    modified: AtomicBool,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|c| {
            c.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA foreign_keys = ON;",
            )?;
            c.busy_timeout(Duration::from_secs(5))?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(4)
            .build(manager)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let db = Database {
            pool,
            modified: AtomicBool::new(false),
        };

        let conn = db.get_conn()?;
        schema::init_tables(&conn)?;

        Ok(db)
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, StoreError> {
        self.pool.get().map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn mark_modified(&self) {
        self.modified.store(true, Ordering::Relaxed);
    }

    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Relaxed)
    }

    // Daily bars

    pub fn upsert_daily_bars(&self, bars: &[DailyBar]) -> Result<usize, StoreError> {
        let mut conn = self.get_conn()?;
        let count = daily::upsert_daily_bars(&mut conn, bars)?;
        if count > 0 {
            self.mark_modified();
        }
        Ok(count)
    }

    pub fn get_daily_history(
        &self,
        stock_id: &str,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<DailyBar>, StoreError> {
        let conn = self.get_conn()?;
        Ok(daily::get_daily_history(&conn, stock_id, from, to)?)
    }

    pub fn get_recent_bars(&self, stock_id: &str, limit: usize) -> Result<Vec<DailyBar>, StoreError> {
        let conn = self.get_conn()?;
        Ok(daily::get_recent_bars(&conn, stock_id, limit)?)
    }

    pub fn get_latest_two_bars(
        &self,
        stock_id: &str,
    ) -> Result<(Option<DailyBar>, Option<DailyBar>), StoreError> {
        let conn = self.get_conn()?;
        Ok(daily::get_latest_two_bars(&conn, stock_id)?)
    }

    pub fn get_bar_stock_ids(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.get_conn()?;
        Ok(daily::get_bar_stock_ids(&conn)?)
    }

    pub fn update_moving_averages(&self, updates: &[MaUpdate]) -> Result<usize, StoreError> {
        let mut conn = self.get_conn()?;
        let count = daily::update_moving_averages(&mut conn, updates)?;
        if count > 0 {
            self.mark_modified();
        }
        Ok(count)
    }

    // Stock info

    pub fn upsert_stock_info(&self, rec: &NewStockInfo) -> Result<(), StoreError> {
        let conn = self.get_conn()?;
        info::upsert_stock_info(&conn, rec)?;
        self.mark_modified();
        Ok(())
    }

    pub fn set_follow(&self, stock_id: &str, follow: bool) -> Result<bool, StoreError> {
        let conn = self.get_conn()?;
        let changed = info::set_follow(&conn, stock_id, follow)?;
        if changed {
            self.mark_modified();
        }
        Ok(changed)
    }

    pub fn get_stock_info(&self, stock_id: &str) -> Result<Option<StockInfo>, StoreError> {
        let conn = self.get_conn()?;
        conditions::get_stock_info_with_conditions(&conn, stock_id)
    }

    pub fn get_followed_stocks(&self) -> Result<Vec<(String, String)>, StoreError> {
        let conn = self.get_conn()?;
        Ok(info::get_followed_stocks(&conn)?)
    }

    // Conditions

    pub fn replace_conditions(&self, stock_id: &str, set: &ConditionSet) -> Result<(), StoreError> {
        let mut conn = self.get_conn()?;
        conditions::replace_conditions(&mut conn, stock_id, set)?;
        self.mark_modified();
        Ok(())
    }

    pub fn get_conditions(&self, stock_id: &str) -> Result<Option<ConditionSet>, StoreError> {
        let conn = self.get_conn()?;
        conditions::get_conditions(&conn, stock_id)
    }

    pub fn screen(&self, selected: &[String]) -> Result<Vec<StockInfo>, StoreError> {
        let conn = self.get_conn()?;
        conditions::screen(&conn, selected)
    }
}
