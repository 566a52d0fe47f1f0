use crate::database::Database;
use crate::error::StoreError;
use crate::models::{DailyBar, MaUpdate};

/// Simple moving-average windows, in trading rows (not calendar days).
pub const MA_WINDOWS: [usize; 4] = [5, 10, 20, 60];

/// Moving averages of closing price over `bars`, which must be in ascending
/// date order. A window value is the arithmetic mean of the W most recent
/// closes ending at that bar; bars with fewer than W predecessors (inclusive)
/// get `None` for that window. No partial-window averaging.
pub fn compute_moving_averages(bars: &[DailyBar]) -> Vec<MaUpdate> {
    let closes: Vec<f64> = bars.iter().map(|b| b.closing_price).collect();

    bars.iter()
        .enumerate()
        .map(|(i, bar)| MaUpdate {
            stock_id: bar.stock_id.clone(),
            date: bar.date.clone(),
            ma5: window_mean(&closes, i, MA_WINDOWS[0]),
            ma10: window_mean(&closes, i, MA_WINDOWS[1]),
            ma20: window_mean(&closes, i, MA_WINDOWS[2]),
            ma60: window_mean(&closes, i, MA_WINDOWS[3]),
        })
        .collect()
}

fn window_mean(closes: &[f64], end: usize, window: usize) -> Option<f64> {
    if end + 1 < window {
        return None;
    }
    let slice = &closes[end + 1 - window..=end];
    Some(slice.iter().sum::<f64>() / window as f64)
}

/// Recompute and persist moving averages over each stock's entire history.
/// Returns the number of rows updated.
pub fn refresh_full(db: &Database, stock_ids: &[String]) -> Result<usize, StoreError> {
    let mut updated = 0;
    for stock_id in stock_ids {
        let bars = db.get_daily_history(stock_id, None, None)?;
        if bars.is_empty() {
            tracing::debug!(stock_id = %stock_id, "no bars, skipping moving averages");
            continue;
        }
        let updates = compute_moving_averages(&bars);
        updated += db.update_moving_averages(&updates)?;
    }
    Ok(updated)
}

/// Persist moving averages for each stock's newest bar only, reading just the
/// most recent 60 rows. Window counts inside a bounded slice are only correct
/// for the row with the full lookback in the slice, so only the latest bar is
/// written; earlier bars keep their previously finalized values.
pub fn refresh_latest(db: &Database, stock_ids: &[String]) -> Result<usize, StoreError> {
    let mut updated = 0;
    for stock_id in stock_ids {
        let bars = db.get_recent_bars(stock_id, MA_WINDOWS[3])?;
        if bars.is_empty() {
            tracing::debug!(stock_id = %stock_id, "no bars, skipping moving averages");
            continue;
        }
        let updates = compute_moving_averages(&bars);
        if let Some(latest) = updates.last() {
            updated += db.update_moving_averages(std::slice::from_ref(latest))?;
        }
    }
    Ok(updated)
}
