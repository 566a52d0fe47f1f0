use crate::database::Database;
use crate::error::StoreError;
use crate::screener::ConditionRegistry;

/// Evaluate every registered condition for each stock in `stock_ids` and
/// persist the resulting mapping, replacing whatever was stored before.
/// The caller decides the stock set (followed stocks, everything with bars,
/// an explicit list); stocks with no bars are skipped. Returns the number of
/// stocks evaluated.
pub fn refresh_conditions(
    db: &Database,
    registry: &ConditionRegistry,
    stock_ids: &[String],
) -> Result<usize, StoreError> {
    let mut evaluated = 0;

    for stock_id in stock_ids {
        let (latest, previous) = db.get_latest_two_bars(stock_id)?;
        let Some(latest) = latest else {
            tracing::debug!(stock_id = %stock_id, "no bars, skipping conditions");
            continue;
        };

        let set = registry.evaluate_all(&latest, previous.as_ref());
        db.replace_conditions(stock_id, &set)?;
        evaluated += 1;
    }

    tracing::info!(evaluated, "condition refresh finished");
    Ok(evaluated)
}
