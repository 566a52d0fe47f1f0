use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Condition name -> evaluated value, as persisted per stock.
pub type ConditionSet = HashMap<String, bool>;

/// One day's aggregated trading record for a stock.
/// Moving-average fields stay `None` until enough history exists.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DailyBar {
    pub date: String,
    pub stock_id: String,
    pub stock_name: String,
    pub trade_volume: i64,
    pub trade_value: i64,
    pub opening_price: f64,
    pub highest_price: f64,
    pub lowest_price: f64,
    pub closing_price: f64,
    pub price_change: f64,
    pub change_percent: f64,
    pub transaction_count: i64,
    #[serde(default)]
    pub ma5: Option<f64>,
    #[serde(default)]
    pub ma10: Option<f64>,
    #[serde(default)]
    pub ma20: Option<f64>,
    #[serde(default)]
    pub ma60: Option<f64>,
}

/// Input record for a stock_info upsert. Timestamps are stamped by the
/// storage layer; a re-upsert fully overwrites the existing row.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NewStockInfo {
    pub stock_id: String,
    pub stock_name: String,
    pub industry: String,
    pub follow: bool,
    pub market_type: String,
    pub source: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StockInfo {
    pub stock_id: String,
    pub stock_name: String,
    pub industry: String,
    pub follow: bool,
    pub market_type: String,
    pub source: String,
    pub created_at: String,
    pub updated_at: String,
    pub conditions: Option<ConditionSet>,
}

/// All four moving-average values for one (stock_id, date), written together.
#[derive(Debug, Clone, PartialEq)]
pub struct MaUpdate {
    pub stock_id: String,
    pub date: String,
    pub ma5: Option<f64>,
    pub ma10: Option<f64>,
    pub ma20: Option<f64>,
    pub ma60: Option<f64>,
}
