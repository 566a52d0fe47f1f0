use stock_keeper::analysis;
use stock_keeper::database::Database;
use stock_keeper::models::{ConditionSet, DailyBar, NewStockInfo};
use stock_keeper::screener::{refresh_conditions, ConditionRegistry};
use tempfile::TempDir;

fn open_db(dir: &TempDir) -> Database {
    Database::open(dir.path().join("test.db")).unwrap()
}

fn bar(stock_id: &str, date: &str, close: f64, volume: i64) -> DailyBar {
    DailyBar {
        date: date.to_string(),
        stock_id: stock_id.to_string(),
        stock_name: format!("Stock {}", stock_id),
        trade_volume: volume,
        trade_value: (close * volume as f64) as i64,
        opening_price: close - 0.5,
        highest_price: close + 1.0,
        lowest_price: close - 1.0,
        closing_price: close,
        price_change: 0.0,
        change_percent: 0.0,
        transaction_count: 500,
        ma5: None,
        ma10: None,
        ma20: None,
        ma60: None,
    }
}

fn series(stock_id: &str, closes: &[f64]) -> Vec<DailyBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| {
            bar(
                stock_id,
                &format!("2024-03-{:02}", i + 1),
                *close,
                1_000_000,
            )
        })
        .collect()
}

fn info(stock_id: &str, follow: bool) -> NewStockInfo {
    NewStockInfo {
        stock_id: stock_id.to_string(),
        stock_name: format!("Stock {}", stock_id),
        industry: "Semiconductors".to_string(),
        follow,
        market_type: "TWSE".to_string(),
        source: "test".to_string(),
    }
}

#[test]
fn upsert_daily_bar_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_daily_bars(&[bar("2330", "2024-03-01", 100.0, 1_000)])
        .unwrap();
    db.upsert_daily_bars(&[bar("2330", "2024-03-01", 105.0, 2_000)])
        .unwrap();

    let history = db.get_daily_history("2330", None, None).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].closing_price, 105.0);
    assert_eq!(history[0].trade_volume, 2_000);
}

#[test]
fn history_is_ascending_and_range_filtered() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_daily_bars(&series("2330", &[10.0, 11.0, 12.0, 13.0, 14.0]))
        .unwrap();

    let full = db.get_daily_history("2330", None, None).unwrap();
    assert_eq!(full.len(), 5);
    assert_eq!(full[0].date, "2024-03-01");
    assert_eq!(full[4].date, "2024-03-05");

    let mid = db
        .get_daily_history("2330", Some("2024-03-02"), Some("2024-03-04"))
        .unwrap();
    assert_eq!(mid.len(), 3);
    assert_eq!(mid[0].closing_price, 11.0);
    assert_eq!(mid[2].closing_price, 13.0);
}

#[test]
fn recent_bars_are_newest_in_ascending_order() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_daily_bars(&series("2330", &[10.0, 11.0, 12.0, 13.0, 14.0]))
        .unwrap();

    let recent = db.get_recent_bars("2330", 3).unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].closing_price, 12.0);
    assert_eq!(recent[2].closing_price, 14.0);

    let (latest, previous) = db.get_latest_two_bars("2330").unwrap();
    assert_eq!(latest.unwrap().closing_price, 14.0);
    assert_eq!(previous.unwrap().closing_price, 13.0);
}

#[test]
fn full_refresh_persists_moving_averages() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    let closes: Vec<f64> = (1..=70).map(|i| i as f64).collect();
    let bars: Vec<DailyBar> = closes
        .iter()
        .enumerate()
        .map(|(i, close)| bar("2330", &format!("2024-{:02}-{:02}", 3 + i / 28, i % 28 + 1), *close, 1_000))
        .collect();
    db.upsert_daily_bars(&bars).unwrap();

    let updated = analysis::refresh_full(&db, &["2330".to_string()]).unwrap();
    assert_eq!(updated, 70);

    let history = db.get_daily_history("2330", None, None).unwrap();
    assert_eq!(history[3].ma5, None);
    assert_eq!(history[4].ma5, Some(3.0));
    assert_eq!(history[58].ma60, None);
    assert_eq!(history[59].ma60, Some(30.5));
    assert_eq!(history[69].ma60, Some(40.5));
}

#[test]
fn short_history_keeps_all_averages_null() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_daily_bars(&series("1101", &[10.0, 11.0, 12.0]))
        .unwrap();
    analysis::refresh_full(&db, &["1101".to_string()]).unwrap();

    for bar in db.get_daily_history("1101", None, None).unwrap() {
        assert_eq!(bar.ma5, None);
        assert_eq!(bar.ma10, None);
        assert_eq!(bar.ma20, None);
        assert_eq!(bar.ma60, None);
    }
}

#[test]
fn incremental_refresh_writes_only_the_newest_bar() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_daily_bars(&series("2330", &[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]))
        .unwrap();

    let updated = analysis::refresh_latest(&db, &["2330".to_string()]).unwrap();
    assert_eq!(updated, 1);

    let history = db.get_daily_history("2330", None, None).unwrap();
    assert_eq!(history[5].ma5, Some(13.0));
    // Older bars were not touched by the incremental pass.
    assert_eq!(history[4].ma5, None);
}

#[test]
fn stock_info_upsert_overwrites_by_id() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_stock_info(&info("2330", true)).unwrap();
    let mut second = info("2330", false);
    second.industry = "Foundry".to_string();
    db.upsert_stock_info(&second).unwrap();

    let stock = db.get_stock_info("2330").unwrap().unwrap();
    assert_eq!(stock.industry, "Foundry");
    assert!(!stock.follow);
    assert_eq!(stock.conditions, None);
}

#[test]
fn followed_stocks_reflect_the_follow_flag() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_stock_info(&info("2330", true)).unwrap();
    db.upsert_stock_info(&info("1101", true)).unwrap();
    db.upsert_stock_info(&info("2603", false)).unwrap();

    let followed = db.get_followed_stocks().unwrap();
    assert_eq!(followed.len(), 2);
    assert_eq!(followed[0].0, "1101");
    assert_eq!(followed[1].0, "2330");

    db.set_follow("2330", false).unwrap();
    assert_eq!(db.get_followed_stocks().unwrap().len(), 1);
}

#[test]
fn condition_reevaluation_overwrites_instead_of_merging() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    db.upsert_stock_info(&info("2330", true)).unwrap();

    let mut first = ConditionSet::new();
    first.insert("above_ma5".to_string(), true);
    db.replace_conditions("2330", &first).unwrap();

    let mut second = ConditionSet::new();
    second.insert("above_ma5".to_string(), false);
    second.insert("volume_increase".to_string(), true);
    db.replace_conditions("2330", &second).unwrap();

    let stored = db.get_conditions("2330").unwrap().unwrap();
    assert_eq!(stored, second);
}

#[test]
fn screening_intersects_selected_conditions() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    for stock_id in ["1101", "2330", "2603"] {
        db.upsert_stock_info(&info(stock_id, true)).unwrap();
    }
    // A fourth stock that was never evaluated stays invisible to screening.
    db.upsert_stock_info(&info("3008", true)).unwrap();

    let sets: &[(&str, &[(&str, bool)])] = &[
        ("1101", &[("above_ma5", true), ("volume_increase", true)]),
        ("2330", &[("above_ma5", true), ("volume_increase", false)]),
        ("2603", &[("above_ma5", false), ("volume_increase", true)]),
    ];
    for (stock_id, entries) in sets {
        let set: ConditionSet = entries
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        db.replace_conditions(stock_id, &set).unwrap();
    }

    let everyone = db.screen(&[]).unwrap();
    assert_eq!(everyone.len(), 3);

    let above = db.screen(&["above_ma5".to_string()]).unwrap();
    let ids: Vec<&str> = above.iter().map(|s| s.stock_id.as_str()).collect();
    assert_eq!(ids, vec!["1101", "2330"]);

    let both = db
        .screen(&["above_ma5".to_string(), "volume_increase".to_string()])
        .unwrap();
    assert_eq!(both.len(), 1);
    assert_eq!(both[0].stock_id, "1101");
    assert_eq!(
        both[0].conditions.as_ref().unwrap().get("volume_increase"),
        Some(&true)
    );
}

#[test]
fn refresh_pipeline_produces_screenable_conditions() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    // Rising closes and a volume spike on the last day.
    let mut bars = series("2330", &[10.0, 11.0, 12.0, 13.0, 14.0, 20.0]);
    bars[5].trade_volume = 3_000_000;
    db.upsert_daily_bars(&bars).unwrap();
    db.upsert_stock_info(&info("2330", true)).unwrap();

    let targets = vec!["2330".to_string()];
    analysis::refresh_latest(&db, &targets).unwrap();
    let registry = ConditionRegistry::default();
    let evaluated = refresh_conditions(&db, &registry, &targets).unwrap();
    assert_eq!(evaluated, 1);

    let stored = db.get_conditions("2330").unwrap().unwrap();
    assert_eq!(stored.get("above_ma5"), Some(&true));
    assert_eq!(stored.get("volume_increase"), Some(&true));
    // Not enough history for the longer windows.
    assert_eq!(stored.get("above_ma20"), Some(&false));
    assert_eq!(stored.get("above_ma60"), Some(&false));

    let matches = db
        .screen(&["above_ma5".to_string(), "volume_increase".to_string()])
        .unwrap();
    assert_eq!(matches.len(), 1);
}

#[test]
fn evaluator_skips_stocks_without_bars() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    db.upsert_stock_info(&info("9999", true)).unwrap();

    let registry = ConditionRegistry::default();
    let evaluated =
        refresh_conditions(&db, &registry, &["9999".to_string()]).unwrap();
    assert_eq!(evaluated, 0);
    assert_eq!(db.get_conditions("9999").unwrap(), None);
}

#[test]
fn failed_batch_upsert_rolls_back_earlier_rows() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    // SQLite stores a NaN double as NULL, which the NOT NULL constraint on
    // closing_price rejects mid-batch.
    let mut batch = vec![
        bar("2330", "2024-03-01", 100.0, 1_000),
        bar("2330", "2024-03-02", 101.0, 1_000),
        bar("2330", "2024-03-03", 102.0, 1_000),
    ];
    batch[2].closing_price = f64::NAN;

    assert!(db.upsert_daily_bars(&batch).is_err());
    assert!(db.get_daily_history("2330", None, None).unwrap().is_empty());
    assert!(!db.is_modified());
}

#[test]
fn set_follow_reports_whether_a_row_matched() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    assert!(!db.set_follow("9999", false).unwrap());
    assert!(!db.is_modified());

    db.upsert_stock_info(&info("2330", true)).unwrap();
    assert!(db.set_follow("2330", false).unwrap());

    let stock = db.get_stock_info("2330").unwrap().unwrap();
    assert!(!stock.follow);
}

#[test]
fn non_boolean_condition_value_is_malformed() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);
    db.upsert_stock_info(&info("2330", true)).unwrap();

    let raw = rusqlite::Connection::open(dir.path().join("test.db")).unwrap();
    raw.execute(
        "INSERT INTO stock_conditions (stock_id, name, value, updated_at)
         VALUES ('2330', 'above_ma5', 7, '2024-03-01T00:00:00Z')",
        [],
    )
    .unwrap();
    drop(raw);

    let err = db.get_conditions("2330").unwrap_err();
    assert!(matches!(
        err,
        stock_keeper::error::StoreError::MalformedConditionData { .. }
    ));
}

#[test]
fn bar_stock_ids_lists_distinct_ids() {
    let dir = TempDir::new().unwrap();
    let db = open_db(&dir);

    db.upsert_daily_bars(&series("2330", &[10.0, 11.0])).unwrap();
    db.upsert_daily_bars(&series("1101", &[20.0])).unwrap();

    assert_eq!(
        db.get_bar_stock_ids().unwrap(),
        vec!["1101".to_string(), "2330".to_string()]
    );
}
