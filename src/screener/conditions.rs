//! Screening condition registry. Each condition is a pure predicate over the
//! latest two bars of a stock; new conditions register without touching the
//! evaluator.

use crate::models::{ConditionSet, DailyBar};

pub trait Condition: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, latest: &DailyBar, previous: Option<&DailyBar>) -> bool;
}

/// Closing price at or above one of the maintained moving averages.
/// An unset moving average evaluates to false, never an error.
pub struct AboveMa {
    name: &'static str,
    select: fn(&DailyBar) -> Option<f64>,
}

impl AboveMa {
    pub fn ma5() -> Self {
        AboveMa { name: "above_ma5", select: |bar| bar.ma5 }
    }

    pub fn ma10() -> Self {
        AboveMa { name: "above_ma10", select: |bar| bar.ma10 }
    }

    pub fn ma20() -> Self {
        AboveMa { name: "above_ma20", select: |bar| bar.ma20 }
    }

    pub fn ma60() -> Self {
        AboveMa { name: "above_ma60", select: |bar| bar.ma60 }
    }
}

impl Condition for AboveMa {
    fn name(&self) -> &'static str {
        self.name
    }

    fn evaluate(&self, latest: &DailyBar, _previous: Option<&DailyBar>) -> bool {
        match (self.select)(latest) {
            Some(ma) => latest.closing_price >= ma,
            None => false,
        }
    }
}

/// Trade volume strictly more than double the previous trading day's.
pub struct VolumeIncrease;

impl Condition for VolumeIncrease {
    fn name(&self) -> &'static str {
        "volume_increase"
    }

    fn evaluate(&self, latest: &DailyBar, previous: Option<&DailyBar>) -> bool {
        match previous {
            Some(prev) => latest.trade_volume > prev.trade_volume.saturating_mul(2),
            None => false,
        }
    }
}

pub struct ConditionRegistry {
    conditions: Vec<Box<dyn Condition>>,
}

impl ConditionRegistry {
    pub fn empty() -> Self {
        ConditionRegistry {
            conditions: Vec::new(),
        }
    }

    pub fn register(&mut self, condition: Box<dyn Condition>) {
        self.conditions.push(condition);
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.conditions.iter().map(|c| c.name()).collect()
    }

    /// Apply every registered condition to one stock's latest two bars.
    pub fn evaluate_all(&self, latest: &DailyBar, previous: Option<&DailyBar>) -> ConditionSet {
        self.conditions
            .iter()
            .map(|c| (c.name().to_string(), c.evaluate(latest, previous)))
            .collect()
    }
}

impl Default for ConditionRegistry {
    fn default() -> Self {
        let mut registry = ConditionRegistry::empty();
        registry.register(Box::new(AboveMa::ma5()));
        registry.register(Box::new(AboveMa::ma10()));
        registry.register(Box::new(AboveMa::ma20()));
        registry.register(Box::new(AboveMa::ma60()));
        registry.register(Box::new(VolumeIncrease));
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: f64, volume: i64, ma5: Option<f64>) -> DailyBar {
        DailyBar {
            date: "2024-06-03".to_string(),
            stock_id: "2330".to_string(),
            stock_name: "Test Stock".to_string(),
            trade_volume: volume,
            trade_value: 1_000_000,
            opening_price: close,
            highest_price: close + 1.0,
            lowest_price: close - 1.0,
            closing_price: close,
            price_change: 0.0,
            change_percent: 0.0,
            transaction_count: 100,
            ma5,
            ma10: None,
            ma20: None,
            ma60: None,
        }
    }

    #[test]
    fn above_ma5_compares_close_to_average() {
        let cond = AboveMa::ma5();
        assert!(cond.evaluate(&bar(105.0, 1_000, Some(100.0)), None));
        assert!(!cond.evaluate(&bar(95.0, 1_000, Some(100.0)), None));
    }

    #[test]
    fn above_ma5_with_unset_average_is_false() {
        let cond = AboveMa::ma5();
        assert!(!cond.evaluate(&bar(105.0, 1_000, None), None));
    }

    #[test]
    fn above_ma5_equal_to_average_is_true() {
        let cond = AboveMa::ma5();
        assert!(cond.evaluate(&bar(100.0, 1_000, Some(100.0)), None));
    }

    #[test]
    fn volume_increase_requires_strictly_more_than_double() {
        let prev = bar(100.0, 1_000_000, None);
        assert!(VolumeIncrease.evaluate(&bar(100.0, 2_000_001, None), Some(&prev)));
        assert!(!VolumeIncrease.evaluate(&bar(100.0, 2_000_000, None), Some(&prev)));
    }

    #[test]
    fn volume_increase_without_previous_bar_is_false() {
        assert!(!VolumeIncrease.evaluate(&bar(100.0, 2_000_001, None), None));
    }

    #[test]
    fn names_lists_the_registered_catalog() {
        let names = ConditionRegistry::default().names();
        assert_eq!(
            names,
            vec![
                "above_ma5",
                "above_ma10",
                "above_ma20",
                "above_ma60",
                "volume_increase"
            ]
        );
    }

    #[test]
    fn default_registry_evaluates_full_catalog() {
        let registry = ConditionRegistry::default();
        let prev = bar(100.0, 1_000, None);
        let latest = bar(105.0, 3_000, Some(100.0));
        let set = registry.evaluate_all(&latest, Some(&prev));

        assert_eq!(set.len(), 5);
        assert_eq!(set.get("above_ma5"), Some(&true));
        assert_eq!(set.get("above_ma10"), Some(&false));
        assert_eq!(set.get("volume_increase"), Some(&true));
    }
}
