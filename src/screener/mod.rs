mod conditions;
mod evaluator;

pub use conditions::{AboveMa, Condition, ConditionRegistry, VolumeIncrease};
pub use evaluator::refresh_conditions;
