//! Imputation module for handling missing values.
//!
//! Median/mean for numeric columns, mode or placeholder for text, and
//! forward/backward fill for dates. Used per group by the group cleaner and
//! once over the whole table by the minimal profile.

mod statistical;

pub use statistical::StatisticalImputer;
