//! Fairness rotation rules.
//!
//! Pure computations over roster snapshots; persistence lives in `repo`.

pub mod eligibility;
