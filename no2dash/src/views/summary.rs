use std::collections::BTreeMap;

use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{
    classify::ChangeCategory,
    error::No2Result,
    join::{JoinReport, Joined},
};

/// Category counts over the joined countries, with what the join dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub measured: usize,
    pub outlined: usize,
    pub joined: usize,
    pub categories: BTreeMap<ChangeCategory, usize>,
    pub report: JoinReport,
}

impl Summary {
    pub fn new(
        measured: usize,
        outlined: usize,
        joined: &Joined,
        report: &JoinReport,
    ) -> No2Result<Self> {
        let mut categories: BTreeMap<ChangeCategory, usize> =
            ChangeCategory::iter().map(|c| (c, 0)).collect();
        for record in joined.records()? {
            *categories.entry(record.category).or_default() += 1;
        }
        Ok(Self {
            measured,
            outlined,
            joined: joined.len(),
            categories,
            report: report.clone(),
        })
    }
}
