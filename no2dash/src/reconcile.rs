//! Country-name reconciliation between the measurement table and the boundary layer.

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::{
    error::{No2Error, No2Result},
    loader::Measurements,
    COL,
};

/// Validated table of source name -> canonical geometry name.
///
/// No canonical name is itself translated to a different name, so translating a name a second
/// time never changes it. Identity entries such as `Chad -> Chad` are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameAliases(BTreeMap<String, String>);

impl NameAliases {
    pub fn new(table: BTreeMap<String, String>) -> No2Result<Self> {
        for (alias, canonical) in &table {
            let chained = table
                .get(canonical)
                .is_some_and(|next| next != canonical);
            if chained {
                return Err(No2Error::InvalidAliases(format!(
                    "`{alias}` maps to `{canonical}`, which is itself an alias"
                )));
            }
        }
        Ok(Self(table))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn canonical<'a>(&'a self, name: &'a str) -> &'a str {
        self.0.get(name).map(String::as_str).unwrap_or(name)
    }

    /// Returns a copy of `measurements` with every `NAME` replaced by its canonical form.
    pub fn apply(&self, measurements: &Measurements) -> No2Result<Measurements> {
        let names = measurements.as_df().column(COL::NAME)?.str()?;
        let renamed: Vec<Option<&str>> = names
            .into_iter()
            .map(|name| name.map(|name| self.canonical(name)))
            .collect();
        let mut df = measurements.as_df().clone();
        df.replace(COL::NAME, Series::new(COL::NAME, renamed))?;
        Ok(Measurements::from_validated(df))
    }
}
