use std::cmp::Ordering;
use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CustomerClvResult;
use crate::domain::customer::{CustomerRef, CustomerType};
use crate::domain::quote::Quote;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClvSort {
    #[default]
    ClvDesc,
    ClvAsc,
    Name,
}

impl FromStr for ClvSort {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "clv_desc" | "desc" => Ok(Self::ClvDesc),
            "clv_asc" | "asc" => Ok(Self::ClvAsc),
            "name" => Ok(Self::Name),
            other => Err(DomainError::InvariantViolation(format!(
                "unsupported sort `{other}` (expected clv_desc|clv_asc|name)"
            ))),
        }
    }
}

/// Unique customers referenced by `quotes`, in order of first appearance.
pub fn distinct_customers(quotes: &[Quote], customer_type: Option<CustomerType>) -> Vec<CustomerRef> {
    let mut seen = HashSet::new();
    quotes
        .iter()
        .map(|quote| quote.customer)
        .filter(|customer| customer_type.map_or(true, |wanted| customer.customer_type == wanted))
        .filter(|customer| seen.insert(*customer))
        .collect()
}

/// Stable sort; ties fall back to the name ordering so output is reproducible.
pub fn sort_valuations(valuations: &mut [CustomerClvResult], sort: ClvSort) {
    match sort {
        ClvSort::ClvDesc => valuations.sort_by(|left, right| {
            right
                .customer_lifetime_value
                .cmp(&left.customer_lifetime_value)
                .then_with(|| by_name(left, right))
        }),
        ClvSort::ClvAsc => valuations.sort_by(|left, right| {
            left.customer_lifetime_value
                .cmp(&right.customer_lifetime_value)
                .then_with(|| by_name(left, right))
        }),
        ClvSort::Name => valuations.sort_by(by_name),
    }
}

fn by_name(left: &CustomerClvResult, right: &CustomerClvResult) -> Ordering {
    left.customer_name
        .to_lowercase()
        .cmp(&right.customer_name.to_lowercase())
        .then_with(|| left.customer_name.cmp(&right.customer_name))
        .then_with(|| left.customer_ref().cmp(&right.customer_ref()))
}
