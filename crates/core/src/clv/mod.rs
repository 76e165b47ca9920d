//! Customer lifetime value aggregation.
//!
//! The aggregator only reduces the quotes it is handed. Whether the view is global or
//! restricted to one agent is decided by the caller's query, so both views share the same
//! arithmetic.

pub mod ordering;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::customer::{CustomerId, CustomerRef, CustomerType};
use crate::domain::quote::Quote;
use crate::domain::user::{CurrentUser, UserId};
use crate::errors::DomainError;

pub use ordering::{distinct_customers, sort_valuations, ClvSort};

/// Which quotes a valuation is computed over.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClvScope {
    Global,
    Agent(UserId),
}

impl ClvScope {
    /// Admins see every quote, agents only the quotes they created.
    pub fn for_user(user: &CurrentUser) -> Self {
        if user.is_admin() {
            Self::Global
        } else {
            Self::Agent(user.id.clone())
        }
    }

    pub fn agent_id(&self) -> Option<&UserId> {
        match self {
            Self::Global => None,
            Self::Agent(agent_id) => Some(agent_id),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerClvResult {
    pub customer_id: CustomerId,
    pub customer_type: CustomerType,
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<UserId>,
    pub total_quotes: u64,
    pub accepted_quotes: u64,
    /// Percentage of accepted quotes, `0..=100`.
    pub conversion_rate: u8,
    pub customer_lifetime_value: Decimal,
    pub first_purchase_date: Option<DateTime<Utc>>,
    pub last_purchase_date: Option<DateTime<Utc>>,
    pub active_projects: u64,
}

impl CustomerClvResult {
    pub fn customer_ref(&self) -> CustomerRef {
        CustomerRef { customer_type: self.customer_type, id: self.customer_id }
    }
}

/// Reduces one customer's quotes into a valuation.
///
/// Returns `Ok(None)` when the customer's display name could not be resolved upstream, which
/// callers treat as "skip this customer". Fails only when the accepted totals overflow.
pub fn compute_customer_clv(
    customer: CustomerRef,
    scope: &ClvScope,
    quotes: &[Quote],
    active_project_count: u64,
    customer_display_name: Option<&str>,
) -> Result<Option<CustomerClvResult>, DomainError> {
    let Some(customer_name) =
        customer_display_name.map(str::trim).filter(|name| !name.is_empty())
    else {
        return Ok(None);
    };

    let total_quotes = quotes.len() as u64;
    let accepted: Vec<&Quote> = quotes.iter().filter(|quote| quote.is_accepted()).collect();
    let accepted_quotes = accepted.len() as u64;

    let customer_lifetime_value = accepted
        .iter()
        .map(|quote| quote.total.unwrap_or(Decimal::ZERO))
        .try_fold(Decimal::ZERO, |acc, total| acc.checked_add(total))
        .ok_or(DomainError::AggregationOverflow { field: "customer_lifetime_value" })?;

    Ok(Some(CustomerClvResult {
        customer_id: customer.id,
        customer_type: customer.customer_type,
        customer_name: customer_name.to_string(),
        agent_id: scope.agent_id().cloned(),
        total_quotes,
        accepted_quotes,
        conversion_rate: conversion_rate(accepted_quotes, total_quotes),
        customer_lifetime_value,
        first_purchase_date: accepted.iter().map(|quote| quote.created_at).min(),
        last_purchase_date: accepted.iter().map(|quote| quote.created_at).max(),
        active_projects: active_project_count,
    }))
}

/// `round(accepted / total × 100)` with halves rounded up; `0` for an empty history.
pub fn conversion_rate(accepted: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let accepted = accepted.min(total) as u128;
    let total = total as u128;
    let rate = (accepted * 200 + total) / (total * 2);
    rate as u8
}
