//! Order totals and tax-inclusive splitting
//!
//! Prices are tax inclusive. With a rate `r > 0` the net part is
//! `round(total / (1 + r/100))` and tax is the remainder, so
//! `net + tax == total` always holds.

use common::Money;

use crate::error::{Result, TicketingError};

/// Largest accepted tax rate in percent
pub const MAX_TAX_RATE: f64 = 100.0;

/// Computed monetary fields of an order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Totals {
    pub total: Money,
    pub net: Money,
    pub tax: Money,
    pub tax_rate: f64,
}

/// Reject NaN, negative and absurd rates
pub fn validate_tax_rate(rate: f64) -> Result<f64> {
    if !rate.is_finite() || !(0.0..=MAX_TAX_RATE).contains(&rate) {
        return Err(TicketingError::validation(format!(
            "tax rate must be between 0 and {}",
            MAX_TAX_RATE
        )));
    }
    Ok(rate)
}

/// Split a tax-inclusive total into `(net, tax)`
pub fn split_inclusive_tax(total: Money, rate: f64) -> (Money, Money) {
    if rate <= 0.0 {
        return (total, Money::ZERO);
    }
    let net = (total.minor() as f64 / (1.0 + rate / 100.0)).round() as i64;
    let net = Money::from_minor(net);
    (net, total - net)
}

/// Sum `(unit_price, quantity)` lines and split out tax
pub fn compute_totals(
    lines: impl IntoIterator<Item = (Money, u32)>,
    tax_rate: f64,
) -> Result<Totals> {
    let tax_rate = validate_tax_rate(tax_rate)?;

    let mut total = Money::ZERO;
    for (price, quantity) in lines {
        total = price
            .checked_mul(quantity)
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| TicketingError::validation("order total out of range"))?;
    }

    let (net, tax) = split_inclusive_tax(total, tax_rate);
    Ok(Totals {
        total,
        net,
        tax,
        tax_rate,
    })
}
