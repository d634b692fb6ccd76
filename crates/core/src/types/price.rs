//! Type-safe price representation using decimal arithmetic.
//!
//! Catalog prices are whole taka amounts in practice, but discounts can
//! produce fractions, so everything is kept as [`Decimal`] and only rounded
//! for display.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (taka, not poisha).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Format for display (e.g., "৳129,999").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{}",
            self.currency_code.symbol(),
            group_thousands(self.amount)
        )
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    BDT,
    USD,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::BDT => "৳",
            Self::USD => "$",
        }
    }
}

/// Format an amount in the store currency with no fraction digits.
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    Price::new(amount, CurrencyCode::default()).display()
}

/// Round to whole units and insert `,` thousands separators.
fn group_thousands(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let digits = rounded.abs().trunc().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    if rounded.is_sign_negative() && !rounded.is_zero() {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// How a catalog discount is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `amount` is a percentage of the retail price.
    Percentage,
    /// `amount` is subtracted from the retail price.
    Fixed,
}

impl DiscountKind {
    /// Parse the upstream `discount_type` label.
    ///
    /// Only the literal `"Percentage"` (any case) means percentage; every
    /// other label is treated as a fixed amount.
    #[must_use]
    pub fn from_label(label: Option<&str>) -> Self {
        match label {
            Some(l) if l.trim().eq_ignore_ascii_case("percentage") => Self::Percentage,
            _ => Self::Fixed,
        }
    }
}

/// A discount on a catalog price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    pub amount: Decimal,
    pub kind: DiscountKind,
}

impl Discount {
    /// Build a discount, returning `None` for a zero or negative amount.
    #[must_use]
    pub fn new(amount: Decimal, kind: DiscountKind) -> Option<Self> {
        (amount > Decimal::ZERO).then_some(Self { amount, kind })
    }

    /// Apply the discount to a price. Never returns a negative amount.
    #[must_use]
    pub fn apply(&self, price: Decimal) -> Decimal {
        let discounted = match self.kind {
            DiscountKind::Percentage => price - price * self.amount / Decimal::ONE_HUNDRED,
            DiscountKind::Fixed => price - self.amount,
        };
        discounted.max(Decimal::ZERO)
    }
}
