//! Quotes

use decimal_percentage::Percentage;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::schema::{
    ServerQuote, lenient_amount, lenient_optional_string, lenient_qty, lenient_string,
};

/// Message shown when the cart has no lines.
pub const EMPTY_CART_MESSAGE: &str = "Your cart is empty.";

/// Message shown when the cart could not be priced.
pub const QUOTE_FAILED_MESSAGE: &str = "We couldn't load your cart prices. Please try again.";

/// Errors from quote arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// A line total or cart total does not fit in a [`Decimal`].
    #[error("quote amount out of range")]
    Overflow,
}

/// A cart line priced by the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PricedLine {
    /// Product identifier
    #[serde(deserialize_with = "lenient_string")]
    pub product_id: String,

    /// Product display name
    #[serde(deserialize_with = "lenient_string")]
    pub product_name: String,

    /// Label (original) unit price
    #[serde(deserialize_with = "lenient_amount")]
    pub price: Decimal,

    /// Current (sale) unit price
    #[serde(deserialize_with = "lenient_amount")]
    pub last_price: Decimal,

    /// Number of units
    #[serde(deserialize_with = "lenient_qty")]
    pub qty: u32,

    /// Product image URL
    #[serde(
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image: Option<String>,
}

impl PricedLine {
    /// Line total at the label price, or `None` if it overflows.
    pub fn labeled_total(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.qty))
    }

    /// Line total at the current price, or `None` if it overflows.
    pub fn total(&self) -> Option<Decimal> {
        self.last_price.checked_mul(Decimal::from(self.qty))
    }

    /// Whether the current price is below the label price.
    pub fn is_discounted(&self) -> bool {
        self.last_price < self.price
    }
}

/// Outcome a quote represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    /// The cart has no lines.
    Empty,

    /// The cart was priced.
    Priced,

    /// Pricing failed; totals are zero.
    Failed,
}

/// A priced, display-ready summary of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    ordered_items: Vec<PricedLine>,
    total: Decimal,
    labeled_total: Decimal,
    discount: Decimal,
    message: String,
    status: QuoteStatus,
}

impl Quote {
    /// A zero quote for an empty cart.
    pub fn empty(message: impl Into<String>) -> Self {
        Self::zero(message, QuoteStatus::Empty)
    }

    /// A zero quote for a cart that could not be priced.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::zero(message, QuoteStatus::Failed)
    }

    fn zero(message: impl Into<String>, status: QuoteStatus) -> Self {
        Self {
            ordered_items: Vec::new(),
            total: Decimal::ZERO,
            labeled_total: Decimal::ZERO,
            discount: Decimal::ZERO,
            message: message.into(),
            status,
        }
    }

    /// Build a quote by summing the given lines.
    ///
    /// Falls back to a failed quote if the totals are out of range; see
    /// [`Quote::try_from_lines`].
    pub fn from_lines(lines: Vec<PricedLine>, message: impl Into<String>) -> Self {
        Self::try_from_lines(lines, message).unwrap_or_else(|error| {
            warn!(%error, "failed to total quote lines");

            Self::failed(QUOTE_FAILED_MESSAGE)
        })
    }

    /// Build a quote by summing the given lines.
    ///
    /// An empty set of lines yields an [`QuoteStatus::Empty`] quote.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::Overflow`] if any line total or cart total does
    /// not fit in a [`Decimal`].
    pub fn try_from_lines(
        lines: Vec<PricedLine>,
        message: impl Into<String>,
    ) -> Result<Self, QuoteError> {
        if lines.is_empty() {
            return Ok(Self::empty(message));
        }

        let labeled_total = checked_sum(&lines, PricedLine::labeled_total)?;
        let total = checked_sum(&lines, PricedLine::total)?;

        Ok(Self {
            ordered_items: lines,
            total,
            labeled_total,
            discount: clamped_discount(labeled_total, total),
            message: message.into(),
            status: QuoteStatus::Priced,
        })
    }

    /// Adopt a backend quote.
    ///
    /// Falls back to a failed quote if the lines are out of range; see
    /// [`Quote::try_from_server`].
    pub fn from_server(server: ServerQuote) -> Self {
        Self::try_from_server(server).unwrap_or_else(|error| {
            warn!(%error, "failed to adopt backend quote");

            Self::failed(QUOTE_FAILED_MESSAGE)
        })
    }

    /// Adopt a backend quote. Totals are taken as reported; the discount is
    /// derived from them.
    ///
    /// # Errors
    ///
    /// Returns [`QuoteError::Overflow`] if the lines cannot be summed in a
    /// [`Decimal`].
    pub fn try_from_server(server: ServerQuote) -> Result<Self, QuoteError> {
        checked_sum(&server.ordered_items, PricedLine::labeled_total)?;
        checked_sum(&server.ordered_items, PricedLine::total)?;

        let discount = clamped_discount(server.labeled_total, server.total);

        if server.discount != discount {
            warn!(
                reported = %server.discount,
                derived = %discount,
                "backend discount disagrees with its totals; using derived discount"
            );
        }

        let status = if server.ordered_items.is_empty() {
            QuoteStatus::Empty
        } else {
            QuoteStatus::Priced
        };

        Ok(Self {
            ordered_items: server.ordered_items,
            total: server.total,
            labeled_total: server.labeled_total,
            discount,
            message: server.message,
            status,
        })
    }

    /// Priced lines.
    pub fn ordered_items(&self) -> &[PricedLine] {
        &self.ordered_items
    }

    /// Find the line for a product.
    pub fn line(&self, product_id: &str) -> Option<&PricedLine> {
        self.ordered_items
            .iter()
            .find(|line| line.product_id == product_id)
    }

    /// Total after discounts.
    pub fn total(&self) -> Decimal {
        self.total
    }

    /// Total at label prices.
    pub fn labeled_total(&self) -> Decimal {
        self.labeled_total
    }

    /// Savings against the label total; never negative.
    pub fn discount(&self) -> Decimal {
        self.discount
    }

    /// Status message for display.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// What this quote represents.
    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    /// Whether the quote has no lines.
    pub fn is_empty(&self) -> bool {
        self.ordered_items.is_empty()
    }

    /// Savings as a fraction of the label total.
    pub fn savings_percent(&self) -> Percentage {
        if self.labeled_total.is_zero() {
            return Percentage::from(Decimal::ZERO);
        }

        Percentage::from(
            self.discount
                .checked_div(self.labeled_total)
                .unwrap_or(Decimal::ZERO),
        )
    }

    /// Copy of this quote without the line for `product_id`, re-summed from
    /// the remaining lines. Returns `None` if there is no such line.
    pub(crate) fn without_line(
        &self,
        product_id: &str,
        empty_message: &str,
    ) -> Option<Result<Self, QuoteError>> {
        self.line(product_id)?;

        let remaining: Vec<PricedLine> = self
            .ordered_items
            .iter()
            .filter(|line| line.product_id != product_id)
            .cloned()
            .collect();

        if remaining.is_empty() {
            return Some(Ok(Self::empty(empty_message)));
        }

        Some(Self::try_from_lines(remaining, self.message.clone()))
    }
}

fn checked_sum(
    lines: &[PricedLine],
    amount: fn(&PricedLine) -> Option<Decimal>,
) -> Result<Decimal, QuoteError> {
    lines.iter().try_fold(Decimal::ZERO, |sum, line| {
        amount(line)
            .and_then(|value| sum.checked_add(value))
            .ok_or(QuoteError::Overflow)
    })
}

fn clamped_discount(labeled_total: Decimal, total: Decimal) -> Decimal {
    labeled_total.saturating_sub(total).max(Decimal::ZERO)
}
