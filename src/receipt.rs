//! Receipt
//!
//! Terminal rendering of a [`Quote`].

use std::io;

use rust_decimal::Decimal;
use rusty_money::{Findable, Money, iso::Currency};
use tabled::{
    builder::Builder,
    grid::config::HorizontalLine,
    settings::{
        Alignment, Color, Style, Theme,
        object::{Columns, Rows},
    },
};
use thiserror::Error;

use crate::quote::{PricedLine, Quote};

/// Errors that can occur when rendering a receipt.
#[derive(Debug, Error)]
pub enum ReceiptError {
    /// The configured currency code is not an ISO 4217 currency.
    #[error("unknown currency code: {0}")]
    UnknownCurrency(String),

    /// IO error
    #[error("IO error")]
    IO,
}

/// Renders quotes as tables with money in a fixed currency.
#[derive(Debug, Clone, Copy)]
pub struct ReceiptWriter {
    currency: &'static Currency,
}

impl ReceiptWriter {
    /// Create a writer for the given ISO currency code, e.g. `"USD"`.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::UnknownCurrency`] if the code is not recognised.
    pub fn new(currency_code: &str) -> Result<Self, ReceiptError> {
        let code = currency_code.trim().to_ascii_uppercase();

        let Some(currency) = Currency::find(&code) else {
            return Err(ReceiptError::UnknownCurrency(currency_code.to_string()));
        };

        Ok(Self { currency })
    }

    /// Format an amount in this writer's currency, rounded to its minor unit.
    pub fn money(&self, amount: Decimal) -> Money<'static, Currency> {
        let mut scaled = amount;
        scaled.rescale(self.currency.exponent);

        Money::from_decimal(scaled, self.currency)
    }

    /// Write the quote's lines, totals and message to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`ReceiptError::IO`] if writing fails.
    pub fn write_to(&self, mut out: impl io::Write, quote: &Quote) -> Result<(), ReceiptError> {
        if !quote.is_empty() {
            self.write_table(&mut out, quote.ordered_items())?;
            self.write_summary(&mut out, quote)?;
        }

        if !quote.message().is_empty() {
            writeln!(out, "{}", quote.message()).map_err(|_err| ReceiptError::IO)?;
        }

        Ok(())
    }

    fn write_table(
        &self,
        out: &mut impl io::Write,
        lines: &[PricedLine],
    ) -> Result<(), ReceiptError> {
        let mut builder = Builder::default();

        builder.push_record(["", "Item", "Qty", "Price", "Sale Price", "Line Total"]);

        for (idx, line) in lines.iter().enumerate() {
            let name = if line.product_name.is_empty() {
                line.product_id.as_str()
            } else {
                line.product_name.as_str()
            };

            let sale_price = if line.is_discounted() {
                self.money(line.last_price).to_string()
            } else {
                String::new()
            };

            builder.push_record([
                format!("#{:<3}", idx + 1),
                name.to_string(),
                line.qty.to_string(),
                self.money(line.price).to_string(),
                sale_price,
                line.total()
                    .map_or_else(String::new, |total| self.money(total).to_string()),
            ]);
        }

        let mut table = builder.build();
        let mut theme = Theme::from(Style::modern_rounded());

        theme.remove_horizontal_lines();
        theme.insert_horizontal_line(
            1,
            HorizontalLine::new(Some('─'), Some('┼'), Some('├'), Some('┤')),
        );

        table.with(theme);
        table.modify(Rows::first(), Color::BOLD);
        table.modify(Columns::new(2..6), Alignment::right());

        writeln!(out, "\n{table}").map_err(|_err| ReceiptError::IO)
    }

    fn write_summary(&self, out: &mut impl io::Write, quote: &Quote) -> Result<(), ReceiptError> {
        let subtotal = self.money(quote.labeled_total()).to_string();
        let total = self.money(quote.total()).to_string();

        let savings = if quote.discount().is_zero() {
            self.money(Decimal::ZERO).to_string()
        } else {
            // `Percentage` is a fraction (e.g. 0.25); print percent points.
            let points = ((quote.savings_percent() * Decimal::ONE) * Decimal::ONE_HUNDRED).round_dp(2);

            format!("({points}%) -{}", self.money(quote.discount()))
        };

        let width = [&subtotal, &savings, &total]
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);

        for (label, value) in [("Subtotal:", subtotal), ("Savings:", savings), ("Total:", total)] {
            writeln!(out, "{label:>10}  {value:>width$}").map_err(|_err| ReceiptError::IO)?;
        }

        writeln!(out).map_err(|_err| ReceiptError::IO)
    }
}

#[cfg(test)]
mod tests {
    use testresult::TestResult;

    use super::*;

    fn priced(id: &str, name: &str, price: i64, last_price: i64, qty: u32) -> PricedLine {
        PricedLine {
            product_id: id.to_string(),
            product_name: name.to_string(),
            price: Decimal::from(price),
            last_price: Decimal::from(last_price),
            qty,
            image: None,
        }
    }

    fn render(quote: &Quote) -> Result<String, Box<dyn std::error::Error>> {
        let mut out = Vec::new();

        ReceiptWriter::new("usd")?.write_to(&mut out, quote)?;

        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn unknown_currency_is_rejected() {
        let result = ReceiptWriter::new("XYZ");

        assert!(
            matches!(result, Err(ReceiptError::UnknownCurrency(ref code)) if code == "XYZ"),
            "expected UnknownCurrency, got {result:?}"
        );
    }

    #[test]
    fn money_rounds_to_currency_minor_units() -> TestResult {
        let writer = ReceiptWriter::new("GBP")?;

        assert_eq!(writer.money(Decimal::new(2999, 3)).to_string(), "£3.00");
        assert_eq!(writer.money(Decimal::new(270, 2)).to_string(), "£2.70");

        Ok(())
    }

    #[test]
    fn money_beyond_minor_unit_range_is_not_truncated() -> TestResult {
        let writer = ReceiptWriter::new("USD")?;
        let amount = Decimal::from(i64::MAX) * Decimal::from(1_000);

        let formatted = writer.money(amount).to_string();

        assert_eq!(writer.money(amount).amount(), &amount);
        assert!(
            formatted.ends_with(",807,000.00"),
            "unexpected formatting: {formatted}"
        );

        Ok(())
    }

    #[test]
    fn renders_largest_representable_quote() -> TestResult {
        let quote = Quote::from_lines(
            vec![PricedLine {
                price: Decimal::MAX,
                last_price: Decimal::MAX,
                ..priced("A", "Gold Bar", 0, 0, 1)
            }],
            "",
        );

        let output = render(&quote)?;

        assert!(output.contains("Gold Bar"), "missing item name:\n{output}");
        assert!(
            output.contains("79228162514264,337,593,543,950,335"),
            "missing total:\n{output}"
        );

        Ok(())
    }

    #[test]
    fn renders_lines_and_summary() -> TestResult {
        let quote = Quote::from_lines(
            vec![
                priced("A", "Linen Shirt", 100, 80, 2),
                priced("B", "Socks", 10, 10, 1),
            ],
            "",
        );

        let output = render(&quote)?;

        assert!(output.contains("Linen Shirt"), "missing item name:\n{output}");
        assert!(output.contains("$80.00"), "missing sale price:\n{output}");
        assert!(output.contains("$160.00"), "missing line total:\n{output}");
        assert!(output.contains("$210.00"), "missing subtotal:\n{output}");
        assert!(output.contains("$170.00"), "missing total:\n{output}");
        assert!(output.contains("-$40.00"), "missing savings:\n{output}");

        Ok(())
    }

    #[test]
    fn unnamed_product_falls_back_to_id() -> TestResult {
        let quote = Quote::from_lines(vec![priced("sku-7", "", 5, 5, 1)], "");

        let output = render(&quote)?;

        assert!(output.contains("sku-7"), "missing product id:\n{output}");

        Ok(())
    }

    #[test]
    fn empty_quote_prints_only_message() -> TestResult {
        let output = render(&Quote::empty("Your cart is empty."))?;

        assert_eq!(output, "Your cart is empty.\n");

        Ok(())
    }
}
