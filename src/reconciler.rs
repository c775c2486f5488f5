//! Quote reconciliation
//!
//! Turns the locally persisted cart into an authoritative quote and keeps the
//! persisted cart in step as lines are removed. Every failure is absorbed into
//! the returned [`Quote`]; nothing here returns an error to the caller.

use std::{fmt, sync::Arc};

use tracing::{debug, info, warn};

use crate::{
    cart::{CartLine, CartStore},
    client::QuoteService,
    quote::{EMPTY_CART_MESSAGE, QUOTE_FAILED_MESSAGE, Quote},
};

/// Status messages attached to zero-value quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteMessages {
    /// Shown when the cart has no lines
    pub empty: String,

    /// Shown when pricing failed
    pub failed: String,
}

impl Default for QuoteMessages {
    fn default() -> Self {
        Self {
            empty: EMPTY_CART_MESSAGE.to_string(),
            failed: QUOTE_FAILED_MESSAGE.to_string(),
        }
    }
}

/// Prices carts against the backend and applies line removals locally.
#[derive(Clone)]
pub struct QuoteReconciler {
    quotes: Arc<dyn QuoteService>,
    cart: Arc<dyn CartStore>,
    messages: QuoteMessages,
}

impl fmt::Debug for QuoteReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuoteReconciler")
            .field("messages", &self.messages)
            .finish_non_exhaustive()
    }
}

impl QuoteReconciler {
    /// Create a reconciler over the given quote service and cart store.
    pub fn new(quotes: Arc<dyn QuoteService>, cart: Arc<dyn CartStore>) -> Self {
        Self {
            quotes,
            cart,
            messages: QuoteMessages::default(),
        }
    }

    /// Replace the default status messages.
    #[must_use]
    pub fn with_messages(mut self, messages: QuoteMessages) -> Self {
        self.messages = messages;
        self
    }

    /// The persisted cart this reconciler writes to.
    pub fn cart(&self) -> &Arc<dyn CartStore> {
        &self.cart
    }

    /// A zero quote carrying the empty-cart message.
    pub fn empty_quote(&self) -> Quote {
        Quote::empty(self.messages.empty.clone())
    }

    /// Price `cart` against the backend.
    ///
    /// An empty cart yields an empty quote without a network call. A failed
    /// request yields a zero quote carrying the failure message.
    pub async fn load_quote(&self, cart: &[CartLine]) -> Quote {
        if cart.is_empty() {
            debug!("cart is empty; skipping quote request");

            return self.empty_quote();
        }

        match self.quotes.quote(cart).await {
            Ok(server) if server.ordered_items.is_empty() => {
                warn!(lines = cart.len(), "backend priced a non-empty cart with no lines");

                self.empty_quote()
            }
            Ok(server) => match Quote::try_from_server(server) {
                Ok(quote) => {
                    info!(
                        lines = quote.ordered_items().len(),
                        total = %quote.total(),
                        discount = %quote.discount(),
                        "loaded quote"
                    );

                    quote
                }
                Err(error) => {
                    warn!(%error, "backend quote is out of range");

                    Quote::failed(self.messages.failed.clone())
                }
            },
            Err(error) => {
                warn!(%error, "failed to load quote");

                Quote::failed(self.messages.failed.clone())
            }
        }
    }

    /// Read the persisted cart and price it.
    ///
    /// A cart that cannot be read yields a zero quote carrying the failure message.
    pub async fn load_persisted(&self) -> Quote {
        match self.cart.load() {
            Ok(lines) => self.load_quote(&lines).await,
            Err(error) => {
                warn!(%error, "failed to read persisted cart");

                Quote::failed(self.messages.failed.clone())
            }
        }
    }

    /// Remove the line for `product_id` from `quote` and from the persisted cart.
    ///
    /// Totals are re-summed from the prices already held in `quote`; the
    /// backend is not consulted. Removing a product that is not in the quote
    /// returns the quote unchanged and leaves the persisted cart alone. If the
    /// remaining totals are out of range the result is a failed quote.
    pub fn remove_line(&self, quote: &Quote, product_id: &str) -> Quote {
        let Some(reduced) = quote.without_line(product_id, &self.messages.empty) else {
            debug!(product_id, "remove_line: product not in quote");

            return quote.clone();
        };

        if let Err(error) = self.cart.delete_item(product_id) {
            warn!(product_id, %error, "failed to delete line from persisted cart");
        }

        let reduced = reduced.unwrap_or_else(|error| {
            warn!(product_id, %error, "failed to re-total quote after removal");

            Quote::failed(self.messages.failed.clone())
        });

        debug!(
            product_id,
            remaining = reduced.ordered_items().len(),
            total = %reduced.total(),
            "removed line"
        );

        reduced
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;
    use rust_decimal::Decimal;
    use testresult::TestResult;

    use crate::{
        cart::{CartError, MemoryCartStore, MockCartStore},
        client::{MockQuoteService, QuoteServiceError},
        quote::{PricedLine, QuoteStatus},
        schema::ServerQuote,
    };

    use super::*;

    fn priced(id: &str, price: i64, last_price: i64, qty: u32) -> PricedLine {
        PricedLine {
            product_id: id.to_string(),
            product_name: id.to_string(),
            price: Decimal::from(price),
            last_price: Decimal::from(last_price),
            qty,
            image: None,
        }
    }

    fn server_quote(lines: Vec<PricedLine>) -> ServerQuote {
        let labeled_total: Decimal = lines.iter().filter_map(PricedLine::labeled_total).sum();
        let total: Decimal = lines.iter().filter_map(PricedLine::total).sum();

        ServerQuote {
            ordered_items: lines,
            total,
            labeled_total,
            discount: labeled_total - total,
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn single_discounted_line_is_priced() -> TestResult {
        let mut quotes = MockQuoteService::new();

        quotes
            .expect_quote()
            .once()
            .withf(|lines| {
                lines.len() == 1
                    && lines
                        .first()
                        .is_some_and(|line| line.product_id == "A" && line.qty == 2)
            })
            .returning(|_| Ok(server_quote(vec![priced("A", 100, 80, 2)])));

        let reconciler =
            QuoteReconciler::new(Arc::new(quotes), Arc::new(MemoryCartStore::default()));

        let quote = reconciler.load_quote(&[CartLine::new("A", 2)?]).await;

        assert_eq!(quote.labeled_total(), Decimal::from(200));
        assert_eq!(quote.total(), Decimal::from(160));
        assert_eq!(quote.discount(), Decimal::from(40));
        assert_eq!(quote.status(), QuoteStatus::Priced);

        Ok(())
    }

    #[tokio::test]
    async fn empty_cart_skips_network() {
        let mut quotes = MockQuoteService::new();

        quotes.expect_quote().never();

        let reconciler =
            QuoteReconciler::new(Arc::new(quotes), Arc::new(MemoryCartStore::default()));

        let quote = reconciler.load_quote(&[]).await;

        assert_eq!(quote.total(), Decimal::ZERO);
        assert_eq!(quote.message(), "Your cart is empty.");
        assert_eq!(quote.status(), QuoteStatus::Empty);
    }

    #[tokio::test]
    async fn service_failure_is_absorbed() -> TestResult {
        let mut quotes = MockQuoteService::new();

        quotes.expect_quote().once().returning(|_| {
            Err(QuoteServiceError::UnexpectedStatus {
                status: StatusCode::BAD_GATEWAY,
                body: String::new(),
            })
        });

        let reconciler =
            QuoteReconciler::new(Arc::new(quotes), Arc::new(MemoryCartStore::default()));

        let quote = reconciler.load_quote(&[CartLine::new("A", 1)?]).await;

        assert_eq!(quote.total(), Decimal::ZERO);
        assert_eq!(quote.status(), QuoteStatus::Failed);
        assert_eq!(quote.message(), QUOTE_FAILED_MESSAGE);

        Ok(())
    }

    #[tokio::test]
    async fn backend_with_no_lines_is_empty() -> TestResult {
        let mut quotes = MockQuoteService::new();

        quotes
            .expect_quote()
            .once()
            .returning(|_| Ok(ServerQuote::default()));

        let reconciler =
            QuoteReconciler::new(Arc::new(quotes), Arc::new(MemoryCartStore::default()));

        let quote = reconciler.load_quote(&[CartLine::new("A", 1)?]).await;

        assert_eq!(quote.status(), QuoteStatus::Empty);
        assert_eq!(quote.message(), EMPTY_CART_MESSAGE);

        Ok(())
    }

    #[tokio::test]
    async fn unreadable_cart_is_a_failed_quote() {
        let mut quotes = MockQuoteService::new();
        let mut cart = MockCartStore::new();

        quotes.expect_quote().never();
        cart.expect_load()
            .once()
            .returning(|| Err(CartError::Poisoned));

        let reconciler = QuoteReconciler::new(Arc::new(quotes), Arc::new(cart));

        let quote = reconciler.load_persisted().await;

        assert_eq!(quote.status(), QuoteStatus::Failed);
    }

    #[test]
    fn remove_line_deletes_from_store_once() {
        let mut quotes = MockQuoteService::new();
        let mut cart = MockCartStore::new();

        quotes.expect_quote().never();
        cart.expect_delete_item()
            .once()
            .withf(|product_id| product_id == "A")
            .returning(|_| Ok(()));

        let reconciler = QuoteReconciler::new(Arc::new(quotes), Arc::new(cart));
        let quote = Quote::from_lines(vec![priced("A", 100, 80, 1), priced("B", 30, 20, 3)], "");

        let reduced = reconciler.remove_line(&quote, "A");
        let again = reconciler.remove_line(&reduced, "A");

        assert_eq!(reduced, again);
        assert_eq!(reduced.labeled_total(), Decimal::from(90));
        assert_eq!(reduced.total(), Decimal::from(60));
        assert_eq!(reduced.discount(), Decimal::from(30));
    }

    #[test]
    fn remove_absent_line_is_identity_without_store_write() {
        let mut cart = MockCartStore::new();

        cart.expect_delete_item().never();

        let reconciler = QuoteReconciler::new(Arc::new(MockQuoteService::new()), Arc::new(cart));
        let quote = Quote::from_lines(vec![priced("A", 100, 80, 1)], "");

        assert_eq!(reconciler.remove_line(&quote, "Z"), quote);
    }

    #[test]
    fn store_failure_still_yields_reduced_quote() {
        let mut cart = MockCartStore::new();

        cart.expect_delete_item()
            .once()
            .returning(|_| Err(CartError::Poisoned));

        let reconciler = QuoteReconciler::new(Arc::new(MockQuoteService::new()), Arc::new(cart));
        let quote = Quote::from_lines(vec![priced("A", 100, 80, 1)], "");

        let reduced = reconciler.remove_line(&quote, "A");

        assert_eq!(reduced, Quote::empty(EMPTY_CART_MESSAGE));
    }

    #[test]
    fn custom_messages_are_used() {
        let reconciler = QuoteReconciler::new(
            Arc::new(MockQuoteService::new()),
            Arc::new(MemoryCartStore::default()),
        )
        .with_messages(QuoteMessages {
            empty: "Nothing here".to_string(),
            failed: "Oops".to_string(),
        });

        let quote = Quote::from_lines(vec![priced("A", 1, 1, 1)], "");

        assert_eq!(reconciler.remove_line(&quote, "A").message(), "Nothing here");
    }

    #[tokio::test]
    async fn malformed_response_is_a_failed_zero_quote() -> TestResult {
        let mut quotes = MockQuoteService::new();

        quotes.expect_quote().once().returning(|_| {
            Err(QuoteServiceError::MalformedResponse(
                <serde_json::Error as serde::de::Error>::custom("expected a JSON object"),
            ))
        });

        let reconciler =
            QuoteReconciler::new(Arc::new(quotes), Arc::new(MemoryCartStore::default()));

        let quote = reconciler.load_quote(&[CartLine::new("A", 1)?]).await;

        assert_eq!(quote.status(), QuoteStatus::Failed);
        assert_eq!(quote.total(), Decimal::ZERO);
        assert_eq!(quote.labeled_total(), Decimal::ZERO);
        assert_eq!(quote.discount(), Decimal::ZERO);
        assert!(quote.is_empty(), "failed quote should carry no lines");

        Ok(())
    }

    #[tokio::test]
    async fn price_out_of_range_is_a_failed_quote() -> TestResult {
        let body = r#"{
            "orderedItems": [
                {"productId": "A", "price": "79228162514264337593543950335", "lastPrice": 1, "qty": 2},
                {"productId": "B", "price": 10, "lastPrice": 10, "qty": 1}
            ],
            "total": 12,
            "labeledTotal": 10
        }"#;
        let server = ServerQuote::parse(body)?;

        let mut quotes = MockQuoteService::new();

        quotes
            .expect_quote()
            .once()
            .returning(move |_| Ok(server.clone()));

        let reconciler =
            QuoteReconciler::new(Arc::new(quotes), Arc::new(MemoryCartStore::default()));

        let quote = reconciler
            .load_quote(&[CartLine::new("A", 2)?, CartLine::new("B", 1)?])
            .await;

        assert_eq!(quote.status(), QuoteStatus::Failed);
        assert_eq!(quote.total(), Decimal::ZERO);

        let reduced = reconciler.remove_line(&quote, "B");

        assert_eq!(reduced, quote);

        Ok(())
    }

    #[tokio::test]
    async fn lines_summing_out_of_range_fail_the_load() -> TestResult {
        let third = Decimal::MAX / Decimal::from(3);
        let big = |id: &str| PricedLine {
            price: third,
            last_price: third,
            ..priced(id, 0, 0, 1)
        };
        let server = ServerQuote {
            ordered_items: vec![big("A"), big("B"), big("C"), big("D"), priced("E", 1, 1, 1)],
            total: Decimal::MAX,
            labeled_total: Decimal::MAX,
            ..ServerQuote::default()
        };

        let mut quotes = MockQuoteService::new();
        let mut cart = MockCartStore::new();

        quotes
            .expect_quote()
            .once()
            .returning(move |_| Ok(server.clone()));
        cart.expect_delete_item().never();

        let reconciler = QuoteReconciler::new(Arc::new(quotes), Arc::new(cart))
            .with_messages(QuoteMessages {
                empty: EMPTY_CART_MESSAGE.to_string(),
                failed: "Prices unavailable".to_string(),
            });

        let quote = reconciler.load_quote(&[CartLine::new("E", 1)?]).await;

        assert_eq!(quote.status(), QuoteStatus::Failed);
        assert_eq!(quote.total(), Decimal::ZERO);
        assert_eq!(quote.message(), "Prices unavailable");
        assert_eq!(reconciler.remove_line(&quote, "E"), quote);

        Ok(())
    }
}
