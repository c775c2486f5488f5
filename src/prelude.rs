//! Storefront prelude.
//!
//! Convenience exports for common library consumers.

pub use crate::{
    cart::{CartError, CartLine, CartStore, FileCartStore, MemoryCartStore},
    client::{HttpQuoteService, QuoteClientConfig, QuoteService, QuoteServiceError},
    quote::{
        EMPTY_CART_MESSAGE, PricedLine, QUOTE_FAILED_MESSAGE, Quote, QuoteError, QuoteStatus,
    },
    receipt::{ReceiptError, ReceiptWriter},
    reconciler::{QuoteMessages, QuoteReconciler},
    schema::ServerQuote,
    session::{CartSession, CheckoutHandoff, PendingLoad, SessionError, SessionHandle, SessionState},
};
