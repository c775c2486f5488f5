//! Cart session
//!
//! Tracks one cart view's lifecycle:
//!
//! ```text
//! Empty ──begin_load──▶ Loading ──complete──▶ Priced | Failed | Empty
//! Priced ──remove(last)──▶ Empty
//! Priced ──remove(other)──▶ Priced
//! Failed ──reload──▶ Loading
//! ```
//!
//! Every load is stamped with a generation. Invalidating the session (for
//! example when the view is torn down) or starting a newer load makes older
//! responses stale, and stale responses are discarded.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use thiserror::Error;
use tracing::debug;

use crate::{
    cart::{CartError, CartLine},
    quote::{Quote, QuoteStatus},
    reconciler::QuoteReconciler,
};

/// Errors raised by session transitions.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Checkout needs a priced, non-empty cart.
    #[error("cart is not ready for checkout")]
    NotReady,

    /// The persisted cart could not be read or cleared.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Where a session is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing to price.
    Empty(Quote),

    /// A quote request is in flight.
    Loading,

    /// The cart has a usable quote.
    Priced(Quote),

    /// Pricing failed; stays here until [`CartSession::reload`].
    Failed(Quote),
}

impl SessionState {
    /// Quote to render, if one is available.
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            Self::Empty(quote) | Self::Priced(quote) | Self::Failed(quote) => Some(quote),
            Self::Loading => None,
        }
    }
}

/// Shared generation counter. Clones observe and bump the same counter.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    generation: Arc<AtomicU64>,
}

impl SessionHandle {
    /// Current generation.
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Make every in-flight load stale.
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current() == generation
    }
}

/// A load that has been started but not yet applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    /// Generation this load belongs to
    pub generation: u64,

    /// Cart snapshot being priced
    pub lines: Vec<CartLine>,
}

/// A quote handed to checkout. Downstream stages use its totals as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutHandoff {
    quote: Quote,
}

impl CheckoutHandoff {
    /// The quote being checked out.
    pub fn quote(&self) -> &Quote {
        &self.quote
    }

    /// Take the quote.
    pub fn into_quote(self) -> Quote {
        self.quote
    }
}

/// One cart view's pricing state.
#[derive(Debug)]
pub struct CartSession {
    reconciler: QuoteReconciler,
    handle: SessionHandle,
    state: SessionState,
}

impl CartSession {
    /// Create a session in the `Empty` state.
    pub fn new(reconciler: QuoteReconciler) -> Self {
        Self::with_handle(reconciler, SessionHandle::default())
    }

    /// Create a session sharing an existing generation counter.
    pub fn with_handle(reconciler: QuoteReconciler, handle: SessionHandle) -> Self {
        let state = SessionState::Empty(reconciler.empty_quote());

        Self {
            reconciler,
            handle,
            state,
        }
    }

    /// Handle for invalidating this session from elsewhere.
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Start a load: snapshot the persisted cart and enter `Loading`.
    ///
    /// Any load already in flight becomes stale.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cart`] if the persisted cart cannot be read.
    pub fn begin_load(&mut self) -> Result<PendingLoad, SessionError> {
        let lines = self.reconciler.cart().load()?;
        let generation = self.handle.invalidate();

        debug!(generation, lines = lines.len(), "session loading");

        self.state = SessionState::Loading;

        Ok(PendingLoad { generation, lines })
    }

    /// Apply a finished load. Returns `false` and leaves the state untouched
    /// if the load is stale.
    pub fn complete(&mut self, pending: &PendingLoad, quote: Quote) -> bool {
        if !self.handle.is_current(pending.generation) {
            debug!(
                generation = pending.generation,
                current = self.handle.current(),
                "discarding stale quote"
            );

            return false;
        }

        self.state = match quote.status() {
            QuoteStatus::Empty => SessionState::Empty(quote),
            QuoteStatus::Priced => SessionState::Priced(quote),
            QuoteStatus::Failed => SessionState::Failed(quote),
        };

        true
    }

    /// Load (or reload after a failure) and apply the result.
    ///
    /// Returns the new quote, or `None` if the session was invalidated while
    /// the request was in flight.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cart`] if the persisted cart cannot be read.
    pub async fn reload(&mut self) -> Result<Option<&Quote>, SessionError> {
        let pending = self.begin_load()?;
        let quote = self.reconciler.load_quote(&pending.lines).await;

        if self.complete(&pending, quote) {
            Ok(self.state.quote())
        } else {
            Ok(None)
        }
    }

    /// Remove a line from a priced cart. Outside `Priced` this does nothing.
    pub fn remove(&mut self, product_id: &str) -> &SessionState {
        let SessionState::Priced(quote) = &self.state else {
            debug!(product_id, "remove ignored outside priced state");

            return &self.state;
        };

        let reduced = self.reconciler.remove_line(quote, product_id);

        self.state = if reduced.is_empty() {
            SessionState::Empty(reduced)
        } else {
            SessionState::Priced(reduced)
        };

        &self.state
    }

    /// Hand the current quote to checkout, unmodified.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotReady`] unless the session holds a priced,
    /// non-empty quote.
    pub fn checkout(&self) -> Result<CheckoutHandoff, SessionError> {
        match &self.state {
            SessionState::Priced(quote) if !quote.is_empty() => Ok(CheckoutHandoff {
                quote: quote.clone(),
            }),
            _ => Err(SessionError::NotReady),
        }
    }

    /// Finish a successful checkout: clear the persisted cart and reset.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Cart`] if the persisted cart cannot be cleared.
    pub fn complete_checkout(&mut self, handoff: CheckoutHandoff) -> Result<Quote, SessionError> {
        self.reconciler.cart().clear()?;
        self.handle.invalidate();

        debug!(total = %handoff.quote().total(), "checkout complete; cart cleared");

        self.state = SessionState::Empty(self.reconciler.empty_quote());

        Ok(handoff.into_quote())
    }
}
