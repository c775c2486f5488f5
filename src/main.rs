//! Storefront cart CLI

use std::{
    io::{self, Write},
    process::ExitCode,
    sync::Arc,
};

use clap::{Args, Parser, Subcommand};
use thiserror::Error;
use tracing::debug;

use storefront::{
    cart::{CartError, CartStore, FileCartStore},
    client::{HttpQuoteService, QuoteServiceError},
    config::{ConfigError, StorefrontConfig},
    observability::{self, ObservabilityError},
    quote::{Quote, QuoteStatus},
    receipt::{ReceiptError, ReceiptWriter},
    reconciler::QuoteReconciler,
    session::{CartSession, SessionError},
};

#[derive(Debug, Parser)]
#[command(name = "storefront-cart", about = "Storefront cart CLI", long_about = None)]
struct Cli {
    #[command(flatten)]
    config: StorefrontConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Add a product to the cart
    Add(AddArgs),

    /// Change the quantity of a product already in the cart
    SetQty(SetQtyArgs),

    /// Remove a product and show the updated quote
    Remove(ProductArgs),

    /// Price the cart and show the quote
    Show,

    /// Show the quote to be handed to checkout
    Checkout(CheckoutArgs),

    /// Empty the cart
    Clear,
}

#[derive(Debug, Args)]
struct AddArgs {
    /// Product identifier
    product: String,

    /// Units to add
    #[arg(short, long, default_value_t = 1)]
    qty: u32,
}

#[derive(Debug, Args)]
struct SetQtyArgs {
    /// Product identifier
    product: String,

    /// New quantity; 0 removes the product
    qty: u32,
}

#[derive(Debug, Args)]
struct ProductArgs {
    /// Product identifier
    product: String,
}

#[derive(Debug, Args)]
struct CheckoutArgs {
    /// Print the quote as JSON
    #[arg(long)]
    json: bool,

    /// Treat checkout as completed and clear the cart
    #[arg(long)]
    confirm: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Observability(#[from] ObservabilityError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Client(#[from] QuoteServiceError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error("failed to encode quote: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),

    #[error("{0}")]
    Quote(String),
}

#[tokio::main]
pub async fn main() -> ExitCode {
    let _env = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => error.exit(),
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            #[expect(
                clippy::print_stderr,
                reason = "errors are reported to the terminal user"
            )]
            {
                eprintln!("error: {error}");
            }

            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    observability::init(&cli.config.logging)?;

    let store: Arc<dyn CartStore> = Arc::new(FileCartStore::new(&cli.config.cart.cart_path));

    debug!(path = %cli.config.cart.cart_path.display(), "using cart file");

    match cli.command {
        Commands::Add(args) => {
            store.add_item(&args.product, args.qty)?;

            Ok(())
        }
        Commands::SetQty(args) => {
            store.set_quantity(&args.product, args.qty)?;

            Ok(())
        }
        Commands::Clear => {
            store.clear()?;

            Ok(())
        }
        Commands::Show => {
            let mut session = open_session(&cli.config, store)?;
            let quote = loaded_quote(&mut session).await?;

            print_quote(&cli.config, &quote)
        }
        Commands::Remove(args) => {
            let mut session = open_session(&cli.config, store)?;

            require_priced(loaded_quote(&mut session).await?)?;

            let quote = session
                .remove(&args.product)
                .quote()
                .cloned()
                .ok_or_else(|| CliError::Quote("cart is still loading".to_string()))?;

            print_quote(&cli.config, &quote)
        }
        Commands::Checkout(args) => {
            let mut session = open_session(&cli.config, store)?;

            let quote = loaded_quote(&mut session).await?;
            let handoff = session.checkout().map_err(|error| match error {
                SessionError::NotReady => CliError::Quote(quote.message().to_string()),
                other => other.into(),
            })?;

            if args.json {
                let mut stdout = io::stdout().lock();

                serde_json::to_writer_pretty(&mut stdout, handoff.quote())?;
                writeln!(stdout)?;
            } else {
                print_quote(&cli.config, handoff.quote())?;
            }

            if args.confirm {
                session.complete_checkout(handoff)?;
            }

            Ok(())
        }
    }
}

fn open_session(
    config: &StorefrontConfig,
    store: Arc<dyn CartStore>,
) -> Result<CartSession, CliError> {
    let quotes = HttpQuoteService::new(config.api.client_config()?)?;

    Ok(CartSession::new(QuoteReconciler::new(Arc::new(quotes), store)))
}

async fn loaded_quote(session: &mut CartSession) -> Result<Quote, CliError> {
    session
        .reload()
        .await?
        .cloned()
        .ok_or_else(|| CliError::Quote("quote request was superseded".to_string()))
}

/// Removal only applies to a priced cart; anything else is reported with the
/// quote's own message.
fn require_priced(quote: Quote) -> Result<Quote, CliError> {
    if quote.status() == QuoteStatus::Priced {
        Ok(quote)
    } else {
        Err(CliError::Quote(quote.message().to_string()))
    }
}

fn print_quote(config: &StorefrontConfig, quote: &Quote) -> Result<(), CliError> {
    let writer = ReceiptWriter::new(&config.cart.currency)?;

    writer.write_to(io::stdout().lock(), quote)?;

    Ok(())
}
