//! checkout-totals - Prints the checkout summary for a cart.
//!
//! # Usage
//!
//! ```bash
//! # Read the checkout inputs from a file
//! checkout-totals checkout.json
//!
//! # Read from stdin, override the tip, print JSON
//! cat checkout.json | checkout-totals --tip 10% --json
//! ```
//!
//! # Input
//!
//! ```json
//! {
//!   "cart": { "id": "cart_1", "currency": "USD", "lines": [] },
//!   "options": { "tip": "10%", "delivery_tip": 300, "is_pickup": false },
//!   "quote": { "status": "ready", "value": { "amount": 500 } }
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use serde::Deserialize;
use storefront_core::{Cart, CheckoutOptions, CheckoutTotals, QuoteStatus, TipSpec};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "checkout-totals")]
#[command(author, version, about = "Storefront checkout summary")]
struct Cli {
    /// JSON file with the checkout inputs (stdin when omitted)
    input: Option<PathBuf>,

    /// Tip override, e.g. `10%` or `250`
    #[arg(long)]
    tip: Option<TipSpec>,

    /// Delivery tip override
    #[arg(long)]
    delivery_tip: Option<TipSpec>,

    /// Treat the order as pickup
    #[arg(long)]
    pickup: bool,

    /// Print the breakdown as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Deserialize)]
struct TotalsInput {
    cart: Cart,
    #[serde(default)]
    options: CheckoutOptions,
    #[serde(default)]
    quote: QuoteStatus,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        tracing::error!("checkout-totals failed: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let raw = match &cli.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut input: TotalsInput = serde_json::from_str(&raw)?;
    if let Some(tip) = cli.tip {
        input.options.tip = Some(tip);
    }
    if let Some(tip) = cli.delivery_tip {
        input.options.delivery_tip = Some(tip);
    }
    input.options.is_pickup |= cli.pickup;

    debug!(
        lines = input.cart.lines.len(),
        pickup = input.options.is_pickup,
        "Computing checkout totals"
    );
    let totals = CheckoutTotals::compute(&input.cart, &input.options, &input.quote);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    for line in &totals.lines {
        let amount = if line.pending {
            "...".to_string()
        } else {
            line.amount.format(&totals.currency)
        };
        match &line.detail {
            Some(detail) => println!("{:<14} {:>12}  ({})", line.label, amount, detail),
            None => println!("{:<14} {:>12}", line.label, amount),
        }
    }

    Ok(())
}
