//! Receipt lookup command.
//!
//! # Usage
//!
//! ```bash
//! # Most recent order
//! th-cli receipt --owner u1
//!
//! # Every order, newest first
//! th-cli receipt --owner u1 --all
//!
//! # Keep printing receipts as new orders arrive (Ctrl+C to stop)
//! th-cli receipt --owner u1 --follow
//! ```

use std::sync::Arc;

use techhub_core::{Identity, OwnerId};
use techhub_storefront::config::StorefrontConfig;
use techhub_storefront::models::ReceiptView;
use techhub_storefront::services::LocalIdentity;
use techhub_storefront::Session;

use super::{CommandError, print_json};

/// Options for the `receipt` command.
#[derive(Debug)]
pub struct ReceiptArgs {
    pub owner: String,
    pub all: bool,
    pub follow: bool,
    pub json: bool,
}

/// Print receipts for an owner.
///
/// # Errors
///
/// Returns `CommandError` if the owner id is invalid or the order store
/// cannot be read.
pub async fn run(config: &StorefrontConfig, args: ReceiptArgs) -> Result<(), CommandError> {
    let owner = OwnerId::parse(&args.owner)
        .map_err(|e| CommandError::InvalidArgument(format!("owner: {e}")))?;
    let identity = Arc::new(LocalIdentity::signed_in(Identity::new(owner.clone())));
    let session = Session::from_config(config, identity).await?;

    if args.all {
        let history = session.order_history().await?;
        if history.is_empty() {
            print_none(&owner);
        }
        for receipt in &history {
            print_receipt(receipt, args.json)?;
        }
    } else {
        match session.latest_receipt().await? {
            Some(receipt) => print_receipt(&receipt, args.json)?,
            None => print_none(&owner),
        }
    }

    if args.follow {
        follow(&session, args.json).await?;
    }

    Ok(())
}

async fn follow(session: &Session, json: bool) -> Result<(), CommandError> {
    let mut subscription = session.watch_receipts().await?;
    tracing::info!("Waiting for new orders (Ctrl+C to stop)");

    loop {
        tokio::select! {
            changed = subscription.changed() => {
                let latest = changed?;
                if let Some(order) = latest {
                    print_receipt(&ReceiptView::new(&order, session.settings().currency), json)?;
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    subscription.unsubscribe();
    Ok(())
}

fn print_none(owner: &OwnerId) {
    #[allow(clippy::print_stdout)]
    {
        println!("No orders for {owner}");
    }
}

/// Print a receipt as text or JSON.
///
/// # Errors
///
/// Returns `CommandError::Json` if JSON output fails to serialize.
pub fn print_receipt(receipt: &ReceiptView, json: bool) -> Result<(), CommandError> {
    if json {
        return print_json(receipt);
    }

    #[allow(clippy::print_stdout)]
    {
        println!("Receipt {}", receipt.order_key);
        println!("  {}", receipt.purchase_date());
        for line in &receipt.lines {
            println!(
                "  {:>3} x {:<36} {:>12} {:>12}",
                line.quantity,
                line.title,
                line.unit_price.to_string(),
                line.subtotal.to_string()
            );
        }
        println!("  Items: {}", receipt.item_count);
        println!("  Total: {}", receipt.total);
        println!();
    }
    Ok(())
}
