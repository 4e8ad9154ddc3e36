//! Place an order from the command line.
//!
//! # Usage
//!
//! ```bash
//! # Two of product 1 and one of product 2, paid by u1
//! th-cli --catalog-file catalog.json checkout --owner u1 --item 1x2 --item 2
//! ```
//!
//! Items are added in the order given. With no `STOREFRONT_DATABASE_URL`
//! the order lives only for the duration of the command.

use std::str::FromStr;
use std::sync::Arc;

use techhub_core::{Identity, OwnerId, ProductId, Quantity};
use techhub_storefront::config::StorefrontConfig;
use techhub_storefront::db;
use techhub_storefront::models::ReceiptView;
use techhub_storefront::services::{Catalog, LocalIdentity};
use techhub_storefront::{AppError, Session, SessionSettings};

use super::receipt::print_receipt;
use super::CommandError;

/// A product and how many of it to buy, written `ID` or `IDxQTY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemArg {
    pub id: ProductId,
    pub quantity: Quantity,
}

impl FromStr for ItemArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Ids may contain an `x` themselves; only a numeric suffix is a quantity.
        let (id, quantity) = match s.rsplit_once('x') {
            Some((id, qty)) if !id.is_empty() => match qty.parse::<u32>() {
                Ok(n) => (id, Quantity::new(n).map_err(|e| e.to_string())?),
                Err(_) => (s, Quantity::ONE),
            },
            _ => (s, Quantity::ONE),
        };
        let id = ProductId::parse(id).map_err(|e| format!("product id: {e}"))?;
        Ok(Self { id, quantity })
    }
}

/// Options for the `checkout` command.
#[derive(Debug)]
pub struct CheckoutArgs {
    pub owner: String,
    pub email: Option<String>,
    pub items: Vec<ItemArg>,
    pub json: bool,
}

/// Fill a cart and check it out as `owner`.
///
/// # Errors
///
/// Returns `CommandError` if the owner is invalid, a product is unknown, or
/// the checkout fails.
pub async fn run(
    config: &StorefrontConfig,
    catalog: Arc<dyn Catalog>,
    args: CheckoutArgs,
) -> Result<(), CommandError> {
    let owner = OwnerId::parse(&args.owner)
        .map_err(|e| CommandError::InvalidArgument(format!("owner: {e}")))?;
    let mut identity = Identity::new(owner);
    if let Some(email) = args.email {
        identity = identity.with_email(email);
    }

    let orders = db::connect_order_store(config).await?;
    let session = Session::new(
        SessionSettings::from(config),
        Arc::new(LocalIdentity::signed_in(identity)),
        orders,
        catalog,
    );

    for item in &args.items {
        session.add_product(&item.id).await?;
        for _ in 1..item.quantity.get() {
            session
                .cart()
                .increment_quantity(&item.id)
                .map_err(AppError::from)?;
        }
    }

    let order = session.checkout_cart().await?;
    tracing::info!(order_key = %order.key, "Order placed");

    print_receipt(
        &ReceiptView::new(&order, session.settings().currency),
        args.json,
    )
}
