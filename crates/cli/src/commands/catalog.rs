//! Catalog browsing command.
//!
//! # Usage
//!
//! ```bash
//! # Categories and every product
//! th-cli catalog
//!
//! # Products in a category, optionally narrowed by a search
//! th-cli catalog --category peripherals --search wireless
//!
//! # Search across all products
//! th-cli catalog --search keyboard
//! ```

use serde::Serialize;

use techhub_core::{Category, CurrencyCode, Price, Product};
use techhub_storefront::services::catalog::Catalog;

use super::{CommandError, print_json};

#[derive(Debug, Serialize)]
struct Listing {
    #[serde(skip_serializing_if = "Option::is_none")]
    categories: Option<Vec<Category>>,
    products: Vec<Product>,
}

/// List catalog contents.
///
/// # Errors
///
/// Returns `CommandError::Catalog` if the catalog cannot be read.
pub async fn run(
    catalog: &dyn Catalog,
    category: Option<&str>,
    search: Option<&str>,
    currency: CurrencyCode,
    json: bool,
) -> Result<(), CommandError> {
    let listing = match (category, search) {
        (None, None) => Listing {
            categories: Some(catalog.fetch_categories().await?),
            products: catalog.fetch_all_products().await?,
        },
        (Some(category), None) => Listing {
            categories: None,
            products: catalog.fetch_products_by_category(category).await?,
        },
        (None, Some(query)) => Listing {
            categories: None,
            products: catalog.search(query).await?,
        },
        (Some(category), Some(query)) => Listing {
            categories: None,
            products: catalog.search_in_category(category, query).await?,
        },
    };

    if json {
        return print_json(&listing);
    }

    #[allow(clippy::print_stdout)]
    {
        if let Some(categories) = &listing.categories {
            println!("Categories:");
            for c in categories {
                println!("  {:<12} {}", c.id.as_str(), c.title);
            }
            println!();
        }

        if listing.products.is_empty() {
            println!("No products found");
        }
        for p in &listing.products {
            let stock = p.stock.map_or_else(|| "-".to_string(), |s| s.to_string());
            println!(
                "  {:<12} {:<40} {:>12}  stock {}",
                p.id.as_str(),
                p.title,
                Price::new(p.price, currency).to_string(),
                stock
            );
        }
    }

    Ok(())
}
