//! Catalog products and categories.
//!
//! The catalog hands out loosely-shaped JSON. [`ProductDraft`] mirrors that
//! shape with every field optional; [`Product`] is the validated form the
//! rest of the system works with. Deserializing a `Product` goes through the
//! draft, so a listing with a missing id, title or price never becomes a
//! `Product`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::{CategoryId, IdError, ProductId, RawId};
use super::price::{PriceError, validate_amount};

/// Errors that can occur when validating a product listing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductError {
    /// A required field is absent.
    #[error("product is missing required field `{0}`")]
    MissingField(&'static str),
    /// The identifier is malformed.
    #[error("invalid product id: {0}")]
    InvalidId(#[from] IdError),
    /// The price is malformed.
    #[error("invalid product price: {0}")]
    InvalidPrice(#[from] PriceError),
    /// The title is empty.
    #[error("product title cannot be blank")]
    BlankTitle,
}

/// Unvalidated product listing as supplied by the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub id: Option<RawId>,
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub main_image: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
}

/// A validated catalog product.
///
/// Read-only to the cart and checkout: they copy it into line items but never
/// change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ProductDraft")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stock: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
}

impl Product {
    /// Create a product with only the required fields.
    ///
    /// # Errors
    ///
    /// Returns `ProductError` if the title is blank or the price is negative.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        price: Decimal,
    ) -> Result<Self, ProductError> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(ProductError::BlankTitle);
        }
        Ok(Self {
            id,
            title,
            price: validate_amount(price)?,
            stock: None,
            main_image: None,
            category: None,
            brand: None,
            description: None,
            short_description: None,
            long_description: None,
        })
    }

    /// Whether the listing reports units on hand. Unknown stock counts as
    /// unavailable.
    #[must_use]
    pub fn in_stock(&self) -> bool {
        self.stock.is_some_and(|s| s > 0)
    }

    /// Case-insensitive category match.
    #[must_use]
    pub fn is_in_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(category.trim()))
    }

    /// Case-insensitive substring match against title and description.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return false;
        }
        self.title.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}

impl TryFrom<ProductDraft> for Product {
    type Error = ProductError;

    fn try_from(draft: ProductDraft) -> Result<Self, Self::Error> {
        let raw_id = draft.id.ok_or(ProductError::MissingField("id"))?;
        let id = ProductId::parse(&raw_id.into_text())?;
        let title = draft.title.ok_or(ProductError::MissingField("title"))?;
        let price = draft.price.ok_or(ProductError::MissingField("price"))?;

        let mut product = Self::new(id, title, price)?;
        product.stock = draft.stock;
        product.main_image = draft.main_image;
        product.category = draft.category;
        product.brand = draft.brand;
        product.description = draft.description;
        product.short_description = draft.short_description;
        product.long_description = draft.long_description;
        Ok(product)
    }
}

/// A browsable product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
