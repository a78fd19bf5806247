//! # Cart
//!
//! Client-side copy of the storefront cart.
//!
//! The backend owns the real cart; this copy is what the last backend
//! response said, plus local edits the cart service is about to send. It
//! never stores a total, only lines.
//!
//! ## Line Merging
//! ```text
//! push_line(Burger, Large, +Cheese, qty 1)
//! push_line(Burger, Large, +Cheese, qty 2)   ──► one line, qty 3
//! push_line(Burger, Small,          qty 1)   ──► second line
//! ```
//! Lines merge only when product, selected variant options, add-ons and
//! schedule all match.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::{Currency, Money};
use crate::product::{Product, ProductSelection};
use crate::validation::validate_quantity;
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Selections Frozen on a Line
// =============================================================================

/// A variation option frozen on a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VariantSelection {
    pub variation_id: String,
    pub option_id: String,
    pub name: String,
    pub additional_cost: Money,
}

/// An add-on frozen on a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddonSelection {
    pub category_id: String,
    pub addon_id: String,
    pub name: String,
    pub price: Money,
}

// =============================================================================
// Cart Line
// =============================================================================

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub quantity: i64,
    /// Price of one unit with its selected options.
    pub unit_subtotal: Money,
    #[serde(default)]
    pub variants: Vec<VariantSelection>,
    #[serde(default)]
    pub addons: Vec<AddonSelection>,
    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl CartLine {
    /// A line without options.
    pub fn simple(
        product_id: impl Into<String>,
        name: impl Into<String>,
        unit_subtotal: Money,
        quantity: i64,
    ) -> Self {
        CartLine {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.into(),
            name: name.into(),
            quantity,
            unit_subtotal,
            variants: Vec::new(),
            addons: Vec::new(),
            scheduled_at: None,
        }
    }

    /// Builds a line from the product screen's current picks.
    ///
    /// ## Errors
    /// - `RequiredVariationMissing` / `UnknownOption` from the selection check
    /// - `Validation` when the quantity is outside `1..=MAX_LINE_QUANTITY`
    pub fn from_product(
        product: &Product,
        selection: &ProductSelection,
        quantity: i64,
    ) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        product.validate_selection(selection)?;

        let mut variants = Vec::new();
        for (variation_id, option) in &selection.variants {
            if let Some(option) = option {
                variants.push(VariantSelection {
                    variation_id: variation_id.clone(),
                    option_id: option.id.clone(),
                    name: option.name.clone(),
                    additional_cost: option.additional_cost,
                });
            }
        }

        let mut addons = Vec::new();
        for (category_id, picked) in &selection.addons {
            for addon in picked {
                addons.push(AddonSelection {
                    category_id: category_id.clone(),
                    addon_id: addon.id.clone(),
                    name: addon.name.clone(),
                    price: addon.price,
                });
            }
        }

        Ok(CartLine {
            id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            unit_subtotal: product.unit_subtotal(selection),
            variants,
            addons,
            scheduled_at: None,
        })
    }

    /// Schedules the line for a later time.
    pub fn scheduled(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(at);
        self
    }

    /// `unit_subtotal × quantity`.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_subtotal.multiply_quantity(self.quantity)
    }

    /// True when both lines describe the same product with the same picks.
    pub fn same_item_as(&self, other: &CartLine) -> bool {
        self.product_id == other.product_id
            && self.scheduled_at == other.scheduled_at
            && self.option_key() == other.option_key()
    }

    fn option_key(&self) -> (Vec<&str>, Vec<&str>) {
        let mut variants: Vec<&str> = self.variants.iter().map(|v| v.option_id.as_str()).collect();
        let mut addons: Vec<&str> = self.addons.iter().map(|a| a.addon_id.as_str()).collect();
        variants.sort_unstable();
        addons.sort_unstable();
        (variants, addons)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// The customer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub id: String,
    pub currency: Currency,
    #[serde(default)]
    pub lines: Vec<CartLine>,
}

impl Cart {
    /// Creates an empty cart with a fresh id.
    pub fn new(currency: impl AsRef<str>) -> Self {
        Cart {
            id: Uuid::new_v4().to_string(),
            currency: Currency::new(currency),
            lines: Vec::new(),
        }
    }

    /// Adds a line, merging it into an identical existing line.
    ///
    /// ## Errors
    /// - `Validation` for a quantity outside `1..=MAX_LINE_QUANTITY`
    /// - `QuantityTooLarge` when merging would exceed the per-line maximum
    /// - `CartTooLarge` when a new line would exceed `MAX_CART_LINES`
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::cart::{Cart, CartLine};
    /// use storefront_core::money::Money;
    ///
    /// let mut cart = Cart::new("USD");
    /// cart.push_line(CartLine::simple("prod_1", "Tea", Money::from_minor(350), 1)).unwrap();
    /// cart.push_line(CartLine::simple("prod_1", "Tea", Money::from_minor(350), 2)).unwrap();
    ///
    /// assert_eq!(cart.lines.len(), 1);
    /// assert_eq!(cart.subtotal().minor(), 1050);
    /// ```
    pub fn push_line(&mut self, line: CartLine) -> CoreResult<&CartLine> {
        validate_quantity(line.quantity)?;

        if let Some(index) = self.lines.iter().position(|l| l.same_item_as(&line)) {
            let merged = self.lines[index].quantity + line.quantity;
            if merged > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: merged,
                    max: MAX_LINE_QUANTITY,
                });
            }
            self.lines[index].quantity = merged;
            return Ok(&self.lines[index]);
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge { max: MAX_CART_LINES });
        }

        self.lines.push(line);
        let last = self.lines.len() - 1;
        Ok(&self.lines[last])
    }

    /// Sets a line's quantity. Zero removes the line.
    pub fn update_quantity(&mut self, line_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(line_id).map(|_| ());
        }
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line and returns it.
    pub fn remove_line(&mut self, line_id: &str) -> CoreResult<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;
        Ok(self.lines.remove(index))
    }

    pub fn empty(&mut self) {
        self.lines.clear();
    }

    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    /// Sum of line subtotals. Recomputed on every call.
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total units across all lines (the cart badge number).
    pub fn count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use crate::product::tests::burger;

    fn tea(qty: i64) -> CartLine {
        CartLine::simple("prod_tea", "Tea", Money::from_minor(350), qty)
    }

    #[test]
    fn test_subtotal_and_count() {
        let mut cart = Cart::new("usd");
        cart.push_line(tea(2)).unwrap();
        cart.push_line(CartLine::simple("prod_cake", "Cake", Money::from_minor(500), 1))
            .unwrap();

        assert_eq!(cart.currency.code(), "USD");
        assert_eq!(cart.subtotal().minor(), 1200);
        assert_eq!(cart.count(), 3);
        assert!(!cart.is_empty());
    }

    #[test]
    fn test_push_merges_identical_lines() {
        let mut cart = Cart::new("USD");
        cart.push_line(tea(1)).unwrap();
        let line = cart.push_line(tea(2)).unwrap();
        assert_eq!(line.quantity, 3);
        assert_eq!(cart.lines.len(), 1);
    }

    #[test]
    fn test_different_options_do_not_merge() {
        let product = burger();
        let mut small = ProductSelection::defaults_for(&product);
        small.select_variant("var_size", product.variations[0].options[0].clone());
        let mut large = ProductSelection::defaults_for(&product);
        large.select_variant("var_size", product.variations[0].options[1].clone());

        let mut cart = Cart::new("USD");
        cart.push_line(CartLine::from_product(&product, &small, 1).unwrap())
            .unwrap();
        cart.push_line(CartLine::from_product(&product, &large, 1).unwrap())
            .unwrap();
        cart.push_line(CartLine::from_product(&product, &large, 1).unwrap())
            .unwrap();

        assert_eq!(cart.lines.len(), 2);
        assert_eq!(cart.subtotal().minor(), 1200 + 1500 * 2);
    }

    #[test]
    fn test_merge_respects_max_quantity() {
        let mut cart = Cart::new("USD");
        cart.push_line(tea(60)).unwrap();
        let err = cart.push_line(tea(40)).unwrap_err();
        assert_eq!(
            err,
            CoreError::QuantityTooLarge {
                requested: 100,
                max: MAX_LINE_QUANTITY
            }
        );
        assert_eq!(cart.lines[0].quantity, 60);
    }

    #[test]
    fn test_invalid_quantity_rejected() {
        let mut cart = Cart::new("USD");
        assert!(matches!(
            cart.push_line(tea(0)),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_line_limit() {
        let mut cart = Cart::new("USD");
        for i in 0..MAX_CART_LINES {
            cart.push_line(CartLine::simple(format!("prod_{i}"), "Item", Money::from_minor(1), 1))
                .unwrap();
        }
        let err = cart
            .push_line(CartLine::simple("prod_extra", "Item", Money::from_minor(1), 1))
            .unwrap_err();
        assert_eq!(err, CoreError::CartTooLarge { max: MAX_CART_LINES });
    }

    #[test]
    fn test_update_and_remove() {
        let mut cart = Cart::new("USD");
        let id = cart.push_line(tea(1)).unwrap().id.clone();

        cart.update_quantity(&id, 4).unwrap();
        assert_eq!(cart.line(&id).unwrap().quantity, 4);

        cart.update_quantity(&id, 0).unwrap();
        assert!(cart.is_empty());

        assert_eq!(
            cart.remove_line("missing").unwrap_err(),
            CoreError::LineNotFound("missing".to_string())
        );
    }

    #[test]
    fn test_from_product_requires_variations() {
        let product = burger();
        let selection = ProductSelection::defaults_for(&product);
        assert!(matches!(
            CartLine::from_product(&product, &selection, 1),
            Err(CoreError::RequiredVariationMissing { .. })
        ));
    }

    #[test]
    fn test_selection_round_trips_through_line() {
        let product = burger();
        let mut selection = ProductSelection::defaults_for(&product);
        selection.select_variant("var_size", product.variations[0].options[1].clone());
        selection.toggle_addon("cat_extras", product.addon_categories[0].addons[1].clone(), true);

        let line = CartLine::from_product(&product, &selection, 2).unwrap();
        assert_eq!(line.subtotal().minor(), (1200 + 300 + 250) * 2);
        assert_eq!(ProductSelection::from_cart_line(&line, &product), selection);
    }

    #[test]
    fn test_empty() {
        let mut cart = Cart::new("USD");
        cart.push_line(tea(1)).unwrap();
        cart.empty();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Money::zero());
    }
}
