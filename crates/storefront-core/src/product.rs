//! # Products and Options
//!
//! Catalog products as the storefront backend serves them, plus the
//! customer's in-progress option picks on the product screen.
//!
//! ## Option Model
//! ```text
//! Product "Burger" (price 1200)
//! ├── variations (pick exactly one option each)
//! │   ├── Size      [required]  Small +0 │ Large +300
//! │   └── Bun                   White +0 │ Brioche +150
//! └── addon categories (pick any number)
//!     └── Extras                Cheese +100 │ Bacon +250
//!
//! unit_subtotal = price + Σ selected variation costs + Σ selected addon prices
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Catalog Types
// =============================================================================

/// One option of a product variation (e.g. "Large").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VariantOption {
    pub id: String,
    pub name: String,
    /// Added to the product price when selected.
    #[serde(default)]
    pub additional_cost: Money,
}

/// A product variation such as "Size".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductVariation {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub options: Vec<VariantOption>,
}

/// A single add-on (e.g. "Extra cheese").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Addon {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub price: Money,
}

/// A group of add-ons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddonCategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub addons: Vec<Addon>,
}

/// A product available in the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub sale_price: Option<Money>,
    #[serde(default)]
    pub is_on_sale: bool,
    #[serde(default)]
    pub variations: Vec<ProductVariation>,
    #[serde(default)]
    pub addon_categories: Vec<AddonCategory>,
}

impl Product {
    /// Price of one unit before options, honoring an active sale.
    pub fn base_price(&self) -> Money {
        match (self.is_on_sale, self.sale_price) {
            (true, Some(sale)) => sale,
            _ => self.price,
        }
    }

    /// True when the product screen should show option pickers.
    pub fn has_options(&self) -> bool {
        !self.variations.is_empty() || !self.addon_categories.is_empty()
    }

    /// Finds a variation option anywhere on the product.
    pub fn variant_option(&self, option_id: &str) -> Option<(&ProductVariation, &VariantOption)> {
        self.variations.iter().find_map(|variation| {
            variation
                .options
                .iter()
                .find(|option| option.id == option_id)
                .map(|option| (variation, option))
        })
    }

    /// Finds an add-on anywhere on the product.
    pub fn addon(&self, addon_id: &str) -> Option<(&AddonCategory, &Addon)> {
        self.addon_categories.iter().find_map(|category| {
            category
                .addons
                .iter()
                .find(|addon| addon.id == addon_id)
                .map(|addon| (category, addon))
        })
    }

    /// Names of required variations the selection leaves empty.
    pub fn missing_required_variations(&self, selection: &ProductSelection) -> Vec<String> {
        self.variations
            .iter()
            .filter(|variation| variation.is_required && !selection.is_variant_selected(&variation.id))
            .map(|variation| variation.name.clone())
            .collect()
    }

    /// Every required variation has a selected option.
    pub fn is_ready_for_checkout(&self, selection: &ProductSelection) -> bool {
        self.missing_required_variations(selection).is_empty()
    }

    /// Checks the selection against this product.
    ///
    /// ## Errors
    /// - `RequiredVariationMissing` for the first unselected required variation
    /// - `UnknownOption` when an option or add-on id is not on the product
    pub fn validate_selection(&self, selection: &ProductSelection) -> CoreResult<()> {
        if let Some(variation) = self.missing_required_variations(selection).into_iter().next() {
            return Err(CoreError::RequiredVariationMissing { variation });
        }

        for option in selection.selected_variants() {
            if self.variant_option(&option.id).is_none() {
                return Err(CoreError::UnknownOption {
                    option_id: option.id.clone(),
                });
            }
        }
        for addon in selection.selected_addons() {
            if self.addon(&addon.id).is_none() {
                return Err(CoreError::UnknownOption {
                    option_id: addon.id.clone(),
                });
            }
        }

        Ok(())
    }

    /// Price of one unit with the selected options.
    pub fn unit_subtotal(&self, selection: &ProductSelection) -> Money {
        let variants: Money = selection
            .selected_variants()
            .map(|option| option.additional_cost)
            .sum();
        let addons: Money = selection.selected_addons().map(|addon| addon.price).sum();
        self.base_price() + variants + addons
    }
}

// =============================================================================
// Product Selection
// =============================================================================

/// The customer's option picks for one product.
///
/// Variations hold at most one option each; add-on categories hold a
/// de-duplicated list. Keys are variation / category ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSelection {
    pub variants: BTreeMap<String, Option<VariantOption>>,
    pub addons: BTreeMap<String, Vec<Addon>>,
}

impl ProductSelection {
    /// Empty slots for every variation and add-on category of the product.
    pub fn defaults_for(product: &Product) -> Self {
        ProductSelection {
            variants: product
                .variations
                .iter()
                .map(|variation| (variation.id.clone(), None))
                .collect(),
            addons: product
                .addon_categories
                .iter()
                .map(|category| (category.id.clone(), Vec::new()))
                .collect(),
        }
    }

    /// Rebuilds the picks behind an existing cart line, for editing it.
    pub fn from_cart_line(line: &crate::cart::CartLine, product: &Product) -> Self {
        let mut selection = ProductSelection::defaults_for(product);

        for variation in &product.variations {
            let picked = variation
                .options
                .iter()
                .find(|option| line.variants.iter().any(|v| v.option_id == option.id))
                .cloned();
            selection.variants.insert(variation.id.clone(), picked);
        }

        for category in &product.addon_categories {
            let picked: Vec<Addon> = category
                .addons
                .iter()
                .filter(|addon| line.addons.iter().any(|a| a.addon_id == addon.id))
                .cloned()
                .collect();
            selection.addons.insert(category.id.clone(), picked);
        }

        selection
    }

    /// Selects an option for a variation, replacing any previous pick.
    pub fn select_variant(&mut self, variation_id: impl Into<String>, option: VariantOption) {
        self.variants.insert(variation_id.into(), Some(option));
    }

    /// Checks or unchecks an add-on inside a category.
    pub fn toggle_addon(&mut self, category_id: impl Into<String>, addon: Addon, checked: bool) {
        let entry = self.addons.entry(category_id.into()).or_default();
        if checked {
            if !entry.iter().any(|a| a.id == addon.id) {
                entry.push(addon);
            }
        } else {
            entry.retain(|a| a.id != addon.id);
        }
    }

    pub fn is_variant_selected(&self, variation_id: &str) -> bool {
        matches!(self.variants.get(variation_id), Some(Some(_)))
    }

    pub fn is_addon_selected(&self, addon_id: &str) -> bool {
        self.addons.values().flatten().any(|a| a.id == addon_id)
    }

    pub fn selected_variants(&self) -> impl Iterator<Item = &VariantOption> {
        self.variants.values().flatten()
    }

    pub fn selected_addons(&self) -> impl Iterator<Item = &Addon> {
        self.addons.values().flatten()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
