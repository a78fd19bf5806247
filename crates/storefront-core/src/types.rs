//! # Domain Types
//!
//! Customer, delivery places, store locations and store feature flags.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │      Place      │   │  StoreLocation  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id?            │   │  id             │       │
//! │  │  name / email   │   │  street1, city  │   │  name           │       │
//! │  │  phone          │   │  location?  ────┼───┼─► Coordinates   │       │
//! │  │  token?         │   │                 │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────┐       │
//! │  │ StoreOptions  pickup / tips / delivery tips / cash / tax     │       │
//! │  └─────────────────────────────────────────────────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Coordinates
// =============================================================================

/// Mean Earth radius used for haversine distances.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

const METERS_PER_MILE: f64 = 1609.34;

/// Unit for [`Coordinates::distance_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    Meters,
    Kilometers,
    Miles,
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Coordinates {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters (haversine formula).
    ///
    /// ## Example
    /// ```rust
    /// use storefront_core::types::Coordinates;
    ///
    /// let ulaanbaatar = Coordinates::new(47.9184, 106.9177);
    /// let darkhan = Coordinates::new(49.4867, 105.9228);
    /// let km = ulaanbaatar.haversine_meters(&darkhan) / 1000.0;
    /// assert!((km - 189.0).abs() < 5.0);
    /// ```
    pub fn haversine_meters(&self, other: &Coordinates) -> f64 {
        let d_lat = (other.latitude - self.latitude).to_radians();
        let d_lon = (other.longitude - self.longitude).to_radians();
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + (d_lon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
        let c = 2.0 * a.sqrt().asin();

        EARTH_RADIUS_METERS * c
    }

    /// Distance in the requested unit.
    pub fn distance_to(&self, other: &Coordinates, unit: DistanceUnit) -> f64 {
        let meters = self.haversine_meters(other);
        match unit {
            DistanceUnit::Meters => meters,
            DistanceUnit::Kilometers => meters / 1000.0,
            DistanceUnit::Miles => meters / METERS_PER_MILE,
        }
    }
}

// =============================================================================
// Customer
// =============================================================================

/// The signed-in storefront customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Session token issued on login.
    #[serde(default)]
    pub token: Option<String>,
}

impl Customer {
    /// A customer counts as signed in once the backend issued an id.
    pub fn is_authenticated(&self) -> bool {
        !self.id.trim().is_empty()
    }
}

// =============================================================================
// Place
// =============================================================================

/// A delivery address.
///
/// Places picked from the map may not be saved on the backend yet, so `id`
/// is optional; quotes then go out with bare coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Place {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub street1: String,
    #[serde(default)]
    pub street2: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<Coordinates>,
}

impl Place {
    /// True when the place can receive a delivery.
    pub fn is_deliverable(&self) -> bool {
        self.id.is_some() || self.location.is_some()
    }

    /// Short label for the checkout screen.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.street1)
    }
}

// =============================================================================
// Store Location
// =============================================================================

/// A physical store that fulfils orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoreLocation {
    pub id: String,
    pub name: String,
    pub location: Coordinates,
}

/// Picks the store location closest to `destination`.
///
/// Returns `None` only when `locations` is empty.
pub fn nearest_store_location<'a>(
    locations: &'a [StoreLocation],
    destination: &Coordinates,
) -> Option<&'a StoreLocation> {
    locations.iter().min_by(|a, b| {
        a.location
            .haversine_meters(destination)
            .total_cmp(&b.location.haversine_meters(destination))
    })
}

// =============================================================================
// Store Options
// =============================================================================

/// Feature flags configured on the store.
///
/// Only the flags checkout acts on are typed; the rest of the store's
/// options are ignored on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StoreOptions {
    #[serde(default)]
    pub pickup_enabled: bool,
    #[serde(default)]
    pub tips_enabled: bool,
    #[serde(default)]
    pub delivery_tips_enabled: bool,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn store(id: &str, lat: f64, lon: f64) -> StoreLocation {
        StoreLocation {
            id: id.to_string(),
            name: id.to_string(),
            location: Coordinates::new(lat, lon),
        }
    }

    #[test]
    fn test_haversine_zero_distance() {
        let point = Coordinates::new(1.3521, 103.8198);
        assert_eq!(point.haversine_meters(&point), 0.0);
    }

    #[test]
    fn test_distance_units() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(0.0, 1.0);
        let meters = a.distance_to(&b, DistanceUnit::Meters);
        // one degree of longitude at the equator
        assert!((meters - 111_195.0).abs() < 10.0);
        assert!((a.distance_to(&b, DistanceUnit::Kilometers) - meters / 1000.0).abs() < 1e-9);
        assert!((a.distance_to(&b, DistanceUnit::Miles) - meters / 1609.34).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_store_location() {
        let stores = vec![
            store("far", 10.0, 10.0),
            store("near", 1.0, 1.0),
            store("mid", 5.0, 5.0),
        ];
        let nearest = nearest_store_location(&stores, &Coordinates::new(0.0, 0.0)).unwrap();
        assert_eq!(nearest.id, "near");
        assert!(nearest_store_location(&[], &Coordinates::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_place_deliverable() {
        let mut place = Place {
            street1: "1 Main St".to_string(),
            ..Default::default()
        };
        assert!(!place.is_deliverable());
        place.location = Some(Coordinates::new(1.0, 1.0));
        assert!(place.is_deliverable());
        assert_eq!(place.label(), "1 Main St");
        place.name = Some("Home".to_string());
        assert_eq!(place.label(), "Home");
    }

    #[test]
    fn test_customer_authenticated() {
        let customer = Customer {
            id: "customer_1".to_string(),
            name: "Bat".to_string(),
            email: None,
            phone: None,
            token: None,
        };
        assert!(customer.is_authenticated());
    }

    #[test]
    fn test_store_options_ignore_untyped_flags() {
        let json = r#"{
            "pickup_enabled": true,
            "tips_enabled": true,
            "cod_enabled": true,
            "tax_enabled": true,
            "tax_percentage": 8.5
        }"#;
        let options: StoreOptions = serde_json::from_str(json).unwrap();

        assert_eq!(
            options,
            StoreOptions {
                pickup_enabled: true,
                tips_enabled: true,
                delivery_tips_enabled: false,
            }
        );
    }
}
