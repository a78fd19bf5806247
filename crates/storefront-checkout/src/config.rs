//! # Checkout Configuration
//!
//! Configuration for talking to the storefront backend and the card SDK.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOREFRONT_KEY=store_abc                                           │
//! │     STOREFRONT_PAYMENT_GATEWAY=qpay                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/storefront/checkout.toml (Linux)                         │
//! │     ~/Library/Application Support/com.storefront.checkout/ (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     gateway "stripe", sheet flow, 15s requests, 30s capture            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # checkout.toml
//! [storefront]
//! key = "store_7c2b1f"
//! host = "https://api.fleetbase.io"
//! payment_gateway = "stripe"
//! prioritize_pickup = false
//!
//! [timeouts]
//! gateways_secs = 15
//! initialize_secs = 15
//! capture_secs = 30
//! quote_secs = 10
//! cart_secs = 15
//!
//! [stripe]
//! flow = "sheet"  # sheet | field
//! merchant_display_name = "Storefront"
//! merchant_country_code = "US"
//! return_url = "storefront://stripe-redirect"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{CheckoutError, CheckoutResult};

/// Default storefront API host.
pub const DEFAULT_HOST: &str = "https://api.fleetbase.io";

/// Gateway code picked when the store does not say otherwise.
pub const DEFAULT_PAYMENT_GATEWAY: &str = "stripe";

// =============================================================================
// Stripe Flow
// =============================================================================

/// How card details are collected.
///
/// ```text
/// sheet  → SDK-hosted payment sheet, customer picks a saved card
/// field  → inline card field, confirmed on "place order"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripeFlow {
    #[default]
    Sheet,
    Field,
}

impl StripeFlow {
    pub fn uses_payment_sheet(&self) -> bool {
        matches!(self, StripeFlow::Sheet)
    }
}

impl std::fmt::Display for StripeFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StripeFlow::Sheet => write!(f, "sheet"),
            StripeFlow::Field => write!(f, "field"),
        }
    }
}

impl std::str::FromStr for StripeFlow {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sheet" | "payment_sheet" => Ok(StripeFlow::Sheet),
            "field" | "card_field" => Ok(StripeFlow::Field),
            other => Err(CheckoutError::InvalidConfig(format!(
                "Unknown stripe flow: '{}'. Valid options: sheet, field",
                other
            ))),
        }
    }
}

// =============================================================================
// Storefront Settings
// =============================================================================

/// Which storefront to talk to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorefrontSettings {
    /// Public storefront key. Empty until the app is set up.
    #[serde(default)]
    pub key: String,

    /// API host.
    #[serde(default = "default_host")]
    pub host: String,

    /// Gateway code selected by default at checkout.
    #[serde(default = "default_payment_gateway")]
    pub payment_gateway: String,

    /// Start checkouts in pickup mode when the store allows it.
    #[serde(default)]
    pub prioritize_pickup: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_payment_gateway() -> String {
    DEFAULT_PAYMENT_GATEWAY.to_string()
}

impl Default for StorefrontSettings {
    fn default() -> Self {
        StorefrontSettings {
            key: String::new(),
            host: default_host(),
            payment_gateway: default_payment_gateway(),
            prioritize_pickup: false,
        }
    }
}

// =============================================================================
// Timeout Settings
// =============================================================================

/// Per-operation request timeouts, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutSettings {
    #[serde(default = "default_request_timeout")]
    pub gateways_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub initialize_secs: u64,

    /// Capture may wait on the card network. Default: 30
    #[serde(default = "default_capture_timeout")]
    pub capture_secs: u64,

    #[serde(default = "default_quote_timeout")]
    pub quote_secs: u64,

    #[serde(default = "default_request_timeout")]
    pub cart_secs: u64,
}

fn default_request_timeout() -> u64 {
    15
}
fn default_capture_timeout() -> u64 {
    30
}
fn default_quote_timeout() -> u64 {
    10
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        TimeoutSettings {
            gateways_secs: default_request_timeout(),
            initialize_secs: default_request_timeout(),
            capture_secs: default_capture_timeout(),
            quote_secs: default_quote_timeout(),
            cart_secs: default_request_timeout(),
        }
    }
}

impl TimeoutSettings {
    pub fn gateways(&self) -> Duration {
        Duration::from_secs(self.gateways_secs)
    }

    pub fn initialize(&self) -> Duration {
        Duration::from_secs(self.initialize_secs)
    }

    pub fn capture(&self) -> Duration {
        Duration::from_secs(self.capture_secs)
    }

    pub fn quote(&self) -> Duration {
        Duration::from_secs(self.quote_secs)
    }

    pub fn cart(&self) -> Duration {
        Duration::from_secs(self.cart_secs)
    }

    /// Sets every non-capture timeout at once.
    pub fn set_request_secs(&mut self, secs: u64) {
        self.gateways_secs = secs;
        self.initialize_secs = secs;
        self.quote_secs = secs;
        self.cart_secs = secs;
    }
}

// =============================================================================
// Stripe Settings
// =============================================================================

/// Card SDK settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeSettings {
    #[serde(default)]
    pub flow: StripeFlow,

    /// Name shown at the top of the payment sheet.
    #[serde(default = "default_merchant_display_name")]
    pub merchant_display_name: String,

    /// ISO 3166-1 alpha-2.
    #[serde(default = "default_merchant_country_code")]
    pub merchant_country_code: String,

    /// Deep link the SDK returns to after a bank redirect.
    #[serde(default)]
    pub return_url: Option<String>,
}

fn default_merchant_display_name() -> String {
    "Storefront".to_string()
}

fn default_merchant_country_code() -> String {
    "US".to_string()
}

impl Default for StripeSettings {
    fn default() -> Self {
        StripeSettings {
            flow: StripeFlow::default(),
            merchant_display_name: default_merchant_display_name(),
            merchant_country_code: default_merchant_country_code(),
            return_url: None,
        }
    }
}

// =============================================================================
// Main Checkout Configuration
// =============================================================================

/// Complete checkout configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutConfig {
    #[serde(default)]
    pub storefront: StorefrontSettings,

    #[serde(default)]
    pub timeouts: TimeoutSettings,

    #[serde(default)]
    pub stripe: StripeSettings,
}

impl CheckoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (checkout.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> CheckoutResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading checkout config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load checkout config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> CheckoutResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| CheckoutError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Checkout config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> CheckoutResult<()> {
        let host = self.host_url()?;
        if !matches!(host.scheme(), "http" | "https") {
            return Err(CheckoutError::InvalidUrl(format!(
                "Storefront host must use http or https, got: {}",
                self.storefront.host
            )));
        }

        if self.storefront.payment_gateway.trim().is_empty() {
            return Err(CheckoutError::InvalidConfig(
                "payment_gateway must not be empty".into(),
            ));
        }

        let timeouts = &self.timeouts;
        for (name, secs) in [
            ("gateways_secs", timeouts.gateways_secs),
            ("initialize_secs", timeouts.initialize_secs),
            ("capture_secs", timeouts.capture_secs),
            ("quote_secs", timeouts.quote_secs),
            ("cart_secs", timeouts.cart_secs),
        ] {
            if secs == 0 {
                return Err(CheckoutError::InvalidConfig(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }

        let country = &self.stripe.merchant_country_code;
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(CheckoutError::InvalidConfig(format!(
                "merchant_country_code must be two uppercase letters, got: '{}'",
                country
            )));
        }

        self.return_url()?;

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Applies overrides from any variable source.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("STOREFRONT_KEY") {
            debug!("Overriding storefront key from environment");
            self.storefront.key = key;
        }

        if let Some(host) = lookup("STOREFRONT_HOST") {
            debug!(host = %host, "Overriding storefront host from environment");
            self.storefront.host = host;
        }

        if let Some(code) = lookup("STOREFRONT_PAYMENT_GATEWAY") {
            debug!(gateway = %code, "Overriding payment gateway from environment");
            self.storefront.payment_gateway = code;
        }

        if let Some(secs) = lookup("STOREFRONT_REQUEST_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.timeouts.set_request_secs(s),
                Err(_) => warn!(value = %secs, "Ignoring invalid request timeout"),
            }
        }

        if let Some(secs) = lookup("STOREFRONT_CAPTURE_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(s) => self.timeouts.capture_secs = s,
                Err(_) => warn!(value = %secs, "Ignoring invalid capture timeout"),
            }
        }

        if let Some(flow) = lookup("STOREFRONT_STRIPE_FLOW") {
            match flow.parse() {
                Ok(parsed) => self.stripe.flow = parsed,
                Err(_) => warn!(flow = %flow, "Unknown stripe flow in environment"),
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "storefront", "checkout")
            .map(|dirs| dirs.config_dir().join("checkout.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn host_url(&self) -> CheckoutResult<Url> {
        Ok(Url::parse(&self.storefront.host)?)
    }

    pub fn return_url(&self) -> CheckoutResult<Option<Url>> {
        match self.stripe.return_url.as_deref() {
            Some(raw) => Ok(Some(Url::parse(raw)?)),
            None => Ok(None),
        }
    }

    /// False until a storefront key is configured.
    pub fn has_required_keys(&self) -> bool {
        !self.storefront.key.trim().is_empty()
    }

    pub fn payment_gateway(&self) -> &str {
        &self.storefront.payment_gateway
    }

    pub fn stripe_flow(&self) -> StripeFlow {
        self.stripe.flow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_stripe_flow_parsing() {
        assert_eq!("sheet".parse::<StripeFlow>().unwrap(), StripeFlow::Sheet);
        assert_eq!("FIELD".parse::<StripeFlow>().unwrap(), StripeFlow::Field);
        assert!("popup".parse::<StripeFlow>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = CheckoutConfig::default();
        assert_eq!(config.payment_gateway(), "stripe");
        assert_eq!(config.stripe_flow(), StripeFlow::Sheet);
        assert_eq!(config.timeouts.capture(), Duration::from_secs(30));
        assert!(!config.has_required_keys());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = CheckoutConfig::default();

        config.storefront.host = "not a url".to_string();
        assert!(config.validate().unwrap_err().is_config_error());

        config.storefront.host = "ftp://api.example.com".to_string();
        assert!(config.validate().is_err());

        config.storefront.host = "https://api.example.com".to_string();
        config.timeouts.quote_secs = 0;
        assert!(config.validate().is_err());

        config.timeouts.quote_secs = 5;
        config.stripe.merchant_country_code = "usa".to_string();
        assert!(config.validate().is_err());

        config.stripe.merchant_country_code = "MN".to_string();
        config.stripe.return_url = Some("storefront://stripe-redirect".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("STOREFRONT_KEY", "store_abc"),
            ("STOREFRONT_PAYMENT_GATEWAY", "qpay"),
            ("STOREFRONT_REQUEST_TIMEOUT_SECS", "8"),
            ("STOREFRONT_CAPTURE_TIMEOUT_SECS", "not-a-number"),
            ("STOREFRONT_STRIPE_FLOW", "field"),
        ]);

        let mut config = CheckoutConfig::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert!(config.has_required_keys());
        assert_eq!(config.payment_gateway(), "qpay");
        assert_eq!(config.timeouts.initialize_secs, 8);
        assert_eq!(config.timeouts.cart_secs, 8);
        assert_eq!(config.timeouts.capture_secs, 30);
        assert_eq!(config.stripe_flow(), StripeFlow::Field);
    }

    #[test]
    fn test_toml_serialization() {
        let config = CheckoutConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[storefront]"));
        assert!(toml_str.contains("[timeouts]"));

        let partial: CheckoutConfig = toml::from_str("[stripe]\nflow = \"field\"\n").unwrap();
        assert_eq!(partial.stripe.flow, StripeFlow::Field);
        assert_eq!(partial.storefront.host, DEFAULT_HOST);
    }
}
