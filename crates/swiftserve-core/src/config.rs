//! Page configuration.
//!
//! Every field has a default matching the markup the storefront templates
//! render, so a page without a configuration block behaves the same as one
//! with `{}`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::StorefrontError;
use crate::logging::{LogFormat, LogLevel};
use crate::reconnect::ReconnectPolicy;

/// Id of the `<script type="application/json">` element holding overrides.
pub const CONFIG_ELEMENT_ID: &str = "swiftserve-config";

/// Configuration for the storefront page handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Selector matching product cards.
    pub card_selector: String,
    /// Selector for the preview video inside a card.
    pub video_selector: String,
    /// Class added to a card while its preview plays.
    pub playing_class: String,
    /// Selector for the order-detail region.
    pub order_detail_selector: String,
    /// Attribute on the order-detail region carrying the order id.
    pub order_id_attribute: String,
    /// Id of the element showing the order status text.
    pub status_element_id: String,
    /// Class given to notification banners.
    pub banner_class: String,
    /// How long a banner stays on the page, in milliseconds.
    pub banner_lifetime_ms: u64,
    /// Maximum banners visible at once. `None` leaves them unbounded.
    pub max_banners: Option<usize>,
    /// Path of the push endpoint on the page's origin.
    pub socket_path: String,
    /// Ask the server to add us to the displayed order's room.
    pub join_order_room: bool,
    /// Reconnection policy for the push channel.
    pub reconnect: ReconnectPolicy,
    /// Minimum level written to the console.
    pub log_level: LogLevel,
    /// Console log format.
    pub log_format: LogFormat,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            card_selector: ".item-card".to_string(),
            video_selector: ".item-video".to_string(),
            playing_class: "playing".to_string(),
            order_detail_selector: "[data-order-id]".to_string(),
            order_id_attribute: "data-order-id".to_string(),
            status_element_id: "order-status".to_string(),
            banner_class: "flash-live".to_string(),
            banner_lifetime_ms: 4000,
            max_banners: None,
            socket_path: "/socket.io/".to_string(),
            join_order_room: true,
            reconnect: ReconnectPolicy::default(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Human,
        }
    }
}

impl StorefrontConfig {
    /// Parse configuration overrides from JSON.
    ///
    /// Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, StorefrontError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a page given the text of its config element.
    ///
    /// No element means defaults. Text that fails to parse or validate also
    /// falls back to defaults; the error is returned so the caller can report
    /// it once logging is installed.
    pub fn from_page(raw: Option<&str>) -> (Self, Option<StorefrontError>) {
        match raw.map(Self::from_json) {
            None => (Self::default(), None),
            Some(Ok(config)) => (config, None),
            Some(Err(e)) => (Self::default(), Some(e)),
        }
    }

    /// Check values that deserialize fine but make no sense.
    pub fn validate(&self) -> Result<(), StorefrontError> {
        if self.max_banners == Some(0) {
            return Err(StorefrontError::Config(
                "max_banners must be at least 1".to_string(),
            ));
        }
        if !self.socket_path.starts_with('/') {
            return Err(StorefrontError::Config(format!(
                "socket_path must be absolute: {}",
                self.socket_path
            )));
        }
        if self.card_selector.trim().is_empty() {
            return Err(StorefrontError::Config(
                "card_selector must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Banner lifetime as a duration.
    pub fn banner_lifetime(&self) -> Duration {
        Duration::from_millis(self.banner_lifetime_ms)
    }

    /// Set the banner lifetime.
    pub fn with_banner_lifetime(mut self, lifetime: Duration) -> Self {
        self.banner_lifetime_ms = lifetime.as_millis() as u64;
        self
    }

    /// Cap the number of visible banners.
    pub fn with_max_banners(mut self, max: usize) -> Self {
        self.max_banners = Some(max);
        self
    }

    /// Set the push endpoint path.
    pub fn with_socket_path(mut self, path: impl Into<String>) -> Self {
        self.socket_path = path.into();
        self
    }

    /// Set the minimum console log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }
}
