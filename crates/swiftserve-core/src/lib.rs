//! Storefront page behavior for SwiftServe.
//!
//! This crate holds everything the storefront pages do in the browser,
//! written against small traits so it runs and tests natively:
//!
//! - **Cart**: background add-to-cart submission with one alert per submit
//! - **Preview**: hover-to-play product videos
//! - **Notify**: live order-status banners and in-place status sync
//! - **Channel**: the Socket.IO push session feeding notifications
//! - **Page**: deferring setup until the document is parsed
//!
//! The `swiftserve-web` crate binds these traits to the DOM.
//!
//! # Example
//!
//! ```rust,ignore
//! use swiftserve_core::prelude::*;
//!
//! let config = StorefrontConfig::from_json(raw)?;
//! let listener = NotificationListener::from_config(host, timers, &config)
//!     .with_order_detail(OrderDetail::new(OrderId::new(42), status));
//!
//! let client = PushClient::new(listener, config.reconnect.clone(), Some(OrderId::new(42)));
//! client.on_frame(frame, &socket);
//! ```

pub mod error;
pub mod ids;

pub mod cart;
pub mod channel;
pub mod codec;
pub mod config;
pub mod logging;
pub mod notify;
pub mod page;
pub mod preview;
pub mod reconnect;
pub mod timer;

#[cfg(test)]
mod test_support;

pub use error::StorefrontError;
pub use ids::OrderId;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::StorefrontError;
    pub use crate::ids::OrderId;

    // Cart
    pub use crate::cart::{
        Alerts, CartAddRequest, CartAddResponse, CartForm, CartOutcome, CartSubmitter,
        CartTransport, SubmitEvent, TransportResponse,
    };

    // Preview
    pub use crate::preview::{HoverPreview, HoverPreviewer, PreviewCard, PreviewVideo};

    // Notifications
    pub use crate::notify::{
        Banner, BannerHost, BannerSegment, NotificationListener, OrderDetail, OrderUpdate,
        StatusSink,
    };

    // Push channel
    pub use crate::channel::{
        socket_url, DisconnectReason, EventHandler, FrameSink, Heartbeat, HeartbeatCheck,
        PushClient, PushEvent, PushSession,
    };
    pub use crate::codec::ProtocolError;
    pub use crate::reconnect::{Backoff, ReconnectPolicy};

    // Runtime
    pub use crate::config::{StorefrontConfig, CONFIG_ELEMENT_ID};
    pub use crate::logging::{ConsoleLayer, LogFormat, LogLevel, LogWriter};
    pub use crate::page::{when_parsed, ReadyState};
    pub use crate::timer::Timers;
}
