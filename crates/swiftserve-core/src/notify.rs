//! Live order-status notifications.
//!
//! Each `order_update` pushed by the server becomes a banner that removes
//! itself after a fixed lifetime. When the page shows the same order, its
//! status text is updated in place.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::channel::{EventHandler, PushEvent};
use crate::config::StorefrontConfig;
use crate::error::StorefrontError;
use crate::ids::OrderId;
use crate::timer::Timers;

/// Payload of an `order_update` event.
///
/// The server may add fields such as `agent_id`; they are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub order_id: OrderId,
    pub status: String,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub order_id: OrderId,
    pub status: String,
}

impl Banner {
    /// Text before the emphasized status.
    pub fn prefix(&self) -> String {
        format!("Order #{} → ", self.order_id)
    }

    /// Full banner text.
    pub fn text(&self) -> String {
        format!("{}{}", self.prefix(), self.status)
    }

    /// What to render, in order. Every segment is plain text.
    pub fn segments(&self) -> [BannerSegment; 2] {
        [
            BannerSegment::Text(self.prefix()),
            BannerSegment::Emphasis(self.status.clone()),
        ]
    }
}

/// One piece of a rendered banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BannerSegment {
    /// Plain text.
    Text(String),
    /// Text shown in bold.
    Emphasis(String),
}

impl From<&OrderUpdate> for Banner {
    fn from(update: &OrderUpdate) -> Self {
        Self {
            order_id: update.order_id,
            status: update.status.clone(),
        }
    }
}

/// Where banners are rendered.
pub trait BannerHost {
    /// Handle to a rendered banner.
    type Mounted;

    /// Render a banner.
    fn mount(&self, banner: &Banner) -> Result<Self::Mounted, StorefrontError>;

    /// Remove a rendered banner.
    fn unmount(&self, mounted: Self::Mounted);
}

/// The on-page status text of the displayed order.
pub trait StatusSink {
    /// Replace the status text.
    fn set_status(&self, status: &str);
}

/// The order shown on the current page, resolved once at start.
pub struct OrderDetail {
    order_id: OrderId,
    status: Box<dyn StatusSink>,
}

impl OrderDetail {
    /// Create the contract for the order on display.
    pub fn new(order_id: OrderId, status: impl StatusSink + 'static) -> Self {
        Self {
            order_id,
            status: Box::new(status),
        }
    }

    /// The displayed order.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Apply an update if it concerns this order. Returns whether it did.
    pub fn apply(&self, update: &OrderUpdate) -> bool {
        if update.order_id != self.order_id {
            return false;
        }
        self.status.set_status(&update.status);
        true
    }
}

/// Live banners in mount order.
struct BannerBoard<M> {
    next_id: u64,
    live: VecDeque<(u64, M)>,
}

impl<M> BannerBoard<M> {
    fn new() -> Self {
        Self {
            next_id: 0,
            live: VecDeque::new(),
        }
    }

    fn insert(&mut self, mounted: M) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.live.push_back((id, mounted));
        id
    }

    fn remove(&mut self, id: u64) -> Option<M> {
        let index = self.live.iter().position(|(live_id, _)| *live_id == id)?;
        self.live.remove(index).map(|(_, mounted)| mounted)
    }

    fn evict_over(&mut self, max: usize) -> Option<M> {
        if self.live.len() > max {
            self.live.pop_front().map(|(_, mounted)| mounted)
        } else {
            None
        }
    }

    fn len(&self) -> usize {
        self.live.len()
    }
}

/// Renders push events for the shopper.
pub struct NotificationListener<H: BannerHost, T> {
    host: Rc<H>,
    timers: T,
    detail: Option<OrderDetail>,
    lifetime: Duration,
    max_banners: Option<usize>,
    board: Rc<RefCell<BannerBoard<H::Mounted>>>,
}

impl<H, T> NotificationListener<H, T>
where
    H: BannerHost + 'static,
    H::Mounted: 'static,
    T: Timers,
{
    /// Create a listener with a 4 second banner lifetime and no cap.
    pub fn new(host: H, timers: T) -> Self {
        Self {
            host: Rc::new(host),
            timers,
            detail: None,
            lifetime: Duration::from_millis(4000),
            max_banners: None,
            board: Rc::new(RefCell::new(BannerBoard::new())),
        }
    }

    /// Create a listener using the page configuration.
    pub fn from_config(host: H, timers: T, config: &StorefrontConfig) -> Self {
        let listener = Self::new(host, timers).with_lifetime(config.banner_lifetime());
        match config.max_banners {
            Some(max) => listener.with_max_banners(max),
            None => listener,
        }
    }

    /// Set how long banners stay visible.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Cap the number of visible banners.
    pub fn with_max_banners(mut self, max: usize) -> Self {
        self.max_banners = Some(max.max(1));
        self
    }

    /// Attach the displayed order.
    pub fn with_order_detail(mut self, detail: OrderDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// The displayed order, if the page has one.
    pub fn displayed_order(&self) -> Option<OrderId> {
        self.detail.as_ref().map(OrderDetail::order_id)
    }

    /// Number of banners currently shown.
    pub fn visible_banners(&self) -> usize {
        self.board.borrow().len()
    }

    /// Show a banner for the update and sync the displayed order.
    pub fn on_order_update(&self, update: &OrderUpdate) -> Result<(), StorefrontError> {
        info!(
            order_id = update.order_id.get(),
            status = %update.status,
            "order update received"
        );

        let shown = self.show_banner(Banner::from(update));

        if let Some(detail) = &self.detail {
            if detail.apply(update) {
                debug!(order_id = update.order_id.get(), "displayed order status updated");
            }
        }

        shown
    }

    fn show_banner(&self, banner: Banner) -> Result<(), StorefrontError> {
        let mounted = self.host.mount(&banner)?;
        let id = self.board.borrow_mut().insert(mounted);

        if let Some(max) = self.max_banners {
            loop {
                let evicted = self.board.borrow_mut().evict_over(max);
                match evicted {
                    Some(oldest) => {
                        debug!(max_banners = max, "dismissing oldest banner early");
                        self.host.unmount(oldest);
                    }
                    None => break,
                }
            }
        }

        let host = Rc::clone(&self.host);
        let board = Rc::clone(&self.board);
        self.timers.set_timeout(
            self.lifetime,
            Box::new(move || {
                let expired = board.borrow_mut().remove(id);
                if let Some(mounted) = expired {
                    host.unmount(mounted);
                }
            }),
        );

        Ok(())
    }
}

impl<H, T> EventHandler for NotificationListener<H, T>
where
    H: BannerHost + 'static,
    H::Mounted: 'static,
    T: Timers,
{
    fn handle(&self, event: PushEvent) {
        match event {
            PushEvent::Connected { sid } => {
                info!(sid = sid.as_deref().unwrap_or(""), "push channel connected");
            }
            PushEvent::OrderUpdate(update) => {
                if let Err(e) = self.on_order_update(&update) {
                    warn!(error = %e, order_id = update.order_id.get(), "could not show order update");
                }
            }
            PushEvent::ServerAck { message } => {
                debug!(message = %message, "server acknowledged connection");
            }
            PushEvent::Joined { room } => {
                debug!(room = %room, "joined order room");
            }
            PushEvent::Disconnected { reason } => {
                warn!(reason = %reason, "push channel disconnected");
            }
            PushEvent::ConnectError { message } => {
                warn!(message = %message, "push channel refused connection");
            }
            PushEvent::Other { name } => {
                debug!(event = %name, "ignoring push event");
            }
        }
    }
}
