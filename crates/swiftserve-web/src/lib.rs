//! Browser binding for the SwiftServe storefront pages.
//!
//! Wires the page traits from `swiftserve-core` to the DOM, `fetch`,
//! `setTimeout` and a WebSocket, and exports the entry points the
//! server-rendered templates use.

pub mod console;
pub mod dom;
pub mod fetch;
pub mod socket;
pub mod timer;

use std::rc::Rc;

use swiftserve_core::prelude::*;
use tracing::{debug, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Event, HtmlFormElement, Window};

use crate::dom::{BodyBannerHost, WebCard, WebForm, WebSubmitEvent, WindowAlerts};
use crate::fetch::FetchCartTransport;
use crate::socket::PushSocket;
use crate::timer::WindowTimers;

/// Module start: bind previews and open the push channel once the document
/// is parsed.
#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    let state = ReadyState::parse(&document.ready_state());
    let target = document.clone();
    when_parsed(
        state,
        move || init_page(&window, &document),
        move |task| {
            let callback = Closure::once_into_js(move || task());
            if let Err(e) = target
                .add_event_listener_with_callback("DOMContentLoaded", callback.unchecked_ref())
            {
                web_sys::console::warn_1(&e);
            }
        },
    );
}

fn init_page(window: &Window, document: &Document) {
    let (config, config_error) = load_config(document);
    console::init(&config);
    if let Some(e) = config_error {
        warn!(error = %e, "invalid storefront config, using defaults");
    }

    match bind_previews(&document, &config) {
        Ok(count) => debug!(previews = count, "hover previews ready"),
        Err(e) => warn!(error = %e, "could not bind hover previews"),
    }

    if let Err(e) = open_push_channel(&window, &document, &config) {
        warn!(error = %e, "push channel unavailable");
    }
}

/// Submit handler for product forms: `onsubmit="return addToCart(event, this)"`.
///
/// Always returns `false` so the browser does not navigate.
#[wasm_bindgen(js_name = addToCart)]
pub fn add_to_cart(event: Event, form: HtmlFormElement) -> bool {
    let Some(window) = web_sys::window() else {
        event.prevent_default();
        return false;
    };

    let submitter = CartSubmitter::new(
        FetchCartTransport::new(window.clone()),
        WindowAlerts::new(window),
    );
    let event = WebSubmitEvent::new(event);
    let form = WebForm::new(form);

    // Navigation is cancelled here, before yielding to the event loop
    let intercepted = submitter.intercept(&event, &form);

    spawn_local(async move {
        submitter.complete(intercepted).await;
    });

    false
}

/// Read `script#swiftserve-config`. An invalid config yields defaults plus
/// the error, reported once logging is up.
fn load_config(document: &Document) -> (StorefrontConfig, Option<StorefrontError>) {
    let raw = document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|el| el.text_content());
    StorefrontConfig::from_page(raw.as_deref())
}

fn bind_previews(document: &Document, config: &StorefrontConfig) -> Result<usize, StorefrontError> {
    let cards = dom::query_all(document, &config.card_selector)?
        .into_iter()
        .map(|element| WebCard::new(element, &config.video_selector));

    let previews = HoverPreviewer::new(config.playing_class.clone()).bind(cards);
    let count = previews.len();

    for preview in previews {
        let preview = Rc::new(preview);
        let target = preview.card().element().clone();

        let entered = Rc::clone(&preview);
        dom::listen(&target, "mouseenter", move || entered.enter())?;
        dom::listen(&target, "mouseleave", move || preview.leave())?;
    }

    Ok(count)
}

fn open_push_channel(
    window: &Window,
    document: &Document,
    config: &StorefrontConfig,
) -> Result<(), StorefrontError> {
    let location = window.location();
    let protocol = location
        .protocol()
        .map_err(|e| dom::js_error("location.protocol", e))?;
    let host = location.host().map_err(|e| dom::js_error("location.host", e))?;
    let url = socket_url(&protocol, &host, &config.socket_path);

    let timers = WindowTimers::new(window.clone());
    let mut listener = NotificationListener::from_config(
        BodyBannerHost::new(document.clone(), &config.banner_class),
        timers.clone(),
        config,
    );

    let displayed = dom::displayed_order(document, config);
    if let Some(order_id) = displayed {
        match dom::status_element(document, config) {
            Some(status) => {
                info!(order_id = order_id.get(), "tracking displayed order");
                listener = listener.with_order_detail(OrderDetail::new(order_id, status));
            }
            None => debug!(order_id = order_id.get(), "order detail has no status element"),
        }
    }

    let join_room = displayed.filter(|_| config.join_order_room);
    let client = PushClient::new(listener, config.reconnect.clone(), join_room);

    PushSocket::new(url, client, timers).connect();
    Ok(())
}
