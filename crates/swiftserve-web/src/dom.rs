//! DOM implementations of the page traits.

use js_sys::Array;
use swiftserve_core::prelude::*;
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    Document, Element, Event, EventTarget, FormData, HtmlFormElement, HtmlMediaElement, Window,
};

/// Wrap a JavaScript exception.
pub(crate) fn js_error(context: &str, value: JsValue) -> StorefrontError {
    let detail = value
        .as_string()
        .or_else(|| {
            value
                .dyn_ref::<js_sys::Error>()
                .map(|e| String::from(e.message()))
        })
        .unwrap_or_else(|| format!("{:?}", value));
    StorefrontError::Dom(format!("{}: {}", context, detail))
}

/// Every element matching `selector`, in document order.
pub fn query_all(document: &Document, selector: &str) -> Result<Vec<Element>, StorefrontError> {
    let nodes = document
        .query_selector_all(selector)
        .map_err(|e| js_error("querySelectorAll", e))?;

    Ok((0..nodes.length())
        .filter_map(|i| nodes.get(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect())
}

/// Attach a listener that lives as long as the page.
pub fn listen(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut() + 'static,
) -> Result<(), StorefrontError> {
    let closure = Closure::<dyn FnMut()>::new(handler);
    target
        .add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
        .map_err(|e| js_error("addEventListener", e))?;
    closure.forget();
    Ok(())
}

// === Preview ===

/// A `<video>` inside a product card.
pub struct WebVideo(HtmlMediaElement);

impl PreviewVideo for WebVideo {
    fn set_current_time(&self, seconds: f64) {
        self.0.set_current_time(seconds);
    }

    fn play(&self) -> Result<(), StorefrontError> {
        let promise = self.0.play().map_err(|e| js_error("play", e))?;
        spawn_local(async move {
            if let Err(e) = JsFuture::from(promise).await {
                debug!(error = ?e, "preview autoplay rejected");
            }
        });
        Ok(())
    }

    fn pause(&self) -> Result<(), StorefrontError> {
        self.0.pause().map_err(|e| js_error("pause", e))
    }
}

/// A product card element.
pub struct WebCard {
    element: Element,
    video_selector: String,
}

impl WebCard {
    pub fn new(element: Element, video_selector: &str) -> Self {
        Self {
            element,
            video_selector: video_selector.to_string(),
        }
    }

    pub fn element(&self) -> &Element {
        &self.element
    }
}

impl PreviewCard for WebCard {
    type Video = WebVideo;

    fn preview_video(&self) -> Option<WebVideo> {
        self.element
            .query_selector(&self.video_selector)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlMediaElement>().ok())
            .map(WebVideo)
    }

    fn add_class(&self, class: &str) -> Result<(), StorefrontError> {
        self.element
            .class_list()
            .add_1(class)
            .map_err(|e| js_error("classList.add", e))
    }

    fn remove_class(&self, class: &str) -> Result<(), StorefrontError> {
        self.element
            .class_list()
            .remove_1(class)
            .map_err(|e| js_error("classList.remove", e))
    }
}

// === Notifications ===

/// Appends banners to `<body>`.
pub struct BodyBannerHost {
    document: Document,
    class: String,
}

impl BodyBannerHost {
    pub fn new(document: Document, class: &str) -> Self {
        Self {
            document,
            class: class.to_string(),
        }
    }
}

impl BannerHost for BodyBannerHost {
    type Mounted = Element;

    fn mount(&self, banner: &Banner) -> Result<Element, StorefrontError> {
        let body = self
            .document
            .body()
            .ok_or_else(|| StorefrontError::ElementNotFound("body".to_string()))?;

        let div = self
            .document
            .create_element("div")
            .map_err(|e| js_error("createElement", e))?;
        div.set_class_name(&self.class);

        for segment in banner.segments() {
            let node: web_sys::Node = match segment {
                BannerSegment::Text(text) => self.document.create_text_node(&text).into(),
                BannerSegment::Emphasis(text) => {
                    let bold = self
                        .document
                        .create_element("b")
                        .map_err(|e| js_error("createElement", e))?;
                    bold.set_text_content(Some(&text));
                    bold.into()
                }
            };
            div.append_child(&node)
                .map_err(|e| js_error("appendChild", e))?;
        }

        body.append_child(&div)
            .map_err(|e| js_error("appendChild", e))?;
        Ok(div)
    }

    fn unmount(&self, mounted: Element) {
        mounted.remove();
    }
}

/// The `#order-status` element.
pub struct ElementStatus(Element);

impl ElementStatus {
    pub fn new(element: Element) -> Self {
        Self(element)
    }
}

impl StatusSink for ElementStatus {
    fn set_status(&self, status: &str) {
        self.0.set_text_content(Some(status));
    }
}

/// The order id carried by the page's order-detail region, if any.
pub fn displayed_order(document: &Document, config: &StorefrontConfig) -> Option<OrderId> {
    let region = document
        .query_selector(&config.order_detail_selector)
        .ok()
        .flatten()?;
    let raw = region.get_attribute(&config.order_id_attribute)?;
    OrderId::parse_attribute(&raw)
}

/// The element showing the displayed order's status.
pub fn status_element(document: &Document, config: &StorefrontConfig) -> Option<ElementStatus> {
    document
        .get_element_by_id(&config.status_element_id)
        .map(ElementStatus::new)
}

// === Cart ===

/// `window.alert`.
pub struct WindowAlerts(Window);

impl WindowAlerts {
    pub fn new(window: Window) -> Self {
        Self(window)
    }
}

impl Alerts for WindowAlerts {
    fn alert(&self, message: &str) {
        if let Err(e) = self.0.alert_with_message(message) {
            debug!(error = ?e, "alert failed");
        }
    }
}

/// The submit event passed to `addToCart`.
pub struct WebSubmitEvent(Event);

impl WebSubmitEvent {
    pub fn new(event: Event) -> Self {
        Self(event)
    }
}

impl SubmitEvent for WebSubmitEvent {
    fn prevent_default(&self) {
        self.0.prevent_default();
    }
}

/// The product form passed to `addToCart`.
pub struct WebForm(HtmlFormElement);

impl WebForm {
    pub fn new(form: HtmlFormElement) -> Self {
        Self(form)
    }
}

impl CartForm for WebForm {
    fn action(&self) -> String {
        self.0.action()
    }

    fn fields(&self) -> Result<Vec<(String, String)>, StorefrontError> {
        let data = FormData::new_with_form(&self.0).map_err(|e| js_error("FormData", e))?;
        let entries = js_sys::try_iter(&data)
            .map_err(|e| js_error("FormData entries", e))?
            .ok_or_else(|| StorefrontError::Dom("FormData is not iterable".to_string()))?;

        let mut fields = Vec::new();
        for entry in entries {
            let pair: Array = entry.map_err(|e| js_error("FormData entries", e))?.unchecked_into();
            // File inputs carry no text value
            if let (Some(name), Some(value)) = (pair.get(0).as_string(), pair.get(1).as_string()) {
                fields.push((name, value));
            }
        }
        Ok(fields)
    }
}
