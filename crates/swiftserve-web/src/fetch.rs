//! Cart transport over `fetch`.

use async_trait::async_trait;
use swiftserve_core::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response, UrlSearchParams, Window};

use crate::dom::js_error;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";

/// Posts cart forms with `window.fetch`.
pub struct FetchCartTransport {
    window: Window,
}

impl FetchCartTransport {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    fn build_request(&self, request: &CartAddRequest) -> Result<Request, StorefrontError> {
        let params = UrlSearchParams::new().map_err(|e| js_error("URLSearchParams", e))?;
        for (name, value) in &request.fields {
            params.append(name, value);
        }
        let body = String::from(params.to_string());

        let headers = Headers::new().map_err(|e| js_error("Headers", e))?;
        headers
            .set("Content-Type", FORM_CONTENT_TYPE)
            .map_err(|e| js_error("Headers.set", e))?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&JsValue::from_str(&body));

        Request::new_with_str_and_init(&request.action, &init)
            .map_err(|e| StorefrontError::Transport(format!("{:?}", e)))
    }
}

#[async_trait(?Send)]
impl CartTransport for FetchCartTransport {
    async fn post_form(
        &self,
        request: &CartAddRequest,
    ) -> Result<TransportResponse, StorefrontError> {
        let request = self.build_request(request)?;

        let response: Response = JsFuture::from(self.window.fetch_with_request(&request))
            .await
            .map_err(|e| StorefrontError::Transport(format!("{:?}", e)))?
            .dyn_into()
            .map_err(|_| StorefrontError::Transport("fetch did not return a Response".to_string()))?;

        let text = response
            .text()
            .map_err(|e| StorefrontError::Transport(format!("{:?}", e)))?;
        let body = JsFuture::from(text)
            .await
            .map_err(|e| StorefrontError::Transport(format!("{:?}", e)))?
            .as_string()
            .unwrap_or_default();

        Ok(TransportResponse::new(response.status(), body))
    }
}
