//! Background add-to-cart submission.
//!
//! A product form's submit is intercepted, its fields are posted to the
//! form's `action`, and the result is reported with a single alert.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::StorefrontError;

/// Alert shown when the server reports failure.
pub const REJECTED_MESSAGE: &str = "Could not add";

/// Alert shown when the request fails or the response is unreadable.
pub const NETWORK_ERROR_MESSAGE: &str = "Network error";

/// The submit event being intercepted.
pub trait SubmitEvent {
    /// Cancel the browser's default navigation.
    fn prevent_default(&self);
}

/// The form that originated the submit.
pub trait CartForm {
    /// Endpoint the form posts to.
    fn action(&self) -> String;

    /// Form fields in document order.
    fn fields(&self) -> Result<Vec<(String, String)>, StorefrontError>;
}

/// Modal feedback channel.
pub trait Alerts {
    /// Show a blocking message to the shopper.
    fn alert(&self, message: &str);
}

/// A cart-add request ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartAddRequest {
    /// Endpoint URL.
    pub action: String,
    /// Encoded as `application/x-www-form-urlencoded` by the transport.
    pub fields: Vec<(String, String)>,
}

/// Raw reply to a cart-add request.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl TransportResponse {
    /// Create a new response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Check if the response was successful (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends cart-add requests.
#[async_trait(?Send)]
pub trait CartTransport {
    /// POST the request's fields to its action URL.
    async fn post_form(&self, request: &CartAddRequest)
        -> Result<TransportResponse, StorefrontError>;
}

/// JSON body of a cart-add reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartAddResponse {
    /// Whether the item was added.
    pub ok: bool,
    /// Items in the cart after the add.
    #[serde(default)]
    pub count: Option<i64>,
}

/// What happened to one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartOutcome {
    /// Item added; `count` is the new cart size.
    Added { count: i64 },
    /// Server answered but refused.
    Rejected,
    /// Request failed or the reply was unreadable.
    Failed,
}

impl CartOutcome {
    /// Classify a response body.
    ///
    /// The status code is deliberately not consulted: the server answers an
    /// unknown item with 404 and `{"ok": false}`, which is a refusal.
    pub fn from_body(body: &[u8]) -> Self {
        match serde_json::from_slice::<CartAddResponse>(body) {
            Ok(CartAddResponse {
                ok: true,
                count: Some(count),
            }) => Self::Added { count },
            Ok(CartAddResponse { ok: true, count: None }) => {
                warn!("cart add reply has no count");
                Self::Failed
            }
            Ok(CartAddResponse { ok: false, .. }) => Self::Rejected,
            Err(e) => {
                warn!(error = %e, "cart add reply is not valid JSON");
                Self::Failed
            }
        }
    }

    /// Text shown to the shopper.
    pub fn message(&self) -> String {
        match self {
            Self::Added { count } => format!("Added to cart! Items: {}", count),
            Self::Rejected => REJECTED_MESSAGE.to_string(),
            Self::Failed => NETWORK_ERROR_MESSAGE.to_string(),
        }
    }
}

/// Intercepts product form submits and posts them in the background.
///
/// There is no duplicate-submit guard: two submits send two requests.
pub struct CartSubmitter<T, A> {
    transport: T,
    alerts: A,
}

impl<T: CartTransport, A: Alerts> CartSubmitter<T, A> {
    /// Create a submitter.
    pub fn new(transport: T, alerts: A) -> Self {
        Self { transport, alerts }
    }

    /// Cancel navigation and capture the form's fields.
    pub fn intercept(
        &self,
        event: &impl SubmitEvent,
        form: &impl CartForm,
    ) -> Result<CartAddRequest, StorefrontError> {
        event.prevent_default();
        Ok(CartAddRequest {
            action: form.action(),
            fields: form.fields()?,
        })
    }

    /// Send the request and alert the result.
    pub async fn submit(&self, request: &CartAddRequest) -> CartOutcome {
        debug!(action = %request.action, fields = request.fields.len(), "posting cart add");

        let outcome = match self.transport.post_form(request).await {
            Ok(response) => {
                debug!(
                    status = response.status,
                    success = response.is_success(),
                    "cart add answered"
                );
                CartOutcome::from_body(&response.body)
            }
            Err(e) => {
                warn!(error = %e, action = %request.action, "cart add request failed");
                CartOutcome::Failed
            }
        };

        if let CartOutcome::Added { count } = outcome {
            info!(count, "item added to cart");
        }

        self.alerts.alert(&outcome.message());
        outcome
    }

    /// Finish a submit whose event was already intercepted.
    ///
    /// A form that could not be read still produces exactly one alert.
    pub async fn complete(
        &self,
        intercepted: Result<CartAddRequest, StorefrontError>,
    ) -> CartOutcome {
        match intercepted {
            Ok(request) => self.submit(&request).await,
            Err(e) => {
                warn!(error = %e, "could not read cart form");
                self.alerts.alert(NETWORK_ERROR_MESSAGE);
                CartOutcome::Failed
            }
        }
    }

    /// Intercept and submit in one step.
    pub async fn handle_submit(
        &self,
        event: &impl SubmitEvent,
        form: &impl CartForm,
    ) -> CartOutcome {
        self.complete(self.intercept(event, form)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingAlerts, ScriptedTransport, TestForm, TestSubmitEvent};
    use futures::executor::block_on;

    fn form() -> TestForm {
        TestForm::new("/cart/add", &[("item_id", "12")])
    }

    // === Outcome Classification ===

    #[test]
    fn test_outcome_added() {
        let outcome = CartOutcome::from_body(br#"{"ok":true,"count":3}"#);
        assert_eq!(outcome, CartOutcome::Added { count: 3 });
        assert_eq!(outcome.message(), "Added to cart! Items: 3");
    }

    #[test]
    fn test_outcome_rejected() {
        let outcome = CartOutcome::from_body(br#"{"ok":false}"#);
        assert_eq!(outcome, CartOutcome::Rejected);
        assert_eq!(outcome.message(), "Could not add");
    }

    #[test]
    fn test_outcome_malformed() {
        assert_eq!(CartOutcome::from_body(b"<html>"), CartOutcome::Failed);
        assert_eq!(CartOutcome::from_body(br#"{"count":3}"#), CartOutcome::Failed);
        assert_eq!(CartOutcome::from_body(br#"{"ok":true}"#), CartOutcome::Failed);
    }

    // === Submission ===

    #[test]
    fn test_submit_success_alerts_count_once() {
        let alerts = RecordingAlerts::default();
        let transport = ScriptedTransport::replying(200, r#"{"ok":true,"count":5}"#);
        let submitter = CartSubmitter::new(transport.clone(), alerts.clone());
        let event = TestSubmitEvent::default();

        let outcome = block_on(submitter.handle_submit(&event, &form()));

        assert_eq!(outcome, CartOutcome::Added { count: 5 });
        assert_eq!(alerts.messages(), vec!["Added to cart! Items: 5"]);
        assert!(event.default_prevented());
    }

    #[test]
    fn test_submit_posts_form_fields_to_action() {
        let transport = ScriptedTransport::replying(200, r#"{"ok":true,"count":1}"#);
        let submitter = CartSubmitter::new(transport.clone(), RecordingAlerts::default());

        block_on(submitter.handle_submit(&TestSubmitEvent::default(), &form()));

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].action, "/cart/add");
        assert_eq!(
            sent[0].fields,
            vec![("item_id".to_string(), "12".to_string())]
        );
    }

    #[test]
    fn test_submit_not_found_is_rejection() {
        let alerts = RecordingAlerts::default();
        let transport = ScriptedTransport::replying(404, r#"{"ok":false}"#);
        let submitter = CartSubmitter::new(transport, alerts.clone());

        let outcome = block_on(submitter.handle_submit(&TestSubmitEvent::default(), &form()));

        assert_eq!(outcome, CartOutcome::Rejected);
        assert_eq!(alerts.messages(), vec!["Could not add"]);
    }

    #[test]
    fn test_submit_transport_failure_alerts_network_error() {
        let alerts = RecordingAlerts::default();
        let transport = ScriptedTransport::failing("connection refused");
        let submitter = CartSubmitter::new(transport, alerts.clone());
        let event = TestSubmitEvent::default();

        let outcome = block_on(submitter.handle_submit(&event, &form()));

        assert_eq!(outcome, CartOutcome::Failed);
        assert_eq!(alerts.messages(), vec!["Network error"]);
        assert!(event.default_prevented());
    }

    #[test]
    fn test_submit_malformed_reply_alerts_network_error() {
        let alerts = RecordingAlerts::default();
        let transport = ScriptedTransport::replying(500, "Internal Server Error");
        let submitter = CartSubmitter::new(transport, alerts.clone());

        block_on(submitter.handle_submit(&TestSubmitEvent::default(), &form()));

        assert_eq!(alerts.messages(), vec!["Network error"]);
    }

    #[test]
    fn test_unreadable_form_alerts_once() {
        let alerts = RecordingAlerts::default();
        let transport = ScriptedTransport::replying(200, r#"{"ok":true,"count":1}"#);
        let submitter = CartSubmitter::new(transport.clone(), alerts.clone());
        let event = TestSubmitEvent::default();

        let outcome = block_on(submitter.handle_submit(&event, &TestForm::unreadable("/cart/add")));

        assert_eq!(outcome, CartOutcome::Failed);
        assert_eq!(alerts.messages(), vec!["Network error"]);
        assert!(transport.requests().is_empty());
        assert!(event.default_prevented());
    }

    #[test]
    fn test_navigation_cancelled_once_before_sending() {
        let transport = ScriptedTransport::replying(200, r#"{"ok":true,"count":1}"#);
        let submitter = CartSubmitter::new(transport.clone(), RecordingAlerts::default());
        let event = TestSubmitEvent::default();

        let intercepted = submitter.intercept(&event, &form());
        assert_eq!(event.prevent_count(), 1);
        assert!(transport.requests().is_empty());

        let outcome = block_on(submitter.complete(intercepted));

        assert_eq!(outcome, CartOutcome::Added { count: 1 });
        assert_eq!(event.prevent_count(), 1);
        assert_eq!(transport.requests().len(), 1);
    }

    #[test]
    fn test_complete_unreadable_form_alerts_once() {
        let alerts = RecordingAlerts::default();
        let submitter = CartSubmitter::new(ScriptedTransport::failing("unused"), alerts.clone());

        let outcome = block_on(submitter.complete(Err(StorefrontError::Dom(
            "form data unavailable".to_string(),
        ))));

        assert_eq!(outcome, CartOutcome::Failed);
        assert_eq!(alerts.messages(), vec!["Network error"]);
    }

    #[test]
    fn test_rapid_submits_send_independent_requests() {
        let alerts = RecordingAlerts::default();
        let transport = ScriptedTransport::replying(200, r#"{"ok":true,"count":2}"#);
        let submitter = CartSubmitter::new(transport.clone(), alerts.clone());

        block_on(submitter.handle_submit(&TestSubmitEvent::default(), &form()));
        block_on(submitter.handle_submit(&TestSubmitEvent::default(), &form()));

        assert_eq!(transport.requests().len(), 2);
        assert_eq!(alerts.messages().len(), 2);
    }

    #[test]
    fn test_transport_response_is_success() {
        assert!(TransportResponse::new(200, "").is_success());
        assert!(!TransportResponse::new(404, "").is_success());
    }
}
