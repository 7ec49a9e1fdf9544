//! Test doubles for the page traits.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cart::{Alerts, CartAddRequest, CartForm, CartTransport, SubmitEvent, TransportResponse};
use crate::channel::{EventHandler, FrameSink, PushEvent};
use crate::error::StorefrontError;
use crate::notify::{Banner, BannerHost, StatusSink};
use crate::preview::{PreviewCard, PreviewVideo};
use crate::timer::Timers;

// === Cart ===

#[derive(Clone, Default)]
pub struct RecordingAlerts(Rc<RefCell<Vec<String>>>);

impl RecordingAlerts {
    pub fn messages(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}

impl Alerts for RecordingAlerts {
    fn alert(&self, message: &str) {
        self.0.borrow_mut().push(message.to_string());
    }
}

#[derive(Clone)]
pub struct ScriptedTransport {
    reply: Result<(u16, String), String>,
    requests: Rc<RefCell<Vec<CartAddRequest>>>,
}

impl ScriptedTransport {
    pub fn replying(status: u16, body: &str) -> Self {
        Self {
            reply: Ok((status, body.to_string())),
            requests: Rc::default(),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            reply: Err(reason.to_string()),
            requests: Rc::default(),
        }
    }

    pub fn requests(&self) -> Vec<CartAddRequest> {
        self.requests.borrow().clone()
    }
}

#[async_trait(?Send)]
impl CartTransport for ScriptedTransport {
    async fn post_form(
        &self,
        request: &CartAddRequest,
    ) -> Result<TransportResponse, StorefrontError> {
        self.requests.borrow_mut().push(request.clone());
        match &self.reply {
            Ok((status, body)) => Ok(TransportResponse::new(*status, body.as_bytes())),
            Err(reason) => Err(StorefrontError::Transport(reason.clone())),
        }
    }
}

pub struct TestForm {
    action: String,
    fields: Option<Vec<(String, String)>>,
}

impl TestForm {
    pub fn new(action: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            action: action.to_string(),
            fields: Some(
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    pub fn unreadable(action: &str) -> Self {
        Self {
            action: action.to_string(),
            fields: None,
        }
    }
}

impl CartForm for TestForm {
    fn action(&self) -> String {
        self.action.clone()
    }

    fn fields(&self) -> Result<Vec<(String, String)>, StorefrontError> {
        self.fields
            .clone()
            .ok_or_else(|| StorefrontError::Dom("form data unavailable".to_string()))
    }
}

#[derive(Default)]
pub struct TestSubmitEvent {
    prevented: Cell<u32>,
}

impl TestSubmitEvent {
    pub fn default_prevented(&self) -> bool {
        self.prevented.get() > 0
    }

    pub fn prevent_count(&self) -> u32 {
        self.prevented.get()
    }
}

impl SubmitEvent for TestSubmitEvent {
    fn prevent_default(&self) {
        self.prevented.set(self.prevented.get() + 1);
    }
}

// === Timers ===

struct PendingTimer {
    due: Duration,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct TimerQueue {
    now: Duration,
    next_seq: u64,
    pending: Vec<PendingTimer>,
}

/// Timers that only fire when the test advances the clock.
#[derive(Clone, Default)]
pub struct ManualTimers(Rc<RefCell<TimerQueue>>);

impl ManualTimers {
    pub fn pending(&self) -> usize {
        self.0.borrow().pending.len()
    }

    /// Move the clock forward, firing due callbacks in order.
    pub fn advance(&self, by: Duration) {
        let target = self.0.borrow().now + by;
        loop {
            let next = {
                let mut queue = self.0.borrow_mut();
                let earliest = queue
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.seq))
                    .map(|(i, _)| i);
                earliest.map(|i| {
                    let timer = queue.pending.remove(i);
                    queue.now = timer.due;
                    timer
                })
            };
            match next {
                Some(timer) => (timer.callback)(),
                None => break,
            }
        }
        self.0.borrow_mut().now = target;
    }
}

impl Timers for ManualTimers {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
        let mut queue = self.0.borrow_mut();
        let due = queue.now + delay;
        let seq = queue.next_seq;
        queue.next_seq += 1;
        queue.pending.push(PendingTimer { due, seq, callback });
    }
}

// === Notifications ===

#[derive(Default)]
pub struct RecordingBannerHost {
    next_id: Cell<u64>,
    visible: RefCell<Vec<(u64, String)>>,
    mounted_total: Cell<usize>,
}

impl RecordingBannerHost {
    pub fn visible_texts(&self) -> Vec<String> {
        self.visible.borrow().iter().map(|(_, t)| t.clone()).collect()
    }

    pub fn mounted_total(&self) -> usize {
        self.mounted_total.get()
    }
}

impl BannerHost for RecordingBannerHost {
    type Mounted = u64;

    fn mount(&self, banner: &Banner) -> Result<u64, StorefrontError> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.visible.borrow_mut().push((id, banner.text()));
        self.mounted_total.set(self.mounted_total.get() + 1);
        Ok(id)
    }

    fn unmount(&self, mounted: u64) {
        self.visible.borrow_mut().retain(|(id, _)| *id != mounted);
    }
}

#[derive(Clone, Default)]
pub struct RecordingStatus(Rc<RefCell<Option<String>>>);

impl RecordingStatus {
    pub fn with_text(text: &str) -> Self {
        Self(Rc::new(RefCell::new(Some(text.to_string()))))
    }

    pub fn text(&self) -> Option<String> {
        self.0.borrow().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn set_status(&self, status: &str) {
        *self.0.borrow_mut() = Some(status.to_string());
    }
}

// === Preview ===

#[derive(Debug, Clone, PartialEq)]
pub enum VideoCall {
    SeekTo(f64),
    Play,
    Pause,
}

#[derive(Clone, Default)]
pub struct TestVideo {
    calls: Rc<RefCell<Vec<VideoCall>>>,
    reject_play: bool,
    reject_pause: bool,
}

impl TestVideo {
    pub fn rejecting() -> Self {
        Self {
            reject_play: true,
            reject_pause: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<VideoCall> {
        self.calls.borrow().clone()
    }
}

impl PreviewVideo for TestVideo {
    fn set_current_time(&self, seconds: f64) {
        self.calls.borrow_mut().push(VideoCall::SeekTo(seconds));
    }

    fn play(&self) -> Result<(), StorefrontError> {
        self.calls.borrow_mut().push(VideoCall::Play);
        if self.reject_play {
            return Err(StorefrontError::Dom("NotAllowedError".to_string()));
        }
        Ok(())
    }

    fn pause(&self) -> Result<(), StorefrontError> {
        self.calls.borrow_mut().push(VideoCall::Pause);
        if self.reject_pause {
            return Err(StorefrontError::Dom("pause failed".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct TestCard {
    video: Option<TestVideo>,
    classes: Rc<RefCell<Vec<String>>>,
}

impl TestCard {
    pub fn with_video(video: TestVideo) -> Self {
        Self {
            video: Some(video),
            classes: Rc::default(),
        }
    }

    pub fn without_video() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> Vec<String> {
        self.classes.borrow().clone()
    }
}

impl PreviewCard for TestCard {
    type Video = TestVideo;

    fn preview_video(&self) -> Option<TestVideo> {
        self.video.clone()
    }

    fn add_class(&self, class: &str) -> Result<(), StorefrontError> {
        let mut classes = self.classes.borrow_mut();
        if !classes.iter().any(|c| c == class) {
            classes.push(class.to_string());
        }
        Ok(())
    }

    fn remove_class(&self, class: &str) -> Result<(), StorefrontError> {
        self.classes.borrow_mut().retain(|c| c != class);
        Ok(())
    }
}

// === Push Channel ===

#[derive(Clone, Default)]
pub struct RecordingSink {
    frames: Rc<RefCell<Vec<String>>>,
    closed: bool,
}

impl RecordingSink {
    pub fn closed() -> Self {
        Self {
            closed: true,
            ..Default::default()
        }
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.borrow().clone()
    }
}

impl FrameSink for RecordingSink {
    fn send_frame(&self, frame: &str) -> Result<(), StorefrontError> {
        if self.closed {
            return Err(StorefrontError::NotConnected);
        }
        self.frames.borrow_mut().push(frame.to_string());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingHandler(Rc<RefCell<Vec<PushEvent>>>);

impl RecordingHandler {
    pub fn events(&self) -> Vec<PushEvent> {
        self.0.borrow().clone()
    }
}

impl EventHandler for RecordingHandler {
    fn handle(&self, event: PushEvent) {
        self.0.borrow_mut().push(event);
    }
}
