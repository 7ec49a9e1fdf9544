//! WebSocket driver for the push channel.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use swiftserve_core::prelude::*;
use tracing::{debug, info, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

use crate::dom::js_error;
use crate::timer::WindowTimers;

struct SocketSink<'a>(&'a WebSocket);

impl FrameSink for SocketSink<'_> {
    fn send_frame(&self, frame: &str) -> Result<(), StorefrontError> {
        self.0
            .send_with_str(frame)
            .map_err(|e| js_error("WebSocket.send", e))
    }
}

/// Callbacks registered on the current socket. Dropped with it.
struct Connection {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_error: Closure<dyn FnMut(Event)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

/// Owns the WebSocket and reopens it when the client asks to.
pub struct PushSocket<H> {
    url: String,
    client: PushClient<H>,
    timers: WindowTimers,
    connection: RefCell<Option<Connection>>,
}

impl<H: EventHandler + 'static> PushSocket<H> {
    pub fn new(url: String, client: PushClient<H>, timers: WindowTimers) -> Rc<Self> {
        Rc::new(Self {
            url,
            client,
            timers,
            connection: RefCell::new(None),
        })
    }

    /// Open the socket. Failures to construct it count as a dropped
    /// connection.
    pub fn connect(self: &Rc<Self>) {
        info!(url = %self.url, "opening push channel");

        match self.open() {
            Ok(connection) => {
                *self.connection.borrow_mut() = Some(connection);
            }
            Err(e) => {
                warn!(error = %e, "could not open push channel");
                self.schedule_reconnect();
            }
        }
    }

    fn open(self: &Rc<Self>) -> Result<Connection, StorefrontError> {
        let socket = WebSocket::new(&self.url).map_err(|e| js_error("WebSocket", e))?;

        let this = Rc::clone(self);
        let on_open = Closure::<dyn FnMut(Event)>::new(move |_: Event| {
            this.client.on_open();
        });

        let this = Rc::clone(self);
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            let Some(frame) = event.data().as_string() else {
                debug!("ignoring non-text push frame");
                return;
            };
            let heartbeat = {
                let connection = this.connection.borrow();
                let Some(connection) = connection.as_ref() else {
                    return;
                };
                this.client.on_frame(&frame, &SocketSink(&connection.socket))
            };
            if let Some(heartbeat) = heartbeat {
                this.arm_heartbeat(heartbeat);
            }
        });

        let on_error = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
            debug!(kind = %event.type_(), "push channel error");
        });

        let this = Rc::clone(self);
        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            debug!(code = event.code(), reason = %event.reason(), "push transport closed");
            this.schedule_reconnect();
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Connection {
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_error: on_error,
            _on_close: on_close,
        })
    }

    fn arm_heartbeat(self: &Rc<Self>, heartbeat: Heartbeat) {
        let this = Rc::clone(self);
        self.timers.set_timeout(
            heartbeat.timeout,
            Box::new(move || {
                let check = this
                    .client
                    .on_heartbeat_timeout(heartbeat.epoch, js_sys::Math::random());
                if let HeartbeatCheck::Expired { reconnect_in } = check {
                    this.drop_dead_socket(reconnect_in);
                }
            }),
        );
    }

    /// Close a socket the server stopped answering on. Runs from a timer,
    /// so the connection's closures can be dropped here.
    fn drop_dead_socket(self: &Rc<Self>, reconnect_in: Option<Duration>) {
        if let Some(dead) = self.connection.borrow_mut().take() {
            clear_handlers(&dead.socket);
            if let Err(e) = dead.socket.close() {
                debug!(error = ?e, "closing dead push socket failed");
            }
        }

        if let Some(delay) = reconnect_in {
            let this = Rc::clone(self);
            self.timers.set_timeout(delay, Box::new(move || this.connect()));
        }
    }

    fn schedule_reconnect(self: &Rc<Self>) {
        // Called from the old socket's close callback, so its closures must
        // outlive this call
        let stale = self.connection.borrow_mut().take();

        let Some(delay) = self.client.on_close(js_sys::Math::random()) else {
            *self.connection.borrow_mut() = stale;
            return;
        };

        let this = Rc::clone(self);
        self.timers.set_timeout(
            delay,
            Box::new(move || {
                if let Some(stale) = stale {
                    clear_handlers(&stale.socket);
                }
                this.connect();
            }),
        );
    }
}

fn clear_handlers(socket: &WebSocket) {
    socket.set_onopen(None);
    socket.set_onmessage(None);
    socket.set_onerror(None);
    socket.set_onclose(None);
}
