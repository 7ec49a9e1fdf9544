//! Deferred callbacks on the page event loop.

use std::time::Duration;

/// Schedules a callback to run once after a delay.
///
/// Implementations run callbacks on the same thread that scheduled them.
pub trait Timers {
    /// Run `callback` once `delay` has elapsed.
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>);
}

impl<T: Timers + ?Sized> Timers for std::rc::Rc<T> {
    fn set_timeout(&self, delay: Duration, callback: Box<dyn FnOnce()>) {
        (**self).set_timeout(delay, callback)
    }
}
