//! Logging setup.
use crate::event::{Directions, InputEvent};
use crate::multiplexer::EventSource;
use std::sync::Once;

static ONCE_INIT: Once = Once::new();

/// Installs `env_logger`. `RUST_LOG` overrides the default `info` level.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init() {
    ONCE_INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        let _ = env_logger::Builder::from_env(env)
            .format_target(false)
            .try_init();
    });
}

/// Passes events through, logging each one at debug level.
pub struct Logged<S> {
    inner: S,
}

impl<S: EventSource> Logged<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: EventSource> EventSource for Logged<S> {
    fn try_next(&mut self) -> Option<InputEvent> {
        let event = self.inner.try_next()?;
        match event.selection {
            Some(digit) => log::debug!("[input] {:?} {digit} from {}", event.kind, event.source),
            None => log::debug!("[input] {:?} from {}", event.kind, event.source),
        }
        Some(event)
    }

    fn held(&self) -> Directions {
        self.inner.held()
    }
}
