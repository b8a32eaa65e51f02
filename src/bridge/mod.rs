//! The boundary between the native caller and the installed image adapter.
//!
//! The native side calls [`Bridge::request`] and [`Bridge::cancel`]; the
//! adapter answers through the [`ResponseSink`] it was given, from any
//! thread. Pending requests live in a registry owned by the bridge, and
//! removing an entry from it is what decides whether a request ended by
//! cancellation or by completion.

mod notification;
mod params;
pub(crate) mod registry;
mod sink;

pub use notification::{FinishListener, FinishNotification};
pub use params::{decode_params, encode_params, DecodedParams, ParamsError};
pub use sink::ResponseSink;

use crate::adapter::{ImageAdapter, LogLevel, StringMap};
use crate::model::ImageResult;
use parking_lot::RwLock;
use registry::{Registry, Task, TaskState};
use std::sync::Arc;

const LOG_TAG: &str = "[AdapterImage] ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Notify the native side when a completion arrives for a request that
    /// was already cancelled.
    pub deliver_late_completions: bool,
    /// Log when a request id replaces one that is still pending
    pub warn_on_overwrite: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            deliver_late_completions: true,
            warn_on_overwrite: true,
        }
    }
}

pub(crate) struct Shared {
    registry: Registry,
    adapter: RwLock<Option<Arc<dyn ImageAdapter>>>,
    listener: Box<dyn FinishListener>,
    config: BridgeConfig,
}

impl Shared {
    fn adapter(&self) -> Option<Arc<dyn ImageAdapter>> {
        self.adapter.read().clone()
    }

    fn log(&self, level: LogLevel, message: &str) {
        log::log!(log::Level::from(level), "{}", message);
        if let Some(adapter) = self.adapter() {
            adapter.log(level, &format!("{LOG_TAG}{message}"));
        }
    }

    /// `state` ties the completion to the task it was issued for, so a stale
    /// sink cannot settle a newer request that reused its id.
    pub(crate) fn finish(
        &self,
        id: &str,
        image: Option<ImageResult>,
        state: Option<&Arc<TaskState>>,
    ) {
        let notification = FinishNotification::new(id, image);
        log::debug!(
            "Request {} finished: {} bitmaps, {} frames, {:.3}s",
            id,
            notification.bitmap_count,
            notification.frame_count,
            notification.duration
        );

        let settled = match state {
            Some(state) => self.registry.take_if(id, |task| task.is_bound_to(state)),
            None => self.registry.take(id),
        }
        .is_some();

        // A sink whose task is missing may simply have finished before the
        // task was registered; only an actual cancellation makes it late.
        let late = match state {
            Some(state) => state.is_cancelled(),
            None => !settled,
        };

        if late && !self.config.deliver_late_completions {
            self.log(
                LogLevel::Debug,
                &format!("Suppressing completion for {id}, request was cancelled"),
            );
            return;
        }

        self.listener.on_finish(notification);
    }
}

/// Tracks image requests delegated to an [`ImageAdapter`].
///
/// Dropping the bridge cancels everything still pending.
pub struct Bridge {
    shared: Arc<Shared>,
}

impl Bridge {
    pub fn new(listener: impl FinishListener + 'static) -> Self {
        Self::with_config(listener, BridgeConfig::default())
    }

    pub fn with_config(listener: impl FinishListener + 'static, config: BridgeConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: Registry::default(),
                adapter: RwLock::new(None),
                listener: Box::new(listener),
                config,
            }),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.shared.config
    }

    /// Install `adapter`, returning the one it replaces
    pub fn install_adapter(
        &self,
        adapter: Arc<dyn ImageAdapter>,
    ) -> Option<Arc<dyn ImageAdapter>> {
        log::info!("Installing image adapter");
        self.shared.adapter.write().replace(adapter)
    }

    /// Requests already handed to the removed adapter stay pending.
    pub fn remove_adapter(&self) -> Option<Arc<dyn ImageAdapter>> {
        self.shared.adapter.write().take()
    }

    pub fn has_adapter(&self) -> bool {
        self.shared.adapter.read().is_some()
    }

    /// Hand a request to the installed adapter.
    ///
    /// Returns `false` without tracking anything when no adapter is
    /// installed. Payloads that fail to decode are dropped with a warning
    /// rather than failing the request.
    pub fn request(
        &self,
        id: &str,
        url: &str,
        width: i32,
        height: i32,
        params_encoded: &str,
        info_encoded: &str,
    ) -> bool {
        let Some(adapter) = self.shared.adapter() else {
            log::debug!("No image adapter installed, rejecting request {}", id);
            return false;
        };

        let parameters = self.decode_payload(id, "parameters", params_encoded);
        let extra_info = self.decode_payload(id, "extra info", info_encoded);

        let state = Arc::new(TaskState::default());
        let sink = ResponseSink::new(id.to_owned(), Arc::downgrade(&self.shared), state.clone());
        let handle = adapter.request(url, width, height, parameters, extra_info, sink);

        let task = Task::new(url.to_owned(), handle, state.clone());
        if let Some(previous) = self.shared.registry.insert(id.to_owned(), task) {
            if self.shared.config.warn_on_overwrite {
                self.shared.log(
                    LogLevel::Warn,
                    &format!("Request {id} replaced a pending request for {}", previous.url()),
                );
            }
        }

        // The adapter may already have finished before the task was stored;
        // its notification has gone out, only the slot is left to release.
        if state.is_finished()
            && self
                .shared
                .registry
                .take_if(id, |task| task.is_bound_to(&state))
                .is_some()
        {
            log::debug!("Request {} finished before it was registered", id);
        }

        true
    }

    /// Cancel a pending request. Unknown ids are ignored.
    pub fn cancel(&self, id: &str) {
        if let Some(task) = self.shared.registry.take_cancelled(id) {
            log::debug!("Cancelling request {} for {}", id, task.url());
            task.cancel();
        }
    }

    /// Report a completion as if it came from the request's sink
    pub fn finish(&self, id: &str, image: Option<ImageResult>) {
        self.shared.finish(id, image, None);
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.shared.registry.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Cancel every pending request
    pub fn shutdown(&self) {
        let tasks = self.shared.registry.drain_cancelled();
        if !tasks.is_empty() {
            log::info!("Cancelling {} pending image requests", tasks.len());
        }
        for (_, task) in tasks {
            task.cancel();
        }
    }

    fn decode_payload(&self, id: &str, what: &str, encoded: &str) -> StringMap {
        match decode_params(encoded) {
            Ok(decoded) => {
                if !decoded.skipped.is_empty() {
                    self.shared.log(
                        LogLevel::Warn,
                        &format!("Request {id}: skipped {what} keys {:?}", decoded.skipped),
                    );
                }
                decoded.entries
            }
            Err(e) => {
                self.shared
                    .log(LogLevel::Warn, &format!("Request {id}: ignoring {what}: {e}"));
                StringMap::new()
            }
        }
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}
