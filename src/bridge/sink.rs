use super::registry::TaskState;
use super::Shared;
use crate::model::ImageResult;
use std::fmt;
use std::sync::{Arc, Weak};

/// The one-shot completion endpoint handed to an adapter with each request.
///
/// `finish` consumes the sink, so a request completes at most once. A sink
/// dropped without finishing reports a failure for its request.
pub struct ResponseSink {
    id: String,
    shared: Weak<Shared>,
    state: Arc<TaskState>,
    delivered: bool,
}

impl ResponseSink {
    pub(crate) fn new(id: String, shared: Weak<Shared>, state: Arc<TaskState>) -> Self {
        Self {
            id,
            shared,
            state,
            delivered: false,
        }
    }

    /// Request id this sink reports for
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn finish(mut self, image: Option<ImageResult>) {
        self.deliver(image);
    }

    fn deliver(&mut self, image: Option<ImageResult>) {
        if self.delivered {
            return;
        }
        self.delivered = true;
        // Must be visible before the registry slot is released, see Bridge::request.
        self.state.mark_finished();

        match self.shared.upgrade() {
            Some(shared) => shared.finish(&self.id, image, Some(&self.state)),
            None => log::debug!("Bridge gone, dropping completion for {}", self.id),
        }
    }
}

impl Drop for ResponseSink {
    fn drop(&mut self) {
        if !self.delivered {
            log::warn!("Response for {} dropped without finishing", self.id);
            self.deliver(None);
        }
    }
}

impl fmt::Debug for ResponseSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseSink")
            .field("id", &self.id)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}
