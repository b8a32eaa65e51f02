//! The contract an external image adapter implements.

use crate::bridge::ResponseSink;
use std::collections::HashMap;

pub type StringMap = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Info => log::Level::Info,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
        }
    }
}

/// Everything an adapter needs to know about one image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestInfo {
    pub url: String,
    pub target_width: i32,
    pub target_height: i32,
    /// Options that change the decoded pixels
    pub parameters: StringMap,
    /// Context that does not change the decoded pixels
    pub extra_info: StringMap,
}

impl RequestInfo {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_target_size(mut self, width: i32, height: i32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_extra_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_info.insert(key.into(), value.into());
        self
    }
}

/// Returned by [`ImageAdapter::request`] so an in-flight request can be
/// abandoned.
///
/// `cancel` may be called any number of times, including after the request
/// has already finished.
pub trait RequestHandle: Send + Sync {
    fn cancel(&self);
}

/// A pluggable image provider.
///
/// `request` must return promptly; fetching and decoding happen elsewhere.
/// The adapter owns `response` until it calls [`ResponseSink::finish`]
/// exactly once, from any thread, with `Some(image)` on success or `None`
/// on failure. Dropping the sink unfinished counts as a failure.
pub trait ImageAdapter: Send + Sync {
    fn request(
        &self,
        url: &str,
        target_width: i32,
        target_height: i32,
        parameters: StringMap,
        extra_info: StringMap,
        response: ResponseSink,
    ) -> Box<dyn RequestHandle>;

    /// Best-effort diagnostics from the bridge
    fn log(&self, _level: LogLevel, _message: &str) {}
}
