//! Host platform surface
//!
//! The fire-and-forget operations the dispatcher relays to the platform:
//! launching the external viewer, task-stack navigation back to the caller
//! app, and toast display. Real implementations live with the platform
//! embedding; this crate ships a logging implementation for the daemon and a
//! recording stub for tests.

use std::sync::Mutex;

use tracing::info;

use super::Message;
use super::fanout::TransportError;

/// Platform operations outside the broadcast bus
pub trait HostPlatform: Send + Sync {
    /// Launch the external viewer with the given message
    fn launch_viewer(&self, message: &Message) -> Result<(), TransportError>;

    /// Put the host app behind the caller app in the task stack
    fn return_to_caller(&self);

    /// Show transient UI feedback; outcome is never reported back
    fn show_toast(&self, title: &str, message: &str);
}

/// Platform that only logs, for running the daemon off-device
#[derive(Debug, Default)]
pub struct LoggingPlatform;

impl HostPlatform for LoggingPlatform {
    fn launch_viewer(&self, message: &Message) -> Result<(), TransportError> {
        info!(action = %message.action, "Viewer launch");
        Ok(())
    }

    fn return_to_caller(&self) {
        info!("Return to caller app");
    }

    fn show_toast(&self, title: &str, message: &str) {
        info!(%title, %message, "Toast");
    }
}

/// A platform call observed by the recording stub
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    Launched(Message),
    ReturnedToCaller,
    Toast { title: String, message: String },
}

/// Records every call for assertions; optionally fails launches
#[derive(Debug, Default)]
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    fail_launches: bool,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform whose viewer launches always fail
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_launches: true,
        }
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().expect("platform recording poisoned").clone()
    }
}

impl HostPlatform for RecordingPlatform {
    fn launch_viewer(&self, message: &Message) -> Result<(), TransportError> {
        if self.fail_launches {
            return Err(TransportError::LaunchFailed("viewer unavailable".to_string()));
        }
        self.calls
            .lock()
            .expect("platform recording poisoned")
            .push(PlatformCall::Launched(message.clone()));
        Ok(())
    }

    fn return_to_caller(&self) {
        self.calls
            .lock()
            .expect("platform recording poisoned")
            .push(PlatformCall::ReturnedToCaller);
    }

    fn show_toast(&self, title: &str, message: &str) {
        self.calls.lock().expect("platform recording poisoned").push(PlatformCall::Toast {
            title: title.to_string(),
            message: message.to_string(),
        });
    }
}
