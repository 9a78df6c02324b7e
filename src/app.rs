//! Operator application state.
//!
//! [`App`] ties the device link, the reconciler and the measuring window
//! together and turns every outcome into a [`Notification`] for the console.

use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;

use anyhow::Result;
use bodywatch_types::{AthleteProfile, Channel, RecordId};
use tracing::{info, warn};

use crate::data::duration::format_duration;
use crate::data::{MeasuringWindow, Reconciled, Reconciler};
use crate::source::{DeviceCommand, DeviceLink};

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "ok",
            Severity::Warning => "warn",
            Severity::Error => "error",
        }
    }
}

/// An operator-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notification {
    fn new(severity: Severity, title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: description.into(),
            severity,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity.label(), self.title, self.description)
    }
}

/// Main application state.
#[derive(Debug)]
pub struct App {
    pub running: bool,

    link: Option<Box<dyn DeviceLink>>,
    reconciler: Reconciler,
    window: MeasuringWindow,
    notifications: VecDeque<Notification>,
    /// Whether the current link outage was already reported.
    outage_reported: bool,
}

impl App {
    /// Create the app. `link` is `None` when no device is configured.
    pub fn new(
        link: Option<Box<dyn DeviceLink>>,
        reconciler: Reconciler,
        window: MeasuringWindow,
    ) -> Self {
        Self {
            running: true,
            link,
            reconciler,
            window,
            notifications: VecDeque::new(),
            outage_reported: false,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn window(&self) -> &MeasuringWindow {
        &self.window
    }

    /// One-line description of the device link.
    pub fn link_status(&self) -> String {
        match &self.link {
            None => "no device configured".to_string(),
            Some(link) if link.is_connected() => format!("{} (connected)", link.description()),
            Some(link) => match link.last_error() {
                Some(e) => format!("{} (disconnected: {})", link.description(), e),
                None => format!("{} (disconnected)", link.description()),
            },
        }
    }

    /// Replace the device link, e.g. after reconnecting.
    pub fn set_link(&mut self, link: Box<dyn DeviceLink>) {
        info!(link = link.description(), "device link attached");
        self.link = Some(link);
        self.outage_reported = false;
    }

    /// Ask the device to start measuring and open the measuring window.
    pub fn start_measurement(&mut self, now: Instant) -> bool {
        let Some(link) = &self.link else {
            self.notify(Severity::Error, "Device Required", "Please configure the device IP address.");
            return false;
        };
        if !link.is_connected() {
            self.notify(
                Severity::Error,
                "Device Not Connected",
                "Cannot start measurement: the device is not connected.",
            );
            return false;
        }
        if let Err(e) = link.send(&DeviceCommand::StartMeasurement) {
            self.notify(Severity::Error, "Device Not Connected", e.to_string());
            return false;
        }
        self.window.start(now);
        let length = format_duration(self.window.length());
        self.notify(
            Severity::Info,
            "Measurement Started",
            format!("Stand still on the platform; measuring for {}.", length),
        );
        true
    }

    /// Tell the device which body dimension to measure next.
    pub fn select_channel(&mut self, channel: Channel, now: Instant) -> bool {
        if channel.requires_manual_entry() {
            self.notify(
                Severity::Warning,
                "Manual Entry Required",
                format!("{} must be entered manually (ankle <cm>).", channel.label()),
            );
            return false;
        }
        if !self.window.can_select(now) {
            self.notify(
                Severity::Warning,
                "Not Ready",
                "Start a measurement and wait a moment before choosing a channel.",
            );
            return false;
        }
        let result = match &self.link {
            Some(link) if link.is_connected() => link.send(&DeviceCommand::SelectChannel(channel)),
            _ => {
                self.notify(
                    Severity::Error,
                    "Device Not Connected",
                    "Can't send command: the device is disconnected.",
                );
                return false;
            }
        };
        match result {
            Ok(()) => {
                info!(%channel, "channel selected");
                true
            }
            Err(e) => {
                self.notify(Severity::Error, "Device Not Connected", e.to_string());
                false
            }
        }
    }

    /// Record the ankle height typed in by the operator.
    pub fn manual_ankle_height(&mut self, value: f64) -> Option<RecordId> {
        if !value.is_finite() || value <= 0.0 {
            self.notify(Severity::Warning, "Invalid Value", "Enter the ankle height in cm.");
            return None;
        }
        let id = self.reconciler.manual_ankle_height(value);
        self.notify(
            Severity::Success,
            "Body Measurement Recorded",
            format!("Ankle height {} cm saved.", value),
        );
        Some(id)
    }

    /// Drop every record, locally and in the cache.
    pub fn clear_history(&mut self) -> Result<()> {
        match self.reconciler.clear_history() {
            Ok(()) => {
                self.notify(Severity::Info, "History Cleared", "All body measurements were removed.");
                Ok(())
            }
            Err(e) => {
                self.notify(Severity::Error, "Clear Failed", format!("{:#}", e));
                Err(e)
            }
        }
    }

    /// Use a new athlete profile for subsequent records.
    pub fn set_profile(&mut self, profile: AthleteProfile) {
        self.reconciler.set_profile(profile);
        self.notify(Severity::Success, "Profile Saved", "Your athlete profile has been updated.");
    }

    /// Drain pending device frames into the reconciler.
    ///
    /// Returns the number of frames processed.
    pub fn pump(&mut self) -> usize {
        let mut frames = Vec::new();
        let mut lost = None;
        if let Some(link) = self.link.as_mut() {
            while let Some(frame) = link.poll() {
                frames.push(frame);
            }
            if !link.is_connected() {
                lost = Some(link.last_error().unwrap_or_else(|| "connection lost".to_string()));
            }
        }

        for frame in &frames {
            // The window stays open so the next channel can be picked.
            if let Reconciled::Finalized(id) = self.reconciler.handle_frame(frame) {
                self.notify(
                    Severity::Success,
                    "Body Measurement Recorded",
                    format!("Measurement {} saved.", id),
                );
            }
        }

        match lost {
            Some(reason) if !self.outage_reported => {
                warn!(%reason, "device link lost");
                self.outage_reported = true;
                self.notify(Severity::Error, "Device Disconnected", reason);
            }
            Some(_) => {}
            None => self.outage_reported = false,
        }

        frames.len()
    }

    /// Expire the measuring window once its time is up.
    pub fn tick(&mut self, now: Instant) {
        if self.window.tick(now) {
            self.notify(Severity::Info, "Measuring Window Closed", "No longer measuring.");
        }
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Take every queued notification, oldest first.
    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    fn notify(&mut self, severity: Severity, title: &str, description: impl Into<String>) {
        self.notifications.push_back(Notification::new(severity, title, description));
    }
}
