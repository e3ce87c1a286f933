use hearth_nav::{AppSection, ClickIntent, Theme};
use serde::Serialize;
use tokio::sync::mpsc;

/// Signals pushed from the core to the host (windowing/rendering layer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "data")]
pub enum HostEvent {
    /// No signing key pair on this device; prompt the user to reset their identity.
    ResetIdentityRequested,
    OpenEditProfile,
    ThemeChanged { theme: Theme },
    /// Select `section` in the host's navigation state.
    Navigate { section: AppSection },
}

impl From<ClickIntent> for HostEvent {
    fn from(intent: ClickIntent) -> Self {
        match intent {
            ClickIntent::OpenEditProfile => Self::OpenEditProfile,
            ClickIntent::ThemeChanged(theme) => Self::ThemeChanged { theme },
            ClickIntent::Navigate(section) => Self::Navigate { section },
        }
    }
}

pub type HostEventSender = mpsc::UnboundedSender<HostEvent>;
pub type HostEventReceiver = mpsc::UnboundedReceiver<HostEvent>;

pub fn host_channel() -> (HostEventSender, HostEventReceiver) {
    mpsc::unbounded_channel()
}
