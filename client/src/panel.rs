use std::sync::Arc;

use hearth_nav::{AppSection, ClickIntent, PanelEntry, SectionSelector, UserIdentity};

use crate::channels::{HostEvent, HostEventSender};

/// The far-left action panel: section buttons wired to the host event channel.
pub struct ActionPanel {
    selector: Arc<SectionSelector>,
    events: HostEventSender,
}

impl ActionPanel {
    pub fn new(selector: Arc<SectionSelector>, events: HostEventSender) -> Self {
        Self { selector, events }
    }

    /// Handle a button click and forward the resulting intent to the host.
    pub fn click(&self, section: AppSection) -> ClickIntent {
        let intent = self.selector.handle_click(section);
        if self.events.send(HostEvent::from(intent)).is_err() {
            tracing::debug!(?section, "host event channel closed, click dropped");
        }
        intent
    }

    pub fn render(
        &self,
        selected: AppSection,
        identity: Option<&UserIdentity>,
        unread_count: u32,
    ) -> Vec<PanelEntry> {
        self.selector.render(selected, identity, unread_count)
    }
}
