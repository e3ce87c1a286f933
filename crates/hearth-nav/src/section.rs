//! Navigation sections of the far-left action panel.
//!
//! Everything here is data in, data out: the selector resolves sections to
//! descriptors and clicks to intents. Drawing them is the renderer's job, and
//! the selected section itself lives in the host's navigation state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::theme::{Theme, ThemePreferenceController};
use crate::UserIdentity;

/// One entry of the action panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AppSection {
    Profile,
    Message,
    Contact,
    Channel,
    Settings,
    ThemeToggle,
}

impl AppSection {
    pub const ALL: [AppSection; 6] = [
        Self::Profile,
        Self::Message,
        Self::Contact,
        Self::Channel,
        Self::Settings,
        Self::ThemeToggle,
    ];

    /// Sections shown in the panel, top to bottom. Channel is reachable
    /// through navigation but has no panel button.
    pub const PANEL: [AppSection; 5] = [
        Self::Profile,
        Self::Message,
        Self::Contact,
        Self::Settings,
        Self::ThemeToggle,
    ];

    /// Numeric code used by the host.
    pub fn code(self) -> u8 {
        match self {
            Self::Profile => 0,
            Self::Message => 1,
            Self::Contact => 2,
            Self::Channel => 3,
            Self::Settings => 4,
            Self::ThemeToggle => 5,
        }
    }
}

impl TryFrom<u8> for AppSection {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Self::ALL.into_iter().find(|s| s.code() == code).ok_or(code)
    }
}

/// Icon glyphs used by non-profile sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IconKind {
    ChatBubble,
    Users,
    Globe,
    Gear,
    Moon,
}

/// What the renderer should draw for a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "data")]
pub enum Descriptor {
    /// The user's avatar, keyed by their account number.
    Avatar {
        pubkey: String,
        label: String,
        avatar_path: Option<String>,
    },
    Icon(IconKind),
}

/// A resolved panel button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelEntry {
    pub section: AppSection,
    pub descriptor: Descriptor,
    pub is_selected: bool,
    /// Badge count; only the Message section carries one.
    pub notification_count: Option<u32>,
}

/// Result of clicking a panel button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickIntent {
    /// Open the edit-profile dialog. Navigation is unchanged.
    OpenEditProfile,
    /// The theme was flipped and applied. Navigation is unchanged.
    ThemeChanged(Theme),
    /// The host should select this section.
    Navigate(AppSection),
}

/// Resolves sections to descriptors and clicks to intents.
pub struct SectionSelector {
    theme: Arc<ThemePreferenceController>,
}

impl SectionSelector {
    pub fn new(theme: Arc<ThemePreferenceController>) -> Self {
        Self { theme }
    }

    pub fn resolve(&self, section: AppSection, identity: &UserIdentity) -> Descriptor {
        match section {
            AppSection::Profile => Descriptor::Avatar {
                pubkey: identity.number.clone(),
                label: identity.label().to_string(),
                avatar_path: identity.avatar_path.clone(),
            },
            AppSection::Message => Descriptor::Icon(IconKind::ChatBubble),
            AppSection::Contact => Descriptor::Icon(IconKind::Users),
            AppSection::Channel => Descriptor::Icon(IconKind::Globe),
            AppSection::Settings => Descriptor::Icon(IconKind::Gear),
            AppSection::ThemeToggle => Descriptor::Icon(IconKind::Moon),
        }
    }

    /// Resolve a raw host section code. Unknown codes draw the moon icon.
    pub fn resolve_code(&self, code: u8, identity: &UserIdentity) -> Descriptor {
        match AppSection::try_from(code) {
            Ok(section) => self.resolve(section, identity),
            Err(_) => Descriptor::Icon(IconKind::Moon),
        }
    }

    pub fn handle_click(&self, section: AppSection) -> ClickIntent {
        match section {
            AppSection::Profile => ClickIntent::OpenEditProfile,
            AppSection::ThemeToggle => ClickIntent::ThemeChanged(self.theme.toggle()),
            other => ClickIntent::Navigate(other),
        }
    }

    /// Build the panel for the current navigation state.
    ///
    /// Without the local user's identity record there is nothing to anchor
    /// the profile button to, so the panel renders empty.
    pub fn render(
        &self,
        selected: AppSection,
        identity: Option<&UserIdentity>,
        unread_count: u32,
    ) -> Vec<PanelEntry> {
        let Some(identity) = identity else {
            tracing::warn!("action panel: primary identity record is not set");
            return Vec::new();
        };

        AppSection::PANEL
            .into_iter()
            .map(|section| PanelEntry {
                section,
                descriptor: self.resolve(section, identity),
                is_selected: section == selected,
                notification_count: (section == AppSection::Message).then_some(unread_count),
            })
            .collect()
    }
}
