pub mod error;
pub mod identity;
pub mod section;
pub mod theme;

pub use error::PreferenceError;
pub use identity::UserIdentity;
pub use section::{AppSection, ClickIntent, Descriptor, IconKind, PanelEntry, SectionSelector};
pub use theme::{Theme, ThemePreferenceController, ThemeStore};
