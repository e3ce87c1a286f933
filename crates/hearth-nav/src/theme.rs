use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::PreferenceError;

/// Global colour theme. Persisted as `"light"` / `"dark"`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }
}

/// Persistence for the theme preference.
///
/// Implemented by the client's preference store.
pub trait ThemeStore: Send + Sync {
    /// Load the saved theme, `None` if the user never picked one.
    fn load_theme(&self) -> Result<Option<Theme>, PreferenceError>;

    /// Persist the theme.
    fn save_theme(&self, theme: Theme) -> Result<(), PreferenceError>;
}

/// Reads and writes the theme preference and pushes it into the shared
/// theme context observed by the renderer.
pub struct ThemePreferenceController {
    store: Arc<dyn ThemeStore>,
    context: watch::Sender<Theme>,
    /// Set while the applied theme has not reached the store.
    unsaved: AtomicBool,
}

impl ThemePreferenceController {
    /// Create a controller whose context starts at the persisted theme.
    pub fn new(store: Arc<dyn ThemeStore>) -> Self {
        let initial = read_persisted(store.as_ref());
        let (context, _) = watch::channel(initial);
        Self {
            store,
            context,
            unsaved: AtomicBool::new(false),
        }
    }

    /// Persisted theme, `Light` when unset or unreadable.
    ///
    /// After a failed write the applied theme is returned instead, so the
    /// preference follows what the user last picked.
    pub fn get_current(&self) -> Theme {
        if self.unsaved.load(Ordering::SeqCst) {
            return self.active();
        }
        read_persisted(self.store.as_ref())
    }

    /// Persist `theme` and apply it to the shared context.
    ///
    /// A failed write is logged; the context is updated regardless so the
    /// interface never lags behind the user's choice.
    pub fn apply(&self, theme: Theme) {
        let saved = match self.store.save_theme(theme) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, ?theme, "failed to persist theme preference");
                false
            }
        };
        self.context.send_replace(theme);
        self.unsaved.store(!saved, Ordering::SeqCst);
        tracing::debug!(?theme, "theme applied");
    }

    /// Flip between Light and Dark. Returns the theme now in effect.
    pub fn toggle(&self) -> Theme {
        let next = self.get_current().toggled();
        self.apply(next);
        next
    }

    /// Theme currently applied to the shared context.
    pub fn active(&self) -> Theme {
        *self.context.borrow()
    }

    /// Observe theme changes.
    pub fn subscribe(&self) -> watch::Receiver<Theme> {
        self.context.subscribe()
    }
}

fn read_persisted(store: &dyn ThemeStore) -> Theme {
    match store.load_theme() {
        Ok(theme) => theme.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to read theme preference, using light");
            Theme::Light
        }
    }
}
