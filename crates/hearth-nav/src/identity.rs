use serde::{Deserialize, Serialize};

/// The local user's identity as seen by the navigation panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Account number (hex-encoded public key).
    pub number: String,
    pub display_name: Option<String>,
    pub avatar_path: Option<String>,
    /// Whether a long-term signing key pair exists on this device.
    pub has_signing_key_pair: bool,
}

impl UserIdentity {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            display_name: None,
            avatar_path: None,
            has_signing_key_pair: false,
        }
    }

    /// Saved display name, or the account number when none is set.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.number,
        }
    }
}
