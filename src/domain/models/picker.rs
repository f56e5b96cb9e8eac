//! Outcome picker lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle of the outcome picker dialog.
///
/// Normal progression is `Closed -> Loading -> Choosing -> Saving ->
/// Complete`; `Closed` is additionally reachable from any state via an
/// explicit close command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickerState {
    /// Picker is not visible.
    #[default]
    Closed,
    /// Picker is open and fetching its initial data.
    Loading,
    /// User is browsing and selecting outcomes.
    Choosing,
    /// Selection is being persisted as an alignment set.
    Saving,
    /// Save succeeded; picker shows confirmation.
    Complete,
}

impl PickerState {
    /// Stable string form, used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Loading => "loading",
            Self::Choosing => "choosing",
            Self::Saving => "saving",
            Self::Complete => "complete",
        }
    }
}
