use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::SponsorLevel;

/// Boolean-ish fields that flip without a confirmation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleField {
    /// Ads `enable_ads` ON/OFF.
    Visibility,
    /// Ads `is_bottom` placement.
    Bottom,
    /// ACTIVE/INACTIVE on banners and members.
    State,
    /// News `is_public`.
    Public,
}

impl ToggleField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "visibility" | "enable_ads" => Some(ToggleField::Visibility),
            "bottom" | "is_bottom" => Some(ToggleField::Bottom),
            "state" | "status" => Some(ToggleField::State),
            "public" | "is_public" => Some(ToggleField::Public),
            _ => None,
        }
    }
}

/// What the operator asked to do to a single row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Intent {
    Remove,
    Approve,
    Reject,
    Confirm,
    Toggle(ToggleField),
    ChangeLevel(SponsorLevel),
}

impl Intent {
    pub fn family(&self) -> ActionFamily {
        match self {
            Intent::Remove => ActionFamily::Remove,
            Intent::Approve => ActionFamily::Approve,
            Intent::Reject => ActionFamily::Reject,
            Intent::Confirm => ActionFamily::Confirm,
            Intent::Toggle(ToggleField::Visibility) => ActionFamily::ToggleVisibility,
            Intent::Toggle(ToggleField::Bottom) => ActionFamily::ToggleBottom,
            Intent::Toggle(ToggleField::State) => ActionFamily::ToggleState,
            Intent::Toggle(ToggleField::Public) => ActionFamily::TogglePublic,
            Intent::ChangeLevel(_) => ActionFamily::ChangeLevel,
        }
    }
}

/// How a successful mutation is folded back into the owning list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementClass {
    /// Row disappears and totals shift: re-query the list.
    Refetch,
    /// Row stays: patch the local copy.
    InPlace,
}

/// A named mutation with its own confirmation/loading state on each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionFamily {
    Remove,
    Approve,
    Reject,
    Confirm,
    ToggleVisibility,
    ToggleBottom,
    ToggleState,
    TogglePublic,
    ChangeLevel,
}

impl ActionFamily {
    pub fn requires_confirmation(self) -> bool {
        !matches!(
            self,
            ActionFamily::ToggleVisibility
                | ActionFamily::ToggleBottom
                | ActionFamily::ToggleState
                | ActionFamily::TogglePublic
        )
    }

    pub fn settlement(self) -> SettlementClass {
        match self {
            ActionFamily::Remove => SettlementClass::Refetch,
            _ => SettlementClass::InPlace,
        }
    }

    /// Backend action name used unless an entity overrides it.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            ActionFamily::Remove => "delete",
            ActionFamily::Approve => "approve",
            ActionFamily::Reject => "reject",
            ActionFamily::Confirm => "confirm",
            ActionFamily::ToggleVisibility => "toggle-visibility",
            ActionFamily::ToggleBottom => "toggle-bottom",
            ActionFamily::ToggleState => "toggle-state",
            ActionFamily::TogglePublic => "toggle-public",
            ActionFamily::ChangeLevel => "change-level",
        }
    }
}

impl fmt::Display for ActionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionFamily::Remove => "remove",
            ActionFamily::Approve => "approve",
            ActionFamily::Reject => "reject",
            ActionFamily::Confirm => "confirm",
            ActionFamily::ToggleVisibility => "toggle_visibility",
            ActionFamily::ToggleBottom => "toggle_bottom",
            ActionFamily::ToggleState => "toggle_state",
            ActionFamily::TogglePublic => "toggle_public",
            ActionFamily::ChangeLevel => "change_level",
        };
        f.write_str(name)
    }
}
