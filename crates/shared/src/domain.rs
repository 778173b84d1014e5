use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(EntityId);
id_newtype!(NotificationId);

/// The screens of the console, one per managed record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Ads,
    Banner,
    Listing,
    News,
    Payment,
    Vendor,
    Sponsor,
    Member,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Ads,
        EntityKind::Banner,
        EntityKind::Listing,
        EntityKind::News,
        EntityKind::Payment,
        EntityKind::Vendor,
        EntityKind::Sponsor,
        EntityKind::Member,
    ];

    /// Path segment of the backend resource.
    pub fn resource(self) -> &'static str {
        match self {
            EntityKind::Ads => "ads",
            EntityKind::Banner => "banner",
            EntityKind::Listing => "listing",
            EntityKind::News => "news",
            EntityKind::Payment => "payment",
            EntityKind::Vendor => "vendor",
            EntityKind::Sponsor => "sponsor",
            EntityKind::Member => "member",
        }
    }

    pub fn from_resource(resource: &str) -> Option<Self> {
        let resource = resource.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|kind| kind.resource() == resource)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.resource())
    }
}

/// ON/OFF switch as the backend spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Switch {
    #[default]
    On,
    Off,
}

impl Switch {
    pub fn flipped(self) -> Self {
        match self {
            Switch::On => Switch::Off,
            Switch::Off => Switch::On,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Switch::On => "ON",
            Switch::Off => "OFF",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdStatus {
    Active,
    Deleted,
}

/// Shared by banners and members: a reversible on/off lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    Active,
    Inactive,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ListingStatus {
    Pending,
    Approved,
    Rejected,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NewsStatus {
    Active,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Approved,
    Rejected,
    Deleted,
}

/// Vendors and sponsors only ever leave ACTIVE by deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PartnerStatus {
    Active,
    Deleted,
}

/// Sponsorship tier. Not an ordering: any tier may be assigned from any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SponsorLevel {
    OtherSponsors,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl SponsorLevel {
    pub const ALL: [SponsorLevel; 5] = [
        SponsorLevel::OtherSponsors,
        SponsorLevel::Silver,
        SponsorLevel::Gold,
        SponsorLevel::Platinum,
        SponsorLevel::Diamond,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SponsorLevel::OtherSponsors => "OTHER_SPONSORS",
            SponsorLevel::Silver => "SILVER",
            SponsorLevel::Gold => "GOLD",
            SponsorLevel::Platinum => "PLATINUM",
            SponsorLevel::Diamond => "DIAMOND",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw
            .trim()
            .to_ascii_uppercase()
            .replace(|c: char| c == '-' || c == ' ', "_");
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
    }
}

impl fmt::Display for SponsorLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
