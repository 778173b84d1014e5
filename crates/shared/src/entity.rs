//! Records mirrored from the backend and the transition table each one obeys.
//!
//! The client never mints identities or statuses of its own. The only local
//! writes are the pure transitions below, applied after the backend has
//! acknowledged the matching request.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    action::{ActionFamily, Intent, ToggleField},
    domain::{
        ActivityStatus, AdStatus, EntityId, EntityKind, ListingStatus, NewsStatus, PartnerStatus,
        PaymentStatus, SponsorLevel, Switch,
    },
    error::TransitionError,
    protocol::{BodyEncoding, RequestBody},
};

/// A row managed by one console screen.
pub trait AdminEntity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const KIND: EntityKind;

    fn id(&self) -> EntityId;

    /// Backend spelling of the current status, for messages.
    fn state_label(&self) -> String;

    /// Computes the row as it will look once `intent` has been acknowledged.
    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError>;

    /// Fields besides `id` that tell the backend the requested value.
    fn intent_fields(_next: &Self, _intent: &Intent) -> Map<String, Value> {
        Map::new()
    }

    fn endpoint(intent: &Intent) -> &'static str {
        intent.family().default_endpoint()
    }

    fn body_encoding() -> BodyEncoding {
        BodyEncoding::Json
    }

    fn mutation_body(&self, next: &Self, intent: &Intent) -> RequestBody {
        let mut fields = Map::new();
        fields.insert("id".to_string(), Value::from(self.id().0));
        fields.extend(Self::intent_fields(next, intent));
        RequestBody::from_fields(Self::body_encoding(), fields)
    }
}

fn label<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => String::from("UNKNOWN"),
    }
}

fn refuse<E: AdminEntity>(row: &E, intent: &Intent) -> TransitionError {
    TransitionError::not_allowed(E::KIND, intent.family(), row.state_label())
}

fn single(name: &str, value: impl Into<Value>) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(name.to_string(), value.into());
    fields
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ad {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_url: Option<String>,
    pub status: AdStatus,
    #[serde(default)]
    pub enable_ads: Switch,
    #[serde(default)]
    pub is_bottom: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AdminEntity for Ad {
    const KIND: EntityKind = EntityKind::Ads;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        if self.status == AdStatus::Deleted {
            return Err(refuse(self, intent));
        }
        let mut next = self.clone();
        match intent {
            Intent::Remove => next.status = AdStatus::Deleted,
            Intent::Toggle(ToggleField::Visibility) => next.enable_ads = self.enable_ads.flipped(),
            Intent::Toggle(ToggleField::Bottom) => next.is_bottom = !self.is_bottom,
            _ => return Err(refuse(self, intent)),
        }
        Ok(next)
    }

    fn intent_fields(next: &Self, intent: &Intent) -> Map<String, Value> {
        match intent {
            Intent::Toggle(ToggleField::Visibility) => {
                single("enable_ads", next.enable_ads.as_str())
            }
            Intent::Toggle(ToggleField::Bottom) => single("is_bottom", next.is_bottom),
            _ => Map::new(),
        }
    }

    fn endpoint(intent: &Intent) -> &'static str {
        match intent {
            Intent::Toggle(ToggleField::Visibility) => "enable-ads",
            Intent::Toggle(ToggleField::Bottom) => "is-bottom",
            other => other.family().default_endpoint(),
        }
    }

    // The ads endpoints predate the JSON API and still read form fields.
    fn body_encoding() -> BodyEncoding {
        BodyEncoding::Form
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// ACTIVE ⇄ INACTIVE, either of them → DELETED.
fn activity_transition<E: AdminEntity>(
    row: &E,
    status: ActivityStatus,
    intent: &Intent,
) -> Result<ActivityStatus, TransitionError> {
    match (intent, status) {
        (_, ActivityStatus::Deleted) => Err(refuse(row, intent)),
        (Intent::Remove, _) => Ok(ActivityStatus::Deleted),
        (Intent::Toggle(ToggleField::State), ActivityStatus::Active) => {
            Ok(ActivityStatus::Inactive)
        }
        (Intent::Toggle(ToggleField::State), ActivityStatus::Inactive) => {
            Ok(ActivityStatus::Active)
        }
        _ => Err(refuse(row, intent)),
    }
}

impl AdminEntity for Banner {
    const KIND: EntityKind = EntityKind::Banner;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        let status = activity_transition(self, self.status, intent)?;
        Ok(Self {
            status,
            ..self.clone()
        })
    }

    fn intent_fields(next: &Self, intent: &Intent) -> Map<String, Value> {
        match intent {
            Intent::Toggle(ToggleField::State) => single("status", label(&next.status)),
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    pub status: ListingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AdminEntity for Listing {
    const KIND: EntityKind = EntityKind::Listing;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        let status = match (intent, self.status) {
            (_, ListingStatus::Deleted) => return Err(refuse(self, intent)),
            (Intent::Remove, _) => ListingStatus::Deleted,
            (Intent::Approve, ListingStatus::Pending) => ListingStatus::Approved,
            (Intent::Reject, ListingStatus::Pending) => ListingStatus::Rejected,
            _ => return Err(refuse(self, intent)),
        };
        Ok(Self {
            status,
            ..self.clone()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct News {
    pub id: EntityId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub status: NewsStatus,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
}

impl AdminEntity for News {
    const KIND: EntityKind = EntityKind::News;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        if self.status == NewsStatus::Deleted {
            return Err(refuse(self, intent));
        }
        let mut next = self.clone();
        match intent {
            Intent::Remove => next.status = NewsStatus::Deleted,
            Intent::Toggle(ToggleField::Public) => next.is_public = !self.is_public,
            _ => return Err(refuse(self, intent)),
        }
        Ok(next)
    }

    fn intent_fields(next: &Self, intent: &Intent) -> Map<String, Value> {
        match intent {
            Intent::Toggle(ToggleField::Public) => single("is_public", next.is_public),
            _ => Map::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_name: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl AdminEntity for Payment {
    const KIND: EntityKind = EntityKind::Payment;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    // PENDING → CONFIRMED → APPROVED, REJECTED from either of the first two.
    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        use PaymentStatus::*;

        let status = match (intent, self.status) {
            (_, Deleted) => return Err(refuse(self, intent)),
            (Intent::Remove, _) => Deleted,
            (Intent::Confirm, Pending) => Confirmed,
            (Intent::Approve, Confirmed) => Approved,
            (Intent::Reject, Pending | Confirmed) => Rejected,
            _ => return Err(refuse(self, intent)),
        };
        Ok(Self {
            status,
            ..self.clone()
        })
    }
}

fn partner_transition<E: AdminEntity>(
    row: &E,
    status: PartnerStatus,
    level: SponsorLevel,
    intent: &Intent,
) -> Result<(PartnerStatus, SponsorLevel), TransitionError> {
    match (intent, status) {
        (_, PartnerStatus::Deleted) => Err(refuse(row, intent)),
        (Intent::Remove, _) => Ok((PartnerStatus::Deleted, level)),
        (Intent::ChangeLevel(requested), _) if *requested == level => {
            Err(TransitionError::Unchanged {
                kind: E::KIND,
                action: ActionFamily::ChangeLevel,
            })
        }
        (Intent::ChangeLevel(requested), _) => Ok((status, *requested)),
        _ => Err(refuse(row, intent)),
    }
}

fn level_fields(level: SponsorLevel, intent: &Intent) -> Map<String, Value> {
    match intent {
        Intent::ChangeLevel(_) => single("level", level.as_str()),
        _ => Map::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: EntityId,
    pub name: String,
    pub level: SponsorLevel,
    pub status: PartnerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
}

impl AdminEntity for Vendor {
    const KIND: EntityKind = EntityKind::Vendor;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        let (status, level) = partner_transition(self, self.status, self.level, intent)?;
        Ok(Self {
            status,
            level,
            ..self.clone()
        })
    }

    fn intent_fields(next: &Self, intent: &Intent) -> Map<String, Value> {
        level_fields(next.level, intent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    pub id: EntityId,
    pub name: String,
    pub level: SponsorLevel,
    pub status: PartnerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

impl AdminEntity for Sponsor {
    const KIND: EntityKind = EntityKind::Sponsor;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        let (status, level) = partner_transition(self, self.status, self.level, intent)?;
        Ok(Self {
            status,
            level,
            ..self.clone()
        })
    }

    fn intent_fields(next: &Self, intent: &Intent) -> Map<String, Value> {
        level_fields(next.level, intent)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: EntityId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub status: ActivityStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<DateTime<Utc>>,
}

impl AdminEntity for Member {
    const KIND: EntityKind = EntityKind::Member;

    fn id(&self) -> EntityId {
        self.id
    }

    fn state_label(&self) -> String {
        label(&self.status)
    }

    fn transition(&self, intent: &Intent) -> Result<Self, TransitionError> {
        let status = activity_transition(self, self.status, intent)?;
        Ok(Self {
            status,
            ..self.clone()
        })
    }

    fn intent_fields(next: &Self, intent: &Intent) -> Map<String, Value> {
        match intent {
            Intent::Toggle(ToggleField::State) => single("status", label(&next.status)),
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(enable_ads: Switch) -> Ad {
        Ad {
            id: EntityId(3),
            title: "Spring sale".into(),
            image_url: Some("https://cdn.example/ad.png".into()),
            link_url: None,
            status: AdStatus::Active,
            enable_ads,
            is_bottom: false,
            created_at: None,
        }
    }

    fn payment(status: PaymentStatus) -> Payment {
        Payment {
            id: EntityId(11),
            member_name: Some("alice".into()),
            amount: 120.0,
            currency: Some("USD".into()),
            status,
            created_at: None,
        }
    }

    fn sponsor(level: SponsorLevel) -> Sponsor {
        Sponsor {
            id: EntityId(5),
            name: "Acme".into(),
            level,
            status: PartnerStatus::Active,
            website: None,
        }
    }

    #[test]
    fn ad_visibility_flip_touches_only_enable_ads() {
        let before = ad(Switch::On);
        let after = before
            .transition(&Intent::Toggle(ToggleField::Visibility))
            .expect("toggle");
        assert_eq!(after.enable_ads, Switch::Off);
        assert_eq!(
            Ad {
                enable_ads: Switch::On,
                ..after.clone()
            },
            before
        );

        let back = after
            .transition(&Intent::Toggle(ToggleField::Visibility))
            .expect("toggle back");
        assert_eq!(back, before);
    }

    #[test]
    fn ad_toggles_are_form_encoded_with_new_value() {
        let before = ad(Switch::On);
        let intent = Intent::Toggle(ToggleField::Visibility);
        let after = before.transition(&intent).expect("toggle");
        let body = before.mutation_body(&after, &intent);
        assert!(matches!(body, RequestBody::Form(_)));
        assert_eq!(body.field("id").as_deref(), Some("3"));
        assert_eq!(body.field("enable_ads").as_deref(), Some("OFF"));
        assert_eq!(Ad::endpoint(&intent), "enable-ads");
        assert_eq!(Ad::endpoint(&Intent::Remove), "delete");
    }

    #[test]
    fn ads_cannot_be_approved() {
        let err = ad(Switch::On)
            .transition(&Intent::Approve)
            .expect_err("ads have no approval");
        assert!(matches!(err, TransitionError::NotAllowed { .. }));
    }

    #[test]
    fn deleted_rows_refuse_every_intent() {
        let mut row = ad(Switch::On);
        row.status = AdStatus::Deleted;
        assert!(row.transition(&Intent::Remove).is_err());
        assert!(row
            .transition(&Intent::Toggle(ToggleField::Bottom))
            .is_err());

        let row = payment(PaymentStatus::Deleted);
        assert!(row.transition(&Intent::Remove).is_err());
    }

    #[test]
    fn banner_state_toggle_is_reversible() {
        let banner = Banner {
            id: EntityId(1),
            title: "Hero".into(),
            image_url: None,
            position: Some(1),
            status: ActivityStatus::Active,
            created_at: None,
        };
        let intent = Intent::Toggle(ToggleField::State);
        let off = banner.transition(&intent).expect("deactivate");
        assert_eq!(off.status, ActivityStatus::Inactive);
        assert_eq!(
            banner.mutation_body(&off, &intent).field("status").as_deref(),
            Some("INACTIVE")
        );
        let on = off.transition(&intent).expect("reactivate");
        assert_eq!(on.status, ActivityStatus::Active);
        let removed = off.transition(&Intent::Remove).expect("remove inactive");
        assert_eq!(removed.status, ActivityStatus::Deleted);
    }

    #[test]
    fn listing_decisions_only_leave_pending() {
        let listing = Listing {
            id: EntityId(9),
            title: "Flat".into(),
            owner_name: None,
            category_id: Some(2),
            status: ListingStatus::Pending,
            created_at: None,
        };
        let approved = listing.transition(&Intent::Approve).expect("approve");
        assert_eq!(approved.status, ListingStatus::Approved);
        assert!(approved.transition(&Intent::Reject).is_err());
        assert!(approved.transition(&Intent::Approve).is_err());
        assert_eq!(
            approved.transition(&Intent::Remove).expect("remove").status,
            ListingStatus::Deleted
        );
        let rejected = listing.transition(&Intent::Reject).expect("reject");
        assert_eq!(rejected.status, ListingStatus::Rejected);
    }

    #[test]
    fn payment_chain_is_monotonic() {
        let pending = payment(PaymentStatus::Pending);
        assert!(pending.transition(&Intent::Approve).is_err());
        let confirmed = pending.transition(&Intent::Confirm).expect("confirm");
        assert_eq!(confirmed.status, PaymentStatus::Confirmed);
        assert!(confirmed.transition(&Intent::Confirm).is_err());
        let approved = confirmed.transition(&Intent::Approve).expect("approve");
        assert_eq!(approved.status, PaymentStatus::Approved);
        assert!(approved.transition(&Intent::Reject).is_err());
        assert_eq!(
            confirmed.transition(&Intent::Reject).expect("reject").status,
            PaymentStatus::Rejected
        );
        assert_eq!(
            pending.transition(&Intent::Reject).expect("reject").status,
            PaymentStatus::Rejected
        );
    }

    #[test]
    fn sponsor_level_is_not_a_progression() {
        let diamond = sponsor(SponsorLevel::Diamond);
        let silver = diamond
            .transition(&Intent::ChangeLevel(SponsorLevel::Silver))
            .expect("downgrade");
        assert_eq!(silver.level, SponsorLevel::Silver);
        let other = silver
            .transition(&Intent::ChangeLevel(SponsorLevel::OtherSponsors))
            .expect("any to any");
        assert_eq!(other.level, SponsorLevel::OtherSponsors);

        let err = silver
            .transition(&Intent::ChangeLevel(SponsorLevel::Silver))
            .expect_err("same level");
        assert!(matches!(err, TransitionError::Unchanged { .. }));

        let intent = Intent::ChangeLevel(SponsorLevel::Gold);
        let gold = silver.transition(&intent).expect("upgrade");
        let body = silver.mutation_body(&gold, &intent);
        assert!(matches!(body, RequestBody::Json(_)));
        assert_eq!(body.field("level").as_deref(), Some("GOLD"));
        assert_eq!(Sponsor::endpoint(&intent), "change-level");
    }

    #[test]
    fn news_public_flag_flips() {
        let news = News {
            id: EntityId(4),
            title: "AGM".into(),
            summary: None,
            status: NewsStatus::Active,
            is_public: false,
            published_at: None,
        };
        let public = news
            .transition(&Intent::Toggle(ToggleField::Public))
            .expect("publish");
        assert!(public.is_public);
        assert!(news
            .transition(&Intent::Toggle(ToggleField::Visibility))
            .is_err());
    }

    #[test]
    fn entities_decode_backend_payloads() {
        let raw = serde_json::json!({
            "id": 7,
            "title": "Footer ad",
            "status": "ACTIVE",
            "enable_ads": "OFF",
            "is_bottom": true,
            "created_at": "2024-03-01T10:00:00Z"
        });
        let ad: Ad = serde_json::from_value(raw).expect("ad");
        assert_eq!(ad.id, EntityId(7));
        assert_eq!(ad.enable_ads, Switch::Off);
        assert!(ad.is_bottom);

        let vendor: Vendor = serde_json::from_value(serde_json::json!({
            "id": 2,
            "name": "Caterer",
            "level": "OTHER_SPONSORS",
            "status": "ACTIVE"
        }))
        .expect("vendor");
        assert_eq!(vendor.level, SponsorLevel::OtherSponsors);
    }
}
