//! Grub record model
//!
//! A "Grub" is one food/restaurant entry. Records are created on the
//! client: the `fid` key is generated locally from the entry name, a
//! random suffix and the creation time, and never changes afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Timelike, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GrumbleSDKError, Result};

/// Every record carries this tag; it is the priority fallback.
pub const DEFAULT_TAG: &str = "food";

/// Length of the random component in a generated fid.
const FID_RANDOM_LEN: usize = 4;

/// One food/restaurant entry.
///
/// Field names on the wire match the remote store's node layout
/// (`users/{uid}/foodList/{fid}`), so a `Grub` round-trips through
/// both the local mirror file and the sync channel unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grub {
    /// Client-generated unique key. Immutable after creation.
    pub fid: String,
    /// Display name. Never empty.
    pub food: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Tag id -> weight. Never empty; always contains [`DEFAULT_TAG`].
    pub tags: HashMap<String, f64>,
    /// The heaviest non-default tag, used for display grouping.
    #[serde(rename = "priorityTag")]
    pub priority_tag: String,
    /// Creation instant. Set once, preserved across edits.
    pub date: DateTime<Utc>,
    /// Reference to a remotely stored image. This core never fetches it.
    #[serde(rename = "imageRef", default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

/// Form input for creating or editing a [`Grub`].
///
/// The draft carries exactly what the user typed; `fid`, `date` and
/// `priority_tag` are derived when the draft is turned into a record.
#[derive(Debug, Clone, Default)]
pub struct GrubDraft {
    pub food: String,
    pub price: Option<f64>,
    pub restaurant: Option<String>,
    pub address: Option<String>,
    pub tags: HashMap<String, f64>,
    pub image_ref: Option<String>,
}

impl GrubDraft {
    /// Create a draft with the default tag already applied.
    pub fn new(food: impl Into<String>) -> Self {
        let mut tags = HashMap::new();
        tags.insert(DEFAULT_TAG.to_string(), 1.0);
        Self {
            food: food.into(),
            tags,
            ..Default::default()
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn with_restaurant(mut self, restaurant: impl Into<String>) -> Self {
        self.restaurant = Some(restaurant.into());
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>, weight: f64) -> Self {
        self.tags.insert(tag.into(), weight);
        self
    }

    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.food.trim().is_empty() {
            return Err(GrumbleSDKError::InvalidInput(
                "grub name must not be empty".to_string(),
            ));
        }
        if self.tags.is_empty() {
            return Err(GrumbleSDKError::InvalidInput(
                "grub must carry at least one tag".to_string(),
            ));
        }
        Ok(())
    }
}

impl Grub {
    /// Build a new record from a draft: generates the fid, stamps the
    /// creation time and derives the priority tag.
    pub fn create(draft: GrubDraft) -> Result<Self> {
        draft.validate()?;
        let now = Utc::now();
        let fid = generate_fid(&draft.food, now);
        Ok(Self::assemble(fid, now, draft))
    }

    /// Rebuild a record from an edited draft. The fid and creation
    /// time of the existing record are preserved; everything else is
    /// taken from the draft and the priority tag is recomputed.
    pub fn edit(existing: &Grub, draft: GrubDraft) -> Result<Self> {
        draft.validate()?;
        Ok(Self::assemble(existing.fid.clone(), existing.date, draft))
    }

    fn assemble(fid: String, date: DateTime<Utc>, draft: GrubDraft) -> Self {
        let priority_tag = priority_tag_of(&draft.tags);
        Self {
            fid,
            food: draft.food.trim().to_string(),
            price: draft.price,
            restaurant: draft.restaurant,
            address: draft.address,
            tags: draft.tags,
            priority_tag,
            date,
            image_ref: draft.image_ref,
        }
    }

    /// Decode an untrusted channel value into a record.
    ///
    /// Missing required fields surface as a serialization error, which
    /// the event pump turns into a drop-and-log. No field access panics.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| GrumbleSDKError::Serialization(format!("malformed grub record: {}", e)))
    }

    /// Encode the record for the mirror file or the sync channel.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| GrumbleSDKError::Serialization(format!("encoding grub failed: {}", e)))
    }
}

/// Pick the heaviest tag that is not the default tag; fall back to the
/// default tag when no other tag exists.
pub fn priority_tag_of(tags: &HashMap<String, f64>) -> String {
    let mut priority: (&str, f64) = (DEFAULT_TAG, 0.0);
    for (tag, weight) in tags {
        if tag != DEFAULT_TAG && *weight > priority.1 {
            priority = (tag.as_str(), *weight);
        }
    }
    priority.0.to_string()
}

/// Generate a fid: first three characters of the trimmed, lowercased
/// name, four random alphanumerics, then hour/minute/second fragments.
fn generate_fid(food: &str, now: DateTime<Utc>) -> String {
    let prefix: String = food.trim().to_lowercase().chars().take(3).collect();
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(FID_RANDOM_LEN)
        .map(char::from)
        .collect();
    format!(
        "{}{}{}_{}_{}",
        prefix,
        suffix,
        now.hour(),
        now.minute(),
        now.second()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_generates_fid_and_defaults() {
        let grub = Grub::create(GrubDraft::new("Taco Salad")).unwrap();

        assert!(grub.fid.starts_with("tac"));
        assert_eq!(grub.food, "Taco Salad");
        assert_eq!(grub.tags.len(), 1);
        assert_eq!(grub.tags[DEFAULT_TAG], 1.0);
        assert_eq!(grub.priority_tag, DEFAULT_TAG);
        assert!(grub.price.is_none());
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let err = Grub::create(GrubDraft::new("   ")).unwrap_err();
        assert!(matches!(err, GrumbleSDKError::InvalidInput(_)));
    }

    #[test]
    fn test_create_rejects_empty_tags() {
        let mut draft = GrubDraft::new("Ramen");
        draft.tags.clear();
        let err = Grub::create(draft).unwrap_err();
        assert!(matches!(err, GrumbleSDKError::InvalidInput(_)));
    }

    #[test]
    fn test_priority_tag_prefers_heaviest_non_default() {
        let draft = GrubDraft::new("Pad Thai")
            .with_tag("noodles", 3.0)
            .with_tag("spicy", 5.0);
        let grub = Grub::create(draft).unwrap();
        assert_eq!(grub.priority_tag, "spicy");
    }

    #[test]
    fn test_edit_preserves_fid_and_date() {
        let original = Grub::create(GrubDraft::new("Burger").with_price(8.5)).unwrap();
        let edited = Grub::edit(
            &original,
            GrubDraft::new("Cheeseburger").with_price(9.5),
        )
        .unwrap();

        assert_eq!(edited.fid, original.fid);
        assert_eq!(edited.date, original.date);
        assert_eq!(edited.food, "Cheeseburger");
        assert_eq!(edited.price, Some(9.5));
    }

    #[test]
    fn test_from_value_requires_name() {
        let value = json!({
            "fid": "abc1_12_30_05",
            "tags": { "food": 1.0 },
            "priorityTag": "food",
            "date": "2020-03-21T12:30:05Z",
        });
        let err = Grub::from_value(value).unwrap_err();
        assert!(matches!(err, GrumbleSDKError::Serialization(_)));
    }

    #[test]
    fn test_value_round_trip() {
        let draft = GrubDraft::new("Pho")
            .with_restaurant("Pho 99")
            .with_address("12 Main St")
            .with_tag("soup", 2.0);
        let grub = Grub::create(draft).unwrap();

        let decoded = Grub::from_value(grub.to_value().unwrap()).unwrap();
        assert_eq!(decoded, grub);
    }

    #[test]
    fn test_fid_uses_time_fragments() {
        let at = "2020-03-21T12:30:05Z".parse().unwrap();
        let fid = generate_fid("Taco", at);
        assert!(fid.starts_with("tac"));
        assert!(fid.ends_with("12_30_5"));
        assert_eq!(fid.len(), "tac".len() + FID_RANDOM_LEN + "12_30_5".len());
    }
}
