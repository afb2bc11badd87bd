//! Typed records extracted from MouseHunt responses

use crate::schema::{FieldSet, coerce};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Profile facts from `/api/get/user/{snuid}/...`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub sn_user_id: String,
    #[serde(deserialize_with = "coerce::number")]
    pub user_id: u64,
    #[serde(deserialize_with = "coerce::number")]
    pub title_id: u64,
    pub mice: Vec<MouseCatches>,
}

impl FieldSet for Profile {
    const FIELDS: &'static [&'static str] = &["sn_user_id", "user_id", "title_id", "mice"];
}

/// Only the catch list of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseCatchList {
    pub mice: Vec<MouseCatches>,
}

impl FieldSet for MouseCatchList {
    const FIELDS: &'static [&'static str] = &["mice"];
}

/// Catch count for one mouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseCatches {
    #[serde(deserialize_with = "coerce::number")]
    pub mouse_id: u64,
    #[serde(deserialize_with = "coerce::number")]
    pub num_catches: u64,
}

/// One message on a hunter's corkboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorkboardMessage {
    pub body: String,
    #[serde(deserialize_with = "coerce::number")]
    pub user_id: u64,
    pub sn_user_id: String,
    #[serde(deserialize_with = "coerce::timestamp")]
    pub create_date: DateTime<Utc>,
}

/// Completion state of an item or mouse category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCompletion {
    pub name: String,
    #[serde(deserialize_with = "coerce::nullable_flag")]
    pub is_complete: bool,
}

/// A King's Crown badge tier with the number of mice in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrownBadgeGroup {
    pub r#type: String,
    #[serde(deserialize_with = "coerce::number")]
    pub count: u64,
}

/// Catalog entry from `/api/get/mouse/all`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MouseRef {
    #[serde(deserialize_with = "coerce::number")]
    pub mouse_id: u64,
}

/// The logged-in hunter as seen from their camp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampUser {
    #[serde(deserialize_with = "coerce::number")]
    pub user_id: u64,
    pub sn_user_id: String,
    #[serde(deserialize_with = "coerce::flag")]
    pub has_puzzle: bool,
}

/// Result of a community search by profile id
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Friend {
    pub sn_user_id: String,
}

/// Outcome of a King's Reward submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PuzzleResult {
    #[serde(deserialize_with = "coerce::flag")]
    pub success: bool,
}

/// Response of `/api/get/user/me`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Me {
    #[serde(deserialize_with = "coerce::number")]
    pub user_id: u64,
}

/// Summary line of a hunter's journal
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalSummary {
    /// Date the hunter started hunting, as displayed by the game
    pub hunting_since: String,
    /// Number of distinct loot entries in the summary
    pub loot_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{validate, validate_rows};
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_profile_from_mixed_encodings() {
        let value = json!({
            "sn_user_id": "1000001",
            "user_id": "7",
            "title_id": 3,
            "mice": [
                {"mouse_id": 1, "num_catches": "12"},
                {"mouse_id": "2", "num_catches": 0}
            ]
        });
        let profile: Profile = validate(&value).unwrap();
        assert_eq!(profile.user_id, 7);
        assert_eq!(profile.mice[0].num_catches, 12);
        assert_eq!(profile.mice[1].mouse_id, 2);
    }

    #[test]
    fn test_badge_group_type_field() {
        let rows = vec![json!({"type": "bronze", "count": "12"})];
        let groups: Vec<CrownBadgeGroup> = validate_rows(&rows).unwrap();
        assert_eq!(groups[0].r#type, "bronze");
        assert_eq!(
            serde_json::to_value(&groups[0]).unwrap(),
            json!({"type": "bronze", "count": 12})
        );
    }

    #[test]
    fn test_corkboard_message_requires_date() {
        let value = json!({"body": "hi", "user_id": 1, "sn_user_id": "2"});
        let error = validate::<CorkboardMessage>(&value).unwrap_err();
        assert_eq!(error.shape, "CorkboardMessage");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(10))]

        #[test]
        fn prop_corkboard_message_revalidates(
            body in "[ -~]{0,40}",
            user_id in any::<u64>(),
            sn_user_id in "[0-9]{1,12}",
            seconds in 0i64..4_000_000_000i64,
        ) {
            let message = CorkboardMessage {
                body,
                user_id,
                sn_user_id,
                create_date: DateTime::from_timestamp(seconds, 0).unwrap(),
            };
            let serialized = serde_json::to_value(&message).unwrap();
            prop_assert!(serialized["create_date"].as_str().unwrap().ends_with('Z'));
            let revalidated: CorkboardMessage = validate(&serialized).unwrap();
            prop_assert_eq!(revalidated, message);
        }

        #[test]
        fn prop_profile_revalidates(
            user_id in any::<u64>(),
            title_id in 0u64..20,
            mice in proptest::collection::vec((any::<u64>(), any::<u64>()), 0..20),
        ) {
            let profile = Profile {
                sn_user_id: user_id.to_string(),
                user_id,
                title_id,
                mice: mice
                    .into_iter()
                    .map(|(mouse_id, num_catches)| MouseCatches { mouse_id, num_catches })
                    .collect(),
            };
            let revalidated: Profile = validate(&serde_json::to_value(&profile).unwrap()).unwrap();
            prop_assert_eq!(revalidated, profile);
        }
    }
}
