//! Achievement eligibility rules
//!
//! The rules are pure functions over validated records. [`AchievementService`]
//! fetches what each rule needs for one hunter.

use crate::client::MhClient;
use crate::error::{MhError, SchemaError};
use crate::gateway::Credentials;
use crate::path::JsonPath;
use crate::records::{CategoryCompletion, CrownBadgeGroup, MouseCatchList, MouseCatches, MouseRef};
use crate::schema::{validate, validate_rows};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Mice that never count towards completion (Leprechaun and Mobster)
pub const EXCLUDED_MOUSE_IDS: [u64; 2] = [113, 128];

/// Achievements a hunter can be checked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Achievement {
    /// Every location's mice caught
    Star,
    /// A King's Crown on every mouse
    Crown,
    /// Every item category complete
    Checkmark,
    /// Egg Master
    Egg,
}

impl Achievement {
    pub const ALL: [Achievement; 4] = [
        Achievement::Star,
        Achievement::Crown,
        Achievement::Checkmark,
        Achievement::Egg,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Achievement::Star => "star",
            Achievement::Crown => "crown",
            Achievement::Checkmark => "checkmark",
            Achievement::Egg => "egg",
        }
    }
}

impl fmt::Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name that is not one of [`Achievement::ALL`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown achievement `{0}`, expected one of star, crown, checkmark, egg")]
pub struct UnknownAchievement(pub String);

impl FromStr for Achievement {
    type Err = UnknownAchievement;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Achievement::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownAchievement(s.to_string()))
    }
}

/// King's Crown tiers and the catches each needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrownTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl CrownTier {
    pub const ALL: [CrownTier; 5] = [
        CrownTier::Bronze,
        CrownTier::Silver,
        CrownTier::Gold,
        CrownTier::Platinum,
        CrownTier::Diamond,
    ];

    /// Catches needed for this crown
    pub fn threshold(self) -> u64 {
        match self {
            CrownTier::Bronze => 10,
            CrownTier::Silver => 100,
            CrownTier::Gold => 500,
            CrownTier::Platinum => 1000,
            CrownTier::Diamond => 2500,
        }
    }
}

/// Mice holding a crown tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TierCount {
    pub count: usize,
    /// Share of eligible mice, 0 to 100
    pub percent: f64,
}

/// Crown counts per tier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrownSummary {
    /// Mice counted, excluding [`EXCLUDED_MOUSE_IDS`]
    pub eligible: usize,
    /// Every eligible mouse holds at least a bronze crown
    pub all_bronzed: bool,
    pub tiers: BTreeMap<CrownTier, TierCount>,
}

fn is_eligible(mouse_id: u64) -> bool {
    !EXCLUDED_MOUSE_IDS.contains(&mouse_id)
}

/// `true` when every category is complete
///
/// An empty listing means the page did not render the categories at all and
/// is rejected rather than read as vacuously complete.
pub fn all_categories_complete(categories: &[CategoryCompletion]) -> Result<bool, SchemaError> {
    if categories.is_empty() {
        return Err(SchemaError::new(
            "CategoryCompletion",
            "category list is empty",
        ));
    }
    Ok(categories.iter().all(|category| category.is_complete))
}

/// Catalog size without the excluded mice
pub fn crown_target(catalog: &[MouseRef]) -> usize {
    catalog
        .iter()
        .filter(|mouse| is_eligible(mouse.mouse_id))
        .count()
}

/// `true` when the crowned mice across all badge groups add up to exactly
/// the eligible catalog
pub fn is_crowned(groups: &[CrownBadgeGroup], catalog: &[MouseRef]) -> bool {
    let crowned: u64 = groups.iter().map(|group| group.count).sum();
    crowned == crown_target(catalog) as u64
}

/// `true` when every eligible mouse has at least a bronze crown
pub fn all_mice_bronzed(mice: &[MouseCatches]) -> bool {
    mice.iter()
        .filter(|mouse| is_eligible(mouse.mouse_id))
        .all(|mouse| mouse.num_catches >= CrownTier::Bronze.threshold())
}

/// Count crowns per tier over the eligible mice
pub fn crown_summary(mice: &[MouseCatches]) -> CrownSummary {
    let eligible: Vec<&MouseCatches> = mice
        .iter()
        .filter(|mouse| is_eligible(mouse.mouse_id))
        .collect();

    let tiers = CrownTier::ALL
        .into_iter()
        .map(|tier| {
            let count = eligible
                .iter()
                .filter(|mouse| mouse.num_catches >= tier.threshold())
                .count();
            let percent = if eligible.is_empty() {
                0.0
            } else {
                count as f64 / eligible.len() as f64 * 100.0
            };
            (tier, TierCount { count, percent })
        })
        .collect();

    CrownSummary {
        eligible: eligible.len(),
        all_bronzed: all_mice_bronzed(mice),
        tiers,
    }
}

fn profile_tab(tab: &str, subtab: i64) -> JsonPath {
    JsonPath::root()
        .key("tabs")
        .key(tab)
        .key("subtabs")
        .index(subtab)
}

/// Runs the achievement rules for one set of credentials
#[derive(Debug, Clone, Copy)]
pub struct AchievementService<'a> {
    client: &'a MhClient,
    credentials: &'a Credentials,
}

impl<'a> AchievementService<'a> {
    pub fn new(client: &'a MhClient, credentials: &'a Credentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    /// Evaluate one achievement for a hunter
    pub async fn evaluate(&self, kind: Achievement, snuid: &str) -> Result<bool, MhError> {
        match kind {
            Achievement::Star => self.is_starred(snuid).await,
            Achievement::Crown => self.is_crowned(snuid).await,
            Achievement::Checkmark => self.is_checkmarked(snuid).await,
            Achievement::Egg => self.is_egg_master(snuid).await,
        }
    }

    /// Evaluate every achievement, in [`Achievement::ALL`] order
    pub async fn evaluate_all(&self, snuid: &str) -> Result<BTreeMap<Achievement, bool>, MhError> {
        let mut results = BTreeMap::new();
        for kind in Achievement::ALL {
            results.insert(kind, self.evaluate(kind, snuid).await?);
        }
        Ok(results)
    }

    /// Every mouse location category complete
    pub async fn is_starred(&self, snuid: &str) -> Result<bool, MhError> {
        let path = profile_tab("mice", 1).key("mouse_list").key("categories");
        let categories = self.categories(snuid, "mice", "location", &path).await?;
        Ok(all_categories_complete(&categories)?)
    }

    /// Every item category complete
    pub async fn is_checkmarked(&self, snuid: &str) -> Result<bool, MhError> {
        let path = profile_tab("items", 0).key("items").key("categories");
        let categories = self.categories(snuid, "items", "false", &path).await?;
        Ok(all_categories_complete(&categories)?)
    }

    /// King's Crown on every eligible mouse
    pub async fn is_crowned(&self, snuid: &str) -> Result<bool, MhError> {
        let path = profile_tab("kings_crowns", 0)
            .key("mouse_crowns")
            .key("badge_groups");
        let (catalog, groups) = tokio::try_join!(
            self.client.fetch_mouse_catalog(),
            self.client
                .fetch_page_subview(
                    self.credentials,
                    tab_params(snuid, "kings_crowns", "false"),
                    &path,
                ),
        )?;

        let groups: Vec<CrownBadgeGroup> = validate_rows(rows(&groups, &path)?)?;
        Ok(is_crowned(&groups, &catalog))
    }

    /// Egg Master flag from the batched user data
    pub async fn is_egg_master(&self, snuid: &str) -> Result<bool, MhError> {
        let path = JsonPath::root().key(snuid).key("is_egg_master");
        let value = self
            .client
            .fetch_user_data(
                self.credentials,
                [("sn_user_ids[]", snuid), ("fields[]", "is_egg_master")],
                &path,
            )
            .await?;
        Ok(validate(&value)?)
    }

    /// Crowns per tier for a hunter
    pub async fn crown_summary(&self, snuid: &str) -> Result<CrownSummary, MhError> {
        let catches = self
            .client
            .fetch_profile_fields::<MouseCatchList>(self.credentials, snuid)
            .await?;
        Ok(crown_summary(&catches.mice))
    }

    async fn categories(
        &self,
        snuid: &str,
        tab: &str,
        sub_tab: &str,
        path: &JsonPath,
    ) -> Result<Vec<CategoryCompletion>, MhError> {
        let value = self
            .client
            .fetch_page_subview(self.credentials, tab_params(snuid, tab, sub_tab), path)
            .await?;
        Ok(validate_rows(rows(&value, path)?)?)
    }
}

/// Profile page arguments; `sub_tab` is `"false"` for a tab's default view
fn tab_params<'s>(
    snuid: &'s str,
    tab: &'s str,
    sub_tab: &'s str,
) -> [(&'static str, &'s str); 5] {
    [
        ("page_class", "HunterProfile"),
        ("page_arguments[legacyMode]", ""),
        ("page_arguments[tab]", tab),
        ("page_arguments[sub_tab]", sub_tab),
        ("page_arguments[snuid]", snuid),
    ]
}

fn rows<'v>(value: &'v Value, path: &JsonPath) -> Result<&'v [Value], SchemaError> {
    value
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| SchemaError::new("list", format!("`{path}` is not a list")))
}
