//! Spatial assignment of subscriber points to boundary regions.
//!
//! Each point is tested against the boundary regions in document order and
//! joins the first region whose ring contains it. What happens to a point no
//! region contains is decided by [`UnmatchedPolicy`].

use crate::assets::Asset;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Placement of points that fall inside no boundary region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedPolicy {
    /// Put the point in the first region (document order). With no regions at
    /// all, points are dropped.
    #[default]
    FirstRegion,
    /// Keep the point in a separate unassigned bucket.
    Unassigned,
}

/// Points grouped by boundary region name.
///
/// Every region gets a group, even an empty one. Regions sharing a name share
/// one group, positioned at the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct RegionGroups<'a> {
    groups: IndexMap<&'a str, Vec<&'a Asset>>,
    unassigned: Vec<&'a Asset>,
}

impl<'a> RegionGroups<'a> {
    /// Points assigned to a region.
    pub fn get(&self, region: &str) -> Option<&[&'a Asset]> {
        self.groups.get(region).map(Vec::as_slice)
    }

    /// Groups in region document order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &[&'a Asset])> + '_ {
        self.groups.iter().map(|(name, points)| (*name, points.as_slice()))
    }

    /// Groups ordered by region name.
    pub fn sorted(&self) -> Vec<(&'a str, &[&'a Asset])> {
        let mut groups: Vec<_> = self.iter().collect();
        groups.sort_by(|a, b| a.0.cmp(b.0));
        groups
    }

    /// Points no region contains (only filled under [`UnmatchedPolicy::Unassigned`]).
    pub fn unassigned(&self) -> &[&'a Asset] {
        &self.unassigned
    }

    /// Number of region groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no region groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of points placed in a region group.
    pub fn assigned_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// First region (document order) whose ring contains the point.
///
/// Points without coordinates are never contained.
pub fn containing_region<'a>(point: &Asset, regions: &'a [Asset]) -> Option<&'a Asset> {
    let position = point.position()?;
    regions.iter().find(|region| region.ring().contains(&position))
}

/// Partition points into per-region groups.
pub fn assign<'a>(
    points: impl IntoIterator<Item = &'a Asset>,
    regions: &'a [Asset],
    policy: UnmatchedPolicy,
) -> RegionGroups<'a> {
    let mut result = RegionGroups::default();
    for region in regions {
        result.groups.entry(region.name.as_str()).or_default();
    }

    let fallback = regions.first().map(|region| region.name.as_str());
    let mut dropped = 0usize;
    let mut fallbacks = 0usize;

    for point in points {
        if let Some(region) = containing_region(point, regions) {
            result.groups.entry(region.name.as_str()).or_default().push(point);
            continue;
        }

        match (policy, fallback) {
            (UnmatchedPolicy::FirstRegion, Some(first)) => {
                log::debug!("Point '{}' is outside every region, using '{}'", point.name, first);
                fallbacks += 1;
                result.groups.entry(first).or_default().push(point);
            },
            (UnmatchedPolicy::FirstRegion, None) => {
                dropped += 1;
            },
            (UnmatchedPolicy::Unassigned, _) => {
                result.unassigned.push(point);
            },
        }
    }

    if fallbacks > 0 {
        log::warn!("{} points matched no region and were assigned to the first region", fallbacks);
    }
    if dropped > 0 {
        log::warn!("{} points dropped: document has no boundary regions", dropped);
    }
    if !result.unassigned.is_empty() {
        log::info!("{} points left unassigned", result.unassigned.len());
    }

    result
}
