//! Filters accepted when listing public shares.

use crate::ids::{ResourceId, UserId};
use crate::share::PublicShare;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Restricts a share listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ListFilter {
    ResourceId(ResourceId),
    Owner(UserId),
    Creator(UserId),
}

/// Discriminant of a [`ListFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterType {
    ResourceId,
    Owner,
    Creator,
}

impl ListFilter {
    pub fn filter_type(&self) -> FilterType {
        match self {
            Self::ResourceId(_) => FilterType::ResourceId,
            Self::Owner(_) => FilterType::Owner,
            Self::Creator(_) => FilterType::Creator,
        }
    }

    /// Returns true if `share` satisfies this single filter.
    pub fn matches(&self, share: &PublicShare) -> bool {
        match self {
            Self::ResourceId(id) => share.resource_id == *id,
            Self::Owner(user) => share.owner == *user,
            Self::Creator(user) => share.creator == *user,
        }
    }

    /// Groups filters by their type.
    pub fn group_by_type(filters: &[ListFilter]) -> HashMap<FilterType, Vec<&ListFilter>> {
        let mut grouped: HashMap<FilterType, Vec<&ListFilter>> = HashMap::new();
        for filter in filters {
            grouped.entry(filter.filter_type()).or_default().push(filter);
        }
        grouped
    }
}

/// Checks `share` against a filter list.
///
/// Filters of the same type are alternatives; filters of different types must
/// all be satisfied. An empty list matches every share.
pub fn matches_filters(share: &PublicShare, filters: &[ListFilter]) -> bool {
    ListFilter::group_by_type(filters)
        .values()
        .all(|group| group.iter().any(|f| f.matches(share)))
}
