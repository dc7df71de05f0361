//! Static category catalog.
//!
//! Categories are process-lifetime constants; nothing in the store can add,
//! rename or remove one.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Integer category identifier as it appears on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub i64);

impl CategoryId {
    /// Resource marked as a news feed item.
    pub const NEWS_FEED: Self = Self(1);
    /// Resource derived from an attachment of another resource.
    pub const CONTENT: Self = Self(2);

    /// Returns whether the catalog knows this identifier.
    pub fn is_known(self) -> bool {
        find_category(self).is_some()
    }
}

impl Display for CategoryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: &'static str,
    pub description: &'static str,
}

const CATALOG: [Category; 2] = [
    Category {
        id: CategoryId::NEWS_FEED,
        name: "News feed",
        description: "Resource marked as news feed item",
    },
    Category {
        id: CategoryId::CONTENT,
        name: "Content",
        description: "All resource that has been uploaded as an attachement in another resource. \
For example, news feed image for news feed resource item",
    },
];

/// Returns the full catalog in identifier order.
pub fn categories() -> &'static [Category] {
    &CATALOG
}

/// Looks up one catalog entry by identifier.
pub fn find_category(id: CategoryId) -> Option<&'static Category> {
    CATALOG.iter().find(|category| category.id == id)
}

/// Looks up one catalog entry by exact display name.
pub fn find_category_by_name(name: &str) -> Option<&'static Category> {
    CATALOG.iter().find(|category| category.name == name)
}

#[cfg(test)]
mod tests {
    use super::{categories, find_category, find_category_by_name, CategoryId};

    #[test]
    fn catalog_is_ordered_by_id() {
        let ids: Vec<i64> = categories().iter().map(|category| category.id.0).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn lookups_by_id_and_name_agree() {
        let by_name = find_category_by_name("Content").unwrap();
        assert_eq!(by_name.id, CategoryId::CONTENT);
        assert_eq!(find_category(CategoryId::CONTENT), Some(by_name));
        assert!(find_category(CategoryId(3)).is_none());
        assert!(!CategoryId(0).is_known());
    }
}
