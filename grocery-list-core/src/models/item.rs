use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::names::ItemName;

pub type ItemId = Uuid;

/// A pooled grocery item.
///
/// Items are shared between lists: two lists holding an item with the same
/// name hold the same record (same `id`). Use [`GroceryItem::is_same_item`]
/// to compare identity rather than value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroceryItem {
    pub id: ItemId,
    pub name: ItemName,
    pub created_at: DateTime<Utc>,
}

impl GroceryItem {
    pub fn new(name: ItemName) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            created_at: Utc::now(),
        }
    }

    pub fn is_same_item(&self, other: &GroceryItem) -> bool {
        self.id == other.id
    }
}

impl fmt::Display for GroceryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An item in the pool together with how many lists reference it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PooledItem {
    pub item: GroceryItem,
    pub references: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_different_records() {
        let a = GroceryItem::new(ItemName::parse("Bread").unwrap());
        let b = GroceryItem::new(ItemName::parse("Bread").unwrap());

        assert_eq!(a.name, b.name);
        assert!(!a.is_same_item(&b));
        assert!(a.is_same_item(&a.clone()));
    }
}
