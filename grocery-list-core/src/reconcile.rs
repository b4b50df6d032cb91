//! Item-set reconciliation.
//!
//! A client submits the full set of item names it wants a list to hold. The
//! reconciler diffs that against the names currently attached and issues
//! only the detach/attach operations needed to get there:
//!
//! - names in `current - desired` are detached (the pooled item stays),
//! - names in `desired - current` are resolved through the item pool and
//!   attached, so every list naming "Milk" points at the same pooled item,
//! - names in both are left alone and keep their item identity.

use std::collections::BTreeSet;

use crate::models::{GroceryList, ItemName, NameError};
use crate::store::{ItemPool, ListStore, StoreError};

/// A validated, deduplicated set of item names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DesiredItems(BTreeSet<ItemName>);

impl DesiredItems {
    /// Validates every name. A single blank name rejects the whole set.
    pub fn parse<I, S>(names: I) -> Result<Self, NameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .map(|n| ItemName::parse(n.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The operations that take a list from its current items to the desired
/// ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub detach: Vec<ItemName>,
    pub attach: Vec<ItemName>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.detach.is_empty() && self.attach.is_empty()
    }
}

/// Computes the set difference in both directions. Both vectors come out
/// sorted by name.
pub fn plan(list: &GroceryList, desired: &DesiredItems) -> ReconcilePlan {
    let detach = list
        .item_names()
        .filter(|name| !desired.contains(name.as_str()))
        .cloned()
        .collect();

    let attach = desired
        .iter()
        .filter(|name| !list.contains_item(name.as_str()))
        .cloned()
        .collect();

    ReconcilePlan { detach, attach }
}

/// Applies the plan to both the aggregate and the store transaction.
///
/// The caller owns the transaction; nothing is visible until it commits.
/// Returns the plan that was applied.
pub async fn reconcile<T>(
    tx: &mut T,
    list: &mut GroceryList,
    desired: &DesiredItems,
) -> Result<ReconcilePlan, StoreError>
where
    T: ItemPool + ListStore,
{
    let plan = plan(list, desired);

    for name in &plan.detach {
        if let Some(item) = list.remove_item(name.as_str()) {
            tx.detach_item(list.id(), item.id).await?;
        }
    }

    for name in &plan.attach {
        let item = tx.find_or_create(name).await?;
        let item_id = item.id;
        if list.add_item(item) {
            tx.attach_item(list.id(), item_id).await?;
        }
    }

    if !plan.is_empty() {
        tracing::debug!(
            list_id = %list.id(),
            detached = plan.detach.len(),
            attached = plan.attach.len(),
            "Reconciled list items"
        );
    }

    Ok(plan)
}
