//! Wire types.
//!
//! Requests are deserialized with every field optional and then validated
//! into commands, so a missing field is reported as an invalid parameter
//! rather than surfacing as a transport-level decode failure.

use serde::{Deserialize, Serialize};

use crate::error::ListError;
use crate::models::{names, GroceryList, ListId};
use crate::reconcile::DesiredItems;

/// A list as seen by clients. Items are listed by name only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ListPayload {
    pub id: ListId,
    pub name: String,
    pub items: Vec<String>,
    pub owner: String,
    pub shared_users: Vec<String>,
    pub is_template: bool,
}

impl From<&GroceryList> for ListPayload {
    fn from(list: &GroceryList) -> Self {
        Self {
            id: list.id(),
            name: list.name().to_string(),
            items: list.item_names().map(|n| n.to_string()).collect(),
            owner: list.owner().to_string(),
            shared_users: list.shared_users().map(str::to_string).collect(),
            is_template: list.is_template(),
        }
    }
}

/// Body of a save request. Clients usually send back a full [`ListPayload`];
/// only `id`, `name` and `items` are read, the rest is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveListRequest {
    pub id: Option<ListId>,
    pub name: Option<String>,
    pub items: Option<Vec<String>>,
}

/// A validated save.
#[derive(Debug, Clone)]
pub struct SaveList {
    pub id: ListId,
    /// `None` or blank leaves the stored name unchanged.
    pub name: Option<String>,
    pub items: DesiredItems,
}

impl SaveListRequest {
    pub fn validate(self) -> Result<SaveList, ListError> {
        let id = self
            .id
            .ok_or_else(|| ListError::InvalidParameter("missing field 'id'".to_string()))?;
        let items = self
            .items
            .ok_or_else(|| ListError::InvalidParameter("missing field 'items'".to_string()))?;

        Ok(SaveList {
            id,
            name: self.name.filter(|n| !n.trim().is_empty()),
            items: DesiredItems::parse(items)?,
        })
    }
}

/// Body of a create request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    pub name: Option<String>,
    pub is_template: Option<bool>,
    pub template_id: Option<ListId>,
}

/// How a new list gets its initial items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewListSource {
    Empty { is_template: bool },
    Template(ListId),
}

/// A validated create.
#[derive(Debug, Clone)]
pub struct NewList {
    pub name: String,
    pub source: NewListSource,
}

impl CreateListRequest {
    pub fn validate(self) -> Result<NewList, ListError> {
        let name = self
            .name
            .ok_or_else(|| ListError::InvalidParameter("missing field 'name'".to_string()))?;
        let name = names::list_name(&name)?;

        let source = match (self.template_id, self.is_template.unwrap_or(false)) {
            (Some(_), true) => {
                return Err(ListError::InvalidParameter(
                    "a list created from a template cannot itself be a template".to_string(),
                ))
            }
            (Some(template_id), false) => NewListSource::Template(template_id),
            (None, is_template) => NewListSource::Empty { is_template },
        };

        Ok(NewList { name, source })
    }
}
