//! Tag domain model.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type TagId = Uuid;

/// Free-form label attached to any number of links.
///
/// Names are not unique; callers check `tag_exists` before inserting when
/// they want uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub description: Option<String>,
}

impl Tag {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: color.into(),
            description: None,
        }
    }
}
