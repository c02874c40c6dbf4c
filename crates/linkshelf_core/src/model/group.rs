//! Group domain model. Stored in the `category` table.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type GroupId = Uuid;

/// Named folder holding links; a link belongs to at most one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    /// Unique across groups; enforced by the schema.
    pub name: String,
    /// Symbol name rendered by the presentation layer.
    pub icon: String,
    pub color: String,
}

impl Group {
    pub fn new(name: impl Into<String>, icon: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            icon: icon.into(),
            color: color.into(),
        }
    }
}
