//! Link domain model.
//!
//! # Responsibility
//! - Define the bookmark record and its owned relationships.
//!
//! # Invariants
//! - `id` is stable and never reused for another link.
//! - `tags` and `group` are the source of truth for junction rows on every
//!   update; persisted membership is fully replaced from them.
//! - `tags` is a set keyed by tag id: order and repeated ids do not affect
//!   equality, and reads return tags ordered by name.
//! - `updated_at` is never earlier than `created_at` for links built here.

use super::group::Group;
use super::now_epoch_seconds;
use super::tag::{Tag, TagId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type LinkId = Uuid;

const DEFAULT_COLOR: &str = "#8E8E93";

/// One saved bookmark.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: LinkId,
    /// Not unique in storage; see `LinkStore::link_exists`.
    pub url: String,
    pub starred: bool,
    pub unread: bool,
    pub archived: bool,
    pub note: Option<String>,
    pub color: String,
    /// Page metadata filled in by the host's fetcher.
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub og_image_url: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub group: Option<Group>,
    pub tags: Vec<Tag>,
}

impl Link {
    /// Creates an unread link with a generated id and current timestamps.
    pub fn new(url: impl Into<String>) -> Self {
        let now = now_epoch_seconds();
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            starred: false,
            unread: true,
            archived: false,
            note: None,
            color: DEFAULT_COLOR.to_string(),
            og_title: None,
            og_description: None,
            og_image_url: None,
            created_at: now,
            updated_at: now,
            group: None,
            tags: Vec::new(),
        }
    }

    /// Sets `updated_at` to now, keeping it no earlier than `created_at`.
    pub fn touch(&mut self) {
        self.updated_at = now_epoch_seconds().max(self.created_at);
    }

    pub fn has_tag(&self, tag: &Tag) -> bool {
        self.tags.iter().any(|current| current.id == tag.id)
    }

    /// Adds `tag` unless a tag with the same id is already attached.
    pub fn add_tag(&mut self, tag: Tag) {
        if !self.has_tag(&tag) {
            self.tags.push(tag);
        }
    }

    pub fn remove_tag(&mut self, tag: &Tag) {
        self.tags.retain(|current| current.id != tag.id);
    }

    fn tag_set(&self) -> BTreeMap<TagId, &Tag> {
        self.tags.iter().map(|tag| (tag.id, tag)).collect()
    }
}

impl PartialEq for Link {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.url == other.url
            && self.starred == other.starred
            && self.unread == other.unread
            && self.archived == other.archived
            && self.note == other.note
            && self.color == other.color
            && self.og_title == other.og_title
            && self.og_description == other.og_description
            && self.og_image_url == other.og_image_url
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
            && self.group == other.group
            && self.tag_set() == other.tag_set()
    }
}

impl Eq for Link {}
