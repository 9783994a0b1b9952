//! Bookmark data carried between the view, the cache and the sync queue

use serde::{Deserialize, Serialize};

/// A bookmark or folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Present on folders only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Bookmark>>,
}

impl Bookmark {
    pub fn new(id: i64, url: impl Into<String>) -> Self {
        Self {
            id,
            title: None,
            url: Some(url.into()),
            description: None,
            tags: Vec::new(),
            children: None,
        }
    }

    pub fn folder(id: i64, title: impl Into<String>, children: Vec<Bookmark>) -> Self {
        Self {
            id,
            title: Some(title.into()),
            url: None,
            description: None,
            tags: Vec::new(),
            children: Some(children),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }
}

/// Visit every bookmark in a tree, parents before children
pub fn each_bookmark<'a>(nodes: &'a [Bookmark], visit: &mut impl FnMut(&'a Bookmark)) {
    for node in nodes {
        visit(node);
        if let Some(children) = &node.children {
            each_bookmark(children, visit);
        }
    }
}

/// Find a bookmark by id anywhere in a tree
pub fn find_bookmark(nodes: &[Bookmark], id: i64) -> Option<&Bookmark> {
    let mut found = None;
    each_bookmark(nodes, &mut |bookmark| {
        if found.is_none() && bookmark.id == id {
            found = Some(bookmark);
        }
    });
    found
}

/// Remove a bookmark from its parent's children
///
/// Top-level nodes are containers and are never removed. Returns whether a
/// bookmark was removed.
pub fn remove_from_tree(nodes: &mut [Bookmark], id: i64) -> bool {
    for node in nodes.iter_mut() {
        let Some(children) = node.children.as_mut() else {
            continue;
        };
        if let Some(index) = children.iter().position(|child| child.id == id) {
            children.remove(index);
            return true;
        }
        if remove_from_tree(children, id) {
            return true;
        }
    }
    false
}

/// Remove a bookmark from a flat result list
pub fn remove_from_list(results: &mut Vec<Bookmark>, id: i64) -> bool {
    match results.iter().position(|bookmark| bookmark.id == id) {
        Some(index) => {
            results.remove(index);
            true
        }
        None => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BookmarkChangeType {
    Add,
    Modify,
    Move,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBookmarkChangeData {
    pub id: i64,
}

/// A single local edit to be synced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookmarkChange {
    #[serde(rename = "type")]
    pub change_type: BookmarkChangeType,
    pub change_data: RemoveBookmarkChangeData,
}

impl BookmarkChange {
    pub fn remove(id: i64) -> Self {
        Self {
            change_type: BookmarkChangeType::Remove,
            change_data: RemoveBookmarkChangeData { id },
        }
    }
}
