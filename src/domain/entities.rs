//! Domain entities: nodes, payloads and the request/response shapes of the engine

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::ErrorKind;
use crate::domain::DomainError;

/// Forest-wide unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Which family of tree a namespace holds.
///
/// Chosen once when the namespace is created; decides the accepted payload
/// variant and whether paths must be unique across the whole forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeKind {
    Menu,
    Category,
}

impl TreeKind {
    pub fn enforces_unique_paths(self) -> bool {
        matches!(self, TreeKind::Menu)
    }
}

impl fmt::Display for TreeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeKind::Menu => write!(f, "menu"),
            TreeKind::Category => write!(f, "category"),
        }
    }
}

impl FromStr for TreeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "menu" => Ok(TreeKind::Menu),
            "category" => Ok(TreeKind::Category),
            other => Err(format!("unknown tree kind '{}' (expected menu|category)", other)),
        }
    }
}

/// Enabled/disabled flag shared by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Enabled,
    Disabled,
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeStatus::Enabled => write!(f, "enabled"),
            NodeStatus::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "enabled" | "1" => Ok(NodeStatus::Enabled),
            "disabled" | "0" => Ok(NodeStatus::Disabled),
            other => Err(format!("unknown status '{}' (expected enabled|disabled)", other)),
        }
    }
}

/// Menu entry flavour: directory, page or button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuType {
    Directory,
    #[default]
    Menu,
    Button,
}

impl FromStr for MenuType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "directory" | "dir" => Ok(MenuType::Directory),
            "menu" => Ok(MenuType::Menu),
            "button" => Ok(MenuType::Button),
            other => Err(format!("unknown menu type '{}' (expected directory|menu|button)", other)),
        }
    }
}

/// Route data attached to a menu node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MenuPayload {
    /// Route name, also the key used for keep-alive bookkeeping
    pub route_name: String,
    /// Route path; unique across the whole menu forest when non-empty
    pub path: String,
    pub component: String,
    pub icon: String,
    pub redirect: String,
    pub permission: String,
    pub menu_type: MenuType,
    pub visible: bool,
    pub keep_alive: bool,
    pub affix: bool,
}

impl Default for MenuPayload {
    fn default() -> Self {
        Self {
            route_name: String::new(),
            path: String::new(),
            component: String::new(),
            icon: String::new(),
            redirect: String::new(),
            permission: String::new(),
            menu_type: MenuType::default(),
            visible: true,
            keep_alive: false,
            affix: false,
        }
    }
}

/// Category nodes carry nothing beyond the shared header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Per-namespace payload attached to the shared node header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Payload {
    Menu(MenuPayload),
    Category(CategoryPayload),
}

impl Payload {
    pub fn default_for(kind: TreeKind) -> Self {
        match kind {
            TreeKind::Menu => Payload::Menu(MenuPayload::default()),
            TreeKind::Category => Payload::Category(CategoryPayload::default()),
        }
    }

    pub fn kind(&self) -> TreeKind {
        match self {
            Payload::Menu(_) => TreeKind::Menu,
            Payload::Category(_) => TreeKind::Category,
        }
    }

    /// Route path subject to forest-wide uniqueness, if any.
    pub fn unique_path(&self) -> Option<&str> {
        match self {
            Payload::Menu(menu) if !menu.path.is_empty() => Some(menu.path.as_str()),
            _ => None,
        }
    }

    pub fn as_menu(&self) -> Option<&MenuPayload> {
        match self {
            Payload::Menu(menu) => Some(menu),
            Payload::Category(_) => None,
        }
    }

    pub fn as_menu_mut(&mut self) -> Option<&mut MenuPayload> {
        match self {
            Payload::Menu(menu) => Some(menu),
            Payload::Category(_) => None,
        }
    }
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// A tree node: shared structural header, payload and owned children.
///
/// `parent_id` is a plain lookup key, never a back-pointer; the nesting in
/// `children` is the ownership structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    pub label: String,
    #[serde(default)]
    pub sort: i64,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default = "now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "now")]
    pub updated_at: DateTime<Utc>,
    pub payload: Payload,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Fresh childless node built from a draft, stamped with the current time.
    pub fn from_draft(id: NodeId, parent_id: Option<NodeId>, level: u32, draft: NodeDraft) -> Self {
        let now = Utc::now();
        Node {
            id,
            parent_id,
            label: draft.label,
            sort: draft.sort,
            level,
            status: draft.status,
            created_at: now,
            updated_at: now,
            payload: draft.payload,
            children: Vec::new(),
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn unique_path(&self) -> Option<&str> {
        self.payload.unique_path()
    }

    /// Copy of this node with its children stripped.
    pub fn detached(&self) -> Node {
        Node {
            children: Vec::new(),
            ..self.clone()
        }
    }

    pub(crate) fn touch(&mut self, at: DateTime<Utc>) {
        self.updated_at = at;
    }

    /// Set this node's level and rewrite level/parent of every descendant.
    pub(crate) fn relevel(&mut self, level: u32) {
        self.level = level;
        let id = self.id;
        for child in &mut self.children {
            child.parent_id = Some(id);
            child.relevel(level + 1);
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.label, self.id)
    }
}

/// Input for creating a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDraft {
    pub label: String,
    #[serde(default)]
    pub sort: i64,
    #[serde(default)]
    pub status: NodeStatus,
    pub payload: Payload,
}

impl NodeDraft {
    pub fn category(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sort: 0,
            status: NodeStatus::Enabled,
            payload: Payload::Category(CategoryPayload::default()),
        }
    }

    pub fn menu(label: impl Into<String>, menu: MenuPayload) -> Self {
        Self {
            label: label.into(),
            sort: 0,
            status: NodeStatus::Enabled,
            payload: Payload::Menu(menu),
        }
    }

    pub fn with_sort(mut self, sort: i64) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update; `None` fields are left untouched. Labels change via rename.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodePatch {
    pub sort: Option<i64>,
    pub status: Option<NodeStatus>,
    pub payload: Option<Payload>,
}

/// Where a moved node lands relative to an anchor node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovePosition {
    Before,
    After,
    Inner,
}

impl FromStr for MovePosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "before" => Ok(MovePosition::Before),
            "after" => Ok(MovePosition::After),
            "inner" | "inside" => Ok(MovePosition::Inner),
            other => Err(format!("unknown position '{}' (expected before|after|inner)", other)),
        }
    }
}

/// Destination of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MoveTarget {
    /// Reparent and append as last child; `None` appends to the root list.
    Parent(Option<NodeId>),
    /// Positional reinsertion relative to `anchor`.
    Relative {
        anchor: NodeId,
        position: MovePosition,
    },
}

/// Where a copy lands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CopyTarget {
    /// Next to the source, under the source's parent.
    #[default]
    Beside,
    /// Appended under this parent; `None` appends to the root list.
    Parent(Option<NodeId>),
}

/// Location of a node: owning parent (`None` for roots) and index among siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub parent: Option<NodeId>,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortItem {
    pub id: NodeId,
    pub sort: i64,
}

/// Filter and paging parameters for the flattened listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ListQuery {
    /// Substring matched against label and menu path
    pub keyword: Option<String>,
    pub status: Option<NodeStatus>,
    /// Only direct children of this node
    pub parent_id: Option<NodeId>,
    /// 1-based page number
    pub page: usize,
    pub page_size: usize,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            status: None,
            parent_id: None,
            page: 1,
            page_size: 10,
        }
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: usize,
    pub current_page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Per-item failure reported by batch operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItemError {
    pub id: NodeId,
    pub kind: ErrorKind,
    pub message: String,
}

impl BatchItemError {
    pub fn new(id: NodeId, err: &DomainError) -> Self {
        Self {
            id,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of a batch delete: partial success is reported, never rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteOutcome {
    pub deleted_ids: Vec<NodeId>,
    pub errors: Vec<BatchItemError>,
}

/// Result of a sort update: unknown ids are listed, not treated as failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOutcome {
    pub updated: Vec<NodeId>,
    pub skipped: Vec<NodeId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_menu_payload_without_path_when_asking_unique_path_then_none() {
        let payload = Payload::Menu(MenuPayload::default());
        assert_eq!(payload.unique_path(), None);
        assert!(payload.as_menu().is_some_and(|m| m.visible));
    }

    #[test]
    fn given_node_json_without_optional_fields_when_parsing_then_defaults_apply() {
        let json = r#"{"id": 4, "label": "Cleaning", "payload": {"kind": "category"}}"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.id, NodeId(4));
        assert_eq!(node.parent_id, None);
        assert_eq!(node.status, NodeStatus::Enabled);
        assert!(node.children.is_empty());
    }

    #[test]
    fn given_text_when_parsing_enums_then_accepts_known_values() {
        assert_eq!("Menu".parse::<TreeKind>(), Ok(TreeKind::Menu));
        assert_eq!("inside".parse::<MovePosition>(), Ok(MovePosition::Inner));
        assert_eq!("0".parse::<NodeStatus>(), Ok(NodeStatus::Disabled));
        assert!("tree".parse::<TreeKind>().is_err());
    }
}
