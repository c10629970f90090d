//! Derived read views: flattened listing, nested tree, sorted tree, pages.

use std::collections::BTreeSet;

use chrono::Utc;

use crate::domain::entities::{ListQuery, Node, NodeId, Page};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::store::{DepthFirst, NodeStore};

/// Depth-first, parent-before-child linearization with children stripped.
pub fn flatten(forest: &[Node]) -> Vec<Node> {
    DepthFirst::new(forest).map(Node::detached).collect()
}

/// The live nested forest; storage is already nested, so no copy is made.
pub fn nested_view(store: &NodeStore) -> &[Node] {
    store.roots()
}

/// Copy of the forest with every sibling list stably ordered by `sort`.
/// Storage order is left untouched.
pub fn sorted_view(forest: &[Node]) -> Vec<Node> {
    let mut nodes: Vec<Node> = forest
        .iter()
        .map(|node| Node {
            children: sorted_view(&node.children),
            ..node.detached()
        })
        .collect();
    nodes.sort_by_key(|node| node.sort);
    nodes
}

/// Route names of menu nodes flagged keep-alive, for cache bookkeeping.
pub fn keep_alive_names(flat: &[Node]) -> BTreeSet<String> {
    flat.iter()
        .filter_map(|node| node.payload.as_menu())
        .filter(|menu| menu.keep_alive && !menu.route_name.is_empty())
        .map(|menu| menu.route_name.clone())
        .collect()
}

/// Filter a flattened list and cut one page out of it.
///
/// `keyword` matches label or menu path as a substring; matching is
/// case-sensitive unless `case_sensitive` is false.
pub fn filter_and_paginate(
    flat: Vec<Node>,
    query: &ListQuery,
    case_sensitive: bool,
) -> DomainResult<Page<Node>> {
    if query.page == 0 {
        return Err(DomainError::invalid("page", "pages start at 1"));
    }
    if query.page_size == 0 {
        return Err(DomainError::invalid("pageSize", "must be at least 1"));
    }

    let keyword = query
        .keyword
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(|k| fold_case(k, case_sensitive));

    let matching: Vec<Node> = flat
        .into_iter()
        .filter(|node| match &keyword {
            Some(k) => {
                fold_case(&node.label, case_sensitive).contains(k.as_str())
                    || node
                        .payload
                        .as_menu()
                        .is_some_and(|m| fold_case(&m.path, case_sensitive).contains(k.as_str()))
            }
            None => true,
        })
        .filter(|node| query.status.map_or(true, |s| node.status == s))
        .filter(|node| query.parent_id.map_or(true, |p| node.parent_id == Some(p)))
        .collect();

    let total = matching.len();
    let records = matching
        .into_iter()
        .skip((query.page - 1).saturating_mul(query.page_size))
        .take(query.page_size)
        .collect();

    Ok(Page {
        records,
        total,
        current_page: query.page,
        page_size: query.page_size,
        total_pages: total.div_ceil(query.page_size),
    })
}

fn fold_case(text: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        text.to_string()
    } else {
        text.to_lowercase()
    }
}

/// Assign fresh ids depth-first starting at `*next`, rewriting `parent_id`
/// and `level` to match the new positions.
pub fn renumber(nodes: Vec<Node>, parent: Option<NodeId>, level: u32, next: &mut u64) -> Vec<Node> {
    let now = Utc::now();
    nodes
        .into_iter()
        .map(|mut node| {
            node.id = NodeId(*next);
            *next += 1;
            node.parent_id = parent;
            node.level = level;
            node.updated_at = now;
            let children = std::mem::take(&mut node.children);
            node.children = renumber(children, Some(node.id), level + 1, next);
            node
        })
        .collect()
}
