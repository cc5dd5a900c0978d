//! Ancestor tree of an artifact: children of a node are the artifacts it was derived from.

use anyhow::Result;
use log::warn;
use rusqlite::Connection;

use crate::engine::db_ops;
use crate::utils::Colors;
use crate::{ArtifactKind, DataEntry};

#[derive(Clone, Debug)]
pub struct LineageNode {
    pub entry: DataEntry,
    pub tags: Vec<String>,
    /// Distance from the root (root is 0).
    pub depth: usize,
    /// Parents of `entry`, in edge order.
    pub children: Vec<LineageNode>,
    /// Parents exist but were cut off by the depth limit.
    pub truncated: bool,
}

impl LineageNode {
    /// Depth-first, pre-order walk over this node and its descendants.
    pub fn iter(&self) -> impl Iterator<Item = &LineageNode> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.children.iter().rev());
            Some(node)
        })
    }

    /// Raw-artifact nodes reachable from here.
    pub fn raw_nodes(&self) -> impl Iterator<Item = &LineageNode> {
        self.iter().filter(|n| n.entry.kind == ArtifactKind::Raw)
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Whether any branch was cut off by the depth limit.
    pub fn is_truncated(&self) -> bool {
        self.iter().any(|n| n.truncated)
    }
}

/// Build the tree rooted at `id`. A node at depth `d` is expanded only while `d < max_depth`;
/// `max_depth == 0` yields `None`. A parent reached through several paths appears under each.
pub fn build_tree(conn: &Connection, id: i64, max_depth: usize) -> Result<Option<LineageNode>> {
    if max_depth == 0 {
        warn!("Trace depth is 0; nothing to show for entry {}", id);
        return Ok(None);
    }
    let entry = db_ops::require_entry(conn, id)?;
    Ok(Some(build_node(conn, entry, 0, max_depth)?))
}

fn build_node(
    conn: &Connection,
    entry: DataEntry,
    depth: usize,
    max_depth: usize,
) -> Result<LineageNode> {
    let tags = db_ops::tags_of(conn, entry.id)?;
    let parents = db_ops::parent_ids(conn, entry.id)?;
    let mut children = Vec::with_capacity(parents.len());
    let truncated = !parents.is_empty() && depth + 1 >= max_depth;
    if truncated {
        warn!(
            "Maximum trace depth {} reached at entry {}; {} parent(s) not shown",
            max_depth,
            entry.id,
            parents.len()
        );
    } else {
        for parent_id in parents {
            let parent = db_ops::require_entry(conn, parent_id)?;
            children.push(build_node(conn, parent, depth + 1, max_depth)?);
        }
    }
    Ok(LineageNode {
        entry,
        tags,
        depth,
        children,
        truncated,
    })
}

/// Plain-text rendering with box-drawing connectors, one artifact per line.
pub fn render_tree(root: &LineageNode) -> String {
    render(root, false)
}

/// Same as [`render_tree`] with terminal colors.
pub fn render_tree_colored(root: &LineageNode) -> String {
    render(root, true)
}

fn render(root: &LineageNode, color: bool) -> String {
    let mut out = String::new();
    out.push_str(&node_line(root, color));
    out.push('\n');
    render_children(root, "", color, &mut out);
    out
}

fn render_children(node: &LineageNode, prefix: &str, color: bool, out: &mut String) {
    let count = node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        let connector = if last { "└── " } else { "├── " };
        let paint = |s: &str| {
            if color {
                Colors::colorize(Colors::TREE, s)
            } else {
                s.to_string()
            }
        };
        out.push_str(&paint(&format!("{prefix}{connector}")));
        out.push_str(&node_line(child, color));
        out.push('\n');
        let next = format!("{prefix}{}", if last { "    " } else { "│   " });
        render_children(child, &next, color, out);
    }
    if node.truncated {
        out.push_str(&format!("{prefix}└── ...\n"));
    }
}

fn node_line(node: &LineageNode, color: bool) -> String {
    let entry = &node.entry;
    let kind = entry.kind.as_str().to_uppercase();
    let path = entry
        .original_path
        .as_deref()
        .unwrap_or(&entry.storage_path)
        .display()
        .to_string();
    let (kind, path) = if color {
        (
            Colors::colorize(Colors::KIND, &kind),
            Colors::colorize(Colors::PATH, &path),
        )
    } else {
        (kind, path)
    };
    let mut line = format!(
        "{} │ {} │ {} │ {}",
        entry.id,
        kind,
        path,
        entry.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    if entry.kind != ArtifactKind::Raw {
        let summary = entry
            .description
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        line.push_str(&format!(" │ {summary}"));
    }
    line
}
