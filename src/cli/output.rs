//! Terminal output formatting with colors
//!
//! Respects NO_COLOR, CLICOLOR, CLICOLOR_FORCE automatically.

use colored::Colorize;
use termtree::Tree;

use crate::domain::{Node, NodeStatus, Payload};

/// Print error (red bold "error:" prefix) to stderr
pub fn error(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "error".red().bold(), msg);
}

/// Print warning (yellow "Warning:" prefix) to stderr
pub fn warning(msg: &(impl std::fmt::Display + ?Sized)) {
    eprintln!("{}: {}", "Warning".yellow(), msg);
}

/// Print success status (green checkmark)
pub fn success(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{} {}", "✓".green(), msg);
}

/// Print failure status (red X, indented)
pub fn failure(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {} {}", "✗".red(), msg);
}

/// Print completed action (green label)
pub fn action(label: &str, msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}: {}", label.green(), msg);
}

/// Print section header (cyan bold)
pub fn header(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg.to_string().cyan().bold());
}

/// Print indented detail (no color)
pub fn detail(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("  {}", msg);
}

/// Print plain output (no color, for data)
pub fn info(msg: &(impl std::fmt::Display + ?Sized)) {
    println!("{}", msg);
}

/// One-line node summary: `label [id]`, dimmed when disabled, path for menus.
pub fn node_line(node: &Node) -> String {
    let mut line = format!("{} [{}]", node.label, node.id);
    if let Payload::Menu(menu) = &node.payload {
        if !menu.path.is_empty() {
            line.push_str(&format!(" {}", menu.path));
        }
        if !menu.visible {
            line.push_str(" (hidden)");
        }
    }
    if node.status == NodeStatus::Disabled {
        line = line.dimmed().to_string();
    }
    line
}

pub fn to_tree(node: &Node) -> Tree<String> {
    let leaves: Vec<_> = node.children.iter().map(to_tree).collect();
    Tree::new(node_line(node)).with_leaves(leaves)
}

/// Render a forest as one termtree per root.
pub fn render_forest(roots: &[Node]) -> String {
    if roots.is_empty() {
        return "(empty)".to_string();
    }
    roots.iter().map(|root| to_tree(root).to_string()).collect()
}
