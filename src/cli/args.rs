//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueHint};

use crate::domain::{MenuType, MovePosition, MoveTarget, NodeId, NodeStatus, SortItem, TreeKind};

/// Manage hierarchical menus and category trees stored as JSON snapshots
#[derive(Parser, Debug)]
#[command(name = "arborist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Turn debugging information on (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub debug: u8,

    /// Directory holding snapshots (default: ~/.arborist)
    #[arg(short = 'D', long, global = true, env = "ARBORIST_DATA_DIR", value_hint = ValueHint::DirPath)]
    pub data_dir: Option<PathBuf>,

    /// Namespace to operate on (e.g. menu, operator/basic)
    #[arg(short, long, global = true, default_value = "menu")]
    pub namespace: String,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an empty namespace
    Init {
        /// Tree kind: menu (unique paths) or category
        #[arg(short, long, default_value = "menu")]
        kind: TreeKind,
    },

    /// List namespaces in the data directory
    Namespaces,

    /// Show the forest
    Tree {
        /// Order siblings by their sort value
        #[arg(long)]
        sorted: bool,
    },

    /// Flattened, filtered, paginated listing
    List(ListArgs),

    /// Show one node
    Show { id: u64 },

    /// Create a node
    Create(CreateArgs),

    /// Change a node's label
    Rename { id: u64, label: String },

    /// Enable or disable a node
    UpdateStatus { id: u64, status: NodeStatus },

    /// Show or hide a menu node
    Visibility {
        id: u64,
        #[arg(action = clap::ArgAction::Set, value_parser = clap::builder::BoolishValueParser::new())]
        visible: bool,
    },

    /// Duplicate a node (without children)
    Copy {
        id: u64,
        label: String,
        /// Parent of the copy (default: the source's parent)
        #[arg(short, long, conflicts_with = "root")]
        parent: Option<u64>,
        /// Put the copy in the root list
        #[arg(long)]
        root: bool,
    },

    /// Move a node to a new parent or next to another node
    Move {
        id: u64,
        #[command(flatten)]
        target: MoveArgs,
    },

    /// Delete nodes
    Delete {
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u64>,
        /// Also delete descendants
        #[arg(long)]
        cascade: bool,
    },

    /// Update sort values: ID=SORT ...
    Sort {
        #[arg(required = true, num_args = 1.., value_parser = parse_sort_item)]
        items: Vec<SortItem>,
    },

    /// Check whether a label is free among a parent's children
    CheckName {
        name: String,
        #[arg(short, long)]
        parent: Option<u64>,
        /// Node to ignore (the one being edited)
        #[arg(short, long)]
        exclude: Option<u64>,
    },

    /// Check whether a menu path is free in the forest
    CheckPath {
        path: String,
        #[arg(short, long)]
        exclude: Option<u64>,
    },

    /// Print the label path from root to a node
    Path { id: u64 },

    /// List leaf ids
    Leaves,

    /// List a node's id and all descendant ids
    Subtree { id: u64 },

    /// Route names of keep-alive menu entries
    KeepAlive,

    /// Write the forest as JSON
    Export {
        /// Output file (default: stdout)
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,
    },

    /// Append a JSON forest fragment, assigning fresh ids
    Import {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },

    /// Manage resources referencing nodes
    Refs {
        #[command(subcommand)]
        command: RefsCommands,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Substring of label or path
    #[arg(short, long)]
    pub keyword: Option<String>,
    #[arg(short, long)]
    pub status: Option<NodeStatus>,
    /// Only direct children of this node
    #[arg(short, long)]
    pub parent: Option<u64>,
    #[arg(long, default_value_t = 1)]
    pub page: usize,
    /// Page size (default: from config)
    #[arg(long, default_value_t = 0)]
    pub page_size: usize,
}

#[derive(Args, Debug, Default)]
pub struct CreateArgs {
    pub label: String,
    #[arg(short, long)]
    pub parent: Option<u64>,
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub sort: i64,
    #[arg(long)]
    pub status: Option<NodeStatus>,

    /// Menu route path
    #[arg(long)]
    pub path: Option<String>,
    #[arg(long)]
    pub route_name: Option<String>,
    #[arg(long)]
    pub component: Option<String>,
    #[arg(long)]
    pub icon: Option<String>,
    #[arg(long)]
    pub permission: Option<String>,
    #[arg(long)]
    pub menu_type: Option<MenuType>,
    #[arg(long)]
    pub hidden: bool,
    #[arg(long)]
    pub keep_alive: bool,

    /// Category description
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .args(["parent", "root", "before", "after", "inside"]),
))]
pub struct MoveArgs {
    /// Append as last child of this node
    #[arg(long)]
    pub parent: Option<u64>,
    /// Append to the root list
    #[arg(long)]
    pub root: bool,
    /// Insert before this sibling
    #[arg(long)]
    pub before: Option<u64>,
    /// Insert after this sibling
    #[arg(long)]
    pub after: Option<u64>,
    /// Append as last child of this node (same as --parent)
    #[arg(long)]
    pub inside: Option<u64>,
}

impl MoveArgs {
    pub fn to_target(&self) -> MoveTarget {
        let relative = |anchor: u64, position| MoveTarget::Relative {
            anchor: NodeId(anchor),
            position,
        };
        match (self.parent, self.before, self.after, self.inside) {
            (Some(parent), ..) => MoveTarget::Parent(Some(NodeId(parent))),
            (_, Some(anchor), ..) => relative(anchor, MovePosition::Before),
            (_, _, Some(anchor), _) => relative(anchor, MovePosition::After),
            (_, _, _, Some(anchor)) => relative(anchor, MovePosition::Inner),
            _ => MoveTarget::Parent(None),
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum RefsCommands {
    /// Attach a resource to a node
    Add { name: String, category: u64 },
    /// List resources, optionally only those on given nodes
    List {
        #[arg(short, long, num_args = 1..)]
        category: Vec<u64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show config file locations
    Path,
    /// Print a commented config template
    Template,
}

/// Parse `ID=SORT` into a sort item.
pub fn parse_sort_item(s: &str) -> Result<SortItem, String> {
    let (id, sort) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=SORT, got '{s}'"))?;
    let id = id
        .trim()
        .parse::<u64>()
        .map_err(|e| format!("invalid id '{id}': {e}"))?;
    let sort = sort
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid sort '{sort}': {e}"))?;
    Ok(SortItem {
        id: NodeId(id),
        sort,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_sort_pair_when_parsing_then_item_built() {
        assert_eq!(
            parse_sort_item("7=-2"),
            Ok(SortItem {
                id: NodeId(7),
                sort: -2
            })
        );
        assert!(parse_sort_item("7").is_err());
        assert!(parse_sort_item("x=1").is_err());
    }

    #[test]
    fn given_move_flags_when_parsing_then_target_resolved() {
        let cli = Cli::parse_from(["arborist", "move", "5", "--after", "3"]);
        let Some(Commands::Move { id, target }) = cli.command else {
            panic!("expected move command");
        };
        assert_eq!(id, 5);
        assert_eq!(
            target.to_target(),
            MoveTarget::Relative {
                anchor: NodeId(3),
                position: MovePosition::After
            }
        );
    }

    #[test]
    fn given_move_without_target_when_parsing_then_error() {
        assert!(Cli::try_parse_from(["arborist", "move", "5"]).is_err());
    }
}
