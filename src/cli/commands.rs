//! Command dispatch: one namespace operation per invocation

use std::io;

use clap::CommandFactory;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands, CreateArgs, ListArgs, RefsCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{
    CategoryPayload, CopyTarget, ListQuery, MenuPayload, Node, NodeDraft, NodeId, Payload, SortItem,
    TreeKind,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Import files may hold a bare node list or a full exported snapshot.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportDocument {
    Nodes(Vec<Node>),
    Snapshot { nodes: Vec<Node> },
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        let mut cmd = Cli::command();
        cmd.print_help().map_err(|e| InfraError::io("print help", e))?;
        return Ok(());
    };

    // commands that need no data directory
    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
        Commands::Config { command } => return cmd_config(cli, command),
        _ => {}
    }

    let settings = Settings::load(cli.data_dir.as_deref())?;
    let container = ServiceContainer::new(settings)?;
    dispatch(&container, cli, command)
}

/// Run one command against an already wired container.
pub fn dispatch(container: &ServiceContainer, cli: &Cli, command: &Commands) -> CliResult<()> {
    let ns = cli.namespace.as_str();
    let json = cli.json;
    match command {
        Commands::Init { kind } => cmd_init(container, ns, *kind),
        Commands::Namespaces => {
            let namespaces = container.list_namespaces()?;
            emit(json, &namespaces, || {
                namespaces.iter().for_each(|n| output::info(n));
            })
        }
        Commands::Tree { sorted } => {
            let service = container.open(ns)?;
            let tree = if *sorted {
                service.sorted_tree()
            } else {
                service.get_tree()
            };
            emit(json, &tree, || output::info(&output::render_forest(&tree)))
        }
        Commands::List(args) => cmd_list(container, ns, json, args),
        Commands::Show { id } => {
            let node = container.open(ns)?.get_by_id(NodeId(*id))?.detached();
            emit(json, &node, || show_node(&node))
        }
        Commands::Create(args) => cmd_create(container, ns, json, args),
        Commands::Rename { id, label } => {
            let node = container.open(ns)?.rename(NodeId(*id), label)?;
            container.save(ns)?;
            emit(json, &node, || output::action("Renamed", &node))
        }
        Commands::UpdateStatus { id, status } => {
            let node = container.open(ns)?.set_status(NodeId(*id), *status)?;
            container.save(ns)?;
            emit(json, &node, || {
                output::action("Status", &format!("{} -> {}", node, node.status))
            })
        }
        Commands::Visibility { id, visible } => {
            let node = container.open(ns)?.set_visibility(NodeId(*id), *visible)?;
            container.save(ns)?;
            let state = if *visible { "visible" } else { "hidden" };
            emit(json, &node, || {
                output::action("Visibility", &format!("{} -> {}", node, state))
            })
        }
        Commands::Copy {
            id,
            label,
            parent,
            root,
        } => {
            let target = match (parent, root) {
                (Some(parent), _) => CopyTarget::Parent(Some(NodeId(*parent))),
                (None, true) => CopyTarget::Parent(None),
                (None, false) => CopyTarget::Beside,
            };
            let node = container.open(ns)?.copy(NodeId(*id), label, target)?;
            container.save(ns)?;
            emit(json, &node, || output::action("Copied", &node))
        }
        Commands::Move { id, target } => {
            let target = target.to_target();
            container.open(ns)?.move_node(NodeId(*id), target)?;
            container.save(ns)?;
            emit(json, &target, || {
                output::action("Moved", &format!("{} ({:?})", id, target))
            })
        }
        Commands::Delete { ids, cascade } => cmd_delete(container, ns, json, ids, *cascade),
        Commands::Sort { items } => cmd_sort(container, ns, json, items),
        Commands::CheckName {
            name,
            parent,
            exclude,
        } => {
            let available = container.open(ns)?.check_name_available(
                name,
                parent.map(NodeId),
                exclude.map(NodeId),
            );
            report_availability(json, name, available)
        }
        Commands::CheckPath { path, exclude } => {
            let available = container
                .open(ns)?
                .check_path_available(path, exclude.map(NodeId))?;
            report_availability(json, path, available)
        }
        Commands::Path { id } => {
            let path = container.open(ns)?.ancestor_path(NodeId(*id));
            emit(json, &path, || output::info(&path.join(" / ")))
        }
        Commands::Leaves => {
            let ids = container.open(ns)?.leaf_ids();
            emit(json, &ids, || output::info(&join_ids(&ids)))
        }
        Commands::Subtree { id } => {
            let ids = container.open(ns)?.subtree_ids(NodeId(*id))?;
            emit(json, &ids, || output::info(&join_ids(&ids)))
        }
        Commands::KeepAlive => {
            let names = container.open(ns)?.keep_alive_names();
            emit(json, &names, || names.iter().for_each(|n| output::info(n)))
        }
        Commands::Export { output: target } => {
            let snapshot = container.open(ns)?.snapshot();
            let content = to_json(&snapshot)?;
            match target {
                Some(path) => {
                    container
                        .fs
                        .write(path, &content)
                        .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
                    output::action("Exported", &path.display());
                }
                None => output::info(&content),
            }
            Ok(())
        }
        Commands::Import { file } => {
            let content = container
                .fs
                .read_to_string(file)
                .map_err(|e| InfraError::io(format!("read {}", file.display()), e))?;
            let nodes = match serde_json::from_str::<ImportDocument>(&content)
                .map_err(|e| InfraError::serialization(format!("parse {}", file.display()), e))?
            {
                ImportDocument::Nodes(nodes) | ImportDocument::Snapshot { nodes } => nodes,
            };
            let roots = container.open(ns)?.import(nodes)?;
            container.save(ns)?;
            emit(json, &roots, || {
                output::action("Imported roots", &join_ids(&roots))
            })
        }
        Commands::Refs { command } => cmd_refs(container, ns, json, command),
        Commands::Completion { .. } | Commands::Config { .. } => Ok(()),
    }
}

#[instrument(skip(container))]
fn cmd_init(container: &ServiceContainer, ns: &str, kind: TreeKind) -> CliResult<()> {
    container.init_namespace(ns, kind)?;
    output::success(&format!("created {} namespace '{}'", kind, ns));
    Ok(())
}

#[instrument(skip(container, json))]
fn cmd_list(container: &ServiceContainer, ns: &str, json: bool, args: &ListArgs) -> CliResult<()> {
    let query = ListQuery {
        keyword: args.keyword.clone(),
        status: args.status,
        parent_id: args.parent.map(NodeId),
        page: args.page,
        page_size: args.page_size,
    };
    let page = container.open(ns)?.list_flattened(&query)?;
    let records: Vec<Node> = page.records.iter().map(Node::detached).collect();
    emit(json, &page, || {
        for node in &records {
            output::info(&format!(
                "{}{}",
                "  ".repeat(node.level.saturating_sub(1) as usize),
                output::node_line(node)
            ));
        }
        output::detail(&format!(
            "page {}/{} ({} total)",
            page.current_page, page.total_pages, page.total
        ));
    })
}

fn draft_from_args(kind: TreeKind, args: &CreateArgs) -> CliResult<NodeDraft> {
    let payload = match kind {
        TreeKind::Menu => {
            if args.description.is_some() {
                return Err(CliError::InvalidArgs(
                    "--description applies to category namespaces".into(),
                ));
            }
            Payload::Menu(MenuPayload {
                path: args.path.clone().unwrap_or_default(),
                route_name: args.route_name.clone().unwrap_or_default(),
                component: args.component.clone().unwrap_or_default(),
                icon: args.icon.clone().unwrap_or_default(),
                permission: args.permission.clone().unwrap_or_default(),
                menu_type: args.menu_type.unwrap_or_default(),
                visible: !args.hidden,
                keep_alive: args.keep_alive,
                ..MenuPayload::default()
            })
        }
        TreeKind::Category => {
            let menu_only = args.path.is_some()
                || args.route_name.is_some()
                || args.component.is_some()
                || args.menu_type.is_some()
                || args.hidden
                || args.keep_alive;
            if menu_only {
                return Err(CliError::InvalidArgs(
                    "menu options given for a category namespace".into(),
                ));
            }
            Payload::Category(CategoryPayload {
                description: args.description.clone(),
            })
        }
    };
    Ok(NodeDraft {
        label: args.label.clone(),
        sort: args.sort,
        status: args.status.unwrap_or_default(),
        payload,
    })
}

#[instrument(skip(container, json))]
fn cmd_create(container: &ServiceContainer, ns: &str, json: bool, args: &CreateArgs) -> CliResult<()> {
    let service = container.open(ns)?;
    let draft = draft_from_args(service.kind(), args)?;
    let node = service.create(args.parent.map(NodeId), draft)?;
    container.save(ns)?;
    emit(json, &node, || output::action("Created", &node))
}

#[instrument(skip(container, json))]
fn cmd_delete(
    container: &ServiceContainer,
    ns: &str,
    json: bool,
    ids: &[u64],
    cascade: bool,
) -> CliResult<()> {
    let service = container.open(ns)?;
    let ids: Vec<NodeId> = ids.iter().copied().map(NodeId).collect();
    if let [id] = ids.as_slice() {
        let removed = service.delete(*id, cascade)?;
        container.save(ns)?;
        return emit(json, &removed, || {
            output::action("Deleted", &join_ids(&removed))
        });
    }

    let outcome = service.delete_batch(&ids, cascade);
    if !outcome.deleted_ids.is_empty() {
        container.save(ns)?;
    }
    emit(json, &outcome, || {
        output::action("Deleted", &join_ids(&outcome.deleted_ids));
        for err in &outcome.errors {
            output::failure(&format!("{}: {}", err.id, err.message));
        }
    })
}

fn cmd_sort(container: &ServiceContainer, ns: &str, json: bool, items: &[SortItem]) -> CliResult<()> {
    let outcome = container.open(ns)?.update_sort(items);
    container.save(ns)?;
    emit(json, &outcome, || {
        output::action("Updated", &join_ids(&outcome.updated));
        if !outcome.skipped.is_empty() {
            output::warning(&format!("unknown ids skipped: {}", join_ids(&outcome.skipped)));
        }
    })
}

fn cmd_refs(
    container: &ServiceContainer,
    ns: &str,
    json: bool,
    command: &RefsCommands,
) -> CliResult<()> {
    let references = container.references(ns)?;
    match command {
        RefsCommands::Add { name, category } => {
            let category = NodeId(*category);
            // must point at an existing node
            container.open(ns)?.get_by_id(category)?;
            let resource = references.add(name.as_str(), category);
            container.save(ns)?;
            emit(json, &resource, || {
                output::action(
                    "Added",
                    &format!("{} [{}] -> {}", resource.name, resource.id, category),
                )
            })
        }
        RefsCommands::List { category } => {
            let resources = if category.is_empty() {
                references.resources()
            } else {
                let ids: Vec<NodeId> = category.iter().copied().map(NodeId).collect();
                references.by_categories(&ids)
            };
            emit(json, &resources, || {
                for r in &resources {
                    output::info(&format!("{} [{}] -> {}", r.name, r.id, r.category_id));
                }
            })
        }
    }
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(cli.data_dir.as_deref())?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            let settings = Settings::load(cli.data_dir.as_deref())?;
            match global_config_path() {
                Some(path) => output::action("Global", &path.display()),
                None => output::warning("no config directory on this platform"),
            }
            output::action("Local", &local_config_path(&settings.data_dir).display());
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}

fn show_node(node: &Node) {
    output::header(&format!("{} [{}]", node.label, node.id));
    let parent = node
        .parent_id
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".into());
    output::detail(&format!("parent:  {}", parent));
    output::detail(&format!("level:   {}", node.level));
    output::detail(&format!("sort:    {}", node.sort));
    output::detail(&format!("status:  {}", node.status));
    output::detail(&format!("updated: {}", node.updated_at.to_rfc3339()));
    match &node.payload {
        Payload::Menu(menu) => {
            output::detail(&format!("path:    {}", menu.path));
            output::detail(&format!("route:   {}", menu.route_name));
            output::detail(&format!("type:    {:?}", menu.menu_type));
            output::detail(&format!("visible: {}", menu.visible));
        }
        Payload::Category(category) => {
            if let Some(description) = &category.description {
                output::detail(&format!("about:   {}", description));
            }
        }
    }
}

fn report_availability(json: bool, value: &str, available: bool) -> CliResult<()> {
    debug!("'{}' available: {}", value, available);
    #[derive(Serialize)]
    struct Availability<'a> {
        value: &'a str,
        available: bool,
    }
    emit(json, &Availability { value, available }, || {
        if available {
            output::success(&format!("'{}' is available", value));
        } else {
            output::failure(&format!("'{}' is taken", value));
        }
    })
}

fn join_ids(ids: &[NodeId]) -> String {
    ids.iter().join(" ")
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| InfraError::serialization("encode output", e).into())
}

/// Print `value` as JSON, or run the human-readable renderer.
fn emit<T: Serialize + ?Sized>(json: bool, value: &T, human: impl FnOnce()) -> CliResult<()> {
    if json {
        output::info(&to_json(value)?);
    } else {
        human();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_menu_flags_on_category_namespace_when_building_draft_then_invalid_args() {
        let args = CreateArgs {
            label: "Readers".into(),
            path: Some("/readers".into()),
            ..CreateArgs::default()
        };
        assert!(matches!(
            draft_from_args(TreeKind::Category, &args),
            Err(CliError::InvalidArgs(_))
        ));
    }

    #[test]
    fn given_menu_args_when_building_draft_then_payload_carries_route() {
        let args = CreateArgs {
            label: "Home".into(),
            path: Some("/home".into()),
            hidden: true,
            keep_alive: true,
            ..CreateArgs::default()
        };

        let draft = draft_from_args(TreeKind::Menu, &args).expect("draft");

        let menu = draft.payload.as_menu().expect("menu payload");
        assert_eq!(menu.path, "/home");
        assert!(!menu.visible);
        assert!(menu.keep_alive);
    }

    #[test]
    fn given_exported_snapshot_when_parsing_import_then_nodes_extracted() {
        let doc = r#"{"namespace":"menu","kind":"menu","nodes":[]}"#;
        let parsed: ImportDocument = serde_json::from_str(doc).expect("parse");
        assert!(matches!(parsed, ImportDocument::Snapshot { nodes } if nodes.is_empty()));
    }
}
