//! `list`: print the workspace tree.

use async_trait::async_trait;
use yakumo_core::{CommandHandler, Extensions, Plugin, Result, Session};
use yakumo_workspaces::WorkspaceRegistry;

/// Registers the `list` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListPlugin;

impl Plugin for ListPlugin {
    fn name(&self) -> &'static str {
        "list"
    }

    fn apply(&self, extensions: &mut Extensions) {
        extensions.register(ListCommand);
    }
}

#[derive(Debug)]
struct ListCommand;

#[async_trait]
impl CommandHandler for ListCommand {
    fn name(&self) -> &str {
        "list"
    }

    async fn run(&self, session: &mut Session<'_>) -> Result<()> {
        for line in render_tree(&session.workspaces) {
            println!("{line}");
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Node {
    label: String,
    children: Vec<usize>,
    /// Nested workspace roots below this node, by path.
    roots: Vec<(String, usize)>,
}

/// Render the registry as a tree followed by a package/workspace count.
///
/// Packages hang below the innermost workspace root whose path contains
/// them.
#[must_use]
pub fn render_tree(registry: &WorkspaceRegistry) -> Vec<String> {
    let mut paths: Vec<&str> = registry.paths().collect();
    paths.sort_unstable();
    let Some((root_path, rest)) = paths.split_first() else {
        return Vec::new();
    };

    let label = |path: &str| {
        let name = registry.get(path).map_or("", |m| m.name());
        if path.is_empty() {
            name.to_string()
        } else {
            format!("{name} ({})", path.trim_start_matches('/'))
        }
    };

    let mut nodes = vec![Node {
        label: label(root_path),
        children: Vec::new(),
        roots: Vec::new(),
    }];
    let mut workspaces = 1;

    for path in rest {
        let idx = nodes.len();
        nodes.push(Node {
            label: label(path),
            children: Vec::new(),
            roots: Vec::new(),
        });
        let parent = find_parent(&nodes, 0, path);
        nodes[parent].children.push(idx);
        if registry.get(path).is_some_and(|m| m.is_workspace_root()) {
            nodes[parent].roots.push(((*path).to_string(), idx));
            workspaces += 1;
        }
    }

    let mut lines = Vec::with_capacity(nodes.len() + 1);
    print_node(&nodes, 0, &mut Vec::new(), &mut lines);
    lines.push(format!("{} packages, {workspaces} workspaces", rest.len()));
    lines
}

fn find_parent(nodes: &[Node], current: usize, path: &str) -> usize {
    for (prefix, idx) in &nodes[current].roots {
        if path
            .strip_prefix(prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
        {
            return find_parent(nodes, *idx, path);
        }
    }
    current
}

fn print_node(nodes: &[Node], idx: usize, indent: &mut Vec<bool>, lines: &mut Vec<String>) {
    let depth = indent.len();
    let prefix: String = indent
        .iter()
        .enumerate()
        .map(|(level, &last)| match (level + 1 == depth, last) {
            (true, true) => "└── ",
            (true, false) => "├── ",
            (false, true) => "    ",
            (false, false) => "│   ",
        })
        .collect();
    lines.push(format!("{prefix}{}", nodes[idx].label));

    let children = &nodes[idx].children;
    for (position, &child) in children.iter().enumerate() {
        indent.push(position + 1 == children.len());
        print_node(nodes, child, indent, lines);
        indent.pop();
    }
}
