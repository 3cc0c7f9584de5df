//! Sidebar navigation tree.
//!
//! Nodes are created in an arena owned by [`NavigationBuilder`] and wired
//! together by id, which is how named groups can be shared between places
//! (and how cycles can sneak in). [`NavigationBuilder::build`] resolves the
//! arena into an owned [`NavigationTree`], rejecting cycles and links that
//! point at nothing.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, instrument};
use url::Url;

use docsets_shared::{
    DocsetsError, Document, NavDeclaration, NavGroupDeclaration, Result, normalize_id,
};

/// Handle to a node inside a [`NavigationBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum Slot {
    Link { label: String, target: String },
    Group { label: String, children: Vec<NodeId> },
}

impl Slot {
    fn label(&self) -> &str {
        match self {
            Slot::Link { label, .. } | Slot::Group { label, .. } => label,
        }
    }
}

/// Arena-backed builder for a navigation tree.
#[derive(Debug, Clone, Default)]
pub struct NavigationBuilder {
    slots: Vec<Slot>,
    roots: Vec<NodeId>,
}

impl NavigationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link node. `target` is a document identifier (with or
    /// without surrounding `/`) or an absolute http(s) URL.
    pub fn link(&mut self, label: impl Into<String>, target: impl Into<String>) -> NodeId {
        self.push(Slot::Link {
            label: label.into(),
            target: target.into(),
        })
    }

    /// Create an empty group node.
    pub fn group(&mut self, label: impl Into<String>) -> NodeId {
        self.push(Slot::Group {
            label: label.into(),
            children: Vec::new(),
        })
    }

    /// Append `child` to the group `parent`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check(child)?;
        match self.slots.get_mut(parent.0) {
            Some(Slot::Group { children, .. }) => {
                children.push(child);
                Ok(())
            }
            Some(Slot::Link { label, .. }) => Err(DocsetsError::validation(format!(
                "navigation link '{label}' cannot contain children"
            ))),
            None => Err(unknown_node(parent)),
        }
    }

    /// Append `node` to the top level.
    pub fn root(&mut self, node: NodeId) -> Result<()> {
        self.check(node)?;
        self.roots.push(node);
        Ok(())
    }

    /// Resolve into an owned tree.
    ///
    /// Fails with [`DocsetsError::CyclicReference`] when a group contains
    /// itself, directly or transitively, and with [`DocsetsError::DanglingLink`]
    /// when an internal link target is not in `known_ids`.
    #[instrument(skip_all, fields(nodes = self.slots.len(), roots = self.roots.len()))]
    pub fn build(&self, known_ids: &HashSet<&str>) -> Result<NavigationTree> {
        let mut path = Vec::new();
        let nodes = self
            .roots
            .iter()
            .map(|id| self.resolve(*id, known_ids, &mut path))
            .collect::<Result<Vec<_>>>()?;

        debug!(top_level = nodes.len(), "navigation tree built");
        Ok(NavigationTree { nodes })
    }

    fn push(&mut self, slot: Slot) -> NodeId {
        self.slots.push(slot);
        NodeId(self.slots.len() - 1)
    }

    fn check(&self, id: NodeId) -> Result<()> {
        if id.0 < self.slots.len() {
            Ok(())
        } else {
            Err(unknown_node(id))
        }
    }

    fn resolve(
        &self,
        id: NodeId,
        known_ids: &HashSet<&str>,
        path: &mut Vec<NodeId>,
    ) -> Result<NavigationNode> {
        let slot = self.slots.get(id.0).ok_or_else(|| unknown_node(id))?;

        if path.contains(&id) {
            return Err(DocsetsError::CyclicReference {
                label: slot.label().to_string(),
            });
        }

        match slot {
            Slot::Link { label, target } => {
                let resolved = resolve_target(target, known_ids).ok_or_else(|| {
                    DocsetsError::DanglingLink {
                        label: label.clone(),
                        target: target.clone(),
                    }
                })?;
                Ok(NavigationNode::Link {
                    label: label.clone(),
                    target: resolved,
                })
            }
            Slot::Group { label, children } => {
                path.push(id);
                let children = children
                    .iter()
                    .map(|child| self.resolve(*child, known_ids, path))
                    .collect::<Result<Vec<_>>>();
                path.pop();

                Ok(NavigationNode::Group {
                    label: label.clone(),
                    children: children?,
                })
            }
        }
    }
}

fn unknown_node(id: NodeId) -> DocsetsError {
    DocsetsError::validation(format!("navigation node #{} does not exist", id.0))
}

// ---------------------------------------------------------------------------
// Link targets
// ---------------------------------------------------------------------------

/// Where a link points once validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum LinkTarget {
    /// A document identifier in the collection.
    Document(String),
    /// An absolute http(s) URL.
    External(String),
}

/// Strip `#fragment`, `?query` and surrounding `/`; an empty result is `index`.
pub fn normalize_target(target: &str) -> &str {
    let target = target.trim();
    let end = target.find(['#', '?']).unwrap_or(target.len());
    match normalize_id(&target[..end]) {
        "" => "index",
        id => id,
    }
}

fn is_external(target: &str) -> bool {
    Url::parse(target.trim()).is_ok_and(|url| {
        matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty())
    })
}

fn resolve_target(target: &str, known_ids: &HashSet<&str>) -> Option<LinkTarget> {
    if is_external(target) {
        return Some(LinkTarget::External(target.trim().to_string()));
    }
    let id = normalize_target(target);
    known_ids
        .contains(id)
        .then(|| LinkTarget::Document(id.to_string()))
}

/// Identifier lookup set for [`NavigationBuilder::build`].
pub fn known_ids(documents: &[Document]) -> HashSet<&str> {
    documents.iter().map(|d| d.id.as_str()).collect()
}

// ---------------------------------------------------------------------------
// Resolved tree
// ---------------------------------------------------------------------------

/// A validated navigation node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NavigationNode {
    Link { label: String, target: LinkTarget },
    Group {
        label: String,
        children: Vec<NavigationNode>,
    },
}

impl NavigationNode {
    pub fn label(&self) -> &str {
        match self {
            NavigationNode::Link { label, .. } | NavigationNode::Group { label, .. } => label,
        }
    }
}

/// The validated sidebar.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct NavigationTree {
    nodes: Vec<NavigationNode>,
}

impl NavigationTree {
    /// Translate `[[sidebar]]` declarations into builder calls and build.
    ///
    /// `{ group = "name" }` entries resolve against `named_groups`; every
    /// reference to the same name shares one arena node. An unknown name is a
    /// validation error.
    pub fn from_declaration(
        declarations: &[NavDeclaration],
        named_groups: &BTreeMap<String, NavGroupDeclaration>,
        known_ids: &HashSet<&str>,
    ) -> Result<Self> {
        let mut lowering = Lowering {
            builder: NavigationBuilder::new(),
            named_groups,
            named_nodes: HashMap::new(),
        };

        for declaration in declarations {
            let node = lowering.lower(declaration)?;
            lowering.builder.root(node)?;
        }

        lowering.builder.build(known_ids)
    }

    pub fn nodes(&self) -> &[NavigationNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Document identifiers linked anywhere in the tree, in visit order.
    pub fn document_ids(&self) -> Vec<&str> {
        fn walk<'a>(nodes: &'a [NavigationNode], out: &mut Vec<&'a str>) {
            for node in nodes {
                match node {
                    NavigationNode::Link {
                        target: LinkTarget::Document(id),
                        ..
                    } => out.push(id),
                    NavigationNode::Link { .. } => {}
                    NavigationNode::Group { children, .. } => walk(children, out),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.nodes, &mut out);
        out
    }

    /// Indented plain-text outline.
    pub fn render_text(&self) -> String {
        fn walk(nodes: &[NavigationNode], depth: usize, out: &mut String) {
            for node in nodes {
                let indent = "  ".repeat(depth);
                match node {
                    NavigationNode::Link { label, target } => {
                        let target = match target {
                            LinkTarget::Document(id) => format!("/{id}/"),
                            LinkTarget::External(url) => url.clone(),
                        };
                        out.push_str(&format!("{indent}- {label} -> {target}\n"));
                    }
                    NavigationNode::Group { label, children } => {
                        out.push_str(&format!("{indent}+ {label}\n"));
                        walk(children, depth + 1, out);
                    }
                }
            }
        }

        let mut out = String::new();
        walk(&self.nodes, 0, &mut out);
        out
    }
}

struct Lowering<'a> {
    builder: NavigationBuilder,
    named_groups: &'a BTreeMap<String, NavGroupDeclaration>,
    named_nodes: HashMap<&'a str, NodeId>,
}

impl<'a> Lowering<'a> {
    fn lower(&mut self, declaration: &'a NavDeclaration) -> Result<NodeId> {
        match declaration {
            NavDeclaration::Link { label, link } => Ok(self.builder.link(label, link)),
            NavDeclaration::Group { label, items } => {
                let group = self.builder.group(label);
                self.lower_items(group, items)?;
                Ok(group)
            }
            NavDeclaration::Reference { group: name } => {
                if let Some(node) = self.named_nodes.get(name.as_str()) {
                    return Ok(*node);
                }

                let (key, declared) = self.named_groups.get_key_value(name).ok_or_else(|| {
                    DocsetsError::validation(format!("sidebar references unknown group '{name}'"))
                })?;

                // Registered before lowering its items so self-references
                // resolve to this node.
                let group = self.builder.group(&declared.label);
                self.named_nodes.insert(key.as_str(), group);
                self.lower_items(group, &declared.items)?;
                Ok(group)
            }
        }
    }

    fn lower_items(&mut self, group: NodeId, items: &'a [NavDeclaration]) -> Result<()> {
        for item in items {
            let child = self.lower(item)?;
            self.builder.attach(group, child)?;
        }
        Ok(())
    }
}
