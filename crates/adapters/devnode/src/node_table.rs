//! Node table: minor numbers and node paths for every registry entry.

use std::path::{Path, PathBuf};

use smarthome_app::registry::Registry;
use smarthome_domain::kind::DeviceKind;

use crate::error::NodeError;

/// A registered device node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub minor: u32,
    pub identity: &'static str,
    pub kind: DeviceKind,
    pub path: PathBuf,
}

/// Nodes in minor order, fixed once registered.
#[derive(Debug)]
pub struct NodeTable {
    dev_root: PathBuf,
    nodes: Box<[Node]>,
}

impl NodeTable {
    /// Create one node per registry entry under `dev_root`; minor `i` is
    /// the `i`-th catalog entry.
    pub fn register(registry: &Registry, dev_root: impl Into<PathBuf>) -> Self {
        let dev_root = dev_root.into();
        let nodes = registry
            .iter()
            .zip(0u32..)
            .map(|((_, entry), minor)| {
                let node = Node {
                    minor,
                    identity: entry.identity(),
                    kind: entry.kind(),
                    path: dev_root.join(entry.identity()),
                };
                tracing::info!(
                    minor,
                    node = %node.path.display(),
                    device = node.identity,
                    "device node created"
                );
                node
            })
            .collect();
        Self { dev_root, nodes }
    }

    #[must_use]
    pub fn dev_root(&self) -> &Path {
        &self.dev_root
    }

    /// Resolve an external handle (minor number) to a device identity.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NoSuchMinor`] for an unassigned minor.
    pub fn resolve_identity(&self, minor: u32) -> Result<&'static str, NodeError> {
        usize::try_from(minor)
            .ok()
            .and_then(|index| self.nodes.get(index))
            .map(|node| node.identity)
            .ok_or(NodeError::NoSuchMinor(minor))
    }

    /// Resolve a node path to its minor number.
    ///
    /// A path without a root is taken relative to the device root, so
    /// `light_bedroom` and `/dev/light_bedroom` name the same node.
    ///
    /// # Errors
    ///
    /// Returns [`NodeError::NoSuchNode`] when nothing is registered there.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> Result<u32, NodeError> {
        let path = self.dev_root.join(path);
        self.nodes
            .iter()
            .find(|node| node.path == path)
            .map(|node| node.minor)
            .ok_or(NodeError::NoSuchNode(path))
    }

    /// Nodes in minor order.
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }
}
