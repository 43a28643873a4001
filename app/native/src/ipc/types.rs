//! Payload types for the sway/i3 IPC protocol.
//!
//! Only the fields the fader reads are modelled; everything else in the
//! JSON payloads is ignored during deserialization.

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Window Identity
// ============================================================================

/// Container id as reported by the window manager (`con_id`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WindowId(pub i64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Whether a window is tiled or floating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowKind {
    #[default]
    Normal,
    Floating,
}

/// A window handle: identifier plus the container kind last reported for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub id: WindowId,
    pub kind: WindowKind,
}

impl Window {
    #[must_use]
    pub const fn new(id: i64, kind: WindowKind) -> Self { Self { id: WindowId(id), kind } }

    #[must_use]
    pub const fn normal(id: i64) -> Self { Self::new(id, WindowKind::Normal) }

    #[must_use]
    pub const fn floating(id: i64) -> Self { Self::new(id, WindowKind::Floating) }

    #[must_use]
    pub const fn is_floating(&self) -> bool { matches!(self.kind, WindowKind::Floating) }
}

// ============================================================================
// Layout Tree
// ============================================================================

/// Node type in the layout tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Output,
    Workspace,
    #[default]
    Con,
    FloatingCon,
    Dockarea,
    #[serde(other)]
    Unknown,
}

/// A node of the layout tree returned by `GET_TREE` and embedded in events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    pub id: WindowId,

    #[serde(rename = "type", default)]
    pub node_type: NodeType,

    #[serde(default)]
    pub focused: bool,

    #[serde(default)]
    pub nodes: Vec<Self>,

    #[serde(default)]
    pub floating_nodes: Vec<Self>,
}

impl Node {
    /// Returns the container kind of this node.
    #[must_use]
    pub fn kind(&self) -> WindowKind {
        if self.node_type == NodeType::FloatingCon {
            WindowKind::Floating
        } else {
            WindowKind::Normal
        }
    }

    /// Returns this node as a window handle.
    #[must_use]
    pub fn window(&self) -> Window { Window { id: self.id, kind: self.kind() } }

    /// Returns whether this node is a leaf container holding an application window.
    #[must_use]
    pub fn is_window(&self) -> bool {
        matches!(self.node_type, NodeType::Con | NodeType::FloatingCon)
            && self.nodes.is_empty()
            && self.floating_nodes.is_empty()
    }

    /// Collects every window below (and including) this node, depth first.
    #[must_use]
    pub fn windows(&self) -> Vec<&Self> {
        let mut found = Vec::new();
        let mut stack = vec![self];

        while let Some(node) = stack.pop() {
            if node.is_window() {
                found.push(node);
                continue;
            }
            // Push in reverse so the walk visits children in document order.
            stack.extend(node.floating_nodes.iter().rev());
            stack.extend(node.nodes.iter().rev());
        }

        found
    }
}

// ============================================================================
// Events and Replies
// ============================================================================

/// The `change` field of a window event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowChange {
    New,
    Close,
    Focus,
    Title,
    FullscreenMode,
    Move,
    Floating,
    Urgent,
    Mark,
    #[serde(other)]
    Other,
}

/// Payload of a window event.
#[derive(Debug, Clone, Deserialize)]
pub struct WindowEvent {
    pub change: WindowChange,
    pub container: Node,
}

/// One entry of a `RUN_COMMAND` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Reply to `SUBSCRIBE`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeReply {
    pub success: bool,
}
