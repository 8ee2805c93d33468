//! Document model
//!
//! A snapshot of an interactive element tree: nodes in paint order with
//! bounding boxes, parent links and optional embedded frames. Hosts that
//! mirror a real UI tree serialise it in this shape; tests build it in code.
//!
//! ```json
//! {"nodes":[
//!   {"id":1,"tag":"DIV","rect":{"x":0,"y":0,"width":800,"height":600}},
//!   {"id":2,"tag":"BUTTON","parent":1,"rect":{"x":10,"y":10,"width":100,"height":40}},
//!   {"id":3,"tag":"IFRAME","parent":1,"rect":{"x":200,"y":0,"width":400,"height":300},
//!    "frame":{"document":{"nodes":[...]}}},
//!   {"id":4,"tag":"IFRAME","rect":{"x":0,"y":400,"width":200,"height":200},"frame":"blocked"}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use anyhow::Context;

use super::hit_test::{FrameAccessError, Surface};

/// Element identifier, unique within one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(pub u32);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    pub x: f64,
    /// Top edge
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl Rect {
    /// Create a rectangle
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment test
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.x + self.width && py >= self.y && py < self.y + self.height
    }

    /// Center point
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Same box shifted by an offset
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Contents of an embedded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameContent {
    /// Same-origin document, coordinates relative to the frame's box
    Document(Box<Scene>),
    /// Cross-origin or otherwise inaccessible
    Blocked,
}

/// One element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Identifier
    pub id: ElementId,
    /// Upper-case tag name
    pub tag: String,
    /// Class list
    #[serde(default)]
    pub classes: Vec<String>,
    /// Element has a click handler attached
    #[serde(default)]
    pub on_click: bool,
    /// Bounding box in document coordinates
    pub rect: Rect,
    /// Parent element, `None` for roots
    #[serde(default)]
    pub parent: Option<ElementId>,
    /// Pointer overlay (cursor visuals); never hit
    #[serde(default)]
    pub overlay: bool,
    /// Embedded frame contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameContent>,
}

impl Node {
    /// Element with a tag and box
    pub fn new(id: u32, tag: &str, rect: Rect) -> Self {
        Self {
            id: ElementId(id),
            tag: tag.to_uppercase(),
            classes: Vec::new(),
            on_click: false,
            rect,
            parent: None,
            overlay: false,
            frame: None,
        }
    }

    /// Set the parent
    pub fn with_parent(mut self, parent: u32) -> Self {
        self.parent = Some(ElementId(parent));
        self
    }

    /// Add a class
    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    /// Attach a click handler
    pub fn with_click_handler(mut self) -> Self {
        self.on_click = true;
        self
    }

    /// Mark as pointer overlay
    pub fn as_overlay(mut self) -> Self {
        self.overlay = true;
        self
    }

    /// Embed a frame
    pub fn with_frame(mut self, content: FrameContent) -> Self {
        self.frame = Some(content);
        self
    }

    /// Whether the node hosts a nested document
    pub fn is_frame(&self) -> bool {
        self.frame.is_some() || self.tag.eq_ignore_ascii_case("IFRAME")
    }

    /// Whether the node carries a class
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    /// Whether focusing the node starts text entry
    pub fn accepts_text(&self) -> bool {
        matches!(self.tag.to_uppercase().as_str(), "INPUT" | "TEXTAREA")
    }
}

/// In-memory document, nodes in paint order (later paints on top)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Scene {
    /// Elements
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Scene {
    /// Empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from nodes
    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Load a layout snapshot from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file: {}", path.display()))?;
        let scene: Scene =
            serde_json::from_str(&content).context("Failed to parse scene file")?;
        Ok(scene)
    }

    /// Append a node on top of the paint order
    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }
}

impl Surface for Scene {
    fn element_at(&self, x: f64, y: f64) -> Option<ElementId> {
        self.nodes
            .iter()
            .rev()
            .find(|n| !n.overlay && n.rect.contains(x, y))
            .map(|n| n.id)
    }

    fn node(&self, id: ElementId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    fn frame_document(&self, id: ElementId) -> Result<&dyn Surface, FrameAccessError> {
        match self.node(id).and_then(|n| n.frame.as_ref()) {
            Some(FrameContent::Document(doc)) => Ok(&**doc),
            Some(FrameContent::Blocked) => Err(FrameAccessError::Blocked(id)),
            None => Err(FrameAccessError::NotLoaded(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topmost_wins() {
        let scene = Scene::from_nodes(vec![
            Node::new(1, "div", Rect::new(0.0, 0.0, 100.0, 100.0)),
            Node::new(2, "button", Rect::new(10.0, 10.0, 20.0, 20.0)).with_parent(1),
        ]);
        assert_eq!(scene.element_at(15.0, 15.0), Some(ElementId(2)));
        assert_eq!(scene.element_at(50.0, 50.0), Some(ElementId(1)));
        assert_eq!(scene.element_at(150.0, 50.0), None);
    }

    #[test]
    fn test_overlay_never_hit() {
        let mut scene = Scene::from_nodes(vec![Node::new(
            1,
            "button",
            Rect::new(0.0, 0.0, 100.0, 100.0),
        )]);
        scene.push(Node::new(99, "div", Rect::new(0.0, 0.0, 100.0, 100.0)).as_overlay());
        assert_eq!(scene.element_at(5.0, 5.0), Some(ElementId(1)));

        scene.push(Node::new(98, "div", Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(scene.element_at(5.0, 5.0), Some(ElementId(98)));
    }

    #[test]
    fn test_json_layout() {
        let json = r#"{"nodes":[
            {"id":1,"tag":"BUTTON","rect":{"x":0,"y":0,"width":10,"height":10},"on_click":true},
            {"id":2,"tag":"IFRAME","rect":{"x":20,"y":0,"width":10,"height":10},"frame":"blocked"},
            {"id":3,"tag":"IFRAME","rect":{"x":40,"y":0,"width":10,"height":10},
             "frame":{"document":{"nodes":[{"id":1,"tag":"A","rect":{"x":0,"y":0,"width":5,"height":5}}]}}}
        ]}"#;
        let scene: Scene = serde_json::from_str(json).unwrap();
        assert_eq!(scene.nodes.len(), 3);
        assert!(scene.nodes[0].on_click);
        assert!(matches!(
            scene.frame_document(ElementId(2)),
            Err(FrameAccessError::Blocked(_))
        ));
        let inner = scene.frame_document(ElementId(3)).unwrap();
        assert_eq!(inner.element_at(1.0, 1.0), Some(ElementId(1)));
    }
}
