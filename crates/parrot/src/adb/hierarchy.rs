//! UI hierarchy dumps: capture, parsing and element resolution

use std::fmt;
use std::path::Path;

use lazy_static::lazy_static;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::executor::CommandExecutor;
use super::shell::ShellBridge;
use crate::error::{AdbError, Result};

lazy_static! {
    static ref BOUNDS_RE: Regex =
        Regex::new(r"^\s*\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]\s*$").expect("valid bounds regex");
}

/// A point in device pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Coordinate {
    pub x: i32,
    pub y: i32,
}

impl Coordinate {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Midpoint of a `"[x1,y1][x2,y2]"` bounds string, or `None` if malformed
pub fn bounds_center(bounds: &str) -> Option<Coordinate> {
    let caps = BOUNDS_RE.captures(bounds)?;
    let mut values = [0i64; 4];
    for (slot, value) in values.iter_mut().zip(caps.iter().skip(1)) {
        *slot = value?.as_str().parse::<i32>().ok()?.into();
    }
    let [x1, y1, x2, y2] = values;
    Some(Coordinate::new(
        i32::try_from((x1 + x2).div_euclid(2)).ok()?,
        i32::try_from((y1 + y2).div_euclid(2)).ok()?,
    ))
}

/// One element of a hierarchy dump
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiNode {
    pub tag: String,
    pub resource_id: Option<String>,
    pub text: Option<String>,
    pub content_desc: Option<String>,
    pub class_name: Option<String>,
    pub bounds: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<UiNode>,
}

impl UiNode {
    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let mut node = UiNode {
            tag: String::from_utf8_lossy(element.name().as_ref()).into_owned(),
            ..Default::default()
        };

        for attr in element.attributes() {
            let attr = attr.map_err(|e| AdbError::ParseError(format!("bad attribute: {e}")))?;
            let raw = String::from_utf8_lossy(&attr.value);
            let value = quick_xml::escape::unescape(&raw)
                .map_err(|e| AdbError::ParseError(format!("bad attribute value: {e}")))?
                .into_owned();

            match attr.key.as_ref() {
                b"resource-id" => node.resource_id = Some(value),
                b"text" => node.text = Some(value),
                b"content-desc" => node.content_desc = Some(value),
                b"class" => node.class_name = Some(value),
                b"bounds" => node.bounds = Some(value),
                _ => {}
            }
        }

        Ok(node)
    }

    /// Center of this node's bounds
    pub fn center(&self) -> Option<Coordinate> {
        self.bounds.as_deref().and_then(bounds_center)
    }
}

/// Parsed hierarchy dump rooted at the document element
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenDump {
    pub root: UiNode,
}

impl ScreenDump {
    /// Read and parse a dump file from the host
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|e| {
            AdbError::ParseError(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&xml)
    }

    /// Parse hierarchy XML
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<UiNode> = Vec::new();
        let mut root: Option<UiNode> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| AdbError::ParseError(format!("XML parse error: {e}")))?;

            match event {
                Event::Start(ref e) => {
                    if root.is_some() {
                        return Err(AdbError::ParseError("content after root element".into()));
                    }
                    stack.push(UiNode::from_element(e)?);
                }
                Event::Empty(ref e) => {
                    let node = UiNode::from_element(e)?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| AdbError::ParseError("unbalanced end tag".into()))?;
                    attach(&mut stack, &mut root, node)?;
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(AdbError::ParseError("unexpected end of document".into()));
        }
        root.map(|root| ScreenDump { root })
            .ok_or_else(|| AdbError::ParseError("document has no root element".into()))
    }

    /// Depth-first traversal in document order, root included
    pub fn nodes(&self) -> Nodes<'_> {
        Nodes {
            stack: vec![&self.root],
        }
    }

    /// Center of the first node whose resource id or text matches.
    ///
    /// Either criterion qualifies a node; pass one at a time to avoid
    /// ambiguity. Returns `None` when nothing matches or when the first match
    /// has missing or malformed bounds.
    pub fn resolve_coordinate(
        &self,
        resource_id: Option<&str>,
        text: Option<&str>,
    ) -> Option<Coordinate> {
        self.nodes()
            .find(|node| {
                let id_match = resource_id.is_some() && node.resource_id.as_deref() == resource_id;
                let text_match = text.is_some() && node.text.as_deref() == text;
                id_match || text_match
            })
            .and_then(UiNode::center)
    }

    /// Text of the first node with exactly this resource id
    pub fn resolve_text(&self, resource_id: &str) -> Option<String> {
        self.nodes()
            .find(|node| node.resource_id.as_deref() == Some(resource_id))
            .and_then(|node| node.text.clone())
    }
}

fn attach(stack: &mut [UiNode], root: &mut Option<UiNode>, node: UiNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => return Err(AdbError::ParseError("multiple root elements".into())),
    }
    Ok(())
}

/// Pre-order iterator over a [`ScreenDump`]
pub struct Nodes<'a> {
    stack: Vec<&'a UiNode>,
}

impl<'a> Iterator for Nodes<'a> {
    type Item = &'a UiNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Captures hierarchy dumps from the selected device
pub struct UiInspector<'a, E> {
    bridge: ShellBridge<'a, E>,
    dump_path: &'a str,
}

impl<'a, E: CommandExecutor> UiInspector<'a, E> {
    pub fn new(bridge: ShellBridge<'a, E>, dump_path: &'a str) -> Self {
        Self { bridge, dump_path }
    }

    /// Dump the current screen on the device and pull it to `host_path`.
    ///
    /// Every call re-dumps; nothing is cached.
    pub async fn dump_hierarchy(&self, host_path: &Path) -> Result<()> {
        debug!("Dumping UI hierarchy to {}", self.dump_path);
        self.bridge
            .shell(&["uiautomator", "dump", self.dump_path])
            .await?;
        self.bridge.pull(self.dump_path, host_path).await?;
        Ok(())
    }

    /// Dump, pull and parse the current screen
    pub async fn capture(&self, host_path: &Path) -> Result<ScreenDump> {
        self.dump_hierarchy(host_path).await?;
        ScreenDump::from_file(host_path)
    }
}
