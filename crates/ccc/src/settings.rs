// Copyright (c) Contributors to the ccc project.
// SPDX-License-Identifier: Apache-2.0

//! Hierarchical settings addressed by slash separated paths.
//!
//! A [`Settings`] tree holds scalars and sequences at its leaves and
//! insertion-ordered tables in between. A key can also be declared without a
//! value ([`Node::Unset`]); lookups treat such keys as having no value and hand
//! back the caller's default, but strict lookups still know the key exists.
//!
//! ```
//! use ccc::Settings;
//!
//! let mut settings = Settings::new();
//! settings.set("/cmake/cmd", "/usr/bin/cmake").unwrap();
//! settings.unset("/cmake/args", Some("computed by the configure step")).unwrap();
//!
//! assert_eq!(settings.get_or("cmake/cmd", "cmake".to_string()).unwrap(), "/usr/bin/cmake");
//! assert_eq!(settings.get_or("cmake/args", vec!["..".to_string()]).unwrap(), vec![".."]);
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::Value;

use crate::{Error, Result};

#[cfg(test)]
#[path = "./settings_test.rs"]
mod settings_test;

/// YAML tag that marks a declared key without a value (`key: !unset "why"`).
pub const UNSET_TAG: &str = "unset";

/// A root-anchored path into a settings tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath {
    segments: Vec<String>,
}

impl TreePath {
    /// Parse a slash separated path. Empty segments are ignored, so
    /// `/a/b`, `a/b` and `a//b/` all name the same key.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn join<S: Into<String>>(&self, segment: S) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    fn prefix(&self, len: usize) -> String {
        format!("/{}", self.segments[..len].join("/"))
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.segments.join("/"))
    }
}

impl From<&str> for TreePath {
    fn from(path: &str) -> Self {
        Self::parse(path)
    }
}

impl From<String> for TreePath {
    fn from(path: String) -> Self {
        Self::parse(&path)
    }
}

impl From<&String> for TreePath {
    fn from(path: &String) -> Self {
        Self::parse(path)
    }
}

impl From<&TreePath> for TreePath {
    fn from(path: &TreePath) -> Self {
        path.clone()
    }
}

/// One node of a settings tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A scalar or a sequence. Never holds a mapping.
    Value(Value),
    /// A nested table of named children.
    Table(IndexMap<String, Node>),
    /// A declared key that intentionally has no value.
    Unset(Option<String>),
}

impl Node {
    pub fn table() -> Self {
        Self::Table(IndexMap::new())
    }

    pub fn unset<S: Into<String>>(message: Option<S>) -> Self {
        Self::Unset(message.map(Into::into))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Self::Table(_))
    }

    /// Convert a parsed YAML document, turning mappings into tables and
    /// `!unset` tagged values into [`Node::Unset`].
    pub fn from_yaml(value: Value) -> Self {
        match value {
            Value::Mapping(mapping) => Self::Table(
                mapping
                    .into_iter()
                    .map(|(key, value)| (key_to_string(&key), Self::from_yaml(value)))
                    .collect(),
            ),
            Value::Tagged(tagged) if tagged.tag == UNSET_TAG => match tagged.value {
                Value::String(message) if !message.is_empty() => Self::Unset(Some(message)),
                _ => Self::Unset(None),
            },
            other => Self::Value(other),
        }
    }

    /// YAML rendering of this node, with unset markers kept as `!unset`.
    pub fn to_yaml(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Table(table) => Value::Mapping(
                table
                    .iter()
                    .map(|(k, v)| (Value::String(k.clone()), v.to_yaml()))
                    .collect(),
            ),
            Self::Unset(message) => Value::Tagged(Box::new(TaggedValue {
                tag: Tag::new(UNSET_TAG),
                value: message.clone().map(Value::String).unwrap_or(Value::Null),
            })),
        }
    }

    /// Plain YAML data of this node, leaving out unset children.
    fn to_value(&self) -> Value {
        match self {
            Self::Value(value) => value.clone(),
            Self::Table(table) => Value::Mapping(
                table
                    .iter()
                    .filter(|(_, v)| !v.is_unset())
                    .map(|(k, v)| (Value::String(k.clone()), v.to_value()))
                    .collect(),
            ),
            Self::Unset(_) => Value::Null,
        }
    }

    /// Deserialize this node into `T`, naming `path` on failure.
    pub fn deserialize<T: DeserializeOwned>(&self, path: &TreePath) -> Result<T> {
        serde_yaml::from_value(self.to_value()).map_err(|error| Error::InvalidValue {
            key: path.to_string(),
            error,
        })
    }
}

fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => "~".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

impl From<Value> for Node {
    fn from(value: Value) -> Self {
        Self::from_yaml(value)
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Node {
    fn from(value: String) -> Self {
        Self::Value(Value::String(value))
    }
}

impl From<bool> for Node {
    fn from(value: bool) -> Self {
        Self::Value(Value::Bool(value))
    }
}

impl From<i64> for Node {
    fn from(value: i64) -> Self {
        Self::Value(Value::Number(value.into()))
    }
}

impl From<&Path> for Node {
    fn from(value: &Path) -> Self {
        Self::from(value.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Node {
    fn from(value: PathBuf) -> Self {
        Self::from(value.as_path())
    }
}

impl From<&PathBuf> for Node {
    fn from(value: &PathBuf) -> Self {
        Self::from(value.as_path())
    }
}

impl From<Vec<String>> for Node {
    fn from(values: Vec<String>) -> Self {
        Self::Value(Value::Sequence(
            values.into_iter().map(Value::String).collect(),
        ))
    }
}

impl From<Vec<&str>> for Node {
    fn from(values: Vec<&str>) -> Self {
        Self::from(values.into_iter().map(String::from).collect::<Vec<_>>())
    }
}

/// How lookups of undeclared keys behave.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LookupMode {
    /// Undeclared keys fall back to the caller's default.
    #[default]
    Lenient,
    /// Undeclared keys are an [`Error::MissingKey`].
    Strict,
}

/// A tree of settings for one invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    root: Node,
    mode: LookupMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: Node::table(),
            mode: LookupMode::default(),
        }
    }
}

impl Settings {
    /// Create an empty, lenient tree.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lenient() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self {
            mode: LookupMode::Strict,
            ..Self::default()
        }
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: LookupMode) {
        self.mode = mode;
    }

    /// Build a tree from a YAML document. `null` documents give an empty tree.
    pub fn from_yaml(value: Value) -> std::result::Result<Self, serde_yaml::Error> {
        match Node::from_yaml(value) {
            root @ Node::Table(_) => Ok(Self {
                root,
                ..Self::default()
            }),
            Node::Value(Value::Null) => Ok(Self::default()),
            _ => Err(<serde_yaml::Error as serde::de::Error>::custom(
                "expected a mapping at the top level",
            )),
        }
    }

    /// The node stored at `path`, without applying unset or mode rules.
    ///
    /// Descending into an unset key yields that key's marker, since nothing
    /// below a key without a value has a value either.
    fn find(&self, path: &TreePath) -> Result<Option<&Node>> {
        let mut current = &self.root;
        for (depth, segment) in path.segments().iter().enumerate() {
            match current {
                Node::Table(table) => match table.get(segment) {
                    Some(child) => current = child,
                    None => return Ok(None),
                },
                Node::Unset(_) => return Ok(Some(current)),
                Node::Value(_) => {
                    return Err(Error::NotATable {
                        path: path.to_string(),
                        segment: path.prefix(depth),
                    });
                }
            }
        }
        Ok(Some(current))
    }

    /// Look up the node at `path`.
    ///
    /// Returns `None` for unset keys, and for undeclared keys when lenient.
    pub fn get<P: Into<TreePath>>(&self, path: P) -> Result<Option<&Node>> {
        let path = path.into();
        match self.find(&path)? {
            Some(Node::Unset(_)) => Ok(None),
            Some(node) => Ok(Some(node)),
            None if self.mode == LookupMode::Strict => Err(Error::MissingKey(path.to_string())),
            None => Ok(None),
        }
    }

    /// The value at `path`, or `default` if it has none.
    pub fn get_or<P, T>(&self, path: P, default: T) -> Result<T>
    where
        P: Into<TreePath>,
        T: DeserializeOwned,
    {
        Ok(self.get_opt(path)?.unwrap_or(default))
    }

    pub fn get_opt<P, T>(&self, path: P) -> Result<Option<T>>
    where
        P: Into<TreePath>,
        T: DeserializeOwned,
    {
        let path = path.into();
        self.get(&path)?
            .map(|node| node.deserialize(&path))
            .transpose()
    }

    /// The value at `path`, which `step` cannot run without.
    pub fn require<P, T>(&self, path: P, step: &str) -> Result<T>
    where
        P: Into<TreePath>,
        T: DeserializeOwned,
    {
        let path = path.into();
        match self.find(&path)? {
            Some(node) if !node.is_unset() => node.deserialize(&path),
            _ => Err(Error::MissingConfiguration {
                key: path.to_string(),
                step: step.to_string(),
            }),
        }
    }

    /// True if `path` holds a value (declared unset keys do not count).
    pub fn contains<P: Into<TreePath>>(&self, path: P) -> bool {
        matches!(self.find(&path.into()), Ok(Some(node)) if !node.is_unset())
    }

    /// True if `path` was ever set or declared.
    pub fn is_declared<P: Into<TreePath>>(&self, path: P) -> bool {
        matches!(self.find(&path.into()), Ok(Some(_)))
    }

    /// Store `value` at `path`, creating intermediate tables as needed.
    pub fn set<P, V>(&mut self, path: P, value: V) -> Result<()>
    where
        P: Into<TreePath>,
        V: Into<Node>,
    {
        let path = path.into();
        let node = value.into();
        let Some((last, parents)) = path.segments().split_last() else {
            return match node {
                Node::Table(_) => {
                    self.root = node;
                    Ok(())
                }
                _ => Err(Error::NotATable {
                    path: path.to_string(),
                    segment: path.to_string(),
                }),
            };
        };

        let mut current = &mut self.root;
        for (depth, segment) in parents.iter().enumerate() {
            let Node::Table(table) = current else {
                return Err(Error::NotATable {
                    path: path.to_string(),
                    segment: path.prefix(depth),
                });
            };
            let child = table.entry(segment.clone()).or_insert_with(Node::table);
            if child.is_unset() {
                *child = Node::table();
            }
            current = child;
        }

        match current {
            Node::Table(table) => {
                table.insert(last.clone(), node);
                Ok(())
            }
            _ => Err(Error::NotATable {
                path: path.to_string(),
                segment: path.prefix(parents.len()),
            }),
        }
    }

    /// Declare `path` without a value.
    pub fn unset<P, S>(&mut self, path: P, message: Option<S>) -> Result<()>
    where
        P: Into<TreePath>,
        S: Into<String>,
    {
        self.set(path, Node::unset(message))
    }

    /// Set `path` only if it has never been set or declared.
    pub fn declare<P, V>(&mut self, path: P, value: V) -> Result<()>
    where
        P: Into<TreePath>,
        V: Into<Node>,
    {
        let path = path.into();
        if self.is_declared(&path) {
            return Ok(());
        }
        self.set(path, value)
    }

    /// Overlay the leaves of `other` onto this tree.
    ///
    /// Leaves found in both trees take the value from `other`; everything else
    /// from either tree is kept.
    pub fn update(&mut self, other: &Settings) {
        match (&mut self.root, &other.root) {
            (Node::Table(base), Node::Table(overlay)) => merge_tables(base, overlay),
            (root, overlay) => *root = overlay.clone(),
        }
    }

    /// Every path that holds a value, in traversal order.
    pub fn leaf_paths(&self) -> LeafPaths<'_> {
        let stack = match &self.root {
            Node::Table(table) => vec![table.iter()],
            _ => Vec::new(),
        };
        LeafPaths {
            prefix: Vec::new(),
            stack,
        }
    }

    /// YAML rendering of the whole tree.
    pub fn to_yaml(&self) -> Value {
        self.root.to_yaml()
    }
}

fn merge_tables(base: &mut IndexMap<String, Node>, overlay: &IndexMap<String, Node>) {
    for (key, value) in overlay {
        if let (Some(Node::Table(base_table)), Node::Table(overlay_table)) =
            (base.get_mut(key), value)
        {
            merge_tables(base_table, overlay_table);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

/// Lazy iterator over the leaf paths of a [`Settings`] tree.
pub struct LeafPaths<'a> {
    prefix: Vec<&'a str>,
    stack: Vec<indexmap::map::Iter<'a, String, Node>>,
}

impl Iterator for LeafPaths<'_> {
    type Item = TreePath;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entries = self.stack.last_mut()?;
            match entries.next() {
                None => {
                    self.stack.pop();
                    self.prefix.pop();
                }
                Some((key, Node::Table(table))) => {
                    self.prefix.push(key.as_str());
                    self.stack.push(table.iter());
                }
                Some((_, Node::Unset(_))) => {}
                Some((key, Node::Value(_))) => {
                    let mut segments: Vec<String> =
                        self.prefix.iter().map(|s| s.to_string()).collect();
                    segments.push(key.clone());
                    return Some(TreePath { segments });
                }
            }
        }
    }
}
