//! Resource tree nodes and stored entries.

use crate::document;
use crate::route::RouteToken;
use bytes::Bytes;
use serde_json::Value;

use super::StoreError;

/// The atomic stored unit: JSON text plus an optional binary payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    json: String,
    document: Value,
    binary: Option<Bytes>,
}

impl Entry {
    /// Parse `json` and build an entry. Fails without side effects on
    /// malformed JSON.
    pub fn parse(json: impl Into<String>, binary: Option<Bytes>) -> Result<Self, StoreError> {
        let json = json.into();
        let document = serde_json::from_str(&json)?;
        Ok(Self {
            json,
            document,
            binary,
        })
    }

    pub fn from_document(document: Value, binary: Option<Bytes>) -> Self {
        Self {
            json: document.to_string(),
            document,
            binary,
        }
    }

    pub fn json(&self) -> &str {
        &self.json
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn binary(&self) -> Option<&Bytes> {
        self.binary.as_ref()
    }

    /// Identity value of this entry for `key_property`; `None` if absent or null.
    pub fn key_value(&self, key_property: &str) -> Option<String> {
        document::property_string(&self.document, key_property)
    }

    /// True when the entry's identity equals `value`. The `None` sentinel
    /// matches entries that lack the property.
    pub fn has_key(&self, key_property: &str, value: Option<&str>) -> bool {
        self.key_value(key_property).as_deref() == value
    }
}

/// A node of the nested store.
///
/// Fixed path segments become plain resources; captured segments become
/// property resources named after the captured value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resource {
    name: String,
    is_property: bool,
    children: Vec<Resource>,
    entries: Vec<Entry>,
}

impl Resource {
    pub fn root() -> Self {
        Self::default()
    }

    fn for_token(token: &RouteToken) -> Self {
        match token {
            RouteToken::Resource { name } => Self::named(name, false),
            RouteToken::Property { value, .. } => Self::named(value, true),
        }
    }

    fn named(name: &str, is_property: bool) -> Self {
        Self {
            name: name.to_string(),
            is_property,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_property_resource(&self) -> bool {
        self.is_property
    }

    pub fn children(&self) -> &[Resource] {
        &self.children
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.entries.is_empty()
    }

    /// Fixed children compare case-insensitively, property children exactly.
    fn answers_to(&self, token: &RouteToken) -> bool {
        match token {
            RouteToken::Resource { name } => !self.is_property && self.name.eq_ignore_ascii_case(name),
            RouteToken::Property { value, .. } => self.is_property && self.name == *value,
        }
    }

    fn position_of(&self, token: &RouteToken) -> Option<usize> {
        self.children.iter().position(|child| child.answers_to(token))
    }

    pub fn child(&self, token: &RouteToken) -> Option<&Resource> {
        self.children.iter().find(|child| child.answers_to(token))
    }

    fn child_mut(&mut self, token: &RouteToken) -> Option<&mut Resource> {
        self.children.iter_mut().find(|child| child.answers_to(token))
    }

    fn child_or_insert(&mut self, token: &RouteToken) -> &mut Resource {
        let index = match self.position_of(token) {
            Some(index) => index,
            None => {
                self.children.push(Resource::for_token(token));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    pub fn descend(&self, tokens: &[RouteToken]) -> Option<&Resource> {
        let mut node = self;
        for token in tokens {
            node = node.child(token)?;
        }
        Some(node)
    }

    pub(crate) fn descend_mut(&mut self, tokens: &[RouteToken]) -> Option<&mut Resource> {
        let mut node = self;
        for token in tokens {
            node = node.child_mut(token)?;
        }
        Some(node)
    }

    pub(crate) fn descend_or_create(&mut self, tokens: &[RouteToken]) -> &mut Resource {
        let mut node = self;
        for token in tokens {
            node = node.child_or_insert(token);
        }
        node
    }

    /// Remove the child addressed by `token`, with its whole subtree.
    pub(crate) fn remove_child(&mut self, token: &RouteToken) -> Option<Resource> {
        self.position_of(token)
            .map(|index| self.children.remove(index))
    }

    pub fn find_entry(&self, key_property: &str, value: Option<&str>) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|entry| entry.has_key(key_property, value))
    }

    /// Store `entry`, replacing an entry with the same identity.
    ///
    /// Entries without an identity value are appended. Replacing an entry
    /// also replaces its property child and everything nested under it; a new
    /// identity reuses a child that already exists under that value.
    pub(crate) fn upsert(&mut self, key_property: Option<&str>, entry: Entry) {
        let identity = key_property.and_then(|key| entry.key_value(key).map(|value| (key, value)));

        let Some((key, value)) = identity else {
            self.entries.push(entry);
            return;
        };

        let child = RouteToken::property(key, value);
        match self
            .entries
            .iter()
            .position(|existing| existing.has_key(key, child.value()))
        {
            Some(index) => {
                self.entries[index] = entry;
                self.remove_child(&child);
                self.children.push(Resource::for_token(&child));
            }
            None => {
                self.entries.push(entry);
                self.child_or_insert(&child);
            }
        }
    }

    /// Remove at most one entry with the given identity, and its property child.
    pub(crate) fn remove_entry(&mut self, key_property: &str, value: Option<&str>) -> Option<Entry> {
        let index = self
            .entries
            .iter()
            .position(|entry| entry.has_key(key_property, value))?;
        let entry = self.entries.remove(index);

        if let Some(value) = value {
            self.remove_child(&RouteToken::property(key_property, value));
        }
        Some(entry)
    }
}
