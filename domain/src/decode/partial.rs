//! Partial document reconstruction from a truncated token stream.
//!
//! A token stream cut at an arbitrary point is parsed into a tree whose
//! nodes are either closed (a complete JSON value) or still open. Only
//! closed values are ever reported as known; open arrays additionally
//! expose the elements that are already complete.

use super::lexer::Token;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Envelope key carrying the action sub-document.
pub const ACTION_KEY: &str = "function";
/// Accepted alternative for [`ACTION_KEY`].
pub const ACTION_KEY_ALIAS: &str = "action";

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Closed(Value),
    /// Closed, but contains text that is not valid JSON.
    Broken,
    Object(Vec<(String, Node)>),
    Array(Vec<Node>),
    /// A key was read but its value has not started or is not terminated.
    Pending,
}

impl Node {
    fn is_open(&self) -> bool {
        matches!(self, Node::Object(_) | Node::Array(_) | Node::Pending)
    }
}

struct TreeParser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TreeParser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn value(&mut self) -> Node {
        match self.next() {
            None => Node::Pending,
            Some(Token::BeginObject) => self.object(),
            Some(Token::BeginArray) => self.array(),
            Some(Token::Str(s)) => Node::Closed(Value::String(s.clone())),
            Some(Token::Scalar(v)) => Node::Closed(v.clone()),
            Some(_) => Node::Broken,
        }
    }

    fn object(&mut self) -> Node {
        let mut members: Vec<(String, Node)> = Vec::new();
        let mut broken = false;
        loop {
            match self.next() {
                None => return Node::Object(members),
                Some(Token::EndObject) => {
                    return close_object(members, broken);
                }
                Some(Token::Comma) => {}
                Some(Token::Str(key)) => {
                    match self.peek() {
                        None => {
                            members.push((key.clone(), Node::Pending));
                            return Node::Object(members);
                        }
                        Some(Token::Colon) => {
                            self.pos += 1;
                        }
                        Some(_) => {
                            broken = true;
                            continue;
                        }
                    }
                    let value = self.value();
                    let open = value.is_open();
                    if matches!(value, Node::Broken) {
                        broken = true;
                    }
                    members.push((key.clone(), value));
                    if open {
                        return Node::Object(members);
                    }
                }
                Some(_) => broken = true,
            }
        }
    }

    fn array(&mut self) -> Node {
        let mut items: Vec<Node> = Vec::new();
        let mut broken = false;
        loop {
            match self.peek() {
                None => return Node::Array(items),
                Some(Token::EndArray) => {
                    self.pos += 1;
                    return close_array(items, broken);
                }
                Some(Token::Comma) => {
                    self.pos += 1;
                }
                Some(_) => {
                    let item = self.value();
                    let open = item.is_open();
                    if matches!(item, Node::Broken) {
                        broken = true;
                    }
                    // An item that is still pending carries no text yet.
                    if !matches!(item, Node::Pending) {
                        items.push(item);
                    }
                    if open {
                        return Node::Array(items);
                    }
                }
            }
        }
    }
}

fn close_object(members: Vec<(String, Node)>, broken: bool) -> Node {
    if broken {
        return Node::Broken;
    }
    let mut map = Map::new();
    for (key, node) in members {
        match node {
            Node::Closed(value) => {
                map.insert(key, value);
            }
            _ => return Node::Broken,
        }
    }
    Node::Closed(Value::Object(map))
}

fn close_array(items: Vec<Node>, broken: bool) -> Node {
    if broken {
        return Node::Broken;
    }
    let mut values = Vec::with_capacity(items.len());
    for node in items {
        match node {
            Node::Closed(value) => values.push(value),
            _ => return Node::Broken,
        }
    }
    Node::Closed(Value::Array(values))
}

/// Terminated members of one object, plus the complete elements of any of
/// its arrays that are still open.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FieldView {
    pub fields: BTreeMap<String, Value>,
    pub growing: BTreeMap<String, Vec<Value>>,
}

impl FieldView {
    fn from_members(members: &[(String, Node)]) -> Self {
        let mut view = FieldView::default();
        for (key, node) in members {
            match node {
                Node::Closed(value) => {
                    view.fields.insert(key.clone(), value.clone());
                }
                Node::Array(items) => {
                    let complete = items
                        .iter()
                        .filter_map(|item| match item {
                            Node::Closed(value) => Some(value.clone()),
                            _ => None,
                        })
                        .collect();
                    view.growing.insert(key.clone(), complete);
                }
                _ => {}
            }
        }
        view
    }

    fn from_map(map: &Map<String, Value>) -> Self {
        FieldView {
            fields: map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            growing: BTreeMap::new(),
        }
    }
}

/// Best currently extractable view of a step document.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct PartialDocument {
    pub envelope: FieldView,
    pub action: FieldView,
}

pub(crate) fn reconstruct(tokens: &[Token]) -> PartialDocument {
    let mut parser = TreeParser::new(tokens);
    if parser.peek() != Some(&Token::BeginObject) {
        return PartialDocument::default();
    }
    match parser.value() {
        Node::Closed(Value::Object(map)) => {
            let action = action_value(&map)
                .and_then(Value::as_object)
                .map(FieldView::from_map)
                .unwrap_or_default();
            PartialDocument {
                envelope: FieldView::from_map(&map),
                action,
            }
        }
        Node::Object(members) => {
            let envelope = FieldView::from_members(&members);
            let action = members
                .iter()
                .rev()
                .find(|(key, _)| key == ACTION_KEY || key == ACTION_KEY_ALIAS)
                .map(|(_, node)| match node {
                    Node::Object(inner) => FieldView::from_members(inner),
                    Node::Closed(Value::Object(map)) => FieldView::from_map(map),
                    _ => FieldView::default(),
                })
                .unwrap_or_default();
            PartialDocument { envelope, action }
        }
        _ => PartialDocument::default(),
    }
}

fn action_value(map: &Map<String, Value>) -> Option<&Value> {
    map.get(ACTION_KEY).or_else(|| map.get(ACTION_KEY_ALIAS))
}
