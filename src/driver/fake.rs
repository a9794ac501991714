//! In-memory document implementing [`PageCapability`] for unit tests.
//!
//! Supports the selector subset the discovery pipeline emits: tags, `#id`,
//! `.class`, `[attr]`, `[attr="v"]`, `[attr*="v"]`, `[attr^="v"]`, descendant
//! and `>` child combinators, selector lists, `:visible`, `:has-text()`, `:nth-of-type()` and
//! `:first-of-type`.

use super::error::PageError;
use super::traits::{NodeSummary, PageCapability, PageResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const BODY: usize = 1;

#[derive(Debug, Clone)]
pub struct FakeNode {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub checked: bool,
    pub value: Option<String>,
    pub hides_on_click: bool,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl FakeNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            attrs: BTreeMap::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            checked: false,
            value: None,
            hides_on_click: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn hides_on_click(mut self) -> Self {
        self.hides_on_click = true;
        self
    }
}

/// One recorded interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interaction {
    pub action: String,
    pub node: Option<usize>,
    pub value: Option<String>,
}

#[derive(Default)]
struct FakeState {
    nodes: Vec<FakeNode>,
    reveals: HashMap<usize, Vec<usize>>,
    fatal_selectors: HashSet<String>,
    broken_selectors: HashSet<String>,
    disconnected: bool,
    fail_screenshots: bool,
    interactions: Vec<Interaction>,
    screenshots: Vec<PathBuf>,
}

pub struct FakePage {
    state: Mutex<FakeState>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePage {
    /// Empty document containing `<html><body></body></html>`
    pub fn new() -> Self {
        let mut html = FakeNode::new("html");
        html.children.push(BODY);
        let mut body = FakeNode::new("body");
        body.parent = Some(0);
        Self {
            state: Mutex::new(FakeState {
                nodes: vec![html, body],
                ..Default::default()
            }),
        }
    }

    pub fn add(&self, parent: usize, mut node: FakeNode) -> usize {
        let mut state = self.state.lock().unwrap();
        let id = state.nodes.len();
        node.parent = Some(parent);
        state.nodes.push(node);
        state.nodes[parent].children.push(id);
        id
    }

    /// Hovering `trigger` makes `target` visible
    pub fn reveal_on_hover(&self, trigger: usize, target: usize) {
        let mut state = self.state.lock().unwrap();
        state.reveals.entry(trigger).or_default().push(target);
    }

    /// Queries of `selector` fail as if the page went away
    pub fn fail_fatally_on(&self, selector: &str) {
        self.state.lock().unwrap().fatal_selectors.insert(selector.to_string());
    }

    /// Queries of `selector` fail with a selector syntax error
    pub fn break_selector(&self, selector: &str) {
        self.state.lock().unwrap().broken_selectors.insert(selector.to_string());
    }

    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    pub fn fail_screenshots(&self) {
        self.state.lock().unwrap().fail_screenshots = true;
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.state.lock().unwrap().interactions.clone()
    }

    pub fn actions_on(&self, node: usize) -> Vec<String> {
        self.interactions()
            .into_iter()
            .filter(|i| i.node == Some(node))
            .map(|i| i.action)
            .collect()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    pub fn node(&self, id: usize) -> FakeNode {
        self.state.lock().unwrap().nodes[id].clone()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut FakeState) -> PageResult<T>) -> PageResult<T> {
        let mut state = self.state.lock().unwrap();
        if state.disconnected {
            return Err(PageError::Disconnected("page closed".into()));
        }
        f(&mut state)
    }

    fn record(state: &mut FakeState, action: &str, node: Option<usize>, value: Option<&str>) {
        state.interactions.push(Interaction {
            action: action.to_string(),
            node,
            value: value.map(str::to_string),
        });
    }
}

impl FakeState {
    fn document_order(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0usize];
        while let Some(id) = stack.pop() {
            order.push(id);
            for child in self.nodes[id].children.iter().rev() {
                stack.push(*child);
            }
        }
        order
    }

    fn ancestors(&self, id: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut current = self.nodes[id].parent;
        while let Some(p) = current {
            out.push(p);
            current = self.nodes[p].parent;
        }
        out
    }

    fn is_displayed(&self, id: usize) -> bool {
        self.nodes[id].visible && self.ancestors(id).iter().all(|a| self.nodes[*a].visible)
    }

    fn text_content(&self, id: usize) -> String {
        let node = &self.nodes[id];
        let mut text = node.text.clone();
        for child in &node.children {
            text.push_str(&self.text_content(*child));
        }
        text
    }

    fn nth_of_type(&self, id: usize) -> usize {
        let tag = &self.nodes[id].tag;
        match self.nodes[id].parent {
            Some(p) => {
                self.nodes[p]
                    .children
                    .iter()
                    .filter(|c| &self.nodes[**c].tag == tag)
                    .position(|c| *c == id)
                    .unwrap_or(0)
                    + 1
            }
            None => 1,
        }
    }

    fn query(&self, selector: &str) -> PageResult<Vec<usize>> {
        if self.fatal_selectors.contains(selector) {
            return Err(PageError::Disconnected(format!("lost page while querying {selector}")));
        }
        if self.broken_selectors.contains(selector) {
            return Err(PageError::InvalidSelector {
                selector: selector.to_string(),
                reason: "rejected by document".into(),
            });
        }
        let list = parse_selector_list(selector).map_err(|reason| PageError::InvalidSelector {
            selector: selector.to_string(),
            reason,
        })?;
        Ok(self
            .document_order()
            .into_iter()
            .filter(|id| list.iter().any(|chain| self.matches_chain(*id, chain, chain.len() - 1)))
            .collect())
    }

    fn matches_chain(&self, id: usize, chain: &[Compound], idx: usize) -> bool {
        if !self.matches_compound(id, &chain[idx]) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        if chain[idx].child {
            return self.nodes[id]
                .parent
                .is_some_and(|p| self.matches_chain(p, chain, idx - 1));
        }
        self.ancestors(id)
            .into_iter()
            .any(|a| self.matches_chain(a, chain, idx - 1))
    }

    fn matches_compound(&self, id: usize, c: &Compound) -> bool {
        let node = &self.nodes[id];
        if let Some(tag) = &c.tag {
            if tag != "*" && tag != &node.tag {
                return false;
            }
        }
        if let Some(want) = &c.id {
            if node.attrs.get("id") != Some(want) {
                return false;
            }
        }
        let classes: Vec<&str> = node
            .attrs
            .get("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default();
        if !c.classes.iter().all(|want| classes.contains(&want.as_str())) {
            return false;
        }
        for cond in &c.attrs {
            let actual = node.attrs.get(&cond.name);
            let ok = match (&cond.op, actual) {
                (_, None) => false,
                (AttrOp::Exists, Some(_)) => true,
                (AttrOp::Equals(v), Some(a)) => a == v,
                (AttrOp::Contains(v), Some(a)) => a.contains(v.as_str()),
                (AttrOp::Prefix(v), Some(a)) => a.starts_with(v.as_str()),
            };
            if !ok {
                return false;
            }
        }
        c.pseudos.iter().all(|p| match p {
            Pseudo::Visible => self.is_displayed(id),
            Pseudo::HasText(t) => self
                .text_content(id)
                .to_lowercase()
                .contains(&t.to_lowercase()),
            Pseudo::NthOfType(n) => self.nth_of_type(id) == *n,
        })
    }
}

#[derive(Debug)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
}

#[derive(Debug)]
struct AttrCond {
    name: String,
    op: AttrOp,
}

#[derive(Debug)]
enum Pseudo {
    Visible,
    HasText(String),
    NthOfType(usize),
}

#[derive(Debug, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCond>,
    pseudos: Vec<Pseudo>,
    /// Joined to the previous compound by `>`
    child: bool,
}

/// Split `s` on `sep` outside quotes, brackets and parentheses
fn split_top_level(s: &str, is_sep: impl Fn(char) -> bool) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut chars = s.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            current.push(ch);
            if let Some(next) = chars.next() {
                current.push(next);
            }
            continue;
        }
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '"' | '\'' => quote = Some(ch),
                '[' | '(' => depth += 1,
                ']' | ')' => depth -= 1,
                _ if depth == 0 && is_sep(ch) => {
                    if !current.trim().is_empty() {
                        parts.push(current.trim().to_string());
                    }
                    current.clear();
                    continue;
                }
                _ => {}
            },
        }
        current.push(ch);
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn parse_selector_list(selector: &str) -> Result<Vec<Vec<Compound>>, String> {
    let list = split_top_level(selector, |c| c == ',');
    if list.is_empty() {
        return Err("empty selector".into());
    }
    list.iter()
        .map(|complex| {
            let mut chain = Vec::new();
            let mut child = false;
            for token in split_top_level(complex, char::is_whitespace) {
                if token == ">" {
                    if chain.is_empty() || child {
                        return Err(format!("dangling combinator in '{complex}'"));
                    }
                    child = true;
                    continue;
                }
                let mut compound = parse_compound(&token)?;
                compound.child = std::mem::take(&mut child);
                chain.push(compound);
            }
            if child {
                return Err(format!("dangling combinator in '{complex}'"));
            }
            Ok(chain)
        })
        .collect()
}

fn read_ident(chars: &[char], i: &mut usize) -> String {
    let mut out = String::new();
    while *i < chars.len() {
        let ch = chars[*i];
        if ch == '\\' && *i + 1 < chars.len() {
            out.push(chars[*i + 1]);
            *i += 2;
        } else if ch.is_alphanumeric() || ch == '-' || ch == '_' {
            out.push(ch);
            *i += 1;
        } else {
            break;
        }
    }
    out
}

fn read_until(chars: &[char], i: &mut usize, close: char) -> Result<String, String> {
    let mut out = String::new();
    let mut quote: Option<char> = None;
    while *i < chars.len() {
        let ch = chars[*i];
        *i += 1;
        if ch == '\\' && *i < chars.len() {
            out.push(ch);
            out.push(chars[*i]);
            *i += 1;
            continue;
        }
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch == close => return Ok(out),
            None => {}
        }
        out.push(ch);
    }
    Err(format!("missing '{close}'"))
}

fn unquote(raw: &str) -> String {
    let raw = raw.trim();
    let inner = if raw.len() >= 2
        && ((raw.starts_with('"') && raw.ends_with('"'))
            || (raw.starts_with('\'') && raw.ends_with('\'')))
    {
        &raw[1..raw.len() - 1]
    } else {
        raw
    };
    let mut out = String::new();
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn parse_compound(s: &str) -> Result<Compound, String> {
    let chars: Vec<char> = s.chars().collect();
    let mut i = 0;
    let mut compound = Compound::default();
    if i < chars.len() && chars[i] == '*' {
        compound.tag = Some("*".into());
        i += 1;
    } else if i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '\\') {
        compound.tag = Some(read_ident(&chars, &mut i).to_lowercase());
    }
    while i < chars.len() {
        let ch = chars[i];
        i += 1;
        match ch {
            '#' => {
                let id = read_ident(&chars, &mut i);
                if id.is_empty() {
                    return Err("empty id".into());
                }
                compound.id = Some(id);
            }
            '.' => {
                let class = read_ident(&chars, &mut i);
                if class.is_empty() {
                    return Err("empty class".into());
                }
                compound.classes.push(class);
            }
            '[' => {
                let body = read_until(&chars, &mut i, ']')?;
                compound.attrs.push(parse_attr(&body)?);
            }
            ':' => {
                let name = read_ident(&chars, &mut i);
                let arg = if i < chars.len() && chars[i] == '(' {
                    i += 1;
                    Some(read_until(&chars, &mut i, ')')?)
                } else {
                    None
                };
                let pseudo = match (name.as_str(), arg) {
                    ("visible", None) => Pseudo::Visible,
                    ("has-text", Some(a)) => Pseudo::HasText(unquote(&a)),
                    ("nth-of-type", Some(a)) => Pseudo::NthOfType(
                        a.trim().parse().map_err(|_| format!("bad index '{a}'"))?,
                    ),
                    ("first-of-type", None) => Pseudo::NthOfType(1),
                    (other, _) => return Err(format!("unsupported pseudo-class ':{other}'")),
                };
                compound.pseudos.push(pseudo);
            }
            other => return Err(format!("unexpected '{other}'")),
        }
    }
    Ok(compound)
}

fn parse_attr(body: &str) -> Result<AttrCond, String> {
    let operators: [(&str, fn(String) -> AttrOp); 3] = [
        ("*=", AttrOp::Contains),
        ("^=", AttrOp::Prefix),
        ("=", AttrOp::Equals),
    ];
    for (token, build) in operators {
        if let Some(pos) = body.find(token) {
            let name = body[..pos].trim().to_string();
            let value = unquote(&body[pos + token.len()..]);
            if name.is_empty() {
                return Err("empty attribute name".into());
            }
            return Ok(AttrCond {
                name,
                op: build(value),
            });
        }
    }
    let name = body.trim().to_string();
    if name.is_empty() || name.contains(char::is_whitespace) {
        return Err(format!("bad attribute '{body}'"));
    }
    Ok(AttrCond {
        name,
        op: AttrOp::Exists,
    })
}

#[async_trait]
impl PageCapability for FakePage {
    type Handle = usize;

    fn backend_name(&self) -> &str {
        "fake"
    }

    async fn locate_all(&self, selector: &str) -> PageResult<Vec<usize>> {
        self.with_state(|s| s.query(selector))
    }

    async fn count(&self, selector: &str) -> PageResult<usize> {
        self.with_state(|s| s.query(selector).map(|v| v.len()))
    }

    async fn get_attribute(&self, handle: &usize, name: &str) -> PageResult<Option<String>> {
        self.with_state(|s| Ok(s.nodes[*handle].attrs.get(name).cloned()))
    }

    async fn text_content(&self, handle: &usize) -> PageResult<Option<String>> {
        self.with_state(|s| Ok(Some(s.text_content(*handle))))
    }

    async fn tag_name(&self, handle: &usize) -> PageResult<String> {
        self.with_state(|s| Ok(s.nodes[*handle].tag.clone()))
    }

    async fn ancestors(&self, handle: &usize) -> PageResult<Vec<NodeSummary>> {
        self.with_state(|s| {
            Ok(s.ancestors(*handle)
                .into_iter()
                .map(|a| {
                    let node = &s.nodes[a];
                    NodeSummary {
                        tag: node.tag.clone(),
                        id: node.attrs.get("id").cloned(),
                        classes: node
                            .attrs
                            .get("class")
                            .map(|c| c.split_whitespace().map(str::to_string).collect())
                            .unwrap_or_default(),
                        nth_of_type: s.nth_of_type(a),
                    }
                })
                .collect())
        })
    }

    async fn nth_of_type(&self, handle: &usize) -> PageResult<usize> {
        self.with_state(|s| Ok(s.nth_of_type(*handle)))
    }

    async fn is_visible(&self, handle: &usize, _timeout_ms: u64) -> PageResult<bool> {
        self.with_state(|s| Ok(s.is_displayed(*handle)))
    }

    async fn is_enabled(&self, handle: &usize, _timeout_ms: u64) -> PageResult<bool> {
        self.with_state(|s| Ok(s.nodes[*handle].enabled))
    }

    async fn is_checked(&self, handle: &usize) -> PageResult<bool> {
        self.with_state(|s| Ok(s.nodes[*handle].checked))
    }

    async fn input_value(&self, handle: &usize) -> PageResult<Option<String>> {
        self.with_state(|s| {
            let node = &s.nodes[*handle];
            Ok(node.value.clone().or_else(|| node.attrs.get("value").cloned()))
        })
    }

    async fn click(&self, handle: &usize) -> PageResult<()> {
        self.with_state(|s| {
            FakePage::record(s, "click", Some(*handle), None);
            let node = &mut s.nodes[*handle];
            match node.attrs.get("type").map(String::as_str) {
                Some("checkbox") => node.checked = !node.checked,
                Some("radio") => node.checked = true,
                _ => {}
            }
            if node.hides_on_click {
                node.visible = false;
            }
            Ok(())
        })
    }

    async fn fill(&self, handle: &usize, value: &str) -> PageResult<()> {
        self.with_state(|s| {
            if !s.nodes[*handle].enabled {
                return Err(PageError::Timeout(1000));
            }
            FakePage::record(s, "fill", Some(*handle), Some(value));
            s.nodes[*handle].value = Some(value.to_string());
            Ok(())
        })
    }

    async fn hover(&self, handle: &usize) -> PageResult<()> {
        self.with_state(|s| {
            FakePage::record(s, "hover", Some(*handle), None);
            for target in s.reveals.get(handle).cloned().unwrap_or_default() {
                s.nodes[target].visible = true;
            }
            Ok(())
        })
    }

    async fn focus(&self, handle: &usize) -> PageResult<()> {
        self.with_state(|s| {
            FakePage::record(s, "focus", Some(*handle), None);
            Ok(())
        })
    }

    async fn select_option(&self, handle: &usize, value: &str) -> PageResult<()> {
        self.with_state(|s| {
            FakePage::record(s, "select", Some(*handle), Some(value));
            s.nodes[*handle].value = Some(value.to_string());
            Ok(())
        })
    }

    async fn check(&self, handle: &usize) -> PageResult<()> {
        self.with_state(|s| {
            FakePage::record(s, "check", Some(*handle), None);
            s.nodes[*handle].checked = true;
            Ok(())
        })
    }

    async fn uncheck(&self, handle: &usize) -> PageResult<()> {
        self.with_state(|s| {
            FakePage::record(s, "uncheck", Some(*handle), None);
            s.nodes[*handle].checked = false;
            Ok(())
        })
    }

    async fn press(&self, handle: &usize, key: &str) -> PageResult<()> {
        self.with_state(|s| {
            FakePage::record(s, "press", Some(*handle), Some(key));
            Ok(())
        })
    }

    async fn screenshot(&self, handle: Option<&usize>, path: &Path) -> PageResult<()> {
        self.with_state(|s| {
            if s.fail_screenshots {
                return Err(PageError::Driver("screenshot unavailable".into()));
            }
            FakePage::record(s, "screenshot", handle.copied(), None);
            s.screenshots.push(path.to_path_buf());
            Ok(())
        })
    }

    async fn wait_for_timeout(&self, _ms: u64) -> PageResult<()> {
        self.with_state(|_| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_selector_matching() {
        let page = FakePage::new();
        let nav = page.add(BODY, FakeNode::new("nav").attr("id", "main").attr("class", "navbar top"));
        let a = page.add(nav, FakeNode::new("button").attr("class", "btn").text("Save"));
        let b = page.add(nav, FakeNode::new("button").attr("class", "btn primary").text("Cancel"));
        page.add(BODY, FakeNode::new("div").attr("data-x", "popup-1").hidden());

        assert_eq!(page.locate_all("button").await.unwrap(), vec![a, b]);
        assert_eq!(page.count(".btn.primary").await.unwrap(), 1);
        assert_eq!(page.locate_all("#main button:nth-of-type(2)").await.unwrap(), vec![b]);
        assert_eq!(page.locate_all("#main > button:nth-of-type(1)").await.unwrap(), vec![a]);
        assert_eq!(page.count("body > button").await.unwrap(), 0);
        assert_eq!(page.locate_all("button:has-text(\"save\")").await.unwrap(), vec![a]);
        assert_eq!(page.count("[data-x*=\"popup\"]").await.unwrap(), 1);
        assert_eq!(page.count("[data-x*=\"popup\"]:visible").await.unwrap(), 0);
        assert_eq!(page.count("nav, button").await.unwrap(), 3);
        assert!(page.count("button:hover-me").await.is_err());
    }
}
