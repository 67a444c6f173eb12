//! The rule registry. Rules are interned by name into handle slots, so an
//! expression can call a rule whose body is defined later; mutual recursion
//! needs no forward declarations. A grammar is immutable once built and can
//! be shared by any number of concurrent parses.

use std::collections::HashMap;
use std::sync::Arc;

use cranelift_entity::{entity_impl, PrimaryMap};

use crate::ast::{self, AstNode, Value};
use crate::cst::{CstNode, NodeSource, RootCstNode};
use crate::expr::Expr;
use crate::span::Span;
use crate::ParseResult;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct RuleHandle(u32);

entity_impl!(RuleHandle);

/// Whether a terminal's matches show up in the CST. Set once at build time
/// through `hide()` / `ignore()`, read-only afterwards.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Visibility {
    /// The token appears as a normal CST leaf.
    Normal,
    /// The token appears in the CST but is flagged for AST construction to
    /// skip (comments).
    Hidden,
    /// No CST node is produced at all (whitespace).
    Ignored,
}

pub(crate) type NodeCtor = Arc<dyn Fn() -> Box<dyn AstNode> + Send + Sync>;
pub(crate) type TreeConverter = Arc<dyn Fn(&CstNode, &str) -> Value + Send + Sync>;
pub(crate) type TokenConverter = Arc<dyn Fn(&str) -> Value + Send + Sync>;

pub(crate) enum RuleKind {
    /// Referenced by `call` but not declared yet.
    Forward,
    /// Produces a typed AST node; the only kind allowed to carry assignments.
    Parser { make: NodeCtor },
    /// Produces a scalar value from its CST subtree.
    DataType { convert: Option<TreeConverter> },
    /// Matches one contiguous token, parsing in terminal-mode inside.
    Terminal {
        visibility: Visibility,
        convert: Option<TokenConverter>,
    },
}

pub(crate) struct Rule {
    pub(crate) name: String,
    pub(crate) kind: RuleKind,
    pub(crate) body: Option<Expr>,
}

pub struct Grammar {
    rules: PrimaryMap<RuleHandle, Rule>,
    names: HashMap<String, RuleHandle>,
}

impl Grammar {
    pub fn new() -> Grammar {
        Grammar {
            rules: PrimaryMap::new(),
            names: HashMap::new(),
        }
    }

    fn intern(&mut self, name: &str) -> RuleHandle {
        if let Some(&handle) = self.names.get(name) {
            return handle;
        }
        let handle = self.rules.push(Rule {
            name: name.to_owned(),
            kind: RuleKind::Forward,
            body: None,
        });
        self.names.insert(name.to_owned(), handle);
        handle
    }

    fn declare(&mut self, name: &str, kind: RuleKind) -> RuleHandle {
        let handle = self.intern(name);
        let rule = &mut self.rules[handle];
        match rule.kind {
            RuleKind::Forward => rule.kind = kind,
            _ => panic!("Rule `{name}` is declared twice"),
        }
        handle
    }

    /// A late-bound reference to a named rule; the rule may be declared
    /// after the call expression is built.
    pub fn call(&mut self, name: &str) -> Expr {
        Expr::Call(self.intern(name))
    }

    /// Declares a parser rule producing AST nodes of type `T`.
    pub fn parser<T: AstNode + Default>(&mut self, name: &str) -> RuleBuilder<'_> {
        let make: NodeCtor = Arc::new(|| Box::new(T::default()) as Box<dyn AstNode>);
        let handle = self.declare(name, RuleKind::Parser { make });
        RuleBuilder { grammar: self, handle }
    }

    /// Declares a data-type rule. The default value is the concatenated text
    /// of all non-hidden leaves.
    pub fn datatype(&mut self, name: &str) -> DataTypeBuilder<'_> {
        let handle = self.declare(name, RuleKind::DataType { convert: None });
        DataTypeBuilder { grammar: self, handle }
    }

    /// Declares a terminal rule. The default value is the matched text.
    pub fn terminal(&mut self, name: &str) -> TerminalBuilder<'_> {
        let kind = RuleKind::Terminal {
            visibility: Visibility::Normal,
            convert: None,
        };
        let handle = self.declare(name, kind);
        TerminalBuilder { grammar: self, handle }
    }

    pub fn lookup(&self, name: &str) -> Option<RuleHandle> {
        self.names.get(name).copied()
    }

    pub fn rule_name(&self, handle: RuleHandle) -> &str {
        &self.rules[handle].name
    }

    fn set_body(&mut self, handle: RuleHandle, body: Expr) {
        let rule = &mut self.rules[handle];
        assert!(
            rule.body.is_none(),
            "Rule `{}` already has a body",
            rule.name
        );
        rule.body = Some(body);
    }

    pub(crate) fn rule(&self, handle: RuleHandle) -> &Rule {
        &self.rules[handle]
    }

    fn body_of(&self, handle: RuleHandle) -> &Expr {
        let rule = &self.rules[handle];
        match &rule.body {
            Some(body) => body,
            None => panic!("Call of an undefined rule `{}`", rule.name),
        }
    }

    pub(crate) fn is_parser_rule(&self, handle: RuleHandle) -> bool {
        matches!(self.rules[handle].kind, RuleKind::Parser { .. })
    }

    /// A named rule invoked in rule-mode. Parser and data-type rules nest a
    /// fresh CST node and parse their body into it; terminal rules match in
    /// terminal-mode, emit a single leaf unless ignored, then let the caller
    /// skip trailing hidden tokens.
    pub(crate) fn parse_rule_call(
        &self,
        handle: RuleHandle,
        src: &str,
        pos: usize,
        parent: &mut CstNode,
        cx: &Context,
    ) -> Option<usize> {
        let rule = &self.rules[handle];
        match &rule.kind {
            RuleKind::Terminal { visibility, .. } => {
                let len = self.body_of(handle).parse_terminal(src, pos, self)?;
                if *visibility != Visibility::Ignored {
                    let mut node = CstNode::new(NodeSource::Rule(handle));
                    node.span = Span::new(pos, pos + len);
                    node.is_leaf = true;
                    node.hidden = *visibility == Visibility::Hidden;
                    parent.children.push(node);
                }
                Some(len + cx.skip_hidden(src, pos + len, parent))
            }
            RuleKind::Forward => panic!("Call of an undefined rule `{}`", rule.name),
            RuleKind::Parser { .. } | RuleKind::DataType { .. } => {
                let checkpoint = parent.children.len();
                parent.children.push(CstNode::new(NodeSource::Rule(handle)));
                let body = self.body_of(handle);
                let child = parent.children.last_mut().unwrap();
                match body.parse_rule(src, pos, child, cx) {
                    Some(len) => {
                        child.span = Span::new(pos, pos + len);
                        Some(len)
                    }
                    None => {
                        parent.children.truncate(checkpoint);
                        None
                    }
                }
            }
        }
    }

    /// A named rule invoked in terminal-mode: just its body, no CST, no
    /// hidden skipping.
    pub(crate) fn parse_terminal_call(
        &self,
        handle: RuleHandle,
        src: &str,
        pos: usize,
    ) -> Option<usize> {
        self.body_of(handle).parse_terminal(src, pos, self)
    }

    /// The value a rule extracts from one of its CST nodes.
    pub(crate) fn value_of(&self, handle: RuleHandle, node: &CstNode, src: &str) -> Value {
        let rule = &self.rules[handle];
        match &rule.kind {
            RuleKind::Parser { make } => Value::Node(ast::build_node(self, make, node, src)),
            RuleKind::DataType { convert } => match convert {
                Some(convert) => convert(node, src),
                None => Value::Str(node.leaf_text(src)),
            },
            RuleKind::Terminal { convert, .. } => match convert {
                Some(convert) => convert(node.text(src)),
                None => Value::Str(node.text(src).to_owned()),
            },
            RuleKind::Forward => panic!("Call of an undefined rule `{}`", rule.name),
        }
    }

    /// Parses `text` with the named rule. Grammar-author mistakes (unknown
    /// or bodyless rules, zero-width hidden terminals, assignment type
    /// mismatches) panic; input that merely fails to match reports
    /// `full_match == false`.
    pub fn parse(&self, name: &str, text: &str) -> ParseResult {
        let handle = match self.lookup(name) {
            Some(handle) => handle,
            None => panic!("Rule `{name}` is not defined"),
        };
        log::trace!("parsing `{name}` over {} bytes", text.len());

        let result = match &self.rules[handle].kind {
            RuleKind::Terminal { convert, .. } => self.parse_root_terminal(handle, convert, text),
            _ => self.parse_root_rule(handle, text),
        };

        log::trace!(
            "`{name}`: consumed {} of {}, full_match: {}",
            result.len,
            text.len(),
            result.full_match
        );
        result
    }

    fn parse_root_rule(&self, handle: RuleHandle, text: &str) -> ParseResult {
        let cx = Context::new(self);
        let mut root = CstNode::new(NodeSource::Rule(handle));
        root.span = Span::new(0, text.len());

        let skipped = cx.skip_hidden(text, 0, &mut root);
        match self.parse_rule_call(handle, text, skipped, &mut root, &cx) {
            Some(body_len) => {
                let len = skipped + body_len;
                let value = self.value_of(handle, &root, text);
                ParseResult {
                    full_match: len == text.len(),
                    len,
                    root: RootCstNode {
                        full_text: text.to_owned(),
                        node: root,
                    },
                    value,
                }
            }
            None => ParseResult {
                full_match: false,
                len: 0,
                root: RootCstNode {
                    full_text: text.to_owned(),
                    node: root,
                },
                value: Value::None,
            },
        }
    }

    fn parse_root_terminal(
        &self,
        handle: RuleHandle,
        convert: &Option<TokenConverter>,
        text: &str,
    ) -> ParseResult {
        let mut root = CstNode::new(NodeSource::Rule(handle));
        root.is_leaf = true;

        match self.body_of(handle).parse_terminal(text, 0, self) {
            Some(len) => {
                root.span = Span::new(0, len);
                let value = match convert {
                    Some(convert) => convert(&text[..len]),
                    None => Value::Str(text[..len].to_owned()),
                };
                ParseResult {
                    full_match: len == text.len(),
                    len,
                    root: RootCstNode {
                        full_text: text.to_owned(),
                        node: root,
                    },
                    value,
                }
            }
            None => ParseResult {
                full_match: false,
                len: 0,
                root: RootCstNode {
                    full_text: text.to_owned(),
                    node: root,
                },
                value: Value::None,
            },
        }
    }
}

impl Default for Grammar {
    fn default() -> Grammar {
        Grammar::new()
    }
}

/// Per-parse state: the hidden and ignored terminals to skip between
/// rule-mode tokens, in registration order.
pub struct Context<'g> {
    pub(crate) grammar: &'g Grammar,
    hidden: Vec<RuleHandle>,
}

impl<'g> Context<'g> {
    pub(crate) fn new(grammar: &'g Grammar) -> Context<'g> {
        let mut hidden = Vec::new();
        for (handle, rule) in grammar.rules.iter() {
            if let RuleKind::Terminal { visibility, .. } = rule.kind {
                if visibility != Visibility::Normal {
                    hidden.push(handle);
                }
            }
        }
        Context { grammar, hidden }
    }

    /// Repeatedly tries every hidden terminal at the current position,
    /// attaching a hidden leaf for each match unless the terminal is
    /// ignored. Stops on a full pass without a match.
    pub(crate) fn skip_hidden(&self, src: &str, pos: usize, parent: &mut CstNode) -> usize {
        let mut skipped = 0;
        loop {
            let mut matched = false;
            for &handle in &self.hidden {
                let at = pos + skipped;
                let Some(len) = self.grammar.parse_terminal_call(handle, src, at) else {
                    continue;
                };
                assert!(
                    len > 0,
                    "Hidden terminal `{}` matched an empty string",
                    self.grammar.rule_name(handle)
                );

                let rule = self.grammar.rule(handle);
                let ignored = matches!(
                    rule.kind,
                    RuleKind::Terminal {
                        visibility: Visibility::Ignored,
                        ..
                    }
                );
                if !ignored {
                    let mut node = CstNode::new(NodeSource::Rule(handle));
                    node.span = Span::new(at, at + len);
                    node.is_leaf = true;
                    node.hidden = true;
                    parent.children.push(node);
                }

                skipped += len;
                matched = true;
            }
            if !matched {
                break;
            }
        }
        skipped
    }
}

/// Finishes a parser rule declaration by giving it a body.
pub struct RuleBuilder<'a> {
    grammar: &'a mut Grammar,
    handle: RuleHandle,
}

impl RuleBuilder<'_> {
    pub fn is(self, body: Expr) {
        self.grammar.set_body(self.handle, body);
    }
}

pub struct DataTypeBuilder<'a> {
    grammar: &'a mut Grammar,
    handle: RuleHandle,
}

impl DataTypeBuilder<'_> {
    /// Replaces the default leaf-concatenation value with a custom
    /// conversion over the rule's CST subtree.
    pub fn convert<V, F>(self, convert: F) -> Self
    where
        V: Send + Sync + 'static,
        F: Fn(&CstNode, &str) -> V + Send + Sync + 'static,
    {
        let rule = &mut self.grammar.rules[self.handle];
        let RuleKind::DataType { convert: slot } = &mut rule.kind else {
            unreachable!();
        };
        *slot = Some(Arc::new(move |node: &CstNode, src: &str| {
            Value::Data(Box::new(convert(node, src)))
        }));
        self
    }

    pub fn is(self, body: Expr) {
        self.grammar.set_body(self.handle, body);
    }
}

pub struct TerminalBuilder<'a> {
    grammar: &'a mut Grammar,
    handle: RuleHandle,
}

impl TerminalBuilder<'_> {
    fn visibility(self, new: Visibility) -> Self {
        let rule = &mut self.grammar.rules[self.handle];
        let RuleKind::Terminal { visibility, .. } = &mut rule.kind else {
            unreachable!();
        };
        *visibility = new;
        self
    }

    /// The token stays in the CST but is flagged for AST construction to
    /// skip, e.g. comments.
    pub fn hide(self) -> Self {
        self.visibility(Visibility::Hidden)
    }

    /// Matches are consumed without producing CST nodes, e.g. whitespace.
    pub fn ignore(self) -> Self {
        self.visibility(Visibility::Ignored)
    }

    /// Converts the matched text into a typed value.
    pub fn convert<V, F>(self, convert: F) -> Self
    where
        V: Send + Sync + 'static,
        F: Fn(&str) -> V + Send + Sync + 'static,
    {
        self.set_converter(Arc::new(move |text: &str| {
            Value::Data(Box::new(convert(text)))
        }))
    }

    /// Yields a fixed value regardless of the matched text, e.g. a `true`
    /// keyword.
    pub fn constant<V: Clone + Send + Sync + 'static>(self, value: V) -> Self {
        self.set_converter(Arc::new(move |_: &str| Value::Data(Box::new(value.clone()))))
    }

    fn set_converter(self, converter: TokenConverter) -> Self {
        let rule = &mut self.grammar.rules[self.handle];
        let RuleKind::Terminal { convert, .. } = &mut rule.kind else {
            unreachable!();
        };
        *convert = Some(converter);
        self
    }

    pub fn is(self, body: Expr) {
        self.grammar.set_body(self.handle, body);
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{at_least_one, lit, s};
    use crate::Grammar;

    fn assert_shareable<T: Send + Sync>() {}

    #[test]
    fn grammar_is_shareable() {
        assert_shareable::<Grammar>();
    }

    #[test]
    fn concurrent_parses() {
        let mut g = Grammar::new();
        g.terminal("WS").ignore().is(at_least_one(s()));
        g.datatype("R").is(lit("test"));

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    let result = g.parse("R", "  test  ");
                    assert!(result.full_match);
                });
            }
        });
    }

    #[test]
    #[should_panic(expected = "not defined")]
    fn unknown_rule_panics() {
        let g = Grammar::new();
        g.parse("missing", "");
    }

    #[test]
    #[should_panic(expected = "undefined rule")]
    fn bodyless_rule_panics() {
        let mut g = Grammar::new();
        let call = g.call("Later");
        g.datatype("R").is(call);
        g.parse("R", "x");
    }

    #[test]
    #[should_panic(expected = "matched an empty string")]
    fn zero_width_hidden_terminal_panics() {
        let mut g = Grammar::new();
        g.terminal("WS").ignore().is(crate::expr::many(s()));
        g.datatype("R").is(lit("test"));
        g.parse("R", "test");
    }
}
