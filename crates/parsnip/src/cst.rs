use std::fmt;
use std::sync::Arc;

use crate::ast::AssignAction;
use crate::grammar::{Grammar, RuleHandle};
use crate::span::Span;

/// The grammar element a CST node was parsed from. Groups, choices and
/// repetitions emit no nodes of their own, so a node comes either from a
/// named rule or from a token primitive (literal, character class, any).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NodeSource {
    Rule(RuleHandle),
    Token,
}

/// A node in the concrete syntax tree. Children are stored in input order;
/// failed sub-matches truncate the child list back to its pre-attempt size,
/// so a finished tree never contains residue from backtracking.
#[derive(Clone)]
pub struct CstNode {
    pub span: Span,
    pub source: NodeSource,
    /// The assignment that consumes this node when the AST is built.
    pub action: Option<Arc<AssignAction>>,
    pub children: Vec<CstNode>,
    /// A leaf corresponds to a single token of input.
    pub is_leaf: bool,
    /// Hidden tokens (whitespace, comments) stay in the tree but are ignored
    /// by AST construction and leaf-text concatenation.
    pub hidden: bool,
}

impl CstNode {
    pub(crate) fn new(source: NodeSource) -> CstNode {
        CstNode {
            span: Span::empty(),
            source,
            action: None,
            children: Vec::new(),
            is_leaf: false,
            hidden: false,
        }
    }

    pub(crate) fn token(span: Span) -> CstNode {
        CstNode {
            span,
            source: NodeSource::Token,
            action: None,
            children: Vec::new(),
            is_leaf: true,
            hidden: false,
        }
    }

    pub fn text<'a>(&self, src: &'a str) -> &'a str {
        self.span.as_str(src)
    }

    /// Preorder traversal of this node and everything below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Concatenated text of all non-hidden leaves, the default data-type
    /// rule value.
    pub fn leaf_text(&self, src: &str) -> String {
        let mut out = String::new();
        for node in self.descendants() {
            if node.is_leaf && !node.hidden {
                out.push_str(node.text(src));
            }
        }
        out
    }

    pub fn pretty(
        &self,
        buf: &mut dyn fmt::Write,
        src: &str,
        grammar: &Grammar,
        level: usize,
    ) -> fmt::Result {
        for _ in 0..level {
            buf.write_str("  ")?;
        }
        match self.source {
            NodeSource::Rule(handle) => buf.write_str(grammar.rule_name(handle))?,
            NodeSource::Token => buf.write_str("token")?,
        }
        if self.hidden {
            buf.write_str(" (hidden)")?;
        }
        if self.children.is_empty() {
            write!(buf, " {:?}", self.text(src))?;
        }
        buf.write_str("\n")?;
        for child in &self.children {
            child.pretty(buf, src, grammar, level + 1)?;
        }
        Ok(())
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a CstNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a CstNode;
    fn next(&mut self) -> Option<&'a CstNode> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// The root of a parse, owning the full input text all spans point into.
pub struct RootCstNode {
    pub full_text: String,
    pub node: CstNode,
}

impl RootCstNode {
    pub fn text(&self) -> &str {
        &self.full_text
    }

    pub fn leaf_text(&self) -> String {
        self.node.leaf_text(&self.full_text)
    }

    pub fn pretty(&self, grammar: &Grammar) -> String {
        let mut buf = String::new();
        _ = self.node.pretty(&mut buf, &self.full_text, grammar, 0);
        buf
    }
}
