//! A PEG combinator library. Grammars are values assembled from expression
//! combinators and three kinds of named rules (parser, data-type, terminal);
//! parsing an input produces a concrete syntax tree of spans plus, through
//! declared assignments, a typed abstract syntax tree.

pub mod ast;
pub mod byteset;
pub mod cst;
pub mod expr;
pub mod grammar;
pub mod reference;
pub mod span;

pub use ast::{append, assign, AstNode, FromValue, Value};
pub use byteset::ByteSet;
pub use cst::{CstNode, NodeSource, RootCstNode};
pub use expr::{
    any, at_least_one, at_least_one_sep, chars, check, d, eof, eol, lit, many, many_sep, not, opt,
    rep, s, w, Expr,
};
pub use grammar::{Grammar, RuleHandle, Visibility};
pub use reference::NodeRef;
pub use span::Span;

/// What a top-level parse returns: the consumed byte count, whether the
/// whole input was consumed, the CST, and the entry rule's value (an AST
/// node for parser rules, a converted scalar otherwise).
pub struct ParseResult {
    pub full_match: bool,
    pub len: usize,
    pub root: RootCstNode,
    pub value: Value,
}
