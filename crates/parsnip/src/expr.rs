//! The parsing expression algebra. Every expression supports two matching
//! operations: rule-mode, which emits CST children and skips hidden tokens
//! after each matched token, and terminal-mode, which touches neither and is
//! used inside terminal rule bodies. Both return the consumed byte count,
//! `None` is the failure sentinel.

use std::ops;
use std::sync::Arc;

use crate::ast::AssignAction;
use crate::byteset::{is_word, ByteSet};
use crate::cst::CstNode;
use crate::grammar::{Context, Grammar, RuleHandle};
use crate::span::Span;

pub const UNBOUNDED: u32 = u32::MAX;

#[derive(Clone)]
pub enum Expr {
    /// A verbatim byte sequence. When `fold_case` is set the bytes are stored
    /// lowercased and input is lowercased before comparison.
    Literal { bytes: Box<[u8]>, fold_case: bool },
    /// A single byte from a 256-entry lookup.
    Chars(ByteSet),
    /// One UTF-8 codepoint.
    Any,
    /// Sequence, every element in order.
    Group(Vec<Expr>),
    /// Ordered choice, first match wins and is never revisited.
    Choice(Vec<Expr>),
    /// Every element exactly once, in any order.
    Unordered(Vec<Expr>),
    /// Between `min` and `max` repetitions of the element.
    Repeat { min: u32, max: u32, element: Box<Expr> },
    /// And-predicate: succeeds at zero length iff the element would match.
    And(Box<Expr>),
    /// Not-predicate: succeeds at zero length iff the element would fail.
    Not(Box<Expr>),
    /// Late-bound reference to a registered rule.
    Call(RuleHandle),
    /// An assignment annotation around an assignable element.
    Assign {
        action: Arc<AssignAction>,
        element: Box<Expr>,
    },
}

impl Expr {
    /// Case-insensitive twin of a literal or character class.
    pub fn ci(self) -> Expr {
        match self {
            Expr::Literal { bytes, .. } => {
                let bytes = bytes.iter().map(u8::to_ascii_lowercase).collect();
                Expr::Literal { bytes, fold_case: true }
            }
            Expr::Chars(set) => Expr::Chars(set.fold_case()),
            _ => panic!("ci() applies to literals and character classes only"),
        }
    }

    pub(crate) fn parse_rule(
        &self,
        src: &str,
        pos: usize,
        parent: &mut CstNode,
        cx: &Context,
    ) -> Option<usize> {
        match self {
            Expr::Literal { bytes, fold_case } => {
                let len = match_literal(src, pos, bytes, *fold_case)?;
                if boundary_violated(src, pos + len, bytes[bytes.len() - 1]) {
                    return None;
                }
                parent.children.push(CstNode::token(Span::new(pos, pos + len)));
                Some(len + cx.skip_hidden(src, pos + len, parent))
            }
            Expr::Chars(set) => {
                let byte = *src.as_bytes().get(pos).filter(|b| set.contains(**b))?;
                if boundary_violated(src, pos + 1, byte) {
                    return None;
                }
                parent.children.push(CstNode::token(Span::new(pos, pos + 1)));
                Some(1 + cx.skip_hidden(src, pos + 1, parent))
            }
            Expr::Any => {
                let len = codepoint_length(src, pos)?;
                parent.children.push(CstNode::token(Span::new(pos, pos + len)));
                Some(len + cx.skip_hidden(src, pos + len, parent))
            }
            Expr::Group(elements) => {
                let checkpoint = parent.children.len();
                let mut len = 0;
                for element in elements {
                    match element.parse_rule(src, pos + len, parent, cx) {
                        Some(n) => len += n,
                        None => {
                            parent.children.truncate(checkpoint);
                            return None;
                        }
                    }
                }
                Some(len)
            }
            Expr::Choice(elements) => {
                let checkpoint = parent.children.len();
                for element in elements {
                    if let Some(len) = element.parse_rule(src, pos, parent, cx) {
                        return Some(len);
                    }
                    parent.children.truncate(checkpoint);
                }
                None
            }
            Expr::Unordered(elements) => {
                let checkpoint = parent.children.len();
                let mut matched = vec![false; elements.len()];
                let mut len = 0;
                loop {
                    let mut progressed = false;
                    for (index, element) in elements.iter().enumerate() {
                        if matched[index] {
                            continue;
                        }
                        let attempt = parent.children.len();
                        match element.parse_rule(src, pos + len, parent, cx) {
                            // a zero-length match cannot satisfy exactly-once
                            Some(0) | None => parent.children.truncate(attempt),
                            Some(n) => {
                                len += n;
                                matched[index] = true;
                                progressed = true;
                                break;
                            }
                        }
                    }
                    if !progressed {
                        break;
                    }
                }
                if matched.iter().all(|&m| m) {
                    Some(len)
                } else {
                    parent.children.truncate(checkpoint);
                    None
                }
            }
            Expr::Repeat { min, max, element } => {
                let checkpoint = parent.children.len();
                let mut len = 0;
                let mut count = 0;
                while count < *min {
                    match element.parse_rule(src, pos + len, parent, cx) {
                        Some(n) => {
                            len += n;
                            count += 1;
                        }
                        None => {
                            parent.children.truncate(checkpoint);
                            return None;
                        }
                    }
                }
                while count < *max {
                    let attempt = parent.children.len();
                    match element.parse_rule(src, pos + len, parent, cx) {
                        // a nullable body stops the loop instead of spinning
                        Some(0) => break,
                        Some(n) => {
                            len += n;
                            count += 1;
                        }
                        None => {
                            parent.children.truncate(attempt);
                            break;
                        }
                    }
                }
                Some(len)
            }
            Expr::And(element) => {
                let mut scratch = CstNode::new(crate::cst::NodeSource::Token);
                match element.parse_rule(src, pos, &mut scratch, cx) {
                    Some(_) => Some(0),
                    None => None,
                }
            }
            Expr::Not(element) => {
                let mut scratch = CstNode::new(crate::cst::NodeSource::Token);
                match element.parse_rule(src, pos, &mut scratch, cx) {
                    Some(_) => None,
                    None => Some(0),
                }
            }
            Expr::Call(handle) => cx.grammar.parse_rule_call(*handle, src, pos, parent, cx),
            Expr::Assign { action, element } => {
                let index = parent.children.len();
                let len = element.parse_rule(src, pos, parent, cx)?;
                // the assignable shapes produce exactly one child, possibly
                // followed by skipped hidden tokens
                debug_assert!(parent.children.len() > index);
                parent.children[index].action = Some(action.clone());
                Some(len)
            }
        }
    }

    pub(crate) fn parse_terminal(&self, src: &str, pos: usize, grammar: &Grammar) -> Option<usize> {
        match self {
            Expr::Literal { bytes, fold_case } => match_literal(src, pos, bytes, *fold_case),
            Expr::Chars(set) => {
                src.as_bytes().get(pos).filter(|b| set.contains(**b))?;
                Some(1)
            }
            Expr::Any => codepoint_length(src, pos),
            Expr::Group(elements) => {
                let mut len = 0;
                for element in elements {
                    len += element.parse_terminal(src, pos + len, grammar)?;
                }
                Some(len)
            }
            Expr::Choice(elements) => elements
                .iter()
                .find_map(|element| element.parse_terminal(src, pos, grammar)),
            Expr::Unordered(elements) => {
                let mut matched = vec![false; elements.len()];
                let mut len = 0;
                loop {
                    let mut progressed = false;
                    for (index, element) in elements.iter().enumerate() {
                        if matched[index] {
                            continue;
                        }
                        match element.parse_terminal(src, pos + len, grammar) {
                            Some(0) | None => {}
                            Some(n) => {
                                len += n;
                                matched[index] = true;
                                progressed = true;
                                break;
                            }
                        }
                    }
                    if !progressed {
                        break;
                    }
                }
                matched.iter().all(|&m| m).then_some(len)
            }
            Expr::Repeat { min, max, element } => {
                let mut len = 0;
                let mut count = 0;
                while count < *min {
                    len += element.parse_terminal(src, pos + len, grammar)?;
                    count += 1;
                }
                while count < *max {
                    match element.parse_terminal(src, pos + len, grammar) {
                        Some(0) | None => break,
                        Some(n) => {
                            len += n;
                            count += 1;
                        }
                    }
                }
                Some(len)
            }
            Expr::And(element) => match element.parse_terminal(src, pos, grammar) {
                Some(_) => Some(0),
                None => None,
            },
            Expr::Not(element) => match element.parse_terminal(src, pos, grammar) {
                Some(_) => None,
                None => Some(0),
            },
            Expr::Call(handle) => grammar.parse_terminal_call(*handle, src, pos),
            Expr::Assign { .. } => {
                panic!("an assignment cannot appear inside a terminal rule")
            }
        }
    }
}

fn match_literal(src: &str, pos: usize, literal: &[u8], fold_case: bool) -> Option<usize> {
    let input = src.as_bytes().get(pos..pos + literal.len())?;
    for (have, want) in input.iter().zip(literal) {
        let have = if fold_case { have.to_ascii_lowercase() } else { *have };
        if have != *want {
            return None;
        }
    }
    Some(literal.len())
}

/// The keyword boundary rule: a rule-mode match whose last byte is a word
/// character must not be immediately followed by another word character,
/// so `if` cannot match a prefix of `ifx`.
fn boundary_violated(src: &str, end: usize, last_matched: u8) -> bool {
    is_word(last_matched) && src.as_bytes().get(end).is_some_and(|&b| is_word(b))
}

/// Length of one UTF-8 codepoint: the leading byte selects the length and
/// enough bytes must remain. Continuation bytes are not validated.
fn codepoint_length(src: &str, pos: usize) -> Option<usize> {
    let bytes = src.as_bytes();
    let first = *bytes.get(pos)?;
    let remaining = bytes.len() - pos;
    if first & 0x80 == 0 {
        Some(1)
    } else if first & 0xE0 == 0xC0 && remaining >= 2 {
        Some(2)
    } else if first & 0xF0 == 0xE0 && remaining >= 3 {
        Some(3)
    } else if first & 0xF8 == 0xF0 && remaining >= 4 {
        Some(4)
    } else {
        None
    }
}

/// A case-sensitive literal. Empty literals are rejected.
pub fn lit(text: &str) -> Expr {
    assert!(!text.is_empty(), "A literal cannot be empty");
    Expr::Literal {
        bytes: text.as_bytes().into(),
        fold_case: false,
    }
}

/// A character class from a pattern such as `"a-zA-Z0-9_"`.
pub fn chars(pattern: &str) -> Expr {
    Expr::Chars(ByteSet::from_pattern(pattern))
}

/// Any single codepoint, the regex `.`.
pub fn any() -> Expr {
    Expr::Any
}

/// End of input.
pub fn eof() -> Expr {
    not(any())
}

/// End of line.
pub fn eol() -> Expr {
    lit("\r\n") | lit("\n") | lit("\r")
}

/// A space character, the regex `\s`. Negate with `!s()`.
pub fn s() -> Expr {
    chars(" \t\r\n\x0c\x0b")
}

/// A word character, the regex `\w`.
pub fn w() -> Expr {
    chars("a-zA-Z0-9_")
}

/// A digit, the regex `\d`.
pub fn d() -> Expr {
    chars("0-9")
}

/// And-predicate: look ahead without consuming.
pub fn check(element: Expr) -> Expr {
    Expr::And(Box::new(element))
}

/// Not-predicate: succeed only where the element fails.
pub fn not(element: Expr) -> Expr {
    Expr::Not(Box::new(element))
}

/// Between `min` and `max` repetitions, both inclusive.
pub fn rep(min: u32, max: u32, element: Expr) -> Expr {
    assert!(min <= max, "Inverted repetition bounds {min}..{max}");
    Expr::Repeat {
        min,
        max,
        element: Box::new(element),
    }
}

/// Zero or one.
pub fn opt(element: Expr) -> Expr {
    rep(0, 1, element)
}

/// Zero or more.
pub fn many(element: Expr) -> Expr {
    rep(0, UNBOUNDED, element)
}

/// One or more.
pub fn at_least_one(element: Expr) -> Expr {
    rep(1, UNBOUNDED, element)
}

/// `element (sep element)*`
pub fn at_least_one_sep(sep: Expr, element: Expr) -> Expr {
    element.clone() + many(sep + element)
}

/// `(element (sep element)*)?`
pub fn many_sep(sep: Expr, element: Expr) -> Expr {
    opt(at_least_one_sep(sep, element))
}

impl ops::Add for Expr {
    type Output = Expr;
    /// Sequence. Adjacent groups flatten.
    fn add(self, rhs: Expr) -> Expr {
        match (self, rhs) {
            (Expr::Group(mut lhs), Expr::Group(rhs)) => {
                lhs.extend(rhs);
                Expr::Group(lhs)
            }
            (Expr::Group(mut lhs), rhs) => {
                lhs.push(rhs);
                Expr::Group(lhs)
            }
            (lhs, Expr::Group(mut rhs)) => {
                rhs.insert(0, lhs);
                Expr::Group(rhs)
            }
            (lhs, rhs) => Expr::Group(vec![lhs, rhs]),
        }
    }
}

impl ops::BitOr for Expr {
    type Output = Expr;
    /// Ordered choice. Adjacent choices flatten.
    fn bitor(self, rhs: Expr) -> Expr {
        match (self, rhs) {
            (Expr::Choice(mut lhs), Expr::Choice(rhs)) => {
                lhs.extend(rhs);
                Expr::Choice(lhs)
            }
            (Expr::Choice(mut lhs), rhs) => {
                lhs.push(rhs);
                Expr::Choice(lhs)
            }
            (lhs, Expr::Choice(mut rhs)) => {
                rhs.insert(0, lhs);
                Expr::Choice(rhs)
            }
            (lhs, rhs) => Expr::Choice(vec![lhs, rhs]),
        }
    }
}

impl ops::BitAnd for Expr {
    type Output = Expr;
    /// Unordered group.
    fn bitand(self, rhs: Expr) -> Expr {
        match (self, rhs) {
            (Expr::Unordered(mut lhs), Expr::Unordered(rhs)) => {
                lhs.extend(rhs);
                Expr::Unordered(lhs)
            }
            (Expr::Unordered(mut lhs), rhs) => {
                lhs.push(rhs);
                Expr::Unordered(lhs)
            }
            (lhs, Expr::Unordered(mut rhs)) => {
                rhs.insert(0, lhs);
                Expr::Unordered(rhs)
            }
            (lhs, rhs) => Expr::Unordered(vec![lhs, rhs]),
        }
    }
}

impl ops::Not for Expr {
    type Output = Expr;
    /// Complements a character class; anything else becomes a not-predicate.
    fn not(self) -> Expr {
        match self {
            Expr::Chars(set) => Expr::Chars(set.negated()),
            element => not(element),
        }
    }
}

impl ops::Shr for Expr {
    type Output = Expr;
    /// `from >> to` consumes everything from `from` up to and including
    /// `to`, e.g. `lit("/*") >> lit("*/")` for a block comment.
    fn shr(self, to: Expr) -> Expr {
        self + many(!to.clone() + any()) + to
    }
}
