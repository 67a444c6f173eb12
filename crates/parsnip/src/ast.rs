//! AST projection. Parser rules produce user-defined node types; declared
//! assignments carry values from CST children into their fields. Values
//! cross the boundary type-erased and are dispatched on the field's shape
//! at the assignment site.

use std::any::{type_name, Any};
use std::sync::Arc;

use crate::cst::{CstNode, NodeSource};
use crate::expr::Expr;
use crate::grammar::{Grammar, NodeCtor};
use crate::reference::NodeRef;

/// Marker capability shared by all AST node types. Implement it with the
/// [`ast_node!`](crate::ast_node) macro.
pub trait AstNode: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn AstNode {
    pub fn is<T: AstNode>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: AstNode>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    pub fn downcast<T: AstNode>(self: Box<Self>) -> Result<Box<T>, Box<dyn AstNode>> {
        if self.is::<T>() {
            Ok(self.into_any().downcast().unwrap())
        } else {
            Err(self)
        }
    }
}

/// Implements [`AstNode`] for one or more types.
#[macro_export]
macro_rules! ast_node {
    ($($ty:ty),+ $(,)?) => {
        $(impl $crate::AstNode for $ty {
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn as_any_mut(&mut self) -> &mut dyn ::std::any::Any {
                self
            }
            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        })+
    };
}

/// A dynamically typed value crossing the AST construction boundary:
/// terminal and literal text, a built AST node, or converter output.
pub enum Value {
    None,
    Str(String),
    Node(Box<dyn AstNode>),
    Data(Box<dyn Any>),
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Value::None => "no value",
            Value::Str(_) => "a string",
            Value::Node(_) => "an AST node",
            Value::Data(_) => "a converted value",
        }
    }

    #[track_caller]
    pub fn into_string(self) -> String {
        match self {
            Value::Str(text) => text,
            Value::Data(data) => match data.downcast::<String>() {
                Ok(text) => *text,
                Err(_) => panic!("Expected a string value"),
            },
            other => panic!("Expected a string value, got {}", other.kind_name()),
        }
    }

    #[track_caller]
    pub fn into_node<T: AstNode>(self) -> Box<T> {
        match self {
            Value::Node(node) => match node.downcast::<T>() {
                Ok(node) => node,
                Err(_) => panic!("Expected an AST node of type `{}`", type_name::<T>()),
            },
            other => panic!(
                "Expected an AST node of type `{}`, got {}",
                type_name::<T>(),
                other.kind_name()
            ),
        }
    }

    #[track_caller]
    pub fn into_data<T: 'static>(self) -> T {
        match self {
            Value::Data(data) => match data.downcast::<T>() {
                Ok(data) => *data,
                Err(_) => panic!("Expected a value of type `{}`", type_name::<T>()),
            },
            other => panic!(
                "Expected a value of type `{}`, got {}",
                type_name::<T>(),
                other.kind_name()
            ),
        }
    }
}

/// Materializes a typed field value out of the erased parse value. The
/// provided shapes mirror what assignments can target: scalars, optional or
/// owned child nodes, and unresolved cross-references. Implement it for
/// your own types to accept heterogeneous producers (see the JSON tests).
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Self;
}

impl FromValue for String {
    fn from_value(value: Value) -> String {
        value.into_string()
    }
}

macro_rules! data_from_value {
    ($($ty:ty),+) => {
        $(impl FromValue for $ty {
            fn from_value(value: Value) -> $ty {
                value.into_data()
            }
        })+
    };
}

data_from_value!(bool, f32, f64, i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Option<T> {
        Some(T::from_value(value))
    }
}

impl<T: AstNode> FromValue for Box<T> {
    fn from_value(value: Value) -> Box<T> {
        value.into_node()
    }
}

impl<T> FromValue for NodeRef<T> {
    /// Stores the raw reference text; resolution is deferred to whoever
    /// owns the finished AST.
    fn from_value(value: Value) -> NodeRef<T> {
        NodeRef::unresolved(value.into_string())
    }
}

/// The action recorded on a CST node by a matched assignment, executed when
/// the enclosing parser rule builds its AST node.
pub struct AssignAction {
    apply: Box<dyn Fn(&mut dyn Any, Value) + Send + Sync>,
}

impl AssignAction {
    pub(crate) fn apply(&self, target: &mut dyn Any, value: Value) {
        (self.apply)(target, value)
    }
}

/// An assignment may wrap a rule call, a literal, or an ordered choice of
/// those; each matches exactly one CST child for the action to land on.
fn assert_assignable(expr: &Expr) {
    match expr {
        Expr::Call(_) | Expr::Literal { .. } => {}
        Expr::Choice(elements) => {
            for element in elements {
                assert_assignable(element);
            }
        }
        _ => panic!(
            "An assignment body must be a rule call, a literal, \
             or an ordered choice of those"
        ),
    }
}

fn wrap_action(
    apply: impl Fn(&mut dyn Any, Value) + Send + Sync + 'static,
    element: Expr,
) -> Expr {
    assert_assignable(&element);
    Expr::Assign {
        action: Arc::new(AssignAction {
            apply: Box::new(apply),
        }),
        element: Box::new(element),
    }
}

#[track_caller]
fn target_mut<A: AstNode>(target: &mut dyn Any) -> &mut A {
    match target.downcast_mut::<A>() {
        Some(node) => node,
        None => panic!("Assignment target is not a `{}`", type_name::<A>()),
    }
}

/// Binds the matched value to a field of the enclosing parser rule's node,
/// selected by a field lens: `assign(|n: &mut Decl| &mut n.name, ...)`.
pub fn assign<A, V>(field: fn(&mut A) -> &mut V, element: Expr) -> Expr
where
    A: AstNode,
    V: FromValue + 'static,
{
    wrap_action(
        move |target, value| *field(target_mut::<A>(target)) = V::from_value(value),
        element,
    )
}

/// Appends the matched value to a sequence field of the enclosing parser
/// rule's node.
pub fn append<A, V>(field: fn(&mut A) -> &mut Vec<V>, element: Expr) -> Expr
where
    A: AstNode,
    V: FromValue + 'static,
{
    wrap_action(
        move |target, value| field(target_mut::<A>(target)).push(V::from_value(value)),
        element,
    )
}

/// Builds a parser rule's AST node from its CST subtree. The walk covers
/// the node's direct children: sequences, choices and repetitions emit no
/// intermediate CST nodes, so every assignment-annotated child sits at this
/// level. The target node is instantiated on the first assignment; a bare
/// parser-rule child forwards its own node as the result.
pub(crate) fn build_node(
    grammar: &Grammar,
    make: &NodeCtor,
    node: &CstNode,
    src: &str,
) -> Box<dyn AstNode> {
    let mut result: Option<Box<dyn AstNode>> = None;

    for child in &node.children {
        if child.hidden {
            continue;
        }
        if let Some(action) = &child.action {
            let value = child_value(grammar, child, src);
            let target = result.get_or_insert_with(|| (**make)());
            action.apply(target.as_any_mut(), value);
            continue;
        }
        if let NodeSource::Rule(handle) = child.source {
            if grammar.is_parser_rule(handle) {
                let Value::Node(forwarded) = grammar.value_of(handle, child, src) else {
                    unreachable!();
                };
                result = Some(forwarded);
            }
        }
    }

    result.unwrap_or_else(|| (**make)())
}

/// The value a matched assignment extracts from its CST child: rule calls
/// delegate to the rule, literal tokens yield their text.
fn child_value(grammar: &Grammar, child: &CstNode, src: &str) -> Value {
    match child.source {
        NodeSource::Rule(handle) => grammar.value_of(handle, child, src),
        NodeSource::Token => Value::Str(child.text(src).to_owned()),
    }
}
