use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

/// A lazy cross-reference inside a finished AST. Parsing only records the
/// referenced name; whoever owns the tree resolves it afterwards through
/// [`resolve_with`](NodeRef::resolve_with).
///
/// Resolution happens at most once even under contention: the fast path is
/// a lock-free read of the published target, the slow path re-checks under
/// a mutex before running the resolver. A resolver that returns `None`
/// leaves the reference unresolved and later calls retry.
pub struct NodeRef<T> {
    text: String,
    target: OnceLock<Arc<T>>,
    gate: Mutex<()>,
}

impl<T> NodeRef<T> {
    pub fn unresolved(text: impl Into<String>) -> NodeRef<T> {
        NodeRef {
            text: text.into(),
            target: OnceLock::new(),
            gate: Mutex::new(()),
        }
    }

    /// The referenced name as it appeared in the input.
    pub fn raw_text(&self) -> &str {
        &self.text
    }

    /// The resolved target, if resolution already happened.
    pub fn get(&self) -> Option<&Arc<T>> {
        self.target.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.target.get().is_some()
    }

    pub fn resolve_with(
        &self,
        resolve: impl FnOnce(&str) -> Option<Arc<T>>,
    ) -> Option<&Arc<T>> {
        if let Some(target) = self.target.get() {
            return Some(target);
        }
        let _gate = self.gate.lock().unwrap();
        if let Some(target) = self.target.get() {
            return Some(target);
        }
        let value = resolve(&self.text)?;
        Some(self.target.get_or_init(|| value))
    }
}

impl<T> Default for NodeRef<T> {
    fn default() -> NodeRef<T> {
        NodeRef::unresolved(String::new())
    }
}

impl<T> fmt::Debug for NodeRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("text", &self.text)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}
