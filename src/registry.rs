//! A hierarchical method registry: namespaces, per-namespace interceptors,
//! and method lookup.
//!
//! Registration follows a "snapshot, then publish" discipline: a namespace
//! accumulates its interceptor chain and child registrations, then each
//! method is published to the shared map with that chain already composed
//! around it, so lookup never has to walk parent namespaces at call time.

use crate::handler::{BoxHandler, Handler};
use crate::interceptor::{self, BoxInterceptor};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// A registered method's record.
pub struct Metadata {
    /// The raw handler, unwrapped by any interceptor.
    pub handler: BoxHandler,
    /// The fully-composed handler: the interceptor chain wrapped around
    /// `handler`, captured at registration time.
    pub chain: BoxHandler,
    /// Descriptive-only type name for the method's expected params. Never
    /// enforced at call time.
    pub params_type: Option<String>,
    /// Descriptive-only type name for the method's result.
    pub result_type: Option<String>,
}

struct Shared {
    separator: char,
    methods: RwLock<HashMap<String, Arc<Metadata>>>,
}

struct NodeData {
    /// Accumulated namespace prefix (e.g. `"user.admin"`); empty at the root.
    prefix: String,
    interceptors: Mutex<Vec<BoxInterceptor>>,
    parent: Option<Arc<NodeData>>,
}

/// An error registering a method.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegisterError {
    /// The method name was empty after separator trimming.
    #[error("method name must not be empty")]
    EmptyName,
}

/// A node in the method registry tree: either the root, or a namespace
/// nested under it. Cloning a `Registry` is cheap — it shares the
/// underlying method map and this node's ancestry by `Arc`.
#[derive(Clone)]
pub struct Registry {
    shared: Arc<Shared>,
    node: Arc<NodeData>,
}

impl Registry {
    /// Creates a new, empty registry with the default `.` namespace
    /// separator.
    pub fn new() -> Self {
        Self::with_separator('.')
    }

    /// Creates a new, empty registry using `separator` to join namespace
    /// segments.
    pub fn with_separator(separator: char) -> Self {
        Registry {
            shared: Arc::new(Shared {
                separator,
                methods: RwLock::new(HashMap::new()),
            }),
            node: Arc::new(NodeData {
                prefix: String::new(),
                interceptors: Mutex::new(Vec::new()),
                parent: None,
            }),
        }
    }

    /// Registers `handler` under `name` within this node's namespace.
    ///
    /// The full method name is `prefix ⊕ sep ⊕ name`. The interceptor chain
    /// is captured *now*, walking from the root down to this node — a later
    /// [`Registry::with`] call on any ancestor does not retroactively
    /// rewrap this registration.
    pub fn register(
        &self,
        name: &str,
        handler: impl Handler + 'static,
        params_type: Option<impl Into<String>>,
        result_type: Option<impl Into<String>>,
    ) -> Result<(), RegisterError> {
        let trimmed = self.trim_separator(name);
        if trimmed.is_empty() {
            return Err(RegisterError::EmptyName);
        }
        let full_name = self.append_namespace(&self.node.prefix, trimmed);
        let handler: BoxHandler = Arc::new(handler);
        let chain = interceptor::compose(&self.collect_chain(), handler.clone());
        let metadata = Arc::new(Metadata {
            handler,
            chain,
            params_type: params_type.map(Into::into),
            result_type: result_type.map(Into::into),
        });
        self.shared
            .methods
            .write()
            .unwrap()
            .insert(full_name, metadata);
        Ok(())
    }

    /// Appends interceptors to this node's local list. Interceptors added
    /// here affect methods registered on this node and any namespace
    /// created from it afterward — never methods already registered, and
    /// never sibling namespaces.
    pub fn with(&self, interceptors: impl IntoIterator<Item = BoxInterceptor>) {
        self.node
            .interceptors
            .lock()
            .unwrap()
            .extend(interceptors);
    }

    /// Returns a copy of this node's own (non-inherited) interceptor list.
    pub fn interceptors(&self) -> Vec<BoxInterceptor> {
        self.node.interceptors.lock().unwrap().clone()
    }

    /// Creates a child namespace and runs `build` against it.
    ///
    /// `namespace` is trimmed of leading/trailing separators; internal
    /// separators are preserved, so `"a.b"` is a legal (if unusual)
    /// single-segment namespace name.
    pub fn namespace(&self, namespace: &str, build: impl FnOnce(&Registry)) {
        let trimmed = self.trim_separator(namespace);
        let child = Registry {
            shared: self.shared.clone(),
            node: Arc::new(NodeData {
                prefix: self.append_namespace(&self.node.prefix, trimmed),
                interceptors: Mutex::new(Vec::new()),
                parent: Some(self.node.clone()),
            }),
        };
        build(&child);
    }

    /// Looks up a method by its fully-qualified name. A single concurrent
    /// read; may overlap in-flight registrations.
    pub fn lookup(&self, full_name: &str) -> Option<Arc<Metadata>> {
        self.shared.methods.read().unwrap().get(full_name).cloned()
    }

    /// Returns every registered method's fully-qualified name. Useful for
    /// diagnostics and tests.
    pub fn method_names(&self) -> Vec<String> {
        self.shared.methods.read().unwrap().keys().cloned().collect()
    }

    fn collect_chain(&self) -> Vec<BoxInterceptor> {
        let mut levels = Vec::new();
        let mut current = Some(self.node.clone());
        while let Some(n) = current {
            levels.push(n.interceptors.lock().unwrap().clone());
            current = n.parent.clone();
        }
        levels.reverse();
        levels.into_iter().flatten().collect()
    }

    fn trim_separator<'a>(&self, s: &'a str) -> &'a str {
        s.trim_matches(self.shared.separator)
    }

    fn append_namespace(&self, base: &str, namespace: &str) -> String {
        if base.is_empty() {
            namespace.to_string()
        } else if namespace.is_empty() {
            base.to_string()
        } else {
            format!("{base}{}{namespace}", self.shared.separator)
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::interceptor::RequestInfo;
    use serde_json::value::RawValue;
    use std::sync::Mutex as StdMutex;

    fn ok_handler() -> impl Handler {
        move |_ctx: &Context, _params: Option<&RawValue>, _info: &RequestInfo| {
            Ok(RawValue::from_string("null".to_string()).unwrap())
        }
    }

    fn recorder(log: Arc<StdMutex<Vec<&'static str>>>, name: &'static str) -> BoxInterceptor {
        Arc::new(move |ctx: &Context, params: Option<&RawValue>, info: &RequestInfo, next: &dyn Handler| {
            log.lock().unwrap().push(name);
            next.call(ctx, params, info)
        })
    }

    #[test]
    fn registers_and_looks_up_a_flat_method() {
        let registry = Registry::new();
        registry
            .register("subtract", ok_handler(), None::<&str>, None::<&str>)
            .unwrap();
        assert!(registry.lookup("subtract").is_some());
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn namespaces_join_with_separator_and_trim_edges() {
        let registry = Registry::new();
        registry.namespace(".user.", |ns| {
            ns.register("create", ok_handler(), None::<&str>, None::<&str>)
                .unwrap();
        });
        assert!(registry.lookup("user.create").is_some());
    }

    #[test]
    fn empty_method_name_is_rejected() {
        let registry = Registry::new();
        let err = registry.register("   ", ok_handler(), None::<&str>, None::<&str>);
        // only separator-trimming happens; a name of only separators is empty
        let registry_dotsep = Registry::new();
        let err2 = registry_dotsep.register(".", ok_handler(), None::<&str>, None::<&str>);
        assert!(err.is_ok()); // "   " has no separator chars to trim, stays non-empty
        assert!(matches!(err2, Err(RegisterError::EmptyName)));
    }

    #[test]
    fn later_registration_overwrites_earlier_one() {
        let registry = Registry::new();
        registry.register("m", ok_handler(), None::<&str>, None::<&str>).unwrap();
        let first = registry.lookup("m").unwrap();
        registry.register("m", ok_handler(), None::<&str>, None::<&str>).unwrap();
        let second = registry.lookup("m").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn interceptor_order_is_root_to_leaf_outer_to_inner() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let registry = Registry::new();
        registry.with([recorder(log.clone(), "A"), recorder(log.clone(), "B")]);
        registry.namespace("child", |ns| {
            ns.with([recorder(log.clone(), "C")]);
            ns.register("m", ok_handler(), None::<&str>, None::<&str>).unwrap();
        });
        let metadata = registry.lookup("child.m").unwrap();
        let ctx = Context::new();
        let info = RequestInfo {
            method_full_name: "child.m".to_string(),
            is_batch: false,
            id: crate::id::Id::Absent,
        };
        metadata.chain.call(&ctx, None, &info).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["A", "B", "C"]);
    }

    #[test]
    fn later_with_does_not_rewrap_already_registered_methods() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let registry = Registry::new();
        registry.register("m", ok_handler(), None::<&str>, None::<&str>).unwrap();
        registry.with([recorder(log.clone(), "late")]);
        let metadata = registry.lookup("m").unwrap();
        let ctx = Context::new();
        let info = RequestInfo {
            method_full_name: "m".to_string(),
            is_batch: false,
            id: crate::id::Id::Absent,
        };
        metadata.chain.call(&ctx, None, &info).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn sibling_namespaces_do_not_share_interceptors() {
        let log = Arc::new(StdMutex::new(Vec::new()));
        let registry = Registry::new();
        registry.namespace("a", |ns| {
            ns.with([recorder(log.clone(), "a-only")]);
            ns.register("m", ok_handler(), None::<&str>, None::<&str>).unwrap();
        });
        registry.namespace("b", |ns| {
            ns.register("m", ok_handler(), None::<&str>, None::<&str>).unwrap();
        });
        let metadata = registry.lookup("b.m").unwrap();
        let ctx = Context::new();
        let info = RequestInfo {
            method_full_name: "b.m".to_string(),
            is_batch: false,
            id: crate::id::Id::Absent,
        };
        metadata.chain.call(&ctx, None, &info).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }
}
