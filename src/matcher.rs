//! Eligibility predicate for interception.
//!
//! A method is eligible when it is public, declared under the root namespace,
//! and is not an accessor or an object-protocol method.

use crate::callsite::MethodSignature;

/// Root namespace used when none is configured.
pub const DEFAULT_ROOT_NAMESPACE: &str = "ru";

/// Object-protocol methods that are never wrapped: (name, arity).
const EXCLUDED_METHODS: &[(&str, usize)] = &[
    ("hashCode", 0),
    ("toString", 0),
    ("equals", 1),
    ("hash_code", 0),
    ("to_string", 0),
    ("fmt", 1),
    ("hash", 1),
    ("eq", 1),
    ("ne", 1),
];

/// Decides which method signatures get wrapped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    root: String,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT_NAMESPACE)
    }
}

impl Matcher {
    /// Create a matcher for the given root namespace.
    ///
    /// An empty root matches every module.
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let root = root.trim_end_matches("::").to_string();
        Self { root }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// Whether `module_path` is the root or one of its descendants.
    pub fn in_namespace(&self, module_path: &str) -> bool {
        if self.root.is_empty() {
            return true;
        }
        match module_path.strip_prefix(self.root.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with("::"),
            None => false,
        }
    }

    /// Getters, setters and object-protocol methods.
    ///
    /// - getter: `get*` with no arguments
    /// - setter: `set*` with exactly one argument and a unit return
    /// - `hashCode`, `toString`, `equals` and their Rust counterparts
    pub fn is_excluded(name: &str, arity: usize, returns_unit: bool) -> bool {
        if name.starts_with("get") && arity == 0 {
            return true;
        }
        if name.starts_with("set") && arity == 1 && returns_unit {
            return true;
        }
        EXCLUDED_METHODS
            .iter()
            .any(|(excluded, excluded_arity)| *excluded == name && *excluded_arity == arity)
    }

    /// Full eligibility check for a signature.
    pub fn matches(&self, signature: &MethodSignature) -> bool {
        signature.is_public()
            && self.in_namespace(signature.module)
            && !Self::is_excluded(signature.name, signature.arity(), signature.returns_unit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callsite::Parameter;

    const VALUE: &[Parameter] = &[Parameter::new("value", "u32")];
    const OTHER: &[Parameter] = &[Parameter::new("other", "&Self")];

    fn method(module: &'static str, name: &'static str) -> MethodSignature {
        MethodSignature::new(module, Some("Service"), name)
    }

    #[test]
    fn test_default_root() {
        assert_eq!(Matcher::default().root(), "ru");
    }

    #[test]
    fn test_namespace_root_and_descendants() {
        let matcher = Matcher::new("ru");
        assert!(matcher.in_namespace("ru"));
        assert!(matcher.in_namespace("ru::shop"));
        assert!(matcher.in_namespace("ru::shop::orders"));
        assert!(!matcher.in_namespace("rust"));
        assert!(!matcher.in_namespace("ruby::ru"));
        assert!(!matcher.in_namespace("app::ru"));
    }

    #[test]
    fn test_trailing_separator_is_ignored() {
        let matcher = Matcher::new("ru::");
        assert_eq!(matcher.root(), "ru");
        assert!(matcher.in_namespace("ru::shop"));
    }

    #[test]
    fn test_empty_root_matches_everything() {
        let matcher = Matcher::new("");
        assert!(matcher.in_namespace("anything::at::all"));
    }

    #[test]
    fn test_public_instance_and_static_methods_match() {
        let matcher = Matcher::default();
        assert!(matcher.matches(&method("ru::shop", "place_order")));
        assert!(matcher.matches(&method("ru::shop", "place_order").associated()));
        assert!(matcher.matches(&MethodSignature::function("ru::shop", "checkout")));
    }

    #[test]
    fn test_restricted_methods_do_not_match() {
        let matcher = Matcher::default();
        assert!(!matcher.matches(&method("ru::shop", "place_order").restricted()));
    }

    #[test]
    fn test_outside_namespace_does_not_match() {
        let matcher = Matcher::default();
        assert!(!matcher.matches(&method("app::shop", "place_order")));
    }

    #[test]
    fn test_getters_excluded() {
        let matcher = Matcher::default();
        assert!(!matcher.matches(&method("ru::shop", "getTotal").returning("u64")));
        assert!(!matcher.matches(&method("ru::shop", "get_total").returning("u64")));
        // A `get*` method with arguments is a regular call.
        assert!(matcher.matches(&method("ru::shop", "get_item").with_params(VALUE)));
    }

    #[test]
    fn test_setters_excluded() {
        let matcher = Matcher::default();
        assert!(!matcher.matches(&method("ru::shop", "setTotal").with_params(VALUE)));
        assert!(!matcher.matches(&method("ru::shop", "set_total").with_params(VALUE)));
        // Returning a value or taking no argument is not a setter.
        assert!(matcher.matches(&method("ru::shop", "set_total").with_params(VALUE).returning("u32")));
        assert!(matcher.matches(&method("ru::shop", "settle")));
    }

    #[test]
    fn test_object_protocol_methods_excluded() {
        let matcher = Matcher::default();
        assert!(!matcher.matches(&method("ru::shop", "hashCode").returning("i32")));
        assert!(!matcher.matches(&method("ru::shop", "toString").returning("String")));
        assert!(!matcher.matches(&method("ru::shop", "equals").with_params(OTHER).returning("bool")));
        assert!(!matcher.matches(&method("ru::shop", "to_string").returning("String")));
        assert!(!matcher.matches(&method("ru::shop", "eq").with_params(OTHER).returning("bool")));
        // Same names with a different arity are ordinary methods.
        assert!(matcher.matches(&method("ru::shop", "equals")));
    }
}
