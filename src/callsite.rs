//! Call-site descriptors.
//!
//! A call-site is split the way a weaver would split a join point:
//! - [`MethodSignature`]: the static part, usually a `static` item next to the method
//! - [`SourceLocation`]: where the call was made from
//! - argument values, borrowed for the duration of the call
//!
//! The [`call_site!`](crate::call_site) macro builds a [`CallSite`] with the
//! caller's `file!()` and `line!()`.

use std::fmt;

/// A named, typed parameter of a [`MethodSignature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameter {
    pub name: &'static str,
    pub ty: &'static str,
}

impl Parameter {
    pub const fn new(name: &'static str, ty: &'static str) -> Self {
        Self { name, ty }
    }
}

/// Whether a method takes `self` or is an associated/free function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    Instance,
    Static,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Restricted,
}

/// Static description of a method that may be intercepted.
///
/// Built with `const fn`s so it can live in a `static`:
///
/// ```
/// use spanwrap::{MethodSignature, Parameter};
///
/// static PLACE_ORDER: MethodSignature = MethodSignature::new("ru::shop", Some("OrderService"), "place_order")
///     .with_params(&[Parameter::new("sku", "&str"), Parameter::new("qty", "u32")])
///     .returning("OrderId");
///
/// assert_eq!(PLACE_ORDER.declaring_type(), "ru::shop::OrderService");
/// assert_eq!(PLACE_ORDER.arity(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodSignature {
    /// Module path the method is declared in (`module_path!()`).
    pub module: &'static str,
    /// Owning type, `None` for free functions.
    pub owner: Option<&'static str>,
    pub name: &'static str,
    pub receiver: Receiver,
    pub visibility: Visibility,
    pub params: &'static [Parameter],
    /// `None` means the method returns `()`.
    pub return_type: Option<&'static str>,
}

impl MethodSignature {
    /// Public instance method (or free function when `owner` is `None`) with no
    /// parameters and a unit return.
    pub const fn new(module: &'static str, owner: Option<&'static str>, name: &'static str) -> Self {
        Self {
            module,
            owner,
            name,
            receiver: Receiver::Instance,
            visibility: Visibility::Public,
            params: &[],
            return_type: None,
        }
    }

    /// Public free function.
    pub const fn function(module: &'static str, name: &'static str) -> Self {
        Self::new(module, None, name).associated()
    }

    pub const fn with_params(mut self, params: &'static [Parameter]) -> Self {
        self.params = params;
        self
    }

    pub const fn returning(mut self, ty: &'static str) -> Self {
        self.return_type = Some(ty);
        self
    }

    /// Mark as not taking `self`.
    pub const fn associated(mut self) -> Self {
        self.receiver = Receiver::Static;
        self
    }

    /// Mark as non-public (`pub(crate)` or private).
    pub const fn restricted(mut self) -> Self {
        self.visibility = Visibility::Restricted;
        self
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn returns_unit(&self) -> bool {
        matches!(self.return_type, None | Some("()"))
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// Fully-qualified name of the declaring type, or the module for free functions.
    pub fn declaring_type(&self) -> String {
        match self.owner {
            Some(owner) if !self.module.is_empty() => format!("{}::{}", self.module, owner),
            Some(owner) => owner.to_string(),
            None => self.module.to_string(),
        }
    }

    /// Full signature string, used as the span name.
    ///
    /// `pub fn ru::shop::OrderService::place_order(&self, sku: &str, qty: u32) -> OrderId`
    pub fn long_string(&self) -> String {
        let mut out = String::with_capacity(64);
        out.push_str(match self.visibility {
            Visibility::Public => "pub fn ",
            Visibility::Restricted => "fn ",
        });
        out.push_str(&self.declaring_type());
        out.push_str("::");
        out.push_str(self.name);
        out.push('(');

        let mut first = true;
        if self.receiver == Receiver::Instance {
            out.push_str("&self");
            first = false;
        }
        for param in self.params {
            if !first {
                out.push_str(", ");
            }
            first = false;
            out.push_str(param.name);
            out.push_str(": ");
            out.push_str(param.ty);
        }
        out.push(')');

        if let Some(ret) = self.return_type.filter(|ret| *ret != "()") {
            out.push_str(" -> ");
            out.push_str(ret);
        }
        out
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.long_string())
    }
}

/// Where a call was made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: &'static str,
    pub line: u32,
}

impl SourceLocation {
    pub const fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// Location of a generated call-site (proxy, derive output, ...). Never traced.
    pub const fn synthetic() -> Self {
        Self {
            file: "<generated>",
            line: 0,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.line == 0
    }
}

/// One invocation of a method: signature, location and borrowed argument values.
#[derive(Clone, Copy)]
pub struct CallSite<'a> {
    signature: &'a MethodSignature,
    location: SourceLocation,
    args: &'a [&'a (dyn fmt::Debug + Sync)],
}

impl<'a> CallSite<'a> {
    pub fn new(signature: &'a MethodSignature, location: SourceLocation) -> Self {
        Self {
            signature,
            location,
            args: &[],
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: &'a [&'a (dyn fmt::Debug + Sync)]) -> Self {
        self.args = args;
        self
    }

    pub fn signature(&self) -> &'a MethodSignature {
        self.signature
    }

    pub fn location(&self) -> SourceLocation {
        self.location
    }

    pub fn line(&self) -> u32 {
        self.location.line
    }

    pub fn args(&self) -> &'a [&'a (dyn fmt::Debug + Sync)] {
        self.args
    }

    /// Parameter names paired with argument values.
    ///
    /// Stops at the shorter of the two lists.
    pub fn arguments(&self) -> impl Iterator<Item = (&'static str, &'a (dyn fmt::Debug + Sync))> + 'a {
        self.signature
            .params
            .iter()
            .map(|param| param.name)
            .zip(self.args.iter().copied())
    }

    pub fn span_name(&self) -> String {
        self.signature.long_string()
    }
}

impl fmt::Debug for CallSite<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("signature", &self.signature.long_string())
            .field("location", &self.location)
            .field("args", &self.args)
            .finish()
    }
}

/// Build a [`CallSite`] at the current source location.
///
/// Arguments are borrowed by a temporary array, so use the macro inline in the
/// intercepting call rather than binding it with `let`:
///
/// ```
/// use spanwrap::{call_site, Interceptor, InterceptorConfig, MethodSignature, MemorySink, Parameter};
///
/// static ADD: MethodSignature = MethodSignature::function("ru::math", "add")
///     .with_params(&[Parameter::new("a", "i32"), Parameter::new("b", "i32")])
///     .returning("i32");
///
/// let interceptor = Interceptor::new(MemorySink::new(), &InterceptorConfig::default());
/// let (a, b) = (2, 3);
/// let sum = interceptor.intercept_infallible(&call_site!(ADD, a, b), || a + b);
/// assert_eq!(sum, 5);
/// ```
#[macro_export]
macro_rules! call_site {
    ($signature:expr) => {
        $crate::CallSite::new(&$signature, $crate::SourceLocation::new(file!(), line!()))
    };
    ($signature:expr, $($arg:expr),+ $(,)?) => {
        $crate::CallSite::new(&$signature, $crate::SourceLocation::new(file!(), line!()))
            .with_args(&[$(&$arg as &(dyn ::std::fmt::Debug + Sync)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    static PLACE_ORDER: MethodSignature =
        MethodSignature::new("ru::shop", Some("OrderService"), "place_order")
            .with_params(&[Parameter::new("sku", "&str"), Parameter::new("qty", "u32")])
            .returning("OrderId");

    #[test]
    fn test_long_string_instance_method() {
        assert_eq!(
            PLACE_ORDER.long_string(),
            "pub fn ru::shop::OrderService::place_order(&self, sku: &str, qty: u32) -> OrderId"
        );
    }

    #[test]
    fn test_long_string_free_function() {
        let sig = MethodSignature::function("ru::util", "now");
        assert_eq!(sig.long_string(), "pub fn ru::util::now()");
        assert_eq!(sig.declaring_type(), "ru::util");
    }

    #[test]
    fn test_long_string_restricted_unit_return() {
        let sig = MethodSignature::new("ru::shop", Some("Cart"), "clear")
            .restricted()
            .returning("()");
        assert_eq!(sig.long_string(), "fn ru::shop::Cart::clear(&self)");
        assert!(sig.returns_unit());
    }

    #[test]
    fn test_arguments_pair_names_with_values() {
        let sku = "A-1";
        let qty = 3u32;
        let args: [&(dyn fmt::Debug + Sync); 2] = [&sku, &qty];
        let site = CallSite::new(&PLACE_ORDER, SourceLocation::new("x.rs", 10)).with_args(&args);

        let rendered: Vec<(String, String)> = site
            .arguments()
            .map(|(name, value)| (name.to_string(), format!("{value:?}")))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("sku".to_string(), "\"A-1\"".to_string()),
                ("qty".to_string(), "3".to_string())
            ]
        );
    }

    #[test]
    fn test_arguments_stop_at_shorter_list() {
        let sku = "A-1";
        let args: [&(dyn fmt::Debug + Sync); 1] = [&sku];
        let site = CallSite::new(&PLACE_ORDER, SourceLocation::new("x.rs", 10)).with_args(&args);
        assert_eq!(site.arguments().count(), 1);
    }

    #[test]
    fn test_macro_captures_location() {
        let site = call_site!(PLACE_ORDER);
        assert_eq!(site.location().file, file!());
        assert!(site.line() > 0);
        assert!(!site.location().is_synthetic());
    }

    #[test]
    fn test_synthetic_location() {
        assert!(SourceLocation::synthetic().is_synthetic());
    }
}
