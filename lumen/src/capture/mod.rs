//! Safe conversion of arbitrary Rust values into a serializable [`CapturedValue`] tree.
//!
//! Mirrors the capture stage of a structured-logging pipeline: scalars are captured
//! directly, registered "scalar" types are captured via their [`Capture`] impl without
//! descending into their fields, and everything else is captured structurally up to a
//! configurable depth. Unlike duck-typed reflection, Rust has no runtime introspection
//! over arbitrary fields, so structural capture is opt-in through the [`Capture`] trait
//! rather than automatic — the caller derives or implements it for their own types.

mod guard;

pub use guard::CaptureGuard;

use chrono::{DateTime, Utc};
use std::any::TypeId;
use std::collections::HashSet;
use std::time::Duration;

/// A captured value, ready to be attached to an [`crate::event::Event`] and eventually
/// serialized to OTLP's `AnyValue`.
#[derive(Debug, Clone, PartialEq)]
pub enum CapturedValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Time(DateTime<Utc>),
    Duration(Duration),
    List(Vec<CapturedValue>),
    /// Order-preserving map; property order matters for rendering and for readers
    /// that expect deterministic output.
    Map(Vec<(String, CapturedValue)>),
    Struct {
        type_name: &'static str,
        fields: Vec<(String, CapturedValue)>,
    },
    /// Placeholder for a value that exceeded the capturer's depth or size budget.
    Truncated(String),
}

impl CapturedValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CapturedValue::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Renders a best-effort scalar display, used by the template engine for plain
    /// (non-destructured) property substitution.
    pub fn render_scalar(&self) -> String {
        match self {
            CapturedValue::Null => "null".to_string(),
            CapturedValue::Bool(b) => b.to_string(),
            CapturedValue::Int(i) => i.to_string(),
            CapturedValue::UInt(u) => u.to_string(),
            CapturedValue::Float(f) => f.to_string(),
            CapturedValue::Str(s) => s.clone(),
            CapturedValue::Bytes(b) => format!("<{} bytes>", b.len()),
            CapturedValue::Time(t) => t.to_rfc3339(),
            CapturedValue::Duration(d) => format!("{:?}", d),
            CapturedValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(CapturedValue::render_scalar).collect();
                format!("[{}]", rendered.join(", "))
            }
            CapturedValue::Map(entries) => {
                let rendered: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.render_scalar()))
                    .collect();
                format!("{{{}}}", rendered.join(", "))
            }
            CapturedValue::Struct { type_name, fields } => {
                let rendered: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.render_scalar()))
                    .collect();
                format!("{} {{ {} }}", type_name, rendered.join(", "))
            }
            CapturedValue::Truncated(reason) => format!("<truncated: {}>", reason),
        }
    }
}

/// Implemented by types that know how to capture themselves as a [`CapturedValue`].
///
/// Registered "scalar" types (via [`Capturer::register_scalar`]) are captured through
/// this trait without the capturer descending into their fields — the Rust analogue of
/// the original's duck-typed `LogValue()` method.
pub trait Capture {
    fn capture(&self) -> CapturedValue;
}

macro_rules! impl_capture_int {
    ($($t:ty),*) => {
        $(impl Capture for $t {
            fn capture(&self) -> CapturedValue { CapturedValue::Int(*self as i64) }
        })*
    };
}
macro_rules! impl_capture_uint {
    ($($t:ty),*) => {
        $(impl Capture for $t {
            fn capture(&self) -> CapturedValue { CapturedValue::UInt(*self as u64) }
        })*
    };
}

impl_capture_int!(i8, i16, i32, i64, isize);
impl_capture_uint!(u8, u16, u32, u64, usize);

impl Capture for bool {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Bool(*self)
    }
}
impl Capture for f32 {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Float(*self as f64)
    }
}
impl Capture for f64 {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Float(*self)
    }
}
impl Capture for str {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Str(self.to_string())
    }
}
impl Capture for String {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Str(self.clone())
    }
}
impl<T: Capture> Capture for Option<T> {
    fn capture(&self) -> CapturedValue {
        match self {
            Some(v) => v.capture(),
            None => CapturedValue::Null,
        }
    }
}
impl<T: Capture> Capture for Vec<T> {
    fn capture(&self) -> CapturedValue {
        CapturedValue::List(self.iter().map(Capture::capture).collect())
    }
}
impl Capture for DateTime<Utc> {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Time(*self)
    }
}
impl Capture for Duration {
    fn capture(&self) -> CapturedValue {
        CapturedValue::Duration(*self)
    }
}
impl Capture for CapturedValue {
    /// Capturing an already-captured value is the identity — re-destructuring
    /// something that's already a `CapturedValue` tree must not change it.
    fn capture(&self) -> CapturedValue {
        self.clone()
    }
}

/// Default descent depth before a structural capture is truncated.
pub const DEFAULT_MAX_DEPTH: usize = 7;
/// Default element cap for lists/maps before the remainder is summarized away.
pub const DEFAULT_MAX_ELEMENTS: usize = 1000;

/// Owns the set of types registered to capture via [`Capture`] instead of structural
/// descent, plus the depth/size budget applied to structural captures.
///
/// Registration is write-once: the spec treats the registered-scalar set as fixed at
/// pipeline construction, so attempting to register after the first capture is a
/// configuration error rather than a silent no-op.
pub struct Capturer {
    registered_scalars: HashSet<TypeId>,
    max_depth: usize,
    max_elements: usize,
    sealed: std::sync::atomic::AtomicBool,
}

impl Default for Capturer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH, DEFAULT_MAX_ELEMENTS)
    }
}

impl Capturer {
    pub fn new(max_depth: usize, max_elements: usize) -> Self {
        Self {
            registered_scalars: HashSet::new(),
            max_depth,
            max_elements,
            sealed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Registers `T` as a scalar type: future captures of `T` call [`Capture::capture`]
    /// directly rather than treating it as a struct to descend into.
    ///
    /// Returns [`crate::error::ConfigError::RegistrationAfterFirstCapture`] once any
    /// value has been captured through this `Capturer`.
    pub fn register_scalar<T: 'static>(&mut self) -> Result<(), crate::error::ConfigError> {
        if self.sealed.load(std::sync::atomic::Ordering::Acquire) {
            return Err(crate::error::ConfigError::RegistrationAfterFirstCapture);
        }
        if !self.registered_scalars.insert(TypeId::of::<T>()) {
            return Err(crate::error::ConfigError::DuplicateScalarRegistration);
        }
        Ok(())
    }

    /// Captures a destructured (`@`) value, guarding against panics in a hostile
    /// [`Capture`] implementation and against runaway recursion.
    pub fn capture_destructured<T: Capture + 'static>(&self, value: &T) -> CapturedValue {
        self.sealed.store(true, std::sync::atomic::Ordering::Release);
        let guard = CaptureGuard::new(self.max_depth);
        let Some(_scope) = guard.enter() else {
            return CapturedValue::Truncated("<max depth reached>".into());
        };
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| value.capture()));
        match result {
            Ok(v) => self.clamp(v),
            Err(_) => CapturedValue::Truncated("capture panicked".into()),
        }
    }

    /// Captures a plain (non-destructured) value: always a scalar render, never
    /// descends into structure. Used for `{Name}` (no `@`/`$` hint) bindings.
    pub fn capture_scalar<T: Capture>(&self, value: &T) -> CapturedValue {
        value.capture()
    }

    fn clamp(&self, value: CapturedValue) -> CapturedValue {
        match value {
            CapturedValue::List(items) if items.len() > self.max_elements => {
                let mut truncated: Vec<CapturedValue> =
                    items.into_iter().take(self.max_elements).collect();
                truncated.push(CapturedValue::Truncated(format!(
                    "list truncated at {} elements",
                    self.max_elements
                )));
                CapturedValue::List(truncated)
            }
            CapturedValue::Map(entries) if entries.len() > self.max_elements => {
                let mut truncated: Vec<(String, CapturedValue)> =
                    entries.into_iter().take(self.max_elements).collect();
                truncated.push((
                    "__truncated__".to_string(),
                    CapturedValue::Truncated(format!("map truncated at {} elements", self.max_elements)),
                ));
                CapturedValue::Map(truncated)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod __test__ {
    use super::*;

    struct Poison;
    impl Capture for Poison {
        fn capture(&self) -> CapturedValue {
            panic!("boom");
        }
    }

    #[test]
    fn capture_recovers_from_panicking_impl() {
        let capturer = Capturer::default();
        let v = capturer.capture_destructured(&Poison);
        assert!(matches!(v, CapturedValue::Truncated(_)));
    }

    #[test]
    fn scalar_registration_is_write_once() {
        let mut capturer = Capturer::default();
        capturer.register_scalar::<i32>().unwrap();
        let v = capturer.capture_destructured(&42i32);
        assert!(matches!(capturer.register_scalar::<i64>(), Err(crate::error::ConfigError::RegistrationAfterFirstCapture)));
        assert_eq!(v, CapturedValue::Int(42));
    }

    #[test]
    fn list_is_truncated_at_max_elements() {
        let capturer = Capturer::new(DEFAULT_MAX_DEPTH, 3);
        let values: Vec<i32> = (0..10).collect();
        let v = capturer.capture_destructured(&values);
        if let CapturedValue::List(items) = v {
            assert_eq!(items.len(), 4); // 3 kept + 1 truncation marker
        } else {
            panic!("expected list");
        }
    }

    #[test]
    fn capture_of_captured_value_is_idempotent() {
        let capturer = Capturer::default();
        let once = capturer.capture_destructured(&42i64);
        let twice = capturer.capture_destructured(&once);
        assert_eq!(once, twice);
    }

    /// A self-nesting type standing in for a cyclic object graph: Rust ownership
    /// rules rule out an actual reference cycle by value, but a chain built deeper
    /// than `max_depth` exercises the same non-termination risk. Its `capture` enters
    /// the shared depth guard at every level, the way a recursive derive would.
    struct Chain {
        next: Option<Box<Chain>>,
    }
    impl Capture for Chain {
        fn capture(&self) -> CapturedValue {
            let guard = CaptureGuard::new(DEFAULT_MAX_DEPTH);
            let Some(_scope) = guard.enter() else {
                return CapturedValue::Truncated("<max depth reached>".into());
            };
            match &self.next {
                Some(next) => CapturedValue::Struct {
                    type_name: "Chain",
                    fields: vec![("next".to_string(), next.capture())],
                },
                None => CapturedValue::Struct { type_name: "Chain", fields: vec![] },
            }
        }
    }

    fn contains_max_depth_marker(v: &CapturedValue) -> bool {
        match v {
            CapturedValue::Truncated(s) if s == "<max depth reached>" => true,
            CapturedValue::Struct { fields, .. } => fields.iter().any(|(_, v)| contains_max_depth_marker(v)),
            _ => false,
        }
    }

    #[test]
    fn deeply_nested_capture_terminates_with_max_depth_marker() {
        let mut chain = Chain { next: None };
        for _ in 0..(DEFAULT_MAX_DEPTH * 3) {
            chain = Chain { next: Some(Box::new(chain)) };
        }
        let capturer = Capturer::default();
        let captured = capturer.capture_destructured(&chain);
        assert!(contains_max_depth_marker(&captured));
    }
}
