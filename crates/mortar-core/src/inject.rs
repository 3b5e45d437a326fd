//! Type-indexed dependency registry.
//!
//! An [`Injector`] maps a type to exactly one value of that type. Lookups check
//! the local map first and then walk the parent chain, which is how the
//! framework layers request-scoped bindings (the request, the response sink)
//! on top of application-scoped ones (configuration, user services, the
//! return dispatcher) without letting the former leak across requests.
//!
//! Values are always stored as `Arc<T>`, which lets unsized types such as
//! trait objects be bound with [`Injector::bind_as`]:
//!
//! ```rust,ignore
//! let mut injector = Injector::new();
//! injector.bind(Database::connect()?);
//! injector.bind_as::<dyn ReturnHandler>(Arc::new(DefaultReturnHandler));
//!
//! let db: Arc<Database> = injector.resolve()?;
//! ```
//!
//! Functions can be called with their arguments filled in from the registry
//! through [`Injector::invoke`]; every argument must implement
//! [`FromInjector`], e.g. [`Dep<T>`] or `Option<Dep<T>>`.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::error::{ResolveError, ResolveResult};

#[derive(Clone)]
struct Binding {
    type_name: &'static str,
    /// Always an `Arc<T>` erased to `Any`.
    value: Arc<dyn Any + Send + Sync>,
}

/// A type-indexed value store with optional parent fallback.
///
/// At most one value per type is held by a single injector; binding the same
/// type again replaces the previous value.
#[derive(Clone, Default)]
pub struct Injector {
    values: HashMap<TypeId, Binding>,
    parent: Option<Arc<Injector>>,
}

impl Injector {
    /// Creates an empty root injector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty injector that falls back to `parent`.
    pub fn with_parent(parent: Arc<Injector>) -> Self {
        Self {
            values: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Replaces the parent injector.
    pub fn set_parent(&mut self, parent: Arc<Injector>) {
        self.parent = Some(parent);
    }

    /// Returns the parent injector, if any.
    pub fn parent(&self) -> Option<&Arc<Injector>> {
        self.parent.as_ref()
    }

    /// Binds `value` under its own type.
    pub fn bind<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.bind_as::<T>(Arc::new(value))
    }

    /// Binds `value` under the explicitly named type `T`.
    ///
    /// `T` may be unsized, so a concrete implementation can be bound under
    /// the trait object type that handlers ask for.
    pub fn bind_as<T: ?Sized + Send + Sync + 'static>(&mut self, value: Arc<T>) -> &mut Self {
        self.values.insert(
            TypeId::of::<T>(),
            Binding {
                type_name: type_name::<T>(),
                value: Arc::new(value),
            },
        );
        self
    }

    /// Looks up the value bound for `T` here or in any ancestor.
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let key = TypeId::of::<T>();
        let mut current = Some(self);
        while let Some(injector) = current {
            if let Some(binding) = injector.values.get(&key) {
                return binding.value.downcast_ref::<Arc<T>>().cloned();
            }
            current = injector.parent.as_deref();
        }
        None
    }

    /// Like [`get`](Self::get), but fails with [`ResolveError::Unbound`].
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(&self) -> ResolveResult<Arc<T>> {
        self.get::<T>().ok_or_else(ResolveError::unbound::<T>)
    }

    /// Returns `true` if `T` resolves anywhere in the chain.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        let key = TypeId::of::<T>();
        self.values.contains_key(&key) || self.parent.as_ref().is_some_and(|p| p.contains::<T>())
    }

    /// Number of values bound locally (parents excluded).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if nothing is bound locally.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Calls `f` with every parameter resolved from this injector.
    ///
    /// All parameters are resolved before `f` runs; if any of them fails the
    /// function is never called.
    pub fn invoke<F, Args>(&self, f: F) -> ResolveResult<F::Output>
    where
        F: Injectable<Args>,
    {
        f.invoke_with(self)
    }
}

impl fmt::Debug for Injector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut bound: Vec<&str> = self.values.values().map(|b| b.type_name).collect();
        bound.sort_unstable();
        f.debug_struct("Injector")
            .field("bound", &bound)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

// ============================================================================
// Dep - registry-backed parameter
// ============================================================================

/// A value resolved from the registry by type.
///
/// Used as a handler or [`Injector::invoke`] parameter: `Dep<Config>` asks for
/// the `Config` bound in the registry chain, `Dep<dyn Store>` for a trait
/// object bound with [`Injector::bind_as`].
pub struct Dep<T: ?Sized>(pub Arc<T>);

impl<T: ?Sized> Dep<T> {
    /// Returns the shared value.
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T: ?Sized> Deref for Dep<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T: ?Sized> Clone for Dep<T> {
    fn clone(&self) -> Self {
        Dep(Arc::clone(&self.0))
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Dep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dep").field(&&*self.0).finish()
    }
}

/// Types that can be produced from an [`Injector`].
pub trait FromInjector: Sized {
    /// Resolves `Self` from `injector`.
    fn from_injector(injector: &Injector) -> ResolveResult<Self>;
}

impl<T: ?Sized + Send + Sync + 'static> FromInjector for Dep<T> {
    fn from_injector(injector: &Injector) -> ResolveResult<Self> {
        injector.resolve::<T>().map(Dep)
    }
}

/// Optional dependencies never fail.
impl<T: FromInjector> FromInjector for Option<T> {
    fn from_injector(injector: &Injector) -> ResolveResult<Self> {
        Ok(T::from_injector(injector).ok())
    }
}

// ============================================================================
// Injectable - functions callable through the registry
// ============================================================================

/// Functions whose parameters can all be resolved from an [`Injector`].
///
/// Implemented for every `FnOnce` with up to 12 [`FromInjector`] parameters.
pub trait Injectable<Args> {
    /// The function's return type.
    type Output;

    /// Resolves all parameters, then calls the function.
    fn invoke_with(self, injector: &Injector) -> ResolveResult<Self::Output>;
}

macro_rules! impl_injectable {
    (
        $($ty:ident),*
    ) => {
        #[allow(non_snake_case, unused_variables)]
        impl<F, R, $($ty,)*> Injectable<($($ty,)*)> for F
        where
            F: FnOnce($($ty,)*) -> R,
            $( $ty: FromInjector, )*
        {
            type Output = R;

            fn invoke_with(self, injector: &Injector) -> ResolveResult<R> {
                $(
                    let $ty = $ty::from_injector(injector)?;
                )*
                Ok((self)($($ty,)*))
            }
        }
    };
}

impl_injectable!();
impl_injectable!(T1);
impl_injectable!(T1, T2);
impl_injectable!(T1, T2, T3);
impl_injectable!(T1, T2, T3, T4);
impl_injectable!(T1, T2, T3, T4, T5);
impl_injectable!(T1, T2, T3, T4, T5, T6);
impl_injectable!(T1, T2, T3, T4, T5, T6, T7);
impl_injectable!(T1, T2, T3, T4, T5, T6, T7, T8);
impl_injectable!(T1, T2, T3, T4, T5, T6, T7, T8, T9);
impl_injectable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10);
impl_injectable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11);
impl_injectable!(T1, T2, T3, T4, T5, T6, T7, T8, T9, T10, T11, T12);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, PartialEq)]
    struct Greeting(&'static str);

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;

    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    #[test]
    fn test_bind_and_resolve() {
        let mut injector = Injector::new();
        injector.bind(Greeting("hello")).bind(42u32);

        assert_eq!(*injector.resolve::<Greeting>().unwrap(), Greeting("hello"));
        assert_eq!(*injector.resolve::<u32>().unwrap(), 42);
        assert_eq!(injector.len(), 2);
    }

    #[test]
    fn test_last_write_wins() {
        let mut injector = Injector::new();
        injector.bind(1u8);
        injector.bind(2u8);

        assert_eq!(*injector.resolve::<u8>().unwrap(), 2);
        assert_eq!(injector.len(), 1);
    }

    #[test]
    fn test_missing_type_is_unbound() {
        let injector = Injector::new();
        let err = injector.resolve::<Greeting>().unwrap_err();
        assert_eq!(err, ResolveError::unbound::<Greeting>());
    }

    #[test]
    fn test_child_falls_back_to_parent() {
        let mut root = Injector::new();
        root.bind(Greeting("from parent"));
        let child = Injector::with_parent(Arc::new(root));

        assert_eq!(*child.resolve::<Greeting>().unwrap(), Greeting("from parent"));
        assert!(child.contains::<Greeting>());
        assert!(child.is_empty());
    }

    #[test]
    fn test_child_shadows_parent() {
        let mut root = Injector::new();
        root.bind(Greeting("parent"));
        let root = Arc::new(root);

        let mut child = Injector::with_parent(Arc::clone(&root));
        child.bind(Greeting("child"));

        assert_eq!(*child.resolve::<Greeting>().unwrap(), Greeting("child"));
        assert_eq!(*root.resolve::<Greeting>().unwrap(), Greeting("parent"));
    }

    #[test]
    fn test_bind_as_trait_object() {
        let mut injector = Injector::new();
        injector.bind_as::<dyn Shape>(Arc::new(Square));

        let shape = injector.resolve::<dyn Shape>().unwrap();
        assert_eq!(shape.sides(), 4);
        assert!(injector.get::<Square>().is_none());
    }

    #[test]
    fn test_invoke_resolves_parameters() {
        let mut injector = Injector::new();
        injector.bind(Greeting("hi")).bind(3usize);

        let out = injector
            .invoke(|g: Dep<Greeting>, n: Dep<usize>| g.0.0.repeat(*n))
            .unwrap();
        assert_eq!(out, "hihihi");
    }

    #[test]
    fn test_invoke_fails_before_calling() {
        let injector = Injector::new();
        let called = AtomicBool::new(false);

        let err = injector
            .invoke(|_: Dep<Greeting>| called.store(true, Ordering::SeqCst))
            .unwrap_err();

        assert_eq!(err, ResolveError::unbound::<Greeting>());
        assert!(!called.load(Ordering::SeqCst));
    }

    #[test]
    fn test_optional_dependency() {
        let injector = Injector::new();
        let got = injector
            .invoke(|g: Option<Dep<Greeting>>| g.is_some())
            .unwrap();
        assert!(!got);
    }
}
