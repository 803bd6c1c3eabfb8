//! Dependency injection: keys, bindings, scopes and injection cells.
//!
//! ## Contents
//! - [`Injector`] binding resolver with singleton/prototype scopes
//! - [`BeanKey`] identity of a binding (type or name)
//! - [`BindingSyntax`], [`ScopeSyntax`] fluent configuration
//! - [`InjectionPoints`], [`Inject`] per-type injection tables and their cells
//! - [`BindingInfo`], [`BindingScope`], [`BindingType`] introspection
//!
//! ## Quick reference
//! - **Bind**: `injector.bind::<dyn Greeter>().to::<English>(|e| e)?.as_prototype()`.
//! - **Constant**: `injector.bind_named::<Url>("db").to_constant(url)?`.
//! - **Resolve**: `injector.bean::<Concrete>()?` (auto-wires) or `injector.resolve::<dyn Greeter>()?`.
//! - **Inject**: register `InjectionPoints::<T>` once, then `injector.instantiate::<T>()?`.

mod definition;
mod inject;
#[allow(clippy::module_inception)]
mod injector;
mod key;
mod points;
mod syntax;

pub use definition::{BindingInfo, BindingScope, BindingType};
pub use inject::Inject;
pub use injector::Injector;
pub use key::BeanKey;
pub use points::{InjectionPoint, InjectionPoints};
pub use syntax::{BindingSyntax, ScopeSyntax};
