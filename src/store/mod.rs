//! Reactive state: snapshots, mutations and change notification.
//!
//! ## Contents
//! - [`Store`], [`StoreBuilder`] the state container and its optional hooks
//! - [`Change`] outcome of a mutation (`()` / `true` notify, `false` stores silently)
//! - [`Patch`], [`Merge`] shallow partial updates
//! - [`StoreListener`], [`StoreBinding`] subscriptions and their handles
//! - [`Notified`] completion signal covering deferred listener work
//!
//! ## Quick reference
//! - **Read**: `store.state()`.
//! - **Write**: `store.set(|s| &mut s.count, 1)`, `store.commit(|s| ..)`,
//!   `store.commit_key(|s| &mut s.items, |items| ..)`, `store.patch(Patch::Values(..))`.
//! - **Observe**: `store.on(StoreListener::new(..))`, `binding.destroy()`, `store.off(..)`.
//! - **Wait**: `store.set(..).await` resolves once deferred listeners settled.

mod binding;
mod change;
mod listener;
mod notified;
mod patch;
#[allow(clippy::module_inception)]
mod store;

pub use binding::StoreBinding;
pub use change::Change;
pub use listener::StoreListener;
pub use notified::Notified;
pub use patch::{Merge, Patch};
pub use store::{Store, StoreBuilder};
