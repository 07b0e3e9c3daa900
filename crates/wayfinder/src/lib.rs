//! Navigation state for applications with nested screens.
//!
//! The crate is built from three layers:
//!
//! - [`router`]: stack, tab and drawer routers. Each is a pure function from
//!   a [`NavigationState`] and an [`Action`] to the next state. Untouched
//!   routes are shared between successive states, so identity comparison
//!   tells a consumer which parts of the tree changed.
//! - [`linking`]: a [`Linker`] compiled from a [`LinkingConfig`] maps URL
//!   paths to partial states and states back to paths.
//! - [`NavigationContainer`]: the single writer that owns the current tree,
//!   dispatches actions through the root router and notifies listeners.
//!
//! ```
//! use std::sync::Arc;
//! use wayfinder::{
//!     Action, ComponentRef, NavigationContainer, RouteConfigMap, ScreenConfig, StackOptions,
//!     StackRouter,
//! };
//!
//! let screens = RouteConfigMap::new(vec![
//!     ScreenConfig::new("Home", ComponentRef::new("Home")),
//!     ScreenConfig::new("Profile", ComponentRef::new("Profile")),
//! ])?;
//! let root = StackRouter::new(screens, StackOptions::default())?;
//! let mut container = NavigationContainer::new(Arc::new(root));
//! assert!(container.dispatch(Action::navigate("Profile"))?);
//! assert_eq!(container.state().routes.len(), 2);
//! # Ok::<(), wayfinder::Error>(())
//! ```

pub mod action;
pub mod config;
pub mod container;
pub mod dump;
pub mod error;
pub mod linking;
mod navigation;
pub mod path;
pub mod router;
pub mod state;
pub mod tree;

pub use action::{Action, Navigate};
pub use config::{ComponentRef, RouteConfigMap, ScreenConfig, ScreenOptions};
pub use container::{ActionObserver, ActionQueue, ListenerId, NavigationContainer, StateChange};
pub use error::{Error, PatternError, Result};
pub use linking::{Linker, LinkingConfig, ScreenLinking};
pub use navigation::Navigation;
pub use path::{Path, PathPattern};
pub use router::{
    BackBehavior, DrawerRouter, NavigateBehavior, Router, StackOptions, StackRouter, TabOptions,
    TabRouter,
};
pub use state::{
    HistoryEntry, NavigationState, NavigatorKind, NestedState, Params, PartialRoute, PartialState,
    Route,
};
