//! Deep linking: mapping URL paths to navigation states and back.
//!
//! A [`LinkingConfig`] is a tree mirroring the navigator tree. Each screen
//! may carry a path pattern (`user/:id`, `feed/:tab?`, `*`), hooks that
//! parse and stringify individual params, the initial route of the navigator
//! nested in it, and configs for the screens of that navigator. Patterns of
//! nested screens are appended to the pattern of their parent unless they
//! are marked `exact`.
//!
//! Configs are plain data and deserialize from JSON or TOML; a screen can be
//! written as a bare pattern string:
//!
//! ```json
//! { "screens": { "Profile": "people/:name", "NotFound": "*" } }
//! ```
//!
//! Parse and stringify hooks are functions and are attached in code.
//! [`Linker`] compiles a config once and then resolves paths against it.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::Deserialize;
use serde_json::Value;

use crate::{
    action::Action,
    error::Result,
    router::Router,
    state::{NavigationState, PartialState},
};

/// Path linker.
mod linker;
/// Query strings.
pub mod query;

pub use linker::Linker;

/// Turns a raw path segment or query value into a param value.
pub type ParseFn = Arc<dyn Fn(&str) -> Value + Send + Sync>;
/// Turns a param value into a raw path segment or query value.
pub type StringifyFn = Arc<dyn Fn(&Value) -> String + Send + Sync>;

/// Root of a linking configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingConfig {
    /// URL prefixes stripped before matching, e.g. `myapp://` or
    /// `https://example.com`.
    #[serde(default)]
    pub prefixes: Vec<String>,
    /// Initial route of the root navigator.
    #[serde(default)]
    pub initial_route_name: Option<String>,
    /// Screens of the root navigator. When empty, every path segment is
    /// taken as a screen name.
    #[serde(default)]
    pub screens: BTreeMap<String, ScreenLinking>,
}

impl LinkingConfig {
    /// An empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from JSON.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Add a URL prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    /// Set the initial route of the root navigator.
    pub fn with_initial_route_name(mut self, name: impl Into<String>) -> Self {
        self.initial_route_name = Some(name.into());
        self
    }

    /// Add a screen.
    pub fn with_screen(mut self, name: impl Into<String>, screen: impl Into<ScreenLinking>) -> Self {
        self.screens.insert(name.into(), screen.into());
        self
    }

    /// Derive a config from the `path` fields of a router tree's screen
    /// configs. Screens with neither a path nor linked descendants are left
    /// out.
    pub fn from_router(router: &dyn Router) -> Self {
        Self {
            screens: screens_of(router),
            ..Self::default()
        }
    }
}

/// Linking screens for the route configs of one router.
fn screens_of(router: &dyn Router) -> BTreeMap<String, ScreenLinking> {
    router
        .route_configs()
        .iter()
        .filter_map(|s| {
            let screens = s.navigator.as_deref().map(screens_of).unwrap_or_default();
            if s.path.is_none() && screens.is_empty() {
                return None;
            }
            Some((
                s.name.clone(),
                ScreenLinking {
                    path: s.path.clone(),
                    screens,
                    ..ScreenLinking::default()
                },
            ))
        })
        .collect()
}

/// Linking configuration for one screen.
#[derive(Clone, Default, Deserialize)]
#[serde(from = "RawScreenLinking")]
pub struct ScreenLinking {
    /// Path pattern. A screen without one inherits its parent's pattern and
    /// only its nested screens are reachable.
    pub path: Option<String>,
    /// Do not prepend the parent's pattern.
    pub exact: bool,
    /// Initial route of the navigator nested in this screen.
    pub initial_route_name: Option<String>,
    /// Screens of the nested navigator.
    pub screens: BTreeMap<String, ScreenLinking>,
    /// Per-param parse hooks.
    pub parse: BTreeMap<String, ParseFn>,
    /// Per-param stringify hooks.
    pub stringify: BTreeMap<String, StringifyFn>,
}

impl ScreenLinking {
    /// A screen matched by `pattern`.
    pub fn path(pattern: impl Into<String>) -> Self {
        Self {
            path: Some(pattern.into()),
            ..Self::default()
        }
    }

    /// A screen with no pattern of its own; only its nested screens link.
    pub fn nested() -> Self {
        Self::default()
    }

    /// Don't inherit the parent's pattern.
    pub fn exact(mut self) -> Self {
        self.exact = true;
        self
    }

    /// Set the initial route of the nested navigator.
    pub fn with_initial_route_name(mut self, name: impl Into<String>) -> Self {
        self.initial_route_name = Some(name.into());
        self
    }

    /// Add a nested screen.
    pub fn with_screen(mut self, name: impl Into<String>, screen: impl Into<Self>) -> Self {
        self.screens.insert(name.into(), screen.into());
        self
    }

    /// Attach a parse hook for a param.
    pub fn with_parse(
        mut self,
        param: impl Into<String>,
        f: impl Fn(&str) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.parse.insert(param.into(), Arc::new(f));
        self
    }

    /// Attach a stringify hook for a param.
    pub fn with_stringify(
        mut self,
        param: impl Into<String>,
        f: impl Fn(&Value) -> String + Send + Sync + 'static,
    ) -> Self {
        self.stringify.insert(param.into(), Arc::new(f));
        self
    }
}

impl From<&str> for ScreenLinking {
    fn from(pattern: &str) -> Self {
        Self::path(pattern)
    }
}

impl fmt::Debug for ScreenLinking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenLinking")
            .field("path", &self.path)
            .field("exact", &self.exact)
            .field("initial_route_name", &self.initial_route_name)
            .field("screens", &self.screens)
            .field("parse", &self.parse.keys().collect::<Vec<_>>())
            .field("stringify", &self.stringify.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Serialized form of a screen: a bare pattern or a table.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScreenLinking {
    /// `"Profile": "user/:id"`
    Path(String),
    /// `"Profile": { "path": "user/:id", ... }`
    Config(RawScreenFields),
}

/// Data fields of a screen table.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawScreenFields {
    /// Path pattern.
    #[serde(default)]
    path: Option<String>,
    /// Exact flag.
    #[serde(default)]
    exact: bool,
    /// Initial route of the nested navigator.
    #[serde(default)]
    initial_route_name: Option<String>,
    /// Nested screens.
    #[serde(default)]
    screens: BTreeMap<String, ScreenLinking>,
}

impl From<RawScreenLinking> for ScreenLinking {
    fn from(raw: RawScreenLinking) -> Self {
        match raw {
            RawScreenLinking::Path(p) => Self::path(p),
            RawScreenLinking::Config(c) => Self {
                path: c.path,
                exact: c.exact,
                initial_route_name: c.initial_route_name,
                screens: c.screens,
                ..Self::default()
            },
        }
    }
}

/// Resolve a path against a config. `Ok(None)` means no pattern matched.
pub fn get_state_from_path(path: &str, config: &LinkingConfig) -> Result<Option<PartialState>> {
    Ok(Linker::new(config.clone())?.state_from_path(path))
}

/// Serialize the focused branch of a state as a path.
pub fn get_path_from_state(state: &NavigationState, config: &LinkingConfig) -> Result<String> {
    Ok(Linker::new(config.clone())?.path_from_state(state))
}

/// Convert a resolved state into the action that reproduces it.
pub fn get_action_from_state(
    state: &PartialState,
    config: &LinkingConfig,
) -> Result<Option<Action>> {
    Ok(Linker::new(config.clone())?.action_from_state(state))
}
