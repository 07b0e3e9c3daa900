//! The route tree: routes, navigation states and their lazy partial form.

use std::{collections::HashSet, fmt, result::Result as StdResult, sync::Arc};

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Route parameters.
pub type Params = Map<String, Value>;

/// Length of the random suffix appended to generated keys.
const KEY_SUFFIX_LEN: usize = 12;

/// Generate a fresh key of the form `{prefix}-{random}`.
pub fn generate_key(prefix: &str) -> String {
    let mut suffix = Uuid::new_v4().simple().to_string();
    suffix.truncate(KEY_SUFFIX_LEN);
    format!("{prefix}-{suffix}")
}

/// Return true if the screen name is usable: non-empty, no path separators
/// and no control characters.
pub fn valid_screen_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(|c| c == '/' || c.is_control())
}

/// Merge `extra` over `base`, returning the combined parameter map.
pub fn merge_params(base: Option<&Params>, extra: &Params) -> Params {
    let mut merged = base.cloned().unwrap_or_default();
    for (k, v) in extra {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// The kind of navigator that owns a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigatorKind {
    /// A push/pop history of screens.
    Stack,
    /// A fixed set of sibling screens switched by index.
    Tab,
    /// A tab navigator with an additional open/closed drawer.
    Drawer,
}

impl fmt::Display for NavigatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Stack => "stack",
            Self::Tab => "tab",
            Self::Drawer => "drawer",
        };
        write!(f, "{s}")
    }
}

/// One screen instance in a navigation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Key, unique among siblings.
    pub key: String,
    /// Registered screen name.
    pub name: String,
    /// Screen parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// State of the navigator nested in this screen, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NestedState>,
}

impl Route {
    /// Create a route with a freshly generated key.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            key: generate_key(&name),
            name,
            params: None,
            state: None,
        }
    }

    /// Set the route parameters.
    pub fn with_params(mut self, params: Option<Params>) -> Self {
        self.params = params;
        self
    }

    /// Set the nested navigator state.
    pub fn with_state(mut self, state: Option<NestedState>) -> Self {
        self.state = state;
        self
    }

    /// Look up a single parameter.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.as_ref().and_then(|p| p.get(name))
    }

    /// The nested state, if it has been materialized.
    pub fn full_state(&self) -> Option<&Arc<NavigationState>> {
        self.state.as_ref().and_then(NestedState::full)
    }

    /// A copy of this route with `params` merged over the existing ones.
    pub fn merge_params(&self, params: &Params) -> Self {
        Self {
            params: Some(merge_params(self.params.as_ref(), params)),
            ..self.clone()
        }
    }
}

/// Entries in a tab or drawer navigator's back history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HistoryEntry {
    /// A visit to the route with this key.
    Route {
        /// Route key.
        key: String,
    },
    /// The drawer is open.
    Drawer,
}

/// A fully materialized navigator state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    /// Navigator key.
    pub key: String,
    /// Index of the focused route.
    pub index: usize,
    /// Ordered routes. Routes are shared between successive states, so an
    /// untouched route is the same allocation before and after an action.
    pub routes: Vec<Arc<Route>>,
    /// Screen names registered with the owning router.
    #[serde(default)]
    pub route_names: Vec<String>,
    /// Back history for tab and drawer navigators.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    /// Always false for a materialized state.
    #[serde(default)]
    pub stale: bool,
    /// Navigator kind.
    #[serde(rename = "type")]
    pub kind: NavigatorKind,
}

impl NavigationState {
    /// Create a state with a generated navigator key.
    pub fn new(
        kind: NavigatorKind,
        route_names: Vec<String>,
        routes: Vec<Arc<Route>>,
        index: usize,
    ) -> Self {
        Self {
            key: generate_key(&kind.to_string()),
            index,
            routes,
            route_names,
            history: Vec::new(),
            stale: false,
            kind,
        }
    }

    /// The focused route.
    pub fn focused_route(&self) -> Option<&Arc<Route>> {
        self.routes.get(self.index)
    }

    /// Position of the route with this key.
    pub fn route_index(&self, key: &str) -> Option<usize> {
        self.routes.iter().position(|r| r.key == key)
    }

    /// Position of the first route with this screen name.
    pub fn name_index(&self, name: &str) -> Option<usize> {
        self.routes.iter().position(|r| r.name == name)
    }

    /// Does the owning router know this screen name?
    pub fn has_route_name(&self, name: &str) -> bool {
        self.route_names.iter().any(|n| n == name)
    }

    /// A copy of this state with different routes and focus. Everything else,
    /// including the navigator key, is kept.
    pub fn with_routes(&self, routes: Vec<Arc<Route>>, index: usize) -> Self {
        Self {
            key: self.key.clone(),
            index,
            routes,
            route_names: self.route_names.clone(),
            history: self.history.clone(),
            stale: false,
            kind: self.kind,
        }
    }

    /// A copy of this state with the route at `idx` replaced. All other
    /// routes are shared with `self`.
    pub fn replace_route(&self, idx: usize, route: Route) -> Self {
        let mut routes = self.routes.clone();
        routes[idx] = Arc::new(route);
        self.with_routes(routes, self.index)
    }

    /// Check the tree invariants for this state and every materialized
    /// descendant: index in bounds and keys unique among siblings.
    pub fn validate(&self) -> Result<()> {
        if !self.routes.is_empty() && self.index >= self.routes.len() {
            return Err(Error::InvalidState(format!(
                "index {} out of bounds for {} routes in {}",
                self.index,
                self.routes.len(),
                self.key
            )));
        }
        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(route.key.as_str()) {
                return Err(Error::InvalidState(format!(
                    "duplicate route key {} in {}",
                    route.key, self.key
                )));
            }
            if let Some(child) = route.full_state() {
                child.validate()?;
            }
        }
        Ok(())
    }
}

/// A route inside a partial state. Keys may be missing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartialRoute {
    /// Key, if already assigned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Screen name.
    pub name: String,
    /// Screen parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Nested navigator state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<NestedState>,
}

impl PartialRoute {
    /// A keyless route for a screen name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the route parameters.
    pub fn with_params(mut self, params: Option<Params>) -> Self {
        self.params = params;
        self
    }

    /// Set the nested state.
    pub fn with_state(mut self, state: Option<NestedState>) -> Self {
        self.state = state;
        self
    }
}

/// Default for the `stale` flag of partial states.
fn stale_default() -> bool {
    true
}

/// A navigator state that has not been materialized yet. Produced by path
/// linking, persisted-state restoration and lazily focused branches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialState {
    /// Navigator key, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Focused index; defaults to the last route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    /// Routes, possibly without keys.
    #[serde(default)]
    pub routes: Vec<PartialRoute>,
    /// Back history, if known.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<HistoryEntry>,
    /// Navigator kind, if known.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NavigatorKind>,
    /// Always true for a partial state.
    #[serde(default = "stale_default")]
    pub stale: bool,
}

impl Default for PartialState {
    fn default() -> Self {
        Self {
            key: None,
            index: None,
            routes: Vec::new(),
            history: Vec::new(),
            kind: None,
            stale: true,
        }
    }
}

impl PartialState {
    /// A partial state holding the given routes, focused on the last.
    pub fn new(routes: Vec<PartialRoute>) -> Self {
        Self {
            routes,
            ..Self::default()
        }
    }

    /// The focused index, resolving the default.
    pub fn focused_index(&self) -> usize {
        self.index
            .unwrap_or_else(|| self.routes.len().saturating_sub(1))
    }

    /// The focused route.
    pub fn focused_route(&self) -> Option<&PartialRoute> {
        self.routes.get(self.focused_index())
    }
}

impl From<&NavigationState> for PartialState {
    fn from(state: &NavigationState) -> Self {
        Self {
            key: Some(state.key.clone()),
            index: Some(state.index),
            routes: state.routes.iter().map(|r| PartialRoute::from(&**r)).collect(),
            history: state.history.clone(),
            kind: Some(state.kind),
            stale: true,
        }
    }
}

impl From<&Route> for PartialRoute {
    fn from(route: &Route) -> Self {
        Self {
            key: Some(route.key.clone()),
            name: route.name.clone(),
            params: route.params.clone(),
            state: route.state.clone(),
        }
    }
}

/// The state of a nested navigator: either materialized or still lazy.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NestedState {
    /// A materialized state.
    Full(Arc<NavigationState>),
    /// A lazy state that must be rehydrated before use.
    Partial(Arc<PartialState>),
}

impl NestedState {
    /// The materialized state, if any.
    pub fn full(&self) -> Option<&Arc<NavigationState>> {
        match self {
            Self::Full(s) => Some(s),
            Self::Partial(_) => None,
        }
    }

    /// Is this state still lazy?
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::Partial(_))
    }

    /// A partial view of this state, converting a materialized one.
    pub fn to_partial(&self) -> PartialState {
        match self {
            Self::Full(s) => PartialState::from(&**s),
            Self::Partial(p) => (**p).clone(),
        }
    }
}

impl From<NavigationState> for NestedState {
    fn from(state: NavigationState) -> Self {
        Self::Full(Arc::new(state))
    }
}

impl From<PartialState> for NestedState {
    fn from(state: PartialState) -> Self {
        Self::Partial(Arc::new(state))
    }
}

/// The two shapes are told apart by the `stale` flag: only a state that
/// explicitly says `"stale": false` is taken as materialized.
impl<'de> Deserialize<'de> for NestedState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> StdResult<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let stale = value.get("stale").and_then(Value::as_bool).unwrap_or(true);
        if stale {
            PartialState::deserialize(value)
                .map(|s| Self::Partial(Arc::new(s)))
                .map_err(D::Error::custom)
        } else {
            NavigationState::deserialize(value)
                .map(|s| Self::Full(Arc::new(s)))
                .map_err(D::Error::custom)
        }
    }
}
