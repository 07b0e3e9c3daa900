//! Static route configuration: which screens a navigator has, what component
//! renders each one, and which nested navigator (if any) it contains.

use std::{collections::HashSet, fmt, sync::Arc};

use crate::{
    error::{Error, Result},
    router::Router,
    state::{Params, Route, merge_params, valid_screen_name},
};

/// Opaque reference to the component that renders a screen. The rendering
/// layer resolves it; the core only hands it back.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentRef(Arc<str>);

impl ComponentRef {
    /// Wrap a component identifier.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The component identifier.
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options computed from the route being displayed.
pub type OptionsFn = Arc<dyn Fn(&Route) -> Params + Send + Sync>;

/// Screen options: a static map, or a function of the route.
#[derive(Clone, Default)]
pub enum ScreenOptions {
    /// No options.
    #[default]
    Empty,
    /// Fixed options.
    Static(Params),
    /// Options computed per route.
    Dynamic(OptionsFn),
}

impl ScreenOptions {
    /// Options computed from a function of the route.
    pub fn dynamic(f: impl Fn(&Route) -> Params + Send + Sync + 'static) -> Self {
        Self::Dynamic(Arc::new(f))
    }

    /// Resolve the options for a route.
    pub fn resolve(&self, route: &Route) -> Params {
        match self {
            Self::Empty => Params::new(),
            Self::Static(p) => p.clone(),
            Self::Dynamic(f) => f(route),
        }
    }
}

impl fmt::Debug for ScreenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Static(p) => f.debug_tuple("Static").field(p).finish(),
            Self::Dynamic(_) => write!(f, "Dynamic(..)"),
        }
    }
}

/// Configuration for one screen.
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Screen name.
    pub name: String,
    /// Component that renders the screen.
    pub component: ComponentRef,
    /// Navigator nested in this screen.
    pub navigator: Option<Arc<dyn Router>>,
    /// Path pattern used when deriving a linking config from the routers.
    pub path: Option<String>,
    /// Parameters every new route for this screen starts with.
    pub initial_params: Option<Params>,
    /// Per-screen options.
    pub options: ScreenOptions,
}

impl ScreenConfig {
    /// A leaf screen.
    pub fn new(name: impl Into<String>, component: ComponentRef) -> Self {
        Self {
            name: name.into(),
            component,
            navigator: None,
            path: None,
            initial_params: None,
            options: ScreenOptions::Empty,
        }
    }

    /// Nest a navigator inside this screen.
    pub fn with_navigator(mut self, router: Arc<dyn Router>) -> Self {
        self.navigator = Some(router);
        self
    }

    /// Set the path pattern.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the initial parameters.
    pub fn with_initial_params(mut self, params: Params) -> Self {
        self.initial_params = Some(params);
        self
    }

    /// Set the screen options.
    pub fn with_options(mut self, options: ScreenOptions) -> Self {
        self.options = options;
        self
    }

    /// Parameters for a new route: initial params with `params` merged over.
    pub fn params_for(&self, params: Option<&Params>) -> Option<Params> {
        match (&self.initial_params, params) {
            (None, None) => None,
            (Some(initial), None) => Some(initial.clone()),
            (initial, Some(p)) => Some(merge_params(initial.as_ref(), p)),
        }
    }
}

/// The ordered set of screens owned by one router. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct RouteConfigMap {
    /// Screens in declaration order.
    screens: Vec<ScreenConfig>,
}

impl RouteConfigMap {
    /// Build a map, checking that it is non-empty, that every name is valid
    /// and that no name is registered twice.
    pub fn new(screens: Vec<ScreenConfig>) -> Result<Self> {
        if screens.is_empty() {
            return Err(Error::Config("a navigator needs at least one screen".into()));
        }
        let mut seen = HashSet::new();
        for s in &screens {
            if !valid_screen_name(&s.name) {
                return Err(Error::Config(format!("invalid screen name {:?}", s.name)));
            }
            if !seen.insert(s.name.as_str()) {
                return Err(Error::Config(format!("screen {} registered twice", s.name)));
            }
        }
        Ok(Self { screens })
    }

    /// Look up a screen.
    pub fn get(&self, name: &str) -> Option<&ScreenConfig> {
        self.screens.iter().find(|s| s.name == name)
    }

    /// Is a screen with this name registered here?
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Position of a screen in declaration order.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.screens.iter().position(|s| s.name == name)
    }

    /// The first declared screen.
    pub fn first(&self) -> &ScreenConfig {
        // The constructor rejects empty maps.
        &self.screens[0]
    }

    /// Screen names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.screens.iter().map(|s| s.name.clone()).collect()
    }

    /// Iterate over the screens.
    pub fn iter(&self) -> impl Iterator<Item = &ScreenConfig> {
        self.screens.iter()
    }

    /// Number of screens.
    pub fn len(&self) -> usize {
        self.screens.len()
    }

    /// Always false; maps are never empty.
    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}
