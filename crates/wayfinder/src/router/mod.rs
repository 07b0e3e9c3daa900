//! Routers: pure functions from (state, action) to the next state.
//!
//! Each navigator kind is a free-standing type implementing [`Router`]. A
//! router owns its [`RouteConfigMap`]; nested navigators are reached through
//! the `navigator` field of a screen's config.
//!
//! Actions are resolved depth-first along the focused path. The provided
//! [`Router::state_for_action`] first offers an action to the router of the
//! focused route's nested navigator and only handles it at its own level when
//! that router returns `None`.

use std::{borrow::Cow, collections::HashSet, fmt, sync::Arc};

use serde_json::Value;
use tracing::{trace, warn};

use crate::{
    action::{Action, Navigate},
    config::{ComponentRef, RouteConfigMap, ScreenOptions},
    error::{Error, Result},
    state::{NavigationState, NavigatorKind, NestedState, Params, PartialState, Route, generate_key},
};

/// Drawer navigator.
mod drawer;
/// Stack navigator.
mod stack;
/// Tab navigator.
mod tab;

pub use drawer::DrawerRouter;
pub use stack::{NavigateBehavior, StackOptions, StackRouter};
pub use tab::{BackBehavior, TabOptions, TabRouter};

/// Overrides for computing an initial state.
#[derive(Debug, Clone, Default)]
pub struct InitialStateOptions {
    /// Screen to focus instead of the configured initial route.
    pub initial_route_name: Option<String>,
    /// Parameters for the initial route.
    pub params: Option<Params>,
}

/// The contract shared by all navigator kinds.
///
/// `None` from [`state_for_action`](Self::state_for_action) and
/// [`handle_action`](Self::handle_action) means "not handled here". A handled
/// action that changes nothing returns the same `Arc` it was given.
pub trait Router: fmt::Debug + Send + Sync {
    /// The navigator kind this router produces states for.
    fn kind(&self) -> NavigatorKind;

    /// The screens owned by this router.
    fn route_configs(&self) -> &RouteConfigMap;

    /// Navigator-level options that every screen inherits.
    fn default_options(&self) -> &ScreenOptions;

    /// Compute the initial state. Only the focused branch is materialized.
    fn initial_state(&self, options: &InitialStateOptions) -> Arc<NavigationState>;

    /// Materialize a partial state: assign missing keys, drop routes with
    /// unregistered names and materialize the focused branch.
    fn rehydrated_state(&self, partial: &PartialState) -> Arc<NavigationState>;

    /// Handle an action at this level only, without consulting nested
    /// navigators.
    fn handle_action(
        &self,
        state: &Arc<NavigationState>,
        action: &Action,
    ) -> Option<Arc<NavigationState>>;

    /// Compute the next state for an action, offering it to the focused
    /// nested navigator first.
    fn state_for_action(
        &self,
        state: &Arc<NavigationState>,
        action: &Action,
    ) -> Option<Arc<NavigationState>> {
        let targeted_here = action.target().map(|t| t == state.key);
        if targeted_here != Some(true) && action.bubbles() {
            if let Some(next) = bubble_to_focused(self, state, action) {
                return Some(next);
            }
        }
        if targeted_here == Some(false) {
            return None;
        }
        let next = self.handle_action(state, action);
        trace!(
            navigator = %state.key,
            action = action.kind(),
            handled = next.is_some(),
            "handle"
        );
        next
    }

    /// Screen names registered at this level, in declaration order.
    fn route_names(&self) -> Vec<String> {
        self.route_configs().names()
    }

    /// The router nested in a screen, if any.
    fn child_router(&self, name: &str) -> Option<&Arc<dyn Router>> {
        self.route_configs().get(name)?.navigator.as_ref()
    }

    /// Is the screen registered at this level or in any nested navigator?
    fn knows_route(&self, name: &str) -> bool {
        self.route_configs().contains(name) || self.owner_of(name).is_some()
    }

    /// The screen at this level whose nested navigator (at any depth)
    /// registers `name`.
    fn owner_of(&self, name: &str) -> Option<&str> {
        self.route_configs()
            .iter()
            .find(|s| s.navigator.as_ref().is_some_and(|r| r.knows_route(name)))
            .map(|s| s.name.as_str())
    }

    /// The component registered for a screen at this level.
    fn component_for_route_name(&self, name: &str) -> Result<&ComponentRef> {
        self.route_configs()
            .get(name)
            .map(|s| &s.component)
            .ok_or_else(|| Error::UnknownRoute(name.to_string()))
    }

    /// Look up one option for a route: the screen's options override the
    /// navigator defaults.
    fn screen_config(&self, route: &Route, key: &str) -> Option<Value> {
        let screen = self.route_configs().get(&route.name)?;
        let mut options = self.default_options().resolve(route);
        options.extend(screen.options.resolve(route));
        options.remove(key)
    }
}

/// Offer an action to the navigator nested in the focused route. On success,
/// the focused route is replaced and every sibling is shared with `state`.
fn bubble_to_focused<R: Router + ?Sized>(
    router: &R,
    state: &Arc<NavigationState>,
    action: &Action,
) -> Option<Arc<NavigationState>> {
    let route = state.focused_route()?;
    let child = router.child_router(&route.name)?;
    let current = match &route.state {
        Some(NestedState::Full(s)) => Arc::clone(s),
        Some(NestedState::Partial(p)) => child.rehydrated_state(p),
        None => child.initial_state(&InitialStateOptions::default()),
    };
    trace!(from = %state.key, to = %current.key, action = action.kind(), "bubble");
    let next = child.state_for_action(&current, action)?;
    if matches!(&route.state, Some(NestedState::Full(s)) if Arc::ptr_eq(s, &next)) {
        return Some(Arc::clone(state));
    }
    let replaced = Route {
        state: Some(NestedState::Full(next)),
        ..(**route).clone()
    };
    Some(Arc::new(state.replace_route(state.index, replaced)))
}

/// Materialize the nested state of a route that is gaining focus and apply
/// a nested action to it. Returns the same `Arc` when nothing changes.
pub(crate) fn prepare_focus<R: Router + ?Sized>(
    router: &R,
    route: &Arc<Route>,
    nested: Option<&Action>,
) -> Arc<Route> {
    let Some(child) = router.child_router(&route.name) else {
        return Arc::clone(route);
    };
    let existing = route.full_state();
    let materialized = match &route.state {
        Some(NestedState::Full(s)) => Arc::clone(s),
        Some(NestedState::Partial(p)) => child.rehydrated_state(p),
        None => child.initial_state(&InitialStateOptions::default()),
    };
    let next = match nested {
        Some(action) => child
            .state_for_action(&materialized, action)
            .unwrap_or(materialized),
        None => materialized,
    };
    if existing.is_some_and(|s| Arc::ptr_eq(s, &next)) {
        return Arc::clone(route);
    }
    Arc::new(Route {
        state: Some(NestedState::Full(next)),
        ..(**route).clone()
    })
}

/// Marker state for a navigator route that has not been focused yet.
pub(crate) fn lazy_state<R: Router + ?Sized>(router: &R, name: &str) -> Option<NestedState> {
    router
        .child_router(name)
        .map(|_| NestedState::Partial(Arc::new(PartialState::default())))
}

/// Resolve the screen a `NAVIGATE` refers to at this level. A screen that
/// lives in a nested navigator is reached by navigating to the screen that
/// owns that navigator, carrying the original action as the nested action.
pub(crate) fn resolve_navigate<'a, R: Router + ?Sized>(
    router: &R,
    nav: &'a Navigate,
) -> Option<Cow<'a, Navigate>> {
    if router.route_configs().contains(&nav.name) {
        return Some(Cow::Borrowed(nav));
    }
    let owner = router.owner_of(&nav.name)?;
    let inner = Navigate {
        target: None,
        ..nav.clone()
    };
    Some(Cow::Owned(
        Navigate::new(owner).with_action(Action::Navigate(inner)),
    ))
}

/// Create a route for a screen registered with `router`, with the screen's
/// initial params applied.
pub(crate) fn new_route<R: Router + ?Sized>(
    router: &R,
    name: &str,
    params: Option<&Params>,
    key: Option<&str>,
) -> Route {
    let params = router
        .route_configs()
        .get(name)
        .and_then(|s| s.params_for(params));
    let mut route = Route::new(name).with_params(params);
    if let Some(key) = key {
        route.key = key.to_string();
    }
    route
}

/// Rehydrate the routes of a partial state: drop unregistered screens,
/// assign missing or duplicate keys and apply initial params. Returns the
/// surviving routes and the position the partial state's focus maps to.
pub(crate) fn rehydrate_routes<R: Router + ?Sized>(
    router: &R,
    partial: &PartialState,
) -> (Vec<Route>, Option<usize>) {
    let focused = partial.focused_index();
    let mut routes = Vec::with_capacity(partial.routes.len());
    let mut focus = None;
    let mut keys = HashSet::new();
    for (i, r) in partial.routes.iter().enumerate() {
        let Some(screen) = router.route_configs().get(&r.name) else {
            warn!(screen = %r.name, "dropping unregistered screen while rehydrating");
            continue;
        };
        let key = match &r.key {
            Some(k) if !keys.contains(k) => k.clone(),
            _ => generate_key(&r.name),
        };
        keys.insert(key.clone());
        let state = rehydrate_nested(router, &r.name, r.state.as_ref());
        routes.push(Route {
            key,
            name: r.name.clone(),
            params: screen.params_for(r.params.as_ref()),
            state,
        });
        if i <= focused {
            focus = Some(routes.len() - 1);
        }
    }
    (routes, focus)
}

/// Re-associate a restored nested state with the navigator registered for
/// `name`. Materialized states are rebuilt through the child router, which
/// drops screens it no longer registers. Lazy states stay lazy and are
/// rehydrated on first focus.
fn rehydrate_nested<R: Router + ?Sized>(
    router: &R,
    name: &str,
    state: Option<&NestedState>,
) -> Option<NestedState> {
    let child = router.child_router(name)?;
    match state {
        Some(NestedState::Full(s)) => Some(NestedState::Full(
            child.rehydrated_state(&PartialState::from(&**s)),
        )),
        Some(lazy @ NestedState::Partial(_)) => Some(lazy.clone()),
        None => lazy_state(router, name),
    }
}

/// Accept a `RESET` payload for this router. Returns `None` if any top-level
/// route names a screen this router does not register. The navigator key of
/// `current` is kept so targeted actions stay valid.
pub(crate) fn reset_state<R: Router + ?Sized>(
    router: &R,
    current: &NavigationState,
    next: &NestedState,
) -> Option<Arc<NavigationState>> {
    let partial = next.to_partial();
    if let Some(unknown) = partial
        .routes
        .iter()
        .find(|r| !router.route_configs().contains(&r.name))
    {
        warn!(screen = %unknown.name, navigator = %current.key, "reset names an unregistered screen");
        return None;
    }
    let rehydrated = router.rehydrated_state(&partial);
    let mut state = (*rehydrated).clone();
    state.key = current.key.clone();
    Some(Arc::new(state))
}

/// Merge params into the route with `key`, wherever it lives below `state`.
/// Unfocused branches are searched too, since the key names the route
/// exactly. `None` if no materialized level holds the key.
pub(crate) fn set_params(
    state: &NavigationState,
    key: &str,
    params: &Params,
) -> Option<Arc<NavigationState>> {
    if let Some(idx) = state.route_index(key) {
        let route = state.routes[idx].merge_params(params);
        return Some(Arc::new(state.replace_route(idx, route)));
    }
    state.routes.iter().enumerate().find_map(|(idx, route)| {
        let Some(NestedState::Full(nested)) = &route.state else {
            return None;
        };
        let next = set_params(nested, key, params)?;
        let replaced = Route {
            state: Some(NestedState::Full(next)),
            ..(**route).clone()
        };
        Some(Arc::new(state.replace_route(idx, replaced)))
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        config::{ScreenConfig, ScreenOptions},
        state::PartialRoute,
    };

    fn screen(name: &str) -> ScreenConfig {
        ScreenConfig::new(name, ComponentRef::new(name))
    }

    fn nested() -> Result<StackRouter> {
        let inner = StackRouter::new(
            RouteConfigMap::new(vec![screen("Feed"), screen("Profile")])?,
            StackOptions::default(),
        )?;
        StackRouter::new(
            RouteConfigMap::new(vec![
                screen("Home").with_navigator(Arc::new(inner)),
                screen("Settings"),
            ])?,
            StackOptions::default(),
        )
    }

    #[test]
    fn deep_lookup() -> Result<()> {
        let r = nested()?;
        assert!(r.knows_route("Profile"));
        assert!(!r.knows_route("Nope"));
        assert_eq!(r.owner_of("Profile"), Some("Home"));
        assert_eq!(r.owner_of("Settings"), None);
        assert!(r.component_for_route_name("Settings").is_ok());
        assert_eq!(
            r.component_for_route_name("Profile"),
            Err(Error::UnknownRoute("Profile".into()))
        );
        Ok(())
    }

    #[test]
    fn screen_config_prefers_screen_options() -> Result<()> {
        let mut defaults = Params::new();
        defaults.insert("title".into(), json!("App"));
        defaults.insert("header".into(), json!(true));
        let mut own = Params::new();
        own.insert("title".into(), json!("Settings"));
        let r = StackRouter::new(
            RouteConfigMap::new(vec![
                screen("Home"),
                screen("Settings").with_options(ScreenOptions::Static(own)),
            ])?,
            StackOptions {
                navigation_options: ScreenOptions::Static(defaults),
                ..StackOptions::default()
            },
        )?;
        let route = Route::new("Settings");
        assert_eq!(r.screen_config(&route, "title"), Some(json!("Settings")));
        assert_eq!(r.screen_config(&route, "header"), Some(json!(true)));
        assert_eq!(r.screen_config(&Route::new("Home"), "title"), Some(json!("App")));
        assert_eq!(r.screen_config(&Route::new("Nope"), "title"), None);
        Ok(())
    }

    #[test]
    fn rehydrate_drops_unknown_and_dedupes_keys() -> Result<()> {
        let r = nested()?;
        let mut a = PartialRoute::new("Settings");
        a.key = Some("k".into());
        let mut b = PartialRoute::new("Settings");
        b.key = Some("k".into());
        let partial = PartialState::new(vec![a, PartialRoute::new("Ghost"), b]);
        let (routes, focus) = rehydrate_routes(&r, &partial);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].key, "k");
        assert_ne!(routes[1].key, "k");
        assert_eq!(focus, Some(1));
        Ok(())
    }

    #[test]
    fn resolve_navigate_wraps_nested_screens() -> Result<()> {
        let r = nested()?;
        let nav = Navigate::new("Profile");
        let resolved = resolve_navigate(&r, &nav).map(Cow::into_owned);
        let expected = Navigate::new("Home").with_action(Action::navigate("Profile"));
        assert_eq!(resolved, Some(expected));
        assert!(resolve_navigate(&r, &Navigate::new("Ghost")).is_none());
        Ok(())
    }
}
