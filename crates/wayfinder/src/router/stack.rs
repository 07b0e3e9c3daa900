use std::sync::Arc;

use tracing::warn;

use super::{
    InitialStateOptions, Router, new_route, prepare_focus, rehydrate_routes, reset_state,
    resolve_navigate, set_params,
};
use crate::{
    action::{Action, Navigate},
    config::{RouteConfigMap, ScreenOptions},
    error::{Error, Result},
    state::{NavigationState, NavigatorKind, Params, PartialState, Route},
};

/// What `NAVIGATE` does when the target screen is already somewhere in the
/// stack (but not on top with identical params).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NavigateBehavior {
    /// Push a new instance. Stacks are not deduplicated across history.
    #[default]
    Push,
    /// Pop back to the most recent route with that name.
    PopToExisting,
}

/// Stack navigator configuration.
#[derive(Debug, Clone, Default)]
pub struct StackOptions {
    /// Screen at the bottom of a fresh stack; defaults to the first screen.
    pub initial_route_name: Option<String>,
    /// Parameters for the initial route.
    pub initial_route_params: Option<Params>,
    /// Behavior when navigating to a screen already in the stack.
    pub navigate_behavior: NavigateBehavior,
    /// Options every screen inherits.
    pub navigation_options: ScreenOptions,
}

/// A push/pop navigator.
#[derive(Debug)]
pub struct StackRouter {
    /// Registered screens.
    configs: RouteConfigMap,
    /// Navigator configuration.
    options: StackOptions,
}

impl StackRouter {
    /// Build a stack router. Fails if the initial route is not registered.
    pub fn new(configs: RouteConfigMap, options: StackOptions) -> Result<Self> {
        if let Some(name) = &options.initial_route_name
            && !configs.contains(name)
        {
            return Err(Error::Config(format!(
                "initial route {name} is not a screen of this stack"
            )));
        }
        Ok(Self { configs, options })
    }

    /// The screen a fresh stack starts with.
    fn initial_route_name(&self) -> &str {
        self.options
            .initial_route_name
            .as_deref()
            .unwrap_or_else(|| self.configs.first().name.as_str())
    }

    /// Keep routes up to and including `idx`, then refocus that route with
    /// optional params and a nested action.
    fn pop_to(
        &self,
        state: &Arc<NavigationState>,
        idx: usize,
        params: Option<&Params>,
        nested: Option<&Action>,
    ) -> Arc<NavigationState> {
        let mut target = Arc::clone(&state.routes[idx]);
        if let Some(p) = params {
            target = Arc::new(target.merge_params(p));
        }
        let target = prepare_focus(self, &target, nested);
        if idx + 1 == state.routes.len() && Arc::ptr_eq(&target, &state.routes[idx]) {
            return Arc::clone(state);
        }
        let mut routes = state.routes[..idx].to_vec();
        routes.push(target);
        on_top(state, routes)
    }

    /// Push a new route for a registered screen.
    fn push(
        &self,
        state: &NavigationState,
        name: &str,
        params: Option<&Params>,
        key: Option<&str>,
        nested: Option<&Action>,
    ) -> Arc<NavigationState> {
        let route = Arc::new(new_route(self, name, params, key));
        let route = prepare_focus(self, &route, nested);
        let mut routes = state.routes.clone();
        routes.push(route);
        on_top(state, routes)
    }

    /// `NAVIGATE` at this level.
    fn navigate(&self, state: &Arc<NavigationState>, nav: &Navigate) -> Option<Arc<NavigationState>> {
        let nav = resolve_navigate(self, nav)?;
        let nested = nav.action.as_deref();
        if let Some(key) = &nav.key {
            return Some(match state.route_index(key) {
                Some(idx) => self.pop_to(state, idx, nav.params.as_ref(), nested),
                None => self.push(state, &nav.name, nav.params.as_ref(), Some(key), nested),
            });
        }

        let top = state.routes.len().checked_sub(1);
        let params = self
            .configs
            .get(&nav.name)
            .and_then(|s| s.params_for(nav.params.as_ref()));
        if let Some(idx) = top
            && state.routes[idx].name == nav.name
            && same_params(state.routes[idx].params.as_ref(), params.as_ref())
        {
            return Some(self.pop_to(state, idx, None, nested));
        }

        if self.options.navigate_behavior == NavigateBehavior::PopToExisting
            && let Some(idx) = state.routes.iter().rposition(|r| r.name == nav.name)
        {
            return Some(self.pop_to(state, idx, nav.params.as_ref(), nested));
        }
        Some(self.push(state, &nav.name, nav.params.as_ref(), None, nested))
    }

    /// `GO_BACK` at this level.
    fn go_back(
        &self,
        state: &Arc<NavigationState>,
        key: Option<&str>,
    ) -> Option<Arc<NavigationState>> {
        let idx = match key {
            Some(key) => state.route_index(key)?,
            None => state.routes.len().checked_sub(1)?,
        };
        if idx == 0 {
            return None;
        }
        Some(on_top(state, state.routes[..idx].to_vec()))
    }

    /// `REPLACE` at this level.
    fn replace(
        &self,
        state: &Arc<NavigationState>,
        name: &str,
        params: Option<&Params>,
        key: Option<&str>,
    ) -> Option<Arc<NavigationState>> {
        if !self.configs.contains(name) {
            return None;
        }
        let idx = match key {
            Some(key) => state.route_index(key)?,
            None => state.index,
        };
        let route = Arc::new(new_route(self, name, params, None));
        let route = prepare_focus(self, &route, None);
        let mut routes = state.routes.clone();
        routes[idx] = route;
        Some(Arc::new(state.with_routes(routes, state.index)))
    }
}

/// Params equality for duplicate suppression. An empty map counts as none.
fn same_params(a: Option<&Params>, b: Option<&Params>) -> bool {
    a.filter(|p| !p.is_empty()) == b.filter(|p| !p.is_empty())
}

/// Wrap a route list as the next state of a stack, focused on the top.
fn on_top(state: &NavigationState, routes: Vec<Arc<Route>>) -> Arc<NavigationState> {
    let index = routes.len().saturating_sub(1);
    Arc::new(state.with_routes(routes, index))
}

impl Router for StackRouter {
    fn kind(&self) -> NavigatorKind {
        NavigatorKind::Stack
    }

    fn route_configs(&self) -> &RouteConfigMap {
        &self.configs
    }

    fn default_options(&self) -> &ScreenOptions {
        &self.options.navigation_options
    }

    fn initial_state(&self, options: &InitialStateOptions) -> Arc<NavigationState> {
        let name = match options.initial_route_name.as_deref() {
            Some(name) if self.configs.contains(name) => name,
            Some(name) => {
                warn!(screen = name, "initial route is not a screen of this stack");
                self.initial_route_name()
            }
            None => self.initial_route_name(),
        };
        let params = options
            .params
            .as_ref()
            .or(self.options.initial_route_params.as_ref());
        let route = Arc::new(new_route(self, name, params, None));
        let route = prepare_focus(self, &route, None);
        Arc::new(NavigationState::new(
            NavigatorKind::Stack,
            self.route_names(),
            vec![route],
            0,
        ))
    }

    fn rehydrated_state(&self, partial: &PartialState) -> Arc<NavigationState> {
        let (routes, _) = rehydrate_routes(self, partial);
        if routes.is_empty() {
            let initial = self.initial_state(&InitialStateOptions::default());
            return match &partial.key {
                Some(key) => {
                    let mut state = (*initial).clone();
                    state.key = key.clone();
                    Arc::new(state)
                }
                None => initial,
            };
        }
        let mut routes: Vec<Arc<Route>> = routes.into_iter().map(Arc::new).collect();
        let top = routes.len() - 1;
        let focused = prepare_focus(self, &routes[top], None);
        routes[top] = focused;
        let mut state = NavigationState::new(NavigatorKind::Stack, self.route_names(), routes, top);
        if let Some(key) = &partial.key {
            state.key = key.clone();
        }
        Arc::new(state)
    }

    fn handle_action(
        &self,
        state: &Arc<NavigationState>,
        action: &Action,
    ) -> Option<Arc<NavigationState>> {
        match action {
            Action::Navigate(nav) => self.navigate(state, nav),
            Action::Push { name, params } => {
                if !self.configs.contains(name) {
                    return None;
                }
                Some(self.push(state, name, params.as_ref(), None, None))
            }
            Action::GoBack { key } => self.go_back(state, key.as_deref()),
            Action::Pop { count } => {
                let len = state.routes.len();
                if len <= 1 {
                    return None;
                }
                let keep = len - (*count).clamp(1, len - 1);
                Some(on_top(state, state.routes[..keep].to_vec()))
            }
            Action::PopToTop => {
                if state.routes.len() <= 1 {
                    return None;
                }
                Some(on_top(state, state.routes[..1].to_vec()))
            }
            Action::Replace { name, params, key } => {
                self.replace(state, name, params.as_ref(), key.as_deref())
            }
            Action::Reset { state: next, .. } => reset_state(self, state, next),
            Action::SetParams { key, params } => set_params(state, key, params),
            Action::JumpTo { .. }
            | Action::OpenDrawer
            | Action::CloseDrawer
            | Action::ToggleDrawer => None,
        }
    }
}
