use std::sync::Arc;

use tracing::warn;

use super::{
    InitialStateOptions, Router, lazy_state, new_route, prepare_focus, rehydrate_routes,
    reset_state, resolve_navigate, set_params,
};
use crate::{
    action::Action,
    config::{RouteConfigMap, ScreenOptions},
    error::{Error, Result},
    state::{HistoryEntry, NavigationState, NavigatorKind, Params, PartialState, Route},
};

/// Where `GO_BACK` leads in a tab navigator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackBehavior {
    /// Tabs don't handle `GO_BACK`; it bubbles to the parent.
    #[default]
    None,
    /// Back from any tab returns to the initial tab.
    InitialRoute,
    /// Back moves to the previous tab in declaration order.
    Order,
    /// Back retraces the tabs in the order they were visited.
    History,
}

/// Tab navigator configuration.
#[derive(Debug, Clone, Default)]
pub struct TabOptions {
    /// Tab focused in a fresh state; defaults to the first screen.
    pub initial_route_name: Option<String>,
    /// `GO_BACK` handling.
    pub back_behavior: BackBehavior,
    /// Options every screen inherits.
    pub navigation_options: ScreenOptions,
}

/// A navigator with one route per screen, switched by index.
#[derive(Debug)]
pub struct TabRouter {
    /// Registered screens.
    configs: RouteConfigMap,
    /// Navigator configuration.
    options: TabOptions,
    /// Kind stamped on produced states. Drawers reuse this router.
    kind: NavigatorKind,
}

impl TabRouter {
    /// Build a tab router. Fails if the initial route is not registered.
    pub fn new(configs: RouteConfigMap, options: TabOptions) -> Result<Self> {
        Self::with_kind(configs, options, NavigatorKind::Tab)
    }

    /// Build a tab router producing states of another kind.
    pub(crate) fn with_kind(
        configs: RouteConfigMap,
        options: TabOptions,
        kind: NavigatorKind,
    ) -> Result<Self> {
        if let Some(name) = &options.initial_route_name
            && !configs.contains(name)
        {
            return Err(Error::Config(format!(
                "initial route {name} is not a screen of this {kind} navigator"
            )));
        }
        Ok(Self {
            configs,
            options,
            kind,
        })
    }

    /// Position of the tab a fresh state focuses.
    fn initial_index(&self) -> usize {
        self.options
            .initial_route_name
            .as_deref()
            .and_then(|n| self.configs.position(n))
            .unwrap_or(0)
    }

    /// The history a state focused on `index` starts with.
    fn initial_history(&self, routes: &[Arc<Route>], index: usize) -> Vec<HistoryEntry> {
        let entry = |i: usize| HistoryEntry::Route {
            key: routes[i].key.clone(),
        };
        let initial = self.initial_index();
        match self.options.back_behavior {
            BackBehavior::Order => (0..=index).map(entry).collect(),
            BackBehavior::InitialRoute if initial != index => vec![entry(initial), entry(index)],
            _ => vec![entry(index)],
        }
    }

    /// History after focusing `index`. Any drawer entry is dropped, so
    /// switching tabs closes an open drawer.
    fn history_for(&self, state: &NavigationState, index: usize) -> Vec<HistoryEntry> {
        if self.options.back_behavior != BackBehavior::History {
            return self.initial_history(&state.routes, index);
        }
        let key = &state.routes[index].key;
        let mut history: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|e| matches!(e, HistoryEntry::Route { key: k } if k != key))
            .cloned()
            .collect();
        history.push(HistoryEntry::Route { key: key.clone() });
        history
    }

    /// Focus the route at `idx`, merging params and applying a nested
    /// action. Siblings are shared with `state`.
    fn focus(
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
        if idx == state.index
            && Arc::ptr_eq(&target, &state.routes[idx])
            && !state.history.contains(&HistoryEntry::Drawer)
        {
            return Arc::clone(state);
        }
        let mut routes = state.routes.clone();
        routes[idx] = target;
        let mut next = state.with_routes(routes, idx);
        next.history = self.history_for(&next, idx);
        Arc::new(next)
    }

    /// Find a tab by screen name or route key.
    fn find(state: &NavigationState, name_or_key: &str) -> Option<usize> {
        state
            .name_index(name_or_key)
            .or_else(|| state.route_index(name_or_key))
    }

    /// `GO_BACK` at this level: retrace the route entries of the history.
    fn go_back(&self, state: &Arc<NavigationState>, key: Option<&str>) -> Option<Arc<NavigationState>> {
        if self.options.back_behavior == BackBehavior::None {
            return None;
        }
        if key.is_some_and(|k| state.focused_route().is_none_or(|r| r.key != k)) {
            return None;
        }
        let mut history: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|e| matches!(e, HistoryEntry::Route { .. }))
            .cloned()
            .collect();
        if history.len() < 2 {
            return None;
        }
        history.pop();
        let index = match history.last() {
            Some(HistoryEntry::Route { key }) => state.route_index(key)?,
            _ => return None,
        };
        let mut next = state.with_routes(state.routes.clone(), index);
        next.history = history;
        Some(Arc::new(next))
    }
}

impl Router for TabRouter {
    fn kind(&self) -> NavigatorKind {
        self.kind
    }

    fn route_configs(&self) -> &RouteConfigMap {
        &self.configs
    }

    fn default_options(&self) -> &ScreenOptions {
        &self.options.navigation_options
    }

    fn initial_state(&self, options: &InitialStateOptions) -> Arc<NavigationState> {
        let index = match options.initial_route_name.as_deref() {
            Some(name) => self.configs.position(name).unwrap_or_else(|| {
                warn!(screen = name, "initial route is not a tab of this navigator");
                self.initial_index()
            }),
            None => self.initial_index(),
        };
        let routes: Vec<Arc<Route>> = self
            .configs
            .iter()
            .enumerate()
            .map(|(i, screen)| {
                let params = if i == index { options.params.as_ref() } else { None };
                let route = new_route(self, &screen.name, params, None);
                if i == index {
                    prepare_focus(self, &Arc::new(route), None)
                } else {
                    Arc::new(route.with_state(lazy_state(self, &screen.name)))
                }
            })
            .collect();
        let history = self.initial_history(&routes, index);
        let mut state = NavigationState::new(self.kind, self.route_names(), routes, index);
        state.history = history;
        Arc::new(state)
    }

    fn rehydrated_state(&self, partial: &PartialState) -> Arc<NavigationState> {
        let (mut restored, focus) = rehydrate_routes(self, partial);
        let focused_name = focus.map(|i| restored[i].name.clone());
        let mut routes = Vec::with_capacity(self.configs.len());
        for screen in self.configs.iter() {
            let route = match restored.iter().position(|r| r.name == screen.name) {
                Some(pos) => restored.swap_remove(pos),
                None => new_route(self, &screen.name, None, None)
                    .with_state(lazy_state(self, &screen.name)),
            };
            routes.push(Arc::new(route));
        }
        let index = focused_name
            .and_then(|n| self.configs.position(&n))
            .unwrap_or_else(|| self.initial_index());
        let focused = prepare_focus(self, &routes[index], None);
        routes[index] = focused;

        let history: Vec<HistoryEntry> = partial
            .history
            .iter()
            .filter(|e| match e {
                HistoryEntry::Route { key } => routes.iter().any(|r| &r.key == key),
                HistoryEntry::Drawer => self.kind == NavigatorKind::Drawer,
            })
            .cloned()
            .collect();
        let history = if history.is_empty() {
            self.initial_history(&routes, index)
        } else {
            history
        };
        let mut state = NavigationState::new(self.kind, self.route_names(), routes, index);
        state.history = history;
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
            Action::Navigate(nav) => {
                let nav = resolve_navigate(self, nav)?;
                let idx = match &nav.key {
                    Some(key) => state.route_index(key)?,
                    None => state.name_index(&nav.name)?,
                };
                Some(self.focus(state, idx, nav.params.as_ref(), nav.action.as_deref()))
            }
            Action::JumpTo { name, params } => {
                let idx = Self::find(state, name)?;
                Some(self.focus(state, idx, params.as_ref(), None))
            }
            Action::GoBack { key } => self.go_back(state, key.as_deref()),
            Action::Reset { state: next, .. } => reset_state(self, state, next),
            Action::SetParams { key, params } => set_params(state, key, params),
            Action::Push { .. }
            | Action::Pop { .. }
            | Action::PopToTop
            | Action::Replace { .. }
            | Action::OpenDrawer
            | Action::CloseDrawer
            | Action::ToggleDrawer => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        config::{ComponentRef, ScreenConfig},
        router::{StackOptions, StackRouter},
        state::{NestedState, PartialRoute},
    };

    fn screen(name: &str) -> ScreenConfig {
        ScreenConfig::new(name, ComponentRef::new(name))
    }

    fn tabs(back_behavior: BackBehavior) -> Result<TabRouter> {
        TabRouter::new(
            RouteConfigMap::new(vec![screen("Feed"), screen("Search"), screen("Me")])?,
            TabOptions {
                back_behavior,
                ..TabOptions::default()
            },
        )
    }

    fn history_keys(state: &NavigationState) -> Vec<&str> {
        state
            .history
            .iter()
            .filter_map(|e| match e {
                HistoryEntry::Route { key } => Some(key.as_str()),
                HistoryEntry::Drawer => None,
            })
            .collect()
    }

    #[test]
    fn initial_state_has_every_tab() -> Result<()> {
        let r = tabs(BackBehavior::None)?;
        let s = r.initial_state(&InitialStateOptions::default());
        assert_eq!(s.routes.len(), 3);
        assert_eq!(s.index, 0);
        assert_eq!(s.kind, NavigatorKind::Tab);
        let s = r.initial_state(&InitialStateOptions {
            initial_route_name: Some("Me".into()),
            params: None,
        });
        assert_eq!(s.index, 2);
        Ok(())
    }

    #[test]
    fn jump_to_shares_untouched_tabs() -> Result<()> {
        let r = tabs(BackBehavior::None)?;
        let s0 = r.initial_state(&InitialStateOptions::default());
        let s1 = r
            .state_for_action(&s0, &Action::jump_to("Search"))
            .expect("handled");
        assert_eq!(s1.index, 1);
        for i in 0..3 {
            assert!(Arc::ptr_eq(&s0.routes[i], &s1.routes[i]));
        }
        let same = r
            .state_for_action(&s1, &Action::jump_to("Search"))
            .expect("handled");
        assert!(Arc::ptr_eq(&s1, &same));

        let by_key = r
            .state_for_action(&s1, &Action::jump_to(s1.routes[2].key.clone()))
            .expect("handled");
        assert_eq!(by_key.index, 2);
        assert!(r.state_for_action(&s1, &Action::jump_to("Ghost")).is_none());
        Ok(())
    }

    #[test]
    fn navigate_merges_params() -> Result<()> {
        let r = tabs(BackBehavior::None)?;
        let s0 = r.initial_state(&InitialStateOptions::default());
        let mut p = Params::new();
        p.insert("q".into(), json!("rust"));
        let s1 = r
            .state_for_action(&s0, &Action::navigate_with("Search", p))
            .expect("handled");
        assert_eq!(s1.index, 1);
        assert_eq!(s1.routes[1].param("q"), Some(&json!("rust")));
        assert_eq!(s1.routes[1].key, s0.routes[1].key);
        assert!(Arc::ptr_eq(&s0.routes[0], &s1.routes[0]));
        Ok(())
    }

    #[test]
    fn back_behaviors() -> Result<()> {
        let r = tabs(BackBehavior::None)?;
        let s = r.initial_state(&InitialStateOptions::default());
        let s = r.state_for_action(&s, &Action::jump_to("Me")).expect("handled");
        assert!(r.state_for_action(&s, &Action::go_back()).is_none());

        let r = tabs(BackBehavior::History)?;
        let mut s = r.initial_state(&InitialStateOptions::default());
        for name in ["Me", "Search", "Me"] {
            s = r.state_for_action(&s, &Action::jump_to(name)).expect("handled");
        }
        assert_eq!(history_keys(&s).len(), 3);
        let s = r.state_for_action(&s, &Action::go_back()).expect("handled");
        assert_eq!(s.routes[s.index].name, "Search");
        let s = r.state_for_action(&s, &Action::go_back()).expect("handled");
        assert_eq!(s.routes[s.index].name, "Feed");
        assert!(r.state_for_action(&s, &Action::go_back()).is_none());

        let r = tabs(BackBehavior::Order)?;
        let s = r.initial_state(&InitialStateOptions::default());
        let s = r.state_for_action(&s, &Action::jump_to("Me")).expect("handled");
        let s = r.state_for_action(&s, &Action::go_back()).expect("handled");
        assert_eq!(s.index, 1);

        let r = tabs(BackBehavior::InitialRoute)?;
        let s = r.initial_state(&InitialStateOptions::default());
        let s = r.state_for_action(&s, &Action::jump_to("Me")).expect("handled");
        let s = r.state_for_action(&s, &Action::go_back()).expect("handled");
        assert_eq!(s.index, 0);
        Ok(())
    }

    #[test]
    fn nested_stacks_stay_lazy_until_focused() -> Result<()> {
        let inner = StackRouter::new(
            RouteConfigMap::new(vec![screen("List"), screen("Detail")])?,
            StackOptions::default(),
        )?;
        let r = TabRouter::new(
            RouteConfigMap::new(vec![
                screen("Feed"),
                screen("Library").with_navigator(Arc::new(inner)),
            ])?,
            TabOptions::default(),
        )?;
        let s0 = r.initial_state(&InitialStateOptions::default());
        assert!(s0.routes[1].state.as_ref().is_some_and(NestedState::is_partial));

        let s1 = r
            .state_for_action(&s0, &Action::navigate("Detail"))
            .expect("handled");
        assert_eq!(s1.index, 1);
        let library = s1.routes[1].full_state().expect("materialized");
        let names: Vec<&str> = library.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["List", "Detail"]);
        Ok(())
    }

    #[test]
    fn rehydrate_fills_missing_tabs() -> Result<()> {
        let r = tabs(BackBehavior::None)?;
        let partial = PartialState::new(vec![PartialRoute::new("Me"), PartialRoute::new("Ghost")]);
        let s = r.rehydrated_state(&partial);
        let names: Vec<&str> = s.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Feed", "Search", "Me"]);
        assert_eq!(s.index, 2);
        assert!(s.validate().is_ok());
        Ok(())
    }

    #[test]
    fn stack_actions_are_unhandled() -> Result<()> {
        let r = tabs(BackBehavior::History)?;
        let s = r.initial_state(&InitialStateOptions::default());
        assert!(r.state_for_action(&s, &Action::push("Feed", None)).is_none());
        assert!(r.state_for_action(&s, &Action::PopToTop).is_none());
        Ok(())
    }
}
