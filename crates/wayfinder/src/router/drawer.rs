use std::sync::Arc;

use super::{InitialStateOptions, Router, TabOptions, TabRouter};
use crate::{
    action::Action,
    config::{RouteConfigMap, ScreenOptions},
    error::Result,
    state::{HistoryEntry, NavigationState, NavigatorKind, PartialState},
};

/// A tab navigator with a drawer that can be opened and closed. The drawer
/// is open while the state's history ends with a drawer entry.
#[derive(Debug)]
pub struct DrawerRouter {
    /// Screen switching is delegated to a tab router.
    tabs: TabRouter,
}

impl DrawerRouter {
    /// Build a drawer router.
    pub fn new(configs: RouteConfigMap, options: TabOptions) -> Result<Self> {
        Ok(Self {
            tabs: TabRouter::with_kind(configs, options, NavigatorKind::Drawer)?,
        })
    }

    /// Is the drawer open in this state?
    pub fn is_open(state: &NavigationState) -> bool {
        state.history.contains(&HistoryEntry::Drawer)
    }

    /// Open or close the drawer. Returns the same state if nothing changes.
    fn set_open(state: &Arc<NavigationState>, open: bool) -> Arc<NavigationState> {
        if Self::is_open(state) == open {
            return Arc::clone(state);
        }
        let mut next = state.with_routes(state.routes.clone(), state.index);
        if open {
            next.history.push(HistoryEntry::Drawer);
        } else {
            next.history.retain(|e| *e != HistoryEntry::Drawer);
        }
        Arc::new(next)
    }
}

impl Router for DrawerRouter {
    fn kind(&self) -> NavigatorKind {
        NavigatorKind::Drawer
    }

    fn route_configs(&self) -> &RouteConfigMap {
        self.tabs.route_configs()
    }

    fn default_options(&self) -> &ScreenOptions {
        self.tabs.default_options()
    }

    fn initial_state(&self, options: &InitialStateOptions) -> Arc<NavigationState> {
        self.tabs.initial_state(options)
    }

    fn rehydrated_state(&self, partial: &PartialState) -> Arc<NavigationState> {
        self.tabs.rehydrated_state(partial)
    }

    fn handle_action(
        &self,
        state: &Arc<NavigationState>,
        action: &Action,
    ) -> Option<Arc<NavigationState>> {
        match action {
            Action::OpenDrawer => Some(Self::set_open(state, true)),
            Action::CloseDrawer => Some(Self::set_open(state, false)),
            Action::ToggleDrawer => Some(Self::set_open(state, !Self::is_open(state))),
            Action::GoBack { .. } if Self::is_open(state) => Some(Self::set_open(state, false)),
            _ => self.tabs.handle_action(state, action),
        }
    }
}
