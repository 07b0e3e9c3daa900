//! The imperative navigation API a screen uses.

use crate::{
    action::{Action, Navigate},
    container::NavigationContainer,
    error::Result,
    state::{NestedState, Params},
    tree,
};

/// A screen's handle on the container. Every call builds the matching
/// action and dispatches it.
#[derive(Debug)]
pub struct Navigation<'a> {
    /// The container actions are dispatched to.
    container: &'a mut NavigationContainer,
    /// Key of the screen's route.
    route_key: String,
    /// Key of the navigator that holds the route.
    navigator_key: String,
}

impl<'a> Navigation<'a> {
    /// A handle for a route held by a navigator.
    pub(crate) fn new(
        container: &'a mut NavigationContainer,
        route_key: String,
        navigator_key: String,
    ) -> Self {
        Self {
            container,
            route_key,
            navigator_key,
        }
    }

    /// Key of the screen's route.
    pub fn route_key(&self) -> &str {
        &self.route_key
    }

    /// Key of the navigator holding the screen.
    pub fn navigator_key(&self) -> &str {
        &self.navigator_key
    }

    /// Navigate to a screen.
    pub fn navigate(&mut self, name: &str, params: Option<Params>) -> Result<bool> {
        let mut nav = Navigate::new(name);
        nav.params = params;
        self.container.dispatch(nav.into())
    }

    /// Leave this screen.
    pub fn go_back(&mut self) -> Result<bool> {
        self.container
            .dispatch(Action::go_back_from(self.route_key.clone()))
    }

    /// Go back from another route, typically one further up the stack.
    pub fn go_back_from(&mut self, key: &str) -> Result<bool> {
        self.container.dispatch(Action::go_back_from(key))
    }

    /// Reset the navigator holding this screen.
    pub fn reset(&mut self, state: impl Into<NestedState>) -> Result<bool> {
        self.container.dispatch(Action::Reset {
            state: state.into(),
            target: Some(self.navigator_key.clone()),
        })
    }

    /// Merge params into this screen's route.
    pub fn set_params(&mut self, params: Params) -> Result<bool> {
        self.container
            .dispatch(Action::set_params(self.route_key.clone(), params))
    }

    /// Dispatch an arbitrary action.
    pub fn dispatch(&mut self, action: Action) -> Result<bool> {
        self.container.dispatch(action)
    }

    /// Is this screen on the focused path?
    pub fn is_focused(&self) -> bool {
        tree::is_focused(self.container.state(), &self.route_key)
    }
}
