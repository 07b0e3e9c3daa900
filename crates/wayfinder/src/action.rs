//! Navigation actions.
//!
//! Actions serialize as `{"type": "NAVIGATE", "payload": {...}}`, which is the
//! shape the devtools wire protocol carries.

use serde::{Deserialize, Serialize};

use crate::state::{NestedState, Params, PartialState};

/// Payload of a `NAVIGATE` action.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Navigate {
    /// Target screen name.
    pub name: String,
    /// Route key. Navigating to an existing key returns to that route.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Screen parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
    /// Action to apply to the navigator nested in the target screen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Box<Action>>,
    /// Key of the navigator that must handle this action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl Navigate {
    /// Navigate to a screen by name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the screen parameters.
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    /// Set the route key.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the nested action.
    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(Box::new(action));
        self
    }

    /// Restrict handling to the navigator with this key.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }
}

/// A navigation action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Go to a screen, pushing or focusing it depending on the navigator.
    Navigate(Navigate),
    /// Leave the focused screen, or the screen with `key`.
    GoBack {
        /// Route to go back from.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    /// Replace a navigator state wholesale.
    Reset {
        /// The new state; partial states are rehydrated.
        state: NestedState,
        /// Key of the navigator to reset. Untargeted resets apply to the
        /// navigator the action is dispatched to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
    },
    /// Merge parameters into the route with `key`.
    SetParams {
        /// Route key.
        key: String,
        /// Parameters to merge.
        params: Params,
    },
    /// Stack: push a new route, even if an identical one is on top.
    Push {
        /// Screen name.
        name: String,
        /// Screen parameters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Params>,
    },
    /// Stack: pop `count` routes, keeping at least one.
    Pop {
        /// Number of routes to pop.
        count: usize,
    },
    /// Stack: pop everything above the first route.
    PopToTop,
    /// Stack: replace the focused route (or the route with `key`).
    Replace {
        /// Screen name.
        name: String,
        /// Screen parameters.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Params>,
        /// Route to replace.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
    },
    /// Tab/drawer: focus the route with this name or key.
    JumpTo {
        /// Screen name or route key.
        name: String,
        /// Parameters to merge into the focused route.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Params>,
    },
    /// Drawer: open the drawer.
    OpenDrawer,
    /// Drawer: close the drawer.
    CloseDrawer,
    /// Drawer: flip the drawer.
    ToggleDrawer,
}

impl From<Navigate> for Action {
    fn from(n: Navigate) -> Self {
        Self::Navigate(n)
    }
}

impl Action {
    /// Navigate to a screen by name.
    pub fn navigate(name: impl Into<String>) -> Self {
        Self::Navigate(Navigate::new(name))
    }

    /// Navigate to a screen with parameters.
    pub fn navigate_with(name: impl Into<String>, params: Params) -> Self {
        Self::Navigate(Navigate::new(name).with_params(params))
    }

    /// Go back from the focused screen.
    pub fn go_back() -> Self {
        Self::GoBack { key: None }
    }

    /// Go back from the screen with `key`.
    pub fn go_back_from(key: impl Into<String>) -> Self {
        Self::GoBack {
            key: Some(key.into()),
        }
    }

    /// Reset the receiving navigator to `state`.
    pub fn reset(state: impl Into<NestedState>) -> Self {
        Self::Reset {
            state: state.into(),
            target: None,
        }
    }

    /// Merge parameters into a route.
    pub fn set_params(key: impl Into<String>, params: Params) -> Self {
        Self::SetParams {
            key: key.into(),
            params,
        }
    }

    /// Push a screen.
    pub fn push(name: impl Into<String>, params: Option<Params>) -> Self {
        Self::Push {
            name: name.into(),
            params,
        }
    }

    /// Pop `count` screens.
    pub fn pop(count: usize) -> Self {
        Self::Pop { count }
    }

    /// Jump to a tab.
    pub fn jump_to(name: impl Into<String>) -> Self {
        Self::JumpTo {
            name: name.into(),
            params: None,
        }
    }

    /// The wire name of the action type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Navigate(_) => "NAVIGATE",
            Self::GoBack { .. } => "GO_BACK",
            Self::Reset { .. } => "RESET",
            Self::SetParams { .. } => "SET_PARAMS",
            Self::Push { .. } => "PUSH",
            Self::Pop { .. } => "POP",
            Self::PopToTop => "POP_TO_TOP",
            Self::Replace { .. } => "REPLACE",
            Self::JumpTo { .. } => "JUMP_TO",
            Self::OpenDrawer => "OPEN_DRAWER",
            Self::CloseDrawer => "CLOSE_DRAWER",
            Self::ToggleDrawer => "TOGGLE_DRAWER",
        }
    }

    /// The navigator key this action is restricted to, if any.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Navigate(n) => n.target.as_deref(),
            Self::Reset { target, .. } => target.as_deref(),
            _ => None,
        }
    }

    /// Should the action be offered to nested navigators first? Untargeted
    /// resets are handled where they are dispatched.
    pub fn bubbles(&self) -> bool {
        !matches!(self, Self::Reset { target: None, .. })
    }

    /// Every screen name this action refers to, including nested actions and
    /// the routes of a reset state.
    pub fn screen_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    /// Accumulate referenced screen names.
    fn collect_names<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Self::Navigate(n) => {
                names.push(&n.name);
                if let Some(inner) = &n.action {
                    inner.collect_names(names);
                }
            }
            Self::Push { name, .. } | Self::Replace { name, .. } => names.push(name),
            Self::Reset { state, .. } => collect_state_names(state, names),
            _ => {}
        }
    }
}

/// Accumulate the screen names of a nested state.
fn collect_state_names<'a>(state: &'a NestedState, names: &mut Vec<&'a str>) {
    match state {
        NestedState::Full(s) => {
            for r in &s.routes {
                names.push(&r.name);
                if let Some(child) = &r.state {
                    collect_state_names(child, names);
                }
            }
        }
        NestedState::Partial(p) => collect_partial_names(p, names),
    }
}

/// Accumulate the screen names of a partial state.
fn collect_partial_names<'a>(state: &'a PartialState, names: &mut Vec<&'a str>) {
    for r in &state.routes {
        names.push(&r.name);
        if let Some(child) = &r.state {
            collect_state_names(child, names);
        }
    }
}
