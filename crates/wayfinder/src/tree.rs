//! Utilities for walking a navigation state tree.

use std::sync::Arc;

use crate::state::{NavigationState, NestedState, Params, PartialState, Route};

/// Walk is the return value from traversal closures.
#[derive(PartialEq, Eq, Debug, Clone)]
pub enum Walk<T> {
    /// Don't descend into this route's nested state, but keep walking its
    /// siblings.
    Skip,
    /// Stop walking and return a value.
    Handle(T),
    /// Keep walking.
    Continue,
}

impl<T> Walk<T> {
    /// The handle value of the traversal, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Self::Handle(v) => Some(v),
            _ => None,
        }
    }

    /// Did the traversal return Handle?
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handle(_))
    }
}

/// Visit every route of the materialized tree in pre-order, together with
/// the navigator state that holds it. Lazy branches are not entered.
pub fn walk<'a, R>(
    state: &'a NavigationState,
    f: &mut dyn FnMut(&'a NavigationState, &'a Arc<Route>) -> Walk<R>,
) -> Option<R> {
    walk_inner(state, f).value()
}

/// Pre-order traversal that reports whether it was handled.
fn walk_inner<'a, R>(
    state: &'a NavigationState,
    f: &mut dyn FnMut(&'a NavigationState, &'a Arc<Route>) -> Walk<R>,
) -> Walk<R> {
    for route in &state.routes {
        match f(state, route) {
            Walk::Handle(v) => return Walk::Handle(v),
            Walk::Skip => continue,
            Walk::Continue => {}
        }
        if let Some(child) = route.full_state() {
            let w = walk_inner(child, f);
            if w.is_handled() {
                return w;
            }
        }
    }
    Walk::Continue
}

/// Visit the focused route of each level from the root down. `Skip` stops
/// the descent.
pub fn walk_focus_path<'a, R>(
    state: &'a NavigationState,
    f: &mut dyn FnMut(&'a NavigationState, &'a Arc<Route>) -> Walk<R>,
) -> Option<R> {
    let mut level = state;
    loop {
        let route = level.focused_route()?;
        match f(level, route) {
            Walk::Handle(v) => return Some(v),
            Walk::Skip => return None,
            Walk::Continue => {}
        }
        level = &**route.full_state()?;
    }
}

/// Find a route by key anywhere in the materialized tree, returning it with
/// the navigator state that holds it.
pub fn find_route<'a>(
    state: &'a NavigationState,
    key: &str,
) -> Option<(&'a NavigationState, &'a Arc<Route>)> {
    walk(state, &mut |level, route| {
        if route.key == key {
            Walk::Handle((level, route))
        } else {
            Walk::Continue
        }
    })
}

/// Find a navigator state by key.
pub fn find_navigator<'a>(state: &'a NavigationState, key: &str) -> Option<&'a NavigationState> {
    if state.key == key {
        return Some(state);
    }
    walk(state, &mut |_, route| match route.full_state() {
        Some(child) if child.key == key => Walk::Handle(&**child),
        _ => Walk::Continue,
    })
}

/// The innermost focused route.
pub fn focused_leaf(state: &NavigationState) -> Option<&Arc<Route>> {
    let mut leaf = None;
    walk_focus_path::<()>(state, &mut |_, route| {
        leaf = Some(route);
        Walk::Continue
    });
    leaf
}

/// Is the route with this key on the focused path?
pub fn is_focused(state: &NavigationState, key: &str) -> bool {
    walk_focus_path(state, &mut |_, route| {
        if route.key == key {
            Walk::Handle(())
        } else {
            Walk::Continue
        }
    })
    .is_some()
}

/// Screen names and params along the focused path, root first.
pub fn focused_path(state: &NavigationState) -> Vec<(String, Option<Params>)> {
    let mut path = Vec::new();
    walk_focus_path::<()>(state, &mut |_, route| {
        path.push((route.name.clone(), route.params.clone()));
        Walk::Continue
    });
    path
}

/// Screen names and params along the focused path of a partial state,
/// following lazy and materialized levels alike.
pub fn partial_focused_path(state: &PartialState) -> Vec<(String, Option<Params>)> {
    let mut path = Vec::new();
    let mut level = state.clone();
    while let Some(route) = level.focused_route() {
        path.push((route.name.clone(), route.params.clone()));
        let next = route.state.as_ref().map(NestedState::to_partial);
        match next {
            Some(child) => level = child,
            None => break,
        }
    }
    path
}
