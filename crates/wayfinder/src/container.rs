//! The navigation container: the single owner of the current state tree.
//!
//! All changes go through [`NavigationContainer::dispatch`]. Dispatches are
//! processed one at a time: listeners that want to navigate in response to a
//! change push actions onto the [`ActionQueue`] they are handed, and those
//! actions run in order once the current dispatch has settled.

use std::{collections::VecDeque, fmt, mem, sync::Arc};

use slotmap::{SlotMap, new_key_type};
use tracing::{debug, warn};

use crate::{
    action::Action,
    error::{Error, Result},
    navigation::Navigation,
    router::{InitialStateOptions, Router},
    state::{NavigationState, NestedState, Params, Route},
    tree,
};

new_key_type! {
    /// Handle for a registered listener.
    pub struct ListenerId;
}

/// A settled state change.
#[derive(Debug)]
pub struct StateChange<'a> {
    /// The action that caused the change. `None` for a root reset.
    pub action: Option<&'a Action>,
    /// The state before the change.
    pub previous: &'a Arc<NavigationState>,
    /// The state after the change.
    pub current: &'a Arc<NavigationState>,
}

/// Actions dispatched from inside a listener. They run after the current
/// dispatch settles, in the order they were queued.
#[derive(Debug, Default)]
pub struct ActionQueue {
    /// Pending actions.
    pending: VecDeque<Action>,
}

impl ActionQueue {
    /// Queue an action.
    pub fn dispatch(&mut self, action: Action) {
        self.pending.push_back(action);
    }

    /// Number of queued actions.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Is the queue empty?
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// A listener callback.
pub type Callback = Box<dyn FnMut(&StateChange<'_>, &mut ActionQueue)>;

/// A registered listener.
struct Listener {
    /// Only fire when the route with this key is replaced.
    route: Option<String>,
    /// The callback.
    callback: Callback,
}

impl Listener {
    /// Does this listener care about the change?
    fn wants(&self, change: &StateChange<'_>) -> bool {
        let Some(key) = &self.route else {
            return true;
        };
        let before = tree::find_route(change.previous, key).map(|(_, r)| r);
        let after = tree::find_route(change.current, key).map(|(_, r)| r);
        match (before, after) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        }
    }
}

/// Observes every settled dispatch. Used to feed external inspectors.
pub trait ActionObserver {
    /// Called once with the state at the time the observer is attached.
    fn on_init(&mut self, _state: &NavigationState) {}

    /// Called after each handled action with the resulting state.
    fn on_action(&mut self, action: &Action, state: &NavigationState);
}

/// Owns the current navigation state and routes actions through the root
/// router.
pub struct NavigationContainer {
    /// Root router.
    router: Arc<dyn Router>,
    /// Current state.
    state: Arc<NavigationState>,
    /// Registered listeners.
    listeners: SlotMap<ListenerId, Listener>,
    /// Actions queued by listeners.
    queue: VecDeque<Action>,
    /// Attached observers.
    observers: Vec<Box<dyn ActionObserver>>,
}

impl fmt::Debug for NavigationContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationContainer")
            .field("router", &self.router)
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl NavigationContainer {
    /// A container starting from the router's initial state.
    pub fn new(router: Arc<dyn Router>) -> Self {
        let state = router.initial_state(&InitialStateOptions::default());
        Self::from_parts(router, state)
    }

    /// A container restoring a previously persisted state. The state is
    /// rehydrated against the router, so routes whose screens are no longer
    /// registered are dropped.
    pub fn with_state(router: Arc<dyn Router>, restored: &NestedState) -> Result<Self> {
        let state = router.rehydrated_state(&restored.to_partial());
        state.validate()?;
        Ok(Self::from_parts(router, state))
    }

    /// A container restoring a state persisted with [`to_json`](Self::to_json).
    pub fn from_json(router: Arc<dyn Router>, json: &str) -> Result<Self> {
        let restored: NestedState = serde_json::from_str(json)?;
        Self::with_state(router, &restored)
    }

    /// Assemble a container.
    fn from_parts(router: Arc<dyn Router>, state: Arc<NavigationState>) -> Self {
        Self {
            router,
            state,
            listeners: SlotMap::with_key(),
            queue: VecDeque::new(),
            observers: Vec::new(),
        }
    }

    /// The root router.
    pub fn router(&self) -> &Arc<dyn Router> {
        &self.router
    }

    /// The current state.
    pub fn state(&self) -> &Arc<NavigationState> {
        &self.state
    }

    /// Serialize the current state for persistence.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&*self.state)?)
    }

    /// The innermost focused route.
    pub fn current_route(&self) -> Option<&Arc<Route>> {
        tree::focused_leaf(&self.state)
    }

    /// Screen names and params along the focused path, root first.
    pub fn focused_route_path(&self) -> Vec<(String, Option<Params>)> {
        tree::focused_path(&self.state)
    }

    /// The imperative navigation handle for the route with `key`.
    pub fn navigation(&mut self, route_key: &str) -> Option<Navigation<'_>> {
        let (holder, _) = tree::find_route(&self.state, route_key)?;
        let navigator_key = holder.key.clone();
        Some(Navigation::new(self, route_key.to_string(), navigator_key))
    }

    /// Register a listener fired on every state change.
    pub fn subscribe(
        &mut self,
        f: impl FnMut(&StateChange<'_>, &mut ActionQueue) + 'static,
    ) -> ListenerId {
        self.listeners.insert(Listener {
            route: None,
            callback: Box::new(f),
        })
    }

    /// Register a listener fired only when the route with `key` is replaced,
    /// added or removed.
    pub fn subscribe_route(
        &mut self,
        key: impl Into<String>,
        f: impl FnMut(&StateChange<'_>, &mut ActionQueue) + 'static,
    ) -> ListenerId {
        self.listeners.insert(Listener {
            route: Some(key.into()),
            callback: Box::new(f),
        })
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id).is_some()
    }

    /// Attach an observer. It immediately sees the current state.
    pub fn add_observer(&mut self, mut observer: Box<dyn ActionObserver>) {
        observer.on_init(&self.state);
        self.observers.push(observer);
    }

    /// Dispatch an action. Returns `Ok(true)` if some router handled it and
    /// `Ok(false)` if none did. Fails if the action names a screen that no
    /// router in the tree registers. Actions queued by listeners are
    /// processed before this returns.
    pub fn dispatch(&mut self, action: Action) -> Result<bool> {
        let handled = self.apply(&action)?;
        self.drain();
        Ok(handled)
    }

    /// Replace the whole tree without dispatching an action. The state is
    /// rehydrated against the root router like a restored one, so screens the
    /// routers do not register are dropped. Route keys survive.
    pub fn reset_root(&mut self, state: impl Into<NestedState>) -> Result<()> {
        let next = self.router.rehydrated_state(&state.into().to_partial());
        next.validate()?;
        let previous = mem::replace(&mut self.state, next);
        debug!(navigator = %self.state.key, "reset root");
        self.notify(None, &previous);
        self.drain();
        Ok(())
    }

    /// Run one action through the root router and notify.
    fn apply(&mut self, action: &Action) -> Result<bool> {
        if let Some(name) = action
            .screen_names()
            .into_iter()
            .find(|n| !self.router.knows_route(n))
        {
            return Err(Error::UnknownRoute(name.to_string()));
        }
        let Some(next) = self.router.state_for_action(&self.state, action) else {
            debug!(action = action.kind(), "unhandled");
            return Ok(false);
        };
        if Arc::ptr_eq(&next, &self.state) {
            debug!(action = action.kind(), "handled without change");
        } else {
            let previous = mem::replace(&mut self.state, next);
            debug!(action = action.kind(), index = self.state.index, "state changed");
            self.notify(Some(action), &previous);
        }
        for o in &mut self.observers {
            o.on_action(action, &self.state);
        }
        Ok(true)
    }

    /// Process actions queued by listeners until the queue is empty.
    fn drain(&mut self) {
        while let Some(next) = self.queue.pop_front() {
            if let Err(e) = self.apply(&next) {
                warn!(action = next.kind(), error = %e, "queued action failed");
            }
        }
    }

    /// Fire the listeners interested in a change.
    fn notify(&mut self, action: Option<&Action>, previous: &Arc<NavigationState>) {
        let change = StateChange {
            action,
            previous,
            current: &self.state,
        };
        let mut queue = ActionQueue::default();
        for (_, listener) in &mut self.listeners {
            if listener.wants(&change) {
                (listener.callback)(&change, &mut queue);
            }
        }
        self.queue.extend(queue.pending);
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        config::{ComponentRef, RouteConfigMap, ScreenConfig},
        router::{StackOptions, StackRouter},
    };

    fn container() -> Result<NavigationContainer> {
        let screen = |n: &str| ScreenConfig::new(n, ComponentRef::new(n));
        let router = StackRouter::new(
            RouteConfigMap::new(vec![screen("Home"), screen("Profile"), screen("Settings")])?,
            StackOptions::default(),
        )?;
        Ok(NavigationContainer::new(Arc::new(router)))
    }

    fn top(c: &NavigationContainer) -> String {
        c.current_route().map(|r| r.name.clone()).unwrap_or_default()
    }

    #[test]
    fn dispatch_outcomes() -> Result<()> {
        let mut c = container()?;
        let count = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&count);
        c.subscribe(move |_, _| *seen.borrow_mut() += 1);

        assert!(!c.dispatch(Action::go_back())?);
        assert_eq!(*count.borrow(), 0);

        assert!(c.dispatch(Action::navigate("Profile"))?);
        assert_eq!(*count.borrow(), 1);
        assert!(c.dispatch(Action::navigate("Profile"))?);
        assert_eq!(*count.borrow(), 1);

        assert_eq!(
            c.dispatch(Action::navigate("Ghost")),
            Err(Error::UnknownRoute("Ghost".into()))
        );
        assert_eq!(top(&c), "Profile");
        Ok(())
    }

    #[test]
    fn reentrant_dispatch_is_queued_in_order() -> Result<()> {
        let mut c = container()?;
        let log = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&log);
        c.subscribe(move |change, queue| {
            let name = change
                .current
                .focused_route()
                .map(|r| r.name.clone())
                .unwrap_or_default();
            seen.borrow_mut().push(name.clone());
            if name == "Profile" {
                queue.dispatch(Action::push("Settings", None));
                queue.dispatch(Action::push("Home", None));
            }
        });
        c.dispatch(Action::navigate("Profile"))?;
        assert_eq!(*log.borrow(), vec!["Profile", "Settings", "Home"]);
        assert_eq!(c.state().routes.len(), 4);
        Ok(())
    }

    #[test]
    fn route_listeners_fire_on_their_route_only() -> Result<()> {
        let mut c = container()?;
        let home_key = c.state().routes[0].key.clone();
        let hits = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&hits);
        let id = c.subscribe_route(home_key.clone(), move |_, _| *seen.borrow_mut() += 1);

        c.dispatch(Action::navigate("Profile"))?;
        assert_eq!(*hits.borrow(), 0);
        let mut p = Params::new();
        p.insert("x".into(), serde_json::json!(1));
        c.dispatch(Action::set_params(home_key, p.clone()))?;
        assert_eq!(*hits.borrow(), 1);

        assert!(c.unsubscribe(id));
        assert!(!c.unsubscribe(id));
        let key = c.state().routes[0].key.clone();
        c.dispatch(Action::set_params(key, p))?;
        assert_eq!(*hits.borrow(), 1);
        Ok(())
    }

    #[test]
    fn persist_and_restore() -> Result<()> {
        let mut c = container()?;
        c.dispatch(Action::navigate("Profile"))?;
        let json = c.to_json()?;
        let restored = NavigationContainer::from_json(Arc::clone(c.router()), &json)?;
        assert_eq!(restored.state(), c.state());
        Ok(())
    }

    #[test]
    fn observers_and_reset_root() -> Result<()> {
        struct Recorder(Rc<RefCell<Vec<String>>>);
        impl ActionObserver for Recorder {
            fn on_init(&mut self, _state: &NavigationState) {
                self.0.borrow_mut().push("init".into());
            }
            fn on_action(&mut self, action: &Action, _state: &NavigationState) {
                self.0.borrow_mut().push(action.kind().into());
            }
        }
        let mut c = container()?;
        let log = Rc::new(RefCell::new(Vec::new()));
        c.add_observer(Box::new(Recorder(Rc::clone(&log))));
        let initial = Arc::clone(c.state());
        c.dispatch(Action::navigate("Settings"))?;
        c.dispatch(Action::go_back())?;
        c.dispatch(Action::go_back())?;
        assert_eq!(*log.borrow(), vec!["init", "NAVIGATE", "GO_BACK"]);

        c.dispatch(Action::navigate("Profile"))?;
        c.reset_root(NestedState::Full(Arc::clone(&initial)))?;
        assert_eq!(c.state(), &initial);
        Ok(())
    }

    #[test]
    fn reset_root_drops_unregistered_screens() -> Result<()> {
        let mut c = container()?;
        c.dispatch(Action::navigate("Profile"))?;
        let mut forged = (**c.state()).clone();
        let mut ghost = (*forged.routes[1]).clone();
        ghost.name = "Ghost".into();
        forged.routes[1] = Arc::new(ghost);

        c.reset_root(forged)?;
        assert_eq!(c.state().routes.len(), 1);
        assert_eq!(top(&c), "Home");
        Ok(())
    }
}
