use std::{collections::BTreeMap, fmt};

use serde_json::Value;
use tracing::{debug, warn};

use super::{LinkingConfig, ParseFn, ScreenLinking, StringifyFn, query};
use crate::{
    action::{Action, Navigate},
    error::{Error, Result},
    path::{Path, PathPattern, Segment, encode},
    router::Router,
    state::{NavigationState, NestedState, Params, PartialRoute, PartialState, valid_screen_name},
};

/// One screen on the way from the root to a matched screen.
#[derive(Clone)]
struct Link {
    /// Screen name.
    name: String,
    /// Params declared by this screen's own pattern.
    params: Vec<String>,
    /// Parse hooks of this screen.
    parse: BTreeMap<String, ParseFn>,
    /// Initial route of the navigator this screen belongs to.
    initial_route_name: Option<String>,
}

impl Link {
    /// Parse a raw value for one of this screen's params.
    fn parse_value(&self, param: &str, raw: &str) -> Value {
        match self.parse.get(param) {
            Some(f) => f(raw),
            None => Value::String(raw.to_string()),
        }
    }
}

/// A compiled pattern and the screens it resolves to, outermost first.
struct Entry {
    /// Full pattern, including inherited prefixes.
    pattern: PathPattern,
    /// Screens from the root navigator down to the matched screen.
    chain: Vec<Link>,
}

impl Entry {
    /// Screen names along the chain.
    fn names(&self) -> Vec<&str> {
        self.chain.iter().map(|l| l.name.as_str()).collect()
    }
}

/// The config tree with each screen's own pattern compiled.
struct ScreenNode {
    /// The screen's own pattern.
    pattern: Option<PathPattern>,
    /// The pattern does not inherit the parent's.
    exact: bool,
    /// Initial route of the nested navigator.
    initial_route_name: Option<String>,
    /// Stringify hooks.
    stringify: BTreeMap<String, StringifyFn>,
    /// Nested screens.
    screens: BTreeMap<String, Self>,
}

impl ScreenNode {
    /// Stringify a param value for a path segment or query value.
    fn stringify_value(&self, param: &str, value: &Value) -> String {
        match self.stringify.get(param) {
            Some(f) => f(value),
            None => default_stringify(value),
        }
    }
}

/// Strings are emitted as they are, everything else as JSON text.
fn default_stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip a `scheme://` prefix.
fn strip_scheme(url: &str) -> &str {
    match url.split_once("://") {
        Some((scheme, rest))
            if !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            rest
        }
        _ => url,
    }
}

/// A compiled linking config.
pub struct Linker {
    /// URL prefixes.
    prefixes: Vec<String>,
    /// Initial route of the root navigator.
    initial_route_name: Option<String>,
    /// Compiled config tree.
    screens: BTreeMap<String, ScreenNode>,
    /// Patterns, most specific first.
    entries: Vec<Entry>,
}

impl fmt::Debug for Linker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Linker")
            .field("prefixes", &self.prefixes)
            .field(
                "patterns",
                &self
                    .entries
                    .iter()
                    .map(|e| e.pattern.to_string())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Compile a level of the config tree, appending one entry per screen that
/// has a pattern.
fn compile_level(
    screens: &BTreeMap<String, ScreenLinking>,
    level_initial: Option<&str>,
    parent: Option<&PathPattern>,
    chain: &[Link],
    entries: &mut Vec<Entry>,
) -> Result<BTreeMap<String, ScreenNode>> {
    let mut nodes = BTreeMap::new();
    for (name, screen) in screens {
        let own = screen.path.as_deref().map(PathPattern::new).transpose()?;
        let full = match (&own, parent) {
            (Some(own), Some(parent)) if !screen.exact => Some(parent.join(own)?),
            (Some(own), _) => Some(own.clone()),
            (None, parent) => parent.cloned(),
        };
        let mut links = chain.to_vec();
        links.push(Link {
            name: name.clone(),
            params: own
                .as_ref()
                .map(|p| p.params().map(ToString::to_string).collect())
                .unwrap_or_default(),
            parse: screen.parse.clone(),
            initial_route_name: level_initial.map(ToString::to_string),
        });
        if let Some(pattern) = full.as_ref().filter(|_| own.is_some()) {
            entries.push(Entry {
                pattern: pattern.clone(),
                chain: links.clone(),
            });
        }
        let children = compile_level(
            &screen.screens,
            screen.initial_route_name.as_deref(),
            full.as_ref(),
            &links,
            entries,
        )?;
        nodes.insert(
            name.clone(),
            ScreenNode {
                pattern: own,
                exact: screen.exact,
                initial_route_name: screen.initial_route_name.clone(),
                stringify: screen.stringify.clone(),
                screens: children,
            },
        );
    }
    Ok(nodes)
}

/// A pattern's structure with param names erased; two patterns with the
/// same shape match exactly the same paths.
fn shape(pattern: &PathPattern) -> Vec<String> {
    pattern
        .segments()
        .iter()
        .map(|s| match s {
            Segment::Literal(l) => l.clone(),
            Segment::Param(_) => String::from(":"),
            Segment::OptionalParam(_) => String::from(":?"),
            Segment::Wildcard => String::from("*"),
        })
        .collect()
}

/// Reject patterns that match the same paths for unrelated screens. A
/// nested screen may repeat its parent's pattern.
fn check_duplicates(entries: &[Entry]) -> Result<()> {
    for (i, a) in entries.iter().enumerate() {
        for b in &entries[i + 1..] {
            if shape(&a.pattern) != shape(&b.pattern) {
                continue;
            }
            let (an, bn) = (a.names(), b.names());
            if an.starts_with(&bn) || bn.starts_with(&an) {
                continue;
            }
            return Err(Error::Config(format!(
                "screens {} and {} both use the pattern {:?}",
                an.join("/"),
                bn.join("/"),
                a.pattern.to_string()
            )));
        }
    }
    Ok(())
}

/// Can this level of a state be reached with a single `NAVIGATE`? Either it
/// holds one route, or the navigator's initial route followed by the
/// focused one.
fn navigable(state: &PartialState, level_initial: Option<&str>) -> bool {
    match state.routes.as_slice() {
        [_] => true,
        [first, _] => {
            state.focused_index() == 1
                && first.params.is_none()
                && first.state.is_none()
                && Some(first.name.as_str()) == level_initial
        }
        _ => false,
    }
}

impl Linker {
    /// Compile a config. Fails on malformed or duplicate patterns.
    pub fn new(config: LinkingConfig) -> Result<Self> {
        let mut entries = Vec::new();
        let screens = compile_level(
            &config.screens,
            config.initial_route_name.as_deref(),
            None,
            &[],
            &mut entries,
        )?;
        check_duplicates(&entries)?;
        // Stable sort: nested screens win over their parent on equal patterns.
        entries.sort_by(|a, b| {
            a.pattern
                .cmp_specificity(&b.pattern)
                .then_with(|| b.chain.len().cmp(&a.chain.len()))
        });
        Ok(Self {
            prefixes: config.prefixes,
            initial_route_name: config.initial_route_name,
            screens,
            entries,
        })
    }

    /// Compiled patterns in matching order, with the screens each resolves
    /// to.
    pub fn patterns(&self) -> impl Iterator<Item = (&PathPattern, Vec<&str>)> {
        self.entries.iter().map(|e| (&e.pattern, e.names()))
    }

    /// Resolve a full URL: a configured prefix (or else any `scheme://`) is
    /// stripped before matching.
    pub fn state_from_url(&self, url: &str) -> Option<PartialState> {
        let rest = self
            .prefixes
            .iter()
            .find_map(|p| url.strip_prefix(p.as_str()))
            .unwrap_or_else(|| strip_scheme(url));
        self.state_from_path(rest)
    }

    /// Resolve a path, with an optional query string, to a partial state.
    /// `None` means no pattern matched.
    pub fn state_from_path(&self, path: &str) -> Option<PartialState> {
        let (raw, search) = query::split(path);
        let path = Path::from(raw);
        let pairs = search.map(query::parse).unwrap_or_default();
        if self.screens.is_empty() {
            return self.state_from_segments(&path, &pairs);
        }
        let Some((entry, captures)) = self
            .entries
            .iter()
            .find_map(|e| e.pattern.captures(&path).map(|c| (e, c)))
        else {
            debug!(path = %path, "no pattern matches");
            return None;
        };
        debug!(path = %path, pattern = %entry.pattern, "matched");

        let mut child: Option<PartialState> = None;
        let leaf = entry.chain.len() - 1;
        for (depth, link) in entry.chain.iter().enumerate().rev() {
            let mut params = Params::new();
            for name in &link.params {
                if let Some(raw) = captures.get(name) {
                    params.insert(name.clone(), link.parse_value(name, raw));
                }
            }
            if depth == leaf {
                for (k, v) in &pairs {
                    if !params.contains_key(k) {
                        params.insert(k.clone(), link.parse_value(k, v));
                    }
                }
            }
            let route = PartialRoute::new(link.name.clone())
                .with_params((!params.is_empty()).then_some(params))
                .with_state(child.take().map(NestedState::from));
            child = Some(Self::with_initial(route, link.initial_route_name.as_deref()));
        }
        child
    }

    /// A level holding `route`, preceded by the navigator's initial route
    /// when that is a different screen.
    fn with_initial(route: PartialRoute, initial: Option<&str>) -> PartialState {
        let mut routes = Vec::with_capacity(2);
        if let Some(initial) = initial
            && initial != route.name
        {
            routes.push(PartialRoute::new(initial));
        }
        routes.push(route);
        PartialState::new(routes)
    }

    /// Resolve a path when no screens are configured: every segment names
    /// the screen at the next depth.
    fn state_from_segments(&self, path: &Path, pairs: &[(String, String)]) -> Option<PartialState> {
        let names = path.decoded();
        if names.is_empty() || !names.iter().all(|n| valid_screen_name(n)) {
            return None;
        }
        let mut child: Option<PartialState> = None;
        for (depth, name) in names.iter().enumerate().rev() {
            let params = if depth + 1 == names.len() && !pairs.is_empty() {
                Some(
                    pairs
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                        .collect(),
                )
            } else {
                None
            };
            let route = PartialRoute::new(name.clone())
                .with_params(params)
                .with_state(child.take().map(NestedState::from));
            let initial = if depth == 0 {
                self.initial_route_name.as_deref()
            } else {
                None
            };
            child = Some(Self::with_initial(route, initial));
        }
        child
    }

    /// Serialize the focused branch of a state as a path.
    pub fn path_from_state(&self, state: &NavigationState) -> String {
        self.path_from_partial(&PartialState::from(state))
    }

    /// Serialize the focused branch of a partial state as a path. Params
    /// not consumed by a pattern are appended to the query string when they
    /// belong to the innermost focused route.
    pub fn path_from_partial(&self, state: &PartialState) -> String {
        let mut segments: Vec<String> = Vec::new();
        let mut query_pairs: Vec<(String, String)> = Vec::new();
        let mut level = Some(&self.screens);
        let mut current = state.clone();
        while let Some(route) = current.focused_route().cloned() {
            let node = level.and_then(|l| l.get(&route.name));
            let mut used: Vec<String> = Vec::new();
            match node {
                Some(node) => {
                    if node.exact {
                        segments.clear();
                    }
                    if let Some(pattern) = &node.pattern {
                        for seg in pattern.segments() {
                            match seg {
                                Segment::Literal(l) => segments.push(l.clone()),
                                Segment::Param(n) | Segment::OptionalParam(n) => {
                                    used.push(n.clone());
                                    match route.params.as_ref().and_then(|p| p.get(n)) {
                                        Some(v) => segments.push(node.stringify_value(n, v)),
                                        None => debug!(param = %n, screen = %route.name, "param missing"),
                                    }
                                }
                                Segment::Wildcard => segments.push(route.name.clone()),
                            }
                        }
                    }
                    level = Some(&node.screens);
                }
                None => {
                    segments.push(route.name.clone());
                    level = None;
                }
            }
            match &route.state {
                Some(child) => current = child.to_partial(),
                None => {
                    for (k, v) in route.params.iter().flatten() {
                        if used.contains(k) {
                            continue;
                        }
                        let s = match node {
                            Some(node) => node.stringify_value(k, v),
                            None => default_stringify(v),
                        };
                        query_pairs.push((k.clone(), s));
                    }
                    break;
                }
            }
        }

        let mut out = String::from("/");
        out.push_str(&segments.iter().map(|s| encode(s)).collect::<Vec<_>>().join("/"));
        if !query_pairs.is_empty() {
            out.push('?');
            out.push_str(&query::format(
                query_pairs.iter().map(|(k, v)| (k.as_str(), v.clone())),
            ));
        }
        out
    }

    /// Convert a resolved state into the action that reproduces it from the
    /// current state: a `NAVIGATE` with one nested `NAVIGATE` per level, or
    /// a `RESET` when some level holds routes a navigate cannot recreate.
    pub fn action_from_state(&self, state: &PartialState) -> Option<Action> {
        if state.routes.is_empty() {
            return None;
        }
        match self.navigate_for(state, self.initial_route_name.as_deref(), Some(&self.screens)) {
            Some(nav) => Some(Action::Navigate(nav)),
            None => Some(Action::reset(state.clone())),
        }
    }

    /// The `NAVIGATE` for one level and everything below it.
    fn navigate_for(
        &self,
        state: &PartialState,
        level_initial: Option<&str>,
        level: Option<&BTreeMap<String, ScreenNode>>,
    ) -> Option<Navigate> {
        if !navigable(state, level_initial) {
            return None;
        }
        let route = state.focused_route()?;
        let mut nav = Navigate::new(route.name.clone());
        nav.params = route.params.clone();
        if let Some(child) = &route.state {
            let node = level.and_then(|l| l.get(&route.name));
            let inner = self.navigate_for(
                &child.to_partial(),
                node.and_then(|n| n.initial_route_name.as_deref()),
                node.map(|n| &n.screens),
            )?;
            nav = nav.with_action(Action::Navigate(inner));
        }
        Some(nav)
    }

    /// Check that every linked screen is registered in the router tree.
    pub fn validate(&self, router: &dyn Router) -> Result<()> {
        let mut unknown = Vec::new();
        check_level(&self.screens, Some(router), &mut unknown);
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(format!(
                "linking config names unknown screens: {}",
                unknown.join(", ")
            )))
        }
    }
}

/// Collect linked screens the router at this level does not know.
fn check_level(
    nodes: &BTreeMap<String, ScreenNode>,
    router: Option<&dyn Router>,
    unknown: &mut Vec<String>,
) {
    for (name, node) in nodes {
        let child = match router {
            Some(r) if r.route_configs().contains(name) => r.child_router(name).map(|c| &**c),
            Some(r) => {
                if !r.knows_route(name) {
                    warn!(screen = %name, "linking config names an unknown screen");
                    unknown.push(name.clone());
                }
                None
            }
            None => None,
        };
        check_level(&node.screens, child, unknown);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::{
        config::{ComponentRef, RouteConfigMap, ScreenConfig},
        router::{StackOptions, StackRouter, TabOptions, TabRouter},
    };

    /// The config the link tester starts with.
    fn tester_config() -> LinkingConfig {
        LinkingConfig::new()
            .with_screen(
                "Home",
                ScreenLinking::nested()
                    .with_initial_route_name("Feed")
                    .with_screen(
                        "Profile",
                        ScreenLinking::path("user/:id")
                            .with_parse("id", |id| json!(id.trim_start_matches('@')))
                            .with_screen("Settings", "edit"),
                    ),
            )
            .with_screen("NoMatch", "*")
    }

    fn names(state: &PartialState) -> Vec<&str> {
        state.routes.iter().map(|r| r.name.as_str()).collect()
    }

    fn child(route: &PartialRoute) -> PartialState {
        route.state.as_ref().map(NestedState::to_partial).unwrap_or_default()
    }

    #[test]
    fn people_pattern() -> Result<()> {
        let linker = Linker::new(LinkingConfig::new().with_screen("Profile", "people/:name"))?;
        let state = linker.state_from_path("/people/Jordan").expect("match");
        assert_eq!(state.routes.len(), 1);
        assert_eq!(state.routes[0].name, "Profile");
        assert_eq!(
            state.routes[0].params,
            Some(json!({"name": "Jordan"}).as_object().cloned().unwrap_or_default())
        );
        assert!(linker.state_from_path("/people").is_none());
        Ok(())
    }

    #[test]
    fn tester_example() -> Result<()> {
        let linker = Linker::new(tester_config())?;
        let state = linker.state_from_path("/user/@vergil/edit").expect("match");
        assert_eq!(names(&state), vec!["Home"]);
        let home = child(&state.routes[0]);
        assert_eq!(names(&home), vec!["Feed", "Profile"]);
        assert_eq!(home.routes[1].params, Some(json!({"id": "vergil"}).as_object().cloned().unwrap_or_default()));
        let profile = child(&home.routes[1]);
        assert_eq!(names(&profile), vec!["Settings"]);
        assert_eq!(profile.routes[0].params, None);

        assert_eq!(linker.path_from_partial(&state), "/user/vergil/edit");

        let action = linker.action_from_state(&state).expect("action");
        let expected: Action = Navigate::new("Home")
            .with_action(
                Navigate::new("Profile")
                    .with_params(json!({"id": "vergil"}).as_object().cloned().unwrap_or_default())
                    .with_action(Action::navigate("Settings"))
                    .into(),
            )
            .into();
        assert_eq!(action, expected);

        let lost = linker.state_from_path("/nowhere/at/all").expect("wildcard");
        assert_eq!(names(&lost), vec!["NoMatch"]);
        assert_eq!(linker.path_from_partial(&lost), "/NoMatch");
        Ok(())
    }

    #[test]
    fn literals_beat_params_and_optional_params() -> Result<()> {
        let linker = Linker::new(
            LinkingConfig::new()
                .with_screen("About", "about")
                .with_screen("Item", ":id")
                .with_screen("Feed", "feed/:tab?"),
        )?;
        let name = |p: &str| linker.state_from_path(p).map(|s| s.routes[0].name.clone());
        assert_eq!(name("/about").as_deref(), Some("About"));
        assert_eq!(name("/42").as_deref(), Some("Item"));
        assert_eq!(name("/feed").as_deref(), Some("Feed"));
        let top = linker.state_from_path("/feed/top").expect("match");
        assert_eq!(top.routes[0].params.as_ref().and_then(|p| p.get("tab")), Some(&json!("top")));
        assert_eq!(name("/a/b"), None);
        Ok(())
    }

    #[test]
    fn exact_screens_skip_parent_prefix() -> Result<()> {
        let linker = Linker::new(LinkingConfig::new().with_screen(
            "Account",
            ScreenLinking::path("account")
                .with_screen("Login", ScreenLinking::path("login").exact())
                .with_screen("Orders", "orders"),
        ))?;
        let login = linker.state_from_path("/login").expect("match");
        assert_eq!(names(&child(&login.routes[0])), vec!["Login"]);
        assert!(linker.state_from_path("/account/login").is_none());
        let orders = linker.state_from_path("/account/orders").expect("match");
        assert_eq!(linker.path_from_partial(&orders), "/account/orders");
        assert_eq!(linker.path_from_partial(&login), "/login");
        Ok(())
    }

    #[test]
    fn query_params_land_on_the_leaf() -> Result<()> {
        let linker = Linker::new(LinkingConfig::new().with_screen(
            "Search",
            ScreenLinking::path("search").with_parse("page", |v| json!(v.parse::<i64>().unwrap_or(1))),
        ))?;
        let state = linker.state_from_path("/search?q=rust%20lang&page=3").expect("match");
        let params = state.routes[0].params.clone().unwrap_or_default();
        assert_eq!(params.get("q"), Some(&json!("rust lang")));
        assert_eq!(params.get("page"), Some(&json!(3)));
        assert_eq!(linker.path_from_partial(&state), "/search?page=3&q=rust%20lang");
        Ok(())
    }

    #[test]
    fn segments_become_screens_without_config() -> Result<()> {
        let linker = Linker::new(LinkingConfig::new())?;
        let state = linker.state_from_path("/Home/Profile?x=1").expect("match");
        assert_eq!(names(&state), vec!["Home"]);
        let inner = child(&state.routes[0]);
        assert_eq!(names(&inner), vec!["Profile"]);
        assert_eq!(inner.routes[0].params.as_ref().and_then(|p| p.get("x")), Some(&json!("1")));
        assert!(linker.state_from_path("/").is_none());
        assert_eq!(linker.path_from_partial(&state), "/Home/Profile?x=1");
        Ok(())
    }

    #[test]
    fn prefixes_are_stripped() -> Result<()> {
        let linker = Linker::new(
            LinkingConfig::new()
                .with_prefix("https://example.com")
                .with_screen("Profile", "people/:name"),
        )?;
        for url in ["https://example.com/people/ana", "myapp://people/ana", "/people/ana"] {
            let state = linker.state_from_url(url).expect(url);
            assert_eq!(state.routes[0].name, "Profile");
        }
        Ok(())
    }

    #[test]
    fn encoding_round_trips() -> Result<()> {
        let linker = Linker::new(LinkingConfig::new().with_screen("Tag", "tag/:name"))?;
        let state = linker.state_from_path("/tag/a%2Fb%20c").expect("match");
        assert_eq!(
            state.routes[0].params.as_ref().and_then(|p| p.get("name")),
            Some(&json!("a/b c"))
        );
        assert_eq!(linker.path_from_partial(&state), "/tag/a%2Fb%20c");
        Ok(())
    }

    #[test]
    fn duplicates_and_malformed_patterns_are_rejected() {
        let dup = LinkingConfig::new()
            .with_screen("A", "item/:id")
            .with_screen("B", "item/:key");
        assert!(matches!(Linker::new(dup), Err(Error::Config(_))));

        let nested_same = LinkingConfig::new().with_screen(
            "Root",
            ScreenLinking::path("").with_screen("Index", ""),
        );
        assert!(Linker::new(nested_same).is_ok());

        let bad = LinkingConfig::new().with_screen("A", "*/x");
        assert!(matches!(Linker::new(bad), Err(Error::Pattern(_))));
    }

    #[test]
    fn nested_screen_wins_on_equal_pattern() -> Result<()> {
        let linker = Linker::new(LinkingConfig::new().with_screen(
            "Root",
            ScreenLinking::path("").with_screen("Index", ""),
        ))?;
        let state = linker.state_from_path("/").expect("match");
        assert_eq!(names(&child(&state.routes[0])), vec!["Index"]);
        Ok(())
    }

    #[test]
    fn reset_when_levels_hold_history() -> Result<()> {
        let linker = Linker::new(tester_config())?;
        let state = PartialState::new(vec![PartialRoute::new("NoMatch"), PartialRoute::new("Home")]);
        assert!(matches!(linker.action_from_state(&state), Some(Action::Reset { .. })));
        assert!(linker.action_from_state(&PartialState::default()).is_none());
        Ok(())
    }

    #[test]
    fn validate_against_router() -> Result<()> {
        let screen = |n: &str| ScreenConfig::new(n, ComponentRef::new(n));
        let home = TabRouter::new(
            RouteConfigMap::new(vec![screen("Feed"), screen("Profile")])?,
            TabOptions::default(),
        )?;
        let root = StackRouter::new(
            RouteConfigMap::new(vec![screen("Home").with_navigator(Arc::new(home))])?,
            StackOptions::default(),
        )?;
        assert_eq!(
            Linker::new(tester_config())?.validate(&root),
            Err(Error::Config("linking config names unknown screens: NoMatch".into()))
        );

        let ok = LinkingConfig::new()
            .with_screen("Home", ScreenLinking::nested().with_screen("Profile", "user/:id"))
            .with_screen("Feed", "feed");
        assert!(Linker::new(ok)?.validate(&root).is_ok());
        Ok(())
    }
}
