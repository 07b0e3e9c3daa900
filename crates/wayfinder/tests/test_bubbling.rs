//! Integration tests for actions travelling through nested navigators.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use wayfinder::{
        Action, ComponentRef, NavigationContainer, NavigationState, Params, PartialRoute,
        PartialState, RouteConfigMap, Router, ScreenConfig, StackOptions, StackRouter, TabOptions, TabRouter,
        error::{Error, Result},
        tree,
    };

    fn screen(n: &str) -> ScreenConfig {
        ScreenConfig::new(n, ComponentRef::new(n))
    }

    /// Stack [Main: Tabs [Feed: Stack [List, Detail], Search], Modal].
    fn app() -> Result<Arc<dyn Router>> {
        let feed = StackRouter::new(
            RouteConfigMap::new(vec![screen("List"), screen("Detail")])?,
            StackOptions::default(),
        )?;
        let tabs = TabRouter::new(
            RouteConfigMap::new(vec![
                screen("Feed").with_navigator(Arc::new(feed)),
                screen("Search"),
            ])?,
            TabOptions::default(),
        )?;
        let root = StackRouter::new(
            RouteConfigMap::new(vec![
                screen("Main").with_navigator(Arc::new(tabs)),
                screen("Modal"),
            ])?,
            StackOptions::default(),
        )?;
        Ok(Arc::new(root))
    }

    fn path(c: &NavigationContainer) -> Vec<String> {
        c.focused_route_path().into_iter().map(|(n, _)| n).collect()
    }

    fn feed_stack(state: &NavigationState) -> Arc<NavigationState> {
        let tabs = state.routes[0].full_state().expect("tabs materialized");
        Arc::clone(tabs.routes[0].full_state().expect("feed materialized"))
    }

    #[test]
    fn deepest_navigator_wins() -> Result<()> {
        let mut c = NavigationContainer::new(app()?);
        assert_eq!(path(&c), vec!["Main", "Feed", "List"]);

        assert!(c.dispatch(Action::navigate("Detail"))?);
        assert_eq!(path(&c), vec!["Main", "Feed", "Detail"]);
        assert_eq!(c.state().routes.len(), 1);

        // The nested stack pops first.
        assert!(c.dispatch(Action::go_back())?);
        assert_eq!(path(&c), vec!["Main", "Feed", "List"]);

        // Nobody can go further back.
        let before = Arc::clone(c.state());
        assert!(!c.dispatch(Action::go_back())?);
        assert!(Arc::ptr_eq(&before, c.state()));
        Ok(())
    }

    #[test]
    fn falls_back_to_the_parent() -> Result<()> {
        let mut c = NavigationContainer::new(app()?);
        assert!(c.dispatch(Action::navigate("Detail"))?);
        assert!(c.dispatch(Action::navigate("Modal"))?);
        assert_eq!(path(&c), vec!["Modal"]);
        let main = Arc::clone(&c.state().routes[0]);

        assert!(c.dispatch(Action::go_back())?);
        assert_eq!(path(&c), vec!["Main", "Feed", "Detail"]);
        assert!(Arc::ptr_eq(&main, &c.state().routes[0]));
        Ok(())
    }

    #[test]
    fn navigate_into_a_lazy_tab() -> Result<()> {
        let mut c = NavigationContainer::new(app()?);
        assert!(c.dispatch(Action::jump_to("Search"))?);
        let list = Arc::clone(&feed_stack(c.state()).routes[0]);

        // Navigating to a screen of the unfocused tab focuses it and pushes.
        assert!(c.dispatch(Action::navigate("Detail"))?);
        assert_eq!(path(&c), vec!["Main", "Feed", "Detail"]);
        assert!(Arc::ptr_eq(&list, &feed_stack(c.state()).routes[0]));
        Ok(())
    }

    #[test]
    fn single_route_stack_pops_its_parent() -> Result<()> {
        let inner = StackRouter::new(
            RouteConfigMap::new(vec![screen("A"), screen("B")])?,
            StackOptions::default(),
        )?;
        let root = StackRouter::new(
            RouteConfigMap::new(vec![
                screen("Home").with_navigator(Arc::new(inner)),
                screen("Other"),
            ])?,
            StackOptions::default(),
        )?;
        let mut c = NavigationContainer::new(Arc::new(root));
        assert!(c.dispatch(Action::navigate("Other"))?);
        assert!(c.dispatch(Action::push("Home", None))?);
        assert_eq!(path(&c), vec!["Home", "A"]);
        assert_eq!(c.state().routes.len(), 3);
        let first = Arc::clone(&c.state().routes[0]);

        // The nested stack holds one route, so the root pops instead.
        assert!(c.dispatch(Action::go_back())?);
        assert_eq!(c.state().routes.len(), 2);
        assert_eq!(path(&c), vec!["Other"]);
        assert!(Arc::ptr_eq(&first, &c.state().routes[0]));
        Ok(())
    }

    #[test]
    fn set_params_reaches_a_background_tab() -> Result<()> {
        let mut c = NavigationContainer::new(app()?);
        let list_key = feed_stack(c.state()).routes[0].key.clone();
        assert!(c.dispatch(Action::jump_to("Search"))?);
        let tabs_before = Arc::clone(c.state().routes[0].full_state().expect("tabs"));

        let mut p = Params::new();
        p.insert("loaded".into(), serde_json::json!(true));
        let mut nav = c.navigation(&list_key).expect("list is mounted");
        assert!(nav.set_params(p)?);

        let (_, list) = tree::find_route(c.state(), &list_key).expect("list survives");
        assert_eq!(list.param("loaded"), Some(&serde_json::json!(true)));
        assert_eq!(path(&c), vec!["Main", "Search"]);
        let tabs = c.state().routes[0].full_state().expect("tabs");
        assert_eq!(tabs.index, tabs_before.index);
        assert!(Arc::ptr_eq(&tabs.routes[1], &tabs_before.routes[1]));
        Ok(())
    }

    #[test]
    fn keyed_go_back_reaches_its_navigator() -> Result<()> {
        let mut c = NavigationContainer::new(app()?);
        assert!(c.dispatch(Action::navigate("Detail"))?);
        let detail = tree::focused_leaf(c.state()).map(|r| r.key.clone()).unwrap_or_default();
        assert!(c.dispatch(Action::go_back_from(detail.clone()))?);
        assert!(tree::find_route(c.state(), &detail).is_none());
        assert!(!c.dispatch(Action::go_back_from("missing"))?);
        Ok(())
    }

    #[test]
    fn targeted_reset() -> Result<()> {
        let mut c = NavigationContainer::new(app()?);
        let feed_key = feed_stack(c.state()).key.clone();
        let reset = PartialState::new(vec![PartialRoute::new("List"), PartialRoute::new("Detail")]);
        assert!(c.dispatch(Action::Reset {
            state: reset.into(),
            target: Some(feed_key.clone()),
        })?);
        let feed = feed_stack(c.state());
        assert_eq!(feed.key, feed_key);
        assert_eq!(feed.routes.len(), 2);
        assert_eq!(path(&c), vec!["Main", "Feed", "Detail"]);
        Ok(())
    }

    #[test]
    fn unknown_screens_are_errors() -> Result<()> {
        let mut c = NavigationContainer::new(app()?);
        assert_eq!(
            c.dispatch(Action::navigate("Nowhere")),
            Err(Error::UnknownRoute("Nowhere".into()))
        );
        assert_eq!(path(&c), vec!["Main", "Feed", "List"]);
        Ok(())
    }
}
