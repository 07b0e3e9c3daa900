//! Human-readable dumps of a navigation tree.

use std::io::Write;

use serde_json::Value;
use termcolor::{Buffer, Color, ColorSpec, WriteColor};

use crate::{
    Result,
    state::{HistoryEntry, NavigationState, NestedState, Route},
};

/// Render a navigation state tree for display: one line per navigator and
/// per route, nested navigators indented beneath their route, focused routes
/// marked with `>`. This is a debug function.
pub fn dump(state: &NavigationState) -> Result<String> {
    let mut buffer = Buffer::ansi();
    dump_state(&mut buffer, state, 0)?;
    Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
}

/// Like [`dump`], without color codes.
pub fn dump_plain(state: &NavigationState) -> Result<String> {
    let mut buffer = Buffer::no_color();
    dump_state(&mut buffer, state, 0)?;
    Ok(String::from_utf8_lossy(buffer.as_slice()).into_owned())
}

/// Write `text` in a color, then reset.
fn colored(buffer: &mut Buffer, spec: &ColorSpec, text: &str) -> Result<()> {
    buffer.set_color(spec)?;
    write!(buffer, "{text}")?;
    buffer.reset()?;
    Ok(())
}

/// Write one navigator level and everything below it.
fn dump_state(buffer: &mut Buffer, state: &NavigationState, level: usize) -> Result<()> {
    let indent = "    ".repeat(level);
    write!(buffer, "{indent}")?;
    colored(
        buffer,
        ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true),
        &state.kind.to_string(),
    )?;
    write!(buffer, " {}", state.key)?;
    if state.history.contains(&HistoryEntry::Drawer) {
        colored(buffer, ColorSpec::new().set_fg(Some(Color::Yellow)), " (drawer open)")?;
    }
    writeln!(buffer)?;

    for (i, route) in state.routes.iter().enumerate() {
        dump_route(buffer, route, &indent, i == state.index)?;
        match &route.state {
            Some(NestedState::Full(child)) => dump_state(buffer, child, level + 1)?,
            Some(NestedState::Partial(_)) => {
                write!(buffer, "{indent}    ")?;
                colored(buffer, ColorSpec::new().set_fg(Some(Color::Yellow)), "(lazy)")?;
                writeln!(buffer)?;
            }
            None => {}
        }
    }
    Ok(())
}

/// Write a single route line.
fn dump_route(buffer: &mut Buffer, route: &Route, indent: &str, focused: bool) -> Result<()> {
    write!(buffer, "{indent}  {} ", if focused { ">" } else { " " })?;
    let mut spec = ColorSpec::new();
    spec.set_fg(Some(Color::Green)).set_bold(focused);
    colored(buffer, &spec, &route.name)?;
    write!(buffer, " {}", route.key)?;
    if let Some(params) = &route.params {
        write!(buffer, " {}", Value::Object(params.clone()))?;
    }
    writeln!(buffer)?;
    Ok(())
}
