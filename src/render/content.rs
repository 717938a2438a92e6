use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex_lite::{Captures, Regex};

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

fn conditional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?s)\{\{#if\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:(==|!=)\s*"([^"]*)"\s*)?\}\}(.*?)\{\{/if\}\}"#,
        )
        .expect("conditional regex is valid")
    })
}

/// Render a template file body: conditional blocks first, then `{{NAME}}` substitution.
pub fn render_content(text: &str, vars: &BTreeMap<String, String>) -> String {
    let expanded = apply_conditionals(text, vars);
    substitute(&expanded, vars)
}

/// Expand `{{#if NAME}}`, `{{#if NAME == "x"}}` and `{{#if NAME != "x"}}` blocks.
///
/// Blocks do not nest; each body ends at the first `{{/if}}`.
pub fn apply_conditionals(text: &str, vars: &BTreeMap<String, String>) -> String {
    conditional_re()
        .replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            let body = caps.get(4).map_or("", |m| m.as_str());
            let keep = match (vars.get(name), caps.get(2).map(|m| m.as_str())) {
                (None, _) => false,
                (Some(value), None) => is_truthy(value),
                (Some(value), Some("==")) => value == caps.get(3).map_or("", |m| m.as_str()),
                (Some(value), Some(_)) => value != caps.get(3).map_or("", |m| m.as_str()),
            };
            if keep {
                body.to_string()
            } else {
                String::new()
            }
        })
        .into_owned()
}

/// Replace every `{{NAME}}` that has a value. Unknown names are left as written.
pub fn substitute(text: &str, vars: &BTreeMap<String, String>) -> String {
    placeholder_re()
        .replace_all(text, |caps: &Captures| match vars.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Names referenced as `{{NAME}}`, in order of first appearance.
pub fn placeholder_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in placeholder_re().captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Names tested by `{{#if ...}}` blocks, in order of first appearance.
pub fn condition_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in conditional_re().captures_iter(text) {
        let name = &caps[1];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Placeholders left in already-rendered text because no value was known for them.
pub fn unresolved_placeholders(rendered: &str, vars: &BTreeMap<String, String>) -> Vec<String> {
    placeholder_names(rendered)
        .into_iter()
        .filter(|name| !vars.contains_key(name))
        .collect()
}

/// Empty, `false`, `0`, `no` and `none` (any case) are falsy.
pub fn is_truthy(value: &str) -> bool {
    !value.is_empty()
        && !matches!(
            value.to_ascii_lowercase().as_str(),
            "false" | "0" | "no" | "none"
        )
}
