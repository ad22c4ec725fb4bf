//! Locating a resource payload inside a decoded response body.
//!
//! Servers disagree on whether a collection is nested under `post` or
//! `posts`, so both keys are tried. A body that is not a mapping never
//! yields a payload.

use serde_json::{Map, Value};

use crate::types::ApiNamespace;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "news",
    "data",
];

const F_TO_VES: &[&str] = &["leaf", "life", "knife", "wife", "half", "wolf", "shelf", "calf"];

/// English plural of a (snake_case) resource key.
///
/// Only the last `_`-separated word is inflected, so `blog_post` becomes
/// `blog_posts`.
pub fn pluralize(key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    let (head, word) = match key.rfind('_') {
        Some(idx) => key.split_at(idx + 1),
        None => ("", key),
    };
    format!("{head}{}", pluralize_word(word))
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_ascii_lowercase();

    if UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == lower) {
        return with_leading_case(word, plural);
    }
    if F_TO_VES.contains(&lower.as_str()) {
        let stem = word.trim_end_matches('e').trim_end_matches('f');
        return format!("{stem}ves");
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    if let Some(stem) = lower.strip_suffix('y') {
        if stem.chars().last().is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{}ies", &word[..word.len() - 1]);
        }
    }
    format!("{word}s")
}

/// `plural` with the first letter cased like the first letter of `word`.
fn with_leading_case(word: &str, plural: &str) -> String {
    let mut chars = plural.chars();
    match (word.chars().next(), chars.next()) {
        (Some(lead), Some(first)) if lead.is_uppercase() => first.to_uppercase().chain(chars).collect(),
        _ => plural.to_string(),
    }
}

/// Mapping payload at `key`, falling back to its plural form.
pub fn resolve_object<'a>(tree: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    resolve_object_with(tree, key, None)
}

/// Sequence payload at `key`, falling back to its plural form.
pub fn resolve_array<'a>(tree: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    resolve_array_with(tree, key, None)
}

fn candidates(key: &str, plural: Option<&str>) -> [String; 2] {
    let plural = plural.map_or_else(|| pluralize(key), str::to_string);
    [key.to_string(), plural]
}

fn resolve_object_with<'a>(tree: &'a Value, key: &str, plural: Option<&str>) -> Option<&'a Map<String, Value>> {
    let map = tree.as_object()?;
    candidates(key, plural)
        .iter()
        .find_map(|k| map.get(k).and_then(Value::as_object))
}

fn resolve_array_with<'a>(tree: &'a Value, key: &str, plural: Option<&str>) -> Option<&'a Vec<Value>> {
    let map = tree.as_object()?;
    candidates(key, plural)
        .iter()
        .find_map(|k| map.get(k).and_then(Value::as_array))
}

/// Payload extracted from a body for a given namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Extracted {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

/// Extract the payload for `namespace` from `tree`. An object wins over an
/// array. Without a response key the whole tree is the payload.
pub fn extract(tree: &Value, namespace: &ApiNamespace) -> Option<Extracted> {
    match namespace.response_key() {
        Some(key) => {
            let plural = namespace.plural_override();
            if let Some(object) = resolve_object_with(tree, key, plural) {
                return Some(Extracted::Object(object.clone()));
            }
            resolve_array_with(tree, key, plural).map(|a| Extracted::Array(a.clone()))
        }
        None => match tree {
            Value::Object(map) => Some(Extracted::Object(map.clone())),
            Value::Array(items) => Some(Extracted::Array(items.clone())),
            _ => None,
        },
    }
}

/// Follow a dotted `path` (`"data.response"`) through nested mappings.
pub fn fetch_path<'a>(path: &str, tree: &'a Value) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(tree, |node, segment| node.as_object()?.get(segment))
}
