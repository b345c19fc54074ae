//! Embed template rendering (§4.4.1).
//!
//! Grounded in `original_source/core/feeds_rss.py::_render_template`: a safe
//! `defaultdict(str)`-backed `format_map` over every entry field plus the
//! reserved `link`/`thumbnail`/`published_custom` keys. [`EmbedValue`] (§3) is
//! the typed, serializable equivalent of the source's free-form `dict` template
//! tree; `render` walks it the same way `_fmt` recurses over `dict`/`str`/other.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use syncd_core::models::EmbedValue;

/// Render every string leaf of `template` against `fields`, a flat map from
/// placeholder name to its substituted value. Unknown placeholders resolve to
/// the empty string (never an error) — the same behavior as the source's
/// `defaultdict(str)`.
#[must_use]
pub fn render(template: &EmbedValue, fields: &BTreeMap<String, String>) -> EmbedValue {
    match template {
        EmbedValue::String(s) => EmbedValue::String(format_placeholders(s, fields)),
        EmbedValue::Map(map) => EmbedValue::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), render(v, fields)))
                .collect(),
        ),
        EmbedValue::List(items) => EmbedValue::List(items.iter().map(|v| render(v, fields)).collect()),
        other @ (EmbedValue::Number(_) | EmbedValue::Bool(_) | EmbedValue::Null) => other.clone(),
    }
}

/// Drop null and empty-string leaves from a rendered tree (§4.4.1 "the tree is
/// cleaned"). Empty lists/maps left behind by cleaning are kept as-is; only
/// leaves are pruned.
#[must_use]
pub fn clean(value: EmbedValue) -> EmbedValue {
    match value {
        EmbedValue::Map(map) => EmbedValue::Map(
            map.into_iter()
                .filter_map(|(k, v)| {
                    let cleaned = clean(v);
                    if is_empty_leaf(&cleaned) {
                        None
                    } else {
                        Some((k, cleaned))
                    }
                })
                .collect(),
        ),
        EmbedValue::List(items) => EmbedValue::List(
            items
                .into_iter()
                .map(clean)
                .filter(|v| !is_empty_leaf(v))
                .collect(),
        ),
        other => other,
    }
}

fn is_empty_leaf(value: &EmbedValue) -> bool {
    matches!(value, EmbedValue::Null) || matches!(value, EmbedValue::String(s) if s.is_empty())
}

/// Build the flat placeholder map: every raw entry field, plus the three
/// reserved keys the source always injects (`link`, `thumbnail`,
/// `published_custom`).
#[must_use]
pub fn build_fields(
    entry_fields: &BTreeMap<String, String>,
    link: &str,
    thumbnail: Option<&str>,
    published: DateTime<Utc>,
    guild_tz: &Tz,
) -> BTreeMap<String, String> {
    let mut fields = entry_fields.clone();
    fields.insert("link".to_string(), link.to_string());
    fields.insert("thumbnail".to_string(), thumbnail.unwrap_or_default().to_string());
    fields.insert(
        "published_custom".to_string(),
        published.with_timezone(guild_tz).format("%d.%m.%Y %H:%M").to_string(),
    );
    fields
}

/// The specialized template a Bluesky feed URL renders through instead of its own
/// `embed_template` (§4.4.1): a static title naming the author, the post text as
/// body, and the same reserved placeholders every other feed exposes.
#[must_use]
pub fn bluesky_embed_template(accent_color: Option<i32>, footer_name: &str) -> EmbedValue {
    let mut map = BTreeMap::new();
    map.insert("title".to_string(), EmbedValue::String("{author} just posted on Bluesky".to_string()));
    map.insert("description".to_string(), EmbedValue::String("{summary}".to_string()));
    map.insert("url".to_string(), EmbedValue::String("{link}".to_string()));
    if let Some(color) = accent_color {
        map.insert("color".to_string(), EmbedValue::Number(f64::from(color)));
    }
    map.insert("timestamp".to_string(), EmbedValue::String("{published_custom}".to_string()));

    let mut footer = BTreeMap::new();
    footer.insert("text".to_string(), EmbedValue::String(footer_name.to_string()));
    map.insert("footer".to_string(), EmbedValue::Map(footer));

    let mut image = BTreeMap::new();
    image.insert("url".to_string(), EmbedValue::String("{thumbnail}".to_string()));
    map.insert("image".to_string(), EmbedValue::Map(image));

    EmbedValue::Map(map)
}

/// `{name}`-style substitution over `template`, resolving unknown keys to the
/// empty string. Braces with no matching close, or an empty name, are copied
/// through verbatim rather than treated as an error.
fn format_placeholders(template: &str, fields: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if c != '{' {
            out.push(c);
            continue;
        }
        if let Some(end) = template[i + 1..].find('}') {
            let name = &template[i + 1..i + 1 + end];
            if name.is_empty() || name.contains(['{', '}']) {
                out.push('{');
                continue;
            }
            out.push_str(fields.get(name).map_or("", String::as_str));
            for _ in 0..=end {
                chars.next();
            }
        } else {
            out.push('{');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> BTreeMap<String, String> {
        let mut m = BTreeMap::new();
        m.insert("title".to_string(), "Hello".to_string());
        m
    }

    #[test]
    fn substitutes_known_placeholder() {
        assert_eq!(format_placeholders("{title} world", &fields()), "Hello world");
    }

    #[test]
    fn unknown_placeholder_resolves_to_empty() {
        assert_eq!(format_placeholders("{missing}!", &fields()), "!");
    }

    #[test]
    fn unmatched_brace_is_left_alone() {
        assert_eq!(format_placeholders("a { b", &fields()), "a { b");
    }

    #[test]
    fn clean_drops_null_and_empty_string_leaves() {
        let mut map = BTreeMap::new();
        map.insert("a".to_string(), EmbedValue::String(String::new()));
        map.insert("b".to_string(), EmbedValue::Null);
        map.insert("c".to_string(), EmbedValue::String("kept".to_string()));
        let cleaned = clean(EmbedValue::Map(map));
        match cleaned {
            EmbedValue::Map(m) => {
                assert_eq!(m.len(), 1);
                assert!(m.contains_key("c"));
            }
            _ => panic!("expected map"),
        }
    }

    #[test]
    fn render_recurses_into_nested_maps_and_lists() {
        let mut inner = BTreeMap::new();
        inner.insert("x".to_string(), EmbedValue::String("{title}".to_string()));
        let template = EmbedValue::List(vec![EmbedValue::Map(inner)]);
        let rendered = render(&template, &fields());
        match rendered {
            EmbedValue::List(items) => match &items[0] {
                EmbedValue::Map(m) => assert_eq!(m["x"], EmbedValue::String("Hello".to_string())),
                _ => panic!("expected map"),
            },
            _ => panic!("expected list"),
        }
    }
}
