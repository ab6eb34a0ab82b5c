//! Environment resolution for configuration values
//!
//! Two mechanisms, both applied before the typed deserialize:
//!
//! - `${NAME}` / `${NAME:-default}` templates inside string leaves are
//!   replaced from the process environment.
//! - `SEMEM_*` variables override config values by dotted path, e.g.
//!   `SEMEM_STORAGE_TYPE=memory` sets `storage.type`.

use regex::Regex;
use std::sync::OnceLock;

fn template_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        #[allow(clippy::expect_used)]
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid template regex")
    })
}

/// Substitute `${NAME}` and `${NAME:-default}` templates in a single string.
///
/// Unset variables without a default are replaced with the empty string and
/// logged; a set variable always wins over its default.
#[must_use]
pub fn substitute_str(input: &str) -> String {
    template_regex()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match std::env::var(name) {
                Ok(value) => value,
                Err(_) => {
                    if let Some(default) = caps.get(2) {
                        default.as_str().to_string()
                    } else {
                        tracing::warn!("config references unset environment variable {}", name);
                        String::new()
                    }
                }
            }
        })
        .into_owned()
}

/// Walk all string leaves of a TOML value, applying template substitution.
pub fn substitute_value(value: &mut toml::Value) {
    match value {
        toml::Value::String(s) => {
            if s.contains("${") {
                *s = substitute_str(s);
            }
        }
        toml::Value::Array(items) => {
            for item in items {
                substitute_value(item);
            }
        }
        toml::Value::Table(table) => {
            for (_, item) in table.iter_mut() {
                substitute_value(item);
            }
        }
        _ => {}
    }
}

/// Apply `SEMEM_*` environment overrides onto a TOML value by dotted path.
///
/// `SEMEM_STORAGE_TYPE` maps to `storage.type`. Because config keys may
/// themselves contain underscores, path resolution greedily matches the
/// longest existing key at each table level before splitting further.
pub fn apply_overrides(root: &mut toml::Value, prefix: &str) {
    let mut overrides: Vec<(String, String)> = std::env::vars()
        .filter_map(|(name, value)| {
            name.strip_prefix(prefix)
                .map(|rest| (rest.to_lowercase(), value))
        })
        .collect();
    overrides.sort();

    for (path, raw) in overrides {
        let segments: Vec<&str> = path.split('_').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }
        if set_path(root, &segments, &raw) {
            tracing::debug!("applied environment override for {}", path);
        } else {
            tracing::warn!("could not apply environment override for {}", path);
        }
    }
}

/// Parse an override string into the closest-fitting TOML value.
fn parse_override(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        return toml::Value::Boolean(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
        return toml::Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return toml::Value::Float(f);
    }
    toml::Value::String(raw.to_string())
}

fn set_path(value: &mut toml::Value, segments: &[&str], raw: &str) -> bool {
    let Some(table) = value.as_table_mut() else {
        return false;
    };

    // Longest existing key first: "similarity_threshold" beats "similarity".
    for take in (1..=segments.len()).rev() {
        let candidate = segments[..take].join("_");
        if table.contains_key(&candidate) {
            if take == segments.len() {
                table.insert(candidate, parse_override(raw));
                return true;
            }
            if let Some(inner) = table.get_mut(&candidate) {
                return set_path(inner, &segments[take..], raw);
            }
        }
    }

    // No existing key: a single remaining segment is inserted as-is,
    // otherwise the first segment becomes a new table.
    if segments.len() == 1 {
        table.insert(segments[0].to_string(), parse_override(raw));
        return true;
    }
    let entry = table
        .entry(segments[0].to_string())
        .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    set_path(entry, &segments[1..], raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_substitutes_set_variable_and_unset_default() {
        std::env::set_var("SEMEM_TEST_HOST", "h");
        std::env::remove_var("SEMEM_TEST_PORT");

        let resolved = substitute_str("http://${SEMEM_TEST_HOST:-x}:${SEMEM_TEST_PORT:-1}");
        assert_eq!(resolved, "http://h:1");

        std::env::remove_var("SEMEM_TEST_HOST");
    }

    #[test]
    #[serial]
    fn test_unset_without_default_becomes_empty() {
        std::env::remove_var("SEMEM_TEST_MISSING");
        assert_eq!(substitute_str("key=${SEMEM_TEST_MISSING}"), "key=");
    }

    #[test]
    #[serial]
    fn test_substitute_value_walks_nested_tables() {
        std::env::set_var("SEMEM_TEST_USER", "admin");
        let mut value: toml::Value = toml::from_str(
            r#"
            [storage.options]
            user = "${SEMEM_TEST_USER}"
            password = "${SEMEM_TEST_NOPE:-secret}"
            "#,
        )
        .unwrap();

        substitute_value(&mut value);

        let options = &value["storage"]["options"];
        assert_eq!(options["user"].as_str(), Some("admin"));
        assert_eq!(options["password"].as_str(), Some("secret"));
        std::env::remove_var("SEMEM_TEST_USER");
    }

    #[test]
    fn test_set_path_prefers_longest_existing_key() {
        let mut value: toml::Value = toml::from_str(
            r#"
            [memory]
            similarity_threshold = 0.4
            "#,
        )
        .unwrap();

        assert!(set_path(
            &mut value,
            &["memory", "similarity", "threshold"],
            "0.7"
        ));
        assert_eq!(value["memory"]["similarity_threshold"].as_float(), Some(0.7));
    }

    #[test]
    fn test_set_path_creates_missing_tables() {
        let mut value = toml::Value::Table(toml::map::Map::new());
        assert!(set_path(&mut value, &["storage", "type"], "memory"));
        assert_eq!(value["storage"]["type"].as_str(), Some("memory"));
    }

    #[test]
    fn test_parse_override_types() {
        assert_eq!(parse_override("true"), toml::Value::Boolean(true));
        assert_eq!(parse_override("42"), toml::Value::Integer(42));
        assert_eq!(parse_override("0.5"), toml::Value::Float(0.5));
        assert_eq!(
            parse_override("memory"),
            toml::Value::String("memory".to_string())
        );
    }
}
