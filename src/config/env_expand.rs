//! Recursive `${VAR}` environment-variable expansion over a deserialized YAML
//! value, run once before typed deserialization. Unresolved variables are
//! left in place (e.g. `${BASE_URL}`) so `Config::validate` can detect and
//! reject them where they are required.

use regex::Regex;
use std::sync::OnceLock;

fn var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap())
}

fn expand_str(value: &str) -> String {
    var_pattern()
        .replace_all(value, |caps: &regex::Captures| {
            let name = &caps[1];
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Walks a `serde_yaml::Value` in place, expanding `${VAR}` in every string leaf.
pub fn expand_env(value: &mut serde_yaml::Value) {
    match value {
        serde_yaml::Value::String(s) => {
            *s = expand_str(s);
        }
        serde_yaml::Value::Sequence(seq) => {
            for item in seq {
                expand_env(item);
            }
        }
        serde_yaml::Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                expand_env(v);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_variable() {
        unsafe {
            std::env::set_var("RD_ENV_EXPAND_TEST", "value123");
        }
        let mut value: serde_yaml::Value = serde_yaml::from_str("key: ${RD_ENV_EXPAND_TEST}").unwrap();
        expand_env(&mut value);
        assert_eq!(value["key"].as_str().unwrap(), "value123");
    }

    #[test]
    fn leaves_unknown_variable_untouched() {
        let mut value: serde_yaml::Value = serde_yaml::from_str("key: ${RD_TOTALLY_UNSET_VAR}").unwrap();
        expand_env(&mut value);
        assert_eq!(value["key"].as_str().unwrap(), "${RD_TOTALLY_UNSET_VAR}");
    }

    #[test]
    fn expands_nested_structures() {
        let mut value: serde_yaml::Value =
            serde_yaml::from_str("list:\n  - a: ${RD_ENV_EXPAND_TEST}\n").unwrap();
        expand_env(&mut value);
        assert_eq!(value["list"][0]["a"].as_str().unwrap(), "value123");
    }
}
