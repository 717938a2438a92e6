use serde::Deserialize;

use super::MergeFormat;
use crate::error::{Result, StampError};

fn parse_error(path: &str, format: MergeFormat, message: impl Into<String>) -> StampError {
    StampError::MergeParse {
        path: path.to_string(),
        format: format.name().to_string(),
        message: message.into(),
    }
}

/// Deep merge two JSON objects. Incoming values win; nested objects merge recursively.
pub fn merge_json(path: &str, existing: &[u8], incoming: &[u8]) -> Result<Vec<u8>> {
    let mut base = parse_json_object(path, existing, "existing")?;
    let overlay = parse_json_object(path, incoming, "incoming")?;
    deep_merge_json(&mut base, overlay);

    let mut out = serde_json::to_vec_pretty(&serde_json::Value::Object(base))
        .map_err(|e| parse_error(path, MergeFormat::Json, e.to_string()))?;
    out.push(b'\n');
    Ok(out)
}

fn parse_json_object(
    path: &str,
    bytes: &[u8],
    side: &str,
) -> Result<serde_json::Map<String, serde_json::Value>> {
    match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(parse_error(
            path,
            MergeFormat::Json,
            format!("{side} content is not an object at the top level"),
        )),
        Err(e) => Err(parse_error(
            path,
            MergeFormat::Json,
            format!("{side} content: {e}"),
        )),
    }
}

pub fn deep_merge_json(
    base: &mut serde_json::Map<String, serde_json::Value>,
    overlay: serde_json::Map<String, serde_json::Value>,
) {
    for (key, incoming) in overlay {
        match incoming {
            serde_json::Value::Object(incoming) => match base.get_mut(&key) {
                Some(serde_json::Value::Object(existing)) => deep_merge_json(existing, incoming),
                _ => {
                    base.insert(key, serde_json::Value::Object(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

/// Deep merge the first YAML document of each side. Later documents are dropped.
pub fn merge_yaml(path: &str, existing: &[u8], incoming: &[u8]) -> Result<Vec<u8>> {
    let mut base = parse_yaml_mapping(path, existing, "existing")?;
    let overlay = parse_yaml_mapping(path, incoming, "incoming")?;
    deep_merge_yaml(&mut base, overlay);

    let out = serde_yaml::to_string(&serde_yaml::Value::Mapping(base))
        .map_err(|e| parse_error(path, MergeFormat::Yaml, e.to_string()))?;
    Ok(out.into_bytes())
}

fn parse_yaml_mapping(path: &str, bytes: &[u8], side: &str) -> Result<serde_yaml::Mapping> {
    let first = serde_yaml::Deserializer::from_slice(bytes)
        .next()
        .ok_or_else(|| {
            parse_error(
                path,
                MergeFormat::Yaml,
                format!("{side} content has no YAML document"),
            )
        })?;

    match serde_yaml::Value::deserialize(first) {
        Ok(serde_yaml::Value::Mapping(map)) => Ok(map),
        Ok(_) => Err(parse_error(
            path,
            MergeFormat::Yaml,
            format!("{side} content is not a mapping at the top level"),
        )),
        Err(e) => Err(parse_error(
            path,
            MergeFormat::Yaml,
            format!("{side} content: {e}"),
        )),
    }
}

pub fn deep_merge_yaml(base: &mut serde_yaml::Mapping, overlay: serde_yaml::Mapping) {
    for (key, incoming) in overlay {
        match incoming {
            serde_yaml::Value::Mapping(incoming) => match base.get_mut(&key) {
                Some(serde_yaml::Value::Mapping(existing)) => deep_merge_yaml(existing, incoming),
                _ => {
                    base.insert(key, serde_yaml::Value::Mapping(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn json_merge(existing: &str, incoming: &str) -> Result<serde_json::Value> {
        let bytes = merge_json("settings.json", existing.as_bytes(), incoming.as_bytes())?;
        Ok(serde_json::from_slice(&bytes).unwrap())
    }

    fn yaml_merge(existing: &str, incoming: &str) -> Result<serde_yaml::Value> {
        let bytes = merge_yaml("ci.yml", existing.as_bytes(), incoming.as_bytes())?;
        Ok(serde_yaml::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_json_deep_merge() {
        let merged = json_merge(r#"{"a":1,"b":{"c":1}}"#, r#"{"b":{"c":2,"d":3}}"#).unwrap();
        assert_eq!(merged, json!({"a": 1, "b": {"c": 2, "d": 3}}));
    }

    #[test]
    fn test_json_arrays_are_replaced() {
        let merged = json_merge(r#"{"files":["a","b"]}"#, r#"{"files":["c"]}"#).unwrap();
        assert_eq!(merged, json!({"files": ["c"]}));
    }

    #[test]
    fn test_json_object_replaces_scalar_and_back() {
        let merged = json_merge(r#"{"x":1,"y":{"z":1}}"#, r#"{"x":{"k":true},"y":0}"#).unwrap();
        assert_eq!(merged, json!({"x": {"k": true}, "y": 0}));
    }

    #[test]
    fn test_json_keeps_existing_key_order() {
        let bytes = merge_json("p.json", br#"{"z":1,"a":2}"#, br#"{"m":3}"#).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let z = text.find("\"z\"").unwrap();
        let a = text.find("\"a\"").unwrap();
        let m = text.find("\"m\"").unwrap();
        assert!(z < a && a < m, "{text}");
        assert!(text.ends_with("}\n"));
    }

    #[test]
    fn test_json_non_object_top_level_is_rejected() {
        assert!(matches!(
            json_merge("[1,2]", "{}"),
            Err(StampError::MergeParse { .. })
        ));
        assert!(matches!(
            json_merge("{}", "\"text\""),
            Err(StampError::MergeParse { .. })
        ));
    }

    #[test]
    fn test_json_syntax_error_is_rejected() {
        assert!(matches!(
            json_merge("{\"a\":", "{}"),
            Err(StampError::MergeParse { .. })
        ));
    }

    #[test]
    fn test_yaml_deep_merge() {
        let merged = yaml_merge(
            "name: ci\non:\n  push:\n    branches: [main]\njobs:\n  test: {}\n",
            "on:\n  pull_request: {}\njobs:\n  lint:\n    runs-on: ubuntu-latest\n",
        )
        .unwrap();
        let expected: serde_yaml::Value = serde_yaml::from_str(
            "name: ci\non:\n  push:\n    branches: [main]\n  pull_request: {}\njobs:\n  test: {}\n  lint:\n    runs-on: ubuntu-latest\n",
        )
        .unwrap();
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_yaml_only_first_document_is_used() {
        let merged = yaml_merge("a: 1\n---\nb: 2\n", "c: 3\n---\nd: 4\n").unwrap();
        let expected: serde_yaml::Value = serde_yaml::from_str("a: 1\nc: 3\n").unwrap();
        assert_eq!(merged, expected);
    }

    #[test]
    fn test_yaml_non_mapping_is_rejected() {
        assert!(matches!(
            yaml_merge("- a\n- b\n", "c: 1\n"),
            Err(StampError::MergeParse { .. })
        ));
    }

    #[test]
    fn test_yaml_empty_document_is_rejected() {
        assert!(matches!(
            yaml_merge("", "c: 1\n"),
            Err(StampError::MergeParse { .. })
        ));
    }
}
