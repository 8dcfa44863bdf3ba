//! Key/value parameter serialization for query strings and form bodies.
//!
//! Keys and values are percent-encoded individually and joined as
//! `k=v&k=v`. Only flat string pairs are supported.

use crate::error::ParamsError;

/// Serialize key/value pairs into `k=v&k=v` form.
///
/// An empty input yields an empty string. Pair order follows the iterator.
pub fn serialize<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                encode_component(key.as_ref()),
                encode_component(value.as_ref())
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Marks that URI component encoding leaves as they are.
const UNESCAPED_MARKS: [(&str, &str); 5] = [
    ("%21", "!"),
    ("%27", "'"),
    ("%28", "("),
    ("%29", ")"),
    ("%2A", "*"),
];

/// Percent-encode one key or value. Everything except `A-Z a-z 0-9` and
/// `- _ . ! ~ * ' ( )` is escaped as UTF-8 bytes.
fn encode_component(component: &str) -> String {
    let mut encoded = urlencoding::encode(component).into_owned();
    // A literal '%' always becomes "%25", so these triples can only come
    // from the marks themselves.
    for (escaped, mark) in UNESCAPED_MARKS {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, mark);
        }
    }
    encoded
}

/// Decode a `k=v&k=v` string back into pairs.
///
/// Empty segments are skipped and a segment without `=` decodes to an empty
/// value.
pub fn deserialize(input: &str) -> Result<Vec<(String, String)>, ParamsError> {
    input
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            Ok((decode(key)?, decode(value)?))
        })
        .collect()
}

fn decode(part: &str) -> Result<String, ParamsError> {
    urlencoding::decode(part)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ParamsError::InvalidEncoding(part.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};

    use super::*;

    #[test]
    fn empty_mapping_serializes_to_empty_string() {
        let empty: BTreeMap<String, String> = BTreeMap::new();
        assert_eq!(serialize(&empty), "");
    }

    #[test]
    fn pairs_are_joined_with_ampersand() {
        let map = BTreeMap::from([("a", "1"), ("b", "x y")]);
        assert_eq!(serialize(&map), "a=1&b=x%20y");
    }

    #[test]
    fn reserved_characters_are_encoded() {
        let map = BTreeMap::from([("q&r", "a=b/c?d")]);
        assert_eq!(serialize(&map), "q%26r=a%3Db%2Fc%3Fd");
    }

    #[test]
    fn component_marks_are_left_unescaped() {
        let map = BTreeMap::from([("a", "it's (ok)!*")]);
        assert_eq!(serialize(&map), "a=it's%20(ok)!*");
        assert_eq!(
            deserialize("a=it's%20(ok)!*").unwrap(),
            vec![("a".to_string(), "it's (ok)!*".to_string())]
        );
    }

    #[test]
    fn escaped_percent_is_not_mistaken_for_a_mark() {
        let map = BTreeMap::from([("raw", "%21%2A")]);
        assert_eq!(serialize(&map), "raw=%2521%252A");
    }

    #[test]
    fn non_ascii_is_utf8_percent_encoded() {
        let map = BTreeMap::from([("name", "Zoë")]);
        assert_eq!(serialize(&map), "name=Zo%C3%AB");
    }

    #[test]
    fn round_trip_preserves_pairs() {
        let map: HashMap<String, String> = [
            ("plain", "value"),
            ("spaced key", "spaced value"),
            ("symbols", "&=?#%+"),
            ("unicode", "日本語"),
            ("empty", ""),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let decoded: HashMap<String, String> =
            deserialize(&serialize(&map)).unwrap().into_iter().collect();
        assert_eq!(decoded, map);
    }

    #[test]
    fn deserialize_empty_input() {
        assert!(deserialize("").unwrap().is_empty());
    }

    #[test]
    fn deserialize_segment_without_value() {
        let pairs = deserialize("flag&a=1").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("flag".to_string(), String::new()),
                ("a".to_string(), "1".to_string())
            ]
        );
    }

    #[test]
    fn deserialize_rejects_invalid_utf8() {
        let err = deserialize("a=%FF").unwrap_err();
        assert!(matches!(err, ParamsError::InvalidEncoding(_)));
    }
}
