//! `application/x-www-form-urlencoded` body decoding.
//!
//! PUT requests carry their payload as form fields (`data`, `expiration`).
//! Decoding is lenient: an invalid percent escape is passed through
//! literally instead of failing the whole body.

/// Splits a form body into decoded name/value pairs, in arrival order.
pub fn parse(body: &[u8]) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(body);
    let mut fields = Vec::new();
    for pair in text.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        fields.push((decode(name), decode(value)));
    }
    fields
}

/// First value for `name`, if the field is present.
pub fn value<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
}

fn decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                (Some(hi), Some(lo)) => {
                    out.push(hi << 4 | lo);
                    i += 3;
                }
                _ => {
                    out.push(b'%');
                    i += 1;
                }
            },
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_fields() {
        let fields = parse(b"data=hello&expiration=2h30m");
        assert_eq!(value(&fields, "data"), Some("hello"));
        assert_eq!(value(&fields, "expiration"), Some("2h30m"));
        assert_eq!(value(&fields, "missing"), None);
    }

    #[test]
    fn test_percent_and_plus_decoding() {
        let fields = parse(b"data=%7B%22name%22%3A+%22Alice%22%7D");
        assert_eq!(value(&fields, "data"), Some(r#"{"name": "Alice"}"#));
    }

    #[test]
    fn test_invalid_escape_passes_through() {
        let fields = parse(b"data=100%zz&tail=50%");
        assert_eq!(value(&fields, "data"), Some("100%zz"));
        assert_eq!(value(&fields, "tail"), Some("50%"));
    }

    #[test]
    fn test_field_without_value() {
        let fields = parse(b"flag&data=x");
        assert_eq!(value(&fields, "flag"), Some(""));
        assert_eq!(value(&fields, "data"), Some("x"));
    }

    #[test]
    fn test_first_value_wins_on_duplicates() {
        let fields = parse(b"data=first&data=second");
        assert_eq!(value(&fields, "data"), Some("first"));
    }

    #[test]
    fn test_empty_body() {
        assert!(parse(b"").is_empty());
    }
}
