use std::collections::HashMap;

/// Decode an `application/x-www-form-urlencoded` body. Repeated keys keep
/// every value in submission order, which multi-select fields rely on.
pub fn parse_urlencoded_body(body: &axum::body::Bytes) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let raw = String::from_utf8_lossy(body);
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let key = decode_component(parts.next().unwrap_or(""));
        let val = decode_component(parts.next().unwrap_or(""));
        map.entry(key).or_default().push(val);
    }
    map
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|c| c.into_owned())
        .unwrap_or(spaced)
}

/// First submitted value for `key`, or an empty string.
pub fn form_value<'a>(form: &'a HashMap<String, Vec<String>>, key: &str) -> &'a str {
    form.get(key)
        .and_then(|v| v.first())
        .map(String::as_str)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;

    #[test]
    fn repeated_keys_are_collected() {
        let form = parse_urlencoded_body(&Bytes::from_static(b"role_r1=u1&role_r1=u2&name=Lab+One"));
        assert_eq!(form["role_r1"], vec!["u1".to_string(), "u2".to_string()]);
        assert_eq!(form_value(&form, "name"), "Lab One");
        assert_eq!(form_value(&form, "missing"), "");
    }

    #[test]
    fn percent_escapes_are_decoded() {
        let form = parse_urlencoded_body(&Bytes::from_static(b"description=a%2Bb%20c"));
        assert_eq!(form_value(&form, "description"), "a+b c");
    }
}
