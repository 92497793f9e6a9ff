/// Interpret a checkbox or query flag. Missing or blank values fall back to
/// `default`.
pub fn parse_flag(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(v) => {
            let t = v.trim().to_lowercase();
            if t.is_empty() {
                default
            } else {
                matches!(t.as_str(), "1" | "true" | "yes" | "on")
            }
        }
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::parse_flag;

    #[test]
    fn checkbox_values() {
        assert!(parse_flag(Some("on"), false));
        assert!(!parse_flag(Some("off"), true));
        assert!(parse_flag(Some(" "), true));
        assert!(!parse_flag(None, false));
    }
}
