/// Normalize API keys passed by users.
/// - Trims whitespace
/// - Strips surrounding ASCII or unicode quotes (" ' “ ” ‘ ’)
/// - Drops a pasted `Bearer ` prefix
pub fn normalize_api_key(raw: &str) -> String {
    let mut s = raw.trim().to_string();

    fn is_quote_char(c: char) -> bool {
        matches!(c, '"' | '\'' | '“' | '”' | '‘' | '’')
    }

    while s.starts_with(is_quote_char) && s.chars().count() > 1 {
        s.remove(0);
    }
    while s.ends_with(is_quote_char) && s.chars().count() > 1 {
        s.pop();
    }

    let s = s.trim();
    s.strip_prefix("Bearer ").unwrap_or(s).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::normalize_api_key;

    #[test]
    fn strips_quotes_and_prefix() {
        assert_eq!(normalize_api_key("  \"sk-abc\" "), "sk-abc");
        assert_eq!(normalize_api_key("“sk-abc”"), "sk-abc");
        assert_eq!(normalize_api_key("Bearer sk-abc"), "sk-abc");
        assert_eq!(normalize_api_key("sk-abc"), "sk-abc");
    }
}
