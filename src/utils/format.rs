use console::style;

pub fn success(msg: &str) -> String { style(msg).green().to_string() }
pub fn warn(msg: &str) -> String { style(msg).yellow().to_string() }
pub fn error(msg: &str) -> String { style(msg).red().to_string() }

/// Mask all but the last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}

#[cfg(test)]
mod tests {
    use super::mask_secret;

    #[test]
    fn masks_all_but_tail() {
        assert_eq!(mask_secret("sk-123456"), "*****3456");
        assert_eq!(mask_secret("abc"), "***");
    }
}
