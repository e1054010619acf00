// Output formatting: terminal display of clusters and stored runs.

pub mod terminal;

/// Cut `text` to `max_chars` characters (not bytes), appending "..." when shortened.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_short_text_unchanged() {
        assert_eq!(truncate_chars("café", 10), "café");
    }

    #[test]
    fn test_truncate_chars_multibyte_boundary() {
        assert_eq!(truncate_chars("éééé", 2), "éé...");
    }
}
