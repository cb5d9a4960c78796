//! Small formatting helpers shared by both command modules.

pub(crate) const RULE: &str =
    "============================================================";

/// First `max` characters of `s`.
pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

pub(crate) fn banner(out: &mut String, title: &str) {
    out.push_str(RULE);
    out.push('\n');
    out.push_str(title);
    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
}

pub(crate) fn skipped_line(out: &mut String, count: usize) {
    if count > 0 {
        out.push_str(&format!("   ({} unreadable file(s) skipped)\n", count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("abcdef", 3), "abc");
        assert_eq!(truncate("ab", 3), "ab");
        assert_eq!(truncate("héllo wörld", 7), "héllo w");
    }
}
