//! SOQL escaping utilities.
//!
//! Every literal the query translator embeds in a SOQL string goes through
//! these functions; the translator never interpolates raw caller input.

/// SOQL string and identifier escaping.
pub mod soql {
    /// Escape a string value for use inside a SOQL string literal.
    ///
    /// Escapes quotes, backslashes and control characters that have special
    /// meaning in SOQL string literals.
    ///
    /// ```rust
    /// use forceql_client::security::soql;
    ///
    /// assert_eq!(soql::escape_string("O'Brien & Co."), "O\\'Brien & Co.");
    /// ```
    #[must_use]
    pub fn escape_string(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 16);
        for ch in value.chars() {
            match ch {
                '\'' => escaped.push_str("\\'"),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Escape a value for use inside a SOQL LIKE pattern.
    ///
    /// In addition to standard string escaping this escapes the LIKE
    /// wildcards `%` and `_`, so caller-supplied text matches literally and
    /// the translator controls where wildcards appear.
    #[must_use]
    pub fn escape_like(value: &str) -> String {
        let base = escape_string(value);
        let mut escaped = String::with_capacity(base.len() + 8);
        for ch in base.chars() {
            match ch {
                '%' => escaped.push_str("\\%"),
                '_' => escaped.push_str("\\_"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// Validate that a field or object identifier contains only safe
    /// characters (letters, digits, underscores; leading letter).
    #[must_use]
    pub fn is_safe_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() => {}
            _ => return false,
        }
        chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    }
}
