//! Helpers for inspecting migration SQL.
//!
//! Sections are sent to PostgreSQL whole, so nothing here splits statements.

/// Whether `sql` contains anything besides whitespace and comments.
///
/// Understands `--` line comments and nested `/* */` block comments. The
/// first character outside a comment counts as code, so quoted text never
/// needs to be scanned.
pub fn has_statements(sql: &str) -> bool {
    let mut chars = sql.chars().peekable();
    let mut block_depth = 0usize;
    let mut in_line_comment = false;

    while let Some(c) = chars.next() {
        if in_line_comment {
            if c == '\n' {
                in_line_comment = false;
            }
            continue;
        }

        match (c, chars.peek().copied()) {
            ('/', Some('*')) => {
                chars.next();
                block_depth += 1;
            }
            ('*', Some('/')) if block_depth > 0 => {
                chars.next();
                block_depth -= 1;
            }
            _ if block_depth > 0 => {}
            ('-', Some('-')) => {
                chars.next();
                in_line_comment = true;
            }
            _ if c.is_whitespace() => {}
            _ => return true,
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_sections_have_no_statements() {
        assert!(!has_statements(""));
        assert!(!has_statements("  \n\t\n"));
        assert!(!has_statements(
            "-- Paste your migrations here to apply inside database\n\n"
        ));
    }

    #[test]
    fn test_nested_block_comment_is_not_code() {
        assert!(!has_statements("/* outer /* inner; */ still; comment */\n-- done"));
        assert!(has_statements("/* outer /* inner */ still */ SELECT 1;"));
    }

    #[test]
    fn test_code_after_comments() {
        assert!(has_statements("-- header\nSELECT 1;"));
        assert!(has_statements("SELECT 1 -- trailing"));
    }

    #[test]
    fn test_non_ascii_text() {
        assert!(has_statements(
            "CREATE FUNCTION f() RETURNS text AS $$ SELECT 'café' $$ LANGUAGE sql;"
        ));
        assert!(!has_statements("-- café ☕\n/* ünïcödé */"));
    }

    #[test]
    fn test_dash_inside_code_is_code() {
        assert!(has_statements("-1"));
        assert!(has_statements("/"));
    }
}
