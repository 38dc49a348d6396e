//! Positional `?` markers in raw SQL fragments.
//!
//! Raw conditions are written with dialect-neutral `?` markers and rendered
//! into the connection's placeholder syntax at build time. A `?` inside a
//! single-quoted literal is not a marker.

use sqlrow_core::Dialect;

/// Split `sql` on its markers. The number of markers is
/// `segments.len() - 1`.
#[must_use]
pub fn split_markers(sql: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_literal = false;
    for (i, ch) in sql.char_indices() {
        match ch {
            '\'' => in_literal = !in_literal,
            '?' if !in_literal => {
                segments.push(&sql[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    segments.push(&sql[start..]);
    segments
}

/// Number of markers in `sql`.
#[must_use]
pub fn marker_count(sql: &str) -> usize {
    split_markers(sql).len() - 1
}

/// Render every marker as a dialect placeholder, numbering from `start`.
#[must_use]
pub fn render_markers(sql: &str, dialect: Dialect, start: usize) -> String {
    let segments = split_markers(sql);
    let mut out = String::with_capacity(sql.len() + segments.len() * 2);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            out.push_str(&dialect.placeholder(start + i - 1));
        }
        out.push_str(segment);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_count() {
        assert_eq!(marker_count("age > ?"), 1);
        assert_eq!(marker_count("age > ? AND city = ?"), 2);
        assert_eq!(marker_count("created_at IS NULL"), 0);
    }

    #[test]
    fn test_marker_in_literal_is_ignored() {
        assert_eq!(marker_count("name = '?' AND age > ?"), 1);
        assert_eq!(marker_count("note = 'what?' "), 0);
    }

    #[test]
    fn test_render_markers_postgres() {
        assert_eq!(
            render_markers("age > ? AND city = ?", Dialect::Postgres, 3),
            "age > $3 AND city = $4"
        );
    }

    #[test]
    fn test_render_markers_unnumbered() {
        assert_eq!(
            render_markers("age > ? AND city = ?", Dialect::MySql, 1),
            "age > ? AND city = ?"
        );
    }

    #[test]
    fn test_render_preserves_literals() {
        assert_eq!(
            render_markers("name = '?' AND age > ?", Dialect::Postgres, 1),
            "name = '?' AND age > $1"
        );
    }
}
