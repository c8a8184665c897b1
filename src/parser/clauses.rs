//! Clause splitting: SELECT / FROM / WHERE segments.

/// Raw tokens of each clause. An absent clause has no tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Clauses<'a> {
    pub select: Vec<&'a str>,
    pub from: Vec<&'a str>,
    pub where_: Vec<&'a str>,
}

/// Split an expression into its clauses.
///
/// Keywords are case-sensitive and whitespace-delimited:
/// SELECT runs to the next FROM, FROM runs to the next WHERE (or the end),
/// WHERE runs to the end.
pub fn split(expression: &str) -> Clauses<'_> {
    let select = find_keyword(expression, "SELECT", 0).and_then(|(_, start)| {
        find_keyword(expression, "FROM", start).map(|(end, _)| &expression[start..end])
    });

    let from = find_keyword(expression, "FROM", 0).map(|(_, start)| {
        match find_keyword(expression, "WHERE", start) {
            Some((end, _)) => &expression[start..end],
            None => &expression[start..],
        }
    });

    let where_ = find_keyword(expression, "WHERE", 0).map(|(_, start)| &expression[start..]);

    Clauses {
        select: select.map(split_top_level).unwrap_or_default(),
        from: from.map(split_top_level).unwrap_or_default(),
        where_: where_.map(split_top_level).unwrap_or_default(),
    }
}

/// Find `keyword` at or after byte `from`, delimited by whitespace or the
/// text boundaries. Returns the keyword's start and end offsets.
fn find_keyword(text: &str, keyword: &str, from: usize) -> Option<(usize, usize)> {
    text[from..]
        .match_indices(keyword)
        .map(|(pos, _)| (from + pos, from + pos + keyword.len()))
        .find(|&(start, end)| {
            let before = text[..start].chars().next_back();
            let after = text[end..].chars().next();
            before.is_none_or(char::is_whitespace) && after.is_none_or(char::is_whitespace)
        })
}

/// Split on commas that are outside quotes and brackets; trim and drop
/// empty tokens.
pub fn split_top_level(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => quote = Some(c),
            '[' | '{' | '(' => depth += 1,
            ']' | '}' | ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                tokens.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    tokens.push(&text[start..]);

    tokens
        .into_iter()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_all_clauses() {
        let clauses = split("SELECT title, meta.year FROM state.movies WHERE status == active");
        assert_eq!(clauses.select, vec!["title", "meta.year"]);
        assert_eq!(clauses.from, vec!["state.movies"]);
        assert_eq!(clauses.where_, vec!["status == active"]);
    }

    #[test]
    fn test_absent_clauses_are_empty() {
        let clauses = split("FROM state.movies");
        assert!(clauses.select.is_empty());
        assert_eq!(clauses.from, vec!["state.movies"]);
        assert!(clauses.where_.is_empty());

        assert_eq!(split("state.movies"), Clauses::default());
    }

    #[test]
    fn test_keywords_need_boundaries() {
        let clauses = split("FROM state.FROMAGE WHERE NOWHERE == x");
        assert_eq!(clauses.from, vec!["state.FROMAGE"]);
        assert_eq!(clauses.where_, vec!["NOWHERE == x"]);
    }

    #[test]
    fn test_top_level_commas_only() {
        assert_eq!(
            split_top_level("tags == ['a', 'b'], name == 'x, y', m == {'k': 1}"),
            vec!["tags == ['a', 'b']", "name == 'x, y'", "m == {'k': 1}"]
        );
        assert_eq!(split_top_level(" a ,, b , "), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_where_is_absent() {
        let clauses = split("FROM state.movies WHERE ");
        assert_eq!(clauses.from, vec!["state.movies"]);
        assert!(clauses.where_.is_empty());
    }
}
