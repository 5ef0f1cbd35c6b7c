// Leading-token extraction for KQL queries

/// First token of a query, skipping blank lines and `//` comments.
///
/// The token ends at whitespace, a pipe, an opening parenthesis or a
/// semicolon, so `"Syslog\n| take 10"` yields `Syslog`.
pub fn query_head(query: &str) -> Option<&str> {
    let line = query
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty() && !l.starts_with("//"))?;

    let end = line
        .find(|c: char| c.is_whitespace() || matches!(c, '|' | '(' | ';'))
        .unwrap_or(line.len());

    let head = &line[..end];
    if head.is_empty() {
        None
    } else {
        Some(head)
    }
}

/// KQL statements that start a query without naming a table
pub(crate) fn is_kql_keyword(token: &str) -> bool {
    const KEYWORDS: &[&str] = &[
        "let",
        "union",
        "search",
        "print",
        "datatable",
        "range",
        "find",
        "externaldata",
        "evaluate",
        "set",
    ];
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(token))
}
