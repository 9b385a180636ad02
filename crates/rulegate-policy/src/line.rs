use crate::{PolicyError, PolicyResult, PolicyType, RuleRow};

/// Parse one policy line.
///
/// Returns `Ok(None)` for blank lines and `#` comments. Tokens are separated
/// by commas and trimmed, so `p,alice,doc1,read,allow` and
/// `p, alice, doc1, read, allow` are equivalent.
pub fn parse_policy_line(line: &str) -> PolicyResult<Option<RuleRow>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut tokens = trimmed.split(',').map(str::trim);
    let Some(prefix) = tokens.next() else {
        return Err(PolicyError::MalformedLine(line.to_string()));
    };
    let policy_type: PolicyType = prefix
        .parse()
        .map_err(|_| PolicyError::MalformedLine(line.to_string()))?;
    let fields: Vec<&str> = tokens.collect();
    RuleRow::from_fields(policy_type, &fields).map(Some)
}

/// Parse a whole policy document, skipping blanks and comments.
///
/// Errors carry the 1-based line number of the first bad line.
pub fn parse_policy_lines(text: &str) -> PolicyResult<Vec<RuleRow>> {
    let mut rows = Vec::new();
    for (index, line) in text.lines().enumerate() {
        match parse_policy_line(line) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => {}
            Err(err) => {
                return Err(PolicyError::MalformedLine(format!(
                    "line {}: {err}",
                    index + 1
                )));
            }
        }
    }
    Ok(rows)
}
