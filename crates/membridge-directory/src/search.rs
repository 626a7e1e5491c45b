//! Search filter construction for the remote API's MongoDB-style `where`
//! parameter.

use serde_json::{json, Value};

/// Escape regex metacharacters in a user-supplied search term.
fn regex_escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(
            c,
            '.' | '^' | '$' | '*' | '+' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '|' | '\\' | '/'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Case-insensitive substring regex for one search term.
fn contains_regex(term: &str) -> Value {
    json!({ "$regex": format!("^(?i).*({}).*", regex_escape(term)) })
}

/// Filter matching groups whose name contains the search string.
/// `None` when the search is empty (no filtering).
pub fn group_name_filter(search: &str) -> Option<Value> {
    if search.is_empty() {
        return None;
    }
    Some(json!({ "name": contains_regex(search) }))
}

/// Filter matching users where every whitespace-separated keyword appears in
/// the email or first/last name. `None` when the search is empty.
pub fn user_search_filter(search: &str) -> Option<Value> {
    let clauses: Vec<Value> = search
        .split_whitespace()
        .map(|keyword| {
            let regex = contains_regex(keyword);
            json!({ "$or": [
                { "email": regex.clone() },
                { "firstname": regex.clone() },
                { "lastname": regex },
            ]})
        })
        .collect();

    match clauses.len() {
        0 => None,
        1 => Some(clauses.into_iter().next().unwrap_or_default()),
        _ => Some(json!({ "$and": clauses })),
    }
}
