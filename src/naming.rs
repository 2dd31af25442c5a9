//! Identifier case transforms used by every emitter.
//!
//! | Input | Function | Output |
//! |-------|----------|--------|
//! | `UserID` | [`snake_case`] | `user_id` |
//! | `blogPost` | [`screaming_snake_case`] | `BLOG_POST` |
//! | `user_id` | [`lower_camel_case`] | `userId` |
//! | `user_id` | [`pascal_case`] | `UserId` |

/// Convert an identifier to lower_snake_case, keeping acronyms together.
///
/// ```
/// use proto_schemagen::naming::snake_case;
///
/// assert_eq!(snake_case("HTTPServer"), "http_server");
/// assert_eq!(snake_case("UserID"), "user_id");
/// ```
pub fn snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '-' || ch == '_' || ch == '.' || ch == ' ' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            continue;
        }
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|c| c.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_lower);
            if boundary && !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(ch.to_lowercase());
    }
    out.trim_end_matches('_').to_string()
}

pub fn screaming_snake_case(s: &str) -> String {
    snake_case(s).to_uppercase()
}

/// Convert snake_case (or any identifier) to lowerCamelCase.
pub fn lower_camel_case(s: &str) -> String {
    let pascal = pascal_case(s);
    let mut chars = pascal.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}

/// Convert an identifier to PascalCase.
pub fn pascal_case(s: &str) -> String {
    snake_case(s)
        .split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}
