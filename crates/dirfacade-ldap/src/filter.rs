//! LDAP search filter construction.

/// Escapes a value for use inside an LDAP filter assertion (RFC 4515).
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Matches every entry.
pub const ANY_OBJECT: &str = "(objectClass=*)";

/// Filter for generic objects named `name`: excludes users and groups.
#[must_use]
pub fn generic_object_filter(name: &str) -> String {
    format!(
        "(&(cn={})(!(objectclass=user))(!(objectclass=group)))",
        escape_filter_value(name)
    )
}

/// Filter for a group named `name`.
#[must_use]
pub fn group_filter(name: &str) -> String {
    format!("(&(objectClass=group)(cn={}))", escape_filter_value(name))
}

/// Filter for any entry named `name`.
#[must_use]
pub fn common_name_filter(name: &str) -> String {
    format!("(cn={})", escape_filter_value(name))
}
