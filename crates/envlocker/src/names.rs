//! Which keys count as environment variable names

/// True when `name` is one or more of `0-9`, `A-Z` or `_`.
///
/// Matching is case-sensitive: lowercase and mixed-case labels are rejected
/// even though the backend accepts them.
pub fn is_env_var_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase() || b == b'_')
}

/// True when the pair can be injected: a valid name and a non-empty value.
///
/// Values containing NUL are rejected; no process environment can hold them.
pub fn is_injectable(name: &str, value: &str) -> bool {
    !value.is_empty() && !value.contains('\0') && is_env_var_name(name)
}
