/// Reads an optional environment variable.
///
/// Returns `None` when the variable is unset, empty, or not valid unicode, so
/// `FOO= cmd` behaves like an unset `FOO`.
pub fn get_env_var_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
