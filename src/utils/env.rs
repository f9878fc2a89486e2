/// Get environment variable with EXAMGATE_ prefix, falling back to unprefixed version
///
/// Checks `EXAMGATE_{key}` first, then `{key}`.
///
/// # Examples
///
/// ```rust
/// use examgate::utils::get_env_with_prefix;
///
/// // Checks EXAMGATE_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("EXAMGATE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Parse a prefixed environment variable, ignoring values that fail to parse.
pub fn parse_env_with_prefix<T: std::str::FromStr>(key: &str) -> Option<T> {
    get_env_with_prefix(key).and_then(|v| v.trim().parse().ok())
}
