/// Interpret a string value such as "1" or "no" as a boolean.
///
/// Returns `None` if the value is not recognized.
pub fn str_as_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "true" | "t" | "yes" | "y" => Some(true),
        "0" | "false" | "f" | "no" | "n" => Some(false),
        _ => None,
    }
}

/// Return whether a flag controlled by an environment variable is enabled.
pub fn env_flag(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(val) => str_as_bool(&val).unwrap_or_else(|| {
            eprintln!("Unrecognized boolean value \"{}\" for {}", val, name);
            default
        }),
        Err(_) => default,
    }
}
