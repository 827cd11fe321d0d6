//! Known standard-library function return types (spec §4.H "known typing
//! functions"), simplified from the teacher's embedded phpstorm-stubs
//! approach to a fixed static table — this crate doesn't ship a full
//! standard-library stub corpus, just the handful of functions the
//! expression type resolver names explicitly.

/// Return the fixed result type for a well-known stdlib function, or
/// `None` if `name` isn't one of them (the caller then falls back to a
/// user/declared-function lookup in the symbol store).
pub fn known_function_return_type(name: &str) -> Option<&'static str> {
    let key = name.trim_start_matches('\\');
    KNOWN_FUNCTIONS
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(key))
        .map(|(_, ty)| *ty)
}

const KNOWN_FUNCTIONS: &[(&str, &str)] = &[
    ("intval", "int"),
    ("floatval", "float"),
    ("doubleval", "float"),
    ("strval", "string"),
    ("boolval", "bool"),
    ("count", "int"),
    ("sizeof", "int"),
    ("strlen", "int"),
    ("is_array", "bool"),
    ("is_string", "bool"),
    ("is_int", "bool"),
    ("is_integer", "bool"),
    ("is_float", "bool"),
    ("is_bool", "bool"),
    ("is_null", "bool"),
    ("is_object", "bool"),
    ("is_numeric", "bool"),
    ("is_callable", "bool"),
    ("array_map", "array"),
    ("array_filter", "array"),
    ("array_values", "array"),
    ("array_keys", "array"),
    ("array_merge", "array"),
    ("array_unique", "array"),
    ("array_reverse", "array"),
    ("array_slice", "array"),
    ("array_combine", "array"),
    ("implode", "string"),
    ("join", "string"),
    ("explode", "string[]"),
    ("str_split", "string[]"),
    ("str_repeat", "string"),
    ("str_replace", "string"),
    ("trim", "string"),
    ("ltrim", "string"),
    ("rtrim", "string"),
    ("strtolower", "string"),
    ("strtoupper", "string"),
    ("sprintf", "string"),
    ("json_encode", "string"),
    ("json_decode", "mixed"),
    ("var_export", "string"),
    ("gettype", "string"),
    ("get_class", "string"),
    ("array_pop", "mixed"),
    ("array_shift", "mixed"),
    ("current", "mixed"),
    ("end", "mixed"),
    ("reset", "mixed"),
    ("next", "mixed"),
    ("prev", "mixed"),
    ("max", "mixed"),
    ("min", "mixed"),
    ("abs", "int|float"),
    ("round", "float"),
    ("floor", "float"),
    ("ceil", "float"),
    ("rand", "int"),
    ("mt_rand", "int"),
    ("time", "int"),
    ("microtime", "string"),
    ("array_sum", "int|float"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_functions_resolve_case_insensitively() {
        assert_eq!(known_function_return_type("IntVal"), Some("int"));
        assert_eq!(known_function_return_type("\\strlen"), Some("int"));
    }

    #[test]
    fn unknown_function_returns_none() {
        assert_eq!(known_function_return_type("my_custom_helper"), None);
    }
}
