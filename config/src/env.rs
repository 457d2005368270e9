use regex::{
    Captures,
    Regex,
};
use std::borrow::Cow;

lazy_static::lazy_static! {
    static ref ENV_VAR: Regex = Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("valid env var pattern");
}

/// Replace `$VAR` and `${VAR}` with the value from the environment.
/// Unset variables expand to an empty string.
pub fn expand_env(input: &str) -> Cow<'_, str> {
    expand_with(input, |name| std::env::var(name).ok())
}

fn expand_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> Cow<'_, str> {
    ENV_VAR.replace_all(input, |caps: &Captures<'_>| {
        let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        lookup(name).unwrap_or_default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "USER" => Some("alice".to_string()),
            "SECRET_1" => Some("s3cr3t".to_string()),
            _ => None,
        }
    }

    #[test]
    fn expands_both_forms() {
        assert_eq!(
            expand_with("username: $USER\npassword: ${SECRET_1}", lookup),
            "username: alice\npassword: s3cr3t"
        );
    }

    #[test]
    fn unset_variables_are_empty() {
        assert_eq!(expand_with("url: ${MISSING}/write", lookup), "url: /write");
        assert_eq!(expand_with("url: $MISSING", lookup), "url: ");
    }

    #[test]
    fn leaves_other_text_alone() {
        let input = "cost: 5$ and ${not closed";
        assert!(matches!(expand_with(input, lookup), Cow::Borrowed(s) if s == input));
    }

    #[test]
    fn reads_process_environment() {
        std::env::set_var("SPEEDTEST_EXPORTER_ENV_TEST", "from-env");
        assert_eq!(expand_env("instance: ${SPEEDTEST_EXPORTER_ENV_TEST}"), "instance: from-env");
    }
}
