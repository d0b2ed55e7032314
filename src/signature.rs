//! Filesystem-safe run signatures.
//!
//! A signature flattens a fixture name and an argument list into a single
//! dot-delimited name usable as a directory entry on common platforms.
//! Distinct inputs can normalize to the same signature; that risk is
//! accepted and surfaced as a configuration warning rather than prevented.

use once_cell::sync::Lazy;
use regex::Regex;

static QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new(r#"["']"#).expect("valid regex"));

static ILLEGAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

/// Values that flatten into a list of command-line arguments.
///
/// Implemented for strings and for (nested) vectors, arrays and slices of
/// them, so `["a", "b"]`, `vec![vec!["a"], vec!["b"]]` and `"a"` all work.
pub trait IntoArgs {
    /// Appends the flattened arguments to `out`.
    fn flatten_into(self, out: &mut Vec<String>);

    /// Returns the flattened arguments.
    fn into_args(self) -> Vec<String>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }
}

impl IntoArgs for &str {
    fn flatten_into(self, out: &mut Vec<String>) {
        out.push(self.to_string());
    }
}

impl IntoArgs for String {
    fn flatten_into(self, out: &mut Vec<String>) {
        out.push(self);
    }
}

impl IntoArgs for &String {
    fn flatten_into(self, out: &mut Vec<String>) {
        out.push(self.clone());
    }
}

impl<T: IntoArgs> IntoArgs for Vec<T> {
    fn flatten_into(self, out: &mut Vec<String>) {
        for item in self {
            item.flatten_into(out);
        }
    }
}

impl<T: IntoArgs, const N: usize> IntoArgs for [T; N] {
    fn flatten_into(self, out: &mut Vec<String>) {
        for item in self {
            item.flatten_into(out);
        }
    }
}

impl<T: IntoArgs + Clone> IntoArgs for &[T] {
    fn flatten_into(self, out: &mut Vec<String>) {
        for item in self {
            item.clone().flatten_into(out);
        }
    }
}

impl<T: IntoArgs> IntoArgs for Option<T> {
    fn flatten_into(self, out: &mut Vec<String>) {
        if let Some(item) = self {
            item.flatten_into(out);
        }
    }
}

/// Flattens `parts` into a single filesystem-safe name.
///
/// Empty parts are dropped, the rest are joined with `.`, quote characters
/// are removed, and every run of characters outside `[A-Za-z0-9._-]` is
/// replaced by a single `.`.
pub fn escape_filename(parts: impl IntoArgs) -> String {
    let joined = parts
        .into_args()
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(".");
    let unquoted = QUOTES.replace_all(&joined, "");
    ILLEGAL.replace_all(&unquoted, ".").into_owned()
}

/// Computes the signature of one run from its fixture and arguments.
pub fn run_signature(fixture: Option<&str>, args: &[String]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(args.len() + 1);
    fixture.flatten_into(&mut parts);
    parts.extend(args.iter().cloned());
    escape_filename(parts)
}
