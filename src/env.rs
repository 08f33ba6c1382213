//! Typed environment-variable getters.
//!
//! Every lookup goes through an [`EnvProvider`], so tests can inject values
//! with [`MapEnv`] instead of mutating the real process environment.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;
use std::str::FromStr;

use crate::EnvError;

/// Source of raw environment values.
pub trait EnvProvider {
    /// Returns the raw value of `key`, or `None` when it is not set.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads from the real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    /// Loads a `.env` file from the current directory (or its parents) into
    /// the process environment, then returns the provider.
    ///
    /// A missing `.env` file is not an error; a malformed one is. Variables
    /// already present in the process win over the file.
    pub fn with_dotenv() -> Result<Self, EnvError> {
        tolerate_missing(dotenvy::dotenv().map(drop))?;
        Ok(Self)
    }

    /// Like [`with_dotenv`](Self::with_dotenv), reading the file at `path`.
    pub fn with_dotenv_from(path: impl AsRef<Path>) -> Result<Self, EnvError> {
        tolerate_missing(dotenvy::from_path(path))?;
        Ok(Self)
    }
}

fn tolerate_missing(result: Result<(), dotenvy::Error>) -> Result<(), EnvError> {
    match result {
        Ok(()) => Ok(()),
        Err(dotenvy::Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(EnvError::Dotenv(err.to_string())),
    }
}

impl EnvProvider for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory provider.
#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

impl EnvProvider for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

impl<P: EnvProvider + ?Sized> EnvProvider for &P {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

/// Typed getters over an [`EnvProvider`].
///
/// `required_*` getters fail with [`EnvError`] when the variable is absent or
/// does not parse; `*_or` getters fall back to the supplied default instead.
///
/// Strings and bools treat an empty value as unset. Numbers only treat an
/// absent variable as unset, so an empty number is a parse failure.
#[derive(Clone, Debug, Default)]
pub struct Env<P = ProcessEnv> {
    provider: P,
}

impl Env<ProcessEnv> {
    /// Getters over the process environment.
    pub fn process() -> Self {
        Self::new(ProcessEnv)
    }
}

impl<P: EnvProvider> Env<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    pub fn required_string(&self, name: &str) -> Result<String, EnvError> {
        self.non_empty(name).ok_or_else(|| missing("string", name))
    }

    pub fn string_or(&self, name: &str, default: impl Into<String>) -> String {
        self.non_empty(name).unwrap_or_else(|| default.into())
    }

    pub fn required_i64(&self, name: &str) -> Result<i64, EnvError> {
        self.required_parsed("int64", name)
    }

    pub fn i64_or(&self, name: &str, default: i64) -> i64 {
        self.parsed_or(name, default)
    }

    pub fn required_f64(&self, name: &str) -> Result<f64, EnvError> {
        self.required_parsed("float64", name)
    }

    pub fn f64_or(&self, name: &str, default: f64) -> f64 {
        self.parsed_or(name, default)
    }

    pub fn required_bool(&self, name: &str) -> Result<bool, EnvError> {
        let value = self.non_empty(name).ok_or_else(|| missing("bool", name))?;
        parse_bool(&value).ok_or_else(|| invalid("bool", name, value))
    }

    pub fn bool_or(&self, name: &str, default: bool) -> bool {
        self.non_empty(name)
            .and_then(|value| parse_bool(&value))
            .unwrap_or(default)
    }

    /// Splits a required variable on `separator` into a set.
    pub fn required_string_set(
        &self,
        name: &str,
        separator: &str,
    ) -> Result<HashSet<String>, EnvError> {
        let raw = self.required_string(name)?;
        Ok(split_set(&raw, separator))
    }

    /// Splits the variable (or `default` when unset) on `separator`.
    pub fn string_set_or(&self, name: &str, default: &str, separator: &str) -> HashSet<String> {
        let raw = self.string_or(name, default);
        split_set(&raw, separator)
    }

    fn non_empty(&self, name: &str) -> Option<String> {
        self.provider.var(name).filter(|value| !value.is_empty())
    }

    fn required_parsed<T: FromStr>(&self, kind: &'static str, name: &str) -> Result<T, EnvError> {
        let value = self.provider.var(name).ok_or_else(|| missing(kind, name))?;
        value
            .trim()
            .parse::<T>()
            .map_err(|_| invalid(kind, name, value))
    }

    fn parsed_or<T: FromStr>(&self, name: &str, default: T) -> T {
        self.provider
            .var(name)
            .and_then(|value| value.trim().parse::<T>().ok())
            .unwrap_or(default)
    }
}

fn missing(kind: &'static str, name: &str) -> EnvError {
    EnvError::Missing {
        kind,
        name: name.to_owned(),
    }
}

fn invalid(kind: &'static str, name: &str, value: String) -> EnvError {
    EnvError::Invalid {
        kind,
        name: name.to_owned(),
        value,
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn split_set(raw: &str, separator: &str) -> HashSet<String> {
    raw.split(separator).map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io::Write;

    use super::{Env, MapEnv, ProcessEnv};
    use crate::EnvError;

    fn env(pairs: &[(&str, &str)]) -> Env<MapEnv> {
        Env::new(pairs.iter().copied().collect())
    }

    #[test]
    fn required_i64_parses_value() {
        assert_eq!(env(&[("PORT", "42")]).required_i64("PORT"), Ok(42));
    }

    #[test]
    fn required_i64_rejects_invalid_and_missing() {
        let env = env(&[("PORT", "invalid"), ("EMPTY", "")]);
        assert!(matches!(
            env.required_i64("PORT"),
            Err(EnvError::Invalid { kind: "int64", .. })
        ));
        assert!(matches!(
            env.required_i64("EMPTY"),
            Err(EnvError::Invalid { .. })
        ));
        assert!(matches!(
            env.required_i64("MISSING"),
            Err(EnvError::Missing { .. })
        ));
    }

    #[test]
    fn optional_numbers_fall_back_to_default() {
        let env = env(&[("RATE", "0.5"), ("BROKEN", "x")]);
        assert_eq!(env.f64_or("RATE", 1.0), 0.5);
        assert_eq!(env.f64_or("BROKEN", 1.0), 1.0);
        assert_eq!(env.i64_or("BROKEN", 9), 9);
        assert_eq!(env.i64_or("MISSING", 9), 9);
    }

    #[test]
    fn required_f64_reports_kind() {
        let err = env(&[("RATE", "nope")]).required_f64("RATE").unwrap_err();
        assert_eq!(
            err.to_string(),
            "environment error (float64): unable to parse value nope to required env var RATE"
        );
    }

    #[test]
    fn empty_string_counts_as_unset() {
        let env = env(&[("NAME", "")]);
        assert!(env.required_string("NAME").is_err());
        assert_eq!(env.string_or("NAME", "fallback"), "fallback");
    }

    #[test]
    fn bools_accept_short_forms() {
        let env = env(&[("A", "t"), ("B", "FALSE"), ("C", "yes")]);
        assert_eq!(env.required_bool("A"), Ok(true));
        assert_eq!(env.required_bool("B"), Ok(false));
        assert!(env.required_bool("C").is_err());
        assert!(env.bool_or("C", true));
        assert!(!env.bool_or("MISSING", false));
    }

    #[test]
    fn string_sets_split_on_separator() {
        let env = env(&[("HOSTS", "a,b,a")]);
        let expected: HashSet<String> = ["a", "b"].into_iter().map(String::from).collect();
        assert_eq!(env.required_string_set("HOSTS", ","), Ok(expected));

        let fallback = env.string_set_or("OTHER", "x|y", "|");
        assert!(fallback.contains("x") && fallback.contains("y"));
        assert!(env.required_string_set("OTHER", ",").is_err());
    }

    #[test]
    fn dotenv_file_fills_process_env() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "BACKEND_UTILS_DOTENV_LOADED=from-file").expect("write env file");

        let env = Env::new(ProcessEnv::with_dotenv_from(file.path()).expect("valid file"));
        assert_eq!(
            env.required_string("BACKEND_UTILS_DOTENV_LOADED"),
            Ok("from-file".to_owned())
        );
    }

    #[test]
    fn missing_dotenv_file_is_ignored() {
        assert!(ProcessEnv::with_dotenv_from("does/not/exist/.env").is_ok());
    }

    #[test]
    fn malformed_dotenv_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "BACKEND_UTILS_DOTENV_BROKEN=\"never closed").expect("write env file");

        let err = ProcessEnv::with_dotenv_from(file.path()).expect_err("unterminated quote");
        assert!(matches!(err, EnvError::Dotenv(_)));
        assert!(std::env::var("BACKEND_UTILS_DOTENV_BROKEN").is_err());
    }

    #[test]
    fn process_env_reads_real_variables() {
        let env = Env::process();
        assert!(env.string_or("BACKEND_UTILS_SURELY_UNSET_VAR", "d") == "d");
    }
}
