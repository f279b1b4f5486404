//! Typed reads from an environment-like lookup

use std::str::FromStr;

use crate::error::{BotError, Result};

/// Source of configuration values, usually the process environment.
pub struct EnvReader<F> {
    lookup: F,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn new(lookup: F) -> Self {
        Self { lookup }
    }

    /// Value of `name`, with blank values treated as unset
    pub fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn required(&self, name: &str) -> Result<String> {
        self.optional(name).ok_or_else(|| BotError::MissingEnv {
            name: name.to_string(),
        })
    }

    /// Discord snowflake; zero is rejected since serenity ids must be non-zero
    pub fn required_id(&self, name: &str) -> Result<u64> {
        let raw = self.required(name)?;
        match raw.parse::<u64>() {
            Ok(0) => Err(BotError::InvalidEnv {
                name: name.to_string(),
                value: raw,
                reason: "id must be non-zero".to_string(),
            }),
            Ok(id) => Ok(id),
            Err(e) => Err(BotError::InvalidEnv {
                name: name.to_string(),
                value: raw,
                reason: e.to_string(),
            }),
        }
    }

    pub fn parsed_or<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            None => Ok(default),
            Some(raw) => raw.parse::<T>().map_err(|e| BotError::InvalidEnv {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Like `parsed_or`, for counts and durations that must be positive
    pub fn parsed_nonzero_or(&self, name: &str, default: u64) -> Result<u64> {
        match self.parsed_or(name, default)? {
            0 => Err(BotError::InvalidEnv {
                name: name.to_string(),
                value: self.optional(name).unwrap_or_else(|| "0".to_string()),
                reason: "must be greater than zero".to_string(),
            }),
            value => Ok(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn reader(pairs: &[(&str, &str)]) -> EnvReader<impl Fn(&str) -> Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EnvReader::new(move |name: &str| map.get(name).cloned())
    }

    #[test]
    fn test_blank_values_are_unset() {
        let env = reader(&[("A", "   ")]);
        assert_eq!(env.optional("A"), None);
        assert!(matches!(
            env.required("A"),
            Err(BotError::MissingEnv { name }) if name == "A"
        ));
    }

    #[test]
    fn test_required_id_rejects_zero_and_garbage() {
        let env = reader(&[("ZERO", "0"), ("BAD", "abc"), ("OK", " 123 ")]);
        assert!(matches!(env.required_id("ZERO"), Err(BotError::InvalidEnv { .. })));
        assert!(matches!(env.required_id("BAD"), Err(BotError::InvalidEnv { .. })));
        assert_eq!(env.required_id("OK").unwrap(), 123);
    }

    #[test]
    fn test_parsed_or_default() {
        let env = reader(&[("PORT", "8080"), ("BROKEN", "eighty")]);
        assert_eq!(env.parsed_or::<u16>("PORT", 10000).unwrap(), 8080);
        assert_eq!(env.parsed_or::<u16>("MISSING", 10000).unwrap(), 10000);
        assert!(env.parsed_or::<u16>("BROKEN", 10000).is_err());
    }

    #[test]
    fn test_parsed_nonzero_or() {
        let env = reader(&[("ZERO", "0"), ("SECS", "30")]);
        assert!(matches!(
            env.parsed_nonzero_or("ZERO", 5),
            Err(BotError::InvalidEnv { name, .. }) if name == "ZERO"
        ));
        assert_eq!(env.parsed_nonzero_or("SECS", 5).unwrap(), 30);
        assert_eq!(env.parsed_nonzero_or("MISSING", 5).unwrap(), 5);
    }
}
