//! Component names.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Maximum length of a component name.
const MAX_NAME_LEN: usize = 64;

/// Unique identifier for a component within a host.
///
/// Component names are strings like `"iac"` or `"vuln-scanner"`. They must
/// be non-empty and contain only lowercase alphanumeric characters and
/// hyphens. The name doubles as a directory and executable file name, so
/// anything that could escape the components root is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ComponentName(String);

/// Deserialize with validation so crafted lock files cannot smuggle paths.
impl<'de> Deserialize<'de> for ComponentName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::new(s).map_err(serde::de::Error::custom)
    }
}

impl ComponentName {
    /// Create a new `ComponentName`, validating the format.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidName`] if the name is empty, too long,
    /// or contains invalid characters.
    pub fn new(name: impl Into<String>) -> CoreResult<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(Self(name))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether a string is a valid component name.
    #[must_use]
    pub fn is_valid(name: &str) -> bool {
        Self::validate(name).is_ok()
    }

    fn validate(name: &str) -> CoreResult<()> {
        if name.is_empty() {
            return Err(CoreError::InvalidName(
                "component name must not be empty".into(),
            ));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(CoreError::InvalidName(format!(
                "component name must be at most {MAX_NAME_LEN} characters, got {}",
                name.len()
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(CoreError::InvalidName(format!(
                "component name must contain only lowercase alphanumeric characters and hyphens, got: {name}"
            )));
        }
        if name.starts_with('-') || name.ends_with('-') {
            return Err(CoreError::InvalidName(format!(
                "component name must not start or end with a hyphen, got: {name}"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ComponentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ComponentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for ComponentName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}
