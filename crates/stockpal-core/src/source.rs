use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in reports and envelopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Sina,
    Yahoo,
    /// Locally generated fallback data.
    Synthetic,
}

impl ProviderId {
    pub const ALL: [Self; 3] = [Self::Sina, Self::Yahoo, Self::Synthetic];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sina => "sina",
            Self::Yahoo => "yahoo",
            Self::Synthetic => "synthetic",
        }
    }

    pub const fn is_remote(self) -> bool {
        !matches!(self, Self::Synthetic)
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sina" => Ok(Self::Sina),
            "yahoo" => Ok(Self::Yahoo),
            "synthetic" => Ok(Self::Synthetic),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_names_case_insensitively() {
        assert_eq!(ProviderId::from_str(" Sina ").expect("must parse"), ProviderId::Sina);
        assert!(matches!(
            ProviderId::from_str("eastmoney"),
            Err(ValidationError::InvalidSource { .. })
        ));
    }
}
