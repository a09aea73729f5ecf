use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The hidden opinion an analyst expressed in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Opinion {
    Buy,
    Sell,
}

impl Opinion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Opinion::Buy => "BUY",
            Opinion::Sell => "SELL",
        }
    }
}

impl fmt::Display for Opinion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Opinion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Opinion::Buy),
            "SELL" => Ok(Opinion::Sell),
            other => Err(CoreError::InvalidInput(
                "opinion".to_string(),
                other.to_string(),
            )),
        }
    }
}
