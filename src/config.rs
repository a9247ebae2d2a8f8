use serde::{Deserialize, Serialize};

use crate::errors::{LoanError, Result};
use crate::types::OverpaymentPolicy;

pub const DEFAULT_ACCESS_LINK_BASE: &str = "https://tuapp.com/loan/";

/// engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// decimal places amounts are settled to when written to the ledger
    pub currency_scale: u32,
    pub overpayment_policy: OverpaymentPolicy,
    /// prefix the loan id is appended to when building the borrower link
    pub access_link_base: String,
    pub max_access_code_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency_scale: 2,
            overpayment_policy: OverpaymentPolicy::Cap,
            access_link_base: DEFAULT_ACCESS_LINK_BASE.to_string(),
            max_access_code_attempts: 64,
        }
    }
}

impl EngineConfig {
    /// parse and validate a json configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json).map_err(|e| {
            LoanError::InvalidConfiguration { message: e.to_string() }
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_overpayment_policy(mut self, policy: OverpaymentPolicy) -> Self {
        self.overpayment_policy = policy;
        self
    }

    pub fn with_access_link_base(mut self, base: impl Into<String>) -> Self {
        self.access_link_base = base.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.currency_scale > 8 {
            return Err(LoanError::InvalidConfiguration {
                message: format!("currency_scale {} exceeds working precision", self.currency_scale),
            });
        }
        if self.max_access_code_attempts == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "max_access_code_attempts must be at least 1".to_string(),
            });
        }
        if self.access_link_base.trim().is_empty() {
            return Err(LoanError::InvalidConfiguration {
                message: "access_link_base is empty".to_string(),
            });
        }
        Ok(())
    }
}
