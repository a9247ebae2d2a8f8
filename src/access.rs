use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use tracing::warn;

use crate::errors::{LoanError, Result};
use crate::types::LoanId;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// borrower-facing access code of the form `LLL-DDD-LLL`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessCode(String);

impl AccessCode {
    /// parse a code, accepting only the `LLL-DDD-LLL` shape
    pub fn parse(code: &str) -> Result<Self> {
        let bytes = code.as_bytes();
        let valid = bytes.len() == 11
            && bytes[3] == b'-'
            && bytes[7] == b'-'
            && bytes[..3].iter().all(|b| LETTERS.contains(b))
            && bytes[4..7].iter().all(|b| DIGITS.contains(b))
            && bytes[8..].iter().all(|b| LETTERS.contains(b));

        if !valid {
            return Err(LoanError::Validation {
                message: format!("malformed access code: {code:?}"),
            });
        }
        Ok(AccessCode(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn random<R: Rng>(rng: &mut R) -> Self {
        let mut code = String::with_capacity(11);
        push_random(&mut code, rng, LETTERS, 3);
        code.push('-');
        push_random(&mut code, rng, DIGITS, 3);
        code.push('-');
        push_random(&mut code, rng, LETTERS, 3);
        AccessCode(code)
    }
}

fn push_random<R: Rng>(code: &mut String, rng: &mut R, alphabet: &[u8], n: usize) {
    for _ in 0..n {
        code.push(alphabet[rng.gen_range(0..alphabet.len())] as char);
    }
}

impl fmt::Display for AccessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccessCode {
    type Error = LoanError;

    fn try_from(value: String) -> Result<Self> {
        AccessCode::parse(&value)
    }
}

impl From<AccessCode> for String {
    fn from(code: AccessCode) -> Self {
        code.0
    }
}

/// link a borrower uses to reach their loan
pub fn access_link(base: &str, loan_id: LoanId) -> String {
    format!("{base}{loan_id}")
}

/// random code generator that retries until a code is free
#[derive(Debug)]
pub struct AccessCodeIssuer {
    rng: Mutex<StdRng>,
    max_attempts: u32,
}

impl AccessCodeIssuer {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
            max_attempts,
        }
    }

    /// deterministic issuer for reproducible runs
    pub fn with_seed(seed: u64, max_attempts: u32) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            max_attempts,
        }
    }

    /// draw a single code without any uniqueness check
    pub fn generate(&self) -> Result<AccessCode> {
        let mut rng = self.rng.lock().map_err(|_| LoanError::Storage {
            message: "access code generator lock poisoned".to_string(),
        })?;
        Ok(AccessCode::random(&mut *rng))
    }

    /// draw codes until `is_taken` reports one as free
    pub fn issue<F>(&self, mut is_taken: F) -> Result<AccessCode>
    where
        F: FnMut(&AccessCode) -> Result<bool>,
    {
        for attempt in 1..=self.max_attempts {
            let code = self.generate()?;
            if !is_taken(&code)? {
                return Ok(code);
            }
            warn!(%code, attempt, "access code collision, regenerating");
        }
        Err(LoanError::AccessCodeExhausted { attempts: self.max_attempts })
    }
}
