//! Amounts in integer cents

use serde::Serialize;

use crate::error::{MarketError, MarketResult};

/// Upper bound for a single price or withdrawal (1,000,000.00)
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    /// Validate a client-supplied amount
    pub fn new(value: i64) -> MarketResult<Self> {
        if value <= 0 {
            return Err(MarketError::bad_input("Amount must be positive"));
        }
        if value > MAX_AMOUNT_CENTS {
            return Err(MarketError::bad_input(format!(
                "Amount must be at most {MAX_AMOUNT_CENTS} cents"
            )));
        }
        Ok(Self(value))
    }

    pub const fn from_db(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(&self) -> i64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cents_bounds() {
        assert!(Cents::new(0).is_err());
        assert!(Cents::new(-100).is_err());
        assert!(Cents::new(MAX_AMOUNT_CENTS + 1).is_err());
        assert_eq!(Cents::new(1999).unwrap().get(), 1999);
    }
}
