use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One row of the `user_data` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub age: BigDecimal,
}

impl UserRecord {
    pub fn new(
        user_id: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        age: impl Into<BigDecimal>,
    ) -> Self {
        UserRecord {
            user_id: user_id.into(),
            name: name.into(),
            email: email.into(),
            age: age.into(),
        }
    }

    /// Builds a record with a freshly generated v4 id.
    pub fn with_generated_id(
        name: impl Into<String>,
        email: impl Into<String>,
        age: impl Into<BigDecimal>,
    ) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name, email, age)
    }

    /// Builds a record whose id is a v5 uuid derived from `seed`, so the same
    /// seed always yields the same id.
    pub fn with_derived_id(
        seed: &str,
        name: impl Into<String>,
        email: impl Into<String>,
        age: impl Into<BigDecimal>,
    ) -> Self {
        let id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, seed.as_bytes());
        Self::new(id.to_string(), name, email, age)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for UserRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {} | {} | {}",
            self.user_id, self.name, self.email, self.age
        )
    }
}
