use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub Uuid);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CustomerId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value.trim()).map(Self).map_err(|_| {
            DomainError::InvariantViolation(format!("`{value}` is not a valid customer id"))
        })
    }
}

/// Natural person or legal entity. Every quote and project belongs to exactly one of the two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerType {
    PersonaFisica,
    PersonaGiuridica,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonaFisica => "persona_fisica",
            Self::PersonaGiuridica => "persona_giuridica",
        }
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CustomerType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "persona_fisica" | "fisica" => Ok(Self::PersonaFisica),
            "persona_giuridica" | "giuridica" => Ok(Self::PersonaGiuridica),
            other => Err(DomainError::InvariantViolation(format!(
                "unsupported customer type `{other}` (expected persona_fisica|persona_giuridica)"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerRef {
    pub customer_type: CustomerType,
    pub id: CustomerId,
}

impl CustomerRef {
    pub fn persona_fisica(id: CustomerId) -> Self {
        Self { customer_type: CustomerType::PersonaFisica, id }
    }

    pub fn persona_giuridica(id: CustomerId) -> Self {
        Self { customer_type: CustomerType::PersonaGiuridica, id }
    }

    /// Builds a reference from the two nullable owner columns a record carries.
    pub fn from_owner_columns(
        persona_fisica: Option<CustomerId>,
        persona_giuridica: Option<CustomerId>,
    ) -> Result<Self, DomainError> {
        match (persona_fisica, persona_giuridica) {
            (Some(id), None) => Ok(Self::persona_fisica(id)),
            (None, Some(id)) => Ok(Self::persona_giuridica(id)),
            (Some(_), Some(_)) => Err(DomainError::InvariantViolation(
                "record references both a persona fisica and a persona giuridica".to_string(),
            )),
            (None, None) => Err(DomainError::InvariantViolation(
                "record references no customer".to_string(),
            )),
        }
    }

    pub fn persona_fisica_id(&self) -> Option<CustomerId> {
        matches!(self.customer_type, CustomerType::PersonaFisica).then_some(self.id)
    }

    pub fn persona_giuridica_id(&self) -> Option<CustomerId> {
        matches!(self.customer_type, CustomerType::PersonaGiuridica).then_some(self.id)
    }
}

impl fmt::Display for CustomerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.customer_type, self.id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "customer_type", rename_all = "snake_case")]
pub enum Customer {
    PersonaFisica { id: CustomerId, nome: String, cognome: String },
    PersonaGiuridica { id: CustomerId, ragione_sociale: String },
}

impl Customer {
    pub fn customer_ref(&self) -> CustomerRef {
        match self {
            Self::PersonaFisica { id, .. } => CustomerRef::persona_fisica(*id),
            Self::PersonaGiuridica { id, .. } => CustomerRef::persona_giuridica(*id),
        }
    }

    /// `None` when the name fields are blank.
    pub fn display_name(&self) -> Option<String> {
        let name = match self {
            Self::PersonaFisica { nome, cognome, .. } => {
                format!("{} {}", nome.trim(), cognome.trim()).trim().to_string()
            }
            Self::PersonaGiuridica { ragione_sociale, .. } => ragione_sociale.trim().to_string(),
        };
        (!name.is_empty()).then_some(name)
    }
}
