use anyhow::{Result, anyhow, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub type ManagerId = i64;
pub type SupervisorId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manager {
    pub manager_id: ManagerId,
    pub manager_name: String,

    /// `None` when the source row carries no supervisor; such a manager never
    /// resolves to a supervisor.
    pub supervisor_id: Option<SupervisorId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supervisor {
    pub supervisor_id: SupervisorId,
    pub supervisor_name: String,
}

/// Reference identifiers arrive either as integers or as numeric strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum RawId {
    Integer(i64),
    Text(String),
}

impl RawId {
    pub fn normalize(&self, field: &str) -> Result<i64> {
        match self {
            Self::Integer(value) => Ok(*value),
            Self::Text(value) => parse_reference_id(value, field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ManagerRecord {
    pub manager_id: RawId,
    pub manager_name: String,

    #[serde(default)]
    pub supervisor_id: Option<RawId>,
}

impl ManagerRecord {
    pub fn into_manager(self) -> Result<Manager> {
        Ok(Manager {
            manager_id: self.manager_id.normalize("manager_id")?,
            manager_name: self.manager_name,
            supervisor_id: self
                .supervisor_id
                .map(|raw| raw.normalize("supervisor_id"))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SupervisorRecord {
    pub supervisor_id: RawId,
    pub supervisor_name: String,
}

impl SupervisorRecord {
    pub fn into_supervisor(self) -> Result<Supervisor> {
        Ok(Supervisor {
            supervisor_id: self.supervisor_id.normalize("supervisor_id")?,
            supervisor_name: self.supervisor_name,
        })
    }
}

/// Numeric strings become integers; anything else is a conversion error.
pub fn parse_reference_id(raw: &str, field: &str) -> Result<i64> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        bail!("{field} is empty");
    }

    if let Ok(value) = candidate.parse::<i64>() {
        return Ok(value);
    }

    // Decimal renderings such as "42.0" still name an integer id.
    match candidate.parse::<f64>() {
        Ok(value) if value.is_finite() && value.fract() == 0.0 => float_to_id(value, field),
        _ => Err(anyhow!("{field} is not numeric: {candidate:?}")),
    }
}

pub fn float_to_id(value: f64, field: &str) -> Result<i64> {
    if !value.is_finite() || value.fract() != 0.0 {
        bail!("{field} is not an integer: {value}");
    }
    if value < i64::MIN as f64 || value >= i64::MAX as f64 {
        bail!("{field} is out of range: {value}");
    }
    Ok(value as i64)
}
