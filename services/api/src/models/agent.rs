//! Agent assignment payloads

use serde::Deserialize;
use uuid::Uuid;

/// Owner's request to hand a property to an agent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentRequest {
    #[serde(default)]
    pub agent_id: Option<Uuid>,
}

/// The agent's answer
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentConfirmRequest {
    #[serde(default)]
    pub accept: Option<bool>,
}

/// `?token=` query string
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenQuery {
    #[serde(default)]
    pub token: Option<String>,
}
