//! Tolerant decoding of backend records.
//!
//! The proxy's admin responses change shape between releases. Every field we
//! recognise is optional, unknown fields are ignored, and list entries that
//! can arrive either as a bare id or as an object are modelled as untagged
//! enums. Nothing here fails on a missing field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{KeyToken, ModelId, TeamId, UserId};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_alias: Option<String>,
    pub user_role: Option<String>,
    pub max_budget: Option<f64>,
    pub spend: Option<f64>,
    pub models: Option<Vec<String>>,
    pub teams: Option<Vec<TeamEntry>>,
    pub metadata: Option<Map<String, Value>>,
}

/// Response of `GET /user/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserInfo {
    pub user_id: Option<String>,
    pub user_info: Option<UserRecord>,
    pub keys: Option<Vec<KeyEntry>>,
    pub teams: Option<Vec<TeamEntry>>,
}

impl UserInfo {
    /// Team ids from `user_info.teams` and the top-level `teams` list,
    /// deduplicated, first occurrence wins.
    pub fn team_ids(&self) -> Vec<TeamId> {
        let nested = self
            .user_info
            .as_ref()
            .and_then(|u| u.teams.as_deref())
            .unwrap_or_default();
        let top = self.teams.as_deref().unwrap_or_default();

        let mut ids: Vec<TeamId> = Vec::new();
        for entry in nested.iter().chain(top) {
            if let Some(id) = entry.team_id() {
                if !ids.iter().any(|t| t.0 == id) {
                    ids.push(TeamId::from(id));
                }
            }
        }
        ids
    }

    /// Every key token listed for the user, in listing order.
    pub fn key_tokens(&self) -> Vec<KeyToken> {
        let mut tokens: Vec<KeyToken> = Vec::new();
        for entry in self.keys.as_deref().unwrap_or_default() {
            if let Some(token) = entry.token() {
                if !tokens.iter().any(|t| t.0 == token) {
                    tokens.push(KeyToken::from(token));
                }
            }
        }
        tokens
    }

    /// Whether the record names `user`. Responses for unknown users sometimes
    /// come back as 200 with an empty body, so callers check this.
    pub fn describes(&self, user: &UserId) -> bool {
        let top = self.user_id.as_deref();
        let nested = self.user_info.as_ref().and_then(|u| u.user_id.as_deref());
        top == Some(user.as_str()) || nested == Some(user.as_str())
    }
}

/// A team listed on a user: a bare id or a team object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TeamEntry {
    Id(String),
    Record(TeamRecord),
}

impl TeamEntry {
    pub fn team_id(&self) -> Option<&str> {
        let id = match self {
            TeamEntry::Id(id) => Some(id.as_str()),
            TeamEntry::Record(team) => team.team_id.as_deref(),
        };
        id.filter(|id| !id.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamRecord {
    pub team_id: Option<String>,
    pub team_alias: Option<String>,
    pub organization_id: Option<String>,
    pub models: Option<Vec<String>>,
    pub max_budget: Option<f64>,
    pub spend: Option<f64>,
    pub blocked: Option<bool>,
    pub members_with_roles: Option<Vec<Member>>,
    pub metadata: Option<Map<String, Value>>,
}

/// Response of `GET /team/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamInfo {
    pub team_id: Option<String>,
    pub team_info: Option<TeamRecord>,
}

impl TeamInfo {
    pub fn member_ids(&self) -> Vec<UserId> {
        self.team_info
            .as_ref()
            .and_then(|t| t.members_with_roles.as_deref())
            .unwrap_or_default()
            .iter()
            .filter_map(|m| m.user_id.as_deref())
            .map(UserId::from)
            .collect()
    }

    pub fn describes(&self, team: &TeamId) -> bool {
        let top = self.team_id.as_deref();
        let nested = self.team_info.as_ref().and_then(|t| t.team_id.as_deref());
        top == Some(team.as_str()) || nested == Some(team.as_str())
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyRecord {
    /// Hashed token.
    pub token: Option<String>,
    /// Raw `sk-` secret; only present on generation.
    pub key: Option<String>,
    pub key_name: Option<String>,
    pub key_alias: Option<String>,
    pub user_id: Option<String>,
    pub team_id: Option<String>,
    pub models: Option<Vec<String>>,
    pub max_budget: Option<f64>,
    pub spend: Option<f64>,
    pub expires: Option<String>,
    pub metadata: Option<Map<String, Value>>,
}

impl KeyRecord {
    /// The token that identifies this key for later calls. The hashed token
    /// is preferred so the secret never needs to be stored.
    pub fn identity(&self) -> Option<KeyToken> {
        self.token
            .as_deref()
            .or(self.key.as_deref())
            .filter(|t| !t.is_empty())
            .map(KeyToken::from)
    }
}

/// A key listed on a user: a bare token or a key object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyEntry {
    Token(String),
    Record(KeyRecord),
}

impl KeyEntry {
    pub fn token(&self) -> Option<&str> {
        let token = match self {
            KeyEntry::Token(t) => Some(t.as_str()),
            KeyEntry::Record(k) => k.token.as_deref().or(k.key.as_deref()),
        };
        token.filter(|t| !t.is_empty())
    }
}

/// Response of `GET /key/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyInfo {
    pub key: Option<String>,
    pub info: Option<KeyRecord>,
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelMeta {
    pub id: Option<String>,
    pub db_model: Option<bool>,
    pub base_model: Option<String>,
    pub mode: Option<String>,
    pub team_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRecord {
    pub model_name: Option<String>,
    pub litellm_params: Option<Map<String, Value>>,
    pub model_info: Option<ModelMeta>,
}

impl ModelRecord {
    pub fn id(&self) -> Option<&str> {
        self.model_info.as_ref().and_then(|m| m.id.as_deref())
    }
}

/// Response of `GET /model/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelList {
    pub data: Option<Vec<ModelRecord>>,
}

impl ModelList {
    /// The deployment with `id`, if listed. The endpoint may return the whole
    /// model list when the filter is ignored, so the id is checked here.
    pub fn find(&self, id: &ModelId) -> Option<&ModelRecord> {
        self.data
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|m| m.id() == Some(id.as_str()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
