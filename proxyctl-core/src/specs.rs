//! Desired-state specs and the request bodies built from them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::types::{KeyToken, ModelId, TeamId, UserId};

/// Role of a user inside a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[default]
    User,
    Admin,
}

impl fmt::Display for MemberRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberRole::User => write!(f, "user"),
            MemberRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(MemberRole::User),
            "admin" => Ok(MemberRole::Admin),
            other => Err(format!("unknown member role '{other}'; expected: user, admin")),
        }
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSpec {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl UserSpec {
    /// Spec for a user with a freshly generated id.
    pub fn new() -> Self {
        Self::with_id(UserId::generate())
    }

    pub fn with_id(user_id: UserId) -> Self {
        Self {
            user_id,
            user_email: None,
            user_alias: None,
            user_role: None,
            max_budget: None,
            models: vec![],
            metadata: None,
        }
    }

    /// `POST /user/new` body. The proxy mints a key for every new user unless
    /// told otherwise; keys are managed separately here.
    pub fn create_body(&self) -> Value {
        let mut body = to_object(self);
        body.insert("auto_create_key".into(), Value::Bool(false));
        Value::Object(body)
    }

    pub fn update_body(&self) -> Value {
        Value::Object(to_object(self))
    }
}

impl Default for UserSpec {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Teams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSpec {
    pub team_id: TeamId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl TeamSpec {
    pub fn with_id(team_id: TeamId) -> Self {
        Self {
            team_id,
            team_alias: None,
            models: vec![],
            max_budget: None,
            blocked: None,
            metadata: None,
        }
    }

    pub fn body(&self) -> Value {
        Value::Object(to_object(self))
    }
}

/// A user's membership in a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub team_id: TeamId,
    pub user_id: UserId,
    #[serde(default)]
    pub role: MemberRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget_in_team: Option<f64>,
}

impl MemberSpec {
    pub fn new(team_id: TeamId, user_id: UserId) -> Self {
        Self {
            team_id,
            user_id,
            role: MemberRole::default(),
            max_budget_in_team: None,
        }
    }

    /// `POST /team/member_add` body.
    pub fn add_body(&self) -> Value {
        let mut body = json!({
            "team_id": self.team_id,
            "member": [{ "user_id": self.user_id, "role": self.role }],
        });
        if let (Some(budget), Some(obj)) = (self.max_budget_in_team, body.as_object_mut()) {
            obj.insert("max_budget_in_team".into(), json!(budget));
        }
        body
    }

    /// `POST /team/member_update` body.
    pub fn update_body(&self) -> Value {
        Value::Object(to_object(self))
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_budget: Option<f64>,
    /// Lifetime such as `30d`; `None` never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl KeySpec {
    pub fn generate_body(&self) -> Value {
        Value::Object(to_object(self))
    }

    pub fn update_body(&self, token: &KeyToken) -> Value {
        let mut body = to_object(self);
        body.insert("key".into(), Value::String(token.0.clone()));
        Value::Object(body)
    }
}

// ---------------------------------------------------------------------------
// Models
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub model_id: ModelId,
    /// Public name clients request.
    pub model_name: String,
    /// Provider routing parameters (`model`, `api_base`, `api_key`, ...).
    #[serde(default)]
    pub litellm_params: Map<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_model: Option<String>,
}

impl ModelSpec {
    pub fn new(model_name: impl Into<String>, upstream_model: impl Into<String>) -> Self {
        let mut litellm_params = Map::new();
        litellm_params.insert("model".into(), Value::String(upstream_model.into()));
        Self {
            model_id: ModelId::generate(),
            model_name: model_name.into(),
            litellm_params,
            base_model: None,
        }
    }

    /// Body for both `/model/new` and `/model/update`: the deployment id
    /// travels inside `model_info`.
    pub fn body(&self) -> Value {
        let mut info = Map::new();
        info.insert("id".into(), Value::String(self.model_id.0.clone()));
        info.insert("db_model".into(), Value::Bool(true));
        if let Some(base) = &self.base_model {
            info.insert("base_model".into(), Value::String(base.clone()));
        }
        json!({
            "model_name": self.model_name,
            "litellm_params": self.litellm_params,
            "model_info": info,
        })
    }
}

fn to_object<T: Serialize>(value: &T) -> Map<String, Value> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
