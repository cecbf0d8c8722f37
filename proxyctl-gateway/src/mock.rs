//! In-memory emulation of the proxy admin API.
//!
//! Reproduces the behaviours the consistency layer has to cope with:
//!
//! - **Visibility lag**: after a create, the next `lag` info reads for that
//!   entity (and for a new membership, the next `lag` user reads) miss it.
//! - **No cascades**: deleting a user leaves its keys behind.
//! - **Scripted faults**: the next matching call fails with a transport
//!   error or an arbitrary status/body.
//! - **Varied not-found bodies**: users/teams/keys answer 404, model calls
//!   answer with the model-specific bodies the real proxy uses.
//!
//! Single-threaded: state lives in a `RefCell`.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};

use serde_json::{json, Value};

use crate::{Gateway, GatewayResponse, Method, TransportError};

/// A call as the backend received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// What a scripted fault does to the matching call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// No response at all.
    Transport,
    /// Respond with this status and body instead of handling the call.
    Respond { status: u16, body: String },
}

#[derive(Debug)]
struct ScriptedFault {
    method: Method,
    path_prefix: String,
    fault: Fault,
    /// Matching calls to let through before the fault fires.
    skip: u32,
    remaining: u32,
}

#[derive(Debug, Clone)]
struct MockUser {
    email: Option<String>,
    alias: Option<String>,
    role: Option<String>,
    max_budget: Option<f64>,
    teams: Vec<String>,
}

#[derive(Debug, Clone)]
struct MockTeam {
    alias: Option<String>,
    models: Vec<String>,
    members: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct MockKey {
    raw: String,
    alias: Option<String>,
    user_id: Option<String>,
    team_id: Option<String>,
    models: Vec<String>,
}

#[derive(Debug, Clone)]
struct MockModel {
    model_name: String,
    litellm_params: Value,
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<String, MockUser>,
    teams: BTreeMap<String, MockTeam>,
    /// Keyed by hashed token.
    keys: BTreeMap<String, MockKey>,
    models: BTreeMap<String, MockModel>,
    lag: u32,
    /// `(kind, id)` → reads still to miss.
    hidden: HashMap<(&'static str, String), u32>,
    /// `(team, user)` → user reads that still omit the team.
    hidden_memberships: HashMap<(String, String), u32>,
    faults: VecDeque<ScriptedFault>,
    calls: Vec<RecordedCall>,
    key_seq: u32,
}

/// The in-memory backend. Implements [`Gateway`].
#[derive(Debug, Default)]
pub struct MockBackend {
    state: RefCell<State>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newly created entities stay invisible for `reads` info reads.
    pub fn with_visibility_lag(self, reads: u32) -> Self {
        self.state.borrow_mut().lag = reads;
        self
    }

    // -- seeding (visible immediately) --------------------------------------

    pub fn seed_user(&self, user_id: &str) {
        self.state
            .borrow_mut()
            .users
            .insert(user_id.to_string(), MockUser::blank());
    }

    pub fn seed_team(&self, team_id: &str) {
        self.state
            .borrow_mut()
            .teams
            .insert(team_id.to_string(), MockTeam::blank());
    }

    /// Seeds team and user as needed, then links them.
    pub fn seed_membership(&self, team_id: &str, user_id: &str) {
        let mut st = self.state.borrow_mut();
        let team = st
            .teams
            .entry(team_id.to_string())
            .or_insert_with(MockTeam::blank);
        if !team.members.iter().any(|(u, _)| u == user_id) {
            team.members.push((user_id.to_string(), "user".to_string()));
        }
        let user = st
            .users
            .entry(user_id.to_string())
            .or_insert_with(MockUser::blank);
        if !user.teams.iter().any(|t| t == team_id) {
            user.teams.push(team_id.to_string());
        }
    }

    /// A key whose hashed token and raw secret are both `token`.
    pub fn seed_key(&self, token: &str, user_id: Option<&str>) {
        self.state.borrow_mut().keys.insert(
            token.to_string(),
            MockKey {
                raw: token.to_string(),
                alias: None,
                user_id: user_id.map(str::to_string),
                team_id: None,
                models: vec![],
            },
        );
    }

    pub fn seed_model(&self, id: &str, model_name: &str) {
        self.state.borrow_mut().models.insert(
            id.to_string(),
            MockModel {
                model_name: model_name.to_string(),
                litellm_params: json!({ "model": model_name }),
            },
        );
    }

    // -- fault injection -----------------------------------------------------

    /// The next call matching `method` and `path_prefix` fails with `fault`.
    pub fn fail_next(&self, method: Method, path_prefix: &str, fault: Fault) {
        self.fail_times(method, path_prefix, fault, 1);
    }

    pub fn fail_times(&self, method: Method, path_prefix: &str, fault: Fault, times: u32) {
        self.push_fault(method, path_prefix, fault, 0, times);
    }

    /// Let `passes` matching calls through, then fail the one after.
    pub fn fail_after(&self, method: Method, path_prefix: &str, passes: u32, fault: Fault) {
        self.push_fault(method, path_prefix, fault, passes, 1);
    }

    fn push_fault(&self, method: Method, path_prefix: &str, fault: Fault, skip: u32, times: u32) {
        self.state.borrow_mut().faults.push_back(ScriptedFault {
            method,
            path_prefix: path_prefix.to_string(),
            fault,
            skip,
            remaining: times,
        });
    }

    // -- inspection ----------------------------------------------------------

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.borrow().calls.clone()
    }

    /// Number of calls whose path starts with `path_prefix`.
    pub fn count_calls(&self, method: Method, path_prefix: &str) -> usize {
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.method == method && c.path.starts_with(path_prefix))
            .count()
    }

    pub fn has_user(&self, user_id: &str) -> bool {
        self.state.borrow().users.contains_key(user_id)
    }

    pub fn has_team(&self, team_id: &str) -> bool {
        self.state.borrow().teams.contains_key(team_id)
    }

    /// Matches either the hashed token or the raw secret.
    pub fn has_key(&self, token: &str) -> bool {
        let st = self.state.borrow();
        st.keys.contains_key(token) || st.keys.values().any(|k| k.raw == token)
    }

    pub fn has_model(&self, id: &str) -> bool {
        self.state.borrow().models.contains_key(id)
    }

    pub fn user_teams(&self, user_id: &str) -> Vec<String> {
        self.state
            .borrow()
            .users
            .get(user_id)
            .map(|u| u.teams.clone())
            .unwrap_or_default()
    }

    pub fn team_members(&self, team_id: &str) -> Vec<String> {
        self.state
            .borrow()
            .teams
            .get(team_id)
            .map(|t| t.members.iter().map(|(u, _)| u.clone()).collect())
            .unwrap_or_default()
    }

    pub fn user_email(&self, user_id: &str) -> Option<String> {
        self.state
            .borrow()
            .users
            .get(user_id)
            .and_then(|u| u.email.clone())
    }

    pub fn model_name(&self, id: &str) -> Option<String> {
        self.state
            .borrow()
            .models
            .get(id)
            .map(|m| m.model_name.clone())
    }
}

impl Gateway for MockBackend {
    fn call(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<GatewayResponse, TransportError> {
        let mut st = self.state.borrow_mut();
        st.calls.push(RecordedCall {
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        if let Some(fault) = st.take_fault(method, path) {
            tracing::debug!("mock: scripted fault on {method} {path}");
            return match fault {
                Fault::Transport => Err(TransportError::Connect(format!(
                    "scripted transport failure on {path}"
                ))),
                Fault::Respond { status, body } => Ok(GatewayResponse::new(status, body)),
            };
        }

        let (route, query) = split_query(path);
        let empty = json!({});
        let body = body.unwrap_or(&empty);
        let (status, value) = match (method, route) {
            (Method::Post, "/user/new") => st.user_new(body),
            (Method::Get, "/user/info") => st.user_info(&query),
            (Method::Post, "/user/update") => st.user_update(body),
            (Method::Post, "/user/delete") => st.user_delete(body),
            (Method::Post, "/team/new") => st.team_new(body),
            (Method::Get, "/team/info") => st.team_info(&query),
            (Method::Post, "/team/update") => st.team_update(body),
            (Method::Post, "/team/delete") => st.team_delete(body),
            (Method::Post, "/team/member_add") => st.member_add(body),
            (Method::Post, "/team/member_update") => st.member_update(body),
            (Method::Post, "/team/member_delete") => st.member_delete(body),
            (Method::Post, "/key/generate") => st.key_generate(body),
            (Method::Get, "/key/info") => st.key_info(&query),
            (Method::Post, "/key/update") => st.key_update(body),
            (Method::Post, "/key/delete") => st.key_delete(body),
            (Method::Post, "/model/new") => st.model_new(body),
            (Method::Get, "/model/info") => st.model_info(&query),
            (Method::Post, "/model/update") => st.model_update(body),
            (Method::Post, "/model/delete") => st.model_delete(body),
            _ => (404, json!({ "detail": "Not Found" })),
        };
        Ok(GatewayResponse::new(status, value.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

type Reply = (u16, Value);

fn ok(value: Value) -> Reply {
    (200, value)
}

fn not_found(what: &str) -> Reply {
    (404, json!({ "detail": { "error": format!("{what} not found") } }))
}

fn bad_request(message: String) -> Reply {
    (400, json!({ "error": { "message": message, "type": "bad_request", "code": "400" } }))
}

fn str_field<'a>(body: &'a Value, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

fn str_list(body: &Value, name: &str) -> Vec<String> {
    body.get(name)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl MockUser {
    fn blank() -> Self {
        Self {
            email: None,
            alias: None,
            role: None,
            max_budget: None,
            teams: vec![],
        }
    }

    fn apply(&mut self, body: &Value) {
        if let Some(v) = str_field(body, "user_email") {
            self.email = Some(v.to_string());
        }
        if let Some(v) = str_field(body, "user_alias") {
            self.alias = Some(v.to_string());
        }
        if let Some(v) = str_field(body, "user_role") {
            self.role = Some(v.to_string());
        }
        if let Some(v) = body.get("max_budget").and_then(Value::as_f64) {
            self.max_budget = Some(v);
        }
    }
}

impl MockTeam {
    fn blank() -> Self {
        Self {
            alias: None,
            models: vec![],
            members: vec![],
        }
    }

    fn apply(&mut self, body: &Value) {
        if let Some(v) = str_field(body, "team_alias") {
            self.alias = Some(v.to_string());
        }
        if body.get("models").is_some() {
            self.models = str_list(body, "models");
        }
    }
}

impl State {
    fn take_fault(&mut self, method: Method, path: &str) -> Option<Fault> {
        let idx = self
            .faults
            .iter()
            .position(|f| f.method == method && path.starts_with(&f.path_prefix))?;
        let entry = self.faults.get_mut(idx)?;
        if entry.skip > 0 {
            entry.skip -= 1;
            return None;
        }
        entry.remaining = entry.remaining.saturating_sub(1);
        let fault = entry.fault.clone();
        if entry.remaining == 0 {
            self.faults.remove(idx);
        }
        Some(fault)
    }

    fn hide(&mut self, kind: &'static str, id: &str) {
        if self.lag > 0 {
            self.hidden.insert((kind, id.to_string()), self.lag);
        }
    }

    /// Consumes one hidden read; true while the entity should still miss.
    fn still_hidden(&mut self, kind: &'static str, id: &str) -> bool {
        match self.hidden.get_mut(&(kind, id.to_string())) {
            Some(n) if *n > 0 => {
                *n -= 1;
                true
            }
            _ => false,
        }
    }

    // -- users ---------------------------------------------------------------

    fn user_new(&mut self, body: &Value) -> Reply {
        let Some(id) = str_field(body, "user_id").map(str::to_string) else {
            return bad_request("user_id is required".into());
        };
        if self.users.contains_key(&id) {
            return bad_request(format!("User with id={id} already exists"));
        }
        let mut user = MockUser::blank();
        user.apply(body);
        self.users.insert(id.clone(), user);
        self.hide("user", &id);
        ok(json!({ "user_id": id }))
    }

    fn user_info(&mut self, query: &HashMap<String, String>) -> Reply {
        let Some(id) = query.get("user_id").cloned() else {
            return bad_request("user_id query parameter is required".into());
        };
        if !self.users.contains_key(&id) || self.still_hidden("user", &id) {
            return not_found(&format!("User {id}"));
        }
        let Some(user) = self.users.get(&id).cloned() else {
            return not_found(&format!("User {id}"));
        };

        let mut teams = Vec::new();
        for team in &user.teams {
            let key = (team.clone(), id.clone());
            match self.hidden_memberships.get_mut(&key) {
                Some(n) if *n > 0 => *n -= 1,
                _ => teams.push(team.clone()),
            }
        }
        let keys: Vec<Value> = self
            .keys
            .iter()
            .filter(|(_, k)| k.user_id.as_deref() == Some(id.as_str()))
            .map(|(token, k)| json!({ "token": token, "key_alias": k.alias, "team_id": k.team_id }))
            .collect();
        let team_objects: Vec<Value> = teams
            .iter()
            .map(|t| {
                let alias = self.teams.get(t).and_then(|team| team.alias.clone());
                json!({ "team_id": t, "team_alias": alias })
            })
            .collect();

        ok(json!({
            "user_id": id,
            "user_info": {
                "user_id": id,
                "user_email": user.email,
                "user_alias": user.alias,
                "user_role": user.role,
                "max_budget": user.max_budget,
                "teams": teams,
            },
            "keys": keys,
            "teams": team_objects,
        }))
    }

    fn user_update(&mut self, body: &Value) -> Reply {
        let id = str_field(body, "user_id").unwrap_or_default().to_string();
        match self.users.get_mut(&id) {
            Some(user) => {
                user.apply(body);
                ok(json!({ "user_id": id }))
            }
            None => not_found(&format!("User {id}")),
        }
    }

    fn user_delete(&mut self, body: &Value) -> Reply {
        let ids = str_list(body, "user_ids");
        let missing: Vec<&String> = ids.iter().filter(|id| !self.users.contains_key(*id)).collect();
        if !missing.is_empty() {
            return not_found(&format!("User {}", missing[0]));
        }
        for id in &ids {
            self.users.remove(id);
            for team in self.teams.values_mut() {
                team.members.retain(|(u, _)| u != id);
            }
        }
        ok(json!({ "deleted_users": ids }))
    }

    // -- teams ---------------------------------------------------------------

    fn team_new(&mut self, body: &Value) -> Reply {
        let Some(id) = str_field(body, "team_id").map(str::to_string) else {
            return bad_request("team_id is required".into());
        };
        if self.teams.contains_key(&id) {
            return bad_request(format!("Team id = {id} already exists. Please use a different team id."));
        }
        let mut team = MockTeam::blank();
        team.apply(body);
        self.teams.insert(id.clone(), team);
        self.hide("team", &id);
        ok(json!({ "team_id": id }))
    }

    fn team_info(&mut self, query: &HashMap<String, String>) -> Reply {
        let id = query.get("team_id").cloned().unwrap_or_default();
        if !self.teams.contains_key(&id) || self.still_hidden("team", &id) {
            return not_found(&format!("Team {id}"));
        }
        let Some(team) = self.teams.get(&id) else {
            return not_found(&format!("Team {id}"));
        };
        let members: Vec<Value> = team
            .members
            .iter()
            .map(|(u, role)| json!({ "user_id": u, "role": role }))
            .collect();
        ok(json!({
            "team_id": id,
            "team_info": {
                "team_id": id,
                "team_alias": team.alias,
                "models": team.models,
                "members_with_roles": members,
            },
        }))
    }

    fn team_update(&mut self, body: &Value) -> Reply {
        let id = str_field(body, "team_id").unwrap_or_default().to_string();
        match self.teams.get_mut(&id) {
            Some(team) => {
                team.apply(body);
                ok(json!({ "team_id": id }))
            }
            None => not_found(&format!("Team {id}")),
        }
    }

    fn team_delete(&mut self, body: &Value) -> Reply {
        let ids = str_list(body, "team_ids");
        if let Some(missing) = ids.iter().find(|id| !self.teams.contains_key(*id)) {
            return not_found(&format!("Team {missing}"));
        }
        for id in &ids {
            self.teams.remove(id);
            for user in self.users.values_mut() {
                user.teams.retain(|t| t != id);
            }
        }
        ok(json!({ "deleted_teams": ids }))
    }

    // -- memberships ---------------------------------------------------------

    fn member_add(&mut self, body: &Value) -> Reply {
        let team_id = str_field(body, "team_id").unwrap_or_default().to_string();
        if !self.teams.contains_key(&team_id) {
            return not_found(&format!("Team {team_id}"));
        }
        let members: Vec<(String, String)> = body
            .get("member")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|m| {
                        let user = str_field(m, "user_id")?.to_string();
                        let role = str_field(m, "role").unwrap_or("user").to_string();
                        Some((user, role))
                    })
                    .collect()
            })
            .unwrap_or_default();

        for (user_id, role) in members {
            let already = self
                .teams
                .get(&team_id)
                .is_some_and(|t| t.members.iter().any(|(u, _)| *u == user_id));
            if already {
                return bad_request(format!("User={user_id} already in team={team_id}"));
            }
            // The proxy creates unknown users on the fly.
            let user = self.users.entry(user_id.clone()).or_insert_with(MockUser::blank);
            user.teams.push(team_id.clone());
            if let Some(team) = self.teams.get_mut(&team_id) {
                team.members.push((user_id.clone(), role));
            }
            if self.lag > 0 {
                self.hidden_memberships
                    .insert((team_id.clone(), user_id), self.lag);
            }
        }
        ok(json!({ "team_id": team_id }))
    }

    fn member_update(&mut self, body: &Value) -> Reply {
        let team_id = str_field(body, "team_id").unwrap_or_default().to_string();
        let user_id = str_field(body, "user_id").unwrap_or_default().to_string();
        let role = str_field(body, "role").unwrap_or("user").to_string();
        let Some(team) = self.teams.get_mut(&team_id) else {
            return not_found(&format!("Team {team_id}"));
        };
        match team.members.iter_mut().find(|(u, _)| *u == user_id) {
            Some(member) => {
                member.1 = role;
                ok(json!({ "team_id": team_id, "user_id": user_id }))
            }
            None => bad_request(format!("User={user_id} not in team={team_id}")),
        }
    }

    fn member_delete(&mut self, body: &Value) -> Reply {
        let team_id = str_field(body, "team_id").unwrap_or_default().to_string();
        let user_id = str_field(body, "user_id").unwrap_or_default().to_string();
        let Some(team) = self.teams.get_mut(&team_id) else {
            return not_found(&format!("Team {team_id}"));
        };
        let before = team.members.len();
        team.members.retain(|(u, _)| *u != user_id);
        if team.members.len() == before {
            return bad_request(format!("User={user_id} not in team={team_id}"));
        }
        if let Some(user) = self.users.get_mut(&user_id) {
            user.teams.retain(|t| *t != team_id);
        }
        self.hidden_memberships.remove(&(team_id.clone(), user_id.clone()));
        ok(json!({ "team_id": team_id, "user_id": user_id }))
    }

    // -- keys ----------------------------------------------------------------

    fn find_key_mut(&mut self, token: &str) -> Option<(&String, &mut MockKey)> {
        self.keys
            .iter_mut()
            .find(|(hashed, k)| hashed.as_str() == token || k.raw == token)
    }

    fn key_generate(&mut self, body: &Value) -> Reply {
        if let Some(team) = str_field(body, "team_id") {
            if !self.teams.contains_key(team) {
                return bad_request(format!("Team id = {team} does not exist"));
            }
        }
        self.key_seq += 1;
        let token = format!("hashed-{:04}", self.key_seq);
        let raw = format!("sk-mock-{:04}", self.key_seq);
        let key = MockKey {
            raw: raw.clone(),
            alias: str_field(body, "key_alias").map(str::to_string),
            user_id: str_field(body, "user_id").map(str::to_string),
            team_id: str_field(body, "team_id").map(str::to_string),
            models: str_list(body, "models"),
        };
        let reply = json!({
            "key": raw,
            "token": token,
            "key_alias": key.alias,
            "user_id": key.user_id,
            "team_id": key.team_id,
        });
        self.keys.insert(token.clone(), key);
        self.hide("key", &token);
        ok(reply)
    }

    fn key_info(&mut self, query: &HashMap<String, String>) -> Reply {
        let token = query.get("key").cloned().unwrap_or_default();
        let hashed = match self.find_key_mut(&token) {
            Some((hashed, _)) => hashed.clone(),
            None => return not_found("Key"),
        };
        if self.still_hidden("key", &hashed) {
            return not_found("Key");
        }
        let Some(key) = self.keys.get(&hashed) else {
            return not_found("Key");
        };
        ok(json!({
            "key": hashed,
            "info": {
                "token": hashed,
                "key_alias": key.alias,
                "user_id": key.user_id,
                "team_id": key.team_id,
                "models": key.models,
            },
        }))
    }

    fn key_update(&mut self, body: &Value) -> Reply {
        let token = str_field(body, "key").unwrap_or_default().to_string();
        match self.find_key_mut(&token) {
            Some((_, key)) => {
                if let Some(alias) = str_field(body, "key_alias") {
                    key.alias = Some(alias.to_string());
                }
                if body.get("models").is_some() {
                    key.models = str_list(body, "models");
                }
                ok(json!({ "key": token }))
            }
            None => not_found("Key"),
        }
    }

    fn key_delete(&mut self, body: &Value) -> Reply {
        let tokens = str_list(body, "keys");
        let mut deleted = Vec::new();
        for token in &tokens {
            let hashed = self.find_key_mut(token).map(|(h, _)| h.clone());
            if let Some(hashed) = hashed {
                self.keys.remove(&hashed);
                deleted.push(token.clone());
            }
        }
        if deleted.len() != tokens.len() {
            return not_found("Not all keys passed in were deleted. This probably means you don't have access to delete all the keys passed in. Key");
        }
        ok(json!({ "deleted_keys": deleted }))
    }

    // -- models --------------------------------------------------------------

    fn model_new(&mut self, body: &Value) -> Reply {
        let id = body
            .pointer("/model_info/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("generated-{}", self.models.len() + 1));
        if self.models.contains_key(&id) {
            return bad_request(format!("Model with id={id} already exists"));
        }
        let model = MockModel {
            model_name: str_field(body, "model_name").unwrap_or_default().to_string(),
            litellm_params: body.get("litellm_params").cloned().unwrap_or_else(|| json!({})),
        };
        self.models.insert(id.clone(), model);
        self.hide("model", &id);
        ok(json!({ "model_id": id }))
    }

    fn model_info(&mut self, query: &HashMap<String, String>) -> Reply {
        let id = query.get("litellm_model_id").cloned().unwrap_or_default();
        if !self.models.contains_key(&id) || self.still_hidden("model", &id) {
            return (
                400,
                json!({ "detail": { "error": format!("Model id = {id} not found on litellm proxy") } }),
            );
        }
        let Some(model) = self.models.get(&id) else {
            return not_found("Model");
        };
        ok(json!({
            "data": [{
                "model_name": model.model_name,
                "litellm_params": model.litellm_params,
                "model_info": { "id": id, "db_model": true },
            }],
        }))
    }

    fn model_update(&mut self, body: &Value) -> Reply {
        let id = body
            .pointer("/model_info/id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        match self.models.get_mut(&id) {
            Some(model) => {
                if let Some(name) = str_field(body, "model_name") {
                    model.model_name = name.to_string();
                }
                if let Some(params) = body.get("litellm_params") {
                    model.litellm_params = params.clone();
                }
                ok(json!({ "model_id": id }))
            }
            None => (
                400,
                json!({ "error": { "message": { "error": format!("Model with id={id} not found in db") }, "type": "None", "code": "400" } }),
            ),
        }
    }

    fn model_delete(&mut self, body: &Value) -> Reply {
        let id = str_field(body, "id").unwrap_or_default().to_string();
        if self.models.remove(&id).is_none() {
            return (
                400,
                json!({ "error": { "message": format!("model not found: {id}"), "type": "None", "code": "400" } }),
            );
        }
        ok(json!({ "message": format!("Model: {id} deleted successfully") }))
    }
}

fn split_query(path: &str) -> (&str, HashMap<String, String>) {
    match path.split_once('?') {
        Some((route, query)) => (
            route,
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        ),
        None => (path, HashMap::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(backend: &MockBackend, path: &str) -> GatewayResponse {
        backend.call(Method::Get, path, None).unwrap()
    }

    fn post(backend: &MockBackend, path: &str, body: Value) -> GatewayResponse {
        backend.call(Method::Post, path, Some(&body)).unwrap()
    }

    #[test]
    fn created_user_is_hidden_for_lag_reads() {
        let backend = MockBackend::new().with_visibility_lag(2);
        assert_eq!(post(&backend, "/user/new", json!({ "user_id": "u-1" })).status, 200);
        assert_eq!(get(&backend, "/user/info?user_id=u-1").status, 404);
        assert_eq!(get(&backend, "/user/info?user_id=u-1").status, 404);
        assert_eq!(get(&backend, "/user/info?user_id=u-1").status, 200);
    }

    #[test]
    fn deleting_user_leaves_keys_behind() {
        let backend = MockBackend::new();
        backend.seed_user("u-1");
        backend.seed_key("sk-a", Some("u-1"));
        post(&backend, "/user/delete", json!({ "user_ids": ["u-1"] }));
        assert!(!backend.has_user("u-1"));
        assert!(backend.has_key("sk-a"));
    }

    #[test]
    fn scripted_fault_fires_once() {
        let backend = MockBackend::new();
        backend.seed_user("u-1");
        backend.fail_next(Method::Get, "/user/info", Fault::Transport);
        assert!(backend.call(Method::Get, "/user/info?user_id=u-1", None).is_err());
        assert_eq!(get(&backend, "/user/info?user_id=u-1").status, 200);
        assert_eq!(backend.count_calls(Method::Get, "/user/info"), 2);
    }

    #[test]
    fn delayed_fault_lets_earlier_calls_through() {
        let backend = MockBackend::new();
        backend.seed_user("u-1");
        backend.fail_after(Method::Get, "/user/info", 1, Fault::Transport);
        assert_eq!(get(&backend, "/user/info?user_id=u-1").status, 200);
        assert!(backend.call(Method::Get, "/user/info?user_id=u-1", None).is_err());
        assert_eq!(get(&backend, "/user/info?user_id=u-1").status, 200);
    }

    #[test]
    fn member_delete_of_non_member_is_rejected() {
        let backend = MockBackend::new();
        backend.seed_team("t-1");
        let resp = post(&backend, "/team/member_delete", json!({ "team_id": "t-1", "user_id": "u-9" }));
        assert_eq!(resp.status, 400);
    }

    #[test]
    fn query_values_are_decoded() {
        let backend = MockBackend::new();
        backend.seed_user("a b@c");
        assert_eq!(get(&backend, "/user/info?user_id=a+b%40c").status, 200);
    }
}
