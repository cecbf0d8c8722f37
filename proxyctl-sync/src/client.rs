//! Typed admin API client.
//!
//! [`AdminClient`] turns each admin operation into one gateway call and
//! decodes the answer into the tolerant records of `proxyctl_core::records`.
//! Non-2xx responses go through the response classifier, so every failure
//! surfaces as a [`ProxyError`] of a known class.
//!
//! Info reads also check that the record they got back actually names the
//! requested entity: the proxy answers some lookups for unknown ids with an
//! empty 200, and those count as not found.

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use proxyctl_core::error_from_response;
use proxyctl_core::records::{KeyInfo, KeyRecord, ModelList, ModelRecord, TeamInfo, UserInfo};
use proxyctl_core::{
    KeySpec, KeyToken, MemberSpec, ModelId, ModelSpec, ProxyError, TeamId, TeamSpec, UserId,
    UserSpec,
};
use proxyctl_gateway::{Gateway, Method};

pub struct AdminClient<G> {
    gateway: G,
}

impl<G: Gateway> AdminClient<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // -- users ---------------------------------------------------------------

    pub fn create_user(&self, spec: &UserSpec) -> Result<(), ProxyError> {
        self.post("/user/new", &spec.create_body())?;
        tracing::info!("created user {}", spec.user_id);
        Ok(())
    }

    pub fn get_user(&self, user: &UserId) -> Result<UserInfo, ProxyError> {
        let info: UserInfo = self.get("/user/info", "user_id", user.as_str())?;
        if !info.describes(user) {
            return Err(ProxyError::not_visible(format!("user {user} not listed")));
        }
        Ok(info)
    }

    pub fn update_user(&self, spec: &UserSpec) -> Result<(), ProxyError> {
        self.post("/user/update", &spec.update_body())?;
        Ok(())
    }

    pub fn delete_users(&self, users: &[UserId]) -> Result<(), ProxyError> {
        self.post("/user/delete", &json!({ "user_ids": users }))?;
        Ok(())
    }

    // -- teams ---------------------------------------------------------------

    pub fn create_team(&self, spec: &TeamSpec) -> Result<(), ProxyError> {
        self.post("/team/new", &spec.body())?;
        tracing::info!("created team {}", spec.team_id);
        Ok(())
    }

    pub fn get_team(&self, team: &TeamId) -> Result<TeamInfo, ProxyError> {
        let info: TeamInfo = self.get("/team/info", "team_id", team.as_str())?;
        if !info.describes(team) {
            return Err(ProxyError::not_visible(format!("team {team} not listed")));
        }
        Ok(info)
    }

    pub fn update_team(&self, spec: &TeamSpec) -> Result<(), ProxyError> {
        self.post("/team/update", &spec.body())?;
        Ok(())
    }

    pub fn delete_teams(&self, teams: &[TeamId]) -> Result<(), ProxyError> {
        self.post("/team/delete", &json!({ "team_ids": teams }))?;
        Ok(())
    }

    // -- memberships ---------------------------------------------------------

    pub fn add_member(&self, spec: &MemberSpec) -> Result<(), ProxyError> {
        self.post("/team/member_add", &spec.add_body())?;
        tracing::info!("added {} to team {}", spec.user_id, spec.team_id);
        Ok(())
    }

    pub fn update_member(&self, spec: &MemberSpec) -> Result<(), ProxyError> {
        self.post("/team/member_update", &spec.update_body())?;
        Ok(())
    }

    pub fn remove_member(&self, team: &TeamId, user: &UserId) -> Result<(), ProxyError> {
        self.post(
            "/team/member_delete",
            &json!({ "team_id": team, "user_id": user }),
        )?;
        Ok(())
    }

    // -- keys ----------------------------------------------------------------

    /// Generate a key. The returned record carries the raw secret, which the
    /// proxy never shows again.
    pub fn generate_key(&self, spec: &KeySpec) -> Result<KeyRecord, ProxyError> {
        let value = self.post("/key/generate", &spec.generate_body())?;
        decode("/key/generate", value)
    }

    pub fn get_key(&self, token: &KeyToken) -> Result<KeyRecord, ProxyError> {
        let info: KeyInfo = self.get("/key/info", "key", token.as_str())?;
        info.info
            .ok_or_else(|| ProxyError::not_visible(format!("key {token} not listed")))
    }

    pub fn update_key(&self, token: &KeyToken, spec: &KeySpec) -> Result<(), ProxyError> {
        self.post("/key/update", &spec.update_body(token))?;
        Ok(())
    }

    pub fn delete_keys(&self, tokens: &[KeyToken]) -> Result<(), ProxyError> {
        self.post("/key/delete", &json!({ "keys": tokens }))?;
        Ok(())
    }

    // -- models --------------------------------------------------------------

    pub fn create_model(&self, spec: &ModelSpec) -> Result<(), ProxyError> {
        self.post("/model/new", &spec.body())?;
        tracing::info!("created model {} ({})", spec.model_name, spec.model_id);
        Ok(())
    }

    pub fn get_model(&self, id: &ModelId) -> Result<ModelRecord, ProxyError> {
        let list: ModelList = self.get("/model/info", "litellm_model_id", id.as_str())?;
        list.find(id)
            .cloned()
            .ok_or_else(|| ProxyError::not_visible(format!("model {id} not listed")))
    }

    pub fn update_model(&self, spec: &ModelSpec) -> Result<(), ProxyError> {
        self.post("/model/update", &spec.body())?;
        Ok(())
    }

    pub fn delete_model(&self, id: &ModelId) -> Result<(), ProxyError> {
        self.post("/model/delete", &json!({ "id": id }))?;
        Ok(())
    }

    // -- plumbing ------------------------------------------------------------

    fn get<T>(&self, path: &str, param: &str, value: &str) -> Result<T, ProxyError>
    where
        T: DeserializeOwned + Default,
    {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair(param, value)
            .finish();
        let path = format!("{path}?{query}");
        let value = self.send(Method::Get, &path, None)?;
        decode(&path, value)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, ProxyError> {
        self.send(Method::Post, path, Some(body))
    }

    /// One call: transport failures become `Transport`, non-2xx statuses are
    /// classified, an empty success body is `Null`.
    fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, ProxyError> {
        let response = self
            .gateway
            .call(method, path, body)
            .map_err(|e| ProxyError::Transport(e.to_string()))?;

        if !response.is_success() {
            let err = error_from_response(response.status, &response.body);
            tracing::debug!("{method} {path} failed ({}): {err}", err.class());
            return Err(err);
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|source| ProxyError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

/// Decode a success body. `null` decodes to the empty record.
fn decode<T>(path: &str, value: Value) -> Result<T, ProxyError>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|source| ProxyError::Decode {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxyctl_gateway::mock::{Fault, MockBackend};
    use proxyctl_gateway::{GatewayResponse, TransportError};

    struct Fixed(u16, &'static str);

    impl Gateway for Fixed {
        fn call(
            &self,
            _method: Method,
            _path: &str,
            _body: Option<&Value>,
        ) -> Result<GatewayResponse, TransportError> {
            Ok(GatewayResponse::new(self.0, self.1))
        }
    }

    #[test]
    fn empty_success_body_for_user_is_not_found() {
        let client = AdminClient::new(Fixed(200, ""));
        let err = client.get_user(&UserId::from("u-1")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn model_missing_from_list_is_not_found() {
        let client = AdminClient::new(Fixed(
            200,
            r#"{"data":[{"model_name":"other","model_info":{"id":"m-2"}}]}"#,
        ));
        let err = client.get_model(&ModelId::from("m-1")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_success_body_is_decode_error() {
        let client = AdminClient::new(Fixed(200, "<html>"));
        let err = client.get_team(&TeamId::from("t-1")).unwrap_err();
        assert!(matches!(err, ProxyError::Decode { .. }), "got: {err:?}");
    }

    #[test]
    fn transport_failure_is_transient() {
        let backend = MockBackend::new();
        backend.fail_next(Method::Post, "/team/new", Fault::Transport);
        let client = AdminClient::new(&backend);
        let err = client
            .create_team(&TeamSpec::with_id(TeamId::from("t-1")))
            .unwrap_err();
        assert!(matches!(err, ProxyError::Transport(_)));
        assert!(!backend.has_team("t-1"));
    }

    #[test]
    fn user_info_query_is_encoded() {
        let backend = MockBackend::new();
        backend.seed_user("ops+bot@example.com");
        let client = AdminClient::new(&backend);
        client
            .get_user(&UserId::from("ops+bot@example.com"))
            .expect("user visible");
        let path = &backend.calls()[0].path;
        assert_eq!(path, "/user/info?user_id=ops%2Bbot%40example.com");
    }

    #[test]
    fn generated_key_is_readable_by_hashed_token() {
        let backend = MockBackend::new();
        let client = AdminClient::new(&backend);
        let record = client.generate_key(&KeySpec::default()).unwrap();
        let token = record.identity().unwrap();
        assert!(token.as_str().starts_with("hashed-"));
        assert!(record.key.unwrap().starts_with("sk-mock-"));
        assert_eq!(client.get_key(&token).unwrap().token, Some(token.0.clone()));
    }
}
