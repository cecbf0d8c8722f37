//! Verified provisioning.
//!
//! [`Provisioner`] is the entry point used by the CLI. Every create is
//! followed by a reconciled read, so a successful return means the entity is
//! visible to subsequent reads. Updates fall back to create when the target
//! is missing, and deletes treat "already gone" as done.

use std::time::Duration;

use proxyctl_core::records::{KeyRecord, ModelRecord, TeamInfo, UserInfo};
use proxyctl_core::{
    Config, EntityKind, EntityRef, KeySpec, KeyToken, MemberSpec, ModelId, ModelSpec, ProxyError,
    TeamId, TeamSpec, UserId, UserSpec,
};
use proxyctl_gateway::{Gateway, HttpGateway};

use crate::cascade::{self, CascadeOptions, CascadeReport};
use crate::client::AdminClient;
use crate::reconcile::{reconcile_with, RetryPolicy};
use crate::upsert::{upsert, Upserted};
use crate::SyncError;

/// A freshly generated key.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedKey {
    /// Hashed token; the key's identity from here on.
    pub token: KeyToken,
    /// Raw `sk-` secret. Shown once, never stored.
    pub secret: Option<String>,
    pub record: KeyRecord,
}

/// The remote view of an entity, by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    User(UserInfo),
    Team(TeamInfo),
    Key(KeyRecord),
    Model(ModelRecord),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deletion {
    Deleted,
    AlreadyGone,
}

pub struct Provisioner<G> {
    client: AdminClient<G>,
    policy: RetryPolicy,
    sleep: fn(Duration),
}

impl Provisioner<HttpGateway> {
    /// HTTP provisioner for the configured proxy.
    pub fn from_config(config: &Config) -> Result<Self, SyncError> {
        config.validate()?;
        let gateway = HttpGateway::new(
            config.base_url.clone(),
            config.api_key.clone(),
            config.timeout(),
        );
        Ok(Self::new(gateway, RetryPolicy::from(&config.retry)))
    }
}

impl<G: Gateway> Provisioner<G> {
    pub fn new(gateway: G, policy: RetryPolicy) -> Self {
        Self {
            client: AdminClient::new(gateway),
            policy,
            sleep: std::thread::sleep,
        }
    }

    /// Replace the backoff sleep.
    pub fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub fn client(&self) -> &AdminClient<G> {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    fn verify<T, R>(&self, read: R) -> Result<T, ProxyError>
    where
        R: FnMut() -> Result<T, ProxyError>,
    {
        reconcile_with(&self.policy, read, self.sleep)
    }

    // -----------------------------------------------------------------------
    // Create and verify
    // -----------------------------------------------------------------------

    pub fn create_user_verified(&self, spec: &UserSpec) -> Result<UserInfo, ProxyError> {
        self.client.create_user(spec)?;
        self.verify(|| self.client.get_user(&spec.user_id))
    }

    pub fn create_team_verified(&self, spec: &TeamSpec) -> Result<TeamInfo, ProxyError> {
        self.client.create_team(spec)?;
        self.verify(|| self.client.get_team(&spec.team_id))
    }

    pub fn create_model_verified(&self, spec: &ModelSpec) -> Result<ModelRecord, ProxyError> {
        self.client.create_model(spec)?;
        self.verify(|| self.client.get_model(&spec.model_id))
    }

    pub fn generate_key_verified(&self, spec: &KeySpec) -> Result<GeneratedKey, ProxyError> {
        let generated = self.client.generate_key(spec)?;
        let token = generated.identity().ok_or_else(|| ProxyError::Rejected {
            status: 200,
            message: "key generation returned no token".to_string(),
        })?;
        tracing::info!("generated key {token}");
        let record = self.verify(|| self.client.get_key(&token))?;
        Ok(GeneratedKey {
            token,
            secret: generated.key,
            record,
        })
    }

    /// Add the membership and wait until the user's team list shows it.
    pub fn add_member_verified(&self, spec: &MemberSpec) -> Result<UserInfo, ProxyError> {
        self.client.add_member(spec)?;
        self.verify(|| {
            let info = self.client.get_user(&spec.user_id)?;
            if info.team_ids().contains(&spec.team_id) {
                Ok(info)
            } else {
                Err(ProxyError::not_visible(format!(
                    "{} not yet listed in {}",
                    spec.user_id, spec.team_id
                )))
            }
        })
    }

    // -----------------------------------------------------------------------
    // Upsert
    // -----------------------------------------------------------------------

    pub fn upsert_user(&self, spec: &UserSpec) -> Result<Upserted<UserInfo>, ProxyError> {
        upsert(
            || {
                self.client.update_user(spec)?;
                self.verify(|| self.client.get_user(&spec.user_id))
            },
            || self.create_user_verified(spec),
        )
    }

    pub fn upsert_team(&self, spec: &TeamSpec) -> Result<Upserted<TeamInfo>, ProxyError> {
        upsert(
            || {
                self.client.update_team(spec)?;
                self.verify(|| self.client.get_team(&spec.team_id))
            },
            || self.create_team_verified(spec),
        )
    }

    pub fn upsert_model(&self, spec: &ModelSpec) -> Result<Upserted<ModelRecord>, ProxyError> {
        upsert(
            || {
                self.client.update_model(spec)?;
                self.verify(|| self.client.get_model(&spec.model_id))
            },
            || self.create_model_verified(spec),
        )
    }

    // -----------------------------------------------------------------------
    // Removal
    // -----------------------------------------------------------------------

    pub fn remove_member_cascading(
        &self,
        team: &TeamId,
        user: &UserId,
        options: CascadeOptions,
    ) -> Result<CascadeReport, ProxyError> {
        cascade::remove_member_cascading(&self.client, team, user, options)
    }

    /// Delete one entity. Not-found counts as already deleted.
    pub fn delete_entity(&self, entity: &EntityRef) -> Result<Deletion, ProxyError> {
        let id = entity.id.as_str();
        let result = match entity.kind {
            EntityKind::User => self.client.delete_users(&[UserId::from(id)]),
            EntityKind::Team => self.client.delete_teams(&[TeamId::from(id)]),
            EntityKind::Key => self.client.delete_keys(&[KeyToken::from(id)]),
            EntityKind::Model => self.client.delete_model(&ModelId::from(id)),
        };
        match result {
            Ok(()) => {
                tracing::info!("deleted {entity}");
                Ok(Deletion::Deleted)
            }
            Err(err) if err.is_not_found() => {
                tracing::debug!("{entity} already gone");
                Ok(Deletion::AlreadyGone)
            }
            Err(err) => Err(err),
        }
    }

    // -----------------------------------------------------------------------
    // Observe
    // -----------------------------------------------------------------------

    /// One read, no retries. `None` means the entity is gone.
    pub fn observe(&self, entity: &EntityRef) -> Result<Option<Observed>, ProxyError> {
        let id = entity.id.as_str();
        let result = match entity.kind {
            EntityKind::User => self.client.get_user(&UserId::from(id)).map(Observed::User),
            EntityKind::Team => self.client.get_team(&TeamId::from(id)).map(Observed::Team),
            EntityKind::Key => self.client.get_key(&KeyToken::from(id)).map(Observed::Key),
            EntityKind::Model => self.client.get_model(&ModelId::from(id)).map(Observed::Model),
        };
        match result {
            Ok(observed) => Ok(Some(observed)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
