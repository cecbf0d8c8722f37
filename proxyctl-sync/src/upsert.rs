//! Update-or-create.

use proxyctl_core::ProxyError;

/// Which branch of [`upsert`] produced the entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Upserted<T> {
    Updated(T),
    /// The update target did not exist; it was created under the same id.
    Created(T),
}

impl<T> Upserted<T> {
    pub fn into_inner(self) -> T {
        match self {
            Upserted::Updated(v) | Upserted::Created(v) => v,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, Upserted::Created(_))
    }
}

/// Try `update`; if it fails as not-found, run `create` instead. Any other
/// update failure is returned as is, and `create` is not attempted.
pub fn upsert<T, U, C>(update: U, create: C) -> Result<Upserted<T>, ProxyError>
where
    U: FnOnce() -> Result<T, ProxyError>,
    C: FnOnce() -> Result<T, ProxyError>,
{
    match update() {
        Ok(value) => Ok(Upserted::Updated(value)),
        Err(err) if err.is_not_found() => {
            tracing::debug!("update target missing ({err}); creating");
            create().map(Upserted::Created)
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn update_success_skips_create() {
        let created = Cell::new(false);
        let result = upsert(
            || Ok::<_, ProxyError>(1),
            || {
                created.set(true);
                Ok(2)
            },
        )
        .unwrap();
        assert_eq!(result, Upserted::Updated(1));
        assert!(!created.get());
    }

    #[test]
    fn not_found_falls_through_to_create() {
        let result = upsert(
            || {
                Err(ProxyError::NotFound {
                    status: 400,
                    message: "Model with id=m-1 not found in db".into(),
                })
            },
            || Ok("created"),
        )
        .unwrap();
        assert!(result.was_created());
        assert_eq!(result.into_inner(), "created");
    }

    #[test]
    fn rejected_update_surfaces_without_create() {
        let created = Cell::new(false);
        let err = upsert::<(), _, _>(
            || {
                Err(ProxyError::Rejected {
                    status: 403,
                    message: "not allowed".into(),
                })
            },
            || {
                created.set(true);
                Ok(())
            },
        )
        .unwrap_err();
        assert!(matches!(err, ProxyError::Rejected { status: 403, .. }));
        assert!(!created.get());
    }

    #[test]
    fn create_failure_is_returned() {
        let err = upsert::<(), _, _>(
            || Err(ProxyError::not_visible("u-1")),
            || Err(ProxyError::Transport("refused".into())),
        )
        .unwrap_err();
        assert!(matches!(err, ProxyError::Transport(_)));
    }
}
