use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use tracing::{trace, warn};

/// A resource that must be released explicitly once work on it is done.
///
/// Dropping a resource without calling [`Resource::release`] must still be
/// safe; `release` is the orderly path.
#[async_trait]
pub trait Resource: Send + Sized {
    type Error: fmt::Display + Send;

    async fn release(self) -> Result<(), Self::Error>;
}

/// Runs `op` against `resource` and releases the resource afterwards,
/// whether `op` succeeded or failed.
///
/// An error from `op` takes precedence over a release error; the latter is
/// only logged in that case.
pub async fn scoped<R, T, E, F>(mut resource: R, op: F) -> Result<T, E>
where
    R: Resource,
    E: From<R::Error>,
    F: for<'r> FnOnce(&'r mut R) -> BoxFuture<'r, Result<T, E>>,
{
    let result = op(&mut resource).await;
    let released = resource.release().await;

    match (result, released) {
        (Ok(value), Ok(())) => {
            trace!("Scoped resource released");
            Ok(value)
        }
        (Ok(_), Err(release_err)) => Err(E::from(release_err)),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(release_err)) => {
            warn!("Failed to release resource after error: {}", release_err);
            Err(err)
        }
    }
}
