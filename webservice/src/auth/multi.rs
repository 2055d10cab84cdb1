use std::sync::Arc;

use super::{Authenticator, BoxFuture};
use crate::error::ServiceError;
use crate::transport::Transport;

/// Applies several authenticators in order.
///
/// When two children write the same header the later one wins.
#[derive(Debug, Clone, Default)]
pub struct MultiAuthenticator {
    authenticators: Vec<Arc<dyn Authenticator>>,
}

impl MultiAuthenticator {
    pub fn new(authenticators: Vec<Arc<dyn Authenticator>>) -> Self {
        Self { authenticators }
    }

    /// Appends one more authenticator.
    #[must_use]
    pub fn with(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticators.push(Arc::new(authenticator));
        self
    }

    pub fn len(&self) -> usize {
        self.authenticators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authenticators.is_empty()
    }
}

impl Authenticator for MultiAuthenticator {
    fn authenticate<'a>(
        &'a self,
        transport: &'a mut Transport,
    ) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            for authenticator in &self.authenticators {
                authenticator.authenticate(&mut *transport).await?;
            }
            Ok(())
        })
    }
}
