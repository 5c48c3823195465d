//! Execution context handed to every `Component::start`.

use std::sync::{Arc, Weak};

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::service::{ServiceHandle, ServiceShared};

/// Carrier of cancellation, an optional deadline and the owning service.
///
/// The service reference is weak: a context never keeps a service alive,
/// it only lets nested components discover it and request an exit.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    service: Option<Weak<ServiceShared>>,
}

impl Context {
    /// A fresh, never-cancelled context with no service bound.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a context with `service` bound as its owner.
    pub fn with_service(&self, service: &ServiceHandle) -> Self {
        Self {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            service: Some(Arc::downgrade(service.shared())),
        }
    }

    /// Derive a context whose cancellation is a child of this one.
    pub fn child(&self) -> Self {
        Self {
            cancel: self.cancel.child_token(),
            deadline: self.deadline,
            service: self.service.clone(),
        }
    }

    /// Derive a context that is considered cancelled once `deadline` passes.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
            service: self.service.clone(),
        }
    }

    /// The bound service, if one is bound and still alive.
    pub fn service(&self) -> Option<ServiceHandle> {
        self.service
            .as_ref()
            .and_then(Weak::upgrade)
            .map(ServiceHandle::from_shared)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn cancelled(&self) {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => self.cancel.cancelled().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_background_has_no_service() {
        let ctx = Context::background();
        assert!(ctx.service().is_none());
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_child_cancelled_by_parent() {
        let parent = Context::background();
        let child = parent.child();
        parent.cancel();
        assert!(child.is_cancelled());
    }

    #[test]
    fn test_child_cancel_does_not_reach_parent() {
        let parent = Context::background();
        let child = parent.child();
        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn test_deadline_resolves_cancelled() {
        let ctx = Context::background().with_deadline(Instant::now() + Duration::from_millis(20));
        tokio::time::timeout(Duration::from_secs(1), ctx.cancelled())
            .await
            .expect("deadline should fire");
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_deadline_keeps_earliest() {
        let now = Instant::now();
        let early = now + Duration::from_secs(1);
        let late = now + Duration::from_secs(10);
        let ctx = Context::background().with_deadline(early).with_deadline(late);
        assert_eq!(ctx.deadline(), Some(early));
    }
}
