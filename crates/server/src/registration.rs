//! In-process registration of the worker with its host.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use pwa_client::Registration;

/// Registered until the worker unregisters itself; never re-registers.
#[derive(Debug)]
pub struct HostRegistration {
    registered: AtomicBool,
}

impl Default for HostRegistration {
    fn default() -> Self {
        Self { registered: AtomicBool::new(true) }
    }
}

impl HostRegistration {
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Registration for HostRegistration {
    async fn unregister(&self) -> Result<bool, pwa_core::Error> {
        let was = self.registered.swap(false, Ordering::AcqRel);
        if was {
            tracing::info!("worker unregistered from host");
        }
        Ok(was)
    }
}
