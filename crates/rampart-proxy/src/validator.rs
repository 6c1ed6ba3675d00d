//! The atomically reloadable specification slot.
//!
//! Every request task reads the current specification snapshot; only the
//! `reload` command writes it. The swap is a single atomic pointer store,
//! so an in-flight validation never observes a torn update - it finishes
//! against the snapshot it started with.

use arc_swap::ArcSwap;
use rampart_contract::{
    CapturedRequest, CapturedResponse, ContractValidator, Report, SpecSource, SpecValidator,
    Specification,
};
use std::sync::Arc;
use tracing::info;

pub struct ReloadableValidator {
    source: SpecSource,
    spec: ArcSwap<Specification>,
}

impl ReloadableValidator {
    /// Fetch the specification once and build the slot around it.
    pub async fn load(source: SpecSource) -> anyhow::Result<Self> {
        let spec = source.fetch().await?;
        info!("loaded specification '{}' from {}", spec.title, source.uri());
        Ok(Self {
            source,
            spec: ArcSwap::from_pointee(spec),
        })
    }

    /// Build the slot around an already-parsed specification. The source
    /// is still what `reload` re-fetches from.
    pub fn with_spec(source: SpecSource, spec: Specification) -> Self {
        Self {
            source,
            spec: ArcSwap::from_pointee(spec),
        }
    }

    pub fn current(&self) -> Arc<Specification> {
        self.spec.load_full()
    }

    /// Re-fetch from the configured source and publish the new snapshot.
    /// Recorded reports are untouched; only future validations see the
    /// replacement.
    pub async fn reload(&self) -> anyhow::Result<Arc<Specification>> {
        let spec = Arc::new(self.source.fetch().await?);
        self.spec.store(Arc::clone(&spec));
        info!("reloaded specification '{}'", spec.title);
        Ok(spec)
    }
}

impl ContractValidator for ReloadableValidator {
    fn specification(&self) -> Arc<Specification> {
        self.current()
    }

    fn test_against(
        &self,
        request: &CapturedRequest,
        response: &CapturedResponse,
    ) -> anyhow::Result<Report> {
        SpecValidator::new(self.current())
            .ignore_x_headers(self.source.ignore_x_headers())
            .test_against(request, response)
    }
}
