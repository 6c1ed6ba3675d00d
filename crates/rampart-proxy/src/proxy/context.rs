//! Shared per-server state threaded through the request pipeline.

use crate::aggregate::Aggregator;
use crate::delay::DelaySampler;
use crate::mock::MockResolver;
use crate::proxy::client::HttpClient;
use crate::proxy::lifecycle::LifecycleHandle;
use crate::validator::ReloadableValidator;
use std::sync::Arc;

/// Where data-plane traffic goes: a live backend or a directory of canned
/// responses.
pub enum TargetMode {
    Proxy {
        /// Upstream base URL without a trailing slash.
        upstream: String,
        client: HttpClient,
    },
    Mock {
        resolver: MockResolver,
    },
}

/// Everything a request-handling task needs. One instance per server,
/// shared by every connection task.
pub struct ProxyState {
    pub mode: TargetMode,
    pub delay: DelaySampler,
    pub aggregator: Arc<Aggregator>,
    pub validator: Arc<ReloadableValidator>,
    pub lifecycle: LifecycleHandle,
}
