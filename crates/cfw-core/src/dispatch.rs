//! ---
//! cfw_section: "01-dispatch-core"
//! cfw_type: "source"
//! cfw_scope: "code"
//! cfw_description: "Daemon context, handler registry, and dispatch loop."
//! cfw_version: "v0.1.0-alpha"
//! cfw_owner: "tbd"
//! ---
use async_trait::async_trait;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, IntCounter};
use tracing::{error, info, warn};

use cfw_bus::{BusError, RequestSource};
use cfw_msg::{decode_request, RequestObject, ServiceKey};

use crate::{CoreError, Result};

static REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cfwd_requests_total",
        "Total number of bus requests pulled by the dispatcher"
    )
    .expect("metric registration to succeed")
});

static DECODE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cfwd_request_decode_failures_total",
        "Requests dropped because the payload was not a json object"
    )
    .expect("metric registration to succeed")
});

static HANDLER_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "cfwd_handler_failures_total",
        "Handler invocations that returned an error"
    )
    .expect("metric registration to succeed")
});

/// A registered request handler.
///
/// One service per recognized top-level key. Handlers mutate only their own
/// state; the dispatcher never runs two invocations concurrently.
#[async_trait]
pub trait Service: Send {
    /// Key this service answers to.
    fn key(&self) -> ServiceKey;

    /// Handle one request that contains this service's key. Errors are
    /// logged by the dispatcher and never terminate the loop.
    async fn handle(&mut self, request: &RequestObject) -> anyhow::Result<()>;
}

/// Central receive-decode-route loop.
pub struct Dispatcher {
    source: Box<dyn RequestSource>,
    services: Vec<Box<dyn Service>>,
}

impl Dispatcher {
    /// Create a dispatcher over the inbound subscription.
    pub fn new(source: Box<dyn RequestSource>) -> Self {
        Self {
            source,
            services: Vec::new(),
        }
    }

    /// Register a service. Each key may be claimed exactly once.
    pub fn register(&mut self, service: Box<dyn Service>) -> Result<()> {
        let key = service.key();
        if self.services.iter().any(|s| s.key() == key) {
            return Err(CoreError::DuplicateKey(key.as_str()));
        }
        self.services.push(service);
        Ok(())
    }

    /// Pull and dispatch messages until the subscription closes.
    ///
    /// One message at a time: a handler (including its bounded network
    /// work) runs to completion before the next receive. Malformed payloads
    /// and failing handlers are logged and skipped.
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let raw = match self.source.recv().await {
                Ok(raw) => raw,
                Err(BusError::Closed) => {
                    info!("request subscription closed; dispatcher stopping");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            self.dispatch_raw(&raw).await;
        }
    }

    /// Decode and route a single raw payload.
    pub async fn dispatch_raw(&mut self, raw: &str) {
        REQUESTS_TOTAL.inc();

        let request = match decode_request(raw) {
            Ok(request) => request,
            Err(err) => {
                DECODE_FAILURES_TOTAL.inc();
                warn!(payload = raw, %err, "dropping undecodable request");
                return;
            }
        };

        // Multi-match on purpose: a request carrying several recognized
        // keys triggers every matching service, each with its own report.
        for service in &mut self.services {
            if !request.contains_key(service.key().as_str()) {
                continue;
            }
            if let Err(err) = service.handle(&request).await {
                HANDLER_FAILURES_TOTAL.inc();
                error!(
                    key = %service.key(),
                    payload = raw,
                    error = format!("{err:#}"),
                    "handler failed; continuing"
                );
            }
        }
    }
}
