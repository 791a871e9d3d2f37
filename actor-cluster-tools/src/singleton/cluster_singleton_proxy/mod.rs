use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bincode::{Decode, Encode};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use actor_cluster::cluster::Cluster;
use actor_cluster::leader_elector::elect_for_role;
use actor_cluster::membership_view::MembershipView;
use actor_core::Actor;
use actor_core::actor::actor_ref::ActorRef;
use actor_core::actor::address::UniqueAddress;
use actor_core::actor::context::Context;
use actor_core::actor::scheduler::ScheduleKey;
use actor_core::ext::{decode_bytes, encode_bytes};
use actor_remote::transport::{Transport, TransportError};

use crate::singleton::cluster_singleton_proxy::cluster_event_wrap::ClusterEventWrap;
use crate::singleton::cluster_singleton_proxy::cluster_singleton_proxy_settings::ClusterSingletonProxySettings;
use crate::singleton::cluster_singleton_proxy::delivery_result::DeliveryResult;
use crate::singleton::cluster_singleton_proxy::route_failed::RouteFailed;
use crate::singleton::cluster_singleton_proxy::send_request::SendRequest;
use crate::singleton::cluster_singleton_proxy::try_to_identify_singleton::TryToIdentifySingleton;
use crate::singleton::error::SingletonError;
use crate::singleton::protocol::{CorrelationId, RejectReason, SingletonEnvelope, SingletonFrame, SingletonReply};
use crate::singleton::singleton_endpoint::request_reply;

pub mod cluster_singleton_proxy_settings;
mod cluster_event_wrap;
mod delivery_result;
mod identify_result;
mod request_timeout;
mod route_failed;
mod send_request;
mod try_to_identify_singleton;

pub(crate) type ReplySender = oneshot::Sender<Result<Vec<u8>, SingletonError>>;

/// Forwards requests to the node hosting the singleton. Requests are kept in arrival order
/// until a host is identified and are delivered through one ordered outbound pipeline per route.
pub struct ClusterSingletonProxy {
    cluster: Cluster,
    transport: Arc<dyn Transport>,
    settings: ClusterSingletonProxySettings,
    view: Arc<MembershipView>,
    target: Option<UniqueAddress>,
    route: Option<ProxyRoute>,
    identify_timer: Option<ScheduleKey>,
    next_sequence: u64,
    next_route_id: u64,
    pending: BTreeMap<u64, PendingRequest>,
}

/// The believed singleton host and the pipeline delivering to it.
#[derive(Debug)]
struct ProxyRoute {
    id: u64,
    host: UniqueAddress,
    generation: u64,
    outbound: UnboundedSender<Outbound>,
    handle: AbortHandle,
}

#[derive(Debug)]
struct PendingRequest {
    idempotency_key: Option<String>,
    payload: Vec<u8>,
    reply: ReplySender,
    status: DeliveryStatus,
    attempts: u32,
    timeout: ScheduleKey,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum DeliveryStatus {
    Buffered,
    InFlight,
}

#[derive(Debug)]
struct Outbound {
    sequence: u64,
    envelope: SingletonEnvelope,
}

#[derive(Debug)]
pub(crate) enum DeliveryFailure {
    Transport(TransportError),
    NotActive,
}

impl Debug for ClusterSingletonProxy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSingletonProxy")
            .field("node", &self.cluster.self_unique_address)
            .field("settings", &self.settings)
            .field("target", &self.target)
            .field("route", &self.route)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl ClusterSingletonProxy {
    pub(crate) fn new(cluster: Cluster, transport: Arc<dyn Transport>, settings: ClusterSingletonProxySettings) -> Self {
        Self {
            cluster,
            transport,
            settings,
            view: Arc::new(MembershipView::new()),
            target: None,
            route: None,
            identify_timer: None,
            next_sequence: 0,
            next_route_id: 0,
            pending: BTreeMap::new(),
        }
    }

    fn singleton_name(&self) -> &str {
        &self.settings.singleton_name
    }

    fn elected_leader(&self) -> Option<UniqueAddress> {
        elect_for_role(&self.view, self.settings.role.as_deref()).leader.map(|m| m.unique_address)
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.identify_timer.take() {
            timer.cancel();
        }
    }

    fn on_view_changed(&mut self, context: &mut Context<Self>, view: Arc<MembershipView>) {
        self.view = view;
        let elected = self.elected_leader();
        if let Some(route) = &self.route {
            if Some(&route.host) == elected.as_ref() {
                return;
            }
            info!("singleton proxy {} host {} no longer elected", self.singleton_name(), route.host);
        } else if elected == self.target && (self.identify_timer.is_some() || elected.is_none()) {
            return;
        }
        self.drop_route();
        self.identify_singleton(context);
    }

    /// Identify the elected leader until it answers as the active host.
    fn identify_singleton(&mut self, context: &mut Context<Self>) {
        self.cancel_timer();
        self.target = self.elected_leader();
        match &self.target {
            None => {
                debug!("singleton proxy {} has no elected host, buffer {} requests", self.singleton_name(), self.pending.len());
            }
            Some(target) => {
                debug!("singleton proxy {} start identify singleton at {}", self.singleton_name(), target);
                let myself = context.myself().clone();
                let timer = context.scheduler().schedule_with_fixed_delay(
                    Some(Duration::ZERO),
                    self.settings.singleton_identification_interval,
                    move || { myself.cast(TryToIdentifySingleton); },
                );
                self.identify_timer = Some(timer);
            }
        }
    }

    fn establish_route(&mut self, context: &mut Context<Self>, host: UniqueAddress) {
        self.cancel_timer();
        self.drop_route();
        let id = self.next_route_id;
        self.next_route_id += 1;
        let (tx, rx) = unbounded_channel();
        let pipeline = run_outbound(
            id,
            host.clone(),
            self.transport.clone(),
            context.myself().clone(),
            rx,
            self.settings.delivery_timeout,
        );
        let handle = context.spawn_fut(pipeline);
        info!("singleton proxy {} identified singleton at {}", self.singleton_name(), host);
        self.route = Some(ProxyRoute {
            id,
            host,
            generation: self.view.generation(),
            outbound: tx,
            handle,
        });
        self.flush();
    }

    /// Stop the current pipeline. Requests it did not answer are buffered again at their
    /// arrival position.
    fn drop_route(&mut self) {
        if let Some(route) = self.route.take() {
            debug!("singleton proxy {} drop route {} to {} of generation {}", self.singleton_name(), route.id, route.host, route.generation);
            route.handle.abort();
        }
        for request in self.pending.values_mut() {
            request.status = DeliveryStatus::Buffered;
        }
    }

    /// Hand every buffered request to the pipeline in arrival order.
    fn flush(&mut self) {
        let Self { cluster, settings, route, pending, .. } = self;
        let Some(route) = route else {
            return;
        };
        for (sequence, request) in pending.iter_mut().filter(|(_, r)| r.status == DeliveryStatus::Buffered) {
            let envelope = SingletonEnvelope {
                singleton: settings.singleton_name.clone(),
                frame: SingletonFrame::Request {
                    correlation_id: CorrelationId {
                        origin: cluster.self_unique_address.clone(),
                        sequence: *sequence,
                    },
                    idempotency_key: request.idempotency_key.clone(),
                    payload: request.payload.clone(),
                },
            };
            let outbound = Outbound {
                sequence: *sequence,
                envelope,
            };
            if route.outbound.send(outbound).is_err() {
                break;
            }
            request.status = DeliveryStatus::InFlight;
        }
    }

    fn enforce_buffer_size(&mut self) {
        let buffer_size = self.settings.buffer_size;
        loop {
            let buffered = self.pending.iter().filter(|(_, r)| r.status == DeliveryStatus::Buffered);
            if buffered.clone().count() <= buffer_size {
                break;
            }
            let oldest = buffered.map(|(sequence, _)| *sequence).next();
            let Some(oldest) = oldest else {
                break;
            };
            warn!("singleton proxy {} buffer full({}), drop oldest request {}", self.singleton_name(), buffer_size, oldest);
            self.complete(oldest, Err(SingletonError::BufferOverflow(buffer_size)));
        }
    }

    /// Answer request `sequence`. Every request is answered at most once.
    fn complete(&mut self, sequence: u64, result: Result<Vec<u8>, SingletonError>) -> bool {
        match self.pending.remove(&sequence) {
            Some(request) => {
                request.timeout.cancel();
                let _ = request.reply.send(result);
                true
            }
            None => false,
        }
    }

    fn on_delivery_failed(&mut self, sequence: u64, failure: DeliveryFailure) {
        let max_attempts = self.settings.max_delivery_attempts;
        let host = self.route.as_ref().map(|r| r.host.clone());
        match failure {
            DeliveryFailure::Transport(error) => {
                let exhausted = match self.pending.get_mut(&sequence) {
                    Some(request) => {
                        request.attempts += 1;
                        request.attempts >= max_attempts
                    }
                    None => false,
                };
                warn!("singleton proxy {} deliver request {} to {:?} failed: {}", self.singleton_name(), sequence, host, error);
                if exhausted {
                    let unreachable = SingletonError::UnreachableTarget {
                        target: host,
                        attempts: max_attempts,
                    };
                    self.complete(sequence, Err(unreachable));
                }
            }
            DeliveryFailure::NotActive => {
                debug!("singleton proxy {} host {:?} not active, request {} buffered again", self.singleton_name(), host, sequence);
            }
        }
    }
}

async fn run_outbound(
    route_id: u64,
    host: UniqueAddress,
    transport: Arc<dyn Transport>,
    myself: ActorRef<ClusterSingletonProxy>,
    mut rx: UnboundedReceiver<Outbound>,
    delivery_timeout: Duration,
) {
    while let Some(Outbound { sequence, envelope }) = rx.recv().await {
        let failure = match request_reply(&*transport, &host, &envelope, delivery_timeout).await {
            Ok(SingletonReply::Rejected { reason: RejectReason::NotActive, .. }) => DeliveryFailure::NotActive,
            Ok(reply) => {
                myself.cast(DeliveryResult { sequence, reply });
                continue;
            }
            Err(error) => DeliveryFailure::Transport(error),
        };
        myself.cast(RouteFailed { route_id, sequence, failure });
        break;
    }
}

#[async_trait]
impl Actor for ClusterSingletonProxy {
    async fn started(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        self.cluster.subscribe(context.myself().clone(), ClusterEventWrap)?;
        Ok(())
    }

    async fn stopped(&mut self, _context: &mut Context<Self>) -> anyhow::Result<()> {
        self.cancel_timer();
        self.drop_route();
        let pending = std::mem::take(&mut self.pending);
        for (_, request) in pending {
            request.timeout.cancel();
            let _ = request.reply.send(Err(SingletonError::ProxyTerminated));
        }
        Ok(())
    }
}

/// Handle of a running [`ClusterSingletonProxy`].
#[derive(Debug, Clone)]
pub struct ClusterSingletonProxyRef {
    proxy: ActorRef<ClusterSingletonProxy>,
}

impl ClusterSingletonProxyRef {
    pub(crate) fn new(proxy: ActorRef<ClusterSingletonProxy>) -> Self {
        Self { proxy }
    }

    pub async fn send(&self, payload: Vec<u8>) -> Result<Vec<u8>, SingletonError> {
        self.send_with_key(payload, None).await
    }

    /// Send with an idempotency key, a host answers repeated keys from its response cache.
    pub async fn send_with_key(&self, payload: Vec<u8>, idempotency_key: Option<String>) -> Result<Vec<u8>, SingletonError> {
        let (tx, rx) = oneshot::channel();
        let request = SendRequest {
            payload,
            idempotency_key,
            reply: tx,
        };
        self.proxy.try_cast(request).map_err(|_| SingletonError::ProxyTerminated)?;
        rx.await.map_err(|_| SingletonError::ProxyTerminated)?
    }

    pub async fn ask<Req, Resp>(&self, request: &Req) -> Result<Resp, SingletonError>
        where
            Req: Encode,
            Resp: Decode<()> {
        let payload = encode_bytes(request).map_err(|error| SingletonError::Codec(format!("{:#}", error)))?;
        let response = self.send(payload).await?;
        decode_bytes(&response).map_err(|error| SingletonError::Codec(format!("{:#}", error)))
    }

    pub fn stop(&self) {
        self.proxy.stop();
    }

    pub fn is_terminated(&self) -> bool {
        self.proxy.is_terminated()
    }
}
