use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::sync::{broadcast, oneshot, watch};
use tracing::{debug, error, info, warn};

use actor_cluster::cluster::Cluster;
use actor_cluster::leader_elector::elect_for_role;
use actor_cluster::membership_view::MembershipView;
use actor_core::Actor;
use actor_core::actor::actor_ref::ActorRef;
use actor_core::actor::address::UniqueAddress;
use actor_core::actor::context::Context;
use actor_core::actor::scheduler::ScheduleKey;
use actor_remote::transport::Transport;

use crate::singleton::{Singleton, SingletonProps, SingletonRequest};
use crate::singleton::cluster_singleton_manager::cluster_event_wrap::ClusterEventWrap;
use crate::singleton::cluster_singleton_manager::cluster_singleton_manager_settings::ClusterSingletonManagerSettings;
use crate::singleton::cluster_singleton_manager::cooldown_elapsed::CooldownElapsed;
use crate::singleton::cluster_singleton_manager::hand_over_response::HandOverResponse;
use crate::singleton::cluster_singleton_manager::hand_over_retry::HandOverRetry;
use crate::singleton::cluster_singleton_manager::shutdown_singleton::ShutdownSingleton;
use crate::singleton::cluster_singleton_manager::yield_elapsed::YieldElapsed;
use crate::singleton::dedup_cache::DedupCache;
use crate::singleton::error::SingletonError;
use crate::singleton::lifecycle::{LifecycleEvent, LifecycleState};
use crate::singleton::protocol::{CorrelationId, HandoverToken, RejectReason, SingletonEnvelope, SingletonFrame, SingletonReply};
use crate::singleton::singleton_endpoint::request_reply;

pub mod cluster_singleton_manager_settings;
mod cluster_event_wrap;
mod cooldown_elapsed;
mod hand_over_response;
mod hand_over_retry;
pub(crate) mod inbound_frame;
mod shutdown_singleton;
mod yield_elapsed;

const LIFECYCLE_EVENT_CAPACITY: usize = 64;

/// Runs on every node and hosts the singleton instance while the local node is the elected
/// leader. Leadership is level triggered: the manager compares "am I the leader" against its
/// state on every view change and only acts when they disagree.
pub struct ClusterSingletonManager {
    cluster: Cluster,
    transport: Arc<dyn Transport>,
    props: SingletonProps,
    settings: ClusterSingletonManagerSettings,
    view: Arc<MembershipView>,
    state: LifecycleState,
    state_tx: watch::Sender<LifecycleState>,
    events: broadcast::Sender<LifecycleEvent>,
    instance: Option<Box<dyn Singleton>>,
    leading: bool,
    last_leader: Option<UniqueAddress>,
    previous_leader: Option<UniqueAddress>,
    handover: Option<PendingHandover>,
    cooldown_timer: Option<ScheduleKey>,
    yield_to: Option<UniqueAddress>,
    yield_timer: Option<ScheduleKey>,
    shutdown_requested: bool,
    dedup: DedupCache,
}

#[derive(Debug)]
struct PendingHandover {
    token: HandoverToken,
    attempts: u32,
    retry_timer: ScheduleKey,
}

impl Debug for ClusterSingletonManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSingletonManager")
            .field("node", &self.cluster.self_unique_address)
            .field("settings", &self.settings)
            .field("state", &self.state)
            .field("leading", &self.leading)
            .field("previous_leader", &self.previous_leader)
            .field("handover", &self.handover)
            .field("yield_to", &self.yield_to)
            .field("shutdown_requested", &self.shutdown_requested)
            .finish_non_exhaustive()
    }
}

impl ClusterSingletonManager {
    pub(crate) fn new(
        cluster: Cluster,
        transport: Arc<dyn Transport>,
        props: SingletonProps,
        settings: ClusterSingletonManagerSettings,
    ) -> (Self, broadcast::Sender<LifecycleEvent>, watch::Receiver<LifecycleState>) {
        let (state_tx, state_rx) = watch::channel(LifecycleState::Idle);
        let (events, _) = broadcast::channel(LIFECYCLE_EVENT_CAPACITY);
        let dedup = DedupCache::new(settings.dedup_capacity);
        let manager = Self {
            cluster,
            transport,
            props,
            settings,
            view: Arc::new(MembershipView::new()),
            state: LifecycleState::Idle,
            state_tx,
            events: events.clone(),
            instance: None,
            leading: false,
            last_leader: None,
            previous_leader: None,
            handover: None,
            cooldown_timer: None,
            yield_to: None,
            yield_timer: None,
            shutdown_requested: false,
            dedup,
        };
        (manager, events, state_rx)
    }

    fn singleton_name(&self) -> &str {
        &self.settings.singleton_name
    }

    fn self_address(&self) -> &UniqueAddress {
        &self.cluster.self_unique_address
    }

    fn elected_leader(&self) -> Option<UniqueAddress> {
        elect_for_role(&self.view, self.settings.role.as_deref()).leader.map(|m| m.unique_address)
    }

    /// First candidate other than this node, used to shorten the gap after a stop.
    fn successor(&self) -> Option<UniqueAddress> {
        self.view
            .leader_candidate_order_for_role(self.settings.role.as_deref())
            .into_iter()
            .map(|m| &m.unique_address)
            .find(|address| *address != self.self_address())
            .cloned()
    }

    fn should_lead(&self) -> bool {
        self.elected_leader().as_ref() == Some(self.self_address())
            && self.cooldown_timer.is_none()
            && self.yield_to.is_none()
            && !self.shutdown_requested
    }

    fn set_state(&mut self, state: LifecycleState) {
        if self.state != state {
            debug!("singleton manager {} {} -> {}", self.singleton_name(), self.state, state);
            self.state = state;
            self.state_tx.send_replace(state);
        }
    }

    fn emit(&self, event: LifecycleEvent) {
        let _ = self.events.send(event);
    }

    /// Report leadership edges. Edges are only reported here, the state machine itself is
    /// driven by [`ClusterSingletonManager::reconcile`].
    fn track_leadership(&mut self, lead: bool) {
        let generation = self.view.generation();
        if lead && !self.leading {
            self.leading = true;
            info!("singleton manager {} on {} became leader at generation {}", self.singleton_name(), self.self_address(), generation);
            self.emit(LifecycleEvent::BecameLeader { generation });
        } else if !lead && self.leading {
            self.leading = false;
            info!("singleton manager {} on {} lost leadership at generation {}", self.singleton_name(), self.self_address(), generation);
            self.emit(LifecycleEvent::LostLeadership { generation });
        }
    }

    async fn on_view_changed(&mut self, context: &mut Context<Self>, view: Arc<MembershipView>) {
        self.view = view;
        let elected = self.elected_leader();
        if elected != self.last_leader {
            if let Some(last) = self.last_leader.take() {
                if &last != self.self_address() {
                    self.previous_leader = Some(last);
                }
            }
            self.last_leader = elected.clone();
        }
        if let Some(claimant) = &self.yield_to {
            if elected.as_ref() != Some(self.self_address()) || self.view.is_gone(claimant) {
                info!("singleton manager {} view agrees again, stop yielding to {}", self.singleton_name(), claimant);
                self.end_yield();
            }
        }
        self.reconcile(context).await;
    }

    async fn reconcile(&mut self, context: &mut Context<Self>) {
        let lead = self.should_lead();
        self.track_leadership(lead);
        match self.state {
            LifecycleState::Idle => {
                if lead {
                    let gone_previous = self.handover
                        .as_ref()
                        .map(|pending| Some(&pending.token.from).filter(|from| self.view.is_gone(from)).cloned());
                    match gone_previous {
                        Some(Some(previous)) => {
                            info!("singleton manager {} previous leader {} is gone, take over", self.singleton_name(), previous);
                            self.start_instance(context).await;
                        }
                        Some(None) => {}
                        None => {
                            let previous = self.previous_leader
                                .clone()
                                .filter(|previous| previous != self.self_address() && !self.view.is_gone(previous));
                            match previous {
                                Some(previous) => self.request_hand_over(context, previous),
                                None => self.start_instance(context).await,
                            }
                        }
                    }
                } else if self.handover.is_some() {
                    self.cancel_hand_over();
                }
            }
            LifecycleState::Active => {
                if !lead {
                    self.stop_instance(context).await;
                }
            }
            LifecycleState::Starting | LifecycleState::Stopping => {}
        }
    }

    fn request_hand_over(&mut self, context: &mut Context<Self>, previous: UniqueAddress) {
        let token = HandoverToken {
            generation: self.view.generation(),
            from: previous,
            to: self.self_address().clone(),
        };
        info!("singleton manager {} request hand over with {}", self.singleton_name(), token);
        let myself = context.myself().clone();
        let retry_timer = context.scheduler().schedule_with_fixed_delay(
            None,
            self.settings.hand_over_retry_interval,
            move || { myself.cast(HandOverRetry); },
        );
        self.send_hand_over_to_me(context, token.clone());
        self.handover = Some(PendingHandover {
            token,
            attempts: 1,
            retry_timer,
        });
    }

    fn send_hand_over_to_me(&self, context: &mut Context<Self>, token: HandoverToken) {
        let envelope = SingletonEnvelope {
            singleton: self.singleton_name().to_string(),
            frame: SingletonFrame::HandOverToMe(token.clone()),
        };
        let transport = self.transport.clone();
        let timeout = self.settings.hand_over_retry_interval;
        let myself = context.myself().clone();
        context.spawn_fut(async move {
            let result = request_reply(&*transport, &token.from, &envelope, timeout).await;
            myself.cast(HandOverResponse { token, result });
        });
    }

    fn send_take_over_from_me(&self, context: &mut Context<Self>, successor: UniqueAddress) {
        let token = HandoverToken {
            generation: self.view.generation(),
            from: self.self_address().clone(),
            to: successor,
        };
        debug!("singleton manager {} send take over with {}", self.singleton_name(), token);
        let envelope = SingletonEnvelope {
            singleton: self.singleton_name().to_string(),
            frame: SingletonFrame::TakeOverFromMe(token.clone()),
        };
        let transport = self.transport.clone();
        let timeout = self.settings.hand_over_retry_interval;
        context.spawn_fut(async move {
            if let Err(error) = request_reply(&*transport, &token.to, &envelope, timeout).await {
                debug!("send take over to {} failed: {}", token.to, error);
            }
        });
    }

    /// Step aside for `claimant`, which believes it is the leader while this node still elects
    /// itself. The yield ends when `claimant` hands back with `TakeOverFromMe`, when the views
    /// agree again, or after `cooldown`.
    fn begin_yield(&mut self, context: &mut Context<Self>, claimant: UniqueAddress) {
        self.end_yield();
        let myself = context.myself().clone();
        let timer = context.scheduler().schedule_once(self.settings.cooldown, move || { myself.cast(YieldElapsed); });
        self.yield_to = Some(claimant);
        self.yield_timer = Some(timer);
    }

    fn end_yield(&mut self) -> Option<UniqueAddress> {
        if let Some(timer) = self.yield_timer.take() {
            timer.cancel();
        }
        self.yield_to.take()
    }

    fn cancel_hand_over(&mut self) {
        if let Some(pending) = self.handover.take() {
            debug!("singleton manager {} cancel hand over {}", self.singleton_name(), pending.token);
            pending.retry_timer.cancel();
        }
    }

    async fn start_instance(&mut self, context: &mut Context<Self>) {
        self.cancel_hand_over();
        self.previous_leader = None;
        self.set_state(LifecycleState::Starting);
        let start_timeout = self.settings.start_timeout;
        let started = match self.props.create() {
            Ok(mut instance) => {
                match tokio::time::timeout(start_timeout, instance.started()).await {
                    Ok(Ok(())) => Ok(instance),
                    Ok(Err(error)) => Err(format!("{:#}", error)),
                    Err(_) => Err(format!("start timeout after {:?}", start_timeout)),
                }
            }
            Err(error) => Err(format!("{:#}", error)),
        };
        match started {
            Ok(instance) => {
                self.instance = Some(instance);
                self.dedup.clear();
                self.set_state(LifecycleState::Active);
                info!("singleton manager {} start singleton actor on {}", self.singleton_name(), self.self_address());
                self.emit(LifecycleEvent::InstanceStarted);
            }
            Err(reason) => {
                let failure = SingletonError::InstanceStartFailure {
                    singleton: self.singleton_name().to_string(),
                    reason: reason.clone(),
                };
                error!("{}", failure);
                self.set_state(LifecycleState::Idle);
                self.emit(LifecycleEvent::InstanceStartFailed { reason });
                self.begin_cooldown(context);
                self.track_leadership(false);
            }
        }
    }

    async fn stop_instance(&mut self, context: &mut Context<Self>) {
        let Some(mut instance) = self.instance.take() else {
            self.set_state(LifecycleState::Idle);
            return;
        };
        self.set_state(LifecycleState::Stopping);
        info!("singleton manager {} stop singleton actor on {}", self.singleton_name(), self.self_address());
        match tokio::time::timeout(self.settings.stop_timeout, instance.stopped()).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!("singleton {} stop error {:?}", self.singleton_name(), error),
            Err(_) => warn!("singleton {} stop timeout after {:?}", self.singleton_name(), self.settings.stop_timeout),
        }
        drop(instance);
        self.dedup.clear();
        self.set_state(LifecycleState::Idle);
        self.emit(LifecycleEvent::InstanceStopped);
        if let Some(successor) = self.yield_to.clone().or_else(|| self.successor()) {
            self.send_take_over_from_me(context, successor);
        }
    }

    fn begin_cooldown(&mut self, context: &mut Context<Self>) {
        let cooldown = self.settings.cooldown;
        if let Some(timer) = self.cooldown_timer.take() {
            timer.cancel();
        }
        let myself = context.myself().clone();
        let timer = context.scheduler().schedule_once(cooldown, move || { myself.cast(CooldownElapsed); });
        self.cooldown_timer = Some(timer);
        warn!("singleton manager {} on {} cede leadership for {:?}", self.singleton_name(), self.self_address(), cooldown);
        self.cluster.protocol().cede_leadership(self.self_address(), cooldown);
    }

    async fn handle_request(&mut self, correlation_id: CorrelationId, idempotency_key: Option<String>, payload: Vec<u8>) -> SingletonReply {
        let not_active = SingletonReply::Rejected {
            correlation_id: correlation_id.clone(),
            reason: RejectReason::NotActive,
        };
        if self.state != LifecycleState::Active {
            return not_active;
        }
        if let Some(cached) = idempotency_key.as_deref().and_then(|key| self.dedup.get(key)) {
            debug!("singleton {} answer duplicate request {} from cache", self.settings.singleton_name, correlation_id);
            return SingletonReply::Response {
                correlation_id,
                payload: cached.clone(),
            };
        }
        let Some(instance) = self.instance.as_mut() else {
            return not_active;
        };
        let request = SingletonRequest {
            correlation_id: correlation_id.clone(),
            idempotency_key: idempotency_key.clone(),
            payload,
        };
        match instance.handle(request).await {
            Ok(payload) => {
                if let Some(key) = idempotency_key {
                    self.dedup.insert(key, payload.clone());
                }
                SingletonReply::Response {
                    correlation_id,
                    payload,
                }
            }
            Err(error) => {
                warn!("singleton {} handle request {} error {:?}", self.settings.singleton_name, correlation_id, error);
                SingletonReply::Rejected {
                    correlation_id,
                    reason: RejectReason::Failed(format!("{:#}", error)),
                }
            }
        }
    }

    async fn shutdown(&mut self, context: &mut Context<Self>) {
        self.shutdown_requested = true;
        self.cancel_hand_over();
        self.track_leadership(false);
        if self.state == LifecycleState::Active {
            self.stop_instance(context).await;
        }
        info!("singleton manager {} on {} shutdown, leave cluster", self.singleton_name(), self.self_address());
        self.cluster.leave();
    }
}

#[async_trait]
impl Actor for ClusterSingletonManager {
    async fn started(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        if let Some(role) = &self.settings.role {
            if !self.cluster.roles.contains(role) {
                debug!("{} does not have role {}, singleton {} is never hosted here", self.self_address(), role, self.singleton_name());
            }
        }
        self.cluster.subscribe(context.myself().clone(), ClusterEventWrap)?;
        Ok(())
    }

    async fn stopped(&mut self, context: &mut Context<Self>) -> anyhow::Result<()> {
        self.cancel_hand_over();
        self.end_yield();
        self.track_leadership(false);
        if let Some(mut instance) = self.instance.take() {
            self.set_state(LifecycleState::Stopping);
            match tokio::time::timeout(self.settings.stop_timeout, instance.stopped()).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => warn!("singleton {} stop error {:?}", self.singleton_name(), error),
                Err(_) => warn!("singleton {} stop timeout after {:?}", self.singleton_name(), self.settings.stop_timeout),
            }
            self.emit(LifecycleEvent::InstanceStopped);
        }
        self.set_state(LifecycleState::Idle);
        debug!("singleton manager {} on {} stopped, {}", self.singleton_name(), self.self_address(), context.myself());
        Ok(())
    }
}

/// Handle of a running [`ClusterSingletonManager`].
#[derive(Clone)]
pub struct ClusterSingletonManagerRef {
    manager: ActorRef<ClusterSingletonManager>,
    events: broadcast::Sender<LifecycleEvent>,
    state: watch::Receiver<LifecycleState>,
}

impl Debug for ClusterSingletonManagerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSingletonManagerRef")
            .field("manager", &self.manager)
            .field("state", &*self.state.borrow())
            .finish()
    }
}

impl ClusterSingletonManagerRef {
    pub(crate) fn new(
        manager: ActorRef<ClusterSingletonManager>,
        events: broadcast::Sender<LifecycleEvent>,
        state: watch::Receiver<LifecycleState>,
    ) -> Self {
        Self {
            manager,
            events,
            state,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<LifecycleState> {
        self.state.clone()
    }

    /// Stop the local instance if there is one, then leave the cluster. Resolves once the
    /// instance is stopped.
    pub async fn request_shutdown(&self) -> anyhow::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.manager.try_cast(ShutdownSingleton(tx))?;
        rx.await.context("singleton manager stopped before shutdown completed")?;
        Ok(())
    }

    /// Stop the manager without handover or leaving the cluster.
    pub fn stop(&self) {
        self.manager.stop();
    }

    pub fn is_terminated(&self) -> bool {
        self.manager.is_terminated()
    }
}
