//! The relay engine: dispatches decoded client events against the shared
//! stores and pushes the resulting server events.
//!
//! The relay owns the three concurrent stores (connection registry,
//! matchmaker, identity profiles) plus the report log. Every store call is
//! synchronous and releases its lock before the relay touches the network,
//! so a slow socket or a slow translation never blocks another connection.
//!
//! Pushes are best-effort. A push that fails or exceeds the write timeout
//! is treated exactly like that connection closing: the identity is
//! unregistered, dequeued, and its partner is told `partner_left`.

use std::sync::Arc;

use parking_lot::RwLock;
use tandem_identity::{
    DEFAULT_NATIVE_LANGUAGE, Identity, IdentityStore, ProfileUpdate, sanitize_text,
};
use tandem_match::{JoinOutcome, MatchError, Matchmaker, Pairing, Sweep};
use tandem_protocol::{
    ChatDelivery, ClientEvent, Codec, IdentityId, JoinQueue, JsonCodec, MatchFound, ReportUser,
    ServerEvent, UpdateInterests, UpdateLanguages,
};
use tandem_transport::{Connection, ConnectionId};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::report::now_millis;
use crate::translate::translate_or_original;
use crate::{ConnectionRegistry, RelayConfig, ReportLog, Translator};

/// Longest report reason kept, in characters.
const MAX_REASON_CHARS: usize = 100;

/// The result of [`Relay::quick_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuickMatch {
    /// Paired immediately; the descriptor describes the partner.
    Matched(MatchFound),
    /// Accepted into the queue at this position.
    Queued { position: usize },
}

/// Point-in-time counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayStats {
    pub online: usize,
    pub queued: usize,
    pub sessions: usize,
    pub reports: usize,
}

enum Delivery {
    Sent,
    Skipped,
    Failed(ConnectionId),
}

/// Shared relay state. One per server, behind an `Arc`.
pub struct Relay<C: Connection, T: Translator> {
    registry: ConnectionRegistry<C>,
    matchmaker: Matchmaker,
    identities: RwLock<IdentityStore>,
    reports: ReportLog,
    translator: T,
    codec: JsonCodec,
    config: RelayConfig,
}

impl<C: Connection, T: Translator> Relay<C, T> {
    pub fn new(translator: T, config: RelayConfig) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            matchmaker: Matchmaker::new(config.matching.clone()),
            identities: RwLock::new(IdentityStore::new()),
            reports: ReportLog::new(),
            translator,
            codec: JsonCodec,
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry<C> {
        &self.registry
    }

    pub fn matchmaker(&self) -> &Matchmaker {
        &self.matchmaker
    }

    pub fn reports(&self) -> &ReportLog {
        &self.reports
    }

    /// The current profile of `id`, if it ever connected.
    pub fn identity(&self, id: IdentityId) -> Option<Identity> {
        self.identities.read().get(&id).cloned()
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            online: self.registry.len(),
            queued: self.matchmaker.queue_len(),
            sessions: self.matchmaker.session_count(),
            reports: self.reports.len(),
        }
    }

    /// Returns `true` while `conn_id` is the live connection of
    /// `identity`. A superseded connection should stop reading.
    pub fn is_current(&self, identity: IdentityId, conn_id: ConnectionId) -> bool {
        self.registry.is_current(identity, conn_id)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Registers an authenticated connection and sends the welcome.
    ///
    /// A returning identity keeps its stored profile. Any older
    /// connection for the same identity is closed.
    pub async fn connect(&self, identity: Identity, conn: Arc<C>) -> Identity {
        let conn_id = conn.id();
        let identity = self.identities.write().upsert(identity);

        if let Some(old) = self.registry.register(identity.id, conn) {
            if old.id() != conn_id {
                self.close_quietly(&old).await;
            }
        }
        tracing::info!(identity = %identity.id, alias = %identity.alias, %conn_id, "connected");

        let welcome = ServerEvent::Connected {
            identity_id: identity.id,
            alias: identity.alias.clone(),
            online: self.registry.len(),
        };
        self.send_to(identity.id, &welcome).await;
        identity
    }

    /// Full cleanup for a closed connection: unregister, dequeue, tear
    /// down the session, and tell the partner.
    ///
    /// Does nothing if `conn_id` is no longer the identity's live
    /// connection, either because cleanup already ran or because a newer
    /// connection took over the identity.
    pub async fn disconnect(&self, identity: IdentityId, conn_id: ConnectionId) {
        let mut pending = vec![(identity, conn_id)];

        while let Some((identity, conn_id)) = pending.pop() {
            let Some(conn) = self.registry.unregister_if(identity, conn_id) else {
                tracing::debug!(%identity, %conn_id, "cleanup skipped, connection not current");
                continue;
            };
            tracing::info!(%identity, %conn_id, "disconnected");

            if let Some(teardown) = self.matchmaker.disconnect(identity) {
                if let Delivery::Failed(partner_conn) =
                    self.push(teardown.partner, &ServerEvent::PartnerLeft).await
                {
                    pending.push((teardown.partner, partner_conn));
                }
            }
            self.close_quietly(&conn).await;
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Handles one event from `from`. Events from one identity must be
    /// dispatched in arrival order.
    pub async fn dispatch(&self, from: IdentityId, event: ClientEvent) {
        tracing::debug!(identity = %from, event = event.kind(), "dispatch");
        match event {
            ClientEvent::JoinQueue(join) => self.join_queue(from, join).await,
            ClientEvent::LeaveQueue => self.leave_queue(from).await,
            ClientEvent::ChatMessage(chat) => self.chat(from, &chat.text).await,
            ClientEvent::Typing => self.forward(from, ServerEvent::PartnerTyping).await,
            ClientEvent::StopTyping => self.forward(from, ServerEvent::PartnerStopTyping).await,
            ClientEvent::UpdateLanguages(update) => self.update_languages(from, update).await,
            ClientEvent::UpdateInterests(update) => self.update_interests(from, update).await,
            ClientEvent::ReportUser(report) => self.report_user(from, report).await,
            ClientEvent::BlockUser => self.block_user(from).await,
            ClientEvent::LeaveRoom => self.leave_room(from).await,
            ClientEvent::Ping => self.ping(from).await,
        }
    }

    async fn join_queue(&self, from: IdentityId, join: JoinQueue) {
        let update = ProfileUpdate {
            native_language: join.native_language,
            target_language: join.target_language,
            interests: join.interests,
            region: join.region,
        };
        let snapshot = self
            .identities
            .write()
            .update(from, &update, &self.config.profile)
            .ok()
            .cloned();
        let Some(identity) = snapshot else {
            tracing::warn!(identity = %from, "join from unknown identity");
            return;
        };

        let outcome = self
            .matchmaker
            .join(identity, |id| self.registry.is_live(id));
        let reply = match outcome {
            Ok(JoinOutcome::Matched(pairing)) => {
                self.announce_match(&pairing).await;
                return;
            }
            Ok(JoinOutcome::Queued { position }) => ServerEvent::QueueJoined { position },
            Err(MatchError::AlreadyQueued(_)) => ServerEvent::AlreadyQueued,
            Err(MatchError::AlreadyInSession(_)) => ServerEvent::AlreadyInSession,
            Err(e @ MatchError::SameIdentity(_)) => {
                tracing::warn!(identity = %from, error = %e, "join refused");
                return;
            }
        };
        self.send_to(from, &reply).await;
    }

    /// Pushes `match_found` to both members of a new session.
    async fn announce_match(&self, pairing: &Pairing) {
        let to_candidate = ServerEvent::MatchFound(pairing.for_candidate());
        self.send_to(pairing.candidate.id, &to_candidate).await;
        let to_partner = ServerEvent::MatchFound(pairing.for_partner());
        self.send_to(pairing.partner.id, &to_partner).await;
    }

    async fn leave_queue(&self, from: IdentityId) {
        if self.matchmaker.leave_queue(from) {
            self.send_to(from, &ServerEvent::QueueLeft).await;
        }
    }

    async fn chat(&self, from: IdentityId, raw: &str) {
        let text = sanitize_text(raw, self.config.max_message_chars);
        if text.is_empty() {
            return;
        }
        let Some(partner) = self.matchmaker.partner_of(from) else {
            tracing::debug!(identity = %from, "chat outside a session ignored");
            return;
        };

        let (alias, target_language) = {
            let identities = self.identities.read();
            let alias = identities
                .get(&from)
                .map(|identity| identity.alias.clone())
                .unwrap_or_default();
            let target = identities
                .get(&partner)
                .map(|identity| identity.native_language.clone())
                .unwrap_or_else(|| DEFAULT_NATIVE_LANGUAGE.to_string());
            (alias, target)
        };

        let translated_text = translate_or_original(
            &self.translator,
            &text,
            &target_language,
            self.config.translation_timeout,
        )
        .await;

        let delivery = ChatDelivery {
            from: alias,
            text,
            translated_text,
            target_language,
            timestamp: now_millis(),
        };
        self.send_to(partner, &ServerEvent::ChatMessage(delivery.clone()))
            .await;
        self.send_to(from, &ServerEvent::ChatSent(delivery)).await;
    }

    /// Relays a signal to the sender's partner, if it has one.
    async fn forward(&self, from: IdentityId, event: ServerEvent) {
        if let Some(partner) = self.matchmaker.partner_of(from) {
            self.send_to(partner, &event).await;
        }
    }

    async fn update_languages(&self, from: IdentityId, update: UpdateLanguages) {
        let update = ProfileUpdate {
            native_language: update.native_language,
            target_language: update.target_language,
            ..ProfileUpdate::default()
        };
        let reply = self
            .identities
            .write()
            .update(from, &update, &self.config.profile)
            .ok()
            .map(|identity| ServerEvent::LanguagesUpdated {
                native_language: identity.native_language.clone(),
                target_language: identity.target_language.clone(),
            });
        if let Some(reply) = reply {
            self.send_to(from, &reply).await;
        }
    }

    async fn update_interests(&self, from: IdentityId, update: UpdateInterests) {
        let update = ProfileUpdate {
            interests: Some(update.interests),
            ..ProfileUpdate::default()
        };
        let reply = self
            .identities
            .write()
            .update(from, &update, &self.config.profile)
            .ok()
            .map(|identity| ServerEvent::InterestsUpdated {
                interests: identity.interests.iter().cloned().collect(),
            });
        if let Some(reply) = reply {
            self.send_to(from, &reply).await;
        }
    }

    async fn report_user(&self, from: IdentityId, report: ReportUser) {
        let Some(partner) = self.matchmaker.partner_of(from) else {
            tracing::debug!(identity = %from, "report outside a session ignored");
            return;
        };
        let report = self.reports.submit(
            from,
            partner,
            sanitize_text(&report.reason, MAX_REASON_CHARS),
            sanitize_text(&report.details, self.config.max_message_chars),
        );
        self.send_to(from, &ServerEvent::ReportSubmitted { report_id: report.id })
            .await;
    }

    async fn block_user(&self, from: IdentityId) {
        self.leave_room(from).await;
        self.send_to(from, &ServerEvent::UserBlocked).await;
    }

    async fn leave_room(&self, from: IdentityId) {
        if let Some(teardown) = self.matchmaker.leave_session(from) {
            self.send_to(teardown.partner, &ServerEvent::PartnerLeft).await;
        }
    }

    async fn ping(&self, from: IdentityId) {
        let pong = ServerEvent::Pong {
            online: self.registry.len(),
            queued: self.matchmaker.queue_len(),
        };
        self.send_to(from, &pong).await;
    }

    // -----------------------------------------------------------------------
    // Auxiliary request/response surface
    // -----------------------------------------------------------------------

    /// One matchmaking attempt outside the event stream.
    ///
    /// Records `identity` (a returning identity keeps its stored profile),
    /// then joins the same queue the event stream uses. On a match the
    /// waiting partner is pushed `match_found` over its connection and the
    /// caller's own descriptor is returned.
    ///
    /// # Errors
    /// - [`MatchError::AlreadyQueued`] if the identity is already waiting
    /// - [`MatchError::AlreadyInSession`] if it is already paired
    pub async fn quick_match(&self, identity: Identity) -> Result<QuickMatch, MatchError> {
        let identity = self.identities.write().upsert(identity);
        let outcome = self
            .matchmaker
            .join(identity, |id| self.registry.is_live(id))?;

        match outcome {
            JoinOutcome::Matched(pairing) => {
                // The caller may also hold a connection; it gets the push too.
                self.announce_match(&pairing).await;
                Ok(QuickMatch::Matched(pairing.for_candidate()))
            }
            JoinOutcome::Queued { position } => Ok(QuickMatch::Queued { position }),
        }
    }

    // -----------------------------------------------------------------------
    // Sweeping
    // -----------------------------------------------------------------------

    /// Applies queue timeouts and session expiry, notifying everyone
    /// affected.
    pub async fn sweep(&self) {
        let Sweep { timed_out, expired } = self.matchmaker.sweep();
        for id in timed_out {
            self.send_to(id, &ServerEvent::QueueTimeout).await;
        }
        for session in expired {
            for member in session.members {
                self.send_to(member, &ServerEvent::SessionExpired).await;
            }
        }
    }

    /// Runs [`sweep`](Self::sweep) every `sweep_interval` on a background
    /// task. Returns `None` when the interval is zero.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.config.sweep_interval;
        if period.is_zero() {
            return None;
        }
        let relay = Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                relay.sweep().await;
            }
        }))
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    /// Pushes `event` to `to`; a failed push disconnects `to`.
    async fn send_to(&self, to: IdentityId, event: &ServerEvent) {
        if let Delivery::Failed(conn_id) = self.push(to, event).await {
            self.disconnect(to, conn_id).await;
        }
    }

    async fn push(&self, to: IdentityId, event: &ServerEvent) -> Delivery {
        let Some(conn) = self.registry.lookup(to) else {
            return Delivery::Skipped;
        };
        let bytes = match self.codec.encode(event) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::error!(identity = %to, error = %e, "failed to encode event");
                return Delivery::Skipped;
            }
        };

        match tokio::time::timeout(self.config.write_timeout, conn.send(&bytes)).await {
            Ok(Ok(())) => Delivery::Sent,
            Ok(Err(e)) => {
                tracing::warn!(identity = %to, conn_id = %conn.id(), error = %e, "push failed");
                Delivery::Failed(conn.id())
            }
            Err(_) => {
                tracing::warn!(identity = %to, conn_id = %conn.id(), "push timed out");
                Delivery::Failed(conn.id())
            }
        }
    }

    async fn close_quietly(&self, conn: &C) {
        match tokio::time::timeout(self.config.write_timeout, conn.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!(conn_id = %conn.id(), error = %e, "close failed"),
            Err(_) => tracing::debug!(conn_id = %conn.id(), "close timed out"),
        }
    }
}
