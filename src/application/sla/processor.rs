//! SlaProcessor - periodic sweep over SLA deadlines and idle chatbot contacts.
//!
//! Every tick loads the tenants with SLA tracking enabled and runs four
//! passes per tenant:
//!
//! 1. **Auto-close** - expire transfers past `expires_at`
//! 2. **Escalate** - raise the level of transfers past `escalation_at`
//! 3. **Breach** - flag unassigned transfers past their response deadline
//! 4. **Inactivity** - remind or close contacts that stopped answering the chatbot
//!
//! Passes are independent. A failing pass, or a failing item inside one, is
//! logged and counted in the [`TickReport`]; the rest of the tick carries on.
//!
//! ## Graceful Shutdown
//!
//! [`SlaProcessor::run`] watches a shutdown channel between and during
//! ticks. A stop signal abandons the tick in flight.

use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::application::cache::SlaSettingsCache;
use crate::application::delivery::send_with_timeout;
use crate::domain::chatbot::SessionStatus;
use crate::domain::foundation::{ContactId, DomainError, TenantId, Timestamp};
use crate::domain::messaging::{Contact, OutboundKind, OutboundMessage};
use crate::domain::sla::{
    inactivity_action, AgentTransfer, EscalationOutcome, InactivityAction, SlaSettings,
};
use crate::ports::{
    Broadcaster, ChatbotSessionRepository, ContactRepository, MessageSender,
    OutboundMessageRepository, TransferRepository,
};

/// Configuration for the SLA processor.
#[derive(Debug, Clone)]
pub struct SlaProcessorConfig {
    pub tick_interval: Duration,
    /// Upper bound for each automated send.
    pub send_timeout: Duration,
}

impl Default for SlaProcessorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            send_timeout: Duration::from_secs(10),
        }
    }
}

impl SlaProcessorConfig {
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

/// Counts of what one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tenants: usize,
    pub expired: usize,
    pub escalated: usize,
    pub deferred: usize,
    pub breached: usize,
    pub reminders: usize,
    pub closed: usize,
    pub failures: usize,
}

/// Collaborators the processor reads and writes.
pub struct SlaProcessorDeps {
    pub settings: Arc<SlaSettingsCache>,
    pub transfers: Arc<dyn TransferRepository>,
    pub contacts: Arc<dyn ContactRepository>,
    pub sessions: Arc<dyn ChatbotSessionRepository>,
    pub outbound: Arc<dyn OutboundMessageRepository>,
    pub sender: Arc<dyn MessageSender>,
    pub broadcaster: Arc<dyn Broadcaster>,
}

pub struct SlaProcessor {
    settings: Arc<SlaSettingsCache>,
    transfers: Arc<dyn TransferRepository>,
    contacts: Arc<dyn ContactRepository>,
    sessions: Arc<dyn ChatbotSessionRepository>,
    outbound: Arc<dyn OutboundMessageRepository>,
    sender: Arc<dyn MessageSender>,
    broadcaster: Arc<dyn Broadcaster>,
    config: SlaProcessorConfig,
}

/// Running processor task.
pub struct SlaProcessorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SlaProcessorHandle {
    /// Signals the loop to stop and waits for it to finish.
    pub async fn stop(self) {
        // The loop also stops when every sender is gone.
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "SLA processor task failed");
        }
    }
}

impl SlaProcessor {
    pub fn new(deps: SlaProcessorDeps, config: SlaProcessorConfig) -> Self {
        Self {
            settings: deps.settings,
            transfers: deps.transfers,
            contacts: deps.contacts,
            sessions: deps.sessions,
            outbound: deps.outbound,
            sender: deps.sender,
            broadcaster: deps.broadcaster,
            config,
        }
    }

    /// Spawns the loop on the current runtime.
    pub fn start(self: Arc<Self>) -> SlaProcessorHandle {
        let (shutdown, receiver) = watch::channel(false);
        let task = tokio::spawn(async move { self.run(receiver).await });
        SlaProcessorHandle { shutdown, task }
    }

    /// Ticks on the configured interval until `shutdown` turns true or its
    /// sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut interval = time::interval(self.config.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::info!(
            tick_interval_ms = self.config.tick_interval.as_millis() as u64,
            "SLA processor started"
        );

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    tokio::select! {
                        report = self.tick(Timestamp::now()) => {
                            tracing::debug!(?report, "SLA tick finished");
                        }
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                tracing::info!("Abandoning SLA tick in flight");
                                break;
                            }
                        }
                    }
                }
            }
        }

        tracing::info!("SLA processor stopped");
    }

    /// Runs every pass for every enabled tenant at `now`.
    pub async fn tick(&self, now: Timestamp) -> TickReport {
        let mut report = TickReport::default();

        let tenants = match self.settings.enabled_tenants().await {
            Ok(tenants) => tenants,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to load SLA-enabled tenants");
                report.failures += 1;
                return report;
            }
        };

        for settings in tenants.iter() {
            report.tenants += 1;
            self.process_tenant(settings, now, &mut report).await;
        }
        report
    }

    async fn process_tenant(&self, settings: &SlaSettings, now: Timestamp, report: &mut TickReport) {
        let tenant_id = settings.tenant_id;

        if let Err(err) = self.auto_close_pass(settings, now, report).await {
            pass_failed("auto_close", &tenant_id, &err, report);
        }
        if let Err(err) = self.escalation_pass(settings, now, report).await {
            pass_failed("escalation", &tenant_id, &err, report);
        }
        if let Err(err) = self.breach_pass(&tenant_id, now, report).await {
            pass_failed("breach", &tenant_id, &err, report);
        }
        if let Err(err) = self.inactivity_pass(settings, now, report).await {
            pass_failed("inactivity", &tenant_id, &err, report);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Auto-close
    // ─────────────────────────────────────────────────────────────────────────

    async fn auto_close_pass(
        &self,
        settings: &SlaSettings,
        now: Timestamp,
        report: &mut TickReport,
    ) -> Result<(), DomainError> {
        let expired = self.transfers.list_expired(&settings.tenant_id, &now).await?;
        for transfer in expired {
            match self.auto_close(settings, &transfer, now).await {
                Ok(true) => report.expired += 1,
                Ok(false) => {}
                Err(err) => item_failed("auto_close", &transfer, &err, report),
            }
        }
        Ok(())
    }

    /// Returns false when the transfer stopped being active before it could be expired.
    async fn auto_close(
        &self,
        settings: &SlaSettings,
        transfer: &AgentTransfer,
        now: Timestamp,
    ) -> Result<bool, DomainError> {
        if let Some(text) = settings.auto_close_text() {
            if let Err(err) = self
                .dispatch(
                    transfer.tenant_id,
                    Some(transfer.contact_id),
                    &transfer.account,
                    &transfer.phone,
                    text,
                    OutboundKind::TransferAutoClose,
                    now,
                )
                .await
            {
                tracing::warn!(transfer_id = %transfer.id, error = %err, "Failed to record auto-close message");
            }
        }

        if !self
            .transfers
            .expire(&transfer.tenant_id, &transfer.id, &now)
            .await?
        {
            tracing::debug!(transfer_id = %transfer.id, "Transfer no longer active, not auto-closed");
            return Ok(false);
        }
        tracing::info!(tenant_id = %transfer.tenant_id, transfer_id = %transfer.id, "Transfer auto-closed");

        self.broadcast(
            &transfer.tenant_id,
            "transfer.expired",
            json!({
                "transfer_id": transfer.id,
                "contact_id": transfer.contact_id,
                "ended_at": now,
            }),
        )
        .await;
        Ok(true)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Escalation
    // ─────────────────────────────────────────────────────────────────────────

    async fn escalation_pass(
        &self,
        settings: &SlaSettings,
        now: Timestamp,
        report: &mut TickReport,
    ) -> Result<(), DomainError> {
        let due = self
            .transfers
            .list_due_for_escalation(&settings.tenant_id, &now)
            .await?;
        for mut transfer in due {
            match self.escalate(settings, &mut transfer, now).await {
                Ok(None) => {}
                Ok(Some(EscalationOutcome::Deferred)) => report.deferred += 1,
                Ok(Some(EscalationOutcome::Escalated { newly_breached, .. })) => {
                    report.escalated += 1;
                    if newly_breached {
                        report.breached += 1;
                    }
                }
                Err(err) => item_failed("escalation", &transfer, &err, report),
            }
        }
        Ok(())
    }

    /// Only the escalation markers are written back, so a pick-up or agent
    /// reply stored while this tick runs is kept. Returns `None` when the
    /// transfer stopped being active.
    async fn escalate(
        &self,
        settings: &SlaSettings,
        transfer: &mut AgentTransfer,
        now: Timestamp,
    ) -> Result<Option<EscalationOutcome>, DomainError> {
        let outcome = transfer.escalate(now, settings.escalation_time_minutes);
        if !self.transfers.record_escalation(transfer).await? {
            tracing::debug!(transfer_id = %transfer.id, "Transfer no longer active, escalation dropped");
            return Ok(None);
        }

        let EscalationOutcome::Escalated { level, first, .. } = outcome else {
            tracing::debug!(transfer_id = %transfer.id, "Agent replied, escalation deferred");
            return Ok(Some(outcome));
        };

        tracing::info!(
            tenant_id = %transfer.tenant_id,
            transfer_id = %transfer.id,
            level,
            breached = transfer.sla.breached,
            "Transfer escalated"
        );

        let notice = format!(
            "Conversation with {} escalated to {} (level {})",
            transfer.phone,
            level_name(level),
            level
        );
        let notifications = settings
            .escalation_notify_phones
            .iter()
            .filter(|phone| !phone.trim().is_empty())
            .map(|phone| {
                self.dispatch(
                    transfer.tenant_id,
                    None,
                    &transfer.account,
                    phone,
                    &notice,
                    OutboundKind::EscalationNotice,
                    now,
                )
            });
        for result in join_all(notifications).await {
            if let Err(err) = result {
                tracing::warn!(transfer_id = %transfer.id, error = %err, "Failed to record escalation notice");
            }
        }

        if first {
            if let Some(warning) = settings.warning_text() {
                if let Err(err) = self
                    .dispatch(
                        transfer.tenant_id,
                        Some(transfer.contact_id),
                        &transfer.account,
                        &transfer.phone,
                        warning,
                        OutboundKind::EscalationWarning,
                        now,
                    )
                    .await
                {
                    tracing::warn!(transfer_id = %transfer.id, error = %err, "Failed to record escalation warning");
                }
            }
        }

        self.broadcast(
            &transfer.tenant_id,
            "transfer.escalated",
            json!({
                "transfer_id": transfer.id,
                "contact_id": transfer.contact_id,
                "agent_id": transfer.agent_id,
                "escalation_level": level,
                "breached": transfer.sla.breached,
            }),
        )
        .await;
        Ok(Some(outcome))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Breach
    // ─────────────────────────────────────────────────────────────────────────

    async fn breach_pass(
        &self,
        tenant_id: &TenantId,
        now: Timestamp,
        report: &mut TickReport,
    ) -> Result<(), DomainError> {
        let flagged = self.transfers.mark_breached_unassigned(tenant_id, &now).await?;
        if flagged > 0 {
            tracing::info!(tenant_id = %tenant_id, flagged, "Unassigned transfers breached");
        }
        report.breached += flagged as usize;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Client inactivity
    // ─────────────────────────────────────────────────────────────────────────

    async fn inactivity_pass(
        &self,
        settings: &SlaSettings,
        now: Timestamp,
        report: &mut TickReport,
    ) -> Result<(), DomainError> {
        if !settings.handles_client_inactivity() {
            return Ok(());
        }

        let waiting = self.contacts.list_awaiting_reply(&settings.tenant_id).await?;
        for mut contact in waiting {
            match self.handle_inactive(settings, &mut contact, now).await {
                Ok(Some(InactivityAction::Reminder)) => report.reminders += 1,
                Ok(Some(InactivityAction::AutoClose)) => report.closed += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        tenant_id = %settings.tenant_id,
                        contact_id = %contact.id,
                        error = %err,
                        "Inactivity handling failed"
                    );
                    report.failures += 1;
                }
            }
        }
        Ok(())
    }

    async fn handle_inactive(
        &self,
        settings: &SlaSettings,
        contact: &mut Contact,
        now: Timestamp,
    ) -> Result<Option<InactivityAction>, DomainError> {
        let Some(action) = inactivity_action(contact, settings, &now) else {
            return Ok(None);
        };
        // Agents own conversations that are in a transfer.
        if self
            .transfers
            .has_active_for_contact(&contact.tenant_id, &contact.id)
            .await?
        {
            return Ok(None);
        }

        let (text, kind, event_type) = match action {
            InactivityAction::Reminder => (
                settings.reminder_text(),
                OutboundKind::InactivityReminder,
                "chatbot.reminder_sent",
            ),
            InactivityAction::AutoClose => (
                settings.inactivity_close_text(),
                OutboundKind::InactivityClose,
                "chatbot.auto_closed",
            ),
        };

        let message = self
            .dispatch(
                contact.tenant_id,
                Some(contact.id),
                &contact.account,
                &contact.phone,
                text,
                kind,
                now,
            )
            .await?;

        match action {
            InactivityAction::Reminder => contact.record_reminder(),
            InactivityAction::AutoClose => {
                contact.clear_chatbot_wait();
                self.time_out_session(contact, now).await?;
            }
        }
        self.contacts.update(contact).await?;

        tracing::info!(
            tenant_id = %contact.tenant_id,
            contact_id = %contact.id,
            action = kind.as_str(),
            "Handled inactive contact"
        );

        self.broadcast(
            &contact.tenant_id,
            event_type,
            json!({
                "contact_id": contact.id,
                "message": serde_json::to_value(&message).unwrap_or_default(),
            }),
        )
        .await;
        Ok(Some(action))
    }

    async fn time_out_session(&self, contact: &Contact, now: Timestamp) -> Result<(), DomainError> {
        let Some(mut session) = self
            .sessions
            .find_active(&contact.tenant_id, &contact.id, &contact.account)
            .await?
        else {
            return Ok(());
        };
        session.finish(SessionStatus::Timeout, now)?;
        self.sessions.update(&session).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Delivery
    // ─────────────────────────────────────────────────────────────────────────

    /// Stores, sends and records the outcome of one automated message.
    ///
    /// Transport failures end up on the stored message; only persistence
    /// failures are returned.
    #[allow(clippy::too_many_arguments)]
    async fn dispatch(
        &self,
        tenant_id: TenantId,
        contact_id: Option<ContactId>,
        account: &str,
        to: &str,
        body: &str,
        kind: OutboundKind,
        now: Timestamp,
    ) -> Result<OutboundMessage, DomainError> {
        let mut message = OutboundMessage::pending(tenant_id, contact_id, account, to, body, kind, now);
        self.outbound.insert(&message).await?;

        match send_with_timeout(self.sender.as_ref(), self.config.send_timeout, account, to, body)
            .await
        {
            Ok(external_id) => message.mark_sent(external_id)?,
            Err(err) => {
                tracing::warn!(
                    tenant_id = %tenant_id,
                    kind = kind.as_str(),
                    error = %err,
                    "Automated message not delivered"
                );
                message.mark_failed(err.message)?;
            }
        }

        self.outbound.update(&message).await?;
        Ok(message)
    }

    async fn broadcast(&self, tenant_id: &TenantId, event_type: &str, payload: Value) {
        if let Err(err) = self
            .broadcaster
            .broadcast_to_tenant(tenant_id, event_type, payload)
            .await
        {
            tracing::warn!(tenant_id = %tenant_id, event_type, error = %err, "Broadcast failed");
        }
    }
}

fn level_name(level: u8) -> &'static str {
    match level {
        0 => "normal",
        1 => "warning",
        _ => "critical",
    }
}

fn pass_failed(pass: &str, tenant_id: &TenantId, err: &DomainError, report: &mut TickReport) {
    tracing::warn!(tenant_id = %tenant_id, pass, error = %err, "SLA pass failed");
    report.failures += 1;
}

fn item_failed(pass: &str, transfer: &AgentTransfer, err: &DomainError, report: &mut TickReport) {
    tracing::warn!(
        tenant_id = %transfer.tenant_id,
        transfer_id = %transfer.id,
        pass,
        error = %err,
        "SLA item failed"
    );
    report.failures += 1;
}
