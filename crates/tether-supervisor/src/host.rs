// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-endpoint connection host.
//!
//! A host owns one endpoint's connection lifecycle: it runs a single
//! supervision loop that opens the connection, holds it until the link
//! drops, and reconnects with linear backoff. Well-known permanent
//! failures (registration deleted, credential rejected) terminate the loop
//! immediately; transient failures are retried until the configured attempt
//! ceiling.
//!
//! # Signals
//!
//! - **Started gate**: a one-shot signal set exactly once, with either
//!   success (the connection opened at least once) or the classified
//!   terminal failure. Activation awaits this gate.
//! - **Reset**: an intentional reconnect request. The loop closes the
//!   current link and reconnects; the retry counter is reset to zero since
//!   a reset is not a failure.
//! - **Cancellation**: stops the loop cooperatively. Cancelling during a
//!   backoff wait or an open attempt aborts it and proceeds straight to
//!   teardown.
//!
//! State is stored in an atomic so status queries never need a lock; all
//! mutating operations are coordinated by the owning supervisor.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch, Notify};
use tokio::task::JoinHandle;

use tether_core::connection::{ConnectionOpener, EndpointConnection};
use tether_core::error::{ConnectError, ConnectResult};
use tether_core::retry::{RetryDecision, RetryPolicy};
use tether_core::store::RegistrationStore;
use tether_core::types::{ActivationState, EndpointId, Secret};

// =============================================================================
// Endpoint Connection Host
// =============================================================================

/// Supervises the connection to one endpoint.
///
/// The host is exclusively owned by the supervisor's map entry; dropping it
/// without calling [`EndpointConnectionHost::stop`] detaches the supervision
/// task, so owners stop before discarding.
pub struct EndpointConnectionHost {
    endpoint_id: EndpointId,
    state: Arc<AtomicU8>,
    cancel_tx: watch::Sender<bool>,
    reset: Arc<Notify>,
    started_rx: Option<oneshot::Receiver<ConnectResult<()>>>,
    handle: JoinHandle<()>,
}

impl EndpointConnectionHost {
    /// Spawns a new host and its supervision loop.
    ///
    /// The loop starts in the `Activated` state and attempts its first
    /// connection immediately.
    pub fn spawn(
        endpoint_id: EndpointId,
        secret: Secret,
        store: Arc<dyn RegistrationStore>,
        opener: Arc<dyn ConnectionOpener>,
        retry: RetryPolicy,
        connect_timeout: Option<Duration>,
    ) -> Self {
        let state = Arc::new(AtomicU8::new(ActivationState::Activated.as_u8()));
        let reset = Arc::new(Notify::new());
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (started_tx, started_rx) = oneshot::channel();

        let handle = tokio::spawn(run(
            endpoint_id.clone(),
            secret,
            store,
            opener,
            retry,
            connect_timeout,
            state.clone(),
            reset.clone(),
            cancel_rx,
            started_tx,
        ));

        Self {
            endpoint_id,
            state,
            cancel_tx,
            reset,
            started_rx: Some(started_rx),
            handle,
        }
    }

    /// Returns the endpoint ID.
    pub fn endpoint_id(&self) -> &EndpointId {
        &self.endpoint_id
    }

    /// Returns the current activation state (lock-free).
    pub fn state(&self) -> ActivationState {
        ActivationState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Returns `true` while the supervision loop is running.
    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Waits for the started gate: resolves once the connection has opened
    /// at least once, or with the classified terminal failure.
    ///
    /// Consuming the gate twice is a no-op returning `Ok(())`.
    pub async fn wait_started(&mut self) -> ConnectResult<()> {
        match self.started_rx.take() {
            Some(rx) => rx.await.unwrap_or(Err(ConnectError::Cancelled)),
            None => Ok(()),
        }
    }

    /// Requests an intentional reconnect.
    ///
    /// If the loop is mid-connect the request is latched and honored as
    /// soon as the link is up.
    pub fn request_reset(&self) {
        tracing::debug!(endpoint_id = %self.endpoint_id, "Endpoint reset requested");
        self.reset.notify_one();
    }

    /// Stops the supervision loop and waits for it to finish.
    ///
    /// After this returns no connection remains open. Failures from the
    /// underlying close path are logged inside the loop, never propagated.
    pub async fn stop(self) {
        let _ = self.cancel_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!(
                endpoint_id = %self.endpoint_id,
                error = %e,
                "Endpoint host task did not shut down cleanly"
            );
        }
    }
}

impl std::fmt::Debug for EndpointConnectionHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointConnectionHost")
            .field("endpoint_id", &self.endpoint_id)
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish()
    }
}

// =============================================================================
// Supervision Loop
// =============================================================================

/// Outcome of holding an open link.
enum LinkOutcome {
    /// The link dropped with the given cause.
    Dropped(ConnectError),
    /// A reset was requested; reconnect without counting a failure.
    Reset,
    /// Cancellation was requested; tear down and exit.
    Cancelled,
}

#[allow(clippy::too_many_arguments)]
async fn run(
    endpoint_id: EndpointId,
    secret: Secret,
    store: Arc<dyn RegistrationStore>,
    opener: Arc<dyn ConnectionOpener>,
    retry: RetryPolicy,
    connect_timeout: Option<Duration>,
    state: Arc<AtomicU8>,
    reset: Arc<Notify>,
    mut cancel_rx: watch::Receiver<bool>,
    started_tx: oneshot::Sender<ConnectResult<()>>,
) {
    let mut started = Some(started_tx);
    let mut attempt: u32 = 0;

    loop {
        if *cancel_rx.borrow() {
            break;
        }

        let opened = tokio::select! {
            result = connect_once(&endpoint_id, &secret, &store, &opener, connect_timeout) => result,
            _ = cancel_rx.changed() => break,
        };

        match opened {
            Ok(connection) => {
                attempt = 0;
                state.store(ActivationState::ActivatedAndConnected.as_u8(), Ordering::SeqCst);
                if let Some(tx) = started.take() {
                    let _ = tx.send(Ok(()));
                }
                tracing::info!(endpoint_id = %endpoint_id, "Endpoint connected");

                match hold_link(&endpoint_id, connection, &state, &reset, &mut cancel_rx).await {
                    LinkOutcome::Reset => {
                        tracing::info!(endpoint_id = %endpoint_id, "Endpoint reset, reconnecting");
                        continue;
                    }
                    LinkOutcome::Cancelled => break,
                    LinkOutcome::Dropped(cause) if cause.is_terminal() => {
                        tracing::warn!(
                            endpoint_id = %endpoint_id,
                            error = %cause,
                            "Endpoint connection terminated"
                        );
                        break;
                    }
                    LinkOutcome::Dropped(cause) => {
                        attempt += 1;
                        if !backoff(&endpoint_id, &retry, &cause, &mut attempt, &reset, &mut cancel_rx)
                            .await
                        {
                            break;
                        }
                    }
                }
            }
            Err(error) if error.is_terminal() => {
                tracing::warn!(
                    endpoint_id = %endpoint_id,
                    error = %error,
                    "Endpoint connection failed permanently"
                );
                if let Some(tx) = started.take() {
                    let _ = tx.send(Err(error));
                }
                break;
            }
            Err(error) => {
                attempt += 1;
                match retry.decide(&error, attempt) {
                    RetryDecision::Retry(delay) => {
                        tracing::debug!(
                            endpoint_id = %endpoint_id,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %error,
                            "Retrying endpoint connection"
                        );
                        tokio::select! {
                            _ = tokio::time::sleep(delay) => {}
                            _ = reset.notified() => attempt = 0,
                            _ = cancel_rx.changed() => break,
                        }
                    }
                    RetryDecision::GiveUp => {
                        tracing::error!(
                            endpoint_id = %endpoint_id,
                            attempts = attempt,
                            "Endpoint connection retries exhausted"
                        );
                        if let Some(tx) = started.take() {
                            let _ = tx.send(Err(ConnectError::retries_exhausted(attempt)));
                        }
                        break;
                    }
                }
            }
        }
    }

    // The entry stays Activated until the supervisor removes it.
    state.store(ActivationState::Activated.as_u8(), Ordering::SeqCst);
}

/// Reads the backing registration and opens the connection.
///
/// A missing registration is terminal; store backend failures are treated
/// as transient so a flaky store does not tear down supervision.
async fn connect_once(
    endpoint_id: &EndpointId,
    secret: &Secret,
    store: &Arc<dyn RegistrationStore>,
    opener: &Arc<dyn ConnectionOpener>,
    connect_timeout: Option<Duration>,
) -> ConnectResult<Box<dyn EndpointConnection>> {
    let registration = match store.get(endpoint_id).await {
        Ok(registration) => registration,
        Err(e) if e.is_not_found() => {
            return Err(ConnectError::not_found(endpoint_id.clone()));
        }
        Err(e) => {
            return Err(ConnectError::transient_with(
                "failed to read endpoint registration",
                e,
            ));
        }
    };

    let open = opener.open(&registration, secret);
    match connect_timeout {
        Some(timeout) => match tokio::time::timeout(timeout, open).await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::transient(format!(
                "connect attempt timed out after {}ms",
                timeout.as_millis()
            ))),
        },
        None => open.await,
    }
}

/// Holds an open link until it drops, a reset is requested, or the host is
/// cancelled. The connection is closed before returning in all cases.
async fn hold_link(
    endpoint_id: &EndpointId,
    mut connection: Box<dyn EndpointConnection>,
    state: &Arc<AtomicU8>,
    reset: &Arc<Notify>,
    cancel_rx: &mut watch::Receiver<bool>,
) -> LinkOutcome {
    let outcome = tokio::select! {
        cause = connection.disconnected() => LinkOutcome::Dropped(cause),
        _ = reset.notified() => LinkOutcome::Reset,
        _ = cancel_rx.changed() => LinkOutcome::Cancelled,
    };

    state.store(ActivationState::Activated.as_u8(), Ordering::SeqCst);
    close_quietly(endpoint_id, connection).await;
    outcome
}

/// Closes a connection, swallowing failures. The close path of broken
/// links is allowed to fail.
async fn close_quietly(endpoint_id: &EndpointId, connection: Box<dyn EndpointConnection>) {
    if let Err(e) = connection.close().await {
        tracing::debug!(
            endpoint_id = %endpoint_id,
            error = %e,
            "Ignoring failure while closing endpoint connection"
        );
    }
}

/// Waits out the backoff delay for a post-connect drop.
///
/// Returns `false` when supervision should stop (ceiling reached or
/// cancelled). A reset during the wait clears the attempt counter and
/// reconnects immediately on the next loop iteration.
async fn backoff(
    endpoint_id: &EndpointId,
    retry: &RetryPolicy,
    cause: &ConnectError,
    attempt: &mut u32,
    reset: &Arc<Notify>,
    cancel_rx: &mut watch::Receiver<bool>,
) -> bool {
    match retry.decide(cause, *attempt) {
        RetryDecision::Retry(delay) => {
            tracing::debug!(
                endpoint_id = %endpoint_id,
                attempt = *attempt,
                delay_ms = delay.as_millis() as u64,
                error = %cause,
                "Endpoint disconnected, reconnecting"
            );
            tokio::select! {
                _ = tokio::time::sleep(delay) => true,
                _ = reset.notified() => {
                    *attempt = 0;
                    true
                }
                _ = cancel_rx.changed() => false,
            }
        }
        RetryDecision::GiveUp => {
            tracing::error!(
                endpoint_id = %endpoint_id,
                attempts = *attempt,
                "Endpoint reconnection retries exhausted"
            );
            false
        }
    }
}
