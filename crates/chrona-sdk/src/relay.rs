use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrona_cipher::{DecryptionOracle, DecryptionTicket};
use chrona_events::{EventFilter, EventKind, EventPayload, EventStream, VaultEvent};
use chrona_types::{Identity, RecordId};
use chrona_vault::{Vault, VaultResult};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Counters kept by a running relay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub completed: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Fulfils disclosure requests.
///
/// The relay listens for `DisclosureRequested` events, asks the decryption
/// oracle for the access field, and hands the answer back to the vault
/// through [`Vault::complete_disclosure`]. Completion failures are logged
/// and dropped; the request stays pending.
pub struct DisclosureRelay {
    vault: Arc<Vault>,
    oracle: Arc<dyn DecryptionOracle>,
    counters: Counters,
}

impl DisclosureRelay {
    pub fn new(vault: Arc<Vault>, oracle: Arc<dyn DecryptionOracle>) -> Self {
        Self {
            vault,
            oracle,
            counters: Counters::default(),
        }
    }

    pub fn stats(&self) -> RelayStats {
        RelayStats {
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Decrypt one ticket and deliver the result.
    ///
    /// Returns the disclosed record and revealed identity, or `None` if the
    /// oracle or the vault rejected the completion.
    pub async fn fulfil(&self, ticket: &DecryptionTicket) -> Option<(RecordId, Identity)> {
        let response = match self.oracle.decrypt(ticket).await {
            Ok(response) => response,
            Err(error) => {
                warn!(correlation_id = %ticket.correlation_id, %error, "oracle failed");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return None;
            }
        };
        match self
            .vault
            .complete_disclosure(response.correlation_id, response.cleartext, response.proof)
        {
            Ok(disclosed) => {
                self.counters.completed.fetch_add(1, Ordering::Relaxed);
                Some(disclosed)
            }
            Err(error) => {
                warn!(correlation_id = %ticket.correlation_id, %error, "completion discarded");
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Fulfil the request carried by `event`, if any.
    pub async fn handle_event(&self, event: &VaultEvent) -> Option<(RecordId, Identity)> {
        match &event.payload {
            EventPayload::DisclosureRequested { ticket, .. } => self.fulfil(ticket).await,
            other => {
                debug!(kind = ?other.kind(), "relay ignoring event");
                None
            }
        }
    }

    /// Subscribe now and process requests on a background task.
    ///
    /// Requests issued after this returns are guaranteed to be seen.
    pub fn spawn(self) -> VaultResult<RelayHandle> {
        let stream = self
            .vault
            .subscribe(EventFilter::kinds([EventKind::DisclosureRequested]))?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let relay = Arc::new(self);
        let task = tokio::spawn(relay.clone().run(stream, shutdown_rx));
        info!("disclosure relay started");
        Ok(RelayHandle {
            relay,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    async fn run(self: Arc<Self>, mut stream: EventStream, mut shutdown: oneshot::Receiver<()>) {
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                received = stream.recv() => match received {
                    Ok(event) => {
                        self.handle_event(&event).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "relay lagged; skipped requests stay pending");
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
        info!(stats = ?self.stats(), "disclosure relay stopped");
    }
}

/// A relay running on a background task. Dropping the handle stops the relay.
pub struct RelayHandle {
    relay: Arc<DisclosureRelay>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    pub fn stats(&self) -> RelayStats {
        self.relay.stats()
    }

    /// Stop the relay and wait for the task to finish.
    pub async fn shutdown(mut self) -> RelayStats {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Err(error) = (&mut self.task).await {
            warn!(%error, "relay task ended abnormally");
        }
        self.relay.stats()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use chrona_cipher::{EncryptionService, LocalCipherService};
    use chrona_types::{ManualClock, Timestamp};
    use chrona_vault::{VaultConfig, VaultError};

    const NOW: u64 = 1_700_000_000;

    struct Setup {
        clock: Arc<ManualClock>,
        cipher: Arc<LocalCipherService>,
        vault: Arc<Vault>,
        admin: Identity,
    }

    fn setup(latency: Duration) -> Setup {
        let clock = Arc::new(ManualClock::new(Timestamp::from_secs(NOW)));
        let cipher = Arc::new(LocalCipherService::new(clock.clone()).with_latency(latency));
        let admin = Identity::from_bytes([0xad; 20]);
        let vault = Arc::new(
            Vault::new(admin, VaultConfig::default(), clock.clone(), cipher.clone()).unwrap(),
        );
        Setup {
            clock,
            cipher,
            vault,
            admin,
        }
    }

    fn submit(s: &Setup, access: Identity) -> RecordId {
        let owner = Identity::from_bytes([1; 20]);
        let mut input = s.cipher.create_encrypted_input(s.vault.scope(), owner);
        input.add_address(access).add_bytes(b"will");
        let input = input.finalize().unwrap();
        let id = s
            .vault
            .submit(
                owner,
                input.handles[1..].to_vec(),
                input.handles[0],
                input.proof,
                Timestamp::from_secs(NOW + 100),
            )
            .unwrap();
        s.clock.advance(100);
        id
    }

    #[tokio::test]
    async fn relay_completes_pending_disclosure() {
        let s = setup(Duration::from_millis(20));
        let heir = Identity::from_bytes([0x42; 20]);
        let id = submit(&s, heir);

        let mut disclosed = s
            .vault
            .subscribe(EventFilter::kinds([EventKind::RecordDisclosed]))
            .unwrap();
        let handle = DisclosureRelay::new(s.vault.clone(), s.cipher.clone())
            .spawn()
            .unwrap();

        s.vault.request_disclosure(s.admin, id).unwrap();
        assert!(s.vault.is_disclosure_pending(id).unwrap());

        let event = tokio::time::timeout(Duration::from_secs(5), disclosed.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.payload, EventPayload::RecordDisclosed { id, revealed: heir });
        assert_eq!(s.vault.get(id).unwrap().revealed(), Some(heir));
        assert!(!s.vault.is_disclosure_pending(id).unwrap());

        let stats = handle.shutdown().await;
        assert_eq!(stats, RelayStats { completed: 1, failed: 0 });
    }

    #[tokio::test]
    async fn duplicate_delivery_is_discarded() {
        let s = setup(Duration::ZERO);
        let id = submit(&s, Identity::from_bytes([0x42; 20]));
        let receipt = s.vault.submit_transaction(
            s.admin,
            chrona_vault::Operation::RequestDisclosure { id },
        );
        let event = receipt.effects[0].clone();

        let relay = DisclosureRelay::new(s.vault.clone(), s.cipher.clone());
        assert!(relay.handle_event(&event).await.is_some());
        assert!(relay.handle_event(&event).await.is_none());
        assert_eq!(relay.stats(), RelayStats { completed: 1, failed: 1 });

        let EventPayload::DisclosureRequested { correlation_id, .. } = event.payload else {
            panic!("expected a disclosure request");
        };
        let response = s
            .cipher
            .decrypt(&DecryptionTicket {
                correlation_id,
                record_id: id,
                handles: vec![s.vault.get(id).unwrap().access_field],
                requester: s.admin,
                requested_at: s.vault.now(),
            })
            .await
            .unwrap();
        assert_eq!(
            s.vault
                .complete_disclosure(correlation_id, response.cleartext, response.proof)
                .unwrap_err(),
            VaultError::UnknownOrCompletedRequest(correlation_id)
        );
    }

    #[tokio::test]
    async fn relay_ignores_other_events() {
        let s = setup(Duration::ZERO);
        let receipt = s.vault.submit_transaction(
            s.admin,
            chrona_vault::Operation::TransferOwnership {
                new_administrator: Identity::from_bytes([2; 20]),
            },
        );
        let relay = DisclosureRelay::new(s.vault.clone(), s.cipher.clone());
        assert!(relay.handle_event(&receipt.effects[0]).await.is_none());
        assert_eq!(relay.stats(), RelayStats::default());
    }

    #[tokio::test]
    async fn shutdown_stops_idle_relay() {
        let s = setup(Duration::ZERO);
        let handle = DisclosureRelay::new(s.vault.clone(), s.cipher.clone())
            .spawn()
            .unwrap();
        assert_eq!(s.vault.events().subscriber_count().unwrap(), 1);
        assert_eq!(handle.shutdown().await, RelayStats::default());
    }
}
