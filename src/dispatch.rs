//! Query Dispatcher: parallel fan-out of one round to all targets.
//!
//! Each target gets its own task in a [`JoinSet`] with its own timeout and
//! writes into its own result slot. A target that fails, times out, answers
//! for another session or answers with an error leaves its slot empty.
//! Dropping the set (for instance when the caller's deadline fires) aborts
//! the sends still in flight.

use crate::config_err;
use crate::error::{HybridPirError, Result};
use crate::message::HybridPirMessage;
use crate::params::DispatchConfig;
use crate::transport::{Target, Transport};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Send `messages[i]` to `targets[i]` concurrently and collect one slot per
/// target, in target order.
pub async fn dispatch_round<T: Transport>(
    transport: &Arc<T>,
    targets: &[Target],
    messages: Vec<HybridPirMessage>,
    session: u64,
    config: &DispatchConfig,
) -> Result<Vec<Option<HybridPirMessage>>> {
    if messages.len() != targets.len() {
        return Err(config_err!(
            "{} messages for {} targets",
            messages.len(),
            targets.len()
        ));
    }

    let t0 = Instant::now();
    let per_target = config.per_target_timeout;
    let mut set = JoinSet::new();

    for (slot, (target, message)) in targets.iter().zip(messages).enumerate() {
        let payload = message.to_bytes()?;
        let transport = Arc::clone(transport);
        let target = target.clone();
        set.spawn(async move {
            let outcome = match tokio::time::timeout(per_target, transport.send(&target, payload)).await {
                Ok(Ok(bytes)) => HybridPirMessage::from_bytes(&bytes),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(HybridPirError::Network {
                    target: target.address.clone(),
                    reason: format!("no answer within {:?}", per_target),
                }),
            };
            (slot, target, outcome)
        });
    }

    let mut slots: Vec<Option<HybridPirMessage>> = targets.iter().map(|_| None).collect();
    while let Some(joined) = set.join_next().await {
        let (slot, target, outcome) = match joined {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "dispatch task failed");
                continue;
            }
        };
        match outcome {
            Ok(msg) if msg.session() != session => {
                warn!(target = %target.address, got = msg.session(), "dropping reply for another session");
            }
            Ok(HybridPirMessage::Error { reason, .. }) => {
                warn!(target = %target.address, %reason, "target reported an error");
            }
            Ok(msg) => {
                debug!(target = %target.address, kind = msg.kind(), "reply received");
                slots[slot] = Some(msg);
            }
            Err(e) => {
                warn!(target = %target.address, error = %e, "target failed");
            }
        }
    }

    debug!(
        targets = targets.len(),
        answered = slots.iter().flatten().count(),
        elapsed_ms = t0.elapsed().as_secs_f64() * 1000.0,
        "round complete"
    );
    Ok(slots)
}

/// Unwrap the slots if at least `required` are filled and all of them are,
/// since every replica's answer is needed for reconstruction.
pub fn require_quorum(
    slots: Vec<Option<HybridPirMessage>>,
    required: usize,
) -> Result<Vec<HybridPirMessage>> {
    let received = slots.iter().flatten().count();
    if received < required || received < slots.len() {
        return Err(HybridPirError::Quorum { required, received });
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::time::Duration;

    /// Answers `Seed { session, seed: replica }`, or misbehaves by address
    struct Scripted;

    impl Transport for Scripted {
        fn send(&self, target: &Target, message: Vec<u8>) -> impl Future<Output = Result<Vec<u8>>> + Send {
            let target = target.clone();
            async move {
                let session = HybridPirMessage::from_bytes(&message)?.session();
                let reply = match target.address.as_str() {
                    "slow" => {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        HybridPirMessage::Seed { session, seed: 0 }
                    }
                    "down" => {
                        return Err(HybridPirError::Network {
                            target: target.address,
                            reason: "refused".into(),
                        })
                    }
                    "stale" => HybridPirMessage::Seed {
                        session: session + 1,
                        seed: 0,
                    },
                    "broken" => HybridPirMessage::Error {
                        session,
                        reason: "bad query".into(),
                    },
                    _ => HybridPirMessage::Seed {
                        session,
                        seed: target.replica as u64,
                    },
                };
                reply.to_bytes()
            }
        }
    }

    fn config() -> DispatchConfig {
        DispatchConfig::new(Duration::from_millis(200), Duration::from_secs(2))
    }

    async fn run(addresses: &[&str]) -> Vec<Option<HybridPirMessage>> {
        let targets: Vec<Target> = addresses
            .iter()
            .enumerate()
            .map(|(i, a)| Target::new(*a, i))
            .collect();
        let messages = targets.iter().map(|_| HybridPirMessage::Hello { session: 7 }).collect();
        dispatch_round(&Arc::new(Scripted), &targets, messages, 7, &config())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_slots_follow_target_order() {
        let slots = run(&["a", "b", "c"]).await;
        let seeds: Vec<u64> = require_quorum(slots, 3)
            .unwrap()
            .into_iter()
            .map(|m| match m {
                HybridPirMessage::Seed { seed, .. } => seed,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(seeds, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_failures_leave_empty_slots() {
        let slots = run(&["a", "slow", "down", "stale", "broken"]).await;
        assert!(slots[0].is_some());
        assert!(slots[1..].iter().all(Option::is_none));
        let err = require_quorum(slots, 5).unwrap_err();
        assert!(matches!(err, HybridPirError::Quorum { required: 5, received: 1 }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_rejects_mismatched_messages() {
        let targets = vec![Target::new("a", 0)];
        let err = dispatch_round(&Arc::new(Scripted), &targets, vec![], 1, &config())
            .await
            .unwrap_err();
        assert!(matches!(err, HybridPirError::Configuration(_)));
    }
}
