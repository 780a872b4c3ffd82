//! Exchange transports: in-process and threaded.

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use indexmap::IndexMap;

use hydroute_core::{ExchangeError, WorkerRank};

use crate::plan::ExchangePlan;

/// One collective flow exchange per call.
///
/// `outflow[i]` is sent along every out-edge of local node `i`; on return
/// `inflow[i]` holds the sum of everything addressed to local node `i`,
/// added in ascending source order. A failure leaves `inflow` unspecified
/// and is fatal for the run.
pub trait Exchange {
    /// Run one round.
    fn exchange(&mut self, outflow: &[f64], inflow: &mut [f64]) -> Result<(), ExchangeError>;

    /// The plan this transport executes.
    fn plan(&self) -> &ExchangePlan;
}

// ── LocalExchange ───────────────────────────────────────────────

/// Exchange for a single worker owning every node.
#[derive(Clone, Debug)]
pub struct LocalExchange {
    plan: ExchangePlan,
    slots: Vec<f64>,
}

impl LocalExchange {
    /// Wrap a plan with no peers.
    pub fn new(plan: ExchangePlan) -> Result<Self, ExchangeError> {
        if plan.workers() != 1 {
            return Err(ExchangeError::FabricInit {
                reason: format!(
                    "local exchange needs a single-worker plan, got {} workers",
                    plan.workers()
                ),
            });
        }
        let slots = vec![0.0; plan.slot_count()];
        Ok(Self { plan, slots })
    }
}

impl Exchange for LocalExchange {
    fn exchange(&mut self, outflow: &[f64], inflow: &mut [f64]) -> Result<(), ExchangeError> {
        self.plan.check_buffers(outflow, inflow)?;
        self.plan.scatter_local(outflow, &mut self.slots);
        self.plan.gather(&self.slots, inflow);
        Ok(())
    }

    fn plan(&self) -> &ExchangePlan {
        &self.plan
    }
}

// ── ChannelExchange ─────────────────────────────────────────────

/// How long a worker waits on a silent peer before giving up.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Packet {
    from: WorkerRank,
    round: u64,
    values: Vec<f64>,
}

/// Builds connected [`ChannelExchange`] endpoints.
#[derive(Debug)]
pub struct ChannelFabric;

impl ChannelFabric {
    /// Connect one endpoint per plan. `plans[r]` must be the plan of rank
    /// `r`, all compiled against the same partition.
    pub fn connect(plans: Vec<ExchangePlan>) -> Result<Vec<ChannelExchange>, ExchangeError> {
        Self::connect_with_timeout(plans, DEFAULT_PEER_TIMEOUT)
    }

    /// [`connect`](Self::connect) with an explicit peer timeout.
    pub fn connect_with_timeout(
        plans: Vec<ExchangePlan>,
        timeout: Duration,
    ) -> Result<Vec<ChannelExchange>, ExchangeError> {
        let workers = plans.len();
        let mut expected_start = 0;
        for (r, plan) in plans.iter().enumerate() {
            if plan.rank().index() != r || plan.workers() != workers {
                return Err(ExchangeError::FabricInit {
                    reason: format!(
                        "plan {r} is for rank {} of {} workers, expected rank {r} of {workers}",
                        plan.rank(),
                        plan.workers()
                    ),
                });
            }
            if plan.range().start != expected_start {
                return Err(ExchangeError::FabricInit {
                    reason: format!("plan {r} does not continue the previous range"),
                });
            }
            expected_start = plan.range().end;
        }

        let (senders, receivers): (Vec<Sender<Packet>>, Vec<Receiver<Packet>>) =
            (0..workers).map(|_| crossbeam_channel::unbounded()).unzip();

        let endpoints = plans
            .into_iter()
            .zip(receivers)
            .map(|(plan, inbox)| {
                let peers: IndexMap<WorkerRank, Sender<Packet>> = plan
                    .peers()
                    .map(|p| (p, senders[p.index()].clone()))
                    .collect();
                let slots = vec![0.0; plan.slot_count()];
                ChannelExchange {
                    plan,
                    round: 0,
                    peers,
                    inbox,
                    pending: Vec::new(),
                    slots,
                    timeout,
                }
            })
            .collect();
        log::debug!("channel fabric connected {workers} workers");
        Ok(endpoints)
    }
}

/// Exchange endpoint of one worker thread.
///
/// Every round sends exactly one packet to every peer, even an empty one,
/// then waits for one packet from every peer. A peer that has already
/// moved on may deliver its next-round packet early; it is held back
/// until that round starts.
#[derive(Debug)]
pub struct ChannelExchange {
    plan: ExchangePlan,
    round: u64,
    peers: IndexMap<WorkerRank, Sender<Packet>>,
    inbox: Receiver<Packet>,
    pending: Vec<Packet>,
    slots: Vec<f64>,
    timeout: Duration,
}

impl ChannelExchange {
    /// Number of completed rounds.
    pub fn round(&self) -> u64 {
        self.round
    }

    fn accept(&mut self, packet: Packet, seen: &mut [bool]) -> Result<(), ExchangeError> {
        let from = packet.from;
        if packet.round == self.round + 1 {
            self.pending.push(packet);
            return Ok(());
        }
        if packet.round != self.round || seen[from.index()] {
            return Err(ExchangeError::RoundMismatch {
                peer: from,
                expected: self.round,
                found: packet.round,
            });
        }
        self.plan.unpack(from, &packet.values, &mut self.slots)?;
        seen[from.index()] = true;
        Ok(())
    }
}

impl Exchange for ChannelExchange {
    fn exchange(&mut self, outflow: &[f64], inflow: &mut [f64]) -> Result<(), ExchangeError> {
        self.plan.check_buffers(outflow, inflow)?;
        self.round += 1;
        let me = self.plan.rank();

        for (&peer, tx) in &self.peers {
            let packet = Packet {
                from: me,
                round: self.round,
                values: self.plan.pack(peer, outflow),
            };
            tx.send(packet)
                .map_err(|_| ExchangeError::Disconnected { peer })?;
        }

        self.plan.scatter_local(outflow, &mut self.slots);

        let mut seen = vec![false; self.plan.workers()];
        seen[me.index()] = true;
        for packet in std::mem::take(&mut self.pending) {
            self.accept(packet, &mut seen)?;
        }
        let mut waiting = self.peers.len() - (seen.iter().filter(|&&s| s).count() - 1);
        while waiting > 0 {
            let packet = match self.inbox.recv_timeout(self.timeout) {
                Ok(p) => p,
                Err(e) => {
                    let peer = seen
                        .iter()
                        .position(|&s| !s)
                        .map_or(me, |i| WorkerRank(i as u32));
                    return Err(match e {
                        RecvTimeoutError::Timeout => ExchangeError::Timeout {
                            peer,
                            round: self.round,
                        },
                        RecvTimeoutError::Disconnected => ExchangeError::Disconnected { peer },
                    });
                }
            };
            let early = packet.round != self.round;
            self.accept(packet, &mut seen)?;
            if !early {
                waiting -= 1;
            }
        }

        self.plan.gather(&self.slots, inflow);
        Ok(())
    }

    fn plan(&self) -> &ExchangePlan {
        &self.plan
    }
}
