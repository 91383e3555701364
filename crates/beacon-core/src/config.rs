use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tuning knobs for one run of the protocol (spec.md §4.1, §4.5).
///
/// Durations are stored in seconds for straightforward TOML round-tripping,
/// mirroring `luxtensor-node::config::ConsensusConfig`'s `block_time: u64`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Number of voting rounds K (spec.md §3: "r=1..K").
    pub rounds_per_epoch: u32,

    /// Security parameter kappa for the eligibility threshold (spec.md §4.1).
    pub kappa: u32,

    /// Rational `q` in (0,1), expressed as a fraction to avoid floating
    /// point drift in config files.
    pub q_numerator: u64,
    pub q_denominator: u64,

    /// Rational `theta` in (0,1], the voting-threshold fraction of `W`.
    pub theta_numerator: u64,
    pub theta_denominator: u64,

    /// How long after the first layer tick of an epoch the driver waits
    /// before starting the proposal phase.
    pub wait_after_epoch_start_secs: u64,

    /// Duration of the proposal phase.
    pub proposal_duration_secs: u64,

    /// Duration of the voting half of round 1.
    pub first_voting_round_duration_secs: u64,

    /// Duration of the voting half of rounds 2..K.
    pub voting_round_duration_secs: u64,

    /// Duration reserved for the weak-coin round that runs alongside every
    /// voting round.
    pub weak_coin_round_duration_secs: u64,

    /// Grace window after the proposal deadline during which a late
    /// proposal is still admitted as *potentially-valid* (spec.md §3, §9
    /// Open Questions — resolved here as one voting-round duration).
    pub proposal_grace_secs: u64,
}

impl ProtocolConfig {
    pub fn q(&self) -> (u64, u64) {
        (self.q_numerator, self.q_denominator)
    }

    pub fn theta(&self) -> (u64, u64) {
        (self.theta_numerator, self.theta_denominator)
    }

    pub fn wait_after_epoch_start(&self) -> Duration {
        Duration::from_secs(self.wait_after_epoch_start_secs)
    }

    pub fn proposal_duration(&self) -> Duration {
        Duration::from_secs(self.proposal_duration_secs)
    }

    pub fn proposal_grace(&self) -> Duration {
        Duration::from_secs(self.proposal_grace_secs)
    }

    /// Round 1 lasts `FirstVotingRoundDuration + WeakCoinRoundDuration`
    /// (spec.md §4.5).
    pub fn round_duration(&self, round: u32) -> Duration {
        let voting = if round <= 1 {
            self.first_voting_round_duration_secs
        } else {
            self.voting_round_duration_secs
        };
        Duration::from_secs(voting + self.weak_coin_round_duration_secs)
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            rounds_per_epoch: 4,
            kappa: 40,
            q_numerator: 1,
            q_denominator: 3,
            theta_numerator: 1,
            theta_denominator: 4,
            wait_after_epoch_start_secs: 30,
            proposal_duration_secs: 30,
            first_voting_round_duration_secs: 30,
            voting_round_duration_secs: 20,
            weak_coin_round_duration_secs: 10,
            proposal_grace_secs: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_duration_uses_first_voting_duration_for_round_one() {
        let cfg = ProtocolConfig::default();
        assert_eq!(
            cfg.round_duration(1),
            Duration::from_secs(cfg.first_voting_round_duration_secs + cfg.weak_coin_round_duration_secs)
        );
        assert_eq!(
            cfg.round_duration(2),
            Duration::from_secs(cfg.voting_round_duration_secs + cfg.weak_coin_round_duration_secs)
        );
    }
}
