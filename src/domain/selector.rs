//! Vault Selector - Pure Deposit-Target Choice
//!
//! Picks one vault from the upstream's candidates under two hard rules:
//! never a vault the wallet already holds (diversification), and only
//! whitelisted vaults when a whitelist is configured. Among survivors the
//! highest APY for the configured interval wins.
//!
//! No I/O happens here. Given the same candidates, positions and policy
//! the result is always the same.

use std::collections::HashSet;
use std::fmt;

use alloy::primitives::Address;

use crate::domain::vault::{ApyInterval, Position, VaultCandidate};

/// Counts explaining why no candidate survived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectionBreakdown {
    /// Candidates offered upstream.
    pub total: usize,
    /// Excluded because the wallet already holds them.
    pub excluded_existing: usize,
    /// Excluded because they are not whitelisted.
    pub excluded_whitelist: usize,
}

impl fmt::Display for SelectionBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.total == 0 {
            return write!(f, "upstream returned no candidate vaults");
        }
        write!(
            f,
            "{} candidate(s), {} excluded as existing positions, {} excluded by whitelist",
            self.total, self.excluded_existing, self.excluded_whitelist
        )
    }
}

/// Selection rules taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct SelectionPolicy {
    /// APY figure used for ranking.
    pub interval: ApyInterval,
    /// Allowed vaults; empty means all.
    pub whitelist: Vec<Address>,
    /// Allow depositing into a vault already held.
    pub bypass_diversification: bool,
    /// Treat indexed-but-empty positions as held.
    pub zero_balance_counts_as_existing: bool,
}

/// The chosen vault and a human-readable reason.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub vault: VaultCandidate,
    pub rationale: String,
}

/// Stateless vault chooser.
#[derive(Debug, Clone, Default)]
pub struct VaultSelector {
    policy: SelectionPolicy,
}

impl VaultSelector {
    pub const fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    pub const fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Choose a deposit target.
    ///
    /// Ties on APY go to the candidate listed first upstream. A candidate
    /// without a figure for the configured interval ranks below any that
    /// has one but is still eligible.
    pub fn select(
        &self,
        candidates: &[VaultCandidate],
        positions: &[Position],
    ) -> Result<Selection, SelectionBreakdown> {
        let held: HashSet<Address> = if self.policy.bypass_diversification {
            HashSet::new()
        } else {
            positions
                .iter()
                .filter(|p| self.policy.zero_balance_counts_as_existing || !p.is_empty())
                .map(|p| p.vault)
                .collect()
        };

        let mut breakdown = SelectionBreakdown {
            total: candidates.len(),
            ..SelectionBreakdown::default()
        };
        let mut best: Option<(&VaultCandidate, Option<f64>)> = None;

        for candidate in candidates {
            if held.contains(&candidate.address) {
                breakdown.excluded_existing += 1;
                continue;
            }
            if !self.policy.whitelist.is_empty()
                && !self.policy.whitelist.contains(&candidate.address)
            {
                breakdown.excluded_whitelist += 1;
                continue;
            }

            let apy = candidate.apy.get(self.policy.interval);
            let better = match best {
                None => true,
                Some((_, current)) => rank(apy) > rank(current),
            };
            if better {
                best = Some((candidate, apy));
            }
        }

        let Some((vault, apy)) = best else {
            return Err(breakdown);
        };

        let eligible = breakdown.total - breakdown.excluded_existing - breakdown.excluded_whitelist;
        let apy_text = apy.map_or_else(
            || "no reported APY".to_string(),
            |a| format!("{:.2}% {} APY", a * 100.0, self.policy.interval),
        );
        let rationale = format!(
            "{} selected with {apy_text}, best of {eligible} eligible vault(s) ({} held, {} not whitelisted)",
            vault.name, breakdown.excluded_existing, breakdown.excluded_whitelist
        );

        Ok(Selection {
            vault: vault.clone(),
            rationale,
        })
    }
}

/// Missing or NaN figures rank below every real one.
fn rank(apy: Option<f64>) -> f64 {
    match apy {
        Some(a) if !a.is_nan() => a,
        _ => f64::NEG_INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vault::{ApyFigures, nickname};
    use rust_decimal::Decimal;

    fn candidate(byte: u8, name: &str, apy: Option<f64>) -> VaultCandidate {
        VaultCandidate {
            address: Address::repeat_byte(byte),
            name: name.to_string(),
            network: "base".to_string(),
            apy: ApyFigures {
                one_day: apy,
                ..ApyFigures::default()
            },
            tvl_usd: 1_000_000.0,
            transactional: true,
        }
    }

    fn position(byte: u8, balance_minor: u128) -> Position {
        let name = format!("Vault {byte}");
        Position {
            vault: Address::repeat_byte(byte),
            nickname: nickname(&name),
            vault_name: name,
            network: "base".to_string(),
            decimals: 6,
            balance_minor,
            balance: Decimal::from(balance_minor) / Decimal::from(1_000_000),
            balance_usd: 0.0,
            apy: ApyFigures::default(),
        }
    }

    #[test]
    fn test_highest_apy_wins() {
        let selector = VaultSelector::default();
        let candidates = vec![
            candidate(1, "VaultA", Some(0.05)),
            candidate(2, "VaultB", Some(0.07)),
            candidate(3, "VaultC", Some(0.06)),
        ];
        let chosen = selector.select(&candidates, &[]).unwrap();
        assert_eq!(chosen.vault.name, "VaultB");
        assert!(chosen.rationale.contains("7.00%"));
    }

    #[test]
    fn test_existing_position_is_excluded() {
        let selector = VaultSelector::default();
        let candidates = vec![
            candidate(1, "VaultA", Some(0.05)),
            candidate(2, "VaultB", Some(0.07)),
            candidate(3, "VaultC", Some(0.06)),
        ];
        let chosen = selector.select(&candidates, &[position(2, 5_000_000)]).unwrap();
        assert_eq!(chosen.vault.name, "VaultC");
    }

    #[test]
    fn test_ties_go_to_first_listed() {
        let selector = VaultSelector::default();
        let candidates = vec![
            candidate(1, "First", Some(0.05)),
            candidate(2, "Second", Some(0.05)),
        ];
        assert_eq!(selector.select(&candidates, &[]).unwrap().vault.name, "First");
    }

    #[test]
    fn test_missing_apy_ranks_last() {
        let selector = VaultSelector::default();
        let candidates = vec![candidate(1, "NoData", None), candidate(2, "Low", Some(0.001))];
        assert_eq!(selector.select(&candidates, &[]).unwrap().vault.name, "Low");

        let only = vec![candidate(1, "NoData", None)];
        assert_eq!(selector.select(&only, &[]).unwrap().vault.name, "NoData");
    }

    #[test]
    fn test_whitelist_filters_candidates() {
        let selector = VaultSelector::new(SelectionPolicy {
            whitelist: vec![Address::repeat_byte(1)],
            ..SelectionPolicy::default()
        });
        let candidates = vec![candidate(1, "Allowed", Some(0.01)), candidate(2, "Better", Some(0.2))];
        assert_eq!(selector.select(&candidates, &[]).unwrap().vault.name, "Allowed");
    }

    #[test]
    fn test_all_excluded_reports_breakdown() {
        let selector = VaultSelector::new(SelectionPolicy {
            whitelist: vec![Address::repeat_byte(1)],
            ..SelectionPolicy::default()
        });
        let candidates = vec![candidate(1, "Held", Some(0.05)), candidate(2, "Other", Some(0.07))];
        let breakdown = selector
            .select(&candidates, &[position(1, 10)])
            .unwrap_err();
        assert_eq!(
            breakdown,
            SelectionBreakdown {
                total: 2,
                excluded_existing: 1,
                excluded_whitelist: 1,
            }
        );
    }

    #[test]
    fn test_empty_candidates() {
        let breakdown = VaultSelector::default().select(&[], &[]).unwrap_err();
        assert_eq!(breakdown.total, 0);
        assert!(breakdown.to_string().contains("no candidate"));
    }

    #[test]
    fn test_zero_balance_position_handling() {
        let candidates = vec![candidate(1, "Emptied", Some(0.09)), candidate(2, "Other", Some(0.05))];
        let emptied = [position(1, 0)];

        let lenient = VaultSelector::default();
        assert_eq!(lenient.select(&candidates, &emptied).unwrap().vault.name, "Emptied");

        let strict = VaultSelector::new(SelectionPolicy {
            zero_balance_counts_as_existing: true,
            ..SelectionPolicy::default()
        });
        assert_eq!(strict.select(&candidates, &emptied).unwrap().vault.name, "Other");
    }

    #[test]
    fn test_bypass_allows_existing() {
        let selector = VaultSelector::new(SelectionPolicy {
            bypass_diversification: true,
            ..SelectionPolicy::default()
        });
        let candidates = vec![candidate(1, "Held", Some(0.09))];
        assert_eq!(
            selector.select(&candidates, &[position(1, 100)]).unwrap().vault.name,
            "Held"
        );
    }
}
