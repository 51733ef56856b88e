//! Balancing: find the one mode a SERIES of branch yields has in common,
//! for conditional, case and closed clauses.

use tracing::trace;

use crate::modes::{ModeId, ModeRegistry};

use super::coercion::{DeflexPolicy, Sort};

/// The outcome of balancing a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Balance {
    pub mode: ModeId,
    /// False when no common mode exists and the first member was adopted
    pub balanced: bool,
}

/// Search, in order of increasing depref depth, for a mode every non-HIP
/// member of the series is coercible to at strength `sort`.
///
/// At equal depth FLEX-bearing candidates are preferred (to retain
/// flexibility downstream); remaining ties break on the lowest registry
/// number, so the result does not depend on the order the members were
/// visited. A STRONG series with no balanced mode is accepted and voided;
/// at other sorts the caller reports ERROR_NO_UNIQUE_MODE.
pub fn balance(
    reg: &mut ModeRegistry,
    members: &[ModeId],
    sort: Sort,
    policy: DeflexPolicy,
) -> Balance {
    let live: Vec<ModeId> = members
        .iter()
        .copied()
        .filter(|&m| !reg.is_bottom(m))
        .collect();
    if live.is_empty() {
        // Every branch jumps, skips or is already in error
        let mode = members.first().copied().unwrap_or(reg.std.hip);
        return Balance {
            mode: if members.is_empty() { reg.std.void } else { mode },
            balanced: true,
        };
    }

    let chains: Vec<Vec<ModeId>> = live.iter().map(|&m| reg.depref_chain(m)).collect();
    let max_depth = chains.iter().map(Vec::len).max().unwrap_or(0);

    for depth in 0..max_depth {
        let mut candidates: Vec<ModeId> = Vec::new();
        for chain in &chains {
            if let Some(&c) = chain.get(depth) {
                if !candidates.contains(&c) {
                    candidates.push(c);
                }
            }
        }
        let mut winners: Vec<ModeId> = Vec::new();
        for &candidate in &candidates {
            if live
                .iter()
                .all(|&m| reg.coercible(m, candidate, sort, policy))
            {
                winners.push(candidate);
            }
        }
        if !winners.is_empty() {
            winners.sort_by_key(|&w| (!reg[w].has_flex, reg[w].number));
            trace!(
                mode = reg.display(winners[0]),
                depth, "balance: common mode found"
            );
            return Balance {
                mode: winners[0],
                balanced: true,
            };
        }
    }

    if sort == Sort::Strong {
        // Accepted anyway; each branch is voided individually
        return Balance {
            mode: reg.std.void,
            balanced: true,
        };
    }
    Balance {
        mode: live[0],
        balanced: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balances_to_widest() {
        let mut reg = ModeRegistry::new();
        let (int, real) = (reg.std.int, reg.std.real);
        let b = balance(&mut reg, &[int, real], Sort::Strong, DeflexPolicy::Safe);
        assert!(b.balanced);
        assert_eq!(b.mode, reg.std.real);
    }

    #[test]
    fn test_balances_names_by_depreffing() {
        let mut reg = ModeRegistry::new();
        let ref_int = reg.ref_to(reg.std.int);
        let int = reg.std.int;
        let b = balance(&mut reg, &[ref_int, int], Sort::Strong, DeflexPolicy::Safe);
        assert!(b.balanced);
        assert_eq!(b.mode, reg.std.int);
    }

    #[test]
    fn test_hip_members_are_skipped() {
        let mut reg = ModeRegistry::new();
        let (hip, real) = (reg.std.hip, reg.std.real);
        let b = balance(&mut reg, &[hip, real], Sort::Strong, DeflexPolicy::Safe);
        assert!(b.balanced);
        assert_eq!(b.mode, reg.std.real);
    }

    #[test]
    fn test_strong_accepts_unbalanced_as_void() {
        let mut reg = ModeRegistry::new();
        let (bool_, format) = (reg.std.bool_, reg.std.format);
        let b = balance(
            &mut reg,
            &[bool_, format],
            Sort::Strong,
            DeflexPolicy::Safe,
        );
        assert!(b.balanced);
        assert_eq!(b.mode, reg.std.void);
    }

    #[test]
    fn test_firm_reports_unbalanced() {
        let mut reg = ModeRegistry::new();
        let (bool_, format) = (reg.std.bool_, reg.std.format);
        let b = balance(&mut reg, &[bool_, format], Sort::Firm, DeflexPolicy::Safe);
        assert!(!b.balanced);
        assert_eq!(b.mode, reg.std.bool_);
    }

    #[test]
    fn test_order_independent() {
        let mut reg = ModeRegistry::new();
        let ref_int = reg.ref_to(reg.std.int);
        let members = [reg.std.int, ref_int, reg.std.real];
        let forward = balance(&mut reg, &members, Sort::Strong, DeflexPolicy::Safe);
        let mut reversed = members;
        reversed.reverse();
        let backward = balance(&mut reg, &reversed, Sort::Strong, DeflexPolicy::Safe);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_flex_candidate_preferred() {
        let mut reg = ModeRegistry::new();
        // [] CHAR and STRING balance; the flexible view wins
        let (row_char, string) = (reg.std.row_char, reg.std.string);
        let b = balance(
            &mut reg,
            &[row_char, string],
            Sort::Strong,
            DeflexPolicy::Safe,
        );
        assert!(b.balanced);
        assert_eq!(b.mode, reg.std.string);
    }
}
