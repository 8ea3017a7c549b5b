use std::collections::HashMap;

use crate::types::Position;

/// Resolves planned player destinations against each other.
///
/// `current[i]` and `planned[i]` belong to the same player. Contested cells
/// send every claimant back, head-on swaps are cancelled, and a final settle
/// pass reverts any move into a cell that another player keeps, until no two
/// players share a destination.
pub(crate) fn resolve_moves(current: &[Position], planned: &[Position]) -> Vec<Position> {
    let mut resolved = planned.to_vec();

    let mut claims: HashMap<Position, Vec<usize>> = HashMap::new();
    for (idx, dest) in planned.iter().enumerate() {
        claims.entry(*dest).or_default().push(idx);
    }
    for claimants in claims.values() {
        if claimants.len() > 1 {
            for idx in claimants {
                resolved[*idx] = current[*idx];
            }
        }
    }

    for a in 0..resolved.len() {
        for b in (a + 1)..resolved.len() {
            let swapped = resolved[a] != current[a]
                && resolved[a] == current[b]
                && resolved[b] == current[a];
            if swapped {
                resolved[a] = current[a];
                resolved[b] = current[b];
            }
        }
    }

    loop {
        let mut holders: HashMap<Position, Vec<usize>> = HashMap::new();
        for (idx, dest) in resolved.iter().enumerate() {
            holders.entry(*dest).or_default().push(idx);
        }
        let mut reverted = false;
        for group in holders.values().filter(|group| group.len() > 1) {
            for idx in group {
                if resolved[*idx] != current[*idx] {
                    resolved[*idx] = current[*idx];
                    reverted = true;
                }
            }
        }
        if !reverted {
            break;
        }
    }

    resolved
}
