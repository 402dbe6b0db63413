//! Random selection: which remaining candidate a spin lands on.
//!
//! The outcome is decided before the spin animation starts. Rounds before the
//! final one never pick the predetermined winner while another candidate is left;
//! the final round picks it whenever it is still remaining.

use crate::models::{Candidate, CandidateId};
use rand::Rng;

/// A selected candidate and its index in the full `remaining` list.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Selection {
    pub index: usize,
    pub candidate: Candidate,
}

/// Uniform pick over `pool` minus `exclude`.
///
/// Falls back to the whole pool when excluding leaves nothing. `None` only for an
/// empty pool. The returned index always refers to `pool`, not the filtered subset.
pub fn pick_uniform<R: Rng + ?Sized>(
    pool: &[Candidate],
    exclude: Option<&CandidateId>,
    rng: &mut R,
) -> Option<Selection> {
    if pool.is_empty() {
        return None;
    }
    let eligible: Vec<usize> = pool
        .iter()
        .enumerate()
        .filter(|(_, c)| exclude != Some(&c.id))
        .map(|(i, _)| i)
        .collect();
    let index = if eligible.is_empty() {
        rng.gen_range(0..pool.len())
    } else {
        eligible[rng.gen_range(0..eligible.len())]
    };
    Some(Selection {
        index,
        candidate: pool[index].clone(),
    })
}

/// Select the candidate for the current round.
///
/// `predetermined` is the configured winner id, if any; it only has an effect
/// when that candidate is in `remaining`.
pub fn select_for_round<R: Rng + ?Sized>(
    remaining: &[Candidate],
    is_final_round: bool,
    predetermined: Option<&CandidateId>,
    rng: &mut R,
) -> Option<Selection> {
    let configured = predetermined.and_then(|id| find(remaining, id));
    if is_final_round {
        return configured.or_else(|| pick_uniform(remaining, None, rng));
    }
    let exclude = match configured {
        Some(sel) if remaining.len() > 1 => Some(sel.candidate.id),
        _ => None,
    };
    pick_uniform(remaining, exclude.as_ref(), rng)
}

/// Locate a candidate by id in `remaining`.
pub fn find(remaining: &[Candidate], id: &CandidateId) -> Option<Selection> {
    remaining
        .iter()
        .position(|c| &c.id == id)
        .map(|index| Selection {
            index,
            candidate: remaining[index].clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn pool(n: usize) -> Vec<Candidate> {
        (1..=n)
            .map(|i| Candidate::with_id(format!("C{i}"), format!("c{i}@example.com"), format!("Candidate {i}")))
            .collect()
    }

    #[test]
    fn empty_pool_selects_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_uniform(&[], None, &mut rng), None);
        assert_eq!(select_for_round(&[], true, None, &mut rng), None);
    }

    #[test]
    fn index_refers_to_full_pool() {
        let p = pool(5);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let sel = pick_uniform(&p, Some(&"C1".to_string()), &mut rng).unwrap();
            assert_ne!(sel.candidate.id, "C1");
            assert_eq!(p[sel.index], sel.candidate);
        }
    }

    #[test]
    fn excluding_the_only_candidate_falls_back_to_it() {
        let p = pool(1);
        let mut rng = StdRng::seed_from_u64(3);
        let sel = pick_uniform(&p, Some(&"C1".to_string()), &mut rng).unwrap();
        assert_eq!(sel.index, 0);
    }

    #[test]
    fn non_final_round_never_picks_predetermined() {
        let p = pool(4);
        let winner = "C3".to_string();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let sel = select_for_round(&p, false, Some(&winner), &mut rng).unwrap();
            assert_ne!(sel.candidate.id, winner);
        }
    }

    #[test]
    fn final_round_always_picks_predetermined() {
        let p = pool(3);
        let winner = "C2".to_string();
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..100 {
            let sel = select_for_round(&p, true, Some(&winner), &mut rng).unwrap();
            assert_eq!(sel.index, 1);
        }
    }

    #[test]
    fn unknown_predetermined_is_ignored() {
        let p = pool(3);
        let ghost = "nobody".to_string();
        let mut rng = StdRng::seed_from_u64(9);
        let mut hits = [0usize; 3];
        for _ in 0..3000 {
            hits[select_for_round(&p, true, Some(&ghost), &mut rng).unwrap().index] += 1;
        }
        for h in hits {
            assert!((800..1200).contains(&h), "skewed distribution: {hits:?}");
        }
    }
}
