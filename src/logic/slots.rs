//! Slot window: the few candidates shown around the cursor.

use crate::models::{Candidate, SlotView};

/// Cells shown by the default slot display.
pub const VISIBLE_SLOTS: usize = 5;

/// `visible` candidates centered on `cursor`, wrapping around `remaining`.
///
/// With fewer candidates than cells the same candidate appears more than once.
pub fn slot_window(remaining: &[Candidate], cursor: usize, visible: usize) -> Vec<SlotView> {
    if remaining.is_empty() || visible == 0 {
        return Vec::new();
    }
    let len = remaining.len() as i64;
    let center = (visible / 2) as i64;
    (-center..visible as i64 - center)
        .map(|offset| {
            let index = (cursor as i64 + offset).rem_euclid(len) as usize;
            SlotView {
                candidate: remaining[index].clone(),
                is_center: offset == 0,
                offset: offset as i32,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(slots: &[SlotView]) -> Vec<&str> {
        slots.iter().map(|s| s.candidate.id.as_str()).collect()
    }

    fn pool(ids: &[&str]) -> Vec<Candidate> {
        ids.iter()
            .map(|id| Candidate::with_id(*id, format!("{id}@example.com"), *id))
            .collect()
    }

    #[test]
    fn wraps_around_both_ends() {
        let p = pool(&["A", "B", "C", "D", "E", "F"]);
        assert_eq!(names(&slot_window(&p, 0, 5)), ["E", "F", "A", "B", "C"]);
        assert_eq!(names(&slot_window(&p, 5, 5)), ["D", "E", "F", "A", "B"]);
        let center: Vec<_> = slot_window(&p, 2, 5).into_iter().filter(|s| s.is_center).collect();
        assert_eq!(center.len(), 1);
        assert_eq!(center[0].candidate.id, "C");
        assert_eq!(center[0].offset, 0);
    }

    #[test]
    fn small_pools_repeat_and_empty_pool_is_blank() {
        let p = pool(&["A", "B"]);
        assert_eq!(names(&slot_window(&p, 0, 5)), ["A", "B", "A", "B", "A"]);
        assert!(slot_window(&[], 0, 5).is_empty());
    }
}
