/// Fractional position keys for lists and tasks
///
/// Siblings (lists on a board, tasks in a list) are sorted by an `f64`
/// position ascending. Keys are sparse: appending takes the last key plus
/// [`POSITION_GAP`], and a move writes the client-supplied key verbatim, so a
/// reorder only ever touches the moved row.
///
/// Clients typically place an item between two neighbours by taking their
/// midpoint. Repeated bisection of the same interval eventually runs out of
/// representable values; [`midpoint`] reports that case and [`spread`] yields a
/// fresh, evenly spaced key sequence for a renumbering pass.

use std::cmp::Ordering;

/// Distance between consecutively appended siblings
pub const POSITION_GAP: f64 = 1024.0;

/// Error returned when a requested position cannot be stored
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PositionError {
    #[error("position must be a finite number")]
    NotFinite,

    #[error("position must not be negative")]
    Negative,
}

/// Key for a sibling appended after the current last one
///
/// ```
/// use taskflow_shared::ordering::{next_position, POSITION_GAP};
///
/// assert_eq!(next_position(None), POSITION_GAP);
/// assert_eq!(next_position(Some(2048.0)), 3072.0);
/// ```
pub fn next_position(last: Option<f64>) -> f64 {
    match last {
        Some(last) => last + POSITION_GAP,
        None => POSITION_GAP,
    }
}

/// Checks a client-supplied move target
pub fn validate_position(position: f64) -> Result<f64, PositionError> {
    if !position.is_finite() {
        return Err(PositionError::NotFinite);
    }
    if position < 0.0 {
        return Err(PositionError::Negative);
    }
    Ok(position)
}

/// Key strictly between `prev` and `next`
///
/// A missing `prev` means "before the first sibling" (bounded below by 0), a
/// missing `next` means "after the last one". Returns `None` when the interval
/// is empty or too narrow to hold a distinct `f64`.
pub fn midpoint(prev: Option<f64>, next: Option<f64>) -> Option<f64> {
    match (prev, next) {
        (None, None) => Some(POSITION_GAP),
        (Some(prev), None) => Some(next_position(Some(prev))),
        (prev, Some(next)) => {
            let prev = prev.unwrap_or(0.0);
            if prev.partial_cmp(&next) != Some(Ordering::Less) {
                return None;
            }
            let mid = prev + (next - prev) / 2.0;
            (mid > prev && mid < next).then_some(mid)
        }
    }
}

/// Evenly spaced keys `GAP, 2*GAP, ...` for `count` siblings
pub fn spread(count: usize) -> Vec<f64> {
    (1..=count).map(|i| i as f64 * POSITION_GAP).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_sequence_steps_by_gap() {
        let mut last = None;
        let mut positions = Vec::new();
        for _ in 0..4 {
            let p = next_position(last);
            positions.push(p);
            last = Some(p);
        }
        assert_eq!(positions, vec![1024.0, 2048.0, 3072.0, 4096.0]);
    }

    #[test]
    fn test_validate_position() {
        assert_eq!(validate_position(0.0), Ok(0.0));
        assert_eq!(validate_position(512.5), Ok(512.5));
        assert_eq!(validate_position(-1.0), Err(PositionError::Negative));
        assert_eq!(validate_position(f64::NAN), Err(PositionError::NotFinite));
        assert_eq!(validate_position(f64::INFINITY), Err(PositionError::NotFinite));
    }

    #[test]
    fn test_midpoint_between_neighbours() {
        assert_eq!(midpoint(Some(1024.0), Some(2048.0)), Some(1536.0));
        assert_eq!(midpoint(None, Some(1024.0)), Some(512.0));
        assert_eq!(midpoint(Some(1024.0), None), Some(2048.0));
        assert_eq!(midpoint(None, None), Some(POSITION_GAP));
        assert_eq!(midpoint(Some(10.0), Some(10.0)), None);
        assert_eq!(midpoint(Some(20.0), Some(10.0)), None);
    }

    #[test]
    fn test_repeated_bisection_exhausts() {
        let prev = 1024.0;
        let mut next = 2048.0;
        let mut steps = 0;
        while let Some(mid) = midpoint(Some(prev), Some(next)) {
            next = mid;
            steps += 1;
            assert!(steps < 200, "bisection should run out of precision");
        }
        // f64 has 52 fraction bits; the gap of 1024 can be halved about that many times
        assert!(steps >= 40);
    }

    #[test]
    fn test_spread() {
        assert!(spread(0).is_empty());
        assert_eq!(spread(3), vec![1024.0, 2048.0, 3072.0]);
    }
}
