//! Progress calculation over the set of completed steps.
//!
//! Inputs are treated as sets: duplicates and out-of-range ordinals are
//! dropped before counting.

use std::collections::BTreeSet;

use super::steps::TOTAL_STEPS;

/// Distinct, in-range ordinals from `completed`, ascending.
pub fn dedupe_steps(completed: &[u8]) -> Vec<u8> {
    completed
        .iter()
        .copied()
        .filter(|n| (1..=TOTAL_STEPS).contains(n))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Completion percentage, rounded to the nearest integer.
pub fn calculate_progress(completed: &[u8]) -> u8 {
    let done = dedupe_steps(completed).len() as f64;
    (100.0 * done / f64::from(TOTAL_STEPS)).round() as u8
}

pub fn is_onboarding_complete(completed: &[u8]) -> bool {
    dedupe_steps(completed).len() == usize::from(TOTAL_STEPS)
}

/// The step after `current`, or `None` at the last step or for invalid input.
pub fn next_step(current: u8) -> Option<u8> {
    if (1..TOTAL_STEPS).contains(&current) {
        Some(current + 1)
    } else {
        None
    }
}

/// The step before `current`, or `None` at the first step or for invalid input.
pub fn previous_step(current: u8) -> Option<u8> {
    if (2..=TOTAL_STEPS).contains(&current) {
        Some(current - 1)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_formula() {
        assert_eq!(calculate_progress(&[]), 0);
        assert_eq!(calculate_progress(&[1]), 8);
        assert_eq!(calculate_progress(&[1, 2, 3]), 25);
        assert_eq!(calculate_progress(&[1, 2, 3, 4, 5]), 42);
        assert_eq!(calculate_progress(&[1, 2, 3, 4, 5, 6]), 50);
        assert_eq!(calculate_progress(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]), 92);
        let all: Vec<u8> = (1..=12).collect();
        assert_eq!(calculate_progress(&all), 100);
    }

    #[test]
    fn every_count_matches_rounded_ratio() {
        for n in 0..=12u8 {
            let steps: Vec<u8> = (1..=n).collect();
            let expected = (100.0 * f64::from(n) / 12.0).round() as u8;
            assert_eq!(calculate_progress(&steps), expected, "n = {n}");
            assert_eq!(is_onboarding_complete(&steps), n == 12);
        }
    }

    #[test]
    fn duplicates_do_not_overcount() {
        let mut steps: Vec<u8> = (1..=11).collect();
        steps.push(8);
        assert_eq!(steps.len(), 12);
        assert!(!is_onboarding_complete(&steps));
        assert_eq!(calculate_progress(&steps), 92);
        assert_eq!(calculate_progress(&[3, 3, 3]), 8);
    }

    #[test]
    fn out_of_range_entries_are_ignored() {
        assert_eq!(dedupe_steps(&[0, 13, 2, 200, 2, 1]), vec![1, 2]);
        let mut steps: Vec<u8> = (1..=11).collect();
        steps.push(13);
        assert!(!is_onboarding_complete(&steps));
    }

    #[test]
    fn navigation_clamps_at_boundaries() {
        assert_eq!(next_step(12), None);
        assert_eq!(previous_step(1), None);
        for k in 1..12 {
            assert_eq!(next_step(k), Some(k + 1));
        }
        for k in 2..=12 {
            assert_eq!(previous_step(k), Some(k - 1));
        }
        assert_eq!(next_step(0), None);
        assert_eq!(previous_step(13), None);
    }
}
