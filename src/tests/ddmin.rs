use super::*;
use std::collections::BTreeSet;

fn triggers(sets: &'static [&'static [u32]]) -> impl FnMut(&[u32]) -> Outcome {
    move |candidate| {
        sets.iter()
            .any(|set| set.iter().all(|e| candidate.contains(e)))
            .into()
    }
}

fn sorted(mut sets: Vec<Vec<u32>>) -> Vec<Vec<u32>> {
    for set in &mut sets {
        set.sort_unstable();
    }
    sets.sort();
    sets
}

#[test]
fn failing_full_set_gives_none() {
    let elements: Vec<u32> = (0..8).collect();
    assert_eq!(ddmin(&elements, triggers(&[&[9]])), None);
}

#[test]
fn passing_empty_set_gives_empty() {
    let elements: Vec<u32> = (0..8).collect();
    assert_eq!(ddmin(&elements, |_| Outcome::Contains), Some(vec![]));
}

#[test]
fn single_culprit() {
    let elements: Vec<u32> = (0..16).collect();
    assert_eq!(ddmin(&elements, triggers(&[&[11]])), Some(vec![11]));
}

#[test]
fn culprit_pair_is_kept_together() {
    let elements: Vec<u32> = (0..10).collect();
    assert_eq!(ddmin(&elements, triggers(&[&[2, 6]])), Some(vec![2, 6]));
}

#[test]
fn result_is_one_minimal() {
    let elements: Vec<u32> = (0..12).collect();
    let mut test = triggers(&[&[1, 2], &[7], &[3, 4, 5]]);
    let found = ddmin(&elements, &mut test).unwrap();

    assert_eq!(test(&found), Outcome::Contains);
    for i in 0..found.len() {
        let mut smaller = found.clone();
        smaller.remove(i);
        assert_eq!(test(&smaller), Outcome::DoesNotContain);
    }
}

#[test]
fn probe_errors_propagate() {
    let elements: Vec<u32> = (0..8).collect();
    let mut probes = 0;
    let result = try_ddmin(&elements, |_| {
        probes += 1;
        if probes > 1 {
            Err("evaluator crashed")
        } else {
            Ok(Outcome::Contains)
        }
    });
    assert_eq!(result, Err("evaluator crashed"));
}

#[test]
fn all_minimal_sets_are_found() {
    let elements: Vec<u32> = (0..6).collect();
    let found = ddmin_all(&elements, triggers(&[&[1, 2], &[3], &[2, 4]]));
    assert_eq!(sorted(found), vec![vec![1, 2], vec![2, 4], vec![3]]);
}

#[test]
fn all_minimal_with_no_trigger_is_empty() {
    let elements: Vec<u32> = (0..6).collect();
    assert!(ddmin_all(&elements, triggers(&[&[7]])).is_empty());
}

#[test]
fn all_minimal_with_unconditional_target() {
    let elements: Vec<u32> = (0..4).collect();
    assert_eq!(
        ddmin_all(&elements, |_| Outcome::Contains),
        vec![Vec::<u32>::new()]
    );
}

#[test]
fn duplicates_are_ignored() {
    let found = ddmin_all(&[1, 1, 2, 2], triggers(&[&[1]]));
    assert_eq!(found, vec![vec![1]]);
}

#[test]
fn results_are_distinct() {
    let elements: Vec<u32> = (0..8).collect();
    let found = ddmin_all(&elements, triggers(&[&[0, 1], &[2, 3], &[4, 5], &[6]]));
    let distinct: BTreeSet<Vec<u32>> = sorted(found.clone()).into_iter().collect();
    assert_eq!(distinct.len(), found.len());
    assert_eq!(found.len(), 4);
}

#[test]
fn cached_sets_skip_minimization() {
    let mut calls = 0;
    let found = enumerate_minimal::<_, (), _>(&['a', 'b'], |candidate| {
        calls += 1;
        Ok(candidate.contains(&'a').then(|| vec!['a']))
    })
    .unwrap();

    assert_eq!(found, vec![vec!['a']]);
    // Root and the candidate without `a`.
    assert_eq!(calls, 2);
}

#[test]
fn minimizer_errors_stop_enumeration() {
    let result = enumerate_minimal::<u32, &str, _>(&[1, 2, 3], |_| Err("boom"));
    assert_eq!(result, Err("boom"));
}

#[test]
fn sorted_subset_check() {
    assert!(is_sorted_subset(&[1, 3], &[0, 1, 2, 3]));
    assert!(is_sorted_subset(&[], &[0]));
    assert!(!is_sorted_subset(&[1, 4], &[0, 1, 2, 3]));
}
