//! Delta debugging over monotone set predicates.
//!
//! The probe passed to these functions must be deterministic and monotone:
//! if a set produces the target, every superset does too.

use std::convert::Infallible;
use std::hash::Hash;

use crate::analysis::{FxMap, FxSet};
use crate::trace::trace;

/// Result of probing one candidate set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Contains,
    DoesNotContain,
}

impl From<bool> for Outcome {
    fn from(found: bool) -> Self {
        if found {
            Outcome::Contains
        } else {
            Outcome::DoesNotContain
        }
    }
}

/// Shrink `elements` to a 1-minimal subset that still passes `test`.
///
/// Returns `None` if the full set does not pass, and the empty set if the
/// empty set already passes. Probe errors are returned unchanged.
pub fn try_ddmin<T, E, F>(elements: &[T], mut test: F) -> Result<Option<Vec<T>>, E>
where
    T: Clone,
    F: FnMut(&[T]) -> Result<Outcome, E>,
{
    if test(elements)? == Outcome::DoesNotContain {
        return Ok(None);
    }
    if test(&[])? == Outcome::Contains {
        return Ok(Some(Vec::new()));
    }

    let mut input = elements.to_vec();
    let mut n = 2;
    while input.len() >= 2 {
        let chunk = (input.len() / n).max(1);
        let mut reduced = false;
        let mut start = 0;
        while start < input.len() {
            let end = (start + chunk).min(input.len());
            let complement: Vec<T> = input[..start]
                .iter()
                .chain(&input[end..])
                .cloned()
                .collect();
            if test(&complement)? == Outcome::Contains {
                input = complement;
                n = (n - 1).max(2);
                reduced = true;
                break;
            }
            start += chunk;
        }
        if !reduced {
            if n >= input.len() {
                break;
            }
            n = (n * 2).min(input.len());
        }
    }
    trace!(size = input.len(), "ddmin finished");
    Ok(Some(input))
}

/// Infallible form of [`try_ddmin`].
pub fn ddmin<T, F>(elements: &[T], mut test: F) -> Option<Vec<T>>
where
    T: Clone,
    F: FnMut(&[T]) -> Outcome,
{
    match try_ddmin::<T, Infallible, _>(elements, |s| Ok(test(s))) {
        Ok(result) => result,
        Err(never) => match never {},
    }
}

/// Every minimal subset found by repeatedly excluding one element of each
/// minimal set already found.
///
/// Duplicates in `elements` are ignored. Results are deduplicated and each is
/// listed in the order its elements appear in `elements`.
pub fn try_ddmin_all<T, E, F>(elements: &[T], mut test: F) -> Result<Vec<Vec<T>>, E>
where
    T: Clone + Eq + Hash,
    F: FnMut(&[T]) -> Result<Outcome, E>,
{
    enumerate_minimal(elements, |candidate| try_ddmin(candidate, &mut test))
}

/// Infallible form of [`try_ddmin_all`].
pub fn ddmin_all<T, F>(elements: &[T], mut test: F) -> Vec<Vec<T>>
where
    T: Clone + Eq + Hash,
    F: FnMut(&[T]) -> Outcome,
{
    match try_ddmin_all::<T, Infallible, _>(elements, |s| Ok(test(s))) {
        Ok(result) => result,
        Err(never) => match never {},
    }
}

/// Depth-first search for all minimal sets.
///
/// `minimize` maps a candidate to one minimal passing subset of it, or `None`
/// if the candidate does not pass. Minimal sets already found are reused for
/// any later candidate that contains them; a candidate is visited once.
pub fn enumerate_minimal<T, E, M>(elements: &[T], mut minimize: M) -> Result<Vec<Vec<T>>, E>
where
    T: Clone + Eq + Hash,
    M: FnMut(&[T]) -> Result<Option<Vec<T>>, E>,
{
    let mut universe: Vec<T> = Vec::new();
    let mut index: FxMap<T, usize> = FxMap::default();
    for e in elements {
        if !index.contains_key(e) {
            index.insert(e.clone(), universe.len());
            universe.push(e.clone());
        }
    }

    let mut cache: Vec<Vec<usize>> = Vec::new();
    let mut seen_results: FxSet<Vec<usize>> = FxSet::default();
    let mut visited: FxSet<Vec<usize>> = FxSet::default();
    let mut results: Vec<Vec<usize>> = Vec::new();

    let mut stack: Vec<Vec<usize>> = vec![(0..universe.len()).collect()];
    while let Some(candidate) = stack.pop() {
        if !visited.insert(candidate.clone()) {
            continue;
        }

        let minimal = match cache
            .iter()
            .find(|m| m.len() <= candidate.len() && is_sorted_subset(m, &candidate))
        {
            Some(hit) => hit.clone(),
            None => {
                let members: Vec<T> = candidate.iter().map(|&i| universe[i].clone()).collect();
                let Some(found) = minimize(&members)? else {
                    continue;
                };
                let mut ids: Vec<usize> = found
                    .iter()
                    .filter_map(|e| index.get(e).copied())
                    .collect();
                ids.sort_unstable();
                ids.dedup();
                cache.push(ids.clone());
                ids
            }
        };

        if seen_results.insert(minimal.clone()) {
            results.push(minimal.clone());
        }

        // Children are pushed in reverse so the first element is explored first.
        for &drop in minimal.iter().rev() {
            let child: Vec<usize> = candidate.iter().copied().filter(|&i| i != drop).collect();
            if !visited.contains(&child) {
                stack.push(child);
            }
        }
    }

    trace!(
        candidates = visited.len(),
        minimal_sets = results.len(),
        "minimal set enumeration finished"
    );

    Ok(results
        .into_iter()
        .map(|ids| ids.into_iter().map(|i| universe[i].clone()).collect())
        .collect())
}

fn is_sorted_subset(small: &[usize], large: &[usize]) -> bool {
    let mut it = large.iter();
    small.iter().all(|x| it.any(|y| y == x))
}

#[cfg(test)]
#[path = "tests/ddmin.rs"]
mod tests;
