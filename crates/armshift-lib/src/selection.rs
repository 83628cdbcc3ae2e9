//! Operator selection of workload IDs

use crate::error::SelectionError;
use std::collections::BTreeSet;

/// Word the operator must type to confirm a batch
pub const CONFIRM_WORD: &str = "confirm";

/// Parse `"3"`, `"0,1,2"`, `"1-9"` or mixtures like `"0,3-5"` into sorted, distinct IDs
///
/// Every ID must index into a list of `available` workloads.
pub fn parse_selection(input: &str, available: usize) -> Result<Vec<usize>, SelectionError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SelectionError::Empty);
    }

    let mut ids = BTreeSet::new();
    for part in input.split(',').map(str::trim) {
        if part.is_empty() {
            return Err(SelectionError::InvalidId(part.to_string()));
        }

        match part.split_once('-') {
            Some((start, end)) => {
                let start = parse_id(start.trim(), part)?;
                let end = parse_id(end.trim(), part)?;
                if start > end {
                    return Err(SelectionError::InvalidRange(part.to_string()));
                }
                if end >= available {
                    return Err(SelectionError::OutOfRange {
                        id: start.max(available),
                        available,
                    });
                }
                ids.extend(start..=end);
            }
            None => {
                ids.insert(parse_id(part, part)?);
            }
        }
    }

    if let Some(&id) = ids.iter().find(|&&id| id >= available) {
        return Err(SelectionError::OutOfRange { id, available });
    }
    Ok(ids.into_iter().collect())
}

fn parse_id(raw: &str, part: &str) -> Result<usize, SelectionError> {
    raw.parse::<usize>().map_err(|_| {
        if part.contains('-') {
            SelectionError::InvalidRange(part.to_string())
        } else {
            SelectionError::InvalidId(raw.to_string())
        }
    })
}

/// Accept only the exact confirmation word
pub fn check_confirmation(input: &str) -> Result<(), SelectionError> {
    if input.trim() == CONFIRM_WORD {
        Ok(())
    } else {
        Err(SelectionError::NotConfirmed)
    }
}
