use crate::error::NjError;
use num_traits::Float;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// A parsed distance-matrix file: one name per taxon and a square matrix of
/// pairwise distances in the same order.
///
/// The matrix is stored exactly as read; symmetrization happens when an
/// engine is constructed from it.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceInput<T> {
    pub names: Vec<String>,
    pub distances: Vec<Vec<T>>,
}

/// Reads a distance-matrix file.
///
/// The format is whitespace-separated text: the first token is the taxon
/// count N, followed by N blocks each holding a taxon name and N distances.
///
/// # Parameters
/// * `path` - the file to read.
///
/// # Returns
/// * A result holding the parsed input, or an `NjError` if the file cannot
///   be read or its contents do not match the declared taxon count.
pub fn read_distance_file<T, P>(path: P) -> Result<DistanceInput<T>, NjError>
where
    T: Float + FromStr,
    P: AsRef<Path>,
{
    let contents = fs::read_to_string(path)?;
    parse_distance_input(&contents)
}

/// Parses distance-matrix text in the format of [`read_distance_file`].
pub fn parse_distance_input<T>(contents: &str) -> Result<DistanceInput<T>, NjError>
where
    T: Float + FromStr,
{
    let mut tokens = contents.split_whitespace();
    let rank_token = tokens
        .next()
        .ok_or_else(|| NjError::InputFormat(String::from("the distance file is empty")))?;
    let rank: usize = rank_token.parse().map_err(|_| {
        NjError::InputFormat(format!("expected a taxon count, found \"{rank_token}\""))
    })?;

    let mut names = Vec::with_capacity(rank);
    let mut distances = Vec::with_capacity(rank);
    for r in 0..rank {
        let name = tokens.next().ok_or_else(|| {
            NjError::InputFormat(format!("{rank} taxa declared but the file ends after {r}"))
        })?;
        let mut row = Vec::with_capacity(rank);
        for c in 0..rank {
            let token = tokens.next().ok_or_else(|| {
                NjError::InputFormat(format!(
                    "row for \"{name}\" ends after {c} of {rank} distances"
                ))
            })?;
            let value = token.parse::<T>().map_err(|_| {
                NjError::InputFormat(format!(
                    "expected a distance for \"{name}\", found \"{token}\""
                ))
            })?;
            row.push(value);
        }
        names.push(name.to_string());
        distances.push(row);
    }
    Ok(DistanceInput { names, distances })
}
