use crate::error::NjError;
use num_traits::Float;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InputValidator<'a, T> {
    names: &'a [String],
    distances: &'a [Vec<T>],
}

impl<'a, T: Float> InputValidator<'a, T> {
    pub(crate) fn new(names: &'a [String], distances: &'a [Vec<T>]) -> Self {
        Self { names, distances }
    }

    pub(crate) fn validate_input_data(&self) -> Result<(), NjError> {
        let n = self.names.len();
        if n < 3 {
            return Err(NjError::TooFewTaxa(n));
        }
        if self.distances.len() != n {
            return Err(NjError::InputFormat(format!(
                "{n} taxa named but the distance matrix has {} rows",
                self.distances.len()
            )));
        }
        for (r, row) in self.distances.iter().enumerate() {
            if row.len() != n {
                return Err(NjError::InputFormat(format!(
                    "distance matrix row {r} has {} entries, expected {n}",
                    row.len()
                )));
            }
            for value in row {
                if !value.is_finite() {
                    return Err(NjError::InputFormat(format!(
                        "row {r} contains a non-finite distance"
                    )));
                }
            }
        }
        Ok(())
    }
}
