use crate::error::{Result, RouteError};

/// Maps a solver permutation back onto the caller's stop objects.
pub struct RouteAssembler;

impl RouteAssembler {
    /// Output has exactly `permutation.len()` items; indices may repeat
    /// (a closed tour names the depot twice).
    pub fn apply<T: Clone>(original: &[T], permutation: &[usize]) -> Result<Vec<T>> {
        permutation
            .iter()
            .map(|&index| {
                original
                    .get(index)
                    .cloned()
                    .ok_or(RouteError::IndexOutOfBounds {
                        index,
                        len: original.len(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_permutation_is_a_no_op() {
        for n in 0..6 {
            let stops: Vec<String> = (0..n).map(|i| format!("stop-{i}")).collect();
            let identity: Vec<usize> = (0..n).collect();
            assert_eq!(RouteAssembler::apply(&stops, &identity).unwrap(), stops);
        }
    }

    #[test]
    fn closed_tour_repeats_the_depot() {
        let stops = vec!["a", "b", "c"];
        assert_eq!(
            RouteAssembler::apply(&stops, &[0, 2, 1, 0]).unwrap(),
            vec!["a", "c", "b", "a"]
        );
    }

    #[test]
    fn out_of_bounds_index_fails() {
        let stops = vec!["a", "b"];
        assert_eq!(
            RouteAssembler::apply(&stops, &[0, 2]),
            Err(RouteError::IndexOutOfBounds { index: 2, len: 2 })
        );
    }
}
