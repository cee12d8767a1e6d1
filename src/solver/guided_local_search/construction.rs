use crate::solver::cost_matrix::CostMatrix;

/// PATH_CHEAPEST_ARC: from the depot, repeatedly extend the path along the
/// cheapest arc to a node not yet visited. Returns the order without the depot.
pub fn path_cheapest_arc(matrix: &CostMatrix, depot: usize) -> Vec<usize> {
    let n = matrix.size();
    let mut visited = vec![false; n];
    visited[depot] = true;

    let mut order = Vec::with_capacity(n.saturating_sub(1));
    let mut current = depot;
    while order.len() + 1 < n {
        let next = (0..n)
            .filter(|&j| !visited[j])
            .min_by_key(|&j| (matrix.get(current, j), j));
        match next {
            Some(j) => {
                visited[j] = true;
                order.push(j);
                current = j;
            }
            None => break,
        }
    }
    order
}
