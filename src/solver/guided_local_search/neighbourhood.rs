use rayon::prelude::*;

/// A change to the interior order (the tour without its depot endpoints).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    /// Take the node at `from` out and reinsert it at `to`.
    Relocate { from: usize, to: usize },
    Swap(usize, usize),
    /// Reverse the block `i..=j`.
    TwoOpt(usize, usize),
}

impl Move {
    pub fn apply(&self, order: &[usize]) -> Vec<usize> {
        let mut next = order.to_vec();
        match *self {
            Move::Relocate { from, to } => {
                let node = next.remove(from);
                next.insert(to, node);
            }
            Move::Swap(i, j) => next.swap(i, j),
            Move::TwoOpt(i, j) => next[i..=j].reverse(),
        }
        next
    }
}

/// Cost of `depot -> order... -> depot` under `arc`.
pub fn tour_cost(
    order: &[usize],
    depot: usize,
    arc: &(dyn Fn(usize, usize) -> f64 + Sync),
) -> f64 {
    let mut previous = depot;
    let mut total = 0.0;
    for &node in order {
        total += arc(previous, node);
        previous = node;
    }
    total + arc(previous, depot)
}

fn candidate_moves(m: usize) -> Vec<Move> {
    let pairs: Vec<(usize, usize)> = (0..m)
        .flat_map(|i| ((i + 1)..m).map(move |j| (i, j)))
        .collect();

    let mut moves = Vec::with_capacity(pairs.len() * 4);
    for &(i, j) in &pairs {
        moves.push(Move::Swap(i, j));
        moves.push(Move::Relocate { from: i, to: j });
        moves.push(Move::Relocate { from: j, to: i });
        if j > i + 1 {
            moves.push(Move::TwoOpt(i, j));
        }
    }
    moves
}

/// Score every relocate / swap / 2-opt neighbour of `order` and return them
/// sorted by resulting cost (ascending).
pub fn find_neighbours(
    order: &[usize],
    depot: usize,
    arc: &(dyn Fn(usize, usize) -> f64 + Sync),
) -> Vec<(f64, Move)> {
    let mut scored: Vec<(f64, Move)> = candidate_moves(order.len())
        .into_par_iter()
        .map(|mv| {
            let neighbour = mv.apply(order);
            (tour_cost(&neighbour, depot, arc), mv)
        })
        .collect();

    scored.par_sort_by(|a, b| a.0.total_cmp(&b.0));
    scored
}
