//! Path Finding
//!
//! Builds a token graph over the registered pairs and searches it for the
//! path that returns the most output for a given input.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use meadow_core::{Address, Amount, TokenId};

use crate::calculator::{calculate_price_impact, get_amount_out};
use crate::pair::Pair;

/// A directed edge: selling `token_in` into the pair at `pair`
#[derive(Debug, Clone)]
pub struct PairEdge {
    pub pair: Address,
    pub token_in: TokenId,
    pub token_out: TokenId,
    pub reserve_in: Amount,
    pub reserve_out: Amount,
}

/// Adjacency-list pair graph
#[derive(Debug, Clone, Default)]
pub struct PairGraph {
    pub adjacency: HashMap<TokenId, Vec<PairEdge>>,
}

/// A quoted path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Tokens visited, source first
    pub path: Vec<TokenId>,
    /// `amounts[0]` is the input, each later entry the output of one hop
    pub amounts: Vec<Amount>,
    /// End-to-end price impact, percent
    pub price_impact: f64,
}

impl Route {
    pub fn amount_out(&self) -> Amount {
        self.amounts.last().copied().unwrap_or(0)
    }
}

/// Build the graph. Pairs with an empty side are skipped.
pub fn build_pair_graph<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> PairGraph {
    let mut adjacency: HashMap<TokenId, Vec<PairEdge>> = HashMap::new();

    for pair in pairs {
        if pair.reserve0 == 0 || pair.reserve1 == 0 {
            continue;
        }
        adjacency
            .entry(pair.token0.clone())
            .or_default()
            .push(PairEdge {
                pair: pair.address.clone(),
                token_in: pair.token0.clone(),
                token_out: pair.token1.clone(),
                reserve_in: pair.reserve0,
                reserve_out: pair.reserve1,
            });
        adjacency
            .entry(pair.token1.clone())
            .or_default()
            .push(PairEdge {
                pair: pair.address.clone(),
                token_in: pair.token1.clone(),
                token_out: pair.token0.clone(),
                reserve_in: pair.reserve1,
                reserve_out: pair.reserve0,
            });
    }

    PairGraph { adjacency }
}

/// Find all acyclic paths from `source` to `target`, up to `max_hops`.
///
/// BFS with visited-token tracking; no token is revisited.
pub fn find_paths(
    graph: &PairGraph,
    source: &TokenId,
    target: &TokenId,
    max_hops: usize,
) -> Vec<Vec<PairEdge>> {
    let mut results = Vec::new();
    if source == target || max_hops == 0 {
        return results;
    }

    type SearchState = (TokenId, Vec<PairEdge>, HashSet<TokenId>);
    let mut queue: VecDeque<SearchState> = VecDeque::new();
    queue.push_back((source.clone(), Vec::new(), HashSet::from([source.clone()])));

    while let Some((current, path, visited)) = queue.pop_front() {
        let Some(edges) = graph.adjacency.get(&current) else {
            continue;
        };
        for edge in edges {
            if &edge.token_out == target {
                let mut complete = path.clone();
                complete.push(edge.clone());
                results.push(complete);
            } else if path.len() + 1 < max_hops && !visited.contains(&edge.token_out) {
                let mut next_visited = visited.clone();
                next_visited.insert(edge.token_out.clone());
                let mut next_path = path.clone();
                next_path.push(edge.clone());
                queue.push_back((edge.token_out.clone(), next_path, next_visited));
            }
        }
    }

    results
}

/// Quote a path by chaining `get_amount_out` through each hop.
///
/// Returns `None` if any hop fails or yields zero.
pub fn quote_path(path: &[PairEdge], amount_in: Amount, fee_bps: u64) -> Option<Route> {
    let first = path.first()?;
    if amount_in == 0 {
        return None;
    }

    let mut tokens = vec![first.token_in.clone()];
    let mut amounts = vec![amount_in];
    let mut current = amount_in;
    for edge in path {
        let out = get_amount_out(current, edge.reserve_in, edge.reserve_out, fee_bps).ok()?;
        if out == 0 {
            return None;
        }
        tokens.push(edge.token_out.clone());
        amounts.push(out);
        current = out;
    }

    // Compare the realised rate with the product of spot prices
    let spot_product: f64 = path
        .iter()
        .map(|e| e.reserve_out as f64 / e.reserve_in as f64)
        .product();
    let price_impact = if path.len() == 1 {
        calculate_price_impact(first.reserve_in, first.reserve_out, amount_in, current)
    } else if spot_product > 0.0 {
        let rate = current as f64 / amount_in as f64;
        ((spot_product - rate) / spot_product).abs() * 100.0
    } else {
        0.0
    };

    Some(Route {
        path: tokens,
        amounts,
        price_impact,
    })
}

/// Best route by output. Ties go to the shorter path.
pub fn find_best_route(
    graph: &PairGraph,
    source: &TokenId,
    target: &TokenId,
    amount_in: Amount,
    fee_bps: u64,
    max_hops: usize,
) -> Option<Route> {
    find_paths(graph, source, target, max_hops)
        .iter()
        .filter_map(|path| quote_path(path, amount_in, fee_bps))
        .max_by(|a, b| {
            a.amount_out()
                .cmp(&b.amount_out())
                .then(b.path.len().cmp(&a.path.len()))
        })
}
