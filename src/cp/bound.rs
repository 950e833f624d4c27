//! Relaxation lower bound.
//!
//! Drops every per-instance coupling except "each slot takes one value"
//! and, for fully distinct models, "a value fills at most one slot per
//! instance". What remains is a transportation problem over aggregate
//! counts with convex separable costs, solved exactly as a min-cost flow:
//!
//! ```text
//! source ──N──▶ slot ──(domain)──▶ value ──▶ sink
//! ```
//!
//! Slot→value arcs carry the balance terms, value→sink arcs carry the
//! participation deviation. Convex arc costs are expanded into parallel
//! arcs of non-decreasing unit cost, so successive shortest paths fill
//! them in order.
//!
//! # Reference
//! Ahuja, Magnanti & Orlin (1993), "Network Flows", Ch. 14 (Convex Cost Flows)

use std::collections::{HashMap, VecDeque};

use super::model::{AssignmentModel, Objective};

const EPS: f64 = 1e-12;

/// Outcome of the relaxation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum FlowBound {
    /// No assignment of the relaxation can cost less.
    Bound(f64),
    /// Even the relaxation cannot fill every slot of every instance.
    Infeasible,
    /// The flow computation did not converge.
    Unavailable,
}

#[derive(Debug, Clone)]
struct Arc {
    to: usize,
    rev: usize,
    cap: i64,
    cost: f64,
}

#[derive(Debug, Default)]
struct FlowGraph {
    adj: Vec<Vec<Arc>>,
}

impl FlowGraph {
    fn new(nodes: usize) -> Self {
        Self {
            adj: vec![Vec::new(); nodes],
        }
    }

    fn add_arc(&mut self, from: usize, to: usize, cap: i64, cost: f64) {
        let rev_from = self.adj[to].len();
        let rev_to = self.adj[from].len();
        self.adj[from].push(Arc {
            to,
            rev: rev_from,
            cap,
            cost,
        });
        self.adj[to].push(Arc {
            to: from,
            rev: rev_to,
            cap: 0,
            cost: -cost,
        });
    }

    /// Adds `cap` units with convex cost `f`, one arc per run of equal
    /// unit costs. Returns `f(0)`, which the arcs leave out.
    fn add_convex<F: Fn(i64) -> f64>(&mut self, from: usize, to: usize, cap: i64, f: F) -> f64 {
        let base = f(0);
        let mut run_cost = 0.0;
        let mut run_len = 0;
        let mut prev = base;
        for k in 0..cap {
            let next = f(k + 1);
            let unit = next - prev;
            prev = next;
            if run_len > 0 && (unit - run_cost).abs() > EPS {
                self.add_arc(from, to, run_len, run_cost);
                run_len = 0;
            }
            if run_len == 0 {
                run_cost = unit;
            }
            run_len += 1;
        }
        if run_len > 0 {
            self.add_arc(from, to, run_len, run_cost);
        }
        base
    }

    /// Successive shortest paths (SPFA) until `demand` units reach `sink`.
    ///
    /// Returns the total cost and the flow actually routed, or `None` if
    /// the label-correcting loop fails to settle.
    fn min_cost_flow(&mut self, source: usize, sink: usize, demand: i64) -> Option<(f64, i64)> {
        let n = self.adj.len();
        let mut flow = 0;
        let mut cost = 0.0;

        while flow < demand {
            let mut dist = vec![f64::INFINITY; n];
            let mut prev: Vec<Option<(usize, usize)>> = vec![None; n];
            let mut in_queue = vec![false; n];
            let mut relaxed = vec![0usize; n];
            let mut queue = VecDeque::new();

            dist[source] = 0.0;
            queue.push_back(source);
            in_queue[source] = true;

            while let Some(u) = queue.pop_front() {
                in_queue[u] = false;
                for (i, arc) in self.adj[u].iter().enumerate() {
                    if arc.cap <= 0 {
                        continue;
                    }
                    let candidate = dist[u] + arc.cost;
                    if candidate < dist[arc.to] - EPS {
                        dist[arc.to] = candidate;
                        prev[arc.to] = Some((u, i));
                        if !in_queue[arc.to] {
                            relaxed[arc.to] += 1;
                            if relaxed[arc.to] > n {
                                return None;
                            }
                            queue.push_back(arc.to);
                            in_queue[arc.to] = true;
                        }
                    }
                }
            }

            if !dist[sink].is_finite() {
                break;
            }

            let mut push = demand - flow;
            let mut v = sink;
            while let Some((u, i)) = prev[v] {
                push = push.min(self.adj[u][i].cap);
                v = u;
            }
            if push <= 0 {
                return None;
            }

            let mut v = sink;
            while let Some((u, i)) = prev[v] {
                let rev = self.adj[u][i].rev;
                self.adj[u][i].cap -= push;
                self.adj[v][rev].cap += push;
                v = u;
            }

            flow += push;
            cost += push as f64 * dist[sink];
        }

        Some((cost, flow))
    }
}

/// Computes the relaxation bound for `model` over the effective `domains`.
///
/// Without an objective the bound is 0.0 and only infeasibility is
/// informative.
pub(crate) fn lower_bound(model: &AssignmentModel, domains: &[Vec<usize>]) -> FlowBound {
    let slots = domains.len();
    let values = model.value_count;
    let n = model.instance_count as i64;
    if n == 0 || slots == 0 {
        return FlowBound::Bound(0.0);
    }

    let source = 0;
    let slot_node = |s: usize| 1 + s;
    let value_node = |v: usize| 1 + slots + v;
    let sink = 1 + slots + values;
    let mut graph = FlowGraph::new(sink + 1);

    let (target, balance) = match &model.objective {
        Some(Objective::Fairness { target, balance }) => (*target, balance.as_slice()),
        None => (0.0, &[][..]),
    };
    let weighted = model.objective.is_some();

    let mut terms: HashMap<(usize, usize), Vec<(f64, f64)>> = HashMap::new();
    for term in balance {
        terms
            .entry((term.slot, term.value))
            .or_default()
            .push((term.target, term.weight));
    }

    let mut constant = 0.0;

    for (slot, domain) in domains.iter().enumerate() {
        graph.add_arc(source, slot_node(slot), n, 0.0);
        for &value in domain {
            match terms.get(&(slot, value)) {
                Some(list) => {
                    constant += graph.add_convex(slot_node(slot), value_node(value), n, |k| {
                        list.iter()
                            .map(|&(t, w)| w * (k as f64 - t).abs())
                            .sum()
                    });
                }
                None => graph.add_arc(slot_node(slot), value_node(value), n, 0.0),
            }
        }
    }

    // Balance terms on pairs outside the domain sit at count zero.
    for (&(slot, value), list) in &terms {
        if !domains[slot].contains(&value) {
            constant += list.iter().map(|&(t, w)| w * t.abs()).sum::<f64>();
        }
    }

    let value_cap = if model.is_fully_distinct() {
        n
    } else {
        n * slots as i64
    };
    for value in 0..values {
        if weighted {
            constant += graph.add_convex(value_node(value), sink, value_cap, |k| {
                (k as f64 - target).abs()
            });
        } else {
            graph.add_arc(value_node(value), sink, value_cap, 0.0);
        }
    }

    let demand = n * slots as i64;
    match graph.min_cost_flow(source, sink, demand) {
        None => FlowBound::Unavailable,
        Some((_, flow)) if flow < demand => FlowBound::Infeasible,
        Some((cost, _)) => FlowBound::Bound(cost + constant),
    }
}
