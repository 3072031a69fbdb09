use std::time::{Duration, Instant};

use chess_core::{GameState, Move, ScopedMove};
use log::{debug, trace};

use crate::evaluation::{piece_value, Evaluator};

const INFINITY: i32 = 1_000_000;

/// Score of being checkmated at the root; mates further away score closer to zero.
pub const MATE_SCORE: i32 = 100_000;

const TIME_CHECK_INTERVAL: u64 = 1000; // Check time every 1000 nodes

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub best_move: Option<Move>,
    pub score: i32,
    /// Deepest fully completed depth.
    pub depth: u8,
    pub nodes: u64,
    pub stopped: bool,
}

/// How far a search may go. Budgets only interrupt iterative deepening, and
/// never the first depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub max_depth: u8,
    pub move_time: Option<Duration>,
    pub nodes: Option<u64>,
}

impl SearchLimits {
    pub fn depth(depth: u8) -> Self {
        Self {
            max_depth: depth,
            move_time: None,
            nodes: None,
        }
    }

    pub fn with_move_time(self, millis: u64) -> Self {
        Self {
            move_time: Some(Duration::from_millis(millis)),
            ..self
        }
    }

    pub fn with_nodes(self, nodes: u64) -> Self {
        Self {
            nodes: Some(nodes),
            ..self
        }
    }
}

/// Search behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    pub iterative_deepening: bool,
    pub capture_ordering: bool,
    pub evaluator: Evaluator,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            iterative_deepening: false,
            capture_ordering: true,
            evaluator: Evaluator::MATERIAL,
        }
    }
}

struct SearchInfo {
    start_time: Instant,
    limits: SearchLimits,
    options: SearchOptions,
    nodes: u64,
    stopped: bool,
    budget_active: bool,
}

impl SearchInfo {
    fn new(limits: SearchLimits, options: SearchOptions) -> Self {
        Self {
            start_time: Instant::now(),
            limits,
            options,
            nodes: 0,
            stopped: false,
            budget_active: false,
        }
    }

    fn should_stop(&mut self) -> bool {
        if self.stopped {
            return true;
        }
        if !self.budget_active {
            return false;
        }

        // Check node limit
        if let Some(max_nodes) = self.limits.nodes {
            if self.nodes >= max_nodes {
                self.stopped = true;
                return true;
            }
        }

        // Check time limit periodically
        if self.nodes % TIME_CHECK_INTERVAL == 0 && self.out_of_time() {
            self.stopped = true;
            return true;
        }

        false
    }

    fn out_of_time(&self) -> bool {
        self.limits
            .move_time
            .is_some_and(|move_time| self.start_time.elapsed() >= move_time)
    }

    fn out_of_nodes(&self) -> bool {
        self.limits.nodes.is_some_and(|max| self.nodes >= max)
    }
}

/// Fixed-depth negamax search with default options.
pub fn search(state: &mut GameState, depth: u8) -> SearchResult {
    search_with(state, SearchLimits::depth(depth), SearchOptions::default())
}

/// Searches the side to move's best move. The state is restored on return.
///
/// Depth 0 returns the static evaluation and no move.
pub fn search_with(
    state: &mut GameState,
    limits: SearchLimits,
    options: SearchOptions,
) -> SearchResult {
    let mut info = SearchInfo::new(limits, options);

    if limits.max_depth == 0 {
        return SearchResult {
            best_move: None,
            score: options.evaluator.evaluate(state, state.turn),
            depth: 0,
            nodes: 1,
            stopped: false,
        };
    }

    let mut root = ScopedMove::root(state);
    let result = if options.iterative_deepening {
        iterative_deepening(&mut root, &mut info)
    } else {
        let (score, best_move) = alpha_beta_root(&mut root, limits.max_depth, &mut info);
        SearchResult {
            best_move,
            score,
            depth: limits.max_depth,
            nodes: info.nodes,
            stopped: false,
        }
    };

    debug!(
        "search: depth {} score {} nodes {} move {:?} in {:?}",
        result.depth,
        result.score,
        result.nodes,
        result.best_move.map(|m| m.to_string()),
        info.start_time.elapsed()
    );
    result
}

/// Legal moves of the side to move, captures first by captured-piece value.
/// The sort is stable, so equal captures keep generation order.
pub fn ordered_moves(state: &GameState, capture_ordering: bool) -> Vec<Move> {
    let mut moves: Vec<Move> = state.all_legal_moves(state.turn).iter().copied().collect();
    if capture_ordering {
        moves.sort_by_key(|mv| {
            std::cmp::Reverse(
                state
                    .board
                    .piece_at(mv.to)
                    .map_or(0, |p| piece_value(p.piece_type)),
            )
        });
    }
    moves
}

fn alpha_beta_root(
    root: &mut ScopedMove<'_>,
    depth: u8,
    info: &mut SearchInfo,
) -> (i32, Option<Move>) {
    let moves = ordered_moves(root, info.options.capture_ordering);
    if moves.is_empty() {
        return (terminal_score(root, 0), None);
    }

    let mut alpha = -INFINITY;
    let beta = INFINITY;
    let mut best_move = None;
    let mut best_score = -INFINITY;

    for mv in moves {
        let Ok(mut child) = root.nest(mv) else {
            continue;
        };
        let score = -alpha_beta(&mut child, depth - 1, 1, -beta, -alpha, info);
        drop(child);

        if info.stopped {
            break;
        }

        if score > best_score {
            best_score = score;
            best_move = Some(mv);
        }

        if score > alpha {
            alpha = score;
        }
    }

    (best_score, best_move)
}

fn alpha_beta(
    node: &mut ScopedMove<'_>,
    depth: u8,
    ply: i32,
    mut alpha: i32,
    beta: i32,
    info: &mut SearchInfo,
) -> i32 {
    info.nodes += 1;

    // Check if we should stop searching
    if info.should_stop() {
        return 0;
    }

    // Leaves still distinguish being mated from a quiet position.
    if depth == 0 {
        if !node.has_any_legal_move(node.turn) {
            return terminal_score(node, ply);
        }
        return info.options.evaluator.evaluate(node, node.turn);
    }

    let moves = ordered_moves(node, info.options.capture_ordering);

    // No legal moves - checkmate or stalemate
    if moves.is_empty() {
        return terminal_score(node, ply);
    }

    let mut best_score = -INFINITY;

    for mv in moves {
        let Ok(mut child) = node.nest(mv) else {
            continue;
        };
        let score = -alpha_beta(&mut child, depth - 1, ply + 1, -beta, -alpha, info);
        drop(child);

        if info.stopped {
            return best_score;
        }

        if score > best_score {
            best_score = score;
        }

        if score > alpha {
            alpha = score;
        }

        // Beta cutoff
        if alpha >= beta {
            break;
        }
    }

    best_score
}

/// Score for a side with no legal moves, `ply` half-moves below the root.
fn terminal_score(state: &GameState, ply: i32) -> i32 {
    if state.is_in_check(state.turn) {
        -MATE_SCORE + ply
    } else {
        0
    }
}

fn iterative_deepening(root: &mut ScopedMove<'_>, info: &mut SearchInfo) -> SearchResult {
    let mut best_result = SearchResult {
        best_move: None,
        score: 0,
        depth: 0,
        nodes: 0,
        stopped: false,
    };

    for depth in 1..=info.limits.max_depth {
        let (score, best_move) = alpha_beta_root(root, depth, info);

        // Only update result if we completed this depth
        if info.stopped {
            trace!("depth {depth} abandoned after {} nodes", info.nodes);
            break;
        }

        best_result.best_move = best_move;
        best_result.score = score;
        best_result.depth = depth;
        best_result.nodes = info.nodes;
        trace!("depth {depth} complete: score {score} nodes {}", info.nodes);

        // Stop if we found checkmate
        if best_move.is_none() || score.abs() >= MATE_SCORE - 100 {
            break;
        }

        // Budget is checked between depths, then enforced inside deeper ones.
        if info.out_of_time() || info.out_of_nodes() {
            info.stopped = true;
            break;
        }
        info.budget_active = true;
    }

    best_result.stopped = info.stopped;
    best_result
}
