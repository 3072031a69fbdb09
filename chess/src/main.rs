use std::io::{self, BufRead, Write};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chess_agents::{
    material_balance, play_match, search_with, Agent, AgentConfig, Evaluator, MatchEnd,
    SearchLimits, SearchOptions,
};
use chess_core::{
    perft, perft_detailed, perft_divide, Color, GameState, GameStatus, Move, PieceType, Promotion,
};
use clap::{Parser, Subcommand};
use log::info;

#[derive(Parser)]
#[command(name = "chess", about = "Chess rules engine and search agents")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Let two agents play each other
    Selfplay {
        #[arg(long, default_value = "minimax:2")]
        white: AgentConfig,
        #[arg(long, default_value = "random")]
        black: AgentConfig,
        #[arg(long, default_value_t = 200)]
        max_plies: usize,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        fen: Option<String>,
    },
    /// Play against an agent on the terminal
    Play {
        #[arg(long, default_value = "iterative:3")]
        engine: AgentConfig,
        /// Side the human plays
        #[arg(long, default_value = "white")]
        color: String,
    },
    /// Count leaf nodes of the move tree
    Perft {
        depth: u8,
        #[arg(long)]
        fen: Option<String>,
        /// Print per-move counts
        #[arg(long)]
        divide: bool,
        /// Print capture, castle and check statistics
        #[arg(long)]
        detailed: bool,
    },
    /// Parse and display a FEN position
    Fen { fen: String },
    /// Static evaluation of a position
    Eval {
        #[arg(long)]
        fen: Option<String>,
    },
    /// Search for the best move
    Search {
        #[arg(long, default_value_t = 4)]
        depth: u8,
        #[arg(long)]
        fen: Option<String>,
        /// Stop deepening after this many milliseconds
        #[arg(long)]
        movetime: Option<u64>,
        #[arg(long)]
        no_ordering: bool,
    },
}

fn load_position(fen: Option<&str>) -> Result<GameState> {
    match fen {
        Some(fen) => GameState::from_fen(fen).with_context(|| format!("bad FEN {fen:?}")),
        None => Ok(GameState::new()),
    }
}

fn piece_symbol(c: char) -> char {
    let Some(piece_type) = PieceType::from_char(c) else {
        return c;
    };
    match (piece_type, c.is_ascii_uppercase()) {
        (PieceType::King, true) => '♔',
        (PieceType::Queen, true) => '♕',
        (PieceType::Rook, true) => '♖',
        (PieceType::Bishop, true) => '♗',
        (PieceType::Knight, true) => '♘',
        (PieceType::Pawn, true) => '♙',
        (PieceType::King, false) => '♚',
        (PieceType::Queen, false) => '♛',
        (PieceType::Rook, false) => '♜',
        (PieceType::Bishop, false) => '♝',
        (PieceType::Knight, false) => '♞',
        (PieceType::Pawn, false) => '♟',
    }
}

fn display_board(state: &GameState) {
    println!("\n  a b c d e f g h");
    println!("  ---------------");

    for (row, cells) in state.board_rows().iter().enumerate() {
        let rank = 8 - row;
        print!("{rank} ");
        for cell in cells {
            match cell {
                Some(c) => print!("{} ", piece_symbol(*c)),
                None => print!(". "),
            }
        }
        println!("| {rank}");
    }

    println!("  ---------------");
    println!("  a b c d e f g h\n");

    println!("{} to move", state.turn);
    if let Some(ep) = state.en_passant {
        println!("En passant: {ep}");
    }
    let scores = state.scores();
    println!("Captured points: white {} / black {}", scores.white, scores.black);
    println!("Status: {}", state.status());
}

fn run_perft(state: &mut GameState, depth: u8, divide: bool, detailed: bool) {
    println!("Running perft({depth})...");
    println!("Position: {}", state.to_fen());

    let start = Instant::now();

    if divide {
        let results = perft_divide(state, depth);
        let mut total = 0;

        for (mv, promotion, count) in &results {
            let suffix = promotion.map_or(String::new(), |p| p.piece_type().letter().to_string());
            println!("{mv}{suffix}: {count}");
            total += count;
        }

        println!("\nTotal: {total}");
    } else if detailed {
        let results = perft_detailed(state, depth);
        println!("Nodes: {}", results.nodes);
        println!("Captures: {}", results.captures);
        println!("En passant: {}", results.en_passants);
        println!("Castles: {}", results.castles);
        println!("Promotions: {}", results.promotions);
        println!("Checks: {}", results.checks);
        println!("Checkmates: {}", results.checkmates);
    } else {
        let nodes = perft(state, depth);
        println!("Nodes: {nodes}");
    }

    let elapsed = start.elapsed();
    println!("Time: {:.2}s", elapsed.as_secs_f64());
}

fn run_eval(state: &GameState) {
    display_board(state);
    let turn = state.turn;
    println!(
        "Material: {} cp (from {turn}'s perspective)",
        material_balance(state, turn)
    );
    println!(
        "With knight table: {} cp",
        Evaluator::WITH_KNIGHT_TABLE.evaluate(state, turn)
    );
    let material = state.material();
    println!(
        "Piece points: white {} / black {} ({:+})",
        material.white,
        material.black,
        material.diff()
    );
}

fn run_search(state: &mut GameState, depth: u8, movetime: Option<u64>, ordering: bool) {
    println!("Position: {}", state.to_fen());
    println!("Searching to depth {depth}...");

    let mut limits = SearchLimits::depth(depth);
    if let Some(millis) = movetime {
        limits = limits.with_move_time(millis);
    }
    let options = SearchOptions {
        iterative_deepening: true,
        capture_ordering: ordering,
        ..SearchOptions::default()
    };

    let start = Instant::now();
    let result = search_with(state, limits, options);
    let elapsed = start.elapsed();

    match result.best_move {
        Some(best_move) => {
            println!("\nBest move: {best_move}");
            println!("Score: {} cp", result.score);
            println!("Depth: {}", result.depth);
            println!("Nodes: {}", result.nodes);
            println!("Time: {:.2}s", elapsed.as_secs_f64());
            if result.stopped {
                println!("(search stopped by time limit)");
            }
        }
        None => println!("No legal moves available ({})", state.status()),
    }
}

fn run_selfplay(
    mut state: GameState,
    white: &AgentConfig,
    black: &AgentConfig,
    max_plies: usize,
    seed: Option<u64>,
) -> Result<()> {
    let mut white_agent = white.build(seed).context("building white agent")?;
    let mut black_agent = black
        .build(seed.map(|s| s.wrapping_add(1)))
        .context("building black agent")?;

    info!("{} (white) vs {} (black)", white_agent.name(), black_agent.name());
    let result = play_match(
        &mut state,
        white_agent.as_mut(),
        black_agent.as_mut(),
        max_plies,
    );

    display_board(&state);
    let moves: Vec<String> = result.moves.iter().map(ToString::to_string).collect();
    println!("Moves: {}", moves.join(" "));
    match &result.end {
        MatchEnd::Finished(GameStatus::Checkmate { winner }) => println!("Checkmate - {winner} wins"),
        MatchEnd::Finished(status) => println!("Game over: {status}"),
        MatchEnd::PlyLimit => println!("Stopped after {} plies", result.plies()),
        MatchEnd::NoMove(color) => println!("{color} agent returned no move"),
        MatchEnd::Rejected { color, error } => println!("{color} agent played an illegal move: {error}"),
    }
    println!("FEN: {}", result.final_fen);
    Ok(())
}

/// Parses "e2e4" or "e7e8q".
fn parse_input_move(text: &str) -> Result<(Move, Option<Promotion>)> {
    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        bail!("expected a move like e2e4 or e7e8q");
    }
    let mv: Move = text[..4].parse()?;
    let promotion = match text[4..].chars().next() {
        Some(c) => Some(Promotion::from_char(c)?),
        None => None,
    };
    Ok((mv, promotion))
}

fn print_help() {
    println!("Enter moves like 'e2e4' or 'e7e8q' (for promotion)");
    println!("Commands: quit, undo, new, fen, help");
}

fn play_interactive(engine: &AgentConfig, human: Color) -> Result<()> {
    let mut agent = engine.build(None).context("building engine")?;
    let mut state = GameState::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Chess Engine - Interactive Mode ({} plays {})", agent.name(), human.opponent());
    print_help();

    loop {
        display_board(&state);

        let status = state.status();
        if status.is_check() && !status.is_over() {
            println!("Check!");
        }
        if status.is_over() {
            match status {
                GameStatus::Checkmate { winner } => println!("Checkmate! {winner} wins!"),
                _ => println!("Stalemate!"),
            }
            break;
        }

        if state.turn != human {
            println!("Engine thinking...");
            let Some(choice) = agent.pick_move(&mut state) else {
                println!("Engine has no move");
                break;
            };
            state.apply_move(choice.mv.from, choice.mv.to)?;
            if let Some(pending) = state.pending_promotion() {
                let promotion = choice
                    .promotion
                    .unwrap_or_else(|| agent.pick_promotion(pending.color));
                state.resolve_promotion(promotion)?;
            }
            println!("Engine plays: {choice}");
            continue;
        }

        print!("Your move: ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let input = line.trim();

        match input {
            "quit" => break,
            "help" => print_help(),
            "fen" => println!("{}", state.to_fen()),
            "new" => {
                state = GameState::new();
                println!("New game started!");
            }
            "undo" => {
                // Take back the engine's reply and our own move.
                let undone = (0..2).take_while(|_| state.undo_last_move().is_ok()).count();
                if undone == 0 {
                    println!("Nothing to undo");
                }
            }
            _ => match parse_input_move(input) {
                Ok((mv, promotion)) => {
                    if let Err(e) = state.apply_move(mv.from, mv.to) {
                        println!("{e}. Try again (e.g., e2e4)");
                        continue;
                    }
                    if state.pending_promotion().is_some() {
                        state.resolve_promotion(promotion.unwrap_or(Promotion::Queen))?;
                    }
                }
                Err(e) => println!("Invalid move: {e}"),
            },
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Command::Selfplay {
            white,
            black,
            max_plies,
            seed,
            fen,
        } => run_selfplay(load_position(fen.as_deref())?, &white, &black, max_plies, seed)?,
        Command::Play { engine, color } => {
            let human = match color.to_ascii_lowercase().as_str() {
                "white" | "w" => Color::White,
                "black" | "b" => Color::Black,
                other => bail!("unknown color {other:?}"),
            };
            play_interactive(&engine, human)?;
        }
        Command::Perft {
            depth,
            fen,
            divide,
            detailed,
        } => {
            let mut state = load_position(fen.as_deref())?;
            run_perft(&mut state, depth, divide, detailed);
        }
        Command::Fen { fen } => {
            let state = load_position(Some(&fen))?;
            display_board(&state);
            println!("FEN: {}", state.to_fen());
        }
        Command::Eval { fen } => run_eval(&load_position(fen.as_deref())?),
        Command::Search {
            depth,
            fen,
            movetime,
            no_ordering,
        } => {
            let mut state = load_position(fen.as_deref())?;
            run_search(&mut state, depth, movetime, !no_ordering);
        }
    }

    Ok(())
}
