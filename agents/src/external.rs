//! Move selection delegated to an outside engine speaking the UCI text protocol.
//!
//! The engine only ever sees a FEN snapshot and answers with a `bestmove`
//! line. Any failure, including a reply that arrives too late, degrades to a
//! random legal move.

use std::io::{self, BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use chess_core::{GameState, Move, Promotion};
use log::{debug, warn};
use thiserror::Error;

use crate::random::RandomAgent;
use crate::{Agent, AgentMove};

/// How long the agent waits for a reply before falling back.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(700);

/// Thinking time requested from the engine.
pub const DEFAULT_MOVE_TIME: Duration = Duration::from_millis(200);

#[derive(Debug, Error)]
pub enum ExternalError {
    #[error("failed to start engine {path}: {source}")]
    Spawn {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("engine i/o failed: {0}")]
    Io(#[from] io::Error),

    #[error("engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("engine closed its output")]
    Disconnected,

    #[error("engine reported no move")]
    NoMove,

    #[error("malformed engine reply: {0:?}")]
    Malformed(String),

    #[error("engine suggested illegal move {0}")]
    Illegal(String),
}

/// A connection to something that can answer "best move for this FEN".
pub trait EngineLink {
    /// Sends the position and returns the engine's move text (e.g. "e7e8q").
    /// Must give up once `timeout` has elapsed.
    fn best_move(
        &mut self,
        fen: &str,
        move_time: Duration,
        timeout: Duration,
    ) -> Result<String, ExternalError>;
}

/// An engine child process. Its stdout is read on a background thread and
/// forwarded line by line through a channel.
///
/// A request that times out is told to `stop`; its late `bestmove` and an
/// `isready`/`readyok` exchange are consumed before the next position is
/// sent, so every reply belongs to the request that asked for it.
pub struct UciProcess {
    child: Child,
    stdin: ChildStdin,
    lines: Receiver<String>,
    uci_sent: bool,
    handshake_done: bool,
    searching: bool,
}

impl UciProcess {
    pub fn spawn(path: &str) -> Result<Self, ExternalError> {
        Self::from_command(Command::new(path))
    }

    /// Starts an engine from a prepared command, e.g. one with arguments.
    pub fn from_command(mut command: Command) -> Result<Self, ExternalError> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| ExternalError::Spawn {
                path: command.get_program().to_string_lossy().into_owned(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(ExternalError::Disconnected)?;
        let stdout = child.stdout.take().ok_or(ExternalError::Disconnected)?;

        let (tx, lines) = mpsc::channel();
        thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            child,
            stdin,
            lines,
            uci_sent: false,
            handshake_done: false,
            searching: false,
        })
    }

    fn send(&mut self, command: &str) -> Result<(), ExternalError> {
        writeln!(self.stdin, "{command}")?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Reads lines until `done` accepts one or the deadline passes.
    fn wait_for(
        &mut self,
        deadline: Instant,
        timeout: Duration,
        done: impl Fn(&str) -> bool,
    ) -> Result<String, ExternalError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.lines.recv_timeout(remaining) {
                Ok(line) if done(&line) => return Ok(line),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => return Err(ExternalError::Timeout(timeout)),
                Err(RecvTimeoutError::Disconnected) => return Err(ExternalError::Disconnected),
            }
        }
    }

    /// Brings the engine to an idle, ready state.
    fn synchronize(&mut self, deadline: Instant, timeout: Duration) -> Result<(), ExternalError> {
        if !self.uci_sent {
            self.send("uci")?;
            self.uci_sent = true;
        }
        if !self.handshake_done {
            self.wait_for(deadline, timeout, |line| line.trim() == "uciok")?;
            self.handshake_done = true;
        }

        if self.searching {
            // The abandoned search still owes us its bestmove.
            self.wait_for(deadline, timeout, |line| parse_bestmove(line).is_some())?;
            self.searching = false;
            self.send("isready")?;
            self.wait_for(deadline, timeout, |line| line.trim() == "readyok")?;
        }

        while self.lines.try_recv().is_ok() {}
        Ok(())
    }
}

impl EngineLink for UciProcess {
    fn best_move(
        &mut self,
        fen: &str,
        move_time: Duration,
        timeout: Duration,
    ) -> Result<String, ExternalError> {
        let deadline = Instant::now() + timeout;
        self.synchronize(deadline, timeout)?;

        self.send(&format!("position fen {fen}"))?;
        self.send(&format!("go movetime {}", move_time.as_millis()))?;
        self.searching = true;

        let line = match self.wait_for(deadline, timeout, |line| parse_bestmove(line).is_some()) {
            Ok(line) => line,
            Err(err @ ExternalError::Timeout(_)) => {
                if let Err(stop_err) = self.send("stop") {
                    debug!("could not stop engine search: {stop_err}");
                }
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        self.searching = false;

        parse_bestmove(&line).unwrap_or_else(|| Err(ExternalError::Malformed(line.clone())))
    }
}

impl Drop for UciProcess {
    fn drop(&mut self) {
        let _ = self.send("quit");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Extracts the move from a `bestmove <move> [ponder <move>]` line.
/// Returns `None` for any other line.
fn parse_bestmove(line: &str) -> Option<Result<String, ExternalError>> {
    let mut tokens = line.split_whitespace();
    if tokens.next()? != "bestmove" {
        return None;
    }
    Some(match tokens.next() {
        Some("(none)") | Some("0000") => Err(ExternalError::NoMove),
        Some(mv) => Ok(mv.to_string()),
        None => Err(ExternalError::Malformed(line.to_string())),
    })
}

/// Parses engine move text such as "e2e4" or "e7e8q".
pub fn parse_engine_move(text: &str) -> Result<AgentMove, ExternalError> {
    let malformed = || ExternalError::Malformed(text.to_string());

    if !text.is_ascii() || !(4..=5).contains(&text.len()) {
        return Err(malformed());
    }

    let mv: Move = text[..4].parse().map_err(|_| malformed())?;
    let promotion = match text[4..].chars().next() {
        Some(c) => Some(Promotion::from_char(c).map_err(|_| malformed())?),
        None => None,
    };

    Ok(AgentMove { mv, promotion })
}

/// Asks an [`EngineLink`] for moves and falls back to a random legal move on
/// any failure.
pub struct ExternalAgent<L: EngineLink> {
    name: String,
    link: L,
    timeout: Duration,
    move_time: Duration,
    fallback: RandomAgent,
}

impl<L: EngineLink> ExternalAgent<L> {
    pub fn new(link: L) -> Self {
        Self {
            name: "External".to_string(),
            link,
            timeout: DEFAULT_TIMEOUT,
            move_time: DEFAULT_MOVE_TIME,
            fallback: RandomAgent::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_move_time(mut self, move_time: Duration) -> Self {
        self.move_time = move_time;
        self
    }

    pub fn with_fallback(mut self, fallback: RandomAgent) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    fn query(&mut self, state: &GameState) -> Result<AgentMove, ExternalError> {
        let text = self
            .link
            .best_move(&state.to_fen(), self.move_time, self.timeout)?;
        let choice = parse_engine_move(&text)?;

        if !state.legal_moves(choice.mv.from).contains(&choice.mv.to)
            || state.piece_at(choice.mv.from).map(|p| p.color) != Some(state.turn)
        {
            return Err(ExternalError::Illegal(text));
        }

        // Only keep a promotion letter when the move actually promotes.
        let promotion = choice
            .promotion
            .filter(|_| state.is_promotion_move(choice.mv));
        Ok(AgentMove { promotion, ..choice })
    }
}

impl<L: EngineLink> Agent for ExternalAgent<L> {
    fn pick_move(&mut self, state: &mut GameState) -> Option<AgentMove> {
        match self.query(state) {
            Ok(choice) => {
                debug!("{} answered {choice}", self.name);
                Some(choice)
            }
            Err(err) => {
                warn!("{}: {err}; playing a random move instead", self.name);
                self.fallback.pick_move(state)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replays canned answers and records the positions it was asked about.
    struct ScriptedLink {
        replies: Vec<Result<String, ExternalError>>,
        asked: Vec<String>,
    }

    impl ScriptedLink {
        fn new(replies: Vec<Result<String, ExternalError>>) -> Self {
            Self {
                replies,
                asked: Vec::new(),
            }
        }
    }

    impl EngineLink for ScriptedLink {
        fn best_move(
            &mut self,
            fen: &str,
            _move_time: Duration,
            _timeout: Duration,
        ) -> Result<String, ExternalError> {
            self.asked.push(fen.to_string());
            if self.replies.is_empty() {
                return Err(ExternalError::Disconnected);
            }
            self.replies.remove(0)
        }
    }

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    #[test]
    fn test_uses_engine_reply() {
        let link = ScriptedLink::new(vec![Ok("e2e4".to_string())]);
        let mut agent = ExternalAgent::new(link);
        let mut state = GameState::new();

        let choice = agent.pick_move(&mut state).unwrap();
        assert_eq!(choice, AgentMove::new(mv("e2e4")));
        assert_eq!(agent.link.asked, vec![state.to_fen()]);
    }

    #[test]
    fn test_promotion_letter_kept() {
        let link = ScriptedLink::new(vec![Ok("a7a8n".to_string())]);
        let mut agent = ExternalAgent::new(link);
        let mut state = GameState::from_fen("7k/P7/8/8/8/8/8/K7 w - - 0 1").unwrap();

        let choice = agent.pick_move(&mut state).unwrap();
        assert_eq!(choice.mv, mv("a7a8"));
        assert_eq!(choice.promotion, Some(Promotion::Knight));
    }

    #[test]
    fn test_falls_back_on_failures() {
        let replies = vec![
            Err(ExternalError::Timeout(DEFAULT_TIMEOUT)),
            Ok("e2e5".to_string()),
            Ok("garbage".to_string()),
            Err(ExternalError::NoMove),
        ];
        let mut agent =
            ExternalAgent::new(ScriptedLink::new(replies)).with_fallback(RandomAgent::with_seed(1));
        let mut state = GameState::new();
        let legal = state.all_legal_moves(state.turn);

        for _ in 0..4 {
            let choice = agent.pick_move(&mut state).unwrap();
            assert!(legal.contains(choice.mv));
        }
        assert_eq!(state, GameState::new());
    }

    #[test]
    fn test_rejects_opponent_piece() {
        let mut agent = ExternalAgent::new(ScriptedLink::new(vec![]));
        let state = GameState::new();
        agent.link.replies.push(Ok("e7e5".to_string()));

        assert!(matches!(agent.query(&state), Err(ExternalError::Illegal(_))));
    }

    #[test]
    fn test_parse_bestmove_lines() {
        assert!(parse_bestmove("info depth 1 score cp 20").is_none());
        assert_eq!(
            parse_bestmove("bestmove e2e4 ponder e7e5").unwrap().unwrap(),
            "e2e4"
        );
        assert!(matches!(
            parse_bestmove("bestmove (none)"),
            Some(Err(ExternalError::NoMove))
        ));
        assert!(matches!(
            parse_bestmove("bestmove"),
            Some(Err(ExternalError::Malformed(_)))
        ));
    }

    #[test]
    fn test_parse_engine_move() {
        assert_eq!(
            parse_engine_move("g1f3").unwrap(),
            AgentMove::new(mv("g1f3"))
        );
        assert_eq!(
            parse_engine_move("b2b1Q").unwrap().promotion,
            Some(Promotion::Queen)
        );
        assert!(parse_engine_move("e2").is_err());
        assert!(parse_engine_move("e2e4k").is_err());
        assert!(parse_engine_move("z9e4").is_err());
    }

    #[test]
    fn test_spawn_missing_engine() {
        assert!(matches!(
            UciProcess::spawn("/nonexistent/engine-binary"),
            Err(ExternalError::Spawn { .. })
        ));
    }

    /// Answers its first search after 400 ms and later ones at once.
    #[cfg(unix)]
    const SLOW_FIRST_ENGINE: &str = r#"
n=0
while read -r line; do
  case "$line" in
    uci) echo "id name slow-first"; echo "uciok" ;;
    isready) echo "readyok" ;;
    go*)
      n=$((n+1))
      if [ "$n" -eq 1 ]; then sleep 0.4; echo "bestmove a2a3"; else echo "bestmove h2h3"; fi
      ;;
    quit) exit 0 ;;
  esac
done
"#;

    #[cfg(unix)]
    #[test]
    fn test_late_reply_not_reused_for_next_position() {
        let mut command = Command::new("sh");
        command.arg("-c").arg(SLOW_FIRST_ENGINE);
        let mut link = UciProcess::from_command(command).unwrap();
        let fen = GameState::new().to_fen();

        let first = link.best_move(&fen, Duration::from_millis(10), Duration::from_millis(150));
        assert!(matches!(first, Err(ExternalError::Timeout(_))));

        let second = link.best_move(&fen, Duration::from_millis(10), Duration::from_secs(2));
        assert_eq!(second.unwrap(), "h2h3");
    }

    #[cfg(unix)]
    #[test]
    fn test_handshake_waits_for_uciok() {
        let mut command = Command::new("sh");
        command.arg("-c").arg(SLOW_FIRST_ENGINE);
        let mut link = UciProcess::from_command(command).unwrap();
        let fen = GameState::new().to_fen();

        assert_eq!(
            link.best_move(&fen, Duration::from_millis(10), Duration::from_secs(2))
                .unwrap(),
            "a2a3"
        );
        assert!(link.handshake_done);
        assert!(!link.searching);
    }

    #[cfg(unix)]
    #[test]
    fn test_silent_process_times_out() {
        // `cat` echoes commands back but never says "bestmove".
        let mut link = UciProcess::spawn("cat").unwrap();
        let result = link.best_move(
            "8/8/8/8/8/8/8/K6k w - - 0 1",
            Duration::from_millis(10),
            Duration::from_millis(150),
        );
        assert!(matches!(result, Err(ExternalError::Timeout(_))));
    }
}
