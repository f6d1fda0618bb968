//! UCI session state machine over an arbitrary line transport.

use std::collections::BTreeMap;
use std::io::{BufRead, ErrorKind, Write};

use log::{debug, trace};

use super::uci::{self, InfoLine};
use super::{Oracle, OracleOptions, PositionSetup, RankedMove};
use crate::error::OracleError;

/// Lifecycle of a [`UciSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Handshake,
    Configured,
    Ready,
    Terminated,
}

/// A stateful UCI conversation.
///
/// Every query writes its commands and then blocks until the terminator
/// line of the response has been read, so at most one exchange is in flight.
pub struct UciSession<R, W> {
    reader: R,
    writer: W,
    state: SessionState,
    line: String,
}

impl<R: BufRead, W: Write> UciSession<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            state: SessionState::Uninitialized,
            line: String::new(),
        }
    }

    /// Runs the handshake and option setup, leaving the session ready for queries.
    pub fn start(reader: R, writer: W, options: &OracleOptions) -> Result<Self, OracleError> {
        let mut session = Self::new(reader, writer);
        session.handshake()?;
        session.configure(options)?;
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sends `uci` and waits for `uciok`.
    pub fn handshake(&mut self) -> Result<(), OracleError> {
        self.expect_state(SessionState::Uninitialized)?;
        self.state = SessionState::Handshake;
        self.send("uci")?;
        self.read_until(|line| line == "uciok", |_| {})?;
        Ok(())
    }

    /// Sends the option commands, then synchronizes with `isready`.
    pub fn configure(&mut self, options: &OracleOptions) -> Result<(), OracleError> {
        self.expect_state(SessionState::Handshake)?;
        for command in options.setup_commands() {
            self.send(&command)?;
        }
        self.state = SessionState::Configured;
        self.sync()?;
        self.state = SessionState::Ready;
        Ok(())
    }

    /// Looks up the canonical encoding of a position.
    pub fn position_key(&mut self, setup: &PositionSetup<'_>) -> Result<String, OracleError> {
        self.expect_state(SessionState::Ready)?;
        self.send(&setup.command())?;
        self.send("d")?;
        self.send("isready")?;

        let mut fen = None;
        self.read_until(
            |line| line == "readyok",
            |line| {
                if fen.is_none() {
                    fen = uci::fen_payload(line).map(str::to_string);
                }
            },
        )?;

        fen.ok_or_else(|| {
            OracleError::Protocol(format!(
                "no position encoding in response to `{}`",
                setup.command()
            ))
        })
    }

    /// Runs a fixed-depth search and collects the candidates reported at that depth.
    ///
    /// Lines of any other shape, depth, or rank beyond `limit` are skipped.
    /// A later line for the same rank replaces an earlier one.
    pub fn ranked_candidates(
        &mut self,
        position_key: &str,
        depth: u32,
        limit: usize,
    ) -> Result<Vec<RankedMove>, OracleError> {
        self.expect_state(SessionState::Ready)?;
        let setup = PositionSetup::Fen {
            fen: position_key,
            moves: &[],
        };
        self.send(&setup.command())?;
        self.send(&format!("go depth {depth}"))?;

        let mut ranked = BTreeMap::new();
        self.read_until(uci::is_bestmove, |line| {
            if !line.starts_with("info") {
                return;
            }
            match InfoLine::parse(line) {
                Ok(info) if info.depth == depth && (1..=limit).contains(&info.multipv) => {
                    ranked.insert(info.multipv, RankedMove::new(info.mv, info.score));
                }
                Ok(_) => {}
                Err(err) => trace!("Skipping engine line ({err}): {line}"),
            }
        })?;

        Ok(ranked.into_values().collect())
    }

    /// Sends `quit` once and marks the session terminated.
    ///
    /// A pipe that is already closed counts as a completed shutdown.
    pub fn quit(&mut self) -> Result<(), OracleError> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        self.state = SessionState::Terminated;
        match self.write_line("quit") {
            Err(err) if err.kind() == ErrorKind::BrokenPipe => Ok(()),
            other => other.map_err(OracleError::from),
        }
    }

    fn sync(&mut self) -> Result<(), OracleError> {
        self.send("isready")?;
        self.read_until(|line| line == "readyok", |_| {})?;
        Ok(())
    }

    fn expect_state(&self, expected: SessionState) -> Result<(), OracleError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(OracleError::Protocol(format!(
                "session is {:?}, expected {:?}",
                self.state, expected
            )))
        }
    }

    fn send(&mut self, command: &str) -> Result<(), OracleError> {
        debug!("> {command}");
        self.write_line(command)?;
        Ok(())
    }

    fn write_line(&mut self, command: &str) -> std::io::Result<()> {
        writeln!(self.writer, "{command}")?;
        self.writer.flush()
    }

    /// Reads lines until `is_terminator` matches, feeding every earlier line
    /// to `on_line`. Returns the terminator line.
    fn read_until<T, F>(&mut self, is_terminator: T, mut on_line: F) -> Result<String, OracleError>
    where
        T: Fn(&str) -> bool,
        F: FnMut(&str),
    {
        loop {
            self.line.clear();
            let bytes_read = self.reader.read_line(&mut self.line)?;
            if bytes_read == 0 {
                self.state = SessionState::Terminated;
                return Err(OracleError::Protocol(
                    "engine closed its output".to_string(),
                ));
            }

            let line = self.line.trim();
            if is_terminator(line) {
                trace!("< {line}");
                return Ok(line.to_string());
            }
            on_line(line);
        }
    }
}

impl<R: BufRead, W: Write> Oracle for UciSession<R, W> {
    fn position_key(&mut self, setup: &PositionSetup<'_>) -> Result<String, OracleError> {
        UciSession::position_key(self, setup)
    }

    fn ranked_candidates(
        &mut self,
        position_key: &str,
        depth: u32,
        limit: usize,
    ) -> Result<Vec<RankedMove>, OracleError> {
        UciSession::ranked_candidates(self, position_key, depth, limit)
    }

    fn shutdown(&mut self) -> Result<(), OracleError> {
        self.quit()
    }
}
