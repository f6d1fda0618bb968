//! Engine process management.
//!
//! Starts an external UCI engine with piped stdin/stdout and drives it
//! through a [`UciSession`]. The process is shut down on request or when the
//! handle is dropped.

use std::io::BufReader;
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::session::UciSession;
use super::{Oracle, OracleOptions, PositionSetup, RankedMove};
use crate::error::OracleError;

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How to launch the engine executable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory of the engine; inherited when `None`.
    pub working_dir: Option<PathBuf>,
    /// Time the engine gets to exit after `quit` before it is killed.
    pub shutdown_grace: Duration,
}

impl EngineConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// A running engine with an initialized session.
pub struct EngineProcess {
    process: Child,
    session: UciSession<BufReader<ChildStdout>, ChildStdin>,
    shutdown_grace: Duration,
    terminated: bool,
}

impl EngineProcess {
    /// Starts the engine and brings its session to the ready state.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be started or the handshake
    /// does not complete. The process is reaped before returning.
    pub fn spawn(config: &EngineConfig, options: &OracleOptions) -> Result<Self, OracleError> {
        let mut command = Command::new(&config.program);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        // Terminal interrupts go to the explorer alone; it stops the engine itself.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut process = command.spawn().map_err(OracleError::Spawn)?;
        info!("Started engine {} (pid {})", config.program, process.id());

        let pipes = process.stdin.take().zip(process.stdout.take());
        let Some((stdin, stdout)) = pipes else {
            let _ = process.kill();
            let _ = process.wait();
            return Err(OracleError::Protocol("engine pipes unavailable".to_string()));
        };

        match UciSession::start(BufReader::new(stdout), stdin, options) {
            Ok(session) => Ok(Self {
                process,
                session,
                shutdown_grace: config.shutdown_grace,
                terminated: false,
            }),
            Err(err) => {
                let _ = process.kill();
                let _ = process.wait();
                Err(err)
            }
        }
    }

    /// Sends `quit`, waits up to the grace period, then kills the process.
    fn terminate(&mut self) -> Result<(), OracleError> {
        if self.terminated {
            return Ok(());
        }
        self.terminated = true;

        if let Err(err) = self.session.quit() {
            debug!("Failed to send quit: {err}");
        }

        let deadline = Instant::now() + self.shutdown_grace;
        loop {
            if let Some(status) = self.process.try_wait()? {
                debug!("Engine exited with {status}");
                return Ok(());
            }
            if Instant::now() >= deadline {
                warn!(
                    "Engine did not exit within {:?}, killing it",
                    self.shutdown_grace
                );
                self.process.kill()?;
                self.process.wait()?;
                return Ok(());
            }
            thread::sleep(EXIT_POLL_INTERVAL);
        }
    }
}

impl Oracle for EngineProcess {
    fn position_key(&mut self, setup: &PositionSetup<'_>) -> Result<String, OracleError> {
        self.session.position_key(setup)
    }

    fn ranked_candidates(
        &mut self,
        position_key: &str,
        depth: u32,
        limit: usize,
    ) -> Result<Vec<RankedMove>, OracleError> {
        self.session.ranked_candidates(position_key, depth, limit)
    }

    fn shutdown(&mut self) -> Result<(), OracleError> {
        self.terminate()
    }
}

impl Drop for EngineProcess {
    fn drop(&mut self) {
        let _ = self.terminate();
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// A shell stand-in for an engine that answers the handshake and queries.
    const FAKE_ENGINE: &str = r#"
while read -r cmd rest; do
  case "$cmd" in
    uci) echo "id name fake"; echo "uciok" ;;
    isready) echo "readyok" ;;
    d) echo "Fen: 8/8/8/8/8/8/8/K6k w - - 0 1" ;;
    go) echo "info depth 2 multipv 1 score cp 7 pv a1a2"; echo "bestmove a1a2" ;;
    quit) exit 0 ;;
  esac
done
"#;

    fn fake_engine() -> EngineConfig {
        let mut config = EngineConfig::new("sh");
        config.args = vec!["-c".to_string(), FAKE_ENGINE.to_string()];
        config.shutdown_grace = Duration::from_secs(2);
        config
    }

    #[test]
    fn test_spawn_query_and_shutdown() {
        let mut engine = EngineProcess::spawn(&fake_engine(), &OracleOptions::default()).unwrap();

        let key = engine.position_key(&PositionSetup::StartPos).unwrap();
        assert_eq!(key, "8/8/8/8/8/8/8/K6k w - - 0 1");

        let ranked = engine.ranked_candidates(&key, 2, 3).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].mv, "a1a2");

        engine.shutdown().unwrap();
        engine.shutdown().unwrap();
    }

    #[test]
    fn test_spawn_missing_executable() {
        let config = EngineConfig::new("/nonexistent/engine-binary");
        let result = EngineProcess::spawn(&config, &OracleOptions::default());
        assert!(matches!(result, Err(OracleError::Spawn(_))));
    }

    #[test]
    fn test_engine_that_never_handshakes() {
        let mut config = EngineConfig::new("sh");
        config.args = vec!["-c".to_string(), "exit 0".to_string()];
        let result = EngineProcess::spawn(&config, &OracleOptions::default());
        assert!(result.is_err());
    }
}
