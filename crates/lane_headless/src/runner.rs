//! Headless battle runner implementation.
//!
//! [`Session`] owns one battle and turns protocol commands into responses.
//! [`HeadlessRunner`] drives a session in lockstep: the battle only moves
//! when the controller sends `tick`. The wall-clock driver lives in
//! [`crate::realtime`].

use std::io::{self, BufRead, Write};

use lane_core::items::shop;
use lane_core::simulation::BattleSimulation;

use crate::protocol::{Command, Response, ShopEntry};

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output state after every tick (vs only on query / tick commands).
    pub auto_state_output: bool,
}

/// Whether the session should keep reading commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep going.
    Continue,
    /// The controller asked to quit.
    Quit,
}

/// One battle plus the bookkeeping a driver needs around it.
#[derive(Debug)]
pub struct Session {
    sim: BattleSimulation,
    config: HeadlessConfig,
    game_over_sent: bool,
}

impl Session {
    /// Wrap a battle.
    pub fn new(sim: BattleSimulation, config: HeadlessConfig) -> Self {
        Self {
            sim,
            config,
            game_over_sent: false,
        }
    }

    /// The battle being driven.
    pub fn simulation(&self) -> &BattleSimulation {
        &self.sim
    }

    /// Consume the session, returning the battle.
    pub fn into_simulation(self) -> BattleSimulation {
        self.sim
    }

    /// Whether the battle has ended.
    pub fn is_over(&self) -> bool {
        self.sim.is_over()
    }

    /// Advance one tick, pushing any responses the tick produces.
    pub fn step(&mut self, out: &mut Vec<Response>) {
        if self.sim.is_over() {
            return;
        }
        let events = self.sim.advance();
        if let Some(headline) = events.headline() {
            tracing::debug!(tick = self.sim.tick(), "{}", headline);
        }
        if self.config.auto_state_output {
            out.push(Response::state(&self.sim));
        }
        self.report_game_over(out);
    }

    /// Process one command.
    pub fn handle(&mut self, command: Command, out: &mut Vec<Response>) -> Flow {
        let cmd_name = command.name();

        match command {
            Command::Tick { count } => {
                if self.sim.is_over() {
                    out.push(Response::error("Battle is over", Some(cmd_name)));
                    return Flow::Continue;
                }
                for _ in 0..count {
                    if self.sim.is_over() {
                        break;
                    }
                    self.step(out);
                }
                if !self.config.auto_state_output {
                    out.push(Response::state(&self.sim));
                }
            }

            Command::Query => out.push(Response::state(&self.sim)),

            Command::Shop => out.push(Response::Shop {
                items: shop().iter().map(ShopEntry::from).collect(),
            }),

            Command::Hash => out.push(Response::StateHash {
                tick: self.sim.tick(),
                hash: self.sim.state_hash(),
            }),

            Command::Quit => {
                out.push(Response::Bye);
                return Flow::Quit;
            }

            Command::Move { .. } | Command::Queue { .. } | Command::Buy { .. } => {
                let applied = command
                    .to_battle_command()
                    .and_then(|battle_command| match battle_command {
                        Some(battle_command) => self.sim.apply_command(battle_command),
                        None => Ok(()),
                    });
                match applied {
                    Ok(()) => out.push(Response::ack(cmd_name)),
                    Err(e) => {
                        tracing::debug!(cmd = cmd_name, error = %e, "Command rejected");
                        out.push(Response::error(e.to_string(), Some(cmd_name)));
                    }
                }
            }
        }

        Flow::Continue
    }

    fn report_game_over(&mut self, out: &mut Vec<Response>) {
        if self.game_over_sent {
            return;
        }
        if let Some(game_over) = Response::game_over(&self.sim) {
            tracing::info!(tick = self.sim.tick(), "Battle over");
            out.push(game_over);
            self.game_over_sent = true;
        }
    }
}

/// Lockstep runner: one JSON command in, one or more JSON responses out.
#[derive(Debug)]
pub struct HeadlessRunner {
    session: Session,
}

impl HeadlessRunner {
    /// Create a runner around a battle.
    pub fn new(sim: BattleSimulation, config: HeadlessConfig) -> Self {
        Self {
            session: Session::new(sim, config),
        }
    }

    /// The session being driven.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run until `quit` or end of input.
    pub fn run<I: BufRead, O: Write>(&mut self, input: I, mut output: O) -> io::Result<()> {
        write_response(&mut output, &Response::ready(self.session.sim.tick()))?;
        output.flush()?;

        let mut responses = Vec::new();
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let flow = match Command::from_json(line) {
                Ok(cmd) => self.session.handle(cmd, &mut responses),
                Err(e) => {
                    responses.push(Response::error(format!("Parse error: {e}"), None));
                    Flow::Continue
                }
            };

            for response in responses.drain(..) {
                write_response(&mut output, &response)?;
            }
            output.flush()?;

            if flow == Flow::Quit {
                break;
            }
        }

        tracing::info!(tick = self.session.sim.tick(), "Session ended");
        Ok(())
    }

    /// Run on the process's stdin and stdout.
    pub fn run_stdio(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }
}

fn write_response<O: Write>(output: &mut O, response: &Response) -> io::Result<()> {
    output.write_all(response.to_json_line().as_bytes())
}
