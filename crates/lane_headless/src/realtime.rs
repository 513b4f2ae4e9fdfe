//! Wall-clock driver.
//!
//! A single actor task owns the [`Session`]. Commands reach it over a
//! bounded mpsc channel and the battle advances on a fixed
//! `tokio::time::interval`, so commands and ticks never interleave within
//! one tick. Responses leave over a second channel to a writer task.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::protocol::{Command, Response};
use crate::runner::{Flow, Session};

/// Default period between ticks.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(50);

const CHANNEL_CAPACITY: usize = 64;

/// Own `session` until `quit` arrives or every command sender is dropped.
///
/// Returns the session so callers can inspect the final battle.
pub async fn run_actor(
    mut session: Session,
    mut commands: mpsc::Receiver<Command>,
    responses: mpsc::Sender<Response>,
    tick_interval: Duration,
) -> Session {
    let mut interval = tokio::time::interval(tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut out = Vec::new();
    loop {
        let flow = tokio::select! {
            _ = interval.tick() => {
                session.step(&mut out);
                Flow::Continue
            }
            command = commands.recv() => match command {
                Some(command) => session.handle(command, &mut out),
                None => Flow::Quit,
            },
        };

        for response in out.drain(..) {
            if responses.send(response).await.is_err() {
                tracing::warn!("Response channel closed; stopping actor");
                return session;
            }
        }

        if flow == Flow::Quit {
            break;
        }
    }

    tracing::info!(tick = session.simulation().tick(), "Realtime session ended");
    session
}

/// Run `session` against stdin and stdout in real time.
pub fn run_stdio(session: Session, tick_interval: Duration) -> io::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve_stdio(session, tick_interval))
}

async fn serve_stdio(session: Session, tick_interval: Duration) -> io::Result<()> {
    let (command_tx, command_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (response_tx, mut response_rx) = mpsc::channel::<Response>(CHANNEL_CAPACITY);

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = response_rx.recv().await {
            stdout.write_all(response.to_json_line().as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<_, io::Error>(())
    });

    let ready = Response::ready(session.simulation().tick());
    if response_tx.send(ready).await.is_err() {
        return Ok(());
    }

    let actor = tokio::spawn(run_actor(session, command_rx, response_tx.clone(), tick_interval));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Command::from_json(line) {
            Ok(command) => {
                let quit = command == Command::Quit;
                if command_tx.send(command).await.is_err() || quit {
                    break;
                }
            }
            Err(e) => {
                let error = Response::error(format!("Parse error: {e}"), None);
                if response_tx.send(error).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(command_tx);
    drop(response_tx);
    actor.await.map_err(io::Error::other)?;
    writer.await.map_err(io::Error::other)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::HeadlessConfig;
    use crate::scenario::Scenario;

    fn session() -> Session {
        Session::new(Scenario::default().build(4).unwrap(), HeadlessConfig::default())
    }

    #[tokio::test]
    async fn test_actor_advances_on_its_own() {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (response_tx, mut response_rx) = mpsc::channel(64);
        let actor = tokio::spawn(run_actor(
            session(),
            command_rx,
            response_tx,
            Duration::from_millis(1),
        ));

        tokio::time::sleep(Duration::from_millis(30)).await;
        command_tx.send(Command::Quit).await.unwrap();

        let session = actor.await.unwrap();
        assert!(session.simulation().tick() > 0);

        let mut last = None;
        while let Ok(response) = response_rx.try_recv() {
            last = Some(response);
        }
        assert_eq!(last, Some(Response::Bye));
    }

    #[tokio::test]
    async fn test_actor_stops_when_senders_drop() {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (response_tx, _response_rx) = mpsc::channel(64);
        command_tx
            .send(Command::Move {
                x: 300.0,
                side: lane_core::side::Side::Left,
            })
            .await
            .unwrap();
        drop(command_tx);

        let session = run_actor(session(), command_rx, response_tx, Duration::from_secs(60)).await;
        assert_eq!(
            session.simulation().hero(lane_core::side::Side::Left).destination(),
            lane_core::math::Fixed::from_num(300)
        );
    }
}
