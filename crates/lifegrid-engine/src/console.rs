//! Line-oriented terminal surface.
//!
//! Reads one command per line from stdin and forwards it to the simulation
//! through a [`SimulationHandle`]. A separate task prints the grid every
//! time the runner publishes a new snapshot.
//!
//! ```text
//! toggle <row> <col>   flip a cell (only while stopped)
//! run                  start if stopped, stop if running
//! start | stop
//! clear                empty the grid (only while stopped)
//! speed <n>            change the speed setting
//! random [density]     random fill (only while stopped)
//! show | json          print the current state
//! help | quit
//! ```

use lifegrid_core::{SimulationHandle, SimulationSnapshot};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::EngineError;

const HELP: &str = "\
commands:
  toggle <row> <col>   flip a cell (only while stopped)
  run                  start if stopped, stop if running
  start | stop         start or stop the simulation
  clear                empty the grid (only while stopped)
  speed <n>            change the speed setting
  random [density]     random fill, density in 0.0..=1.0 (only while stopped)
  show                 print the current grid
  json                 print the current state as JSON
  help                 show this message
  quit                 stop and exit";

/// Errors produced while parsing a console line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The first word is not a known command.
    #[error("unknown command `{0}` (try `help`)")]
    UnknownCommand(String),

    /// A required argument is missing.
    #[error("`{command}` expects {expected}")]
    MissingArgument {
        /// The command being parsed.
        command: &'static str,
        /// Description of the expected arguments.
        expected: &'static str,
    },

    /// An argument could not be parsed as a number.
    #[error("`{value}` is not a valid {kind}")]
    InvalidNumber {
        /// The offending text.
        value: String,
        /// What kind of number was expected.
        kind: &'static str,
    },

    /// More arguments than the command accepts.
    #[error("`{0}` takes fewer arguments")]
    TrailingArguments(&'static str),
}

/// A parsed console command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConsoleCommand {
    /// Flip one cell.
    Toggle {
        /// Row of the cell.
        row: usize,
        /// Column of the cell.
        col: usize,
    },
    /// Start if stopped, stop if running.
    Run,
    /// Start the simulation.
    Start,
    /// Stop the simulation.
    Stop,
    /// Empty the grid.
    Clear,
    /// Change the speed setting.
    Speed(u32),
    /// Random fill, with an optional density override.
    Random(Option<f64>),
    /// Print the current grid.
    Show,
    /// Print the current state as JSON.
    Json,
    /// Print the command list.
    Help,
    /// Shut down and exit.
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };

    let command = match name.to_lowercase().as_str() {
        "toggle" | "t" => {
            let expected = "a row and a column";
            let row = parse_arg(words.next(), "toggle", expected, "row")?;
            let col = parse_arg(words.next(), "toggle", expected, "column")?;
            no_more(&mut words, "toggle")?;
            ConsoleCommand::Toggle { row, col }
        }
        "speed" => {
            let speed = parse_arg(words.next(), "speed", "a speed value", "speed")?;
            no_more(&mut words, "speed")?;
            ConsoleCommand::Speed(speed)
        }
        "random" => {
            let density = words
                .next()
                .map(|value| parse_number(value, "density"))
                .transpose()?;
            no_more(&mut words, "random")?;
            ConsoleCommand::Random(density)
        }
        other => {
            let command = match other {
                "run" | "r" => ConsoleCommand::Run,
                "start" => ConsoleCommand::Start,
                "stop" => ConsoleCommand::Stop,
                "clear" => ConsoleCommand::Clear,
                "show" => ConsoleCommand::Show,
                "json" => ConsoleCommand::Json,
                "help" | "?" => ConsoleCommand::Help,
                "quit" | "exit" | "q" => ConsoleCommand::Quit,
                _ => return Err(ParseError::UnknownCommand(other.to_owned())),
            };
            no_more(&mut words, "this command")?;
            command
        }
    };
    Ok(Some(command))
}

fn parse_arg<T: std::str::FromStr>(
    word: Option<&str>,
    command: &'static str,
    expected: &'static str,
    kind: &'static str,
) -> Result<T, ParseError> {
    let value = word.ok_or(ParseError::MissingArgument { command, expected })?;
    parse_number(value, kind)
}

fn parse_number<T: std::str::FromStr>(value: &str, kind: &'static str) -> Result<T, ParseError> {
    value.parse().map_err(|_err| ParseError::InvalidNumber {
        value: value.to_owned(),
        kind,
    })
}

fn no_more<'a>(
    words: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
) -> Result<(), ParseError> {
    if words.next().is_some() {
        return Err(ParseError::TrailingArguments(command));
    }
    Ok(())
}

/// Render a snapshot as a status line followed by `#`/`.` rows.
pub fn render(snapshot: &SimulationSnapshot) -> String {
    let grid = &snapshot.grid;
    let width = grid.cols().saturating_add(1);
    let mut out = format!(
        "generation {} | {:?} | speed {} | live {}\n",
        snapshot.generation, snapshot.phase, snapshot.speed, snapshot.live_cells
    );
    out.reserve(grid.rows().saturating_mul(width));
    for row in (0..grid.rows()).filter_map(|r| grid.row(r)) {
        out.extend(row.iter().map(|&alive| if alive { '#' } else { '.' }));
        out.push('\n');
    }
    if let Some(ref error) = snapshot.last_error {
        out.push_str("stopped on error: ");
        out.push_str(error);
        out.push('\n');
    }
    out
}

/// Print every newly published snapshot until the runner goes away.
pub async fn render_updates(mut snapshots: watch::Receiver<SimulationSnapshot>) {
    let mut last: Option<SimulationSnapshot> = None;
    while snapshots.changed().await.is_ok() {
        let snapshot = snapshots.borrow_and_update().clone();
        if last.as_ref() == Some(&snapshot) {
            continue;
        }
        print!("{}", render(&snapshot));
        last = Some(snapshot);
    }
    debug!("Snapshot channel closed, render task exiting");
}

/// Read commands from stdin until `quit` or end of input.
pub async fn run(handle: &SimulationHandle, default_density: f64) -> Result<(), EngineError> {
    println!("{HELP}");
    print!("{}", render(&handle.snapshot()));
    serve(handle, default_density, BufReader::new(tokio::io::stdin())).await
}

/// Dispatch each line of `input` to the simulation until `quit` or end of
/// input.
///
/// Rejected commands are reported on stdout and do not end the session.
pub async fn serve<R>(
    handle: &SimulationHandle,
    default_density: f64,
    input: R,
) -> Result<(), EngineError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        let result = match command {
            ConsoleCommand::Toggle { row, col } => handle.toggle_cell(row, col).await,
            ConsoleCommand::Run => handle.start_stop().await,
            ConsoleCommand::Start => handle.start().await,
            ConsoleCommand::Stop => handle.stop().await,
            ConsoleCommand::Clear => handle.clear().await,
            ConsoleCommand::Speed(speed) => handle.set_speed(speed).await,
            ConsoleCommand::Random(density) => {
                handle.randomize(density.unwrap_or(default_density)).await
            }
            ConsoleCommand::Show => {
                print!("{}", render(&handle.snapshot()));
                continue;
            }
            ConsoleCommand::Json => {
                match serde_json::to_string_pretty(&handle.snapshot()) {
                    Ok(json) => println!("{json}"),
                    Err(e) => warn!(error = %e, "Failed to serialize snapshot"),
                }
                continue;
            }
            ConsoleCommand::Help => {
                println!("{HELP}");
                continue;
            }
            ConsoleCommand::Quit => return Ok(()),
        };

        if let Err(e) = result {
            println!("error: {e}");
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use lifegrid_core::config::SpeedConfig;
    use lifegrid_core::{runner, Grid, Simulation};

    use super::*;

    #[test]
    fn parses_toggle() {
        assert_eq!(
            parse_command("toggle 3 7").unwrap(),
            Some(ConsoleCommand::Toggle { row: 3, col: 7 })
        );
        assert_eq!(
            parse_command("  T 0 0  ").unwrap(),
            Some(ConsoleCommand::Toggle { row: 0, col: 0 })
        );
    }

    #[test]
    fn toggle_requires_two_numbers() {
        assert!(matches!(
            parse_command("toggle 3"),
            Err(ParseError::MissingArgument { command: "toggle", .. })
        ));
        assert!(matches!(
            parse_command("toggle -1 2"),
            Err(ParseError::InvalidNumber { .. })
        ));
        assert_eq!(
            parse_command("toggle 1 2 3"),
            Err(ParseError::TrailingArguments("toggle"))
        );
    }

    #[test]
    fn parses_speed_and_random() {
        assert_eq!(parse_command("speed 75").unwrap(), Some(ConsoleCommand::Speed(75)));
        assert_eq!(parse_command("random").unwrap(), Some(ConsoleCommand::Random(None)));
        assert_eq!(
            parse_command("random 0.5").unwrap(),
            Some(ConsoleCommand::Random(Some(0.5)))
        );
        assert!(parse_command("speed fast").is_err());
    }

    #[test]
    fn parses_bare_commands() {
        assert_eq!(parse_command("run").unwrap(), Some(ConsoleCommand::Run));
        assert_eq!(parse_command("START").unwrap(), Some(ConsoleCommand::Start));
        assert_eq!(parse_command("quit").unwrap(), Some(ConsoleCommand::Quit));
        assert_eq!(parse_command("clear now"), Err(ParseError::TrailingArguments("this command")));
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(
            parse_command("jump"),
            Err(ParseError::UnknownCommand("jump".to_owned()))
        );
    }

    #[test]
    fn render_draws_rows_and_status() {
        let grid = Grid::from_live_cells(2, 3, &[(0, 1), (1, 2)]).unwrap();
        let sim = Simulation::with_grid(grid, SpeedConfig::default()).unwrap();
        let text = render(&sim.snapshot());
        let mut lines = text.lines();
        assert!(
            lines
                .next()
                .unwrap()
                .starts_with("generation 0 | Idle | speed 50 | live 2")
        );
        assert_eq!(lines.next(), Some(".#."));
        assert_eq!(lines.next(), Some("..#"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn render_reports_last_error() {
        let grid = Grid::new(1, 2).unwrap();
        let sim = Simulation::with_grid(grid, SpeedConfig::default()).unwrap();
        let mut snapshot = sim.snapshot();
        snapshot.last_error = Some("generation counter overflow".to_owned());
        let text = render(&snapshot);
        assert_eq!(text.lines().next_back(), Some("stopped on error: generation counter overflow"));
    }

    fn idle_runner() -> (SimulationHandle, tokio::task::JoinHandle<runner::RunResult>) {
        let grid = Grid::new(4, 4).unwrap();
        runner::spawn(Simulation::with_grid(grid, SpeedConfig::default()).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn serve_dispatches_lines_until_quit() {
        let (handle, _task) = idle_runner();
        let input: &[u8] = b"toggle 0 0\njump\nspeed 70\nrandom 2.0\n\nquit\ntoggle 1 1\n";

        serve(&handle, 0.25, input).await.unwrap();

        let snapshot = handle.snapshot();
        assert!(snapshot.grid.is_alive(0, 0).unwrap());
        assert!(!snapshot.grid.is_alive(1, 1).unwrap());
        assert_eq!(snapshot.speed, 70);
        assert_eq!(snapshot.live_cells, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn serve_stops_at_end_of_input() {
        let (handle, _task) = idle_runner();
        let input: &[u8] = b"toggle 2 3\nrun\nrun";

        serve(&handle, 0.25, input).await.unwrap();

        let snapshot = handle.snapshot();
        assert!(!snapshot.running);
        assert!(handle.toggle_cell(3, 3).await.is_ok());
    }
}
