mod game;
mod vision;

use game::Referee;
use rlgl_api::ControlPanel;
use rlgl_common::config::Config;
use rlgl_common::game::Outcome;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

const EXIT_PLAYERS_NOT_FOUND: i32 = 2;

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        robot = config.robot.base_url,
        threshold = config.vision.threshold,
        min_light_secs = config.game.min_light_secs,
        max_light_secs = config.game.max_light_secs,
        control = config.control.enabled,
        "starting red light, green light referee"
    );

    let (panel, link) = rlgl_api::control_channel(config.vision.threshold);
    let panel = Arc::new(panel);

    if config.control.enabled {
        let panel = Arc::clone(&panel);
        let bind = config.control.bind.clone();
        tokio::spawn(async move {
            if let Err(e) = rlgl_api::serve(panel, &bind).await {
                error!(error = %e, addr = bind, "control panel stopped");
            }
        });
    }

    tokio::spawn(watch_console(Arc::clone(&panel)));

    let (robot, events) = match rlgl_bridge::connect(&config.robot) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "failed to connect to robot");
            std::process::exit(1);
        }
    };

    let code = match Referee::new(robot, events, link, &config).run().await {
        Ok(Outcome::Winner(slot)) => {
            info!(winner = %slot, "game finished");
            0
        }
        Ok(Outcome::Cancelled) => {
            info!("game cancelled");
            0
        }
        Ok(Outcome::PlayersNotFound) => {
            error!("Cubes not found");
            EXIT_PLAYERS_NOT_FOUND
        }
        Err(e) => {
            error!(error = %e, "game aborted");
            1
        }
    };
    std::process::exit(code);
}

/// Escape from the terminal: `q` or ESC on stdin, or Ctrl-C.
async fn watch_console(panel: Arc<ControlPanel>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                panel.request_quit();
                return;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) if is_escape(&line) => {
                    info!("quit requested from console");
                    panel.request_quit();
                    return;
                }
                Ok(Some(_)) => {}
                // stdin closed: only Ctrl-C is left
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            },
        }
    }
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("interrupted");
        panel.request_quit();
    }
}

fn is_escape(line: &str) -> bool {
    let line = line.trim();
    line.eq_ignore_ascii_case("q") || line.contains('\u{1b}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_inputs() {
        assert!(is_escape("q"));
        assert!(is_escape(" Q \n"));
        assert!(is_escape("\u{1b}"));
        assert!(!is_escape("quit later"));
        assert!(!is_escape(""));
    }
}
