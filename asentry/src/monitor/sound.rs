/*!
Best-effort alert sound
*/

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Plays a local audio file through an external player.
///
/// Nothing here can fail a run: a missing file, a missing player or a
/// player that exits with an error only produce debug logs.
pub struct AlertSound {
    path: Option<PathBuf>,
    players: Vec<Vec<String>>,
}

impl AlertSound {
    /// `player` overrides the platform defaults when given.
    pub fn new(path: Option<PathBuf>, player: Option<Vec<String>>) -> Self {
        let players = match player {
            Some(player) => vec![player],
            None => default_players(),
        };
        Self { path, players }
    }

    /// No sound at all
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self {
            path: None,
            players: Vec::new(),
        }
    }

    /// Try each player in turn until one plays the file.
    ///
    /// Returns whether the sound was played.
    pub async fn play(&self) -> bool {
        let Some(path) = self.path.as_deref() else {
            return false;
        };
        if !path.is_file() {
            debug!("No alert sound at {:?}", path);
            return false;
        }

        for player in &self.players {
            let Some((program, args)) = player.split_first() else {
                continue;
            };

            let status = Command::new(program)
                .args(args)
                .arg(path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;

            match status {
                Ok(status) if status.success() => return true,
                Ok(status) => debug!("{} exited with {}", program, status),
                Err(e) => debug!("Cannot run {}: {}", program, e),
            }
        }

        debug!("Alert sound not played");
        false
    }
}

fn default_players() -> Vec<Vec<String>> {
    let players: &[&[&str]] = if cfg!(target_os = "macos") {
        &[&["afplay"]]
    } else {
        &[
            &["mpg123", "-q"],
            &["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"],
            &["paplay"],
        ]
    };
    players
        .iter()
        .map(|p| p.iter().map(|s| s.to_string()).collect())
        .collect()
}
