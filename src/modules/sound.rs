use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use tracing::debug;

use crate::config::SoundConfig;

/// Single shared handle for the notification sound.
///
/// Playback runs in an external player process. Starting a new play stops
/// the previous one so the cue always starts from the beginning.
pub struct AudioCue {
    path: PathBuf,
    player: String,
    current: Option<Child>,
}

impl AudioCue {
    pub fn new(config: &SoundConfig) -> Self {
        Self {
            path: config.path.clone(),
            player: config.player.clone(),
            current: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn play(&mut self) -> Result<()> {
        self.rewind();

        if !self.path.exists() {
            anyhow::bail!("sound file {:?} not found", self.path);
        }

        let mut parts = self.player.split_whitespace();
        let program = parts.next().context("no sound player configured")?;
        let child = Command::new(program)
            .args(parts)
            .arg(&self.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("Starting sound player '{}'", program))?;
        debug!(pid = child.id(), "sound cue started");
        self.current = Some(child);
        Ok(())
    }

    fn rewind(&mut self) {
        if let Some(mut child) = self.current.take() {
            // Already exited is fine; we only care that it is not still playing.
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for AudioCue {
    fn drop(&mut self) {
        self.rewind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let mut cue = AudioCue::new(&SoundConfig {
            path: dir.path().join("missing.wav"),
            player: "true".to_string(),
        });
        assert!(cue.play().is_err());
    }

    #[test]
    fn test_missing_player_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cue.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        let mut cue = AudioCue::new(&SoundConfig {
            path,
            player: "definitely-not-a-sound-player-xyz".to_string(),
        });
        assert!(cue.play().is_err());
    }

    #[test]
    fn test_empty_player_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cue.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        let mut cue = AudioCue::new(&SoundConfig { path, player: "  ".to_string() });
        assert!(cue.play().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_replay_restarts_player() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cue.wav");
        std::fs::write(&path, b"RIFF").unwrap();
        // Stands in for a player that is still busy with the previous cue.
        let mut cue = AudioCue::new(&SoundConfig { path, player: "tail -f".to_string() });

        cue.play().unwrap();
        let first = cue.current.as_ref().map(|c| c.id()).unwrap();
        cue.play().unwrap();
        let second = cue.current.as_ref().map(|c| c.id()).unwrap();

        assert_ne!(first, second);
    }
}
