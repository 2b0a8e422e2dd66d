//! Interactive session: input lines in, controller calls and rendered state out

use crate::config::ControlSettings;
use crate::error::Result;
use crate::keymap::{KeyCommand, HELP};
use crate::render::Renderer;
use atelier_playback::{PlaybackController, Track};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub struct Session<W> {
    controller: PlaybackController,
    controls: ControlSettings,
    renderer: Renderer,
    tracks: Vec<Track>,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(
        controller: PlaybackController,
        controls: ControlSettings,
        renderer: Renderer,
        tracks: Vec<Track>,
        out: W,
    ) -> Self {
        Self {
            controller,
            controls,
            renderer,
            tracks,
            out,
        }
    }

    /// Read commands until end of input or `q`
    pub async fn run<R>(&mut self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        while let Some(line) = lines.next_line().await? {
            if line.is_empty() {
                continue;
            }

            match KeyCommand::parse(&line) {
                Ok(KeyCommand::Quit) => break,
                Ok(KeyCommand::Status) => {
                    let status = self.renderer.status(&self.controller.snapshot());
                    writeln!(self.out, "{status}")?;
                }
                Ok(KeyCommand::List) => {
                    let listing = self
                        .renderer
                        .playlist(&self.tracks, &self.controller.snapshot());
                    writeln!(self.out, "{listing}")?;
                }
                Ok(KeyCommand::Help) => writeln!(self.out, "{HELP}")?,
                Ok(command) => self.submit(command),
                Err(err) => writeln!(self.out, "{err}")?,
            }
            self.out.flush()?;
        }

        Ok(())
    }

    /// Hand a command to the controller without blocking input
    fn submit(&self, command: KeyCommand) {
        let Some(completion) = command.dispatch(&self.controller, &self.controls) else {
            return;
        };
        tokio::spawn(async move {
            if let Err(err) = completion.await {
                tracing::debug!(?command, error = %err, "Command failed");
            }
        });
    }
}

/// Print controller events to stdout
///
/// The task holds a controller handle, so it runs until aborted.
pub fn spawn_event_printer(controller: PlaybackController, renderer: Renderer) -> JoinHandle<()> {
    let mut events = controller.events();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(line) = renderer.event(&event, &controller.snapshot()) {
                        println!("{line}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Event printer lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
