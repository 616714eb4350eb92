//! Replay driver for the chat core.
//!
//! Reads newline-delimited `{"event": ..., "payload": ...}` envelopes from
//! stdin, feeds them through the runtime, and writes every render call to
//! stdout as one JSON object per line. Outbound transport commands are
//! logged instead of sent.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use arcade_chat::clock::SystemClock;
use arcade_chat::render::{RenderCall, RenderSink};
use arcade_chat::runtime::{self, ChatInput, InputSender};
use arcade_chat::session::SessionFlags;
use arcade_chat::transport::ChannelTransport;
use arcade_chat::{ChatConfig, ChatController};
use arcade_shared::EventEnvelope;

/// Writes render calls to stdout as JSON lines.
struct StdoutSurface;

impl RenderSink for StdoutSurface {
    fn emit(&mut self, call: RenderCall) {
        match serde_json::to_string(&call) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "Failed to serialize render call"),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    arcade_chat::init_tracing();

    info!(
        "Starting {} chat replay v{}",
        arcade_shared::constants::APP_NAME,
        env!("CARGO_PKG_VERSION")
    );

    let config = ChatConfig::from_env();
    info!(?config, "Loaded configuration");

    let (transport, mut command_rx) = ChannelTransport::channel(config.input_buffer);
    let command_log = tokio::spawn(async move {
        while let Some(command) = command_rx.recv().await {
            match serde_json::to_string(&command) {
                Ok(json) => info!(command = %json, "Transport command"),
                Err(e) => warn!(error = %e, "Failed to serialize transport command"),
            }
        }
    });

    let controller = ChatController::new(
        &config,
        Box::new(transport),
        Box::new(StdoutSurface),
        Box::new(SessionFlags::new()),
        Arc::new(SystemClock),
    );

    let (input_tx, input_rx) = runtime::input_channel(config.input_buffer);
    let reader = tokio::spawn(read_events(input_tx));

    let controller = runtime::run(controller, input_rx).await;
    info!(
        unread = controller.unread().total(),
        blocked = controller.blocklist().len(),
        broadcast = controller.conversations().broadcast().len(),
        "Replay finished"
    );
    drop(controller);

    reader.await.context("stdin reader task panicked")??;
    command_log.await.context("command log task panicked")?;
    Ok(())
}

/// Forward every stdin line as an inbound event, then request shutdown.
async fn read_events(input_tx: InputSender) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let envelope: EventEnvelope = match serde_json::from_str(line) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(line = line_no, error = %e, "Skipping unparsable input line");
                continue;
            }
        };
        debug!(line = line_no, event = %envelope.event, "Replaying event");

        if input_tx
            .send(ChatInput::Event(envelope.into_event()))
            .await
            .is_err()
        {
            warn!("Chat runtime stopped before input was exhausted");
            return Ok(());
        }
    }

    // Runtime may already be gone; nothing left to deliver either way.
    let _ = input_tx.send(ChatInput::Shutdown).await;
    Ok(())
}
