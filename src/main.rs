//! Studio - terminal chat with the specialist panel
//!
//! Opens a conversation on the backend and streams every specialist turn
//! into the terminal as it is written.

use std::collections::HashMap;
use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;
use studio_client::api::{
    ApiError, Generation, GenerationStatus, HttpApi, Message, Role, Session, StudioApi,
};
use studio_client::config::ClientConfig;
use studio_client::generation::GenerationPoller;
use studio_client::reducer::{ChatStore, ChatUpdate, StreamingMessage};
use studio_client::specialist;
use studio_client::stream::{HttpTransport, StreamError};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
enum InitError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Stream(#[from] StreamError),
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so the transcript on stdout stays readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "studio_client=info,studio=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(io::stderr),
        )
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(api_url = %config.api_url, "Starting studio client");

    let chat = match Chat::start(&config).await {
        Ok(chat) => chat,
        Err(e) => {
            tracing::error!(error = %e, "Initialization failed");
            eprintln!("Failed to initialize chat");
            return ExitCode::FAILURE;
        }
    };

    chat.run().await;
    ExitCode::SUCCESS
}

struct Chat {
    store: ChatStore<HttpTransport>,
    conversation_id: String,
    poller: GenerationPoller,
    generations: mpsc::Receiver<Vec<Generation>>,
}

impl Chat {
    async fn start(config: &ClientConfig) -> Result<Self, InitError> {
        let api = Arc::new(HttpApi::new(&config.api_url, config.request_timeout)?);
        let transport = Arc::new(HttpTransport::new(&config.api_url, config.request_timeout)?);

        let session = open_session(api.as_ref(), config.session_id.as_deref()).await?;
        let conversation = api.create_conversation(&session.id).await?;
        tracing::info!(
            session_id = %session.id,
            conversation_id = %conversation.id,
            "Conversation ready"
        );

        let store = ChatStore::new(transport).with_safety_timeout(config.stream_timeout);
        store.set_messages(api.get_messages(&conversation.id).await?);

        let (poller, generations) = GenerationPoller::spawn(
            api,
            conversation.id.clone(),
            config.generation_poll_interval,
        );

        Ok(Self {
            store,
            conversation_id: conversation.id,
            poller,
            generations,
        })
    }

    async fn run(mut self) {
        let mut out = io::stdout();
        let mut renderer = Renderer::default();
        let mut updates = self.store.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        renderer.banner(&mut out);
        for message in self.store.messages() {
            renderer.history(&mut out, &message);
        }

        loop {
            tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => match line.trim() {
                        "" => {}
                        "/quit" => break,
                        "/cancel" => {
                            if !self.store.cancel() {
                                renderer.note(&mut out, "nothing to cancel");
                            }
                        }
                        text => {
                            self.store.send(&self.conversation_id, text);
                        }
                    },
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to read input");
                        break;
                    }
                },
                update = updates.recv() => match update {
                    Ok(update) => renderer.update(&mut out, &update),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Renderer fell behind");
                        renderer.resync(&mut out, self.store.streaming_message().as_ref());
                    }
                    Err(RecvError::Closed) => break,
                },
                Some(generations) = self.generations.recv() => {
                    renderer.generations(&mut out, &generations);
                }
            }
            let _ = out.flush();
        }

        self.store.cancel();
        self.poller.stop();
    }
}

/// Reuse the configured session, or create one with default assignments
async fn open_session<A: StudioApi + ?Sized>(
    api: &A,
    session_id: Option<&str>,
) -> Result<Session, ApiError> {
    let Some(session_id) = session_id else {
        return api
            .create_session(&specialist::default_model_assignments())
            .await;
    };

    let session = api.get_session(session_id).await?;
    let merged = specialist::merge_with_defaults(&session.model_assignments);
    if merged == session.model_assignments {
        return Ok(session);
    }

    tracing::info!(session_id, "Filling in missing model assignments");
    api.update_session(session_id, &merged).await
}

/// Turns chat updates into terminal output
#[derive(Default)]
struct Renderer {
    /// Preview currently on screen and how many bytes of it are printed
    open: Option<(Role, usize)>,
    /// Last reported (status, progress) per generation
    generations: HashMap<String, (GenerationStatus, u8)>,
}

impl Renderer {
    fn banner(&self, out: &mut impl Write) {
        let panel: Vec<String> = specialist::roster()
            .map(|s| format!("{} {}", s.icon, s.name))
            .collect();
        let _ = writeln!(out, "Specialists: {}", panel.join("  "));
        let _ = writeln!(out, "Models: {}", specialist::AVAILABLE_MODELS.join(", "));
        let _ = writeln!(out, "Type a message, /cancel to stop a reply, /quit to leave.");
    }

    fn history(&self, out: &mut impl Write, message: &Message) {
        let _ = writeln!(out, "{}{}", header(message.role, message.name()), message.content);
    }

    fn note(&self, out: &mut impl Write, text: &str) {
        let _ = writeln!(out, "({text})");
    }

    fn update(&mut self, out: &mut impl Write, update: &ChatUpdate) {
        match update {
            ChatUpdate::Preview(Some(preview)) => self.preview(out, preview),
            ChatUpdate::Preview(None) => {
                // Finalized turns close the line themselves
                if self.open.take().is_some() {
                    let _ = writeln!(out, " [interrupted]");
                }
            }
            // The user's own line is already on screen
            ChatUpdate::MessageAdded(message) if message.role != Role::User => {
                self.finalize(out, message);
            }
            ChatUpdate::Phase(phase) => {
                self.close_line(out);
                let _ = writeln!(out, "-- phase: {phase} --");
            }
            ChatUpdate::MessageAdded(_)
            | ChatUpdate::MessagesReplaced { .. }
            | ChatUpdate::Streaming(_) => {}
        }
    }

    fn preview(&mut self, out: &mut impl Write, preview: &StreamingMessage) {
        let printed = match self.open {
            Some((role, printed)) if role == preview.role && printed <= preview.content.len() => {
                printed
            }
            _ => {
                self.close_line(out);
                let _ = write!(out, "{}", header(preview.role, Some(&preview.name)));
                0
            }
        };

        let delta = preview.content.get(printed..).unwrap_or_default();
        let _ = write!(out, "{delta}");
        self.open = Some((preview.role, printed + delta.len()));
    }

    fn finalize(&mut self, out: &mut impl Write, message: &Message) {
        match self.open.take() {
            Some((role, printed)) if role == message.role => {
                // The final text normally extends what was streamed
                match message.content.get(printed..) {
                    Some(rest) => {
                        let _ = writeln!(out, "{rest}");
                    }
                    None => {
                        let _ = writeln!(out);
                        self.history(out, message);
                    }
                }
            }
            open => {
                if open.is_some() {
                    let _ = writeln!(out);
                }
                self.history(out, message);
            }
        }
    }

    /// Redraw the open preview after missed updates
    fn resync(&mut self, out: &mut impl Write, preview: Option<&StreamingMessage>) {
        self.close_line(out);
        if let Some(preview) = preview {
            self.preview(out, preview);
        }
    }

    fn generations(&mut self, out: &mut impl Write, generations: &[Generation]) {
        for generation in generations {
            let current = (generation.status, generation.progress);
            if self.generations.get(&generation.id) == Some(&current) {
                continue;
            }
            self.generations.insert(generation.id.clone(), current);

            self.close_line(out);
            let short_id: String = generation.id.chars().take(8).collect();
            let _ = match (&generation.status, &generation.error) {
                (GenerationStatus::Failed, Some(error)) => {
                    writeln!(out, "[generation {short_id}] failed: {error}")
                }
                (status, _) => writeln!(
                    out,
                    "[generation {short_id}] {} {}%",
                    status_label(*status),
                    generation.progress
                ),
            };
        }
    }

    /// End a half-printed preview line; further chunks get a fresh header
    fn close_line(&mut self, out: &mut impl Write) {
        if self.open.take().is_some() {
            let _ = writeln!(out);
        }
    }
}

fn header(role: Role, name: Option<&str>) -> String {
    let label = specialist::display_name(role, name);
    match specialist::info(role) {
        Some(info) => format!("{} {label}: ", info.icon),
        None => format!("{label}: "),
    }
}

fn status_label(status: GenerationStatus) -> &'static str {
    match status {
        GenerationStatus::Queued => "queued",
        GenerationStatus::Running => "running",
        GenerationStatus::Complete => "complete",
        GenerationStatus::Failed => "failed",
    }
}
