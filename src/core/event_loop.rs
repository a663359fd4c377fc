use crate::core::mesh_loader::MeshLoader;
use crate::core::parser::{ParsedFile, StopParser};
use crate::core::renderer::{MapRenderer, RenderStats};
use crate::core::shell::{AppState, MeshTicket, Shell, UploadTicket};
use crate::core::{MeshCollection, SceneSink, Storage, UserAction};
use crate::utils::error::Result;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

enum Completion {
    StopsParsed {
        ticket: UploadTicket,
        outcomes: Vec<Result<ParsedFile>>,
    },
    MeshLoaded {
        ticket: MeshTicket,
        result: Result<MeshCollection>,
    },
}

#[derive(Debug)]
pub struct RunReport {
    pub state: AppState,
    pub stats: RenderStats,
}

/// Single logic task: user actions and I/O completions are handled one at a
/// time, and a scene is presented after each of them. File reads and mesh
/// fetches run as spawned tasks and report back over a channel.
pub struct EventLoop<S: Storage + 'static, K: SceneSink> {
    shell: Shell,
    renderer: MapRenderer,
    parser: Arc<StopParser>,
    storage: Arc<S>,
    loader: MeshLoader,
    sink: K,
}

impl<S: Storage + 'static, K: SceneSink> EventLoop<S, K> {
    pub fn new(
        shell: Shell,
        renderer: MapRenderer,
        parser: StopParser,
        storage: S,
        loader: MeshLoader,
        sink: K,
    ) -> Self {
        Self {
            shell,
            renderer,
            parser: Arc::new(parser),
            storage: Arc::new(storage),
            loader,
            sink,
        }
    }

    /// Runs until `Shutdown` (or the action channel closing), then keeps
    /// applying completions until no upload or current mesh request is pending.
    pub async fn run(mut self, mut actions: UnboundedReceiver<UserAction>) -> Result<RunReport> {
        let (done_tx, mut done_rx) = unbounded_channel();
        let mut accepting = true;

        self.present().await?;
        loop {
            if !accepting && !self.shell.is_busy() {
                break;
            }

            tokio::select! {
                action = actions.recv(), if accepting => match action {
                    Some(UserAction::Shutdown) | None => {
                        tracing::debug!("No more user actions, draining pending work");
                        accepting = false;
                        continue;
                    }
                    Some(action) => self.handle_action(action, &done_tx),
                },
                Some(done) = done_rx.recv() => self.handle_completion(done),
            }

            self.present().await?;
        }

        Ok(RunReport {
            stats: self.renderer.stats(),
            state: self.shell.into_state(),
        })
    }

    fn handle_action(&mut self, action: UserAction, done_tx: &UnboundedSender<Completion>) {
        tracing::debug!("User action: {:?}", action);
        match action {
            UserAction::FilesSelected(paths) => {
                if paths.is_empty() {
                    return;
                }
                let ticket = self.shell.begin_upload();
                let parser = Arc::clone(&self.parser);
                let storage = Arc::clone(&self.storage);
                let done_tx = done_tx.clone();
                tracing::info!("Parsing {} stop file(s)", paths.len());
                tokio::spawn(async move {
                    let outcomes = parser.parse_batch(storage.as_ref(), &paths).await;
                    let _ = done_tx.send(Completion::StopsParsed { ticket, outcomes });
                });
            }
            UserAction::RegionSelected(code) => {
                // 錯誤已經轉成通知
                let _ = self.shell.select_region(&code);
            }
            UserAction::FetchMesh => {
                let Ok(ticket) = self.shell.begin_mesh_fetch() else {
                    return;
                };
                let loader = self.loader.clone();
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    let code = ticket.region_code().to_string();
                    let result = loader.load(&code).await;
                    let _ = done_tx.send(Completion::MeshLoaded { ticket, result });
                });
            }
            UserAction::ClearStops => self.shell.clear_stops(),
            UserAction::Shutdown => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::StopsParsed { ticket, outcomes } => {
                let outcome = self.shell.finish_upload(ticket, outcomes);
                tracing::debug!("Upload completion: {:?}", outcome);
            }
            Completion::MeshLoaded { ticket, result } => {
                let outcome = self.shell.finish_mesh_fetch(ticket, result);
                tracing::debug!("Mesh completion: {:?}", outcome);
            }
        }
    }

    async fn present(&mut self) -> Result<()> {
        for notification in self.shell.take_notifications() {
            self.sink.notify(&notification).await?;
        }
        let scene = self.renderer.render(self.shell.state());
        self.sink.present(&scene).await
    }
}
