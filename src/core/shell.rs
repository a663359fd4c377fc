use crate::core::parser::ParsedFile;
use crate::core::{MeshCollection, Notification, NotificationKind, Region, StopCollection};
use crate::domain::regions::RegionCatalog;
use crate::utils::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

/// What to do with a batch in which some files failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Commit every file that parsed, in selection order.
    #[default]
    Partial,
    /// Commit nothing if any file failed.
    AllOrNothing,
}

impl FromStr for BatchPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "partial" => Ok(BatchPolicy::Partial),
            "all_or_nothing" => Ok(BatchPolicy::AllOrNothing),
            other => Err(AppError::InvalidConfigValueError {
                field: "batch_policy".to_string(),
                value: other.to_string(),
                reason: "expected 'partial' or 'all-or-nothing'".to_string(),
            }),
        }
    }
}

/// The mutable application state. Only [`Shell`] writes it; renderers read it.
#[derive(Debug, Default)]
pub struct AppState {
    stops: StopCollection,
    mesh: Option<Arc<MeshCollection>>,
    selected_region: Option<Region>,
    is_loading: bool,
    is_mesh_loading: bool,
    notifications: Vec<Notification>,
}

impl AppState {
    pub fn stops(&self) -> &StopCollection {
        &self.stops
    }

    pub fn mesh(&self) -> Option<&Arc<MeshCollection>> {
        self.mesh.as_ref()
    }

    pub fn selected_region(&self) -> Option<&Region> {
        self.selected_region.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_mesh_loading(&self) -> bool {
        self.is_mesh_loading
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadTicket {
    seq: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTicket {
    generation: u64,
    region_code: String,
}

impl MeshTicket {
    pub fn region_code(&self) -> &str {
        &self.region_code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// An earlier batch is still in flight; this one waits for it.
    Parked,
    Applied {
        committed: usize,
        stops_added: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshOutcome {
    Applied,
    Failed,
    Stale,
}

type BatchResult = Vec<Result<ParsedFile>>;

/// Owns [`AppState`] and defines every transition on it.
///
/// Async work is split into `begin_*` (issue a ticket) and `finish_*` (apply a
/// completion). Uploads commit in issue order, onto whatever the collection
/// holds at that point (a clear-all in between leaves it empty). Mesh
/// completions only apply while their ticket is the newest one.
#[derive(Debug)]
pub struct Shell {
    state: AppState,
    catalog: RegionCatalog,
    policy: BatchPolicy,
    next_upload_seq: u64,
    next_commit_seq: u64,
    parked: BTreeMap<u64, BatchResult>,
    mesh_generation: u64,
}

impl Shell {
    pub fn new(catalog: RegionCatalog, policy: BatchPolicy) -> Self {
        Self {
            state: AppState::default(),
            catalog,
            policy,
            next_upload_seq: 0,
            next_commit_seq: 0,
            parked: BTreeMap::new(),
            mesh_generation: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn into_state(self) -> AppState {
        self.state
    }

    pub fn catalog(&self) -> &RegionCatalog {
        &self.catalog
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.state.notifications)
    }

    /// Any in-flight work (uploads still to be committed, a mesh request).
    pub fn is_busy(&self) -> bool {
        self.state.is_loading || self.state.is_mesh_loading
    }

    fn notify(&mut self, kind: NotificationKind, message: String) {
        tracing::warn!("{:?}: {}", kind, message);
        self.state.notifications.push(Notification::new(kind, message));
    }

    /// An empty code deselects.
    pub fn select_region(&mut self, code: &str) -> Result<()> {
        if code.is_empty() {
            self.state.selected_region = None;
            return Ok(());
        }
        match self.catalog.get(code) {
            Some(region) => {
                tracing::debug!("Selected region {} ({})", region.code, region.display_name);
                self.state.selected_region = Some(region.clone());
                Ok(())
            }
            None => {
                let err = AppError::UnknownRegion {
                    code: code.to_string(),
                };
                self.notify(NotificationKind::UnknownRegion, err.user_friendly_message());
                Err(err)
            }
        }
    }

    pub fn begin_upload(&mut self) -> UploadTicket {
        let ticket = UploadTicket {
            seq: self.next_upload_seq,
        };
        self.next_upload_seq += 1;
        self.state.is_loading = true;
        ticket
    }

    pub fn finish_upload(&mut self, ticket: UploadTicket, outcomes: BatchResult) -> UploadOutcome {
        self.parked.insert(ticket.seq, outcomes);
        if !self.parked.contains_key(&self.next_commit_seq) {
            tracing::debug!("Upload batch {} parked behind {}", ticket.seq, self.next_commit_seq);
            return UploadOutcome::Parked;
        }

        let mut committed = 0;
        let mut stops_added = 0;
        while let Some(outcomes) = self.parked.remove(&self.next_commit_seq) {
            self.next_commit_seq += 1;
            stops_added += self.commit_batch(outcomes);
            committed += 1;
        }
        self.state.is_loading = self.next_commit_seq < self.next_upload_seq;

        UploadOutcome::Applied {
            committed,
            stops_added,
        }
    }

    fn commit_batch(&mut self, outcomes: BatchResult) -> usize {
        let mut parsed = Vec::with_capacity(outcomes.len());
        let mut failed = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(file) => parsed.push(file),
                Err(e) => {
                    tracing::warn!("File parsing failed: {}", e);
                    failed.push(match e {
                        AppError::FileParseFailed { file, .. } => file,
                        other => other.to_string(),
                    });
                }
            }
        }

        if !failed.is_empty() {
            self.notify(
                NotificationKind::FileParseFailed,
                format!("An error occurred while parsing: {}", failed.join(", ")),
            );
            if self.policy == BatchPolicy::AllOrNothing {
                return 0;
            }
        }

        let new_stops: Vec<_> = parsed.into_iter().flat_map(|file| file.stops).collect();
        let added = new_stops.len();
        self.state.stops.append(new_stops);
        tracing::info!("Added {} stops ({} total)", added, self.state.stops.len());
        added
    }

    pub fn clear_stops(&mut self) {
        self.state.stops.clear();
        tracing::info!("Cleared all stops");
    }

    /// Rejects without touching the mesh when no region is selected. Otherwise
    /// the current mesh is cleared and a fresh ticket supersedes older ones.
    pub fn begin_mesh_fetch(&mut self) -> Result<MeshTicket> {
        let region_code = match &self.state.selected_region {
            Some(region) => region.code.clone(),
            None => {
                let err = AppError::RegionNotSelected;
                self.notify(NotificationKind::RegionNotSelected, err.user_friendly_message());
                return Err(err);
            }
        };

        self.mesh_generation += 1;
        self.state.mesh = None;
        self.state.is_mesh_loading = true;
        Ok(MeshTicket {
            generation: self.mesh_generation,
            region_code,
        })
    }

    pub fn finish_mesh_fetch(
        &mut self,
        ticket: MeshTicket,
        result: Result<MeshCollection>,
    ) -> MeshOutcome {
        if ticket.generation != self.mesh_generation {
            tracing::debug!(
                "Ignoring stale mesh response for region {}",
                ticket.region_code
            );
            return MeshOutcome::Stale;
        }

        self.state.is_mesh_loading = false;
        match result {
            Ok(mesh) => {
                self.state.mesh = Some(Arc::new(mesh));
                MeshOutcome::Applied
            }
            Err(e) => {
                self.state.mesh = None;
                self.notify(NotificationKind::MeshFetchFailed, e.user_friendly_message());
                MeshOutcome::Failed
            }
        }
    }
}
