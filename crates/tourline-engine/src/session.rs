//! Session transitions: start, navigate, edit, record, end.
//!
//! Navigation never clamps. A request that would leave the step index
//! outside the tour fails with [`EngineError::StepOutOfRange`] and leaves
//! the session untouched.
//!
//! Edits update the shared tour first, publish, then write the tour back to
//! its source. A failed write is returned to the caller with the in-memory
//! change already applied.

use crate::TourEngine;
use crate::error::{EngineError, Result};
use crate::events::{EndReason, TourEvent};
use crate::io;
use crate::reader::{TourReader, tour_id};
use crate::store::{ActiveSession, SessionToken, TourHandle};
use std::path::{Path, PathBuf};
use tourline::v1::{Selection, Step, Tour};

/// How to start a session.
#[derive(Debug, Clone)]
pub struct StartOptions {
    /// Step to land on; the first step when `None`.
    pub step: Option<usize>,
    /// Root relative steps resolve against; derived from the tour's source
    /// when `None`.
    pub workspace_root: Option<PathBuf>,
    /// Start with recording on.
    pub edit_mode: bool,
    pub can_edit: bool,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            step: None,
            workspace_root: None,
            edit_mode: false,
            can_edit: true,
        }
    }
}

impl StartOptions {
    pub fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn in_edit_mode(mut self) -> Self {
        self.edit_mode = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.can_edit = false;
        self
    }
}

/// A tour-level field edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TourProperty {
    Title(String),
    Description(Option<String>),
    /// `None`, or the no-pin ref, clears the pin.
    Ref(Option<String>),
}

/// Result of [`TourEngine::save_step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { selection_recorded: bool },
    /// The session the save was issued for has ended; nothing was written.
    Stale,
}

fn out_of_range(index: i64, len: usize) -> EngineError {
    EngineError::StepOutOfRange { index, len }
}

impl TourEngine {
    // ── Lifecycle ───────────────────────────────────────────────────

    /// Make `tour` the active session, replacing any current one.
    pub fn start(&mut self, tour: &TourHandle, options: StartOptions) -> Result<SessionToken> {
        let len = tour.step_count();
        let step = match options.step {
            Some(i) if i < len => Some(i),
            Some(i) => return Err(out_of_range(i as i64, len)),
            None if len > 0 => Some(0),
            None => None,
        };

        let workspace_root = options
            .workspace_root
            .or_else(|| self.workspace_root_for(Path::new(&tour.read().id)));
        let was_recording = self.is_recording();
        let token = self.next_token();

        self.active = Some(ActiveSession {
            tour: tour.clone(),
            step,
            workspace_root,
            recording: options.edit_mode,
            can_edit: options.can_edit,
            ephemeral: false,
            token,
        });

        let tour_id = tour.id();
        tracing::info!(tour = %tour_id, ?step, recording = options.edit_mode, "session started");
        self.events.publish(TourEvent::SessionStarted { tour_id, step });
        if was_recording != options.edit_mode {
            self.events.publish(TourEvent::RecordingChanged {
                recording: options.edit_mode,
            });
        }
        Ok(token)
    }

    /// Start a tour from the canonical set by its id.
    pub fn start_by_id(&mut self, id: &str, step: Option<usize>) -> Result<SessionToken> {
        let tour = self
            .find_tour(id)
            .cloned()
            .ok_or_else(|| EngineError::TourNotFound(id.to_string()))?;
        let options = StartOptions {
            step,
            ..Default::default()
        };
        self.start(&tour, options)
    }

    /// Load a tour document from anywhere and start it.
    ///
    /// A file that doesn't validate fails with [`EngineError::InvalidTour`],
    /// whose message is meant to be shown to the user.
    pub fn open_tour_file(&mut self, path: &Path) -> Result<SessionToken> {
        let tour = TourReader::read_tour(path)?;
        let handle = match self.find_tour(&tour.id) {
            Some(existing) => existing.clone(),
            None => TourHandle::new(tour),
        };
        self.start(&handle, StartOptions::default())
    }

    /// End the active session. Returns whether one was active.
    pub fn end(&mut self) -> bool {
        self.end_with(EndReason::Requested)
    }

    pub(crate) fn end_with(&mut self, reason: EndReason) -> bool {
        let Some(session) = self.active.take() else {
            return false;
        };
        let tour_id = session.tour.id();
        tracing::info!(tour = %tour_id, ?reason, "session ended");
        if session.recording {
            self.events
                .publish(TourEvent::RecordingChanged { recording: false });
        }
        self.events.publish(TourEvent::SessionEnded { tour_id, reason });
        true
    }

    // ── Navigation ──────────────────────────────────────────────────

    pub fn step_forward(&mut self) -> Result<usize> {
        self.step_by(1)
    }

    pub fn step_backward(&mut self) -> Result<usize> {
        self.step_by(-1)
    }

    pub fn jump_to(&mut self, index: usize) -> Result<usize> {
        let active = self.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        let delta = index as i64 - active.step_number();
        self.step_by(delta)
    }

    fn step_by(&mut self, delta: i64) -> Result<usize> {
        let active = self.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        let len = active.tour.step_count();
        let target = active.step_number() + delta;
        if target < 0 || target >= len as i64 {
            return Err(out_of_range(target, len));
        }

        let target = target as usize;
        active.step = Some(target);
        let tour_id = active.tour.id();
        self.events.publish(TourEvent::StepChanged {
            tour_id,
            step: Some(target),
        });
        Ok(target)
    }

    // ── Editing ─────────────────────────────────────────────────────

    /// Move step `index` of `tour` by `delta` places.
    ///
    /// When that step is the active session's current step, the session
    /// follows it.
    pub fn move_step(&mut self, tour: &TourHandle, index: usize, delta: isize) -> Result<()> {
        let len = tour.step_count();
        if index >= len {
            return Err(out_of_range(index as i64, len));
        }
        let target = index as i64 + delta as i64;
        if target < 0 || target >= len as i64 {
            return Err(out_of_range(target, len));
        }
        let target = target as usize;

        {
            let mut t = tour.write();
            let step = t.steps.remove(index);
            t.steps.insert(target, step);
        }

        let mut followed = false;
        if let Some(active) = &mut self.active
            && active.tour.id() == tour.id()
            && active.step == Some(index)
        {
            active.step = Some(target);
            followed = true;
        }

        self.events.publish(TourEvent::TourUpdated {
            tour_id: tour.id(),
        });
        if followed {
            self.events.publish(TourEvent::StepChanged {
                tour_id: tour.id(),
                step: Some(target),
            });
        }
        self.persist(tour)
    }

    /// Set the current step's description and, optionally, its selection.
    ///
    /// A selection is recorded only if it is non-empty and differs from the
    /// previous step's selection; a leftover selection carried over from the
    /// last step is ignored. `token` must belong to the running session,
    /// otherwise nothing happens.
    pub fn save_step(
        &mut self,
        token: SessionToken,
        content: &str,
        selection: Option<Selection>,
    ) -> Result<SaveOutcome> {
        let Some(active) = self.active.as_ref().filter(|a| a.token == token) else {
            tracing::debug!(?token, "ignoring save for an ended session");
            return Ok(SaveOutcome::Stale);
        };
        let tour = active.tour.clone();
        let index = active
            .step
            .ok_or_else(|| out_of_range(-1, tour.step_count()))?;

        let selection_recorded = {
            let mut t = tour.write();
            let previous = index
                .checked_sub(1)
                .and_then(|i| t.steps.get(i))
                .and_then(|s| s.selection);
            let selection = selection
                .filter(|s| !s.is_empty())
                .filter(|s| previous.as_ref() != Some(s));

            let len = t.steps.len();
            let step = t
                .steps
                .get_mut(index)
                .ok_or_else(|| out_of_range(index as i64, len))?;
            step.description = content.to_string();
            if let Some(selection) = selection {
                step.selection = Some(selection);
                true
            } else {
                false
            }
        };

        self.events.publish(TourEvent::TourUpdated {
            tour_id: tour.id(),
        });
        self.persist(&tour)?;
        Ok(SaveOutcome::Saved { selection_recorded })
    }

    /// Insert `step` after the current one and make it current.
    pub fn insert_step(&mut self, step: Step) -> Result<usize> {
        let active = self.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        let index = active.step.map_or(0, |i| i + 1);
        active.tour.write().steps.insert(index, step);
        active.step = Some(index);

        let tour = active.tour.clone();
        self.events.publish(TourEvent::TourUpdated {
            tour_id: tour.id(),
        });
        self.events.publish(TourEvent::StepChanged {
            tour_id: tour.id(),
            step: Some(index),
        });
        self.persist(&tour)?;
        Ok(index)
    }

    /// Remove step `index` of `tour`. The active session keeps pointing at
    /// the same logical step when it can, and at its neighbour otherwise.
    pub fn delete_step(&mut self, tour: &TourHandle, index: usize) -> Result<Step> {
        let len = tour.step_count();
        if index >= len {
            return Err(out_of_range(index as i64, len));
        }
        let removed = tour.write().steps.remove(index);

        let mut moved_to = None;
        if let Some(active) = &mut self.active
            && active.tour.id() == tour.id()
        {
            let before = active.step;
            if let Some(current) = active.step
                && current > index
            {
                active.step = Some(current - 1);
            }
            active.clamp_step();
            if active.step != before || before == Some(index) {
                moved_to = Some(active.step);
            }
        }

        self.events.publish(TourEvent::TourUpdated {
            tour_id: tour.id(),
        });
        if let Some(step) = moved_to {
            self.events.publish(TourEvent::StepChanged {
                tour_id: tour.id(),
                step,
            });
        }
        self.persist(tour)?;
        Ok(removed)
    }

    pub fn update_tour(&mut self, tour: &TourHandle, property: TourProperty) -> Result<()> {
        {
            let mut t = tour.write();
            match property {
                TourProperty::Title(title) => t.title = title,
                TourProperty::Description(description) => t.description = description,
                TourProperty::Ref(git_ref) => {
                    t.git_ref = git_ref.filter(|r| *r != self.config().no_pin_ref);
                }
            }
        }
        self.events.publish(TourEvent::TourUpdated {
            tour_id: tour.id(),
        });
        self.persist(tour)
    }

    // ── Recording ───────────────────────────────────────────────────

    /// Create an empty tour titled `title` under `root` and start recording
    /// into it.
    pub fn start_recording(
        &mut self,
        root: &Path,
        title: &str,
        git_ref: Option<&str>,
    ) -> Result<SessionToken> {
        let path = io::new_tour_path(root, &self.config().new_tour_directory, title);
        let mut tour = Tour::new(title);
        tour.git_ref = git_ref
            .filter(|r| *r != self.config().no_pin_ref)
            .map(str::to_string);

        io::create_tour_file(&path, &tour)?;
        tour.id = tour_id(&path);
        tracing::info!(path = %path.display(), "recording started");

        let handle = TourHandle::new(tour);
        let token = self.start(
            &handle,
            StartOptions::default()
                .with_workspace_root(root)
                .in_edit_mode(),
        )?;
        if let Some(active) = &mut self.active {
            active.ephemeral = true;
        }
        Ok(token)
    }

    /// Abandon a recording started by [`TourEngine::start_recording`] that
    /// has no steps yet, deleting the file it created.
    ///
    /// Tours that already existed are never deleted: recording into one of
    /// them fails with [`EngineError::NotRecording`].
    pub fn cancel_recording(&mut self) -> Result<()> {
        let active = self
            .active
            .as_ref()
            .filter(|a| a.recording && a.ephemeral)
            .ok_or(EngineError::NotRecording)?;
        if active.tour.step_count() > 0 {
            return Err(EngineError::RecordingHasSteps);
        }

        let id = active.tour.id();
        io::delete_tour_file(Path::new(&id))?;
        self.end_with(EndReason::RecordingCancelled);
        Ok(())
    }

    /// Flip edit mode on the active tour. Returns the new state.
    pub fn toggle_recording(&mut self) -> Result<bool> {
        let active = self.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        active.recording = !active.recording;
        let recording = active.recording;
        self.events
            .publish(TourEvent::RecordingChanged { recording });
        Ok(recording)
    }

    fn persist(&self, tour: &TourHandle) -> Result<()> {
        io::save_tour(&tour.read()).inspect_err(|e| {
            tracing::warn!(tour = %tour.id(), error = %e, "failed to save tour");
        })
    }
}
