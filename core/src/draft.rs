//! Client-side draft of one workout being edited.
//!
//! Replaces the original free-form client store: every edit is a tagged
//! [`DraftAction`] applied by a pure reducer, and child identity is an
//! explicit `Draft`/`Persisted` tag instead of id-shape sniffing. Edits have
//! no storage effect until the draft is serialized by `begin_save` and handed
//! to the reconciliation procedure; on success the draft is cleared, on
//! failure it is retained for resubmission.

use anyhow::{Result, bail};
use uuid::Uuid;

use crate::models::{ExerciseInput, SetInput, Workout};

/// Identity of a child record inside a draft. `Draft` ids are local
/// placeholders; only `Persisted` ids survive serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildId {
    Draft(Uuid),
    Persisted(i64),
}

impl ChildId {
    #[must_use]
    pub fn fresh() -> Self {
        Self::Draft(Uuid::new_v4())
    }

    #[must_use]
    pub fn persisted_id(self) -> Option<i64> {
        match self {
            Self::Persisted(id) => Some(id),
            Self::Draft(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DraftSet {
    pub id: ChildId,
    pub rep: String,
    pub weight: String,
}

#[derive(Debug, Clone)]
pub struct DraftExercise {
    pub id: ChildId,
    pub title: String,
    pub sets: Vec<DraftSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftState {
    Empty,
    Editing,
    Saving,
}

#[derive(Debug, Clone, Copy)]
pub enum SetField {
    Rep,
    Weight,
}

#[derive(Debug, Clone)]
pub enum DraftAction {
    RenameTitle(String),
    AddExercise {
        title: String,
    },
    RemoveExercise(ChildId),
    RenameExercise {
        exercise: ChildId,
        title: String,
    },
    AddSet {
        exercise: ChildId,
        rep: String,
        weight: String,
    },
    EditSet {
        exercise: ChildId,
        set: ChildId,
        field: SetField,
        value: String,
    },
    DuplicateSet {
        exercise: ChildId,
        set: ChildId,
    },
    RemoveSet {
        exercise: ChildId,
        set: ChildId,
    },
}

#[derive(Debug, Clone)]
pub struct WorkoutDraft {
    state: DraftState,
    pub workout_id: Option<i64>,
    pub title: String,
    pub exercises: Vec<DraftExercise>,
}

impl Default for WorkoutDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkoutDraft {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: DraftState::Empty,
            workout_id: None,
            title: String::new(),
            exercises: Vec::new(),
        }
    }

    /// Seed the draft from a persisted workout (sets included).
    #[must_use]
    pub fn from_workout(workout: &Workout) -> Self {
        Self {
            state: DraftState::Empty,
            workout_id: Some(workout.id),
            title: workout.title.clone(),
            exercises: workout
                .exercises
                .iter()
                .map(|e| DraftExercise {
                    id: ChildId::Persisted(e.id),
                    title: e.title.clone(),
                    sets: e
                        .sets
                        .iter()
                        .map(|s| DraftSet {
                            id: ChildId::Persisted(s.id),
                            rep: s.rep.clone(),
                            weight: s.weight.clone(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[must_use]
    pub fn state(&self) -> DraftState {
        self.state
    }

    /// Apply one edit. Any mutation moves an `Empty` draft to `Editing`;
    /// edits are rejected while a save is in flight.
    pub fn apply(&mut self, action: DraftAction) -> Result<()> {
        if self.state == DraftState::Saving {
            bail!("A save is in flight; the draft cannot be edited");
        }
        match action {
            DraftAction::RenameTitle(title) => self.title = title,
            DraftAction::AddExercise { title } => self.exercises.push(DraftExercise {
                id: ChildId::fresh(),
                title,
                sets: Vec::new(),
            }),
            DraftAction::RemoveExercise(id) => self.exercises.retain(|e| e.id != id),
            DraftAction::RenameExercise { exercise, title } => {
                self.exercise_mut(exercise)?.title = title;
            }
            DraftAction::AddSet {
                exercise,
                rep,
                weight,
            } => {
                self.exercise_mut(exercise)?.sets.push(DraftSet {
                    id: ChildId::fresh(),
                    rep,
                    weight,
                });
            }
            DraftAction::EditSet {
                exercise,
                set,
                field,
                value,
            } => {
                let s = self.set_mut(exercise, set)?;
                match field {
                    SetField::Rep => s.rep = value,
                    SetField::Weight => s.weight = value,
                }
            }
            DraftAction::DuplicateSet { exercise, set } => {
                let copy = {
                    let s = self.set_mut(exercise, set)?;
                    DraftSet {
                        id: ChildId::fresh(),
                        rep: s.rep.clone(),
                        weight: s.weight.clone(),
                    }
                };
                self.exercise_mut(exercise)?.sets.push(copy);
            }
            DraftAction::RemoveSet { exercise, set } => {
                self.exercise_mut(exercise)?.sets.retain(|s| s.id != set);
            }
        }
        self.state = DraftState::Editing;
        Ok(())
    }

    /// Serialize the draft for the reconciliation procedure and enter
    /// `Saving`. Draft child ids become `None` (to be created), persisted
    /// ids become `Some` (to be matched).
    pub fn begin_save(&mut self) -> Result<Vec<ExerciseInput>> {
        if self.state != DraftState::Editing {
            bail!("Nothing to save");
        }
        self.state = DraftState::Saving;
        Ok(self
            .exercises
            .iter()
            .map(|e| ExerciseInput {
                id: e.id.persisted_id(),
                title: e.title.clone(),
                sets: Some(
                    e.sets
                        .iter()
                        .map(|s| SetInput {
                            id: s.id.persisted_id(),
                            rep: s.rep.clone(),
                            weight: s.weight.clone(),
                        })
                        .collect(),
                ),
            })
            .collect())
    }

    /// Clear the draft. The caller is expected to refetch the canonical
    /// list — the server response is never merged back in.
    pub fn save_succeeded(&mut self) {
        *self = Self::new();
    }

    /// Retain the draft for resubmission.
    pub fn save_failed(&mut self) {
        if self.state == DraftState::Saving {
            self.state = DraftState::Editing;
        }
    }

    fn exercise_mut(&mut self, id: ChildId) -> Result<&mut DraftExercise> {
        match self.exercises.iter_mut().find(|e| e.id == id) {
            Some(e) => Ok(e),
            None => bail!("No such exercise in draft"),
        }
    }

    fn set_mut(&mut self, exercise: ChildId, set: ChildId) -> Result<&mut DraftSet> {
        match self
            .exercise_mut(exercise)?
            .sets
            .iter_mut()
            .find(|s| s.id == set)
        {
            Some(s) => Ok(s),
            None => bail!("No such set in draft"),
        }
    }
}
