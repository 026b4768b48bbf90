use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::draft::{DraftAction, WorkoutDraft};
use tally_core::service::TallyService;

use super::helpers::{days_ago, parse_date};

pub(crate) fn cmd_workout_create(
    svc: &TallyService,
    owner: &str,
    title: &str,
    exercises: Vec<String>,
    json: bool,
) -> Result<()> {
    let workout = svc.create_workout(owner, title, &exercises)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workout)?);
    } else {
        println!("Created workout '{}' (id {})", workout.title, workout.id);
        for exercise in &workout.exercises {
            println!("  {} (exercise {})", exercise.title, exercise.id);
        }
    }
    Ok(())
}

pub(crate) fn cmd_workout_all(svc: &TallyService, owner: &str, json: bool) -> Result<()> {
    let workouts = svc.get_all_workouts(owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workouts)?);
    } else if workouts.is_empty() {
        eprintln!("No workouts yet. Use `tally workout create` to add one.");
    } else {
        #[derive(Tabled)]
        struct WorkoutRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Title")]
            title: String,
            #[tabled(rename = "Exercises")]
            exercises: usize,
        }

        let rows: Vec<WorkoutRow> = workouts
            .iter()
            .map(|w| WorkoutRow {
                id: w.id,
                title: w.title.clone(),
                exercises: w.exercises.len(),
            })
            .collect();

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Modify::new(Columns::new(2..)).with(Alignment::right()));
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_workout_show(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    let workout = svc.get_workout(owner, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workout)?);
    } else {
        println!("{} (id {})", workout.title, workout.id);
        for exercise in &workout.exercises {
            let best = if exercise.max_weight > 0.0 {
                format!(" — best {}", exercise.max_weight)
            } else {
                String::new()
            };
            println!("  {} (exercise {}){best}", exercise.title, exercise.id);
            for set in &exercise.sets {
                println!("    {} x {} (set {})", set.rep, set.weight, set.id);
            }
        }
    }
    Ok(())
}

/// Sets logged on one day, across all workouts.
pub(crate) fn cmd_workout_day(
    svc: &TallyService,
    owner: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let workouts = svc.get_workouts_by_date(owner, &date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&workouts)?);
        return Ok(());
    }

    let mut any = false;
    for workout in &workouts {
        for exercise in &workout.exercises {
            if exercise.sets.is_empty() {
                continue;
            }
            any = true;
            println!("{} / {}", workout.title, exercise.title);
            for set in &exercise.sets {
                println!("  {} x {}", set.rep, set.weight);
            }
        }
    }
    if !any {
        eprintln!("Nothing logged on {date}.");
    }
    Ok(())
}

/// Log sets against a workout for one day. The edits are staged in a draft
/// and submitted as the day's complete state, so repeated `log` calls in one
/// invocation stay consistent with what is already persisted.
pub(crate) fn cmd_workout_log(
    svc: &TallyService,
    owner: &str,
    id: i64,
    exercise_title: &str,
    rep: &str,
    weight: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let workout = svc.get_workouts_by_date(owner, &date)?
        .into_iter()
        .find(|w| w.id == id);
    let Some(workout) = workout else {
        bail!("No workout with id {id}");
    };

    let mut draft = WorkoutDraft::from_workout(&workout);
    let exercise = draft
        .exercises
        .iter()
        .find(|e| e.title.eq_ignore_ascii_case(exercise_title))
        .map(|e| e.id);
    let exercise = match exercise {
        Some(id) => id,
        None => {
            draft.apply(DraftAction::AddExercise {
                title: exercise_title.to_string(),
            })?;
            match draft.exercises.last() {
                Some(e) => e.id,
                None => bail!("Failed to add exercise to draft"),
            }
        }
    };
    draft.apply(DraftAction::AddSet {
        exercise,
        rep: rep.to_string(),
        weight: weight.to_string(),
    })?;

    let exercises = draft.begin_save()?;
    match svc.update_workout(owner, id, &workout.title, exercises, Some(&date)) {
        Ok(updated) => {
            draft.save_succeeded();
            if json {
                println!("{}", serde_json::to_string_pretty(&updated)?);
            } else {
                println!("Logged {exercise_title}: {rep} x {weight} on {date}");
            }
            Ok(())
        }
        Err(e) => {
            draft.save_failed();
            Err(e)
        }
    }
}

pub(crate) fn cmd_workout_delete(
    svc: &TallyService,
    owner: &str,
    id: i64,
    json: bool,
) -> Result<()> {
    svc.delete_workout(owner, id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted workout {id} (its exercises were kept)");
    }
    Ok(())
}

pub(crate) fn cmd_exercise_show(
    svc: &TallyService,
    owner: &str,
    id: i64,
    json: bool,
) -> Result<()> {
    let exercise = svc.get_exercise(owner, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&exercise)?);
    } else {
        println!("{} (exercise {})", exercise.title, exercise.id);
        if let Some(ref date) = exercise.max_weight_date {
            println!("  Best: {} ({})", exercise.max_weight, days_ago(date));
        }
        for set in &exercise.sets {
            println!("  {} x {} (set {})", set.rep, set.weight, set.id);
        }
    }
    Ok(())
}

pub(crate) fn cmd_set_add(
    svc: &TallyService,
    owner: &str,
    exercise_id: i64,
    rep: &str,
    weight: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = match date {
        Some(d) => Some(parse_date(Some(d))?),
        None => None,
    };
    let set = svc.add_set_to_exercise(owner, exercise_id, rep, weight, date.as_deref())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
    } else {
        println!("Added set {}: {} x {}", set.id, set.rep, set.weight);
    }
    Ok(())
}

pub(crate) fn cmd_set_edit(
    svc: &TallyService,
    owner: &str,
    id: i64,
    rep: &str,
    weight: &str,
    json: bool,
) -> Result<()> {
    let set = svc.update_set(owner, id, rep, weight)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
    } else {
        println!("Set {} is now {} x {}", set.id, set.rep, set.weight);
    }
    Ok(())
}

pub(crate) fn cmd_set_delete(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    svc.delete_set(owner, id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted set {id}");
    }
    Ok(())
}
