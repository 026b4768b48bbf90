use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::models::{
    Exercise, ExerciseInput, ExerciseSet, LIST_STATUS_NONE, LIST_STATUS_UPDATED, List, ListItem,
    ListItemInput, NewList, NewPayment, Payment, SetInput, Stat, StatSet, StatSetInput,
    Transaction, UpdatePayment, Workout,
};
use crate::reconcile::{self, DayWindow};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS lists (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner TEXT NOT NULL,
                    name TEXT NOT NULL,
                    title TEXT,
                    status TEXT NOT NULL DEFAULT 'none',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS list_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    list_id INTEGER NOT NULL REFERENCES lists(id) ON DELETE CASCADE,
                    name TEXT NOT NULL,
                    checked INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS workouts (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner TEXT NOT NULL,
                    title TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS exercises (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    workout_id INTEGER REFERENCES workouts(id),
                    owner TEXT NOT NULL,
                    title TEXT NOT NULL,
                    max_weight REAL NOT NULL DEFAULT 0,
                    max_weight_date TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS exercise_sets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    exercise_id INTEGER NOT NULL REFERENCES exercises(id) ON DELETE CASCADE,
                    rep TEXT NOT NULL,
                    weight TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS stats (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner TEXT NOT NULL,
                    title TEXT NOT NULL,
                    unit TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS stat_sets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    stat_id INTEGER NOT NULL REFERENCES stats(id) ON DELETE CASCADE,
                    value TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS payments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner TEXT NOT NULL,
                    title TEXT NOT NULL,
                    amount TEXT NOT NULL,
                    tag TEXT,
                    due_date TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS transactions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    payment_id INTEGER NOT NULL REFERENCES payments(id),
                    amount TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_lists_owner ON lists(owner);
                CREATE INDEX IF NOT EXISTS idx_list_items_list ON list_items(list_id);
                CREATE INDEX IF NOT EXISTS idx_workouts_owner ON workouts(owner);
                CREATE INDEX IF NOT EXISTS idx_exercises_workout ON exercises(workout_id);
                CREATE INDEX IF NOT EXISTS idx_exercise_sets_exercise ON exercise_sets(exercise_id);
                CREATE INDEX IF NOT EXISTS idx_stats_owner ON stats(owner);
                CREATE INDEX IF NOT EXISTS idx_stat_sets_stat ON stat_sets(stat_id);
                CREATE INDEX IF NOT EXISTS idx_payments_owner ON payments(owner);
                CREATE INDEX IF NOT EXISTS idx_payments_due ON payments(due_date);
                CREATE INDEX IF NOT EXISTS idx_transactions_payment ON transactions(payment_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    // --- Row mapping helpers ---

    fn list_from_row(row: &rusqlite::Row) -> rusqlite::Result<List> {
        Ok(List {
            id: row.get(0)?,
            owner: row.get(1)?,
            name: row.get(2)?,
            title: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
            items: Vec::new(),
        })
    }

    fn list_item_from_row(row: &rusqlite::Row) -> rusqlite::Result<ListItem> {
        Ok(ListItem {
            id: row.get(0)?,
            list_id: row.get(1)?,
            name: row.get(2)?,
            checked: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn workout_from_row(row: &rusqlite::Row) -> rusqlite::Result<Workout> {
        Ok(Workout {
            id: row.get(0)?,
            owner: row.get(1)?,
            title: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
            exercises: Vec::new(),
        })
    }

    fn exercise_from_row(row: &rusqlite::Row) -> rusqlite::Result<Exercise> {
        Ok(Exercise {
            id: row.get(0)?,
            workout_id: row.get(1)?,
            owner: row.get(2)?,
            title: row.get(3)?,
            max_weight: row.get(4)?,
            max_weight_date: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            sets: Vec::new(),
        })
    }

    fn exercise_set_from_row(row: &rusqlite::Row) -> rusqlite::Result<ExerciseSet> {
        Ok(ExerciseSet {
            id: row.get(0)?,
            exercise_id: row.get(1)?,
            rep: row.get(2)?,
            weight: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn stat_from_row(row: &rusqlite::Row) -> rusqlite::Result<Stat> {
        Ok(Stat {
            id: row.get(0)?,
            owner: row.get(1)?,
            title: row.get(2)?,
            unit: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
            sets: Vec::new(),
        })
    }

    fn stat_set_from_row(row: &rusqlite::Row) -> rusqlite::Result<StatSet> {
        Ok(StatSet {
            id: row.get(0)?,
            stat_id: row.get(1)?,
            value: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    fn payment_from_row(row: &rusqlite::Row) -> rusqlite::Result<Payment> {
        Ok(Payment {
            id: row.get(0)?,
            owner: row.get(1)?,
            title: row.get(2)?,
            amount: row.get(3)?,
            tag: row.get(4)?,
            due_date: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            transactions: Vec::new(),
        })
    }

    fn transaction_from_row(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
        Ok(Transaction {
            id: row.get(0)?,
            payment_id: row.get(1)?,
            amount: row.get(2)?,
            created_at: row.get(3)?,
            updated_at: row.get(4)?,
        })
    }

    // --- Lists ---

    pub fn insert_list(&self, owner: &str, list: &NewList) -> Result<List> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO lists (owner, name, title, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![owner, list.name, list.title, LIST_STATUS_NONE, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        for item in &list.items {
            self.conn.execute(
                "INSERT INTO list_items (list_id, name, checked, created_at, updated_at)
                 VALUES (?1, ?2, 0, ?3, ?4)",
                params![id, item.name, now, now],
            )?;
        }
        self.get_list(id)?.context("List not found after insert")
    }

    pub fn get_list(&self, id: i64) -> Result<Option<List>> {
        let list = self
            .conn
            .query_row(
                "SELECT id, owner, name, title, status, created_at, updated_at
                 FROM lists WHERE id = ?1",
                params![id],
                Self::list_from_row,
            )
            .optional()?;
        match list {
            Some(mut list) => {
                list.items = self.get_items_for_list(list.id)?;
                Ok(Some(list))
            }
            None => Ok(None),
        }
    }

    pub fn get_all_lists(&self, owner: &str) -> Result<Vec<List>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, name, title, status, created_at, updated_at
             FROM lists WHERE owner = ?1
             ORDER BY updated_at DESC, created_at DESC",
        )?;
        let mut lists = stmt
            .query_map(params![owner], Self::list_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for list in &mut lists {
            list.items = self.get_items_for_list(list.id)?;
        }
        Ok(lists)
    }

    pub fn get_items_for_list(&self, list_id: i64) -> Result<Vec<ListItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, list_id, name, checked, created_at, updated_at
             FROM list_items WHERE list_id = ?1 ORDER BY id",
        )?;
        let items = stmt
            .query_map(params![list_id], Self::list_item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Reconcile the list's items against the submitted complete state and
    /// update the parent row. Creates and updates are applied before deletes.
    pub fn update_list(
        &self,
        id: i64,
        name: &str,
        title: Option<&str>,
        items: Vec<ListItemInput>,
    ) -> Result<List> {
        let now = Self::now();
        let existing_ids: Vec<i64> = self
            .get_items_for_list(id)?
            .iter()
            .map(|i| i.id)
            .collect();
        let plan = reconcile::plan(&existing_ids, items);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE lists SET name = ?1, title = ?2, status = ?3, updated_at = ?4 WHERE id = ?5",
            params![name, title, LIST_STATUS_UPDATED, now, id],
        )?;
        for item in &plan.create {
            tx.execute(
                "INSERT INTO list_items (list_id, name, checked, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, item.name, item.checked, now, now],
            )?;
        }
        for (item_id, item) in &plan.update {
            tx.execute(
                "UPDATE list_items SET name = ?1, checked = ?2, updated_at = ?3 WHERE id = ?4",
                params![item.name, item.checked, now, item_id],
            )?;
        }
        for item_id in &plan.delete {
            tx.execute("DELETE FROM list_items WHERE id = ?1", params![item_id])?;
        }
        tx.commit()?;

        self.get_list(id)?.context("List not found after update")
    }

    pub fn delete_list(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM list_items WHERE list_id = ?1", params![id])?;
        tx.execute("DELETE FROM lists WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_item(&self, id: i64) -> Result<Option<ListItem>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, list_id, name, checked, created_at, updated_at
                 FROM list_items WHERE id = ?1",
                params![id],
                Self::list_item_from_row,
            )
            .optional()?)
    }

    pub fn delete_item(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM list_items WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    pub fn delete_items_for_list(&self, list_id: i64) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM list_items WHERE list_id = ?1",
            params![list_id],
        )?;
        Ok(rows)
    }

    // --- Workouts ---

    pub fn insert_workout(&self, owner: &str, title: &str, exercises: &[String]) -> Result<Workout> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO workouts (owner, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![owner, title, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        for exercise_title in exercises {
            self.conn.execute(
                "INSERT INTO exercises (workout_id, owner, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, owner, exercise_title, now, now],
            )?;
        }
        self.get_workout(id)?
            .context("Workout not found after insert")
    }

    pub fn get_workout(&self, id: i64) -> Result<Option<Workout>> {
        let workout = self
            .conn
            .query_row(
                "SELECT id, owner, title, created_at, updated_at FROM workouts WHERE id = ?1",
                params![id],
                Self::workout_from_row,
            )
            .optional()?;
        match workout {
            Some(mut workout) => {
                workout.exercises = self.get_exercises_for_workout(workout.id)?;
                Ok(Some(workout))
            }
            None => Ok(None),
        }
    }

    pub fn get_all_workouts(&self, owner: &str) -> Result<Vec<Workout>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, created_at, updated_at
             FROM workouts WHERE owner = ?1 ORDER BY id",
        )?;
        let mut workouts = stmt
            .query_map(params![owner], Self::workout_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for workout in &mut workouts {
            workout.exercises = self.get_exercises_for_workout(workout.id)?;
        }
        Ok(workouts)
    }

    /// Workouts with each exercise's sets narrowed to the given day.
    pub fn get_workouts_by_date(&self, owner: &str, date: NaiveDate) -> Result<Vec<Workout>> {
        let window = DayWindow::for_date(date);
        let mut workouts = self.get_all_workouts(owner)?;
        for workout in &mut workouts {
            for exercise in &mut workout.exercises {
                exercise.sets.retain(|s| window.contains(&s.created_at));
            }
        }
        Ok(workouts)
    }

    fn get_exercises_for_workout(&self, workout_id: i64) -> Result<Vec<Exercise>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, workout_id, owner, title, max_weight, max_weight_date, created_at, updated_at
             FROM exercises WHERE workout_id = ?1 ORDER BY id",
        )?;
        let mut exercises = stmt
            .query_map(params![workout_id], Self::exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for exercise in &mut exercises {
            exercise.sets = self.get_sets_for_exercise(exercise.id)?;
        }
        Ok(exercises)
    }

    /// Reconcile a workout's exercises (and, per exercise, their sets)
    /// against the submitted complete state.
    ///
    /// With a `window`, only sets logged inside that day participate in the
    /// per-exercise set diff; sets outside it are left untouched.
    pub fn update_workout(
        &self,
        id: i64,
        title: &str,
        exercises: Vec<ExerciseInput>,
        window: Option<DayWindow>,
    ) -> Result<Workout> {
        let now = Self::now();
        let owner: String = self.conn.query_row(
            "SELECT owner FROM workouts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let existing_ids: Vec<i64> = self
            .get_exercises_for_workout(id)?
            .iter()
            .map(|e| e.id)
            .collect();
        let plan = reconcile::plan(&existing_ids, exercises);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE workouts SET title = ?1, updated_at = ?2 WHERE id = ?3",
            params![title, now, id],
        )?;

        let mut touched: Vec<(i64, Vec<SetInput>)> = Vec::new();
        for input in plan.create {
            tx.execute(
                "INSERT INTO exercises (workout_id, owner, title, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, owner, input.title, now, now],
            )?;
            let exercise_id = tx.last_insert_rowid();
            if let Some(sets) = input.sets {
                touched.push((exercise_id, sets));
            }
        }
        for (exercise_id, input) in plan.update {
            tx.execute(
                "UPDATE exercises SET title = ?1, updated_at = ?2 WHERE id = ?3",
                params![input.title, now, exercise_id],
            )?;
            if let Some(sets) = input.sets {
                touched.push((exercise_id, sets));
            }
        }
        for exercise_id in plan.delete {
            tx.execute(
                "DELETE FROM exercise_sets WHERE exercise_id = ?1",
                params![exercise_id],
            )?;
            tx.execute("DELETE FROM exercises WHERE id = ?1", params![exercise_id])?;
        }
        tx.commit()?;

        for (exercise_id, sets) in touched {
            self.reconcile_exercise_sets(exercise_id, sets, window)?;
        }

        self.get_workout(id)?
            .context("Workout not found after update")
    }

    /// Deleting a workout unlinks its exercises rather than removing them —
    /// an exercise's history outlives the workout it was grouped under.
    pub fn delete_workout(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE exercises SET workout_id = NULL WHERE workout_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM workouts WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    // --- Exercises and sets ---

    pub fn get_exercise(&self, id: i64) -> Result<Option<Exercise>> {
        let exercise = self
            .conn
            .query_row(
                "SELECT id, workout_id, owner, title, max_weight, max_weight_date, created_at, updated_at
                 FROM exercises WHERE id = ?1",
                params![id],
                Self::exercise_from_row,
            )
            .optional()?;
        match exercise {
            Some(mut exercise) => {
                exercise.sets = self.get_sets_for_exercise(exercise.id)?;
                Ok(Some(exercise))
            }
            None => Ok(None),
        }
    }

    pub fn get_sets_for_exercise(&self, exercise_id: i64) -> Result<Vec<ExerciseSet>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, exercise_id, rep, weight, created_at, updated_at
             FROM exercise_sets WHERE exercise_id = ?1 ORDER BY id",
        )?;
        let sets = stmt
            .query_map(params![exercise_id], Self::exercise_set_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sets)
    }

    pub fn get_exercise_set(&self, id: i64) -> Result<Option<ExerciseSet>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, exercise_id, rep, weight, created_at, updated_at
                 FROM exercise_sets WHERE id = ?1",
                params![id],
                Self::exercise_set_from_row,
            )
            .optional()?)
    }

    /// Reconcile one exercise's sets. With a window, only sets logged inside
    /// the day participate; new sets are stamped at the window's date when
    /// one is given, else now.
    pub fn reconcile_exercise_sets(
        &self,
        exercise_id: i64,
        sets: Vec<SetInput>,
        window: Option<DayWindow>,
    ) -> Result<()> {
        let now = Self::now();
        let existing = self.get_sets_for_exercise(exercise_id)?;
        let existing_ids: Vec<i64> = existing
            .iter()
            .filter(|s| window.is_none_or(|w| w.contains(&s.created_at)))
            .map(|s| s.id)
            .collect();
        let plan = reconcile::plan(&existing_ids, sets);

        let created_at = window.map_or_else(|| now.clone(), |w| w.start_rfc3339());
        let tx = self.conn.unchecked_transaction()?;
        for set in &plan.create {
            tx.execute(
                "INSERT INTO exercise_sets (exercise_id, rep, weight, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![exercise_id, set.rep, set.weight, created_at, now],
            )?;
        }
        for (set_id, set) in &plan.update {
            tx.execute(
                "UPDATE exercise_sets SET rep = ?1, weight = ?2, updated_at = ?3 WHERE id = ?4",
                params![set.rep, set.weight, now, set_id],
            )?;
        }
        for set_id in &plan.delete {
            tx.execute("DELETE FROM exercise_sets WHERE id = ?1", params![set_id])?;
        }
        tx.commit()?;

        self.recompute_exercise_max(exercise_id)
    }

    pub fn insert_exercise_set(
        &self,
        exercise_id: i64,
        rep: &str,
        weight: &str,
        created_at: Option<&str>,
    ) -> Result<ExerciseSet> {
        let now = Self::now();
        let created_at = created_at.unwrap_or(&now);
        self.conn.execute(
            "INSERT INTO exercise_sets (exercise_id, rep, weight, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![exercise_id, rep, weight, created_at, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.recompute_exercise_max(exercise_id)?;
        self.get_exercise_set(id)?
            .context("Set not found after insert")
    }

    pub fn update_exercise_set(&self, id: i64, rep: &str, weight: &str) -> Result<ExerciseSet> {
        let now = Self::now();
        self.conn.execute(
            "UPDATE exercise_sets SET rep = ?1, weight = ?2, updated_at = ?3 WHERE id = ?4",
            params![rep, weight, now, id],
        )?;
        let set = self
            .get_exercise_set(id)?
            .context("Set not found after update")?;
        self.recompute_exercise_max(set.exercise_id)?;
        Ok(set)
    }

    pub fn delete_exercise_set(&self, id: i64) -> Result<bool> {
        let Some(set) = self.get_exercise_set(id)? else {
            return Ok(false);
        };
        self.conn
            .execute("DELETE FROM exercise_sets WHERE id = ?1", params![id])?;
        self.recompute_exercise_max(set.exercise_id)?;
        Ok(true)
    }

    /// Rescan all surviving sets and persist the derived max on the exercise.
    fn recompute_exercise_max(&self, exercise_id: i64) -> Result<()> {
        let sets = self.get_sets_for_exercise(exercise_id)?;
        let max = reconcile::derive_max_weight(&sets);
        self.conn.execute(
            "UPDATE exercises SET max_weight = ?1, max_weight_date = ?2 WHERE id = ?3",
            params![max.weight, max.date, exercise_id],
        )?;
        Ok(())
    }

    // --- Stats ---

    pub fn insert_stat(&self, owner: &str, title: &str, unit: Option<&str>) -> Result<Stat> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO stats (owner, title, unit, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![owner, title, unit, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_stat(id)?.context("Stat not found after insert")
    }

    pub fn get_stat(&self, id: i64) -> Result<Option<Stat>> {
        let stat = self
            .conn
            .query_row(
                "SELECT id, owner, title, unit, created_at, updated_at FROM stats WHERE id = ?1",
                params![id],
                Self::stat_from_row,
            )
            .optional()?;
        match stat {
            Some(mut stat) => {
                stat.sets = self.get_sets_for_stat(stat.id)?;
                Ok(Some(stat))
            }
            None => Ok(None),
        }
    }

    pub fn get_all_stats(&self, owner: &str) -> Result<Vec<Stat>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, unit, created_at, updated_at
             FROM stats WHERE owner = ?1 ORDER BY id",
        )?;
        let mut stats = stmt
            .query_map(params![owner], Self::stat_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for stat in &mut stats {
            stat.sets = self.get_sets_for_stat(stat.id)?;
        }
        Ok(stats)
    }

    pub fn get_sets_for_stat(&self, stat_id: i64) -> Result<Vec<StatSet>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, stat_id, value, created_at, updated_at
             FROM stat_sets WHERE stat_id = ?1 ORDER BY id",
        )?;
        let sets = stmt
            .query_map(params![stat_id], Self::stat_set_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sets)
    }

    /// Reconcile a stat's sets against the submitted complete state.
    pub fn update_stat(
        &self,
        id: i64,
        title: &str,
        unit: Option<&str>,
        sets: Vec<StatSetInput>,
    ) -> Result<Stat> {
        let now = Self::now();
        let existing_ids: Vec<i64> = self.get_sets_for_stat(id)?.iter().map(|s| s.id).collect();
        let plan = reconcile::plan(&existing_ids, sets);

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE stats SET title = ?1, unit = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, unit, now, id],
        )?;
        for set in &plan.create {
            tx.execute(
                "INSERT INTO stat_sets (stat_id, value, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, set.value, now, now],
            )?;
        }
        for (set_id, set) in &plan.update {
            tx.execute(
                "UPDATE stat_sets SET value = ?1, updated_at = ?2 WHERE id = ?3",
                params![set.value, now, set_id],
            )?;
        }
        for set_id in &plan.delete {
            tx.execute("DELETE FROM stat_sets WHERE id = ?1", params![set_id])?;
        }
        tx.commit()?;

        self.get_stat(id)?.context("Stat not found after update")
    }

    pub fn delete_stat(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM stat_sets WHERE stat_id = ?1", params![id])?;
        tx.execute("DELETE FROM stats WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn get_stat_set(&self, id: i64) -> Result<Option<StatSet>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, stat_id, value, created_at, updated_at FROM stat_sets WHERE id = ?1",
                params![id],
                Self::stat_set_from_row,
            )
            .optional()?)
    }

    pub fn insert_stat_set(
        &self,
        stat_id: i64,
        value: &str,
        created_at: Option<&str>,
    ) -> Result<StatSet> {
        let now = Self::now();
        let created_at = created_at.unwrap_or(&now);
        self.conn.execute(
            "INSERT INTO stat_sets (stat_id, value, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![stat_id, value, created_at, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_stat_set(id)?
            .context("Stat set not found after insert")
    }

    pub fn update_stat_set(&self, id: i64, value: &str) -> Result<StatSet> {
        let now = Self::now();
        self.conn.execute(
            "UPDATE stat_sets SET value = ?1, updated_at = ?2 WHERE id = ?3",
            params![value, now, id],
        )?;
        self.get_stat_set(id)?
            .context("Stat set not found after update")
    }

    pub fn delete_stat_set(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM stat_sets WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // --- Payments ---

    pub fn insert_payment(&self, owner: &str, payment: &NewPayment) -> Result<Payment> {
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO payments (owner, title, amount, tag, due_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                owner,
                payment.title,
                payment.amount,
                payment.tag,
                payment.due_date,
                now,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        if let Some(ref completed) = payment.completed_date {
            self.insert_transaction(id, &payment.amount, Some(completed))?;
        }
        self.get_payment(id)?
            .context("Payment not found after insert")
    }

    pub fn get_payment(&self, id: i64) -> Result<Option<Payment>> {
        let payment = self
            .conn
            .query_row(
                "SELECT id, owner, title, amount, tag, due_date, created_at, updated_at
                 FROM payments WHERE id = ?1",
                params![id],
                Self::payment_from_row,
            )
            .optional()?;
        match payment {
            Some(mut payment) => {
                payment.transactions = self.get_transactions_for_payment(payment.id)?;
                Ok(Some(payment))
            }
            None => Ok(None),
        }
    }

    pub fn get_all_payments(&self, owner: &str) -> Result<Vec<Payment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, amount, tag, due_date, created_at, updated_at
             FROM payments WHERE owner = ?1 ORDER BY due_date, id",
        )?;
        let mut payments = stmt
            .query_map(params![owner], Self::payment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for payment in &mut payments {
            payment.transactions = self.get_transactions_for_payment(payment.id)?;
        }
        Ok(payments)
    }

    /// Payments due in the calendar month of `date`.
    pub fn get_payments_by_month(&self, owner: &str, date: NaiveDate) -> Result<Vec<Payment>> {
        let prefix = format!("{}%", date.format("%Y-%m"));
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, title, amount, tag, due_date, created_at, updated_at
             FROM payments WHERE owner = ?1 AND due_date LIKE ?2 ORDER BY due_date, id",
        )?;
        let mut payments = stmt
            .query_map(params![owner, prefix], Self::payment_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        for payment in &mut payments {
            payment.transactions = self.get_transactions_for_payment(payment.id)?;
        }
        Ok(payments)
    }

    /// Update payment fields, then move or create the completing transaction:
    /// a `transaction_id` moves that transaction to the new amount/date; else
    /// a `completed_date` records a fresh completion.
    pub fn update_payment(&self, id: i64, update: &UpdatePayment) -> Result<Payment> {
        let now = Self::now();
        self.conn.execute(
            "UPDATE payments SET title = ?1, amount = ?2, tag = ?3, due_date = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                update.title,
                update.amount,
                update.tag,
                update.due_date,
                now,
                id
            ],
        )?;

        if let Some(transaction_id) = update.transaction_id {
            self.update_transaction(
                transaction_id,
                Some(&update.amount),
                update.completed_date.as_deref(),
            )?;
        } else if let Some(ref completed) = update.completed_date {
            self.insert_transaction(id, &update.amount, Some(completed))?;
        }

        self.get_payment(id)?
            .context("Payment not found after update")
    }

    /// Transactions are removed first so no orphan can survive the parent.
    pub fn delete_payment(&self, id: i64) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM transactions WHERE payment_id = ?1",
            params![id],
        )?;
        tx.execute("DELETE FROM payments WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    // --- Transactions ---

    pub fn get_transactions_for_payment(&self, payment_id: i64) -> Result<Vec<Transaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, payment_id, amount, created_at, updated_at
             FROM transactions WHERE payment_id = ?1 ORDER BY id",
        )?;
        let transactions = stmt
            .query_map(params![payment_id], Self::transaction_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(transactions)
    }

    pub fn get_transaction(&self, id: i64) -> Result<Option<Transaction>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, payment_id, amount, created_at, updated_at
                 FROM transactions WHERE id = ?1",
                params![id],
                Self::transaction_from_row,
            )
            .optional()?)
    }

    pub fn insert_transaction(
        &self,
        payment_id: i64,
        amount: &str,
        created_at: Option<&str>,
    ) -> Result<Transaction> {
        let now = Self::now();
        let created_at = created_at.unwrap_or(&now);
        self.conn.execute(
            "INSERT INTO transactions (payment_id, amount, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![payment_id, amount, created_at, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_transaction(id)?
            .context("Transaction not found after insert")
    }

    pub fn update_transaction(
        &self,
        id: i64,
        amount: Option<&str>,
        created_at: Option<&str>,
    ) -> Result<Transaction> {
        let now = Self::now();
        if let Some(amount) = amount {
            self.conn.execute(
                "UPDATE transactions SET amount = ?1, updated_at = ?2 WHERE id = ?3",
                params![amount, now, id],
            )?;
        }
        if let Some(created_at) = created_at {
            self.conn.execute(
                "UPDATE transactions SET created_at = ?1, updated_at = ?2 WHERE id = ?3",
                params![created_at, now, id],
            )?;
        }
        self.get_transaction(id)?
            .context("Transaction not found after update")
    }

    pub fn delete_transaction(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }
}
