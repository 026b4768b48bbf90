use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;

use crate::db::Database;
use crate::error::ServiceError;
use crate::models::{
    self, Exercise, ExerciseInput, ExerciseSet, List, ListItemInput, NewList, NewPayment, Payment,
    Stat, StatSet, StatSetInput, Transaction, UpdatePayment, Workout,
};
use crate::reconcile::DayWindow;

/// Owner-scoped operations over the store. Every mutation checks that the
/// target row belongs to the caller before touching it: a row owned by
/// someone else is `Unauthorized`, a missing row is `NotFound`, bad input is
/// `Validation`. All three travel inside `anyhow::Error` and are downcast at
/// the API boundary.
pub struct TallyService {
    db: Database,
}

impl TallyService {
    pub fn new(db_path: &str) -> Result<Self> {
        let db = Database::open(Path::new(db_path))?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    fn validate_title(title: &str) -> Result<()> {
        models::validate_title(title).map_err(|e| ServiceError::validation(e.to_string()).into())
    }

    fn parse_date(date: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| ServiceError::validation(format!("Invalid date '{date}'")).into())
    }

    fn check_owner(owner: &str, row_owner: &str, what: &str) -> Result<()> {
        if owner != row_owner {
            return Err(ServiceError::unauthorized(format!("{what} belongs to another owner")).into());
        }
        Ok(())
    }

    // --- Lists ---

    pub fn create_list(&self, owner: &str, list: &NewList) -> Result<List> {
        Self::validate_title(&list.name)?;
        for item in &list.items {
            if item.name.trim().is_empty() {
                return Err(ServiceError::validation("List item name must not be empty").into());
            }
        }
        self.db.insert_list(owner, list)
    }

    pub fn get_list(&self, owner: &str, id: i64) -> Result<List> {
        let list = self
            .db
            .get_list(id)?
            .ok_or_else(|| ServiceError::not_found("List not found"))?;
        Self::check_owner(owner, &list.owner, "List")?;
        Ok(list)
    }

    pub fn get_all_lists(&self, owner: &str) -> Result<Vec<List>> {
        self.db.get_all_lists(owner)
    }

    pub fn update_list(
        &self,
        owner: &str,
        id: i64,
        name: &str,
        title: Option<&str>,
        items: Vec<ListItemInput>,
    ) -> Result<List> {
        Self::validate_title(name)?;
        for item in &items {
            models::validate_list_item_input(item)
                .map_err(|e| ServiceError::validation(e.to_string()))?;
        }
        self.get_list(owner, id)?;
        self.db.update_list(id, name, title, items)
    }

    pub fn delete_list(&self, owner: &str, id: i64) -> Result<()> {
        self.get_list(owner, id)?;
        self.db.delete_list(id)
    }

    pub fn delete_item(&self, owner: &str, id: i64) -> Result<()> {
        let item = self
            .db
            .get_item(id)?
            .ok_or_else(|| ServiceError::not_found("List item not found"))?;
        self.get_list(owner, item.list_id)?;
        self.db.delete_item(id)?;
        Ok(())
    }

    pub fn delete_items_for_list(&self, owner: &str, list_id: i64) -> Result<usize> {
        self.get_list(owner, list_id)?;
        self.db.delete_items_for_list(list_id)
    }

    // --- Workouts ---

    pub fn create_workout(
        &self,
        owner: &str,
        title: &str,
        exercise_titles: &[String],
    ) -> Result<Workout> {
        Self::validate_title(title)?;
        for exercise_title in exercise_titles {
            Self::validate_title(exercise_title)?;
        }
        self.db.insert_workout(owner, title, exercise_titles)
    }

    pub fn get_workout(&self, owner: &str, id: i64) -> Result<Workout> {
        let workout = self
            .db
            .get_workout(id)?
            .ok_or_else(|| ServiceError::not_found("Workout not found"))?;
        Self::check_owner(owner, &workout.owner, "Workout")?;
        Ok(workout)
    }

    pub fn get_all_workouts(&self, owner: &str) -> Result<Vec<Workout>> {
        self.db.get_all_workouts(owner)
    }

    /// Workouts for the day, each exercise's sets narrowed to that day.
    pub fn get_workouts_by_date(&self, owner: &str, date: &str) -> Result<Vec<Workout>> {
        let date = Self::parse_date(date)?;
        self.db.get_workouts_by_date(owner, date)
    }

    /// Reconcile a workout against a submitted complete state. With a `date`,
    /// per-exercise set diffs are scoped to that day; sets from other days
    /// are untouched.
    pub fn update_workout(
        &self,
        owner: &str,
        id: i64,
        title: &str,
        exercises: Vec<ExerciseInput>,
        date: Option<&str>,
    ) -> Result<Workout> {
        Self::validate_title(title)?;
        for exercise in &exercises {
            Self::validate_title(&exercise.title)?;
            for set in exercise.sets.iter().flatten() {
                models::validate_set_input(set)
                    .map_err(|e| ServiceError::validation(e.to_string()))?;
            }
        }
        self.get_workout(owner, id)?;
        let window = date.map(Self::parse_date).transpose()?.map(DayWindow::for_date);
        self.db.update_workout(id, title, exercises, window)
    }

    pub fn delete_workout(&self, owner: &str, id: i64) -> Result<()> {
        self.get_workout(owner, id)?;
        self.db.delete_workout(id)
    }

    // --- Exercises and sets ---

    pub fn get_exercise(&self, owner: &str, id: i64) -> Result<Exercise> {
        let exercise = self
            .db
            .get_exercise(id)?
            .ok_or_else(|| ServiceError::not_found("Exercise not found"))?;
        Self::check_owner(owner, &exercise.owner, "Exercise")?;
        Ok(exercise)
    }

    pub fn add_set_to_exercise(
        &self,
        owner: &str,
        exercise_id: i64,
        rep: &str,
        weight: &str,
        date: Option<&str>,
    ) -> Result<ExerciseSet> {
        let set = models::SetInput {
            id: None,
            rep: rep.to_string(),
            weight: weight.to_string(),
        };
        models::validate_set_input(&set).map_err(|e| ServiceError::validation(e.to_string()))?;
        self.get_exercise(owner, exercise_id)?;
        let created_at = date
            .map(Self::parse_date)
            .transpose()?
            .map(|d| DayWindow::for_date(d).start_rfc3339());
        self.db
            .insert_exercise_set(exercise_id, rep, weight, created_at.as_deref())
    }

    pub fn update_set(&self, owner: &str, id: i64, rep: &str, weight: &str) -> Result<ExerciseSet> {
        let input = models::SetInput {
            id: Some(id),
            rep: rep.to_string(),
            weight: weight.to_string(),
        };
        models::validate_set_input(&input).map_err(|e| ServiceError::validation(e.to_string()))?;
        let set = self
            .db
            .get_exercise_set(id)?
            .ok_or_else(|| ServiceError::not_found("Set not found"))?;
        self.get_exercise(owner, set.exercise_id)?;
        self.db.update_exercise_set(id, rep, weight)
    }

    pub fn delete_set(&self, owner: &str, id: i64) -> Result<()> {
        let set = self
            .db
            .get_exercise_set(id)?
            .ok_or_else(|| ServiceError::not_found("Set not found"))?;
        self.get_exercise(owner, set.exercise_id)?;
        self.db.delete_exercise_set(id)?;
        Ok(())
    }

    // --- Stats ---

    pub fn create_stat(&self, owner: &str, title: &str, unit: Option<&str>) -> Result<Stat> {
        Self::validate_title(title)?;
        self.db.insert_stat(owner, title, unit)
    }

    pub fn get_stat(&self, owner: &str, id: i64) -> Result<Stat> {
        let stat = self
            .db
            .get_stat(id)?
            .ok_or_else(|| ServiceError::not_found("Stat not found"))?;
        Self::check_owner(owner, &stat.owner, "Stat")?;
        Ok(stat)
    }

    pub fn get_all_stats(&self, owner: &str) -> Result<Vec<Stat>> {
        self.db.get_all_stats(owner)
    }

    pub fn update_stat(
        &self,
        owner: &str,
        id: i64,
        title: &str,
        unit: Option<&str>,
        sets: Vec<StatSetInput>,
    ) -> Result<Stat> {
        Self::validate_title(title)?;
        for set in &sets {
            models::validate_stat_set_input(set)
                .map_err(|e| ServiceError::validation(e.to_string()))?;
        }
        self.get_stat(owner, id)?;
        self.db.update_stat(id, title, unit, sets)
    }

    pub fn delete_stat(&self, owner: &str, id: i64) -> Result<()> {
        self.get_stat(owner, id)?;
        self.db.delete_stat(id)
    }

    pub fn add_stat_set(&self, owner: &str, stat_id: i64, value: &str) -> Result<StatSet> {
        let input = StatSetInput {
            id: None,
            value: value.to_string(),
        };
        models::validate_stat_set_input(&input)
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        self.get_stat(owner, stat_id)?;
        self.db.insert_stat_set(stat_id, value, None)
    }

    pub fn update_stat_set(&self, owner: &str, id: i64, value: &str) -> Result<StatSet> {
        let input = StatSetInput {
            id: Some(id),
            value: value.to_string(),
        };
        models::validate_stat_set_input(&input)
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        let set = self
            .db
            .get_stat_set(id)?
            .ok_or_else(|| ServiceError::not_found("Stat set not found"))?;
        self.get_stat(owner, set.stat_id)?;
        self.db.update_stat_set(id, value)
    }

    pub fn delete_stat_set(&self, owner: &str, id: i64) -> Result<()> {
        let set = self
            .db
            .get_stat_set(id)?
            .ok_or_else(|| ServiceError::not_found("Stat set not found"))?;
        self.get_stat(owner, set.stat_id)?;
        self.db.delete_stat_set(id)?;
        Ok(())
    }

    // --- Payments ---

    pub fn create_payment(&self, owner: &str, payment: &NewPayment) -> Result<Payment> {
        Self::validate_title(&payment.title)?;
        models::validate_amount(&payment.amount)
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        Self::parse_date(&payment.due_date)?;
        if let Some(ref completed) = payment.completed_date {
            Self::parse_date(completed)?;
        }
        self.db.insert_payment(owner, payment)
    }

    pub fn get_payment(&self, owner: &str, id: i64) -> Result<Payment> {
        let payment = self
            .db
            .get_payment(id)?
            .ok_or_else(|| ServiceError::not_found("Payment not found"))?;
        Self::check_owner(owner, &payment.owner, "Payment")?;
        Ok(payment)
    }

    pub fn get_all_payments(&self, owner: &str) -> Result<Vec<Payment>> {
        self.db.get_all_payments(owner)
    }

    pub fn get_payments_by_month(&self, owner: &str, date: &str) -> Result<Vec<Payment>> {
        let date = Self::parse_date(date)?;
        self.db.get_payments_by_month(owner, date)
    }

    pub fn update_payment(&self, owner: &str, id: i64, update: &UpdatePayment) -> Result<Payment> {
        Self::validate_title(&update.title)?;
        models::validate_amount(&update.amount)
            .map_err(|e| ServiceError::validation(e.to_string()))?;
        Self::parse_date(&update.due_date)?;
        if let Some(ref completed) = update.completed_date {
            Self::parse_date(completed)?;
        }
        let payment = self.get_payment(owner, id)?;
        if let Some(transaction_id) = update.transaction_id {
            // The moved transaction must already hang off this payment.
            if !payment.transactions.iter().any(|t| t.id == transaction_id) {
                return Err(ServiceError::not_found("Transaction not found").into());
            }
        }
        self.db.update_payment(id, update)
    }

    pub fn delete_payment(&self, owner: &str, id: i64) -> Result<()> {
        self.get_payment(owner, id)?;
        self.db.delete_payment(id)
    }

    pub fn add_transaction_to_payment(
        &self,
        owner: &str,
        payment_id: i64,
        amount: &str,
        completed_date: &str,
    ) -> Result<Transaction> {
        models::validate_amount(amount).map_err(|e| ServiceError::validation(e.to_string()))?;
        Self::parse_date(completed_date)?;
        self.get_payment(owner, payment_id)?;
        self.db
            .insert_transaction(payment_id, amount, Some(completed_date))
    }

    pub fn update_transaction(
        &self,
        owner: &str,
        id: i64,
        amount: Option<&str>,
        completed_date: Option<&str>,
    ) -> Result<Transaction> {
        if let Some(amount) = amount {
            models::validate_amount(amount).map_err(|e| ServiceError::validation(e.to_string()))?;
        }
        if let Some(completed) = completed_date {
            Self::parse_date(completed)?;
        }
        let transaction = self
            .db
            .get_transaction(id)?
            .ok_or_else(|| ServiceError::not_found("Transaction not found"))?;
        self.get_payment(owner, transaction.payment_id)?;
        self.db.update_transaction(id, amount, completed_date)
    }

    pub fn delete_transaction(&self, owner: &str, id: i64) -> Result<()> {
        let transaction = self
            .db
            .get_transaction(id)?
            .ok_or_else(|| ServiceError::not_found("Transaction not found"))?;
        self.get_payment(owner, transaction.payment_id)?;
        self.db.delete_transaction(id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewListItem, SetInput};

    fn service() -> TallyService {
        TallyService::new_in_memory().unwrap()
    }

    fn is_kind(err: &anyhow::Error, check: fn(&ServiceError) -> bool) -> bool {
        err.downcast_ref::<ServiceError>().is_some_and(check)
    }

    #[test]
    fn test_owner_mismatch_is_unauthorized() {
        let svc = service();
        let list = svc
            .create_list(
                "alice",
                &NewList {
                    name: "Groceries".to_string(),
                    title: None,
                    items: vec![],
                },
            )
            .unwrap();

        let err = svc.delete_list("bob", list.id).unwrap_err();
        assert!(is_kind(&err, |e| matches!(e, ServiceError::Unauthorized(_))));
        // Still there for the owner.
        assert!(svc.get_list("alice", list.id).is_ok());
    }

    #[test]
    fn test_missing_row_is_not_found() {
        let svc = service();
        let err = svc.get_workout("alice", 999).unwrap_err();
        assert!(is_kind(&err, |e| matches!(e, ServiceError::NotFound(_))));
    }

    #[test]
    fn test_bad_input_is_validation() {
        let svc = service();
        let workout = svc.create_workout("alice", "Leg Day", &["Squat".to_string()]).unwrap();
        let err = svc
            .add_set_to_exercise("alice", workout.exercises[0].id, "", "50", None)
            .unwrap_err();
        assert!(is_kind(&err, |e| matches!(e, ServiceError::Validation(_))));

        let err = svc.get_workouts_by_date("alice", "June 15th").unwrap_err();
        assert!(is_kind(&err, |e| matches!(e, ServiceError::Validation(_))));
    }

    #[test]
    fn test_list_roundtrip_with_reconcile() {
        let svc = service();
        let list = svc
            .create_list(
                "alice",
                &NewList {
                    name: "Groceries".to_string(),
                    title: None,
                    items: vec![NewListItem {
                        name: "Milk".to_string(),
                    }],
                },
            )
            .unwrap();
        let milk = list.items[0].id;

        let updated = svc
            .update_list(
                "alice",
                list.id,
                "Groceries",
                None,
                vec![
                    ListItemInput {
                        id: Some(milk),
                        name: "Milk".to_string(),
                        checked: true,
                    },
                    ListItemInput {
                        id: None,
                        name: "Bread".to_string(),
                        checked: false,
                    },
                ],
            )
            .unwrap();
        assert_eq!(updated.items.len(), 2);
        assert_eq!(updated.status, "updated");
    }

    #[test]
    fn test_update_workout_scoped_to_date() {
        let svc = service();
        let workout = svc
            .create_workout("alice", "Leg Day", &["Squat".to_string()])
            .unwrap();
        let exercise_id = workout.exercises[0].id;
        svc.add_set_to_exercise("alice", exercise_id, "10", "40", Some("2024-06-01"))
            .unwrap();
        svc.add_set_to_exercise("alice", exercise_id, "10", "50", Some("2024-06-15"))
            .unwrap();

        // Submitting an empty set list for June 15 clears that day only.
        svc.update_workout(
            "alice",
            workout.id,
            "Leg Day",
            vec![ExerciseInput {
                id: Some(exercise_id),
                title: "Squat".to_string(),
                sets: Some(vec![]),
            }],
            Some("2024-06-15"),
        )
        .unwrap();

        let exercise = svc.get_exercise("alice", exercise_id).unwrap();
        assert_eq!(exercise.sets.len(), 1);
        assert_eq!(exercise.sets[0].weight, "40");
    }

    #[test]
    fn test_update_workout_rejects_invalid_set() {
        let svc = service();
        let workout = svc
            .create_workout("alice", "Leg Day", &["Squat".to_string()])
            .unwrap();
        let err = svc
            .update_workout(
                "alice",
                workout.id,
                "Leg Day",
                vec![ExerciseInput {
                    id: Some(workout.exercises[0].id),
                    title: "Squat".to_string(),
                    sets: Some(vec![SetInput {
                        id: None,
                        rep: "10".to_string(),
                        weight: String::new(),
                    }]),
                }],
                None,
            )
            .unwrap_err();
        assert!(is_kind(&err, |e| matches!(e, ServiceError::Validation(_))));
    }

    #[test]
    fn test_payment_move_rejects_foreign_transaction() {
        let svc = service();
        let p1 = svc
            .create_payment(
                "alice",
                &NewPayment {
                    title: "Rent".to_string(),
                    amount: "1200".to_string(),
                    due_date: "2024-06-01".to_string(),
                    tag: None,
                    completed_date: Some("2024-06-01".to_string()),
                },
            )
            .unwrap();
        let p2 = svc
            .create_payment(
                "alice",
                &NewPayment {
                    title: "Gym".to_string(),
                    amount: "30".to_string(),
                    due_date: "2024-06-10".to_string(),
                    tag: None,
                    completed_date: None,
                },
            )
            .unwrap();

        // A transaction hanging off p1 cannot be moved via p2.
        let err = svc
            .update_payment(
                "alice",
                p2.id,
                &UpdatePayment {
                    title: "Gym".to_string(),
                    amount: "30".to_string(),
                    due_date: "2024-06-10".to_string(),
                    tag: None,
                    completed_date: Some("2024-06-11".to_string()),
                    transaction_id: Some(p1.transactions[0].id),
                },
            )
            .unwrap_err();
        assert!(is_kind(&err, |e| matches!(e, ServiceError::NotFound(_))));
    }

    #[test]
    fn test_transaction_crud() {
        let svc = service();
        let payment = svc
            .create_payment(
                "alice",
                &NewPayment {
                    title: "Rent".to_string(),
                    amount: "1200".to_string(),
                    due_date: "2024-06-01".to_string(),
                    tag: None,
                    completed_date: None,
                },
            )
            .unwrap();

        let transaction = svc
            .add_transaction_to_payment("alice", payment.id, "1200", "2024-06-02")
            .unwrap();
        let moved = svc
            .update_transaction("alice", transaction.id, None, Some("2024-06-03"))
            .unwrap();
        assert_eq!(moved.created_at, "2024-06-03");

        svc.delete_transaction("alice", transaction.id).unwrap();
        let payment = svc.get_payment("alice", payment.id).unwrap();
        assert!(payment.transactions.is_empty());
    }

    #[test]
    fn test_stat_set_quick_ops() {
        let svc = service();
        let stat = svc.create_stat("alice", "Bodyweight", Some("kg")).unwrap();
        let set = svc.add_stat_set("alice", stat.id, "80").unwrap();
        let set = svc.update_stat_set("alice", set.id, "79.5").unwrap();
        assert_eq!(set.value, "79.5");
        svc.delete_stat_set("alice", set.id).unwrap();
        assert!(svc.get_stat("alice", stat.id).unwrap().sets.is_empty());
    }
}
