use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

// --- Lists ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub id: i64,
    pub owner: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub items: Vec<ListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItem {
    pub id: i64,
    pub list_id: i64,
    pub name: String,
    pub checked: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewList {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub items: Vec<NewListItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewListItem {
    pub name: String,
}

/// Full desired state of one list item, as submitted by a client.
/// `id: None` (or an id the list doesn't own) means "create".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItemInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub checked: bool,
}

// --- Workouts ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workout_id: Option<i64>,
    pub owner: String,
    pub title: String,
    /// Derived: largest numeric weight observed across this exercise's sets.
    pub max_weight: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_weight_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub sets: Vec<ExerciseSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseSet {
    pub id: i64,
    pub exercise_id: i64,
    pub rep: String,
    pub weight: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub title: String,
    /// `None` leaves the exercise's sets untouched; `Some` is the complete
    /// desired state (within the date window, when one is supplied).
    #[serde(default)]
    pub sets: Option<Vec<SetInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub rep: String,
    pub weight: String,
}

// --- Stats ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stat {
    pub id: i64,
    pub owner: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub sets: Vec<StatSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSet {
    pub id: i64,
    pub stat_id: i64,
    pub value: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatSetInput {
    #[serde(default)]
    pub id: Option<i64>,
    pub value: String,
}

// --- Recurring payments ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub owner: String,
    pub title: String,
    pub amount: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub due_date: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub payment_id: i64,
    pub amount: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPayment {
    pub title: String,
    pub amount: String,
    pub due_date: String,
    #[serde(default)]
    pub tag: Option<String>,
    /// When present, a completing transaction is created alongside the payment.
    #[serde(default)]
    pub completed_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePayment {
    pub title: String,
    pub amount: String,
    pub due_date: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub completed_date: Option<String>,
    /// An existing transaction to move to `completed_date`; when absent and
    /// `completed_date` is set, a new transaction is created instead.
    #[serde(default)]
    pub transaction_id: Option<i64>,
}

// --- Validation ---

pub const LIST_STATUS_NONE: &str = "none";
pub const LIST_STATUS_UPDATED: &str = "updated";

pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        bail!("Title must not be empty");
    }
    Ok(())
}

pub fn validate_list_item_input(item: &ListItemInput) -> Result<()> {
    if item.name.trim().is_empty() {
        bail!("List item name must not be empty");
    }
    Ok(())
}

pub fn validate_set_input(set: &SetInput) -> Result<()> {
    if set.rep.trim().is_empty() {
        bail!("Set rep must not be empty");
    }
    if set.weight.trim().is_empty() {
        bail!("Set weight must not be empty");
    }
    Ok(())
}

pub fn validate_stat_set_input(set: &StatSetInput) -> Result<()> {
    if set.value.trim().is_empty() {
        bail!("Stat value must not be empty");
    }
    Ok(())
}

pub fn validate_amount(amount: &str) -> Result<()> {
    if amount.trim().is_empty() {
        bail!("Amount must not be empty");
    }
    if amount.trim().parse::<f64>().is_err() {
        bail!("Amount '{amount}' is not a number");
    }
    Ok(())
}
