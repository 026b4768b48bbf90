mod helpers;
mod list;
mod payment;
mod stat;
mod workout;

pub(crate) use list::{
    cmd_list_add, cmd_list_all, cmd_list_check, cmd_list_clear, cmd_list_delete, cmd_list_show,
};
pub(crate) use payment::{
    cmd_payment_add, cmd_payment_all, cmd_payment_delete, cmd_payment_month, cmd_payment_pay,
    cmd_payment_show,
};
pub(crate) use stat::{
    cmd_stat_add, cmd_stat_all, cmd_stat_delete, cmd_stat_delete_set, cmd_stat_edit_set,
    cmd_stat_log, cmd_stat_show,
};
pub(crate) use workout::{
    cmd_exercise_show, cmd_set_add, cmd_set_delete, cmd_set_edit, cmd_workout_all,
    cmd_workout_create, cmd_workout_day, cmd_workout_delete, cmd_workout_log, cmd_workout_show,
};
