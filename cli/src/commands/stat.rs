use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::service::TallyService;

use super::helpers::dash;

pub(crate) fn cmd_stat_add(
    svc: &TallyService,
    owner: &str,
    title: &str,
    unit: Option<String>,
    json: bool,
) -> Result<()> {
    let stat = svc.create_stat(owner, title, unit.as_deref())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stat)?);
    } else {
        println!("Created stat '{}' (id {})", stat.title, stat.id);
    }
    Ok(())
}

pub(crate) fn cmd_stat_all(svc: &TallyService, owner: &str, json: bool) -> Result<()> {
    let stats = svc.get_all_stats(owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else if stats.is_empty() {
        eprintln!("No stats yet. Use `tally stat add` to track one.");
    } else {
        #[derive(Tabled)]
        struct StatRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Title")]
            title: String,
            #[tabled(rename = "Unit")]
            unit: String,
            #[tabled(rename = "Latest")]
            latest: String,
            #[tabled(rename = "Entries")]
            entries: usize,
        }

        let rows: Vec<StatRow> = stats
            .iter()
            .map(|s| StatRow {
                id: s.id,
                title: s.title.clone(),
                unit: dash(s.unit.as_deref()),
                latest: s
                    .sets
                    .last()
                    .map_or_else(|| "-".to_string(), |set| set.value.clone()),
                entries: s.sets.len(),
            })
            .collect();

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Modify::new(Columns::new(4..)).with(Alignment::right()));
        println!("{table}");
    }
    Ok(())
}

pub(crate) fn cmd_stat_show(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    let stat = svc.get_stat(owner, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stat)?);
    } else {
        let unit = stat.unit.as_deref().unwrap_or("");
        println!("{} (id {})", stat.title, stat.id);
        for set in &stat.sets {
            println!("  {} {unit} (set {}, {})", set.value, set.id, set.created_at);
        }
        if stat.sets.is_empty() {
            eprintln!("  (no entries)");
        }
    }
    Ok(())
}

pub(crate) fn cmd_stat_log(
    svc: &TallyService,
    owner: &str,
    stat_id: i64,
    value: &str,
    json: bool,
) -> Result<()> {
    let set = svc.add_stat_set(owner, stat_id, value)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
    } else {
        println!("Logged {} (set {})", set.value, set.id);
    }
    Ok(())
}

pub(crate) fn cmd_stat_edit_set(
    svc: &TallyService,
    owner: &str,
    id: i64,
    value: &str,
    json: bool,
) -> Result<()> {
    let set = svc.update_stat_set(owner, id, value)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&set)?);
    } else {
        println!("Set {} is now {}", set.id, set.value);
    }
    Ok(())
}

pub(crate) fn cmd_stat_delete_set(
    svc: &TallyService,
    owner: &str,
    id: i64,
    json: bool,
) -> Result<()> {
    svc.delete_stat_set(owner, id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted set {id}");
    }
    Ok(())
}

pub(crate) fn cmd_stat_delete(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    svc.delete_stat(owner, id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted stat {id}");
    }
    Ok(())
}
