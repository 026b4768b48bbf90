use anyhow::{Result, bail};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::models::{ListItemInput, NewList, NewListItem};
use tally_core::service::TallyService;

use super::helpers::dash;

pub(crate) fn cmd_list_add(
    svc: &TallyService,
    owner: &str,
    name: &str,
    title: Option<String>,
    items: Vec<String>,
    json: bool,
) -> Result<()> {
    let list = svc.create_list(
        owner,
        &NewList {
            name: name.to_string(),
            title,
            items: items.into_iter().map(|name| NewListItem { name }).collect(),
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        println!("Created list '{}' (id {})", list.name, list.id);
        for item in &list.items {
            println!("  [ ] {}", item.name);
        }
    }
    Ok(())
}

pub(crate) fn cmd_list_show(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    let list = svc.get_list(owner, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&list)?);
    } else {
        println!("{} (id {})", list.name, list.id);
        if let Some(ref title) = list.title {
            println!("  {title}");
        }
        if list.items.is_empty() {
            eprintln!("  (no items)");
        }
        for item in &list.items {
            let mark = if item.checked { "x" } else { " " };
            println!("  [{mark}] {} (item {})", item.name, item.id);
        }
    }
    Ok(())
}

pub(crate) fn cmd_list_all(svc: &TallyService, owner: &str, json: bool) -> Result<()> {
    let lists = svc.get_all_lists(owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lists)?);
    } else if lists.is_empty() {
        eprintln!("No lists yet. Use `tally list add` to create one.");
    } else {
        #[derive(Tabled)]
        struct ListRow {
            #[tabled(rename = "ID")]
            id: i64,
            #[tabled(rename = "Name")]
            name: String,
            #[tabled(rename = "Title")]
            title: String,
            #[tabled(rename = "Items")]
            items: usize,
            #[tabled(rename = "Done")]
            done: usize,
        }

        let rows: Vec<ListRow> = lists
            .iter()
            .map(|l| ListRow {
                id: l.id,
                name: l.name.clone(),
                title: dash(l.title.as_deref()),
                items: l.items.len(),
                done: l.items.iter().filter(|i| i.checked).count(),
            })
            .collect();

        let mut table = Table::new(rows);
        table
            .with(Style::rounded())
            .with(Modify::new(Columns::new(3..)).with(Alignment::right()));
        println!("{table}");
    }
    Ok(())
}

/// Toggle one item by resubmitting the list's complete item state.
pub(crate) fn cmd_list_check(
    svc: &TallyService,
    owner: &str,
    item_id: i64,
    json: bool,
) -> Result<()> {
    let lists = svc.get_all_lists(owner)?;
    let Some(list) = lists.iter().find(|l| l.items.iter().any(|i| i.id == item_id)) else {
        bail!("No list item with id {item_id}");
    };

    let items: Vec<ListItemInput> = list
        .items
        .iter()
        .map(|i| ListItemInput {
            id: Some(i.id),
            name: i.name.clone(),
            checked: if i.id == item_id { !i.checked } else { i.checked },
        })
        .collect();
    let updated = svc.update_list(owner, list.id, &list.name, list.title.as_deref(), items)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else {
        let item = updated
            .items
            .iter()
            .find(|i| i.id == item_id)
            .map_or("?", |i| if i.checked { "checked" } else { "unchecked" });
        println!("Item {item_id} {item}");
    }
    Ok(())
}

pub(crate) fn cmd_list_clear(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    let removed = svc.delete_items_for_list(owner, id)?;
    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!("Removed {removed} item(s)");
    }
    Ok(())
}

pub(crate) fn cmd_list_delete(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    svc.delete_list(owner, id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted list {id}");
    }
    Ok(())
}
