use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use tally_core::models::{NewPayment, Payment};
use tally_core::service::TallyService;

use super::helpers::{dash, parse_date};

pub(crate) fn cmd_payment_add(
    svc: &TallyService,
    owner: &str,
    title: &str,
    amount: &str,
    due: &str,
    tag: Option<String>,
    paid_on: Option<String>,
    json: bool,
) -> Result<()> {
    let due_date = parse_date(Some(due.to_string()))?;
    let completed_date = match paid_on {
        Some(d) => Some(parse_date(Some(d))?),
        None => None,
    };
    let payment = svc.create_payment(
        owner,
        &NewPayment {
            title: title.to_string(),
            amount: amount.to_string(),
            due_date,
            tag,
            completed_date,
        },
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payment)?);
    } else {
        println!(
            "Created payment '{}' (id {}), {} due {}",
            payment.title, payment.id, payment.amount, payment.due_date
        );
        if !payment.transactions.is_empty() {
            println!("  Paid on {}", payment.transactions[0].created_at);
        }
    }
    Ok(())
}

fn print_payment_table(payments: &[Payment]) {
    #[derive(Tabled)]
    struct PaymentRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Amount")]
        amount: String,
        #[tabled(rename = "Due")]
        due: String,
        #[tabled(rename = "Tag")]
        tag: String,
        #[tabled(rename = "Paid")]
        paid: String,
    }

    let rows: Vec<PaymentRow> = payments
        .iter()
        .map(|p| PaymentRow {
            id: p.id,
            title: p.title.clone(),
            amount: p.amount.clone(),
            due: p.due_date.clone(),
            tag: dash(p.tag.as_deref()),
            paid: p
                .transactions
                .last()
                .map_or_else(|| "-".to_string(), |t| t.created_at.clone()),
        })
        .collect();

    let mut table = Table::new(rows);
    table
        .with(Style::rounded())
        .with(Modify::new(Columns::single(2)).with(Alignment::right()));
    println!("{table}");
}

pub(crate) fn cmd_payment_all(svc: &TallyService, owner: &str, json: bool) -> Result<()> {
    let payments = svc.get_all_payments(owner)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payments)?);
    } else if payments.is_empty() {
        eprintln!("No payments yet. Use `tally payment add` to track one.");
    } else {
        print_payment_table(&payments);
    }
    Ok(())
}

pub(crate) fn cmd_payment_month(
    svc: &TallyService,
    owner: &str,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let payments = svc.get_payments_by_month(owner, &date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payments)?);
    } else if payments.is_empty() {
        eprintln!("Nothing due in the month of {date}.");
    } else {
        print_payment_table(&payments);
    }
    Ok(())
}

pub(crate) fn cmd_payment_show(svc: &TallyService, owner: &str, id: i64, json: bool) -> Result<()> {
    let payment = svc.get_payment(owner, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payment)?);
    } else {
        println!(
            "{} (id {}), {} due {}",
            payment.title, payment.id, payment.amount, payment.due_date
        );
        if let Some(ref tag) = payment.tag {
            println!("  Tag: {tag}");
        }
        for transaction in &payment.transactions {
            println!(
                "  Paid {} on {} (transaction {})",
                transaction.amount, transaction.created_at, transaction.id
            );
        }
    }
    Ok(())
}

/// Record a completing transaction. The amount defaults to what the payment
/// asks for.
pub(crate) fn cmd_payment_pay(
    svc: &TallyService,
    owner: &str,
    id: i64,
    amount: Option<String>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let amount = match amount {
        Some(a) => a,
        None => svc.get_payment(owner, id)?.amount,
    };
    let transaction = svc.add_transaction_to_payment(owner, id, &amount, &date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&transaction)?);
    } else {
        println!(
            "Paid {} on {} (transaction {})",
            transaction.amount, transaction.created_at, transaction.id
        );
    }
    Ok(())
}

pub(crate) fn cmd_payment_delete(
    svc: &TallyService,
    owner: &str,
    id: i64,
    json: bool,
) -> Result<()> {
    svc.delete_payment(owner, id)?;
    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted payment {id} and its transactions");
    }
    Ok(())
}
