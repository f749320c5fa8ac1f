use crate::error::CliError;
use bigdecimal::BigDecimal;
use model::records::{page::Page, user::UserRecord};

pub fn print_record(record: &UserRecord, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", record.to_json()?);
    } else {
        println!("{record}");
    }
    Ok(())
}

pub fn print_page(page: &Page, as_json: bool) -> Result<(), CliError> {
    if as_json {
        println!("{}", serde_json::to_string(page)?);
        return Ok(());
    }

    println!(
        "-- page at offset {} ({} records, {}ms)",
        page.offset,
        page.len(),
        page.took_ms
    );
    for record in &page.records {
        println!("{record}");
    }
    Ok(())
}

/// Averages print with two decimals; an empty source prints 0.
pub fn format_average(average: Option<BigDecimal>) -> String {
    average
        .map(|avg| avg.round(2).to_string())
        .unwrap_or_else(|| "0".to_string())
}
