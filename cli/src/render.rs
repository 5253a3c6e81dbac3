//! Terminal output for the interactive session.

use console::{measure_text_width, pad_str, style, Alignment, Style, Term};
use modelpull_core::{ColorTag, FetchEvent, ListingItem, LocalInventory};
use std::collections::HashMap;

/// Per-model colors, handed out by the filter in order of appearance.
fn palette(tag: ColorTag) -> Style {
    match tag.0 % modelpull_core::filter::PALETTE_SIZE {
        0 => Style::new().green(),
        1 => Style::new().green().bright(),
        2 => Style::new().cyan().bright(),
        3 => Style::new().magenta().bright(),
        4 => Style::new().blue().bright(),
        5 => Style::new().red().bright(),
        6 => Style::new().magenta(),
        7 => Style::new().blue(),
        8 => Style::new().magenta().bright().bold(),
        _ => Style::new().cyan(),
    }
}

pub fn error(message: &str) -> String {
    style(message).red().bright().to_string()
}

pub fn clear_screen() {
    let _ = Term::stdout().clear_screen();
}

pub fn wait_for_enter(prompt: &str) {
    eprintln!("{}", prompt);
    let _ = Term::stderr().read_line();
}

/// Lay cells out top-to-bottom, then left-to-right.
fn columns(cells: &[String], columns: usize) -> Vec<String> {
    if cells.is_empty() {
        return Vec::new();
    }

    let columns = columns.max(1);
    let width = cells.iter().map(|c| measure_text_width(c)).max().unwrap_or(0) + 5;
    let rows = cells.len().div_ceil(columns);

    (0..rows)
        .map(|row| {
            let line: String = (0..columns)
                .filter_map(|col| cells.get(row + col * rows))
                .map(|cell| pad_str(cell, width, Alignment::Left, None).into_owned())
                .collect();
            line.trim_end().to_string()
        })
        .collect()
}

pub fn listing_lines(
    listing: &[ListingItem],
    inventory: &LocalInventory,
    column_count: usize,
) -> Vec<String> {
    let cells: Vec<String> = listing
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let number = format!("{:>3}.", index + 1);
            let number = if inventory.contains(&item.key) {
                style(number).yellow().bright().to_string()
            } else {
                number
            };
            format!(
                "{} {}:{}",
                number,
                palette(item.color).apply_to(item.key.id()),
                item.key.variant()
            )
        })
        .collect();

    columns(&cells, column_count)
}

pub fn print_listing(listing: &[ListingItem], inventory: &LocalInventory, column_count: usize) {
    println!("Available models:");
    println!("Total number of models: {}\n", listing.len());
    for line in listing_lines(listing, inventory, column_count) {
        println!("{}", line);
    }
    if !inventory.is_empty() {
        println!(
            "\n{} Models with a {} are already available locally.",
            style("Note:").yellow().bright(),
            style("yellow number").yellow().bright()
        );
    }
}

pub fn print_selection(selected: &[ListingItem], descriptions: &HashMap<String, String>) {
    println!("Selected models for download:");
    for item in selected {
        let description = descriptions
            .get(item.key.id())
            .map(String::as_str)
            .unwrap_or_default();
        println!(
            "  {:<30} {}",
            style(item.key.to_string()).green().bright(),
            style(description).dim()
        );
    }
}

pub fn print_help() {
    println!();
    println!("{}", style("[HELP]").green().bright());
    println!("{}", style("Filtering Models:").blue().bright());
    println!("  - Enter a keyword to filter models by any part of model:size (e.g. 'llama', ':8b').");
    println!("  - Compare sizes with <, <=, >, >= or = and a k/m/b unit (e.g. '>=8b', '<500m').");
    println!("  - Press Enter to show all models, or 'q' to quit.");
    println!();
    println!("{}", style("Selecting Models:").blue().bright());
    println!("  - Enter the numbers of the models to download, separated by commas.");
    println!("  - Enter 'all' to download every listed model.");
    println!("  - Enter 0 (or nothing) to change the filter and search again.");
    println!();
    println!("{}", style("Confirming:").blue().bright());
    println!("  - 'y' or Enter starts the download, 'r' reselects, 'f' changes the filter.");
    println!();
    println!("{}", style("Post-Download Options:").blue().bright());
    println!("  - Use 'Y' or 'N' to decide whether to hibernate after the downloads.");
    println!("  - Press Ctrl+C to cancel hibernation if it was selected.");
    println!();
}

pub fn fetch_event(event: &FetchEvent) {
    match event {
        FetchEvent::Started {
            key,
            current,
            total,
            attempt,
        } => {
            println!(
                "Downloading {} ({}/{}), Attempt: {}",
                style(key).green().bright(),
                current,
                total,
                attempt
            );
        }
        FetchEvent::Succeeded {
            key,
            attempts,
            details,
        } => {
            println!(
                "Command succeeded for {} after {} attempt(s).",
                style(key).green().bright(),
                attempts
            );
            println!("\nModel details:");
            match details {
                Some(details) => println!("{}", style(details).dim()),
                None => println!("Failed to show model details."),
            }
        }
        FetchEvent::Failed { key, failures } => {
            println!("\nCommand failed for {} ({} failure(s)).", key, failures);
        }
        FetchEvent::ConnectivityLost { key } => {
            println!(
                "{}",
                error(&format!(
                    "Network appears to be down. Waiting for it to come back before retrying {}...",
                    key
                ))
            );
        }
        FetchEvent::ConnectivityRestored { polls } => {
            println!("Network is back after {} check(s). Resuming.", polls);
        }
        FetchEvent::Retrying { delay, .. } => {
            println!("Retrying in {} seconds...", delay.as_secs());
        }
        FetchEvent::Requeued { key, delay } => {
            println!(
                "Moving {} to the back of the queue. Continuing in {} seconds...",
                key,
                delay.as_secs()
            );
        }
        FetchEvent::Abandoned { key, failures } => {
            println!(
                "{}",
                error(&format!(
                    "Max attempts reached for {} after {} failure(s). Skipping.",
                    key, failures
                ))
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modelpull_core::CompositeKey;

    fn item(id: &str, variant: &str) -> ListingItem {
        ListingItem {
            key: CompositeKey::new(id, variant),
            color: ColorTag(0),
        }
    }

    #[test]
    fn listing_is_numbered_column_major() {
        console::set_colors_enabled(false);
        let listing: Vec<_> = (1..=5).map(|i| item(&format!("m{i}"), "1b")).collect();
        let lines = listing_lines(&listing, &LocalInventory::default(), 2);

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("  1. m1:1b"));
        assert!(lines[0].contains("  4. m4:1b"));
        assert!(lines[2].starts_with("  3. m3:1b"));
        assert!(!lines[2].contains("6."));
    }

    #[test]
    fn empty_listing_renders_nothing() {
        assert!(listing_lines(&[], &LocalInventory::default(), 4).is_empty());
    }
}
