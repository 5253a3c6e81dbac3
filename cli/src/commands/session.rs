//! Interactive session: pick models, confirm, pull them, repeat.

use anyhow::Result;
use dialoguer::{Confirm, Input};
use modelpull_core::scheduler::FetchEvent;
use modelpull_core::system::{self, HttpProbe};
use modelpull_core::{
    filter, CatalogEntry, CatalogProvider, CatalogSource, Config, ConfirmedBatch, FetchQueue,
    FetchScheduler, FlowState, HtmlCatalog, LocalInventory, OllamaCli, SelectionFlow,
};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::hibernate;
use crate::interrupt::Interrupts;
use crate::render;

/// What the outer loop does after a cycle.
enum Next {
    Continue,
    Stop,
}

struct Session<'a> {
    config: &'a Config,
    entries: Vec<CatalogEntry>,
    descriptions: HashMap<String, String>,
    inventory: LocalInventory,
    ollama: OllamaCli,
    probe: HttpProbe,
    interrupts: Interrupts,
}

pub async fn execute(config: &Config, refresh: bool) -> Result<()> {
    let source = CatalogSource::new(&config.catalog.url, config.cache_file()?);
    let Some(html) = load_catalog(&source, refresh).await? else {
        println!("Quitting.");
        return Ok(());
    };

    let entries = HtmlCatalog.entries(&html)?;
    info!(models = entries.len(), "catalog loaded");

    let descriptions = entries
        .iter()
        .map(|e| (e.id.clone(), e.description.clone()))
        .collect();

    let mut session = Session {
        config,
        entries,
        descriptions,
        inventory: LocalInventory::default(),
        ollama: OllamaCli::new(&config.fetch.program),
        probe: HttpProbe::new(&config.connectivity.url, config.probe_timeout()),
        interrupts: Interrupts::install(),
    };

    render::clear_screen();
    loop {
        match session.cycle().await? {
            Next::Continue => continue,
            Next::Stop => break,
        }
    }

    Ok(())
}

/// Cached page, fresh download, or `None` when the user quits.
async fn load_catalog(source: &CatalogSource, refresh: bool) -> Result<Option<String>> {
    if refresh {
        return Ok(Some(source.fetch().await?));
    }

    if !source.has_cache() {
        println!("No local model list found. Downloading a new list...");
        return Ok(Some(source.fetch().await?));
    }

    println!("Local model list found.");
    loop {
        let choice = prompt(
            "Enter 'q' to quit, 'd' to download a new list, or press Enter to use the local list (default)",
        )?;
        match choice.to_lowercase().as_str() {
            "" => {
                println!("Using the local model list...");
                return Ok(Some(source.load_cached()?));
            }
            "d" => {
                println!("Fetching model list from {}...", source.url());
                let html = source.fetch().await?;
                println!("Web page saved to {}.", source.cache_path().display());
                return Ok(Some(html));
            }
            "q" => return Ok(None),
            _ => println!("{}", render::error("Invalid choice.")),
        }
    }
}

fn prompt(text: &str) -> Result<String> {
    let answer: String = Input::new()
        .with_prompt(text)
        .allow_empty(true)
        .interact_text()?;
    Ok(answer.trim().to_string())
}

impl Session<'_> {
    async fn cycle(&mut self) -> Result<Next> {
        // Pulls from the previous cycle show up in the listing.
        self.refresh_inventory().await;

        let Some(batch) = self.choose_batch()? else {
            return Ok(Next::Stop);
        };

        let hibernate = Confirm::new()
            .with_prompt("Do you want to hibernate after the downloads?")
            .default(true)
            .interact()?;

        self.fetch(batch).await;

        if hibernate {
            let outcome = hibernate::countdown(
                self.config.hibernate_countdown(),
                self.interrupts.arm(),
                system::hibernate(),
            )
            .await;
            self.interrupts.disarm();
            debug!(?outcome, "hibernate countdown done");
            outcome?;
        }

        let again = Confirm::new()
            .with_prompt("Download another batch?")
            .default(false)
            .interact()?;

        Ok(if again { Next::Continue } else { Next::Stop })
    }

    async fn refresh_inventory(&mut self) {
        self.inventory = self.ollama.inventory().await;
        debug!(local = self.inventory.len(), "local inventory loaded");
    }

    /// Drive the selection flow until a batch is confirmed. `None` means quit.
    fn choose_batch(&self) -> Result<Option<ConfirmedBatch>> {
        let mut flow = SelectionFlow::new();

        loop {
            match flow.state() {
                FlowState::Filtering => {
                    let keyword = prompt(
                        "Enter a keyword to filter models (Enter to show all, 'h' for help, 'q' to quit)",
                    )?;
                    match keyword.to_lowercase().as_str() {
                        "h" => {
                            render::print_help();
                            continue;
                        }
                        "q" => return Ok(None),
                        _ => {}
                    }

                    render::clear_screen();
                    let listing = filter(&self.entries, &keyword);
                    match flow.show(listing) {
                        Ok(listing) => render::print_listing(
                            listing,
                            &self.inventory,
                            self.config.session.columns,
                        ),
                        Err(e) => println!("\n{}\n", render::error(&e.to_string())),
                    }
                }
                FlowState::Listing => {
                    println!("\nTotal models found: {}", flow.listing().len());
                    flow.begin_selection()?;
                }
                FlowState::Selecting => {
                    let input = prompt(
                        "Enter the numbers of the models to download (comma-separated, 'all', or 0 to change the filter)",
                    )?;
                    if let Err(e) = flow.select(&input) {
                        println!("{}", render::error(&e.to_string()));
                    }
                }
                FlowState::Confirming => {
                    render::print_selection(flow.selected(), &self.descriptions);
                    let input = prompt(
                        "Start downloading? ('y'/Enter to confirm, 'r' to reselect, 'f' to change the filter)",
                    )?;
                    match flow.confirm(&input) {
                        Ok(Some(batch)) => return Ok(Some(batch)),
                        Ok(None) => {}
                        Err(e) => println!("{}", render::error(&e.to_string())),
                    }
                }
                FlowState::Fetching => flow.reset(),
            }
        }
    }

    async fn fetch(&self, batch: ConfirmedBatch) {
        let scheduler = FetchScheduler::new(&self.ollama, &self.probe, self.config.scheduler());
        let mut queue = FetchQueue::new(batch);

        let report = scheduler
            .run(&mut queue, &mut |event: &FetchEvent| render::fetch_event(event))
            .await;

        println!(
            "\nFinished: {} downloaded, {} skipped.",
            report.succeeded.len(),
            report.abandoned.len()
        );
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::time::Duration;

    /// Stand-in for `ollama` that prints `list.txt` next to itself.
    fn fake_ollama(dir: &Path) -> String {
        let script = dir.join("ollama");
        std::fs::write(&script, "#!/bin/sh\ncat \"$(dirname \"$0\")/list.txt\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn inventory_is_reread_between_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list.txt");
        std::fs::write(&list, "NAME ID\nllama3.1:8b 42182419e950\n").unwrap();

        let config = Config::default();
        let mut session = Session {
            config: &config,
            entries: Vec::new(),
            descriptions: HashMap::new(),
            inventory: LocalInventory::default(),
            ollama: OllamaCli::new(fake_ollama(dir.path())),
            probe: HttpProbe::new("http://127.0.0.1:9", Duration::from_millis(100)),
            interrupts: Interrupts::default(),
        };

        session.refresh_inventory().await;
        assert_eq!(session.inventory.len(), 1);

        // A batch finished and pulled another model.
        std::fs::write(&list, "NAME ID\nllama3.1:8b 42182419e950\nqwen2:0.5b 6f48b936a09f\n")
            .unwrap();
        session.refresh_inventory().await;

        assert_eq!(session.inventory.len(), 2);
        assert!(session.inventory.contains(&"qwen2:0.5b".parse().unwrap()));
    }
}
