use anyhow::Result;
use modelpull_core::Config;

pub async fn execute(key: Option<&str>, value: Option<&str>) -> Result<()> {
    let mut config = Config::load()?;

    match (key, value) {
        // Show all config
        (None, None) => {
            println!("Configuration file: {:?}\n", Config::config_path()?);
            println!("[catalog]");
            println!("  url = \"{}\"", config.catalog.url);
            println!("  cache_file = {:?}", config.cache_file()?.display().to_string());
            println!();
            println!("[fetch]");
            println!("  program = \"{}\"", config.fetch.program);
            println!("  retry_threshold = {}", config.fetch.retry_threshold);
            println!("  backoff_secs = {}", config.fetch.backoff_secs);
            println!(
                "  max_total_attempts = {}",
                config
                    .fetch
                    .max_total_attempts
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "(unlimited)".to_string())
            );
            println!();
            println!("[connectivity]");
            println!("  url = \"{}\"", config.connectivity.url);
            println!("  poll_secs = {}", config.connectivity.poll_secs);
            println!("  timeout_secs = {}", config.connectivity.timeout_secs);
            println!();
            println!("[session]");
            println!(
                "  hibernate_countdown_secs = {}",
                config.session.hibernate_countdown_secs
            );
            println!("  columns = {}", config.session.columns);
        }

        // Get a specific key
        (Some(key), None) => {
            let value = get_config_value(&config, key)?;
            println!("{}", value);
        }

        // Set a specific key
        (Some(key), Some(value)) => {
            set_config_value(&mut config, key, value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }

        _ => unreachable!(),
    }

    Ok(())
}

fn get_config_value(config: &Config, key: &str) -> Result<String> {
    match key {
        "catalog.url" => Ok(config.catalog.url.clone()),
        "catalog.cache_file" => Ok(config.cache_file()?.display().to_string()),
        "fetch.program" => Ok(config.fetch.program.clone()),
        "fetch.retry_threshold" => Ok(config.fetch.retry_threshold.to_string()),
        "fetch.backoff_secs" => Ok(config.fetch.backoff_secs.to_string()),
        "fetch.max_total_attempts" => Ok(config
            .fetch
            .max_total_attempts
            .map(|n| n.to_string())
            .unwrap_or_default()),
        "connectivity.url" => Ok(config.connectivity.url.clone()),
        "connectivity.poll_secs" => Ok(config.connectivity.poll_secs.to_string()),
        "connectivity.timeout_secs" => Ok(config.connectivity.timeout_secs.to_string()),
        "session.hibernate_countdown_secs" => {
            Ok(config.session.hibernate_countdown_secs.to_string())
        }
        "session.columns" => Ok(config.session.columns.to_string()),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
}

fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "catalog.url" => config.catalog.url = value.to_string(),
        "catalog.cache_file" => {
            config.catalog.cache_file = if value.is_empty() {
                None
            } else {
                Some(value.into())
            }
        }
        "fetch.program" => config.fetch.program = value.to_string(),
        "fetch.retry_threshold" => config.fetch.retry_threshold = value.parse()?,
        "fetch.backoff_secs" => config.fetch.backoff_secs = value.parse()?,
        "fetch.max_total_attempts" => {
            config.fetch.max_total_attempts = if value.is_empty() {
                None
            } else {
                Some(value.parse()?)
            }
        }
        "connectivity.url" => config.connectivity.url = value.to_string(),
        "connectivity.poll_secs" => config.connectivity.poll_secs = value.parse()?,
        "connectivity.timeout_secs" => config.connectivity.timeout_secs = value.parse()?,
        "session.hibernate_countdown_secs" => {
            config.session.hibernate_countdown_secs = value.parse()?
        }
        "session.columns" => config.session.columns = value.parse::<usize>()?.max(1),
        _ => anyhow::bail!("Unknown config key: {}", key),
    }
    Ok(())
}
