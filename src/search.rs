use anyhow::Result;

use crate::config::Config;
use crate::list::print_table;
use crate::store::ToolStore;

pub async fn run_search(config: &Config, query: &str, json: bool) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let store = ToolStore::open(config).await?;
    let results = store.search(query).await;
    store.close().await;
    let results = results?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    print_table(&results);
    Ok(())
}
