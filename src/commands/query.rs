use std::path::Path;

use anyhow::{Context, Result};
use bookshelf_pipeline::query::{format_count, load_catalog, parse_query, run_query, SortMode};

pub fn execute(input: &Path, sort: SortMode, limit: usize, query: &str) -> Result<()> {
    let conditions = parse_query(query)?;
    let records = load_catalog(input)
        .with_context(|| format!("cannot load catalog {}", input.display()))?;

    let matched = run_query(records, &conditions, sort);
    println!("{} books", matched.len());
    for record in matched.iter().take(limit) {
        let link = record.url.as_deref().unwrap_or("");
        println!(
            "{:>4.1}  {:>8}  {}  {}",
            record.rating,
            format_count(record.count),
            record.title,
            link
        );
    }
    Ok(())
}
