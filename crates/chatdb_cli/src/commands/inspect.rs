//! Inspect command implementation.

use chatdb_chat::ChatStore;
use chatdb_core::StoreStats;

/// Runs the inspect command.
pub fn run(chat: &ChatStore, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stats = chat.stats()?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        _ => {
            print_text_output(&stats);
        }
    }

    Ok(())
}

fn print_text_output(stats: &StoreStats) {
    println!("chatdb Store Inspection");
    println!("=======================");
    println!();
    println!("Location:       {}", stats.location);
    println!("Persistent:     {}", stats.persistent);
    println!("Schema version: {}", stats.schema_version);
    println!();
    println!("Journal:");
    println!("  Size:          {}", format_size(stats.journal_bytes));
    println!("  Last commit:   {}", stats.committed_seq);
    println!();
    println!("Collections ({} rows):", stats.total_rows());
    for collection in &stats.collections {
        println!(
            "  {} (key: {}) {} rows",
            collection.name, collection.key_path, collection.rows
        );
        for index in &collection.indexes {
            println!(
                "    index {} on {}: {} entries",
                index.name, index.key_path, index.entries
            );
        }
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
