//! Intent classification preview

use anyhow::Result;
use costwise_core::{Classifier, Intent};

/// Print the intents a question resolves to, in the order sections would appear
pub fn cmd_classify(query: &str, json: bool) -> Result<Vec<Intent>> {
    let intents = Classifier::default().classify(query, None);

    if json {
        println!("{}", serde_json::to_string_pretty(&intents)?);
        return Ok(intents);
    }

    println!("🧭 Intents for: {}", query);
    println!("   ─────────────────────────────");
    for (i, intent) in intents.iter().enumerate() {
        let needs = match (intent.needs_costs(), intent.needs_inventory()) {
            (true, true) => "costs + inventory",
            (true, false) => "costs",
            (false, true) => "inventory",
            (false, false) => "-",
        };
        println!("   {}. {:20} reads {}", i + 1, intent.as_str(), needs);
    }
    if intents.len() > 1 {
        println!();
        println!("   Compound request: {} sections", intents.len());
    }

    Ok(intents)
}
