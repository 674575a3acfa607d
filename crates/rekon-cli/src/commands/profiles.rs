//! Profile validation and listing command.

use std::path::PathBuf;

use clap::Args;
use console::style;

use rekon_core::{load_profiles, ProfileSet};

/// Arguments for the profiles command.
#[derive(Args)]
pub struct ProfilesArgs {
    /// Vendor profile configuration file
    input: PathBuf,

    /// Print each vendor's field rules
    #[arg(long)]
    detailed: bool,
}

pub fn run(args: ProfilesArgs) -> anyhow::Result<()> {
    // Compiling the registry exercises every regex, so a malformed
    // pattern is reported here instead of mid-batch.
    let registry = load_profiles(&args.input)?;
    println!(
        "{} {} valid vendor profile(s) in {}",
        style("✓").green(),
        registry.len(),
        args.input.display()
    );

    let set = ProfileSet::from_file(&args.input)?;
    for vendor in &set.vendors {
        println!(
            "  {} ({}): {} fields, key = {}",
            style(vendor.name()).bold(),
            vendor.vendor_id,
            vendor.fields.len(),
            vendor.key_field
        );
        if args.detailed {
            for field in &vendor.fields {
                println!(
                    "    {} [{:?}/{:?}]{} {}",
                    field.name,
                    field.value_type,
                    field.aggregation,
                    if field.required { " required" } else { "" },
                    field.pattern
                );
            }
        }
    }

    Ok(())
}
