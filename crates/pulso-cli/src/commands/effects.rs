//! Effect catalog listing command.

use clap::Args;

use pulso_effects::EffectKind;

#[derive(Args)]
pub struct EffectsArgs {
    /// Show parameter ranges for every effect
    #[arg(long)]
    pub verbose: bool,
}

pub fn run(args: EffectsArgs) -> anyhow::Result<()> {
    println!("Effect Catalog");
    println!("==============");

    for kind in EffectKind::ALL {
        let descriptor = kind.descriptor();
        let sync = if descriptor.syncable { " [BPM sync]" } else { "" };
        println!(
            "  {:<10} {}, {}{}",
            descriptor.id,
            descriptor.category.name(),
            descriptor.description,
            sync
        );
        if args.verbose {
            for param in descriptor.params {
                println!(
                    "      {:<12} {:>8.2} … {:<8.2} (default {:.2})",
                    param.name, param.min, param.max, param.default
                );
            }
        }
    }
    Ok(())
}
