use clap::Parser;
use miette::Result;
use qcast::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Install miette's fancy error handler for readable diagnostics
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    qcast::cli::logging::init_tracing();

    let cli = Cli::parse();
    let global = cli.global;

    match cli.command {
        Commands::Predict(args) => qcast::cli::commands::predict::run(args, &global),
        Commands::Simulate(args) => qcast::cli::commands::simulate::run(args, &global),
        Commands::Variability(args) => qcast::cli::commands::variability::run(args, &global),
        Commands::Specs(args) => qcast::cli::commands::specs::run(args, &global),
        Commands::Correlate(args) => qcast::cli::commands::correlate::run(args, &global),
    }
}
