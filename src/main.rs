//! Provides the main entry point to the program.
use anyhow::Result;
use clap::Parser;
use evimpact::commands::{
    Cli, Commands, handle_analyze_command, handle_predict_command, handle_simulate_command,
    handle_train_command,
};

fn main() -> Result<()> {
    human_panic::setup_panic!();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train { data_dir, artifact } => handle_train_command(&data_dir, &artifact),
        Commands::Predict {
            data_dir,
            artifact,
            event_type,
            city,
            duration,
            attendance,
        } => handle_predict_command(
            &data_dir,
            &artifact,
            &event_type,
            &city,
            duration,
            attendance,
        ),
        Commands::Analyze { data_dir, event } => {
            handle_analyze_command(&data_dir, event.as_deref())
        }
        Commands::Simulate {
            data_dir,
            event,
            attendance_change,
            price_elasticity,
            spending_multiplier,
        } => handle_simulate_command(
            &data_dir,
            &event,
            attendance_change,
            price_elasticity,
            spending_multiplier,
        ),
    }
}
