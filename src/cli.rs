use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::PersistPolicy;
use crate::domain::{FeatureError, FeatureVector};

#[derive(Parser, Debug)]
#[command(name = "activity-server")]
#[command(version)]
#[command(about = "Activity-level classifier with prediction and profile API", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Config directory (default.toml, <ACTIVITY_ENV>.toml)
        #[arg(short, long, default_value = "config")]
        config: PathBuf,
        /// Override server.port
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,
        /// Override model.path
        #[arg(short, long)]
        model: Option<PathBuf>,
        /// Override server.persist_policy (strict | best_effort)
        #[arg(long)]
        persist_policy: Option<PersistPolicy>,
    },
    /// Classify one feature vector offline and print the result
    Classify {
        /// Classifier artifact
        #[arg(short, long, default_value = "models/activity_model.json")]
        model: PathBuf,
        #[command(flatten)]
        features: FeatureArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Apply database migrations and exit
    Migrate {
        /// Config directory
        #[arg(short, long, default_value = "config")]
        config: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct FeatureArgs {
    /// Average daily steps
    #[arg(long)]
    pub avg_steps: f64,
    /// Runs per week
    #[arg(long, default_value = "0")]
    pub frequency_run: f64,
    /// Rides per week
    #[arg(long, default_value = "0")]
    pub frequency_bike: f64,
    /// Physically active job
    #[arg(long)]
    pub active_job: bool,
    /// Gym sessions per week
    #[arg(long, default_value = "0")]
    pub gym_amount: f64,
}

impl FeatureArgs {
    pub fn to_features(&self) -> Result<FeatureVector, FeatureError> {
        FeatureVector::new(
            self.avg_steps,
            self.frequency_run,
            self.frequency_bike,
            self.active_job,
            self.gym_amount,
        )
    }
}
