//! Command-line front end for the crop yield prediction service.

use clap::{Parser, Subcommand};
use crop_yield_api::client::{render_prediction, ConnectionStatus, PredictionClient, PredictionForm};
use std::error::Error;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "yield-client", version, about = "Query the crop yield prediction service")]
struct Cli {
    /// Base URL of the prediction service
    #[arg(long, env = "YIELD_API_URL", default_value = "http://localhost:5000")]
    url: String,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Probe the service health endpoint
    Health,
    /// List the valid Area, Crop and Soil_Type options
    Features,
    /// Request a yield prediction
    Predict {
        #[arg(long)]
        area: String,
        #[arg(long)]
        crop: String,
        #[arg(long)]
        soil_type: String,
        /// °C, between -10 and 50
        #[arg(long, allow_negative_numbers = true)]
        temperature: String,
        /// %, between 0 and 100
        #[arg(long, allow_negative_numbers = true)]
        humidity: String,
        /// between 0 and 14
        #[arg(long, allow_negative_numbers = true)]
        ph: String,
        /// mm, between 0 and 3000
        #[arg(long, allow_negative_numbers = true)]
        annual_rainfall: String,
    },
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut client = PredictionClient::with_timeout(cli.url, Duration::from_secs(cli.timeout))?;

    if client.check_health().await != ConnectionStatus::Connected {
        return Err("Prediction service unavailable. Please try again later.".into());
    }

    match cli.command {
        Command::Health => println!("connected"),
        Command::Features => {
            let catalog = client.load_features().await?;
            println!("Area:      {}", catalog.areas.join(", "));
            println!("Crop:      {}", catalog.crops.join(", "));
            println!("Soil_Type: {}", catalog.soil_types.join(", "));
            for (field, range) in &catalog.ranges {
                println!("{field}: {} to {}", range.min, range.max);
            }
        }
        Command::Predict {
            area,
            crop,
            soil_type,
            temperature,
            humidity,
            ph,
            annual_rainfall,
        } => {
            client.load_features().await?;
            let form = PredictionForm {
                area,
                crop,
                soil_type,
                temperature,
                humidity,
                ph,
                annual_rainfall,
            };
            let response = client.predict(&form).await?;
            println!("{}", render_prediction(&response));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crop_yield_api=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn predict_args(temperature: &str, humidity: &str, ph: &str, rainfall: &str) -> Vec<String> {
        [
            "yield-client",
            "predict",
            "--area",
            "Punjab",
            "--crop",
            "Wheat",
            "--soil-type",
            "Loamy",
            "--temperature",
            temperature,
            "--humidity",
            humidity,
            "--ph",
            ph,
            "--annual-rainfall",
            rainfall,
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_numbers_reach_the_form() {
        let cli = Cli::try_parse_from(predict_args("-10.1", "-0.1", "-1", "-5")).unwrap();
        match cli.command {
            Command::Predict {
                temperature,
                humidity,
                ph,
                annual_rainfall,
                ..
            } => {
                assert_eq!(temperature, "-10.1");
                assert_eq!(humidity, "-0.1");
                assert_eq!(ph, "-1");
                assert_eq!(annual_rainfall, "-5");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn defaults_apply() {
        let cli = Cli::try_parse_from(["yield-client", "health"]).unwrap();
        assert_eq!(cli.timeout, 10);
        assert!(matches!(cli.command, Command::Health));
    }
}
