//! Sub-commands, one per pipeline stage.

use crate::error::{CliError, CliResult};
use crate::render;
use clap::{Parser, Subcommand};
use rasan_core::{ChartKind, ProblemType, Stage, UploadFile};
use rasan_pipeline::{StageController, TrainOptions};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "rasan")]
#[command(about = "Drive the RASAN upload, analyze, train and visualize pipeline")]
pub struct Cli {
    /// Path to the TOML configuration file (falls back to RASAN_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Upload a CSV dataset and preprocess it
    Upload { file: PathBuf },
    /// Preprocess the uploaded dataset again
    Preprocess,
    /// Analyze the uploaded dataset
    Analyze {
        #[arg(long)]
        target: Option<String>,
    },
    /// Train a model, then render its charts
    Train {
        /// Defaults to the target found by the last analysis
        #[arg(long)]
        target: Option<String>,
        /// regression, binary or multiclass
        #[arg(long)]
        problem_type: Option<ProblemType>,
        #[arg(long)]
        model_name: Option<String>,
        /// Comma-separated feature columns
        #[arg(long, value_delimiter = ',')]
        features: Option<Vec<String>>,
        #[arg(long)]
        skip_visualize: bool,
    },
    /// Wait for the trained model and render its charts
    Visualize {
        /// Chart kinds to request; the backend picks when empty
        #[arg(long = "chart", value_parser = parse_chart_kind)]
        charts: Vec<ChartKind>,
    },
    /// Predict with the trained model. Unset columns are 0
    Predict { assignments: Vec<String> },
    /// Show the trained model, its status and stored charts
    Results,
    /// Write the training results as JSON
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Probe the backend and list stored artifacts
    Status,
    /// Clear every stored artifact
    Reset,
}

fn parse_chart_kind(value: &str) -> Result<ChartKind, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("chart kind must not be empty".to_string());
    }
    Ok(ChartKind::from(value))
}

/// Split `COL=VALUE`.
pub fn parse_assignment(text: &str) -> CliResult<(String, String)> {
    match text.split_once('=') {
        Some((column, value)) if !column.trim().is_empty() => {
            Ok((column.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(CliError::InvalidArgument {
            arg: text.to_string(),
            reason: "expected COLUMN=VALUE".to_string(),
        }),
    }
}

/// Read `path` into an upload, guessing the content type from the extension.
pub fn read_upload(path: &Path) -> CliResult<UploadFile> {
    let bytes = std::fs::read(path)?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| CliError::InvalidArgument {
            arg: path.display().to_string(),
            reason: "path has no file name".to_string(),
        })?
        .to_string();
    let content_type = mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string());
    Ok(UploadFile::new(filename, content_type, bytes))
}

/// Run one command and return what it printed.
pub async fn execute(controller: &StageController, command: Command) -> CliResult<String> {
    tracing::debug!(command = ?command, "Executing command");
    match command {
        Command::Upload { file } => {
            let upload = controller.select_upload(vec![read_upload(&file)?])?;
            let outcome = controller.run_upload(upload).await?;
            let mut out = render::dataset(&outcome.dataset);
            match &outcome.preprocess {
                Ok(record) => out.push_str(&render::preprocess(record)),
                Err(e) => out.push_str(&format!("Preprocessing failed: {}\n", e.user_message())),
            }
            Ok(out)
        }
        Command::Preprocess => {
            let record = controller.run_preprocess().await?;
            Ok(render::preprocess(&record))
        }
        Command::Analyze { target } => {
            let analysis = controller.run_analyze(target.as_deref()).await?;
            Ok(render::analysis(&analysis))
        }
        Command::Train {
            target,
            problem_type,
            model_name,
            features,
            skip_visualize,
        } => {
            let defaults = controller.train_defaults()?;
            let options = TrainOptions {
                target_column: target.or(defaults.target_column).unwrap_or_default(),
                problem_type: problem_type.unwrap_or(defaults.problem_type),
                model_name,
                features,
            };
            if skip_visualize {
                let training = controller.run_train_with(options).await?;
                return Ok(render::training(&training));
            }
            let outcome = controller
                .run_train_and_visualize(options, Vec::new())
                .await?;
            let mut out = render::training(&outcome.training);
            match &outcome.visualization {
                Ok(report) => out.push_str(&render::visualizations(&report.normalized)),
                Err(e) => out.push_str(&format!("Visualization failed: {}\n", e.user_message())),
            }
            Ok(out)
        }
        Command::Visualize { charts } => {
            if let Some(training) = controller.session().training()? {
                controller.await_model_ready(&training.model_id).await?;
            }
            let report = controller.visualize_latest(charts).await?;
            Ok(render::visualizations(&report.normalized))
        }
        Command::Predict { assignments } => {
            for assignment in &assignments {
                let (column, value) = parse_assignment(assignment)?;
                controller.set_prediction_text(&column, &value)?;
            }
            let input = controller.prediction_input()?;
            let prediction = controller.predict_current().await?;
            Ok(format!(
                "{}{}",
                render::prediction_input(&input),
                render::prediction(&prediction)
            ))
        }
        Command::Results => {
            let bundle = controller.export_results()?;
            let mut out = render::training(&bundle.training_result);
            match controller.model_info().await {
                Ok(info) => out.push_str(&render::model_info(&info)),
                Err(e) => out.push_str(&format!("Model status unavailable: {}\n", e.user_message())),
            }
            if let Some(normalized) = controller.stored_visualizations()? {
                out.push_str(&render::visualizations(&normalized));
            }
            if let Some(prediction) = controller.session().prediction()? {
                out.push_str(&render::prediction(&prediction));
            }
            Ok(out)
        }
        Command::Export { out } => {
            let bundle = controller.export_results()?;
            let path = out.unwrap_or_else(|| PathBuf::from(bundle.suggested_file_name()));
            let json = serde_json::to_string_pretty(&bundle)?;
            std::fs::write(&path, json)?;
            tracing::info!(path = %path.display(), model_id = %bundle.model_id, "Results exported");
            Ok(format!("Exported {}\n", path.display()))
        }
        Command::Status => {
            let status = controller.backend_status().await;
            let artifacts = controller.session().snapshot()?;
            let mut out = render::backend_status(&status);
            out.push_str(&render::artifacts(&artifacts));
            for stage in Stage::all() {
                let ready = controller.session().check(*stage)?.is_ready();
                out.push_str(&format!(
                    "  {} {}\n",
                    if ready { "ready  " } else { "blocked" },
                    stage
                ));
            }
            Ok(out)
        }
        Command::Reset => {
            controller.reset()?;
            Ok("Session cleared\n".to_string())
        }
    }
}
