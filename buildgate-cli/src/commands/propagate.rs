//! Propagate command handler

use anyhow::{Result, bail};
use buildgate_core::domain::build::BuildLocator;
use buildgate_core::domain::report::ReportedStatus;
use clap::Args;
use colored::*;

use crate::config::{Config, PropagateConfig};
use crate::service::{AggregationSummary, StatusAggregator};
use crate::sink::StdoutSink;

/// Options of the `propagate` command
#[derive(Args, Debug)]
pub struct PropagateArgs {
    /// Container build: a build id, a configuration id (latest build) or a raw locator
    #[arg(long, env = "BUILDGATE_CONTAINER_BUILD", alias = "container-configuration-id")]
    container_build: String,

    /// Commit to report against; read from the dependencies' env.from_commit when absent
    #[arg(long, env = "BUILDGATE_COMMIT")]
    commit: Option<String>,

    /// Dependency build type that only launches another build
    #[arg(long, env = "BUILDGATE_CUSTOM_DEPENDENT_BUILD")]
    custom_dependent_build: Option<String>,
}

impl PropagateArgs {
    fn propagate_config(self) -> PropagateConfig {
        PropagateConfig {
            commit: self.commit,
            custom_dependent_build: self.custom_dependent_build,
            container_build: self.container_build,
        }
    }
}

/// Handle the propagate command
///
/// Fails after reporting every dependency it could if any of them failed.
pub async fn handle_propagate_command(args: PropagateArgs, config: &Config) -> Result<()> {
    let propagate = args.propagate_config();
    propagate.validate()?;

    let (review, ci) = super::connect(config)?;

    let aggregator = StatusAggregator::new(
        &ci,
        &review,
        &StdoutSink,
        propagate.custom_dependent_build.clone(),
    );
    let container = BuildLocator::parse(propagate.container_build.trim());

    let summary = aggregator
        .propagate(&container, propagate.commit.as_deref())
        .await?;

    print_summary(&summary);

    if !summary.failed.is_empty() {
        bail!(
            "{} of {} dependencies could not be reported",
            summary.failed.len(),
            summary.failed.len() + summary.reported.len()
        );
    }

    Ok(())
}

/// Print the propagation summary
fn print_summary(summary: &AggregationSummary) {
    let Some(commit) = &summary.commit else {
        eprintln!("{}", "No dependencies found.".yellow());
        return;
    };

    eprintln!(
        "{}",
        format!(
            "Reported {} dependency status(es) for commit {}:",
            summary.reported.len(),
            commit
        )
        .bold()
    );

    for report in &summary.reported {
        let status = match report.status {
            ReportedStatus::Successful => report.status.to_string().green(),
            ReportedStatus::InProgress => report.status.to_string().cyan(),
            ReportedStatus::Failed => report.status.to_string().red(),
        };
        eprintln!("  {:<12} {} ({})", status, report.name, report.description.dimmed());
    }

    for failure in &summary.failed {
        eprintln!("  {:<12} {}: {}", "ERROR".red().bold(), failure.build_type_id, failure.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: PropagateArgs,
    }

    #[test]
    fn test_legacy_option_name() {
        let cli = TestCli::parse_from([
            "buildgate",
            "--container-configuration-id",
            "Framework_Container",
        ]);
        let config = cli.args.propagate_config();

        assert_eq!(config.container_build, "Framework_Container");
        assert!(config.commit.is_none());
        assert!(config.validate().is_ok());
    }
}
