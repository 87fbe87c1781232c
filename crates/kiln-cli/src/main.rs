// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `kiln` binary: submit a workload and wait until it is usable.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kiln_config::{
	load_from_sources, CliSource, ConfigSource, DefaultsSource, EnvSource, KilnConfig,
	KilnConfigLayer, KubeConfigLayer, LogFormat, LogLevel, LoggingConfig, LoggingConfigLayer,
	ProvisioningConfigLayer, TomlSource,
};
use kiln_k8s::{KubeWorkloadStore, WorkloadStore};

mod commands;

/// Kiln - provision workloads on Kubernetes and wait for readiness
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about, long_about = None)]
struct Args {
	/// Path to custom configuration file
	#[arg(short, long, global = true)]
	config: Option<PathBuf>,

	/// Kubeconfig file (defaults to in-cluster, $KUBECONFIG, then ~/.kube/config)
	#[arg(long, global = true)]
	kubeconfig: Option<PathBuf>,

	/// Log level (overrides config)
	#[arg(short, long, global = true)]
	log_level: Option<String>,

	/// Output logs as JSON (overrides config)
	#[arg(long, global = true)]
	json_logs: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Submit a workload and wait until it is ready or has failed
	Provision(ProvisionArgs),
	/// Read a workload once and show how it classifies
	Inspect {
		/// Workload name
		name: String,
		/// Namespace (overrides config)
		#[arg(long, short)]
		namespace: Option<String>,
		/// Output as JSON
		#[arg(long)]
		json: bool,
	},
}

#[derive(ClapArgs, Debug, Clone)]
struct ProvisionArgs {
	/// Container image to run
	#[arg(long, short, default_value = "busybox")]
	image: String,
	/// Exact workload name
	#[arg(long, conflicts_with = "prefix")]
	name: Option<String>,
	/// Prefix for a generated workload name (overrides config)
	#[arg(long)]
	prefix: Option<String>,
	/// Namespace (overrides config)
	#[arg(long, short)]
	namespace: Option<String>,
	/// Environment variable (repeatable: -e KEY=VALUE)
	#[arg(long, short = 'e', value_name = "KEY=VALUE")]
	env: Vec<String>,
	/// Label (repeatable: -L KEY=VALUE)
	#[arg(long, short = 'L', value_name = "KEY=VALUE")]
	label: Vec<String>,
	/// CPU request, e.g. 100m
	#[arg(long)]
	cpu: Option<String>,
	/// Memory request, e.g. 100Mi
	#[arg(long)]
	memory: Option<String>,
	/// CPU limit
	#[arg(long)]
	cpu_limit: Option<String>,
	/// Memory limit
	#[arg(long)]
	memory_limit: Option<String>,
	/// Poll interval in milliseconds (overrides config)
	#[arg(long)]
	interval_ms: Option<u64>,
	/// Visibility budget in milliseconds (overrides config)
	#[arg(long)]
	visibility_timeout_ms: Option<u64>,
	/// Readiness budget in milliseconds (overrides config)
	#[arg(long)]
	readiness_timeout_ms: Option<u64>,
	/// Use a watch to re-check as soon as the workload changes
	#[arg(long)]
	watch: bool,
	/// Output the outcome as JSON
	#[arg(long)]
	json: bool,
	/// Command to run in the container, after `--`
	#[arg(last = true)]
	command: Vec<String>,
}

impl Args {
	/// Configuration overrides carried by flags.
	fn config_layer(&self) -> Result<KilnConfigLayer> {
		let level = self
			.log_level
			.as_deref()
			.map(str::parse::<LogLevel>)
			.transpose()
			.map_err(anyhow::Error::msg)
			.context("invalid --log-level")?;
		let format = self.json_logs.then_some(LogFormat::Json);

		let mut kube = KubeConfigLayer {
			kubeconfig: self.kubeconfig.clone(),
			..Default::default()
		};
		let mut provisioning = ProvisioningConfigLayer::default();

		match &self.command {
			Command::Provision(args) => {
				kube.namespace = args.namespace.clone();
				kube.name_prefix = args.prefix.clone();
				provisioning.interval_ms = args.interval_ms;
				provisioning.visibility_timeout_ms = args.visibility_timeout_ms;
				provisioning.readiness_timeout_ms = args.readiness_timeout_ms;
				provisioning.use_watch = args.watch.then_some(true);
			}
			Command::Inspect { namespace, .. } => {
				kube.namespace = namespace.clone();
			}
		}

		Ok(KilnConfigLayer {
			provisioning: Some(provisioning),
			kube: Some(kube),
			logging: Some(LoggingConfigLayer { level, format }),
		})
	}
}

fn load_config(args: &Args) -> Result<KilnConfig> {
	let toml = match &args.config {
		Some(path) => TomlSource::new(path),
		None => TomlSource::system(),
	};
	let sources: Vec<Box<dyn ConfigSource>> = vec![
		Box::new(DefaultsSource),
		Box::new(toml),
		Box::new(EnvSource::new()),
		Box::new(CliSource::new(args.config_layer()?)),
	];
	load_from_sources(sources).context("failed to load configuration")
}

fn log_level_to_tracing(level: LogLevel) -> tracing::Level {
	match level {
		LogLevel::Trace => tracing::Level::TRACE,
		LogLevel::Debug => tracing::Level::DEBUG,
		LogLevel::Info => tracing::Level::INFO,
		LogLevel::Warn => tracing::Level::WARN,
		LogLevel::Error => tracing::Level::ERROR,
	}
}

/// Logs go to stderr so stdout stays machine-readable with `--json`.
fn init_tracing(logging: &LoggingConfig) {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(format!("kiln={}", log_level_to_tracing(logging.level))));

	match logging.format {
		LogFormat::Json => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().json().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Compact => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().compact().with_writer(std::io::stderr))
				.init();
		}
		LogFormat::Pretty => {
			tracing_subscriber::registry()
				.with(filter)
				.with(fmt::layer().with_writer(std::io::stderr))
				.init();
		}
	}
}

async fn connect(config: &KilnConfig) -> Result<Arc<dyn WorkloadStore>> {
	let kinds = &config.kube.known_kinds;
	let store = match &config.kube.kubeconfig {
		Some(path) => KubeWorkloadStore::from_kubeconfig(path, kinds)
			.await
			.with_context(|| format!("failed to load kubeconfig {}", path.display()))?,
		None => KubeWorkloadStore::try_default(kinds)
			.await
			.context("failed to initialize Kubernetes client")?,
	};
	Ok(Arc::new(store))
}

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();
	let config = load_config(&args)?;

	init_tracing(&config.logging);
	debug!(?config, "configuration resolved");

	let store = connect(&config).await?;
	info!(namespace = %config.kube.namespace, "connected to cluster");

	match args.command {
		Command::Provision(provision) => {
			let succeeded = commands::provision(store, &config, provision).await?;
			if !succeeded {
				warn!("provisioning did not succeed");
				std::process::exit(1);
			}
			Ok(())
		}
		Command::Inspect { name, json, .. } => {
			commands::inspect(store.as_ref(), &config, &name, json).await
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_provision_with_trailing_command() {
		let args = Args::try_parse_from([
			"kiln",
			"provision",
			"--image",
			"busybox",
			"-e",
			"MODE=test",
			"--readiness-timeout-ms",
			"5000",
			"--",
			"sleep",
			"3600",
		])
		.unwrap();

		match args.command {
			Command::Provision(p) => {
				assert_eq!(p.image, "busybox");
				assert_eq!(p.env, vec!["MODE=test"]);
				assert_eq!(p.readiness_timeout_ms, Some(5000));
				assert_eq!(p.command, vec!["sleep", "3600"]);
			}
			other => panic!("expected provision, got {other:?}"),
		}
	}

	#[test]
	fn name_and_prefix_conflict() {
		let result = Args::try_parse_from([
			"kiln", "provision", "--name", "web", "--prefix", "web",
		]);
		assert!(result.is_err());
	}

	#[test]
	fn flags_become_top_precedence_layer() {
		let args = Args::try_parse_from([
			"kiln",
			"--log-level",
			"debug",
			"--json-logs",
			"provision",
			"--namespace",
			"ci",
			"--watch",
			"--interval-ms",
			"50",
		])
		.unwrap();

		let layer = args.config_layer().unwrap();
		let kube = layer.kube.unwrap();
		let provisioning = layer.provisioning.unwrap();
		let logging = layer.logging.unwrap();
		assert_eq!(kube.namespace.as_deref(), Some("ci"));
		assert_eq!(provisioning.use_watch, Some(true));
		assert_eq!(provisioning.interval_ms, Some(50));
		assert_eq!(logging.level, Some(LogLevel::Debug));
		assert_eq!(logging.format, Some(LogFormat::Json));
	}

	#[test]
	fn unset_flags_leave_lower_layers_alone() {
		let args = Args::try_parse_from(["kiln", "inspect", "web"]).unwrap();
		let layer = args.config_layer().unwrap();
		let provisioning = layer.provisioning.unwrap();
		assert_eq!(provisioning, ProvisioningConfigLayer::default());
		assert_eq!(layer.logging.unwrap(), LoggingConfigLayer::default());
	}

	#[test]
	fn invalid_log_level_is_reported() {
		let args = Args::try_parse_from(["kiln", "--log-level", "loud", "inspect", "web"]).unwrap();
		assert!(args.config_layer().is_err());
	}
}
