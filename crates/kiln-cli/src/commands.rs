// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use kiln_config::KilnConfig;
use kiln_k8s::{ResourceSpec, WorkloadId, WorkloadRecord, WorkloadSpec, WorkloadStore};
use kiln_provisioning::{classify, Provisioner, ProvisioningOutcome, Verdict};

use crate::ProvisionArgs;

/// Parse a `KEY=VALUE` pair.
pub(crate) fn parse_key_val(s: &str) -> Result<(String, String)> {
	let (key, value) = s
		.split_once('=')
		.ok_or_else(|| anyhow!("expected KEY=VALUE, got '{s}'"))?;
	if key.is_empty() {
		return Err(anyhow!("empty key in '{s}'"));
	}
	Ok((key.to_string(), value.to_string()))
}

/// Build the workload to submit from flags and resolved configuration.
pub(crate) fn build_spec(args: &ProvisionArgs, config: &KilnConfig) -> Result<WorkloadSpec> {
	let namespace = config.kube.namespace.clone();
	let id = match &args.name {
		Some(name) => WorkloadId::new(namespace, name.clone()),
		None => WorkloadId::generate(namespace, &config.kube.name_prefix),
	};

	let mut spec = WorkloadSpec::new(id, args.image.clone()).with_resources(ResourceSpec {
		cpu_request: args.cpu.clone(),
		memory_request: args.memory.clone(),
		cpu_limit: args.cpu_limit.clone(),
		memory_limit: args.memory_limit.clone(),
	});

	if let Some((program, rest)) = args.command.split_first() {
		spec = spec.with_command([program.clone()]).with_args(rest.iter().cloned());
	}
	for pair in &args.env {
		let (key, value) = parse_key_val(pair).context("invalid --env")?;
		spec = spec.with_env(key, value);
	}
	for pair in &args.label {
		let (key, value) = parse_key_val(pair).context("invalid --label")?;
		spec = spec.with_label(key, value);
	}

	Ok(spec)
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_interrupt(token: CancellationToken) {
	tokio::spawn(async move {
		if tokio::signal::ctrl_c().await.is_ok() {
			warn!("interrupt received, cancelling");
			token.cancel();
		}
	});
}

/// Run `kiln provision`. Returns whether the workload became ready.
pub(crate) async fn provision(
	store: Arc<dyn WorkloadStore>,
	config: &KilnConfig,
	args: ProvisionArgs,
) -> Result<bool> {
	let spec = build_spec(&args, config)?;
	let provisioner = Provisioner::new(store, config.provisioning.to_provision_config());

	let cancel = CancellationToken::new();
	cancel_on_interrupt(cancel.clone());

	info!(workload = %spec.id, image = %spec.image, "provisioning workload");
	let outcome = provisioner.provision_with_defaults(&spec, &cancel).await;

	if args.json {
		println!("{}", serde_json::to_string_pretty(&outcome)?);
	} else {
		println!("{}", describe_outcome(&outcome));
	}

	Ok(outcome.is_success())
}

fn describe_outcome(outcome: &ProvisioningOutcome) -> String {
	match outcome {
		ProvisioningOutcome::Success { id, elapsed } => {
			format!("{id} ready after {}ms", elapsed.as_millis())
		}
		ProvisioningOutcome::Failure(failure) => format!(
			"{} failed during {} after {}ms: {}: {}",
			failure.id,
			failure.stage,
			failure.elapsed.as_millis(),
			failure.kind,
			failure.message
		),
	}
}

#[derive(Serialize)]
struct Inspection<'a> {
	record: &'a WorkloadRecord,
	verdict: &'a Verdict,
}

/// Run `kiln inspect`: one read, one classification.
pub(crate) async fn inspect(
	store: &dyn WorkloadStore,
	config: &KilnConfig,
	name: &str,
	json: bool,
) -> Result<()> {
	let id = WorkloadId::new(config.kube.namespace.clone(), name);
	let record = store
		.get(&id)
		.await
		.with_context(|| format!("failed to read workload {id}"))?;
	let verdict = classify(&record);

	if json {
		let inspection = Inspection {
			record: &record,
			verdict: &verdict,
		};
		println!("{}", serde_json::to_string_pretty(&inspection)?);
		return Ok(());
	}

	println!("{id}: phase {:?}", record.phase);
	for condition in &record.conditions {
		println!(
			"  condition {:?}={:?} {}",
			condition.kind,
			condition.status,
			condition.reason.as_deref().unwrap_or("")
		);
	}
	for container in &record.container_statuses {
		println!(
			"  container {} ready={} {:?}",
			container.name, container.ready, container.state
		);
	}
	match verdict {
		Verdict::Pending => println!("verdict: pending"),
		Verdict::Ready => println!("verdict: ready"),
		Verdict::Failed { reason, message } => println!("verdict: failed: {reason}: {message}"),
	}
	Ok(())
}
