//! `proxyctl model create | show | delete`

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use serde_json::Value;

use proxyctl_core::{EntityRef, ModelId, ModelSpec};

#[derive(Subcommand, Debug)]
pub enum ModelCommand {
    /// Register a model deployment and wait until the proxy serves it.
    Create(CreateArgs),

    /// Print the proxy's record of a deployment as JSON.
    Show { id: String },

    /// Delete a deployment.
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Public model name clients request.
    pub name: String,

    /// Provider model, e.g. openai/gpt-4o.
    #[arg(long)]
    pub upstream: String,

    /// Provider endpoint override.
    #[arg(long)]
    pub api_base: Option<String>,

    /// Deployment id. A UUID is generated when omitted.
    #[arg(long)]
    pub id: Option<String>,

    /// Underlying model used for cost tracking.
    #[arg(long)]
    pub base_model: Option<String>,
}

pub fn run(cmd: ModelCommand) -> Result<()> {
    match cmd {
        ModelCommand::Create(args) => args.run(),
        ModelCommand::Show { id } => show(id),
        ModelCommand::Delete { id } => super::delete(EntityRef::model(&ModelId::from(id))),
    }
}

impl CreateArgs {
    pub fn run(self) -> Result<()> {
        let mut spec = ModelSpec::new(self.name, self.upstream);
        if let Some(id) = self.id {
            spec.model_id = ModelId::from(id);
        }
        if let Some(api_base) = self.api_base {
            spec.litellm_params
                .insert("api_base".into(), Value::String(api_base));
        }
        spec.base_model = self.base_model;

        let (home, provisioner) = super::connect()?;
        provisioner
            .create_model_verified(&spec)
            .with_context(|| format!("failed to create model '{}'", spec.model_name))?;

        super::record(
            &home,
            EntityRef::model(&spec.model_id),
            Some(spec.model_name.clone()),
        )?;
        println!("✓ Created model {} ({})", spec.model_name, spec.model_id);
        Ok(())
    }
}

fn show(id: String) -> Result<()> {
    let (_, provisioner) = super::connect()?;
    let record = provisioner
        .client()
        .get_model(&ModelId::from(id.clone()))
        .with_context(|| format!("failed to read model '{id}'"))?;
    super::print_json(&record)
}
