use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use clap::Args;
use rust_decimal::Decimal;
use valora_core::pricing::{compute_full_pricing, PricingWeightsPatch, QuoteParams, ServiceParams};

use crate::commands::CommandResult;

/// Line item inputs. Values stay raw strings so malformed numbers surface as `input` failures.
#[derive(Debug, Clone, Default, Args)]
pub struct PriceArgs {
    #[arg(long, help = "Base price of the service before any weighting")]
    pub base_price: String,
    #[arg(long, help = "Urgency on the 0..=5 scale (default 2)")]
    pub urgenza: Option<String>,
    #[arg(long, help = "Complexity on the 0..=5 scale (default 2)")]
    pub complessita: Option<String>,
    #[arg(long, help = "Work volume on the 0..=5 scale (default 2)")]
    pub volume_lavoro: Option<String>,
    #[arg(long, help = "Importance on the 0..=5 scale (default 2)")]
    pub importanza: Option<String>,
    #[arg(long, help = "Repeat-customer level on the 0..=5 scale (default 2)")]
    pub cliente_abituale: Option<String>,
    #[arg(long, help = "Economic prosperity on the 0..=5 scale (default 2)")]
    pub prosperita_economica: Option<String>,
    #[arg(long, help = "Additional flat cost added before bucketing (default 0)")]
    pub altri_costi: Option<String>,
    #[arg(long, help = "Partial weights file (.json or .toml) merged over the defaults")]
    pub weights: Option<PathBuf>,
}

pub fn run(args: &PriceArgs) -> CommandResult {
    let inputs = match parse_inputs(args) {
        Ok(inputs) => inputs,
        Err(error) => {
            return CommandResult::failure("price", "input", format!("{error:#}"), 6);
        }
    };

    let pricing = match compute_full_pricing(
        inputs.base_price,
        &inputs.service_params,
        &inputs.quote_params,
        inputs.weights.as_ref(),
    ) {
        Ok(pricing) => pricing,
        Err(error) => return CommandResult::failure("price", "input", error.to_string(), 6),
    };

    match serde_json::to_string(&pricing) {
        Ok(detail) => CommandResult::success(
            "price",
            format!(
                "budget_interno={} budget_effettivo={}",
                pricing.budget_interno, pricing.budget_effettivo
            ),
        )
        .with_detail(detail),
        Err(error) => CommandResult::failure("price", "serialization", error.to_string(), 3),
    }
}

struct PriceInputs {
    base_price: Decimal,
    service_params: ServiceParams,
    quote_params: QuoteParams,
    weights: Option<PricingWeightsPatch>,
}

fn parse_inputs(args: &PriceArgs) -> anyhow::Result<PriceInputs> {
    let base_price = parse_decimal("base-price", &args.base_price)?;
    let service_params = ServiceParams {
        urgenza: parse_optional("urgenza", args.urgenza.as_deref())?,
        complessita: parse_optional("complessita", args.complessita.as_deref())?,
        volume_lavoro: parse_optional("volume-lavoro", args.volume_lavoro.as_deref())?,
        importanza: parse_optional("importanza", args.importanza.as_deref())?,
    };
    let quote_params = QuoteParams {
        cliente_abituale: parse_optional("cliente-abituale", args.cliente_abituale.as_deref())?,
        prosperita_economica: parse_optional(
            "prosperita-economica",
            args.prosperita_economica.as_deref(),
        )?,
        altri_costi: parse_optional("altri-costi", args.altri_costi.as_deref())?,
        ..QuoteParams::default()
    };
    let weights = args.weights.as_deref().map(load_weights_file).transpose()?;

    Ok(PriceInputs { base_price, service_params, quote_params, weights })
}

fn parse_decimal(flag: &str, raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw.trim()).with_context(|| format!("--{flag} must be a decimal, got `{raw}`"))
}

fn parse_optional(flag: &str, raw: Option<&str>) -> anyhow::Result<Option<Decimal>> {
    raw.map(|raw| parse_decimal(flag, raw)).transpose()
}

fn load_weights_file(path: &Path) -> anyhow::Result<PricingWeightsPatch> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read weights file `{}`", path.display()))?;

    let is_json = path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("json"));
    let patch: PricingWeightsPatch = if is_json {
        serde_json::from_str(&raw)
            .with_context(|| format!("could not parse weights file `{}`", path.display()))?
    } else {
        toml::from_str(&raw)
            .with_context(|| format!("could not parse weights file `{}`", path.display()))?
    };

    if patch.is_empty() {
        bail!("weights file `{}` sets no known weight", path.display());
    }
    Ok(patch)
}
