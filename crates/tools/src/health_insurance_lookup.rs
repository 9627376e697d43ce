//! Health insurance lookup: stub that returns mock plan details.
//!
//! In production this would query the benefits administration system.
//! The stub derives a plausible plan from the plan id so results are stable
//! across calls and the loop can be exercised without network access.

use async_trait::async_trait;
use agentflow_core::error::ToolError;
use agentflow_core::tool::{InputType, Tool, ToolInputSpec};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::args::{Args, round2, stable_hash};

const NAME: &str = "health_insurance_lookup";

pub struct HealthInsuranceLookupTool;

#[async_trait]
impl Tool for HealthInsuranceLookupTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Look up health insurance plan details, coverage, and costs"
    }

    fn inputs(&self) -> Vec<ToolInputSpec> {
        vec![
            ToolInputSpec::required(
                "plan_id",
                InputType::String,
                "Health insurance plan identifier",
            ),
            ToolInputSpec::required(
                "employee_tier",
                InputType::String,
                "Employee tier (individual, family, employee_spouse, employee_children)",
            ),
            ToolInputSpec::optional(
                "state",
                InputType::String,
                "State where the employee is located",
            ),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let args = Args::new(NAME, &arguments);

        let plan_id = args.str("plan_id")?.trim();
        if plan_id.is_empty() {
            return Err(args.invalid("plan_id", "must not be empty"));
        }
        let tier_raw = args.str("employee_tier")?;
        let tier = tier_multiplier(tier_raw)
            .ok_or_else(|| args.invalid("employee_tier", format!("unknown tier '{tier_raw}'")))?;
        let state = args.opt_str("state")?.map(|s| s.trim().to_ascii_uppercase());

        let details = mock_plan(plan_id, tier_raw, tier, state);
        serde_json::to_value(&details).map_err(|e| ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })
    }
}

fn tier_multiplier(tier: &str) -> Option<f64> {
    match tier.trim().to_ascii_lowercase().as_str() {
        "individual" => Some(1.0),
        "employee_spouse" => Some(2.0),
        "employee_children" => Some(1.8),
        "family" => Some(2.9),
        _ => None,
    }
}

#[derive(Debug, Serialize)]
struct PlanDetails {
    plan_id: String,
    plan_name: String,
    network: String,
    employee_tier: String,
    monthly_premium: f64,
    annual_deductible: f64,
    out_of_pocket_max: f64,
    coinsurance: f64,
    copays: Copays,
    #[serde(skip_serializing_if = "Option::is_none")]
    state: Option<String>,
}

#[derive(Debug, Serialize)]
struct Copays {
    primary_care: f64,
    specialist: f64,
    urgent_care: f64,
    emergency_room: f64,
}

/// Deterministic plan data keyed by plan id.
fn mock_plan(plan_id: &str, tier: &str, multiplier: f64, state: Option<String>) -> PlanDetails {
    let hash = stable_hash(plan_id);

    let metals = ["Bronze", "Silver", "Gold", "Platinum"];
    let networks = ["PPO", "HMO", "EPO", "HDHP"];
    let metal_idx = (hash % 4) as usize;

    // Richer metal → higher premium, lower cost sharing.
    let base_premium = 180.0 + 90.0 * metal_idx as f64 + (hash % 40) as f64;
    let deductible = [6000.0, 4000.0, 1500.0, 500.0][metal_idx];
    let coinsurance = [0.4, 0.3, 0.2, 0.1][metal_idx];

    PlanDetails {
        plan_id: plan_id.to_string(),
        plan_name: format!(
            "{} {}",
            metals[metal_idx],
            networks[(hash as usize / 5) % networks.len()]
        ),
        network: networks[(hash as usize / 5) % networks.len()].to_string(),
        employee_tier: tier.trim().to_ascii_lowercase(),
        monthly_premium: round2(base_premium * multiplier),
        annual_deductible: round2(deductible * multiplier.min(2.0)),
        out_of_pocket_max: round2((deductible + 3000.0) * multiplier.min(2.0)),
        coinsurance,
        copays: Copays {
            primary_care: 15.0 + 10.0 * (3 - metal_idx) as f64,
            specialist: 35.0 + 15.0 * (3 - metal_idx) as f64,
            urgent_care: 50.0 + 10.0 * (3 - metal_idx) as f64,
            emergency_room: 150.0 + 100.0 * (3 - metal_idx) as f64,
        },
        state,
    }
}
