//! FSA/HSA contribution calculator.
//!
//! An illustrative heuristic, not tax advice: aim for ~80% of expected
//! expenses to limit forfeiture risk, capped at the annual account limits.
//! With `both`, the HSA is funded first (it rolls over) and the FSA takes
//! what remains of the target.

use async_trait::async_trait;
use agentflow_core::error::ToolError;
use agentflow_core::tool::{InputType, Tool, ToolInputSpec};
use serde_json::{Map, Value, json};

use crate::args::{Args, round2};

const NAME: &str = "fsa_hsa_calculator";

const TARGET_RATIO: f64 = 0.8;
/// Share of expenses routed to the HSA first when funding both accounts
const HSA_FIRST_SHARE: f64 = 0.5;
const FSA_CAP: f64 = 3150.0;
const HSA_CAP_INDIVIDUAL: f64 = 4150.0;
const HSA_CATCH_UP_AGE: i64 = 55;

pub struct FsaHsaCalculatorTool;

#[async_trait]
impl Tool for FsaHsaCalculatorTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Calculate optimal FSA/HSA contributions based on expected medical expenses"
    }

    fn inputs(&self) -> Vec<ToolInputSpec> {
        vec![
            ToolInputSpec::required(
                "expected_medical_expenses",
                InputType::Float,
                "Expected annual medical expenses in USD",
            ),
            ToolInputSpec::required(
                "account_type",
                InputType::String,
                "Type of account (FSA, HSA, both)",
            ),
            ToolInputSpec::optional("current_age", InputType::Integer, "Employee's current age"),
            ToolInputSpec::optional("retirement_age", InputType::Integer, "Expected retirement age"),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let args = Args::new(NAME, &arguments);

        // Negative expense estimates are clamped rather than rejected.
        let expenses = args.f64("expected_medical_expenses")?.max(0.0);
        let account_type = args.str("account_type")?.trim().to_ascii_lowercase();
        let current_age = args.opt_i64("current_age")?;
        let retirement_age = args.opt_i64("retirement_age")?;

        let mut recommendations = Map::new();
        let mut rationale = Map::new();

        match account_type.as_str() {
            "fsa" => {
                let rec = (expenses * TARGET_RATIO).min(FSA_CAP);
                recommendations.insert("fsa".into(), json!(round2(rec)));
                rationale.insert(
                    "fsa".into(),
                    json!("Recommend ~80% of expected expenses up to the FSA cap to reduce forfeiture risk."),
                );
            }
            "hsa" => {
                let rec = (expenses * TARGET_RATIO).min(HSA_CAP_INDIVIDUAL);
                recommendations.insert("hsa".into(), json!(round2(rec)));
                rationale.insert(
                    "hsa".into(),
                    json!("Recommend ~80% of expected expenses up to the HSA cap. Consider catch-up if eligible."),
                );
            }
            "both" => {
                let hsa = (expenses * HSA_FIRST_SHARE).min(HSA_CAP_INDIVIDUAL);
                let remaining = (expenses * TARGET_RATIO - hsa).max(0.0);
                let fsa = remaining.min(FSA_CAP);
                recommendations.insert("hsa".into(), json!(round2(hsa)));
                recommendations.insert("fsa".into(), json!(round2(fsa)));
                rationale.insert(
                    "hsa".into(),
                    json!("Prioritize HSA for tax efficiency and rollover; allocate ~50% of target there first."),
                );
                rationale.insert(
                    "fsa".into(),
                    json!("Allocate remaining target to FSA up to the cap; avoid exceeding likely expenses."),
                );
            }
            _ => {
                let neutral = (expenses * TARGET_RATIO).min(FSA_CAP.max(HSA_CAP_INDIVIDUAL));
                recommendations.insert("suggested_contribution".into(), json!(round2(neutral)));
                rationale.insert(
                    "note".into(),
                    json!("Unknown account_type; suggested a single neutral target based on expected expenses."),
                );
            }
        }

        if account_type != "fsa" && current_age.is_some_and(|age| age >= HSA_CATCH_UP_AGE) {
            rationale.insert(
                "catch_up".into(),
                json!("Age 55+ may allow an additional HSA catch-up contribution (not modeled)."),
            );
        }

        Ok(json!({
            "input": {
                "expected_medical_expenses": expenses,
                "account_type": account_type,
                "current_age": current_age,
                "retirement_age": retirement_age,
            },
            "recommendations": recommendations,
            "assumptions": {
                "target_ratio": TARGET_RATIO,
                "fsa_cap": FSA_CAP,
                "hsa_cap_individual": HSA_CAP_INDIVIDUAL,
            },
            "rationale": rationale,
            "disclaimer": "This is a non-binding illustrative calculation. Consult plan documents and a tax advisor.",
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(v: Value) -> Value {
        FsaHsaCalculatorTool
            .execute(v.as_object().cloned().unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn fsa_targets_eighty_percent() {
        let out = run(json!({"expected_medical_expenses": 2000.0, "account_type": "FSA"})).await;
        assert_eq!(out["recommendations"]["fsa"], 1600.0);
    }

    #[tokio::test]
    async fn caps_apply() {
        let out = run(json!({"expected_medical_expenses": 10000, "account_type": "fsa"})).await;
        assert_eq!(out["recommendations"]["fsa"], 3150.0);
        let out = run(json!({"expected_medical_expenses": 10000, "account_type": "hsa"})).await;
        assert_eq!(out["recommendations"]["hsa"], 4150.0);
    }

    #[tokio::test]
    async fn both_funds_hsa_first() {
        let out = run(json!({"expected_medical_expenses": 4000, "account_type": "both"})).await;
        // hsa = 2000, remaining = 3200 - 2000
        assert_eq!(out["recommendations"]["hsa"], 2000.0);
        assert_eq!(out["recommendations"]["fsa"], 1200.0);
    }

    #[tokio::test]
    async fn unknown_account_gets_neutral_suggestion() {
        let out = run(json!({"expected_medical_expenses": 1000, "account_type": "hra"})).await;
        assert_eq!(out["recommendations"]["suggested_contribution"], 800.0);
        assert!(out["rationale"].get("note").is_some());
    }

    #[tokio::test]
    async fn negative_expenses_clamp_to_zero() {
        let out = run(json!({"expected_medical_expenses": -50, "account_type": "hsa"})).await;
        assert_eq!(out["recommendations"]["hsa"], 0.0);
        assert_eq!(out["input"]["expected_medical_expenses"], 0.0);
    }

    #[tokio::test]
    async fn catch_up_noted_for_older_employees() {
        let out = run(json!({
            "expected_medical_expenses": 1000,
            "account_type": "hsa",
            "current_age": 58
        }))
        .await;
        assert!(out["rationale"].get("catch_up").is_some());
        assert_eq!(out["input"]["current_age"], 58);
    }
}
