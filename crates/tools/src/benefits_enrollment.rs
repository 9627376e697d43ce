//! Benefits enrollment: records a (mock) enrollment submission.
//!
//! Nothing is persisted; the confirmation number is derived from the
//! submission itself so resubmitting the same selections is idempotent.

use async_trait::async_trait;
use agentflow_core::error::ToolError;
use agentflow_core::tool::{InputType, Tool, ToolInputSpec};
use serde_json::{Map, Value, json};

use crate::args::{Args, stable_hash};

const NAME: &str = "benefits_enrollment";

pub struct BenefitsEnrollmentTool;

#[async_trait]
impl Tool for BenefitsEnrollmentTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Help with benefits enrollment during open enrollment or life events"
    }

    fn inputs(&self) -> Vec<ToolInputSpec> {
        vec![
            ToolInputSpec::required(
                "employee_id",
                InputType::String,
                "Employee identification number",
            ),
            ToolInputSpec::required(
                "enrollment_type",
                InputType::String,
                "Type of enrollment (open_enrollment, new_hire, life_event)",
            ),
            ToolInputSpec::required(
                "benefits_selections",
                InputType::Dict,
                "Dictionary of benefit selections and choices",
            ),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let args = Args::new(NAME, &arguments);

        let employee_id = args.str("employee_id")?.trim();
        if employee_id.is_empty() {
            return Err(args.invalid("employee_id", "must not be empty"));
        }
        let enrollment_type = args.str("enrollment_type")?.trim().to_ascii_lowercase();
        let (status, effective) = match enrollment_type.as_str() {
            "open_enrollment" => ("submitted", "January 1 of the next plan year"),
            "new_hire" => ("submitted", "First day of the month after the hire date"),
            "life_event" => (
                "pending_review",
                "Date of the qualifying event, once documentation is verified",
            ),
            other => {
                return Err(args.invalid(
                    "enrollment_type",
                    format!("unknown enrollment type '{other}'"),
                ));
            }
        };

        let selections = args.object("benefits_selections")?;
        if selections.is_empty() {
            return Err(args.invalid("benefits_selections", "at least one selection is required"));
        }

        // serde_json maps are ordered, so this string is canonical.
        let fingerprint = format!(
            "{employee_id}|{enrollment_type}|{}",
            Value::Object(selections.clone())
        );
        let confirmation = format!("ENR-{:08X}", stable_hash(&fingerprint));

        tracing::debug!(employee_id, %confirmation, "Recorded mock enrollment");

        let mut next_steps = vec!["Review the confirmation email sent to your work address"];
        if status == "pending_review" {
            next_steps.push("Upload proof of the qualifying life event within 30 days");
        }

        Ok(json!({
            "confirmation_number": confirmation,
            "employee_id": employee_id,
            "enrollment_type": enrollment_type,
            "status": status,
            "effective_date": effective,
            "selections": selections,
            "next_steps": next_steps,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn open_enrollment_is_submitted() {
        let out = BenefitsEnrollmentTool
            .execute(args(json!({
                "employee_id": "E42",
                "enrollment_type": "open_enrollment",
                "benefits_selections": {"medical": "Gold PPO", "dental": "basic"}
            })))
            .await
            .unwrap();
        assert_eq!(out["status"], "submitted");
        assert!(out["confirmation_number"].as_str().unwrap().starts_with("ENR-"));
        assert_eq!(out["selections"]["dental"], "basic");
    }

    #[tokio::test]
    async fn resubmission_is_idempotent() {
        let input = json!({
            "employee_id": "E42",
            "enrollment_type": "life_event",
            "benefits_selections": {"medical": "Silver HMO"}
        });
        let a = BenefitsEnrollmentTool.execute(args(input.clone())).await.unwrap();
        let b = BenefitsEnrollmentTool.execute(args(input)).await.unwrap();
        assert_eq!(a["confirmation_number"], b["confirmation_number"]);
        assert_eq!(a["status"], "pending_review");
        assert_eq!(a["next_steps"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn empty_selections_rejected() {
        let err = BenefitsEnrollmentTool
            .execute(args(json!({
                "employee_id": "E42",
                "enrollment_type": "new_hire",
                "benefits_selections": {}
            })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("benefits_selections"));
    }

    #[tokio::test]
    async fn unknown_enrollment_type_rejected() {
        let err = BenefitsEnrollmentTool
            .execute(args(json!({
                "employee_id": "E42",
                "enrollment_type": "whenever",
                "benefits_selections": {"medical": "x"}
            })))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("enrollment_type"));
    }
}
