//! Pension calculator: projects retirement income from salary and service.
//!
//! Uses simple published-style formulas rather than any real plan's rules:
//! a 1.5% final-salary accrual for defined benefit, an 8% contribution at a
//! 5% real return for defined contribution, and an even blend for hybrid.

use async_trait::async_trait;
use agentflow_core::error::ToolError;
use agentflow_core::tool::{InputType, Tool, ToolInputSpec};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::args::{Args, round2};

const NAME: &str = "calculate_pension";

const ACCRUAL_RATE: f64 = 0.015;
const NORMAL_RETIREMENT_AGE: i64 = 65;
/// Reduction per year of retirement before the normal age
const EARLY_REDUCTION: f64 = 0.06;
const DC_CONTRIBUTION_RATE: f64 = 0.08;
const DC_REAL_RETURN: f64 = 0.05;
/// Safe-withdrawal rate used to turn a DC balance into annual income
const DC_WITHDRAWAL_RATE: f64 = 0.04;

pub struct CalculatePensionTool;

#[async_trait]
impl Tool for CalculatePensionTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Calculate pension benefits based on salary, years of service, and retirement age"
    }

    fn inputs(&self) -> Vec<ToolInputSpec> {
        vec![
            ToolInputSpec::required(
                "current_salary",
                InputType::Float,
                "Current annual salary in USD",
            ),
            ToolInputSpec::required(
                "years_of_service",
                InputType::Integer,
                "Number of years of service with the company",
            ),
            ToolInputSpec::required("retirement_age", InputType::Integer, "Planned retirement age"),
            ToolInputSpec::optional(
                "pension_plan_type",
                InputType::String,
                "Type of pension plan (defined_benefit, defined_contribution, hybrid)",
            ),
        ]
    }

    async fn execute(&self, arguments: Map<String, Value>) -> Result<Value, ToolError> {
        let args = Args::new(NAME, &arguments);

        let salary = args.f64("current_salary")?;
        if salary < 0.0 {
            return Err(args.invalid("current_salary", "must not be negative"));
        }
        let years = args.i64("years_of_service")?;
        if !(0..=60).contains(&years) {
            return Err(args.invalid("years_of_service", "must be between 0 and 60"));
        }
        let retirement_age = args.i64("retirement_age")?;
        if !(50..=80).contains(&retirement_age) {
            return Err(args.invalid("retirement_age", "must be between 50 and 80"));
        }
        let plan = match args.opt_str("pension_plan_type")? {
            None => PlanType::DefinedBenefit,
            Some(raw) => PlanType::parse(raw).ok_or_else(|| {
                args.invalid(
                    "pension_plan_type",
                    format!("unknown plan type '{raw}'"),
                )
            })?,
        };

        let projection = project(salary, years, retirement_age, plan);
        serde_json::to_value(&projection).map_err(|e| ToolError::ExecutionFailed {
            tool_name: NAME.into(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
enum PlanType {
    DefinedBenefit,
    DefinedContribution,
    Hybrid,
}

impl PlanType {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "defined_benefit" | "db" => Some(PlanType::DefinedBenefit),
            "defined_contribution" | "dc" => Some(PlanType::DefinedContribution),
            "hybrid" => Some(PlanType::Hybrid),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct PensionProjection {
    plan_type: PlanType,
    current_salary: f64,
    years_of_service: i64,
    retirement_age: i64,
    early_retirement_reduction: f64,
    annual_pension: f64,
    monthly_pension: f64,
    income_replacement_ratio: f64,
    assumptions: Assumptions,
}

#[derive(Debug, Serialize)]
struct Assumptions {
    accrual_rate: f64,
    normal_retirement_age: i64,
    dc_contribution_rate: f64,
    dc_real_return: f64,
    dc_withdrawal_rate: f64,
}

fn defined_benefit(salary: f64, years: i64) -> f64 {
    salary * ACCRUAL_RATE * years as f64
}

fn defined_contribution(salary: f64, years: i64) -> f64 {
    // Future value of a level annual contribution.
    let contribution = salary * DC_CONTRIBUTION_RATE;
    let balance = if years == 0 {
        0.0
    } else {
        contribution * ((1.0 + DC_REAL_RETURN).powi(years as i32) - 1.0) / DC_REAL_RETURN
    };
    balance * DC_WITHDRAWAL_RATE
}

fn project(salary: f64, years: i64, retirement_age: i64, plan: PlanType) -> PensionProjection {
    let years_early = (NORMAL_RETIREMENT_AGE - retirement_age).max(0) as f64;
    let reduction = (years_early * EARLY_REDUCTION).min(0.5);

    let base = match plan {
        PlanType::DefinedBenefit => defined_benefit(salary, years) * (1.0 - reduction),
        PlanType::DefinedContribution => defined_contribution(salary, years),
        PlanType::Hybrid => {
            0.5 * defined_benefit(salary, years) * (1.0 - reduction)
                + 0.5 * defined_contribution(salary, years)
        }
    };

    let replacement = if salary > 0.0 { base / salary } else { 0.0 };

    PensionProjection {
        plan_type: plan,
        current_salary: round2(salary),
        years_of_service: years,
        retirement_age,
        early_retirement_reduction: round2(reduction),
        annual_pension: round2(base),
        monthly_pension: round2(base / 12.0),
        income_replacement_ratio: round2(replacement),
        assumptions: Assumptions {
            accrual_rate: ACCRUAL_RATE,
            normal_retirement_age: NORMAL_RETIREMENT_AGE,
            dc_contribution_rate: DC_CONTRIBUTION_RATE,
            dc_real_return: DC_REAL_RETURN,
            dc_withdrawal_rate: DC_WITHDRAWAL_RATE,
        },
    }
}
