//! Built-in tool implementations for AgentFlow.
//!
//! The employee-benefits toolset: pension projections, health plan lookup,
//! PTO balances, enrollment and FSA/HSA planning. Every tool is
//! deterministic so executions can be replayed and tested offline.

mod args;

pub mod agents;
pub mod benefits_enrollment;
pub mod calculate_pension;
pub mod fsa_hsa_calculator;
pub mod health_insurance_lookup;
pub mod pto_balance_lookup;

use agentflow_core::tool::ToolRegistry;
use std::sync::Arc;

pub use agents::{benefits_agent, default_agents};

/// Create a default tool registry with all built-in tools.
pub fn default_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(calculate_pension::CalculatePensionTool));
    registry.register(Arc::new(health_insurance_lookup::HealthInsuranceLookupTool));
    registry.register(Arc::new(pto_balance_lookup::PtoBalanceLookupTool));
    registry.register(Arc::new(benefits_enrollment::BenefitsEnrollmentTool));
    registry.register(Arc::new(fsa_hsa_calculator::FsaHsaCalculatorTool));
    registry
}
