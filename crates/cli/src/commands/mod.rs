pub mod agents;
pub mod onboard;
pub mod run;
pub mod schema;
pub mod tools;

use agentflow_config::AppConfig;
use agentflow_core::agent::{AgentDefinition, AgentRegistry};
use agentflow_core::tool::ToolRegistry;
use anyhow::{Context, bail};

/// Built-in agents plus the `[[agents]]` declared in config.
///
/// A config agent with the same key as a built-in one replaces it.
pub fn load_agents(config: &AppConfig, tools: &ToolRegistry) -> anyhow::Result<AgentRegistry> {
    let mut registry = agentflow_tools::default_agents(tools);

    for agent in &config.agents {
        let definitions = tools
            .resolve(&agent.tools)
            .with_context(|| format!("agent '{}' references an unknown tool", agent.key))?;
        let definition = AgentDefinition {
            name: agent.name.clone(),
            system_prompt: agent.system_prompt.clone(),
            tools: definitions,
            provider: agent.provider.clone(),
            model: agent.model.clone(),
        };
        if let Err(e) = definition.provider_kind() {
            bail!("agent '{}' is misconfigured: {e}", agent.key);
        }
        registry.register(agent.key.clone(), definition);
    }

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_config::AgentConfig;

    fn agent_config(tools: &[&str], model: &str) -> AgentConfig {
        AgentConfig {
            key: "pto".into(),
            name: "PTO Helper".into(),
            system_prompt: "Answer PTO questions".into(),
            tools: tools.iter().map(|t| t.to_string()).collect(),
            provider: "OPENAI".into(),
            model: model.into(),
        }
    }

    #[test]
    fn config_agents_join_the_built_ins() {
        let tools = agentflow_tools::default_registry();
        let mut config = AppConfig::default();
        config.agents.push(agent_config(&["pto_balance_lookup"], "gpt-4o-mini"));

        let agents = load_agents(&config, &tools).unwrap();
        assert_eq!(agents.names(), vec!["benefits", "pto"]);
        let pto = agents.get("pto").unwrap();
        assert_eq!(pto.tools.len(), 1);
        assert_eq!(pto.tools[0].name, "pto_balance_lookup");
    }

    #[test]
    fn unknown_tool_is_rejected() {
        let tools = agentflow_tools::default_registry();
        let mut config = AppConfig::default();
        config.agents.push(agent_config(&["teleport"], "gpt-4"));
        let err = load_agents(&config, &tools).unwrap_err();
        assert!(format!("{err:#}").contains("teleport"));
    }

    #[test]
    fn unsupported_model_is_rejected() {
        let tools = agentflow_tools::default_registry();
        let mut config = AppConfig::default();
        config.agents.push(agent_config(&[], "gpt-2"));
        assert!(load_agents(&config, &tools).is_err());
    }
}
