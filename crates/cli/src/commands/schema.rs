//! `agentflow schema`: show an agent's tools as the provider receives them.

use agentflow_config::AppConfig;

pub fn run(agent_key: &str) -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let tools = agentflow_tools::default_registry();
    let agents = super::load_agents(&config, &tools)?;

    let agent = agents.get(agent_key)?;
    let provider = agent.provider_kind()?;
    let specs = agentflow_providers::convert(&agent.tools, provider)?;
    println!("{}", serde_json::to_string_pretty(&specs)?);

    Ok(())
}
