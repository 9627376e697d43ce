//! `agentflow agents`: list available agents.

use agentflow_config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    let tools = agentflow_tools::default_registry();
    let agents = super::load_agents(&config, &tools)?;

    println!("Available agents");
    println!("================");
    println!();
    for (key, agent) in agents.iter() {
        println!("  {key}");
        println!("    Name:     {}", agent.name);
        println!("    Provider: {} ({})", agent.provider, agent.model);
        let names: Vec<&str> = agent.tools.iter().map(|t| t.name.as_str()).collect();
        if names.is_empty() {
            println!("    Tools:    (none)");
        } else {
            println!("    Tools:    {}", names.join(", "));
        }
        println!();
    }

    Ok(())
}
