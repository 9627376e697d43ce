//! `agentflow tools`: list built-in tools.

pub fn run() -> anyhow::Result<()> {
    let registry = agentflow_tools::default_registry();

    println!("Built-in tools");
    println!("==============");
    println!();
    for def in registry.definitions() {
        println!("  {}: {}", def.name, def.description);
        for input in &def.inputs {
            let required = if input.required { "" } else { ", optional" };
            println!("    - {} ({}{required}): {}", input.name, input.input_type, input.description);
        }
        println!();
    }

    Ok(())
}
