//! The help command: lists commands, or shows one command's usage.

use crate::command::{CommandArgs, CommandSpec};
use crate::error::Result;
use crate::options::ProjectOptions;
use crate::plugin::PluginApi;
use crate::service::Service;
use std::sync::Arc;

pub fn apply(api: &mut PluginApi<'_>, _options: &ProjectOptions) -> Result<()> {
    api.register_command(
        "help",
        CommandSpec::new(
            "list available commands, or show usage of a single command",
            "forgepack help [command]",
        ),
        Arc::new(run),
    );
    Ok(())
}

fn run(service: &mut Service, args: &CommandArgs) -> Result<()> {
    match args.positionals.first() {
        Some(name) if name != "help" => print_command_help(service, name),
        _ => print_overview(service),
    }
    Ok(())
}

fn print_overview(service: &Service) {
    println!();
    println!("  Usage: forgepack <command> [options]");
    println!();
    println!("  Commands:");
    let width = service
        .commands()
        .keys()
        .map(String::len)
        .max()
        .unwrap_or(0);
    for command in service.commands().values() {
        println!("    {:width$}  {}", command.name, command.spec.description);
    }
    println!();
    println!("  run forgepack help <command> for usage of a specific command.");
    println!();
}

fn print_command_help(service: &Service, name: &str) {
    let Some(command) = service.commands().get(name) else {
        println!();
        println!("  command \"{name}\" does not exist.");
        print_overview(service);
        return;
    };

    println!();
    println!("  Usage: {}", command.spec.usage);
    if !command.spec.description.is_empty() {
        println!();
        println!("  {}", command.spec.description);
    }
    if !command.spec.options.is_empty() {
        println!();
        println!("  Options:");
        let width = command.spec.options.keys().map(String::len).max().unwrap_or(0);
        for (flag, help) in &command.spec.options {
            println!("    {flag:width$}  {help}");
        }
    }
    println!();
}
