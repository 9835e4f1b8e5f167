//! Shell completions subcommand implementation.

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::{generate, Shell};
use std::io;

use crate::cli::args::{Cli, CompletionsArgs};

pub fn execute(args: CompletionsArgs) -> Result<()> {
    let mut cmd = Cli::command();
    let cmd_name = cmd.get_name().to_string();

    generate(args.shell, &mut cmd, cmd_name, &mut io::stdout());
    print_installation_instructions(args.shell);

    Ok(())
}

fn print_installation_instructions(shell: Shell) {
    eprintln!();
    eprintln!("# Installation instructions for {:?}:", shell);
    eprintln!();

    match shell {
        Shell::Bash => {
            eprintln!("# Add to ~/.bashrc:");
            eprintln!("# eval \"$(fmx completions bash)\"");
        }
        Shell::Zsh => {
            eprintln!("# Add to ~/.zshrc (before compinit):");
            eprintln!("# eval \"$(fmx completions zsh)\"");
        }
        Shell::Fish => {
            eprintln!("# Save to fish completions directory:");
            eprintln!("# fmx completions fish > ~/.config/fish/completions/fmx.fish");
        }
        Shell::PowerShell => {
            eprintln!("# Add to your PowerShell profile:");
            eprintln!("# fmx completions powershell | Out-String | Invoke-Expression");
        }
        Shell::Elvish => {
            eprintln!("# Save to elvish completions directory:");
            eprintln!("# fmx completions elvish > ~/.elvish/lib/fmx.elv");
        }
        _ => {
            eprintln!("# Please refer to your shell's documentation for completion setup.");
        }
    }
    eprintln!();
}
