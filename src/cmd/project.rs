//! Store initialization command.

use anyhow::Result;

use super::super::Cli;
use super::matrix_dir;

pub fn cmd_init(cli: &Cli) -> Result<()> {
    use neo::init::{init_store, is_initialized};
    use neo::ui::icons::{CHECK, FILE_NEW, FOLDER};

    let dir = matrix_dir(cli);
    let was_initialized = is_initialized(&dir);

    let result = init_store(&dir)?;

    if result.created {
        println!("{}Initialized neo store at {}", CHECK, result.matrix_dir.display());
        println!();
        println!("Created directory structure:");
        println!("  {}{}/", FOLDER, result.matrix_dir.display());
        println!("  ├── matrix.toml            # Models and gate overrides");
        println!("  ├── tickets/index.json     # Ticket index");
        println!("  ├── tickets/reservations.json");
        println!("  └── construct/             # Pipeline plan (use `neo pipeline generate`)");
        println!();
        println!("Next steps:");
        println!("  1. Run `neo pipeline generate` to adapt the pipeline to your project");
        println!("  2. Run `neo ticket create-from-graph <task-graph.json>` to load work");
        println!("  3. Run `neo ticket next` to pick up the first ticket");
    } else if was_initialized && result.written.is_empty() {
        println!("neo store already initialized at {}", result.matrix_dir.display());
        println!("Directory structure verified.");
    } else {
        println!("Completed neo store at {}", result.matrix_dir.display());
        for path in &result.written {
            println!("  {}{}", FILE_NEW, path.display());
        }
    }

    Ok(())
}
